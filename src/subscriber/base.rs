//! The subscriber: a durable category poller that dispatches events to a
//! handler in order.

use std::error::Error as StdError;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{error, info, warn};
use tokio::time::sleep;

use crate::store::category::CategoryQuery;
use crate::store::event::Event;
use crate::store::EventStore;
use crate::subscriber::position::PositionStore;

/// How many consecutive handler failures on the same message a subscriber
/// tolerates before it halts.
pub const DEFAULT_MAX_HANDLER_RETRIES: u32 = 3;

/// A callback invoked once per event, in stream order, by a [`Subscriber`].
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Process one event. An `Err` triggers the subscriber's retry policy.
    async fn handle(&self, event: &Event) -> Result<(), Box<dyn StdError + Send + Sync>>;
}

/// Configuration for a [`Subscriber`].
#[derive(Clone)]
pub struct SubscriberConfig {
    pub category: String,
    pub poll_interval_ms: u64,
    pub batch_size: i64,
    /// Required together with `subscriber_id`; durable cursor backend.
    pub position_store: Option<Arc<dyn PositionStore>>,
    /// Required together with `position_store`; the cursor's key.
    pub subscriber_id: Option<String>,
    pub consumer_group_member: Option<i64>,
    pub consumer_group_size: Option<i64>,
    pub max_handler_retries: u32,
    /// Persist the cursor every N successfully handled messages, and
    /// always at the end of a batch. Trades durability for throughput.
    pub persist_every: usize,
}

impl SubscriberConfig {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            poll_interval_ms: 100,
            batch_size: 100,
            position_store: None,
            subscriber_id: None,
            consumer_group_member: None,
            consumer_group_size: None,
            max_handler_retries: DEFAULT_MAX_HANDLER_RETRIES,
            persist_every: 10,
        }
    }

    pub fn with_position_store(mut self, subscriber_id: impl Into<String>, store: Arc<dyn PositionStore>) -> Self {
        self.subscriber_id = Some(subscriber_id.into());
        self.position_store = Some(store);
        self
    }

    pub fn with_consumer_group(mut self, member: i64, size: i64) -> Self {
        self.consumer_group_member = Some(member);
        self.consumer_group_size = Some(size);
        self
    }
}

/// Errors a subscriber run can end with.
#[derive(Debug)]
pub enum SubscriberError {
    /// `position_store` and `subscriber_id` were not both set or both unset.
    InvalidConfig(String),
    /// A store read/write failed.
    Store(crate::store::StoreError),
    /// The handler kept failing on the same event past the retry budget.
    HandlerExhausted { global_position: i64, message: String },
}

impl fmt::Display for SubscriberError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriberError::InvalidConfig(msg) => write!(f, "invalid subscriber config: {}", msg),
            SubscriberError::Store(e) => write!(f, "subscriber store error: {}", e),
            SubscriberError::HandlerExhausted { global_position, message } => write!(
                f,
                "handler exhausted retries at global_position {}: {}",
                global_position, message
            ),
        }
    }
}

impl StdError for SubscriberError {}

impl From<crate::store::StoreError> for SubscriberError {
    fn from(err: crate::store::StoreError) -> Self {
        SubscriberError::Store(err)
    }
}

/// A durable category poller.
///
/// Construct with [`Subscriber::new`], run it with [`Subscriber::run`],
/// and call [`Subscriber::stop`] from another task (or from inside the
/// handler itself) to end the loop cooperatively.
pub struct Subscriber<'a> {
    config: SubscriberConfig,
    store: &'a dyn EventStore,
    handler: Arc<dyn MessageHandler>,
    stop_flag: Arc<AtomicBool>,
}

impl<'a> Subscriber<'a> {
    /// Build a subscriber. Fails if exactly one of `position_store`/
    /// `subscriber_id` is set, or exactly one of the consumer-group fields.
    pub fn new(
        config: SubscriberConfig,
        store: &'a dyn EventStore,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Self, SubscriberError> {
        if config.position_store.is_some() != config.subscriber_id.is_some() {
            return Err(SubscriberError::InvalidConfig(
                "subscriber_id must be provided when position_store is set, and vice versa".into(),
            ));
        }
        if config.consumer_group_member.is_some() != config.consumer_group_size.is_some() {
            return Err(SubscriberError::InvalidConfig(
                "consumer_group_member and consumer_group_size must both be set or both be unset"
                    .into(),
            ));
        }
        Ok(Self {
            config,
            store,
            handler,
            stop_flag: Arc::new(AtomicBool::new(false)),
        })
    }

    /// A handle that can be used to [`Self::stop`] this subscriber from
    /// another task.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop_flag.clone()
    }

    /// Cooperatively stop the poll loop. The loop checks this flag between
    /// batches and between messages; an in-flight handler call completes
    /// first.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }

    fn is_stopped(&self) -> bool {
        self.stop_flag.load(Ordering::SeqCst)
    }

    /// Run the poll loop until [`Self::stop`] is called or the handler
    /// exhausts its retry budget on some event.
    pub async fn run(&self) -> Result<(), SubscriberError> {
        let mut cursor = self.current_position().await?;

        while !self.is_stopped() {
            let mut query = CategoryQuery::new(&self.config.category, cursor + 1)
                .with_batch_size(self.config.batch_size);
            if let (Some(member), Some(size)) =
                (self.config.consumer_group_member, self.config.consumer_group_size)
            {
                query = query.with_consumer_group(member, size);
            }

            let events = self.store.read_category(query).await?;

            if events.is_empty() {
                sleep(Duration::from_millis(self.config.poll_interval_ms)).await;
                continue;
            }

            let mut handled_since_persist = 0usize;

            for event in &events {
                if self.is_stopped() {
                    break;
                }

                self.handle_with_retries(event).await?;
                cursor = event.global_position;
                handled_since_persist += 1;

                if handled_since_persist >= self.config.persist_every {
                    self.persist(cursor).await?;
                    handled_since_persist = 0;
                }
            }

            if handled_since_persist > 0 {
                self.persist(cursor).await?;
            }
        }

        info!("subscriber for {} stopped at position {}", self.config.category, cursor);
        Ok(())
    }

    async fn current_position(&self) -> Result<i64, SubscriberError> {
        match (&self.config.position_store, &self.config.subscriber_id) {
            (Some(store), Some(id)) => Ok(store.get_position(id).await?),
            _ => Ok(0),
        }
    }

    async fn persist(&self, position: i64) -> Result<(), SubscriberError> {
        if let (Some(store), Some(id)) = (&self.config.position_store, &self.config.subscriber_id) {
            store.save_position(id, position).await?;
        }
        Ok(())
    }

    async fn handle_with_retries(&self, event: &Event) -> Result<(), SubscriberError> {
        let mut attempts = 0u32;
        loop {
            match self.handler.handle(event).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    attempts += 1;
                    warn!(
                        "subscriber handler failed on attempt {} at global_position {}: {}",
                        attempts, event.global_position, err
                    );
                    if attempts > self.config.max_handler_retries {
                        error!(
                            "subscriber handler exhausted retries at global_position {}",
                            event.global_position
                        );
                        return Err(SubscriberError::HandlerExhausted {
                            global_position: event.global_position,
                            message: err.to_string(),
                        });
                    }
                }
            }
        }
    }
}
