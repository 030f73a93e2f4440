//! Durable cursors recording how far a subscriber has read.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::events::{PositionRecordedData, POSITION_RECORDED};
use crate::store::stream::build_stream_name;
use crate::store::{EventStore, StoreError};

/// A subscriber's durable read cursor.
///
/// Implementations must make [`PositionStore::save_position`] idempotent
/// and monotonic: saving a position less than the stored one is a no-op.
#[async_trait]
pub trait PositionStore: Send + Sync {
    /// The last position successfully processed, or 0 if never saved.
    async fn get_position(&self, subscriber_id: &str) -> Result<i64, StoreError>;

    /// Record `position` as processed, unless a greater position is
    /// already stored.
    async fn save_position(&self, subscriber_id: &str, position: i64) -> Result<(), StoreError>;
}

/// A non-durable, in-process position store. Useful for tests and for
/// subscribers that only need to survive within a single run.
#[derive(Default)]
pub struct InMemoryPositionStore {
    positions: Mutex<HashMap<String, i64>>,
}

impl InMemoryPositionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PositionStore for InMemoryPositionStore {
    async fn get_position(&self, subscriber_id: &str) -> Result<i64, StoreError> {
        Ok(*self.positions.lock().await.get(subscriber_id).unwrap_or(&0))
    }

    async fn save_position(&self, subscriber_id: &str, position: i64) -> Result<(), StoreError> {
        let mut positions = self.positions.lock().await;
        let entry = positions.entry(subscriber_id.to_string()).or_insert(0);
        if position > *entry {
            *entry = position;
        }
        Ok(())
    }
}

/// A message-store-backed position store: cursors are `PositionRecorded`
/// events appended to a dedicated `position:v0-{subscriber_id}` stream, so
/// they are durable and replayable alongside the rest of the event log.
pub struct MessageStorePositionStore<'a> {
    store: &'a dyn EventStore,
}

impl<'a> MessageStorePositionStore<'a> {
    pub fn new(store: &'a dyn EventStore) -> Self {
        Self { store }
    }

    /// `subscriber_id` fills the `threadId` slot of the store's
    /// `{category}:{version}-{threadId}` grammar, so a bare id like `"audit"`
    /// (no dash) still parses: this is the `position:v0-audit` stream, not a
    /// literal two-part `position:audit` name.
    fn stream_for(subscriber_id: &str) -> Result<String, StoreError> {
        build_stream_name("position", "v0", subscriber_id)
    }
}

#[async_trait]
impl<'a> PositionStore for MessageStorePositionStore<'a> {
    async fn get_position(&self, subscriber_id: &str) -> Result<i64, StoreError> {
        let stream = Self::stream_for(subscriber_id)?;
        let events = self.store.read_stream(&stream, 0, 10_000).await?;
        let last = events
            .iter()
            .rev()
            .find(|e| e.event_type == POSITION_RECORDED)
            .and_then(|e| e.data_as::<PositionRecordedData>().ok())
            .map(|data| data.position)
            .unwrap_or(0);
        Ok(last)
    }

    async fn save_position(&self, subscriber_id: &str, position: i64) -> Result<(), StoreError> {
        let current = self.get_position(subscriber_id).await?;
        if position <= current {
            return Ok(());
        }
        let stream = Self::stream_for(subscriber_id)?;
        let recorded = PositionRecordedData { position };
        self.store
            .append(
                &stream,
                POSITION_RECORDED,
                serde_json::to_value(recorded).expect("PositionRecordedData always serializes"),
                None,
                None,
            )
            .await?;
        Ok(())
    }
}
