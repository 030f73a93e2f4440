//! Shared test doubles for engine/subscriber integration tests.
//!
//! [`FakeStore`] implements [`EventStore`] entirely in memory so these
//! tests never need a live Postgres instance.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use eventagent::store::category::CategoryQuery;
use eventagent::store::event::Event;
use eventagent::store::stream::parse_stream_name;
use eventagent::store::{EventStore, StoreError};
use serde_json::Value;
use uuid::Uuid;

#[derive(Default)]
struct State {
    events: Vec<Event>,
    stream_versions: HashMap<String, i64>,
}

/// An in-memory [`EventStore`] for tests. Supports optimistic concurrency
/// and category reads, including consumer-group partitioning, but keeps
/// everything in a `Mutex<Vec<Event>>` rather than a real database.
#[derive(Default)]
pub struct FakeStore {
    state: Mutex<State>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of events appended so far, across every stream.
    pub fn event_count(&self) -> usize {
        self.state.lock().unwrap().events.len()
    }
}

#[async_trait]
impl EventStore for FakeStore {
    async fn append(
        &self,
        stream_name: &str,
        event_type: &str,
        data: Value,
        metadata: Option<Value>,
        expected_version: Option<i64>,
    ) -> Result<i64, StoreError> {
        if event_type.trim().is_empty() {
            return Err(StoreError::InvalidArgument("event type cannot be empty".into()));
        }
        parse_stream_name(stream_name)?;

        let mut state = self.state.lock().unwrap();
        let current_version = *state.stream_versions.get(stream_name).unwrap_or(&-1);

        if let Some(expected) = expected_version {
            if expected != current_version {
                return Err(StoreError::ConcurrencyConflict {
                    stream_name: stream_name.to_string(),
                    expected_version: expected,
                    actual_version: Some(current_version),
                });
            }
        }

        let position = current_version + 1;
        // 1-indexed, matching a real message-store's bigserial global_position
        // column: a cursor of 0 then means "nothing read yet" (spec.md §4.6),
        // and the subscriber's `from_global_position = cursor + 1` lands on
        // the very first event rather than skipping it.
        let global_position = state.events.len() as i64 + 1;

        state.events.push(Event {
            id: Uuid::new_v4(),
            event_type: event_type.to_string(),
            data,
            metadata,
            position,
            global_position,
            time: chrono::Utc::now(),
            stream_name: stream_name.to_string(),
        });
        state.stream_versions.insert(stream_name.to_string(), position);

        Ok(position)
    }

    async fn read_stream(
        &self,
        stream_name: &str,
        from_position: i64,
        batch_size: i64,
    ) -> Result<Vec<Event>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .events
            .iter()
            .filter(|e| e.stream_name == stream_name && e.position >= from_position)
            .take(batch_size as usize)
            .cloned()
            .collect())
    }

    async fn read_category(&self, query: CategoryQuery<'_>) -> Result<Vec<Event>, StoreError> {
        query.validate()?;
        let state = self.state.lock().unwrap();

        let matches_category = |event: &&Event| -> bool {
            let Ok((category, version, _)) = parse_stream_name(&event.stream_name) else {
                return false;
            };
            format!("{}:{}", category, version) == query.category
        };

        let matches_group = |event: &&Event| -> bool {
            match (query.consumer_group_member, query.consumer_group_size) {
                (Some(member), Some(size)) => {
                    let owner = eventagent::store::category::consumer_group_member_for(
                        &event.stream_name,
                        size as u64,
                    );
                    owner == member as u64
                }
                _ => true,
            }
        };

        Ok(state
            .events
            .iter()
            .filter(matches_category)
            .filter(|e| e.global_position >= query.from_global_position)
            .filter(matches_group)
            .take(query.batch_size as usize)
            .cloned()
            .collect())
    }

    async fn close(&self) {}
}
