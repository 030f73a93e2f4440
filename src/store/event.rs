//! The event envelope as read back from the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A single event as stored and retrieved from the message store.
///
/// This is the envelope every projection folds over. `data` and `metadata`
/// are opaque JSON values at this layer; callers deserialize them into the
/// typed payloads in [`crate::events`] once they know the `event_type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    /// Unique identifier assigned by the store at write time.
    pub id: Uuid,
    /// Event type name, e.g. `"UserMessageAdded"`.
    pub event_type: String,
    /// Event payload.
    pub data: Value,
    /// Free-form metadata: retry counts, tool ids, correlation ids.
    pub metadata: Option<Value>,
    /// Zero-based position within `stream_name`.
    pub position: i64,
    /// Zero-based position within the store as a whole.
    pub global_position: i64,
    /// Server-assigned write timestamp.
    pub time: DateTime<Utc>,
    /// The stream this event was appended to.
    pub stream_name: String,
}

impl Event {
    /// Deserialize `data` into a typed payload `T`.
    pub fn data_as<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.clone())
    }

    /// Deserialize `metadata` into a typed value `T`, if present.
    pub fn metadata_as<T: for<'de> Deserialize<'de>>(&self) -> Result<Option<T>, serde_json::Error> {
        self.metadata
            .clone()
            .map(serde_json::from_value)
            .transpose()
    }
}
