//! Append and read operations against the message-store schema.
//!
//! The backend is assumed to expose the conventional message-store
//! functions: `write_message`, `get_stream_messages`, and
//! `get_category_messages`. This module calls them directly via `sqlx`
//! rather than hand-rolling the equivalent SQL, so a standard message-store
//! installation can be used unmodified.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::Row;
use uuid::Uuid;

use crate::store::category::CategoryQuery;
use crate::store::client::StoreClient;
use crate::store::error::StoreError;
use crate::store::event::Event;
use crate::store::stream::parse_stream_name;

/// The marker substring a Message DB-compatible backend raises when an
/// `expected_version` does not match the stream's current version.
const WRONG_EXPECTED_VERSION_MARKER: &str = "Wrong expected version";

/// Abstraction over a relational message-store schema.
///
/// Implementations must uphold the append/read contracts described on each
/// method: positions are consecutive per stream, `global_position` is
/// strictly monotonic across the whole store, and a stream's
/// `expected_version` check is atomic with the write.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append a new event to `stream_name`.
    ///
    /// When `expected_version` is `Some(v)`, the append is conditional: it
    /// only succeeds if the stream's current highest position is `v`.
    /// Returns the new event's position within the stream.
    async fn append(
        &self,
        stream_name: &str,
        event_type: &str,
        data: Value,
        metadata: Option<Value>,
        expected_version: Option<i64>,
    ) -> Result<i64, StoreError>;

    /// Read events from a single stream in ascending position order.
    async fn read_stream(
        &self,
        stream_name: &str,
        from_position: i64,
        batch_size: i64,
    ) -> Result<Vec<Event>, StoreError>;

    /// Read events across every stream in a category in ascending
    /// `global_position` order. See [`CategoryQuery`] for the optional
    /// correlation/consumer-group/condition filters.
    async fn read_category(&self, query: CategoryQuery<'_>) -> Result<Vec<Event>, StoreError>;

    /// Release the underlying connection pool.
    async fn close(&self);
}

#[async_trait]
impl EventStore for StoreClient {
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
        // Validate the stream name shape up front; a malformed name should
        // never reach the backend as a write attempt.
        parse_stream_name(stream_name)?;

        let id = Uuid::new_v4();
        let row = sqlx::query(
            "SELECT write_message($1, $2, $3, $4, $5, $6) AS position",
        )
        .bind(id)
        .bind(stream_name)
        .bind(event_type)
        .bind(&data)
        .bind(&metadata)
        .bind(expected_version)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify_write_error(stream_name, expected_version, e))?;

        let position: i64 = row.try_get("position").map_err(|e| {
            StoreError::FatalStoreError(format!("malformed write_message response: {}", e))
        })?;
        Ok(position)
    }

    async fn read_stream(
        &self,
        stream_name: &str,
        from_position: i64,
        batch_size: i64,
    ) -> Result<Vec<Event>, StoreError> {
        parse_stream_name(stream_name)?;
        if from_position < 0 {
            return Err(StoreError::InvalidArgument("from_position cannot be negative".into()));
        }

        let mut tx = self.pool.begin().await.map_err(classify_connection_error)?;
        let rows = sqlx::query(
            "SELECT * FROM get_stream_messages($1, $2, $3)",
        )
        .bind(stream_name)
        .bind(from_position)
        .bind(batch_size)
        .fetch_all(&mut *tx)
        .await
        .map_err(classify_connection_error)?;
        tx.commit().await.map_err(classify_connection_error)?;

        rows.iter().map(row_to_event).collect()
    }

    async fn read_category(&self, query: CategoryQuery<'_>) -> Result<Vec<Event>, StoreError> {
        query.validate()?;

        let mut tx = self.pool.begin().await.map_err(classify_connection_error)?;
        let rows = sqlx::query(
            "SELECT * FROM get_category_messages($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(query.category)
        .bind(query.from_global_position)
        .bind(query.batch_size)
        .bind(query.correlation)
        .bind(query.consumer_group_member)
        .bind(query.consumer_group_size)
        .bind(query.condition)
        .fetch_all(&mut *tx)
        .await
        .map_err(classify_connection_error)?;
        // Committing releases the row locks the backend takes out while
        // serving this category read.
        tx.commit().await.map_err(classify_connection_error)?;

        rows.iter().map(row_to_event).collect()
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

fn row_to_event(row: &sqlx::postgres::PgRow) -> Result<Event, StoreError> {
    Ok(Event {
        id: row
            .try_get("id")
            .map_err(|e| StoreError::FatalStoreError(format!("malformed event row: {}", e)))?,
        event_type: row
            .try_get("type")
            .map_err(|e| StoreError::FatalStoreError(format!("malformed event row: {}", e)))?,
        data: row
            .try_get("data")
            .map_err(|e| StoreError::FatalStoreError(format!("malformed event row: {}", e)))?,
        metadata: row
            .try_get("metadata")
            .map_err(|e| StoreError::FatalStoreError(format!("malformed event row: {}", e)))?,
        position: row
            .try_get("position")
            .map_err(|e| StoreError::FatalStoreError(format!("malformed event row: {}", e)))?,
        global_position: row
            .try_get("global_position")
            .map_err(|e| StoreError::FatalStoreError(format!("malformed event row: {}", e)))?,
        time: row
            .try_get("time")
            .map_err(|e| StoreError::FatalStoreError(format!("malformed event row: {}", e)))?,
        stream_name: row
            .try_get("stream_name")
            .map_err(|e| StoreError::FatalStoreError(format!("malformed event row: {}", e)))?,
    })
}

fn classify_connection_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
            StoreError::TransientStoreError(err.to_string())
        }
        _ => StoreError::FatalStoreError(err.to_string()),
    }
}

/// Inspect a `write_message` failure for the backend's
/// `"Wrong expected version"` marker and translate it into a
/// [`StoreError::ConcurrencyConflict`], recovering the actual version when
/// the backend reports it (`"...Stream Version: 5"`).
fn classify_write_error(
    stream_name: &str,
    expected_version: Option<i64>,
    err: sqlx::Error,
) -> StoreError {
    let message = err.to_string();
    if message.contains(WRONG_EXPECTED_VERSION_MARKER) {
        let actual_version = message
            .split("Stream Version:")
            .nth(1)
            .and_then(|rest| rest.trim().split_whitespace().next())
            .and_then(|token| token.trim_matches(|c: char| !c.is_ascii_digit()).parse().ok());
        return StoreError::ConcurrencyConflict {
            stream_name: stream_name.to_string(),
            expected_version: expected_version.unwrap_or(-1),
            actual_version,
        };
    }
    classify_connection_error(err)
}
