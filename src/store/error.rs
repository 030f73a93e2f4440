//! Error taxonomy for the event store.

use std::error::Error;
use std::fmt;

/// Errors returned by [`crate::store::EventStore`] operations.
///
/// Mirrors the taxonomy in the core specification: a domain conflict that
/// callers are expected to handle themselves, transient failures that are
/// safe to retry, bad-input errors caught before any I/O happens, and fatal
/// errors that indicate the store itself is unusable.
#[derive(Debug, Clone)]
pub enum StoreError {
    /// `expected_version` did not match the stream's current version at
    /// commit time. Carries the stream name, the expected version, and the
    /// actual version when the backend reported one.
    ConcurrencyConflict {
        stream_name: String,
        expected_version: i64,
        actual_version: Option<i64>,
    },
    /// A connection/network-layer failure. Safe to retry.
    TransientStoreError(String),
    /// Bad input caught before any I/O: an empty event type, a malformed
    /// stream name, or an invalid consumer-group pairing.
    InvalidArgument(String),
    /// The store is unusable: missing schema, authentication failure, or
    /// any other condition that retrying will not fix.
    FatalStoreError(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::ConcurrencyConflict {
                stream_name,
                expected_version,
                actual_version,
            } => {
                write!(
                    f,
                    "concurrency conflict on stream '{}': expected version {}",
                    stream_name, expected_version
                )?;
                if let Some(actual) = actual_version {
                    write!(f, ", actual version {}", actual)?;
                }
                Ok(())
            }
            StoreError::TransientStoreError(msg) => write!(f, "transient store error: {}", msg),
            StoreError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            StoreError::FatalStoreError(msg) => write!(f, "fatal store error: {}", msg),
        }
    }
}

impl Error for StoreError {}
