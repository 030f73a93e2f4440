//! The event store: an abstraction over a relational message-store schema.
//!
//! [`EventStore`] is the single trait the rest of the crate depends on.
//! [`StoreClient`] is the Postgres-backed implementation; tests substitute
//! an in-memory fake built on the same trait.

pub mod category;
pub mod client;
pub mod error;
pub mod event;
pub mod operations;
pub mod stream;

pub use category::CategoryQuery;
pub use client::StoreClient;
pub use error::StoreError;
pub use event::Event;
pub use operations::EventStore;
pub use stream::{build_stream_name, generate_thread_id, parse_stream_name};
