//! A long-running category poller that dispatches events to a handler and
//! durably records its position.

pub mod base;
pub mod position;

pub use base::{
    MessageHandler, Subscriber, SubscriberConfig, SubscriberError, DEFAULT_MAX_HANDLER_RETRIES,
};
pub use position::{InMemoryPositionStore, MessageStorePositionStore, PositionStore};
