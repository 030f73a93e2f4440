// src/lib.rs

//! Event-sourced agent orchestration core.
//!
//! This crate drives conversational AI agents by recording every decision,
//! tool invocation, and result as an immutable event in an append-only log
//! backed by a relational message store. All agent state is derived by
//! projecting event histories; nothing is stored mutably.
//!
//! # Architecture
//!
//! - [`store`] — the [`store::EventStore`] abstraction over a relational
//!   message-store schema: append-with-optimistic-concurrency, per-stream
//!   and per-category reads, and stream-name composition.
//! - [`projections`] — pure, deterministic fold functions that turn event
//!   histories into per-use views (LLM context, next-step decision, tool
//!   arguments, session state).
//! - [`engine`] — the processing loop that repeatedly reads a stream,
//!   projects it, decides the next step, executes it, appends result
//!   events, and re-reads.
//! - [`subscriber`] — a long-running category poller that dispatches
//!   messages to handlers and durably records its position.
//! - [`llm`] and [`tools`] — the collaborator interfaces the engine calls
//!   out to (LLM provider adapters and tool bodies are external).

pub mod config;
pub mod engine;
pub mod events;
pub mod llm;
pub mod projections;
pub mod store;
pub mod subscriber;
pub mod tools;

pub use config::StoreConfig;
pub use engine::session::{start_session, terminate_session, SessionError};
pub use store::{Event, EventStore, StoreClient, StoreError};
