//! The processing engine: session lifecycle plus the read-project-decide-
//! execute loop that drives a thread turn by turn.

mod loop_;
pub mod session;
pub mod steps;

pub use loop_::{process_thread, EngineConfig, EngineError, EngineOutcome, DEFAULT_MAX_RETRIES};
pub use session::{start_session, start_session_in, terminate_session, SessionError};
