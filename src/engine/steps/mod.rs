//! The two step executors the processing loop dispatches to.

pub mod llm;
pub mod tool;

pub use llm::{execute_llm_step, LlmStepError};
pub use tool::{execute_tool_step, ApprovalInterface, AutoApprove, ToolStepError};
