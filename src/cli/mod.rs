//! Command-line workflow, separated from argument parsing.

pub mod orchestration;

pub use orchestration::{exit_code, run_workflow, WorkflowArgs, WorkflowResult};
