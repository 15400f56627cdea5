//! # Operating System Boundary
//!
//! Everything that starts other programs lives here.
//!
//! - **`executor`**: `run_cmd`, used by shell steps and the Java runner. Handles
//!   dry-run, pause prompts, tolerated failures and `Ctrl+C` while a child runs.

/// External command execution.
pub mod executor;
