use std::sync::Arc;
use std::sync::atomic::AtomicBool;
/// Set once Ctrl+C has been pressed. Shared by every runner and child process.
pub type CancellationToken = Arc<AtomicBool>;

pub mod cli;
/// Names, versions and environment variables.
pub mod constants;
/// Verb loading, compilation and execution.
pub mod core;
/// Data types shared across the crate.
pub mod models;
pub mod system;
pub mod verbs;
