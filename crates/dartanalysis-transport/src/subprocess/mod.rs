//! Subprocess transport for the analysis server
//!
//! Spawns the server and exchanges newline-delimited JSON over its
//! stdin/stdout.

pub mod process;
pub mod stdio;

pub use process::{ProcessConfig, StderrMode};
pub use stdio::StdioTransport;
