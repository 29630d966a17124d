//! Command implementations for the CLI
//!
//! - start: Start the proxy server
//! - test: Test configuration validity
//! - probe: Check the log store and initialize the log index
//! - logs: Query captured API exchanges

pub mod logs;
pub mod probe;
pub mod start;
pub mod test;
