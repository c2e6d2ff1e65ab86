//! Logging utilities.
//!
//! Centralizes logger initialization. The crate logs through the standard
//! `log` facade; hosts that already install their own logger can skip
//! this entirely.

mod init;

pub use init::{LoggingConfig, init_logging};
