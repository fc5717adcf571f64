//! Workflow integration tests
//!
//! Each module drives one command family end to end.

pub mod basics;
pub mod config;
pub mod preflight;
pub mod push;
pub mod watch;
