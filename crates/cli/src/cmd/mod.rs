//! CLI command implementations

pub mod config;
pub mod connect;
pub mod init;
pub mod logout;
pub mod push;
pub mod user;
pub mod watch;
