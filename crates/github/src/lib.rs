//! GitHub access for Autopilot
//!
//! This crate provides:
//! - A minimal REST client (token validation, repository creation)
//! - Credential stores for the personal access token (OS keyring, in-memory)

pub mod api;
pub mod credentials;
pub mod error;

// Re-exports
pub use api::{CreatedRepository, GitHubClient, GitHubUser, NewRepository, TokenStatus, DEFAULT_API_URL};
pub use credentials::{CredentialStore, KeyringStore, MemoryStore, DEFAULT_ACCOUNT, SERVICE_NAME};
pub use error::{CredentialError, GitHubError};
