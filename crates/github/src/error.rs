//! Error types for GitHub and credential access

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("request to GitHub failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub rejected the token (HTTP 401)")]
    Unauthorized,

    #[error("repository name '{0}' is already taken")]
    NameTaken(String),

    #[error("GitHub API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential store error for '{account}': {source}")]
    Keyring {
        account: String,
        #[source]
        source: keyring::Error,
    },
}
