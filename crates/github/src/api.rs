//! GitHub REST client
//!
//! Only the two calls Autopilot needs: `GET /user` to validate a personal
//! access token and `POST /user/repos` to create a repository.

use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION};
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::GitHubError;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = "autopilot-cli";
const ACCEPT_GITHUB: &str = "application/vnd.github+json";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Account behind a valid token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubUser {
    pub login: String,
    pub name: Option<String>,
    pub email: Option<String>,
    /// Classic token scopes (`x-oauth-scopes`); empty for fine-grained tokens
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenStatus {
    Valid(GitHubUser),
    Invalid,
}

#[derive(Debug, Clone)]
pub struct NewRepository {
    pub name: String,
    pub description: Option<String>,
    pub private: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedRepository {
    pub full_name: String,
    pub clone_url: String,
    pub html_url: String,
}

#[derive(Deserialize)]
struct UserBody {
    login: String,
    name: Option<String>,
    email: Option<String>,
}

#[derive(Serialize)]
struct CreateRepositoryBody<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    private: bool,
    auto_init: bool,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
}

impl GitHubClient {
    pub fn new(api_url: impl Into<String>) -> Result<Self, GitHubError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Check a token against `GET /user`
    ///
    /// HTTP 401 means the token is invalid or expired; any other failure is an error.
    pub async fn validate_token(&self, token: &str) -> Result<TokenStatus, GitHubError> {
        let url = format!("{}/user", self.api_url);
        let resp = self
            .http
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .header(ACCEPT, ACCEPT_GITHUB)
            .send()
            .await?;

        if resp.status() == StatusCode::UNAUTHORIZED {
            debug!("token rejected by GitHub");
            return Ok(TokenStatus::Invalid);
        }
        if !resp.status().is_success() {
            return Err(api_error(resp).await);
        }

        let scopes = parse_scopes(resp.headers());
        let body: UserBody = resp.json().await?;

        Ok(TokenStatus::Valid(GitHubUser {
            login: body.login,
            name: body.name,
            email: body.email,
            scopes,
        }))
    }

    /// Create a repository owned by the token's user (`POST /user/repos`)
    pub async fn create_repository(
        &self,
        token: &str,
        repo: &NewRepository,
    ) -> Result<CreatedRepository, GitHubError> {
        let url = format!("{}/user/repos", self.api_url);
        let body = CreateRepositoryBody {
            name: &repo.name,
            description: repo.description.as_deref(),
            private: repo.private,
            auto_init: false,
        };

        let resp = self
            .http
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .header(ACCEPT, ACCEPT_GITHUB)
            .json(&body)
            .send()
            .await?;

        match resp.status() {
            StatusCode::UNAUTHORIZED => Err(GitHubError::Unauthorized),
            StatusCode::UNPROCESSABLE_ENTITY => {
                warn!(name = %repo.name, "repository name rejected");
                Err(GitHubError::NameTaken(repo.name.clone()))
            }
            status if status.is_success() => Ok(resp.json().await?),
            _ => Err(api_error(resp).await),
        }
    }
}

fn parse_scopes(headers: &HeaderMap) -> Vec<String> {
    headers
        .get("x-oauth-scopes")
        .and_then(|v| v.to_str().ok())
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

async fn api_error(resp: Response) -> GitHubError {
    let status = resp.status();
    let message = match resp.json::<ErrorBody>().await {
        Ok(body) => body.message,
        Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
    };
    warn!(status = status.as_u16(), %message, "GitHub API error");
    GitHubError::Api {
        status: status.as_u16(),
        message,
    }
}
