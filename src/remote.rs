//! HTTP client for the sync service's eligibility endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;
use thiserror::Error;

use crate::bootstrap::{RemoteService, TokenCheck, UserProfile};
use crate::config::ApiConfig;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },
}

/// [`RemoteService`] backed by the sync service's REST API.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRemote {
    pub fn new(config: &ApiConfig) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.base_url)
    }
}

#[async_trait]
impl RemoteService for HttpRemote {
    async fn is_server_down(&self) -> bool {
        let url = self.url("healthcheck");
        match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => false,
            Ok(response) => {
                crate::debug_event!("remote", "healthcheck", "{url} -> {}", response.status());
                true
            }
            Err(e) => {
                crate::debug_event!("remote", "healthcheck", "{url} unreachable: {e}");
                true
            }
        }
    }

    async fn user_for_token(&self, token: &str) -> Result<TokenCheck, RemoteError> {
        let url = self.url("users");
        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, format!("Basic {token}"))
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let user: UserProfile = response.json().await?;
                Ok(TokenCheck::Valid(user))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(TokenCheck::Invalid),
            status => Err(RemoteError::UnexpectedStatus {
                status: status.as_u16(),
                url,
            }),
        }
    }
}
