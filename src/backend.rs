// src/backend.rs
use crate::models::{RateSnapshot, UserPosition};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend returned HTTP {0}")]
    Status(reqwest::StatusCode),
}

/// Read-only client for the presale backend
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    client: Client,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// `GET /rates`
    pub async fn rates(&self) -> Result<RateSnapshot, BackendError> {
        self.get_json("/rates").await
    }

    /// `GET /user/{address}`
    pub async fn user(&self, address: &str) -> Result<UserPosition, BackendError> {
        self.get_json(&format!("/user/{address}")).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        let url = format!("{}{}", self.base_url, path);
        info!("📡 GET {}", url);

        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            warn!("Backend error for {}: HTTP {}", url, resp.status());
            return Err(BackendError::Status(resp.status()));
        }

        let body = resp.json::<T>().await?;
        debug!("📩 {} ok", path);
        Ok(body)
    }
}
