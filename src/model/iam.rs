//! IBM Cloud IAM token exchange.
//!
//! watsonx.ai takes a short-lived bearer token, obtained by posting the API
//! key to the IAM token endpoint. The token is reused until shortly before it
//! expires.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use super::ModelError;

const GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

/// Refresh this many seconds before the reported expiration.
const EXPIRY_MARGIN_SECS: u64 = 60;

#[derive(Debug, Clone, Deserialize)]
struct IamTokenResponse {
    access_token: String,
    /// Absolute expiry, seconds since the Unix epoch.
    expiration: u64,
}

pub struct IamAuthenticator {
    http: reqwest::Client,
    url: String,
    api_key: String,
    cached: Mutex<Option<IamTokenResponse>>,
}

impl IamAuthenticator {
    pub fn new(http: reqwest::Client, url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
            api_key: api_key.into(),
            cached: Mutex::new(None),
        }
    }

    /// A valid bearer token, exchanging the API key if needed.
    pub async fn token(&self) -> Result<String, ModelError> {
        if self.api_key.is_empty() {
            return Err(ModelError::Auth(
                "no API key configured (set WATSONX_AI_API_KEY)".to_string(),
            ));
        }

        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expiration > now_secs() + EXPIRY_MARGIN_SECS {
                return Ok(token.access_token.clone());
            }
        }

        let response = self
            .http
            .post(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[("grant_type", GRANT_TYPE), ("apikey", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Auth(format!("IAM returned {status}: {body}")));
        }

        let token: IamTokenResponse = response.json().await?;
        debug!(expiration = token.expiration, "Obtained IAM token");
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
