// Credential refresh exchange

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use super::types::RefreshResponse;
use crate::config::ClientConfig;
use crate::error::RefreshDenied;

/// Trades the durable refresh credential for a new access credential.
///
/// The durable credential is never read by implementations; it travels
/// out-of-band (the production refresher relies on the cookie jar). A
/// denial is terminal: this component does not retry.
#[async_trait]
pub trait CredentialRefresher: Send + Sync {
    async fn refresh(&self) -> std::result::Result<String, RefreshDenied>;
}

/// Production refresher: one POST to the portal's refresh endpoint.
///
/// Owns its own HTTP client so the refresh exchange carries an independent
/// deadline; a timeout here is a denial like any other.
pub struct HttpRefresher {
    client: Client,
    refresh_url: String,
}

impl HttpRefresher {
    /// The cookie jar must be the one the portal client uses: the durable
    /// credential is set through that jar at sign-in and rotated through it
    /// on refresh, and both clients have to see the same copy.
    pub fn new(config: &ClientConfig, cookies: Arc<Jar>) -> Result<Self> {
        let client = Client::builder()
            .cookie_provider(cookies)
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .timeout(Duration::from_secs(config.refresh_timeout))
            .build()
            .context("Failed to create refresh HTTP client")?;

        Ok(Self {
            client,
            refresh_url: config.refresh_url(),
        })
    }
}

#[async_trait]
impl CredentialRefresher for HttpRefresher {
    async fn refresh(&self) -> std::result::Result<String, RefreshDenied> {
        tracing::info!(url = %self.refresh_url, "refreshing access credential");

        let response = self
            .client
            .post(&self.refresh_url)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| {
                let kind = if e.is_timeout() { "timeout" } else { "transport" };
                tracing::error!(error = %e, kind = kind, "refresh exchange failed to complete");
                RefreshDenied::new(format!("refresh exchange {}: {}", kind, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "refresh exchange denied");
            return Err(RefreshDenied::new(format!(
                "refresh endpoint returned {}",
                status
            )));
        }

        let envelope: RefreshResponse = response
            .json()
            .await
            .map_err(|e| RefreshDenied::new(format!("unparseable refresh envelope: {}", e)))?;

        if envelope.access_token.is_empty() {
            return Err(RefreshDenied::new("refresh envelope missing accessToken"));
        }

        if envelope.refresh_token.is_some() {
            tracing::debug!("backend rotated the durable credential in the envelope");
        }

        tracing::info!("access credential refreshed");
        Ok(envelope.access_token)
    }
}
