use anyhow::{Context, Result};
use bytes::Bytes;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, Response};
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{RefreshCoordinator, SessionStore};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::events::{FailureBus, FailureEvent};

/// An outgoing portal request, re-dispatchable for the single automatic
/// retry after a refresh. The body is `Bytes` so a second dispatch is a
/// cheap clone, never a re-serialization.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub method: Method,
    /// Path relative to the configured base URL
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,

    /// At most one automatic retry per request; this tag is what prevents
    /// a 401 -> refresh -> 401 loop when the durable credential is bad
    has_been_retried: bool,
}

impl PendingRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
            has_been_retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn post_json(path: impl Into<String>, payload: &impl serde::Serialize) -> Result<Self> {
        let body = serde_json::to_vec(payload).context("Failed to serialize request body")?;
        let mut request = Self::new(Method::POST, path);
        request.body = Some(Bytes::from(body));
        Ok(request)
    }

    pub fn put_json(path: impl Into<String>, payload: &impl serde::Serialize) -> Result<Self> {
        let body = serde_json::to_vec(payload).context("Failed to serialize request body")?;
        let mut request = Self::new(Method::PUT, path);
        request.body = Some(Bytes::from(body));
        Ok(request)
    }

    /// Pre-encoded multipart body; the caller supplies the content type
    /// with its boundary, which also opts out of the JSON default
    pub fn multipart(
        path: impl Into<String>,
        content_type: &str,
        body: Bytes,
    ) -> Result<Self> {
        let mut request = Self::new(Method::POST, path);
        request.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_str(content_type).context("Invalid multipart content type")?,
        );
        request.body = Some(body);
        Ok(request)
    }

    pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
        let name: HeaderName = name.parse().context("Invalid header name")?;
        let value: HeaderValue = value.parse().context("Invalid header value")?;
        self.headers.insert(name, value);
        Ok(self)
    }
}

/// HTTP client for the portal API.
///
/// Wraps every outgoing call: attaches the current access credential,
/// routes on the response status (401 -> single-flight refresh and one
/// retry, flagged 503 -> maintenance, 5xx -> server error), and publishes
/// failure events for observers that are not party to the call.
pub struct PortalClient {
    /// Shared HTTP client with connection pooling
    client: Client,
    base_url: String,
    session: Arc<SessionStore>,
    coordinator: Arc<RefreshCoordinator>,
    events: FailureBus,
}

impl PortalClient {
    /// `cookies` is the jar shared with the [`crate::HttpRefresher`]: the
    /// backend sets the durable refresh credential through ordinary portal
    /// responses (sign-in), and the refresh exchange must present it.
    pub fn new(
        config: &ClientConfig,
        session: Arc<SessionStore>,
        coordinator: Arc<RefreshCoordinator>,
        events: FailureBus,
        cookies: Arc<Jar>,
    ) -> Result<Self> {
        let client = Client::builder()
            .cookie_provider(cookies)
            .pool_max_idle_per_host(config.max_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .timeout(Duration::from_secs(config.request_timeout))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            session,
            coordinator,
            events,
        })
    }

    /// Send a request, transparently refreshing the credential once if the
    /// backend rejects it.
    ///
    /// Ordinary successes and ordinary 4xx responses (404, 422, ...) are
    /// returned unchanged; the pipeline has no opinion on them.
    pub async fn send(&self, mut request: PendingRequest) -> Result<Response, ApiError> {
        loop {
            let response = self.dispatch(&request).await?;
            let status = response.status();

            match status.as_u16() {
                401 if !request.has_been_retried => {
                    request.has_been_retried = true;
                    tracing::debug!(
                        path = %request.path,
                        "credential rejected, obtaining a fresh one"
                    );

                    match self.coordinator.obtain_fresh_credential().await {
                        // Next dispatch reads the new credential from the
                        // session store
                        Ok(_) => continue,
                        Err(denied) => {
                            tracing::warn!(
                                path = %request.path,
                                reason = %denied.reason,
                                "refresh denied, session terminated"
                            );
                            return Err(ApiError::AuthExpired);
                        }
                    }
                }

                // Second rejection on the retried attempt; the tag
                // forecloses another refresh cycle
                401 => {
                    tracing::warn!(path = %request.path, "retried request rejected again");
                    return Err(ApiError::AuthExpired);
                }

                503 => {
                    let url = response.url().to_string();
                    let body = response.text().await.unwrap_or_default();

                    if let Some(message) = maintenance_message(&body) {
                        tracing::warn!(url = %url, "backend in maintenance mode");
                        self.events.publish(FailureEvent::Maintenance {
                            message: message.clone(),
                        });
                        return Err(ApiError::Maintenance { message });
                    }

                    // 503 without the maintenance flag is an ordinary
                    // server failure
                    return Err(self.server_error(url, 503, body));
                }

                s if s >= 500 => {
                    let url = response.url().to_string();
                    let body = response.text().await.unwrap_or_default();
                    return Err(self.server_error(url, s, body));
                }

                _ => return Ok(response),
            }
        }
    }

    async fn dispatch(&self, request: &PendingRequest) -> Result<Response, reqwest::Error> {
        let url = format!("{}{}", self.base_url, request.path);

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .headers(request.headers.clone());

        if let Some(credential) = self.session.get().await {
            builder = builder.bearer_auth(credential);
        }

        if let Some(body) = &request.body {
            if !request.headers.contains_key(CONTENT_TYPE) {
                builder = builder.header(CONTENT_TYPE, "application/json");
            }
            builder = builder.body(body.clone());
        }

        tracing::debug!(
            method = %request.method,
            url = %url,
            retried = request.has_been_retried,
            "dispatching request"
        );

        let response = builder.send().await?;

        tracing::debug!(
            status = %response.status(),
            url = %url,
            "received response"
        );

        Ok(response)
    }

    fn server_error(&self, url: String, status: u16, message: String) -> ApiError {
        tracing::error!(
            url = %url,
            status = status,
            message = %message,
            "server-side failure"
        );
        self.events.publish(FailureEvent::ServerError {
            url: url.clone(),
            status,
            message: message.clone(),
        });
        ApiError::ServerError {
            url,
            status,
            message,
        }
    }
}

/// A 503 is the maintenance path only when its JSON body says so
fn maintenance_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    if value.get("maintenance").and_then(|v| v.as_bool()) == Some(true) {
        let message = value
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("scheduled maintenance")
            .to_string();
        Some(message)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_maintenance_flag_detection() {
        let flagged = json!({"maintenance": true, "message": "back at noon"}).to_string();
        assert_eq!(
            maintenance_message(&flagged).as_deref(),
            Some("back at noon")
        );

        let flagged_no_message = json!({"maintenance": true}).to_string();
        assert_eq!(
            maintenance_message(&flagged_no_message).as_deref(),
            Some("scheduled maintenance")
        );

        let unflagged = json!({"error": "overloaded"}).to_string();
        assert_eq!(maintenance_message(&unflagged), None);

        assert_eq!(maintenance_message("not json"), None);
        assert_eq!(maintenance_message(""), None);
    }

    #[test]
    fn test_post_json_body() {
        let request =
            PendingRequest::post_json("/rooms", &json!({"name": "Physics Lab"})).unwrap();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.path, "/rooms");
        assert_eq!(
            request.body.as_deref(),
            Some(br#"{"name":"Physics Lab"}"#.as_slice())
        );
        assert!(!request.has_been_retried);
    }

    #[test]
    fn test_multipart_keeps_caller_content_type() {
        let request = PendingRequest::multipart(
            "/forms/upload",
            "multipart/form-data; boundary=xyz",
            Bytes::from_static(b"--xyz--"),
        )
        .unwrap();
        assert_eq!(
            request.headers.get(CONTENT_TYPE).unwrap(),
            "multipart/form-data; boundary=xyz"
        );
    }

    #[test]
    fn test_header_builder() {
        let request = PendingRequest::get("/rooms")
            .header("x-portal-screen", "rooms")
            .unwrap();
        assert_eq!(request.headers.get("x-portal-screen").unwrap(), "rooms");

        assert!(PendingRequest::get("/rooms")
            .header("bad header", "v")
            .is_err());
    }
}
