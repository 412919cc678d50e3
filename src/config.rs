use anyhow::{Context, Result};

/// Client configuration
///
/// Loaded from the environment with `.env` support, or built directly with
/// [`ClientConfig::new`] when the host application wires things up itself.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the portal API, no trailing slash
    pub base_url: String,

    /// Path of the credential refresh endpoint, relative to `base_url`
    pub refresh_path: String,

    // Timeouts (seconds)
    pub connect_timeout: u64,
    pub request_timeout: u64,
    /// Independent deadline for the refresh exchange itself
    pub refresh_timeout: u64,

    /// Connection pool size per host
    pub max_connections: usize,
}

impl ClientConfig {
    /// Build a config with defaults for everything but the base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            refresh_path: "/auth/refresh".to_string(),
            connect_timeout: 10,
            request_timeout: 30,
            refresh_timeout: 15,
            max_connections: 20,
        }
    }

    /// Load configuration from the environment: `.env` file first, then
    /// process env, then defaults. `PORTAL_API_URL` is required.
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let base_url = std::env::var("PORTAL_API_URL")
            .context("PORTAL_API_URL is required (base URL of the portal API)")?;

        let mut config = Self::new(base_url);

        if let Ok(path) = std::env::var("PORTAL_REFRESH_PATH") {
            config.refresh_path = path;
        }
        config.connect_timeout = env_u64("PORTAL_CONNECT_TIMEOUT", config.connect_timeout)?;
        config.request_timeout = env_u64("PORTAL_REQUEST_TIMEOUT", config.request_timeout)?;
        config.refresh_timeout = env_u64("PORTAL_REFRESH_TIMEOUT", config.refresh_timeout)?;
        config.max_connections =
            env_u64("PORTAL_MAX_CONNECTIONS", config.max_connections as u64)? as usize;

        Ok(config)
    }

    /// Absolute URL of the refresh endpoint
    pub fn refresh_url(&self) -> String {
        format!("{}{}", self.base_url, self.refresh_path)
    }
}

fn env_u64(key: &str, default: u64) -> Result<u64> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("{} must be an integer, got '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new("https://portal.example/api");
        assert_eq!(config.refresh_path, "/auth/refresh");
        assert_eq!(config.connect_timeout, 10);
        assert_eq!(config.request_timeout, 30);
        assert_eq!(config.refresh_timeout, 15);
        assert_eq!(config.max_connections, 20);
    }

    #[test]
    fn test_refresh_url() {
        let mut config = ClientConfig::new("https://portal.example/api");
        assert_eq!(
            config.refresh_url(),
            "https://portal.example/api/auth/refresh"
        );

        config.refresh_path = "/session/renew".to_string();
        assert_eq!(
            config.refresh_url(),
            "https://portal.example/api/session/renew"
        );
    }
}
