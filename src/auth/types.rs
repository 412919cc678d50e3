// Authentication wire types

use serde::Deserialize;

/// Envelope returned by the credential refresh endpoint
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    /// New short-lived access credential
    pub access_token: String,

    /// Rotated durable credential, if the backend rotates it in the body
    /// rather than the cookie. Opaque to this client; logged only.
    pub refresh_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_refresh_response() {
        let json = r#"{"accessToken": "tok-123", "refreshToken": "rot-456"}"#;
        let parsed: RefreshResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.access_token, "tok-123");
        assert_eq!(parsed.refresh_token.as_deref(), Some("rot-456"));
    }

    #[test]
    fn test_parse_without_rotation() {
        let json = r#"{"accessToken": "tok-123"}"#;
        let parsed: RefreshResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.access_token, "tok-123");
        assert!(parsed.refresh_token.is_none());
    }
}
