use crate::core::errors::SessionError;
use base64::engine::general_purpose;
use base64::Engine;
use secrecy::{ExposeSecret, Secret};
use std::collections::HashMap;

/// Cookie carrying the base64 JSON `{"id": <account id>}`
pub const SESSION_COOKIE: &str = "session";
/// Cookie carrying the raw session token
pub const SESSION_SIG_COOKIE: &str = "session.sig";

/// Result type for signing operations: headers to attach to the request
pub type SignatureResult = Result<HashMap<String, String>, SessionError>;

/// Signer trait for request authentication
///
/// Implementations turn a request description into the headers that
/// authenticate it.
pub trait Signer: Send + Sync {
    /// Produce the authentication headers for a request
    ///
    /// # Arguments
    /// * `method` - HTTP method (GET, POST, etc.)
    /// * `endpoint` - Path of the request, relative to the base URL
    fn sign_request(&self, method: &str, endpoint: &str) -> SignatureResult;
}

/// Replays a dashboard session as a cookie header
pub struct SessionCookieSigner {
    account_id: String,
    token: Secret<String>,
}

impl SessionCookieSigner {
    pub fn new(account_id: String, token: Secret<String>) -> Self {
        Self { account_id, token }
    }

    /// Encode the session cookie value for an account id
    pub fn encode_session(account_id: &str) -> String {
        let payload = serde_json::json!({ "id": account_id });
        general_purpose::STANDARD.encode(payload.to_string())
    }

    /// Decode the account id back out of a session cookie value
    pub fn decode_session(value: &str) -> Option<String> {
        let bytes = general_purpose::STANDARD
            .decode(value.trim())
            .or_else(|_| general_purpose::URL_SAFE.decode(value.trim()))
            .ok()?;
        let payload: serde_json::Value = serde_json::from_slice(&bytes).ok()?;

        match payload.get("id")? {
            serde_json::Value::String(id) => Some(id.clone()),
            serde_json::Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }

    /// Full `Cookie` header value
    pub fn cookie_header(&self) -> String {
        format!(
            "{}={}; {}={}",
            SESSION_COOKIE,
            Self::encode_session(&self.account_id),
            SESSION_SIG_COOKIE,
            self.token.expose_secret()
        )
    }
}

impl Signer for SessionCookieSigner {
    fn sign_request(&self, _method: &str, _endpoint: &str) -> SignatureResult {
        SessionError::require("account_id", &self.account_id)?;
        SessionError::require("token", self.token.expose_secret())?;

        let mut headers = HashMap::new();
        headers.insert("Cookie".to_string(), self.cookie_header());
        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer(account_id: &str, token: &str) -> SessionCookieSigner {
        SessionCookieSigner::new(account_id.to_string(), Secret::new(token.to_string()))
    }

    #[test]
    fn test_cookie_header_format() {
        let headers = signer("acct-42", "tok-abc")
            .sign_request("GET", "/dashboard/keys")
            .unwrap();
        let cookie = headers.get("Cookie").unwrap();

        let expected_session = general_purpose::STANDARD.encode(r#"{"id":"acct-42"}"#);
        assert_eq!(
            cookie,
            &format!("session={}; session.sig=tok-abc", expected_session)
        );
    }

    #[test]
    fn test_session_round_trip() {
        let encoded = SessionCookieSigner::encode_session("acct-42");
        assert_eq!(
            SessionCookieSigner::decode_session(&encoded).as_deref(),
            Some("acct-42")
        );
    }

    #[test]
    fn test_decode_numeric_id_and_garbage() {
        let encoded = general_purpose::STANDARD.encode(r#"{"id":1234}"#);
        assert_eq!(
            SessionCookieSigner::decode_session(&encoded).as_deref(),
            Some("1234")
        );
        assert!(SessionCookieSigner::decode_session("not base64 !!").is_none());
    }

    #[test]
    fn test_sign_rejects_empty_identity() {
        let err = signer("", "tok").sign_request("GET", "/").unwrap_err();
        assert!(err.is_invalid_input());

        let err = signer("acct", "").sign_request("GET", "/").unwrap_err();
        assert!(err.is_invalid_input());
    }
}
