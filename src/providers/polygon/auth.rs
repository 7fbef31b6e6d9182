use crate::core::config::{LoginCredentials, SessionConfig};
use crate::core::errors::SessionError;
use crate::core::kernel::signer::{SESSION_COOKIE, SESSION_SIG_COOKIE};
use crate::core::kernel::{HttpResponse, RestClient, SessionCookieSigner};
use once_cell::sync::Lazy;
use regex::Regex;
use secrecy::Secret;
use tracing::{debug, instrument, warn};

pub const LOGIN_ENDPOINT: &str = "/login";

static MARKUP_ACTION_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\$ACTION_ID_([0-9a-fA-F]{32,})"#).expect("markup action id pattern is valid")
});
static SCRIPT_ACTION_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"createServerReference\)?\(\s*"([0-9a-fA-F]{32,})""#)
        .expect("script action id pattern is valid")
});
static SCRIPT_SOURCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<script[^>]*\ssrc="([^"]*/_next/static/[^"]+\.js[^"]*)""#)
        .expect("script source pattern is valid")
});

/// Account id and token recovered from a successful login
#[derive(Debug, Clone)]
pub struct Session {
    pub account_id: String,
    pub token: Secret<String>,
}

impl Session {
    pub fn into_config(self, base_url: Option<String>) -> SessionConfig {
        SessionConfig {
            account_id: self.account_id,
            token: self.token,
            base_url,
        }
    }
}

/// Dashboard login handshake
///
/// The login form posts to a server action whose id is only published in the
/// page markup or in one of its script chunks, so the id is discovered first.
pub struct PolygonAuth<R: RestClient> {
    rest: R,
}

impl<R: RestClient> PolygonAuth<R> {
    pub fn new(rest: R) -> Self {
        Self { rest }
    }

    /// Log in with email and password.
    ///
    /// Returns `Ok(None)` when the handshake does not produce a session.
    #[instrument(skip(self, credentials), fields(provider = "polygon", email = %credentials.email))]
    pub async fn login(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<Option<Session>, SessionError> {
        credentials.validate()?;

        let Some(action_id) = self.discover_action_id().await else {
            warn!("No login server action found");
            return Ok(None);
        };
        debug!("Using login server action {}", action_id);

        let action_field = format!("$ACTION_ID_{}", action_id);
        let form = [
            ("email", credentials.email.as_str()),
            ("password", credentials.password()),
            (action_field.as_str(), ""),
        ];
        let headers = [
            ("Next-Action", action_id.as_str()),
            ("Accept", "text/x-component"),
        ];

        match self
            .rest
            .post_form(LOGIN_ENDPOINT, &form, &headers, false)
            .await
        {
            Ok(response) => {
                let session = session_from_cookies(&response);
                if session.is_none() {
                    warn!(
                        "Login answered {} without session cookies",
                        response.status
                    );
                }
                Ok(session)
            }
            Err(e) => {
                warn!("Login request failed: {}", e);
                Ok(None)
            }
        }
    }

    /// Server action id from the login page markup, else from its script chunks
    async fn discover_action_id(&self) -> Option<String> {
        let page = self.fetch_ok(LOGIN_ENDPOINT).await?;
        if let Some(action_id) = action_id_from_markup(&page.body) {
            return Some(action_id);
        }

        for source in script_sources(&page.body) {
            let Some(script) = self.fetch_ok(&source).await else {
                continue;
            };
            if let Some(action_id) = action_id_from_script(&script.body) {
                return Some(action_id);
            }
        }

        None
    }

    async fn fetch_ok(&self, endpoint: &str) -> Option<HttpResponse> {
        match self.rest.get(endpoint, false).await {
            Ok(response) if response.is_success() => Some(response),
            Ok(response) => {
                debug!("{} answered with status {}", endpoint, response.status);
                None
            }
            Err(e) => {
                debug!("Request to {} failed: {}", endpoint, e);
                None
            }
        }
    }
}

pub fn action_id_from_markup(html: &str) -> Option<String> {
    MARKUP_ACTION_ID
        .captures(html)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn action_id_from_script(script: &str) -> Option<String> {
    SCRIPT_ACTION_ID
        .captures(script)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}

/// Next.js chunk script URLs referenced by a page, in document order
pub fn script_sources(html: &str) -> Vec<String> {
    SCRIPT_SOURCE
        .captures_iter(html)
        .filter_map(|captures| captures.get(1))
        .map(|m| m.as_str().replace("&amp;", "&"))
        .collect()
}

/// Rebuild the session from the `Set-Cookie` headers of the login response
pub fn session_from_cookies(response: &HttpResponse) -> Option<Session> {
    let mut session_value = None;
    let mut token = None;

    for header in response.header_values("set-cookie") {
        let Some((name, value)) = header
            .split(';')
            .next()
            .and_then(|pair| pair.split_once('='))
        else {
            continue;
        };

        match name.trim() {
            SESSION_COOKIE => session_value = Some(value.trim().to_string()),
            SESSION_SIG_COOKIE => token = Some(value.trim().to_string()),
            _ => {}
        }
    }

    let account_id = SessionCookieSigner::decode_session(&session_value?)?;
    let token = token.filter(|token| !token.is_empty())?;

    Some(Session {
        account_id,
        token: Secret::new(token),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const ACTION_ID: &str = "7f3a9c0e5b1d2f4a6c8e0b1d3f5a7c9e1b3d5f70";

    #[derive(Default)]
    struct StubRest {
        pages: HashMap<String, HttpResponse>,
        login_response: Option<HttpResponse>,
        posted: Mutex<Vec<(Vec<(String, String)>, Vec<(String, String)>)>>,
    }

    #[async_trait]
    impl RestClient for StubRest {
        async fn get(
            &self,
            endpoint: &str,
            _authenticated: bool,
        ) -> Result<HttpResponse, SessionError> {
            Ok(self
                .pages
                .get(endpoint)
                .cloned()
                .unwrap_or_else(|| HttpResponse::new(404, "")))
        }

        async fn post_form(
            &self,
            _endpoint: &str,
            form: &[(&str, &str)],
            headers: &[(&str, &str)],
            _authenticated: bool,
        ) -> Result<HttpResponse, SessionError> {
            let owned = |pairs: &[(&str, &str)]| {
                pairs
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                    .collect::<Vec<_>>()
            };
            self.posted.lock().unwrap().push((owned(form), owned(headers)));
            self.login_response
                .clone()
                .ok_or_else(|| SessionError::NetworkError("no login response".to_string()))
        }
    }

    fn login_cookies(account_id: &str, token: &str) -> HttpResponse {
        HttpResponse::new(303, "")
            .with_header(
                "set-cookie",
                &format!(
                    "session={}; path=/; httponly",
                    SessionCookieSigner::encode_session(account_id)
                ),
            )
            .with_header("set-cookie", &format!("session.sig={}; path=/; httponly", token))
            .with_header("set-cookie", "theme=dark; path=/")
    }

    fn credentials() -> LoginCredentials {
        LoginCredentials::new("trader@example.com".to_string(), "hunter2".to_string())
    }

    #[test]
    fn test_action_id_discovery_patterns() {
        let markup = format!(r#"<input type="hidden" name="$ACTION_ID_{}"/>"#, ACTION_ID);
        assert_eq!(action_id_from_markup(&markup).as_deref(), Some(ACTION_ID));

        let script = format!(r#"let l=(0,s.createServerReference)("{}",s.callServer)"#, ACTION_ID);
        assert_eq!(action_id_from_script(&script).as_deref(), Some(ACTION_ID));

        assert!(action_id_from_markup("<form></form>").is_none());
    }

    #[test]
    fn test_script_sources() {
        let html = r#"<script src="/_next/static/chunks/app/login/page-abc.js" async=""></script>
            <script src="https://cdn.example.com/other.js"></script>
            <script defer src="/_next/static/chunks/main.js?dpl=1&amp;v=2"></script>"#;

        assert_eq!(
            script_sources(html),
            vec![
                "/_next/static/chunks/app/login/page-abc.js".to_string(),
                "/_next/static/chunks/main.js?dpl=1&v=2".to_string(),
            ]
        );
    }

    #[test]
    fn test_session_from_cookies() {
        let session = session_from_cookies(&login_cookies("acct-7", "tok-7")).unwrap();
        assert_eq!(session.account_id, "acct-7");
        assert_eq!(session.token.expose_secret(), "tok-7");

        assert!(session_from_cookies(&HttpResponse::new(200, "")).is_none());
    }

    #[tokio::test]
    async fn test_login_via_script_chunk() {
        let mut stub = StubRest::default();
        stub.pages.insert(
            LOGIN_ENDPOINT.to_string(),
            HttpResponse::new(
                200,
                r#"<html><script src="/_next/static/chunks/login.js"></script></html>"#,
            ),
        );
        stub.pages.insert(
            "/_next/static/chunks/login.js".to_string(),
            HttpResponse::new(200, format!(r#"createServerReference)("{}")"#, ACTION_ID)),
        );
        stub.login_response = Some(login_cookies("acct-9", "tok-9"));
        let auth = PolygonAuth::new(stub);

        let session = auth.login(&credentials()).await.unwrap().unwrap();
        assert_eq!(session.account_id, "acct-9");
        assert_eq!(session.token.expose_secret(), "tok-9");

        let posted = auth.rest.posted.lock().unwrap();
        let (form, headers) = &posted[0];
        assert!(form.contains(&("email".to_string(), "trader@example.com".to_string())));
        assert!(form.contains(&(format!("$ACTION_ID_{}", ACTION_ID), String::new())));
        assert!(headers.contains(&("Next-Action".to_string(), ACTION_ID.to_string())));
    }

    #[tokio::test]
    async fn test_login_without_action_id_is_soft_failure() {
        let mut stub = StubRest::default();
        stub.pages
            .insert(LOGIN_ENDPOINT.to_string(), HttpResponse::new(200, "<html></html>"));
        let auth = PolygonAuth::new(stub);

        assert!(auth.login(&credentials()).await.unwrap().is_none());
        assert!(auth.rest.posted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_login_rejects_blank_credentials() {
        let auth = PolygonAuth::new(StubRest::default());
        let err = auth
            .login(&LoginCredentials::new(String::new(), "pw".to_string()))
            .await
            .unwrap_err();
        assert!(err.is_invalid_input());
    }
}
