use crate::core::{
    config::{LoginCredentials, SessionConfig},
    errors::SessionError,
    kernel::{ReqwestRest, RestClientBuilder, RestClientConfig, SessionCookieSigner},
};
use crate::providers::polygon::{
    auth::{PolygonAuth, Session},
    connector::PolygonSession,
    rest::PolygonRest,
};
use std::sync::Arc;

pub const DEFAULT_BASE_URL: &str = "https://polygon.io";
pub const PROVIDER_NAME: &str = "polygon";

/// Session backed by the reqwest transport
pub type PolygonClient = PolygonSession<PolygonRest<ReqwestRest>>;

fn rest_config(base_url: Option<&str>) -> RestClientConfig {
    RestClientConfig::new(
        base_url.unwrap_or(DEFAULT_BASE_URL).to_string(),
        PROVIDER_NAME.to_string(),
    )
    .with_timeout(30)
}

/// Create a session for an existing account id and token
pub fn build_session(config: SessionConfig) -> Result<PolygonClient, SessionError> {
    config.validate()?;

    let signer =
        SessionCookieSigner::new(config.account_id.clone(), config.token.clone());
    let rest = RestClientBuilder::new(rest_config(config.base_url.as_deref()))
        .with_signer(Arc::new(signer))
        .build()?;

    PolygonSession::new(config.clone(), PolygonRest::new(rest, config))
}

/// Run the login handshake against the dashboard
pub async fn login(
    credentials: &LoginCredentials,
    base_url: Option<&str>,
) -> Result<Option<Session>, SessionError> {
    credentials.validate()?;

    let rest = RestClientBuilder::new(rest_config(base_url)).build()?;
    PolygonAuth::new(rest).login(credentials).await
}

/// Log in, then create a session for the resulting account
///
/// `Ok(None)` when the login did not produce a session.
pub async fn login_and_build(
    credentials: &LoginCredentials,
    base_url: Option<String>,
) -> Result<Option<PolygonClient>, SessionError> {
    let Some(session) = login(credentials, base_url.as_deref()).await? else {
        return Ok(None);
    };

    build_session(session.into_config(base_url)).map(Some)
}
