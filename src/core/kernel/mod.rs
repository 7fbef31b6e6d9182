/// `polygonx` kernel - transport layer for dashboard sessions
///
/// The kernel contains only transport logic: issuing requests, attaching the
/// session cookie and handing back status, headers and body. Everything that
/// knows about the provider's pages and payloads lives in `providers`.
///
/// ## Transport Layer
/// - `RestClient`: HTTP client interface returning raw `HttpResponse`s
/// - `ReqwestRest`: reqwest-backed implementation
///
/// ## Authentication
/// - `Signer`: pluggable request authentication
/// - `SessionCookieSigner`: replays a dashboard session as a `Cookie` header
///
/// # Example
/// ```rust,no_run
/// use polygonx::core::kernel::*;
/// use secrecy::Secret;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let rest_config = RestClientConfig::new("https://polygon.io".to_string(), "polygon".to_string());
/// let signer = Arc::new(SessionCookieSigner::new(
///     "account-id".to_string(),
///     Secret::new("session-token".to_string()),
/// ));
/// let rest = RestClientBuilder::new(rest_config)
///     .with_signer(signer)
///     .build()?;
///
/// let page = rest.get("/dashboard/keys", true).await?;
/// println!("status {}", page.status);
/// # Ok(())
/// # }
/// ```
pub mod rest;
pub mod signer;

// Re-export key types for convenience
pub use rest::{HttpResponse, ReqwestRest, RestClient, RestClientBuilder, RestClientConfig};
pub use signer::{SessionCookieSigner, SignatureResult, Signer};
