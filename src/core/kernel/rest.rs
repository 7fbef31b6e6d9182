use crate::core::errors::SessionError;
use crate::core::kernel::signer::Signer;
use async_trait::async_trait;
use reqwest::{redirect, Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{instrument, trace};

/// Status, headers and body of a completed HTTP exchange
///
/// Non-2xx responses are returned as values rather than errors so callers can
/// decide what an unsuccessful status means for them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// All values of a header, matched case-insensitively
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// REST client trait for making HTTP requests
///
/// This trait is the transport seam between the provider layer and the
/// network. Implementations attach authentication when asked to and return the
/// raw response.
#[async_trait]
pub trait RestClient: Send + Sync {
    /// Make a GET request
    ///
    /// # Arguments
    /// * `endpoint` - The path, relative to the base URL
    /// * `authenticated` - Whether to attach the session credentials
    async fn get(&self, endpoint: &str, authenticated: bool)
        -> Result<HttpResponse, SessionError>;

    /// Make a form-encoded POST request
    ///
    /// # Arguments
    /// * `endpoint` - The path, relative to the base URL
    /// * `form` - Form fields as key-value pairs
    /// * `headers` - Extra request headers
    /// * `authenticated` - Whether to attach the session credentials
    async fn post_form(
        &self,
        endpoint: &str,
        form: &[(&str, &str)],
        headers: &[(&str, &str)],
        authenticated: bool,
    ) -> Result<HttpResponse, SessionError>;

    /// Make a GET request and deserialize a successful JSON body
    async fn get_json<T: DeserializeOwned + Send>(
        &self,
        endpoint: &str,
        authenticated: bool,
    ) -> Result<T, SessionError> {
        let response = self.get(endpoint, authenticated).await?;
        if !response.is_success() {
            return Err(SessionError::ApiError {
                code: response.status,
                message: response.body,
            });
        }

        Ok(serde_json::from_str(&response.body)?)
    }
}

/// Configuration for the REST client
#[derive(Clone, Debug)]
pub struct RestClientConfig {
    /// Base URL of the dashboard
    pub base_url: String,
    /// Provider name for logging and tracing
    pub provider_name: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string to include in requests
    pub user_agent: String,
}

impl RestClientConfig {
    /// Create a new configuration
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the dashboard
    /// * `provider_name` - Name of the provider
    pub fn new(base_url: String, provider_name: String) -> Self {
        Self {
            base_url,
            provider_name,
            timeout_seconds: 30,
            user_agent: "polygonx/0.1".to_string(),
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }
}

/// Builder for creating REST client instances
pub struct RestClientBuilder {
    config: RestClientConfig,
    signer: Option<Arc<dyn Signer>>,
}

impl RestClientBuilder {
    /// Create a new builder with the given configuration
    pub fn new(config: RestClientConfig) -> Self {
        Self {
            config,
            signer: None,
        }
    }

    /// Set the signer for authenticated requests
    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Build the REST client
    pub fn build(self) -> Result<ReqwestRest, SessionError> {
        // Login answers with a redirect whose Set-Cookie headers must stay visible
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(self.config.timeout_seconds))
            .user_agent(&self.config.user_agent)
            .redirect(redirect::Policy::none())
            .build()?;

        Ok(ReqwestRest {
            client,
            config: self.config,
            signer: self.signer,
        })
    }
}

/// Implementation of `RestClient` using reqwest
#[derive(Clone)]
pub struct ReqwestRest {
    client: Client,
    config: RestClientConfig,
    signer: Option<Arc<dyn Signer>>,
}

impl std::fmt::Debug for ReqwestRest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestRest")
            .field("config", &self.config)
            .field("has_signer", &self.signer.is_some())
            .finish_non_exhaustive()
    }
}

impl ReqwestRest {
    /// Create a new `ReqwestRest` instance with default settings
    pub fn new(
        base_url: String,
        provider_name: String,
        signer: Option<Arc<dyn Signer>>,
    ) -> Result<Self, SessionError> {
        let config = RestClientConfig::new(base_url, provider_name);
        let mut builder = RestClientBuilder::new(config);
        if let Some(signer) = signer {
            builder = builder.with_signer(signer);
        }
        builder.build()
    }

    pub fn config(&self) -> &RestClientConfig {
        &self.config
    }

    /// Build the full URL for an endpoint
    fn build_url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return endpoint.to_string();
        }
        format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint)
    }

    fn authenticate(
        &self,
        mut request: RequestBuilder,
        method: &Method,
        endpoint: &str,
    ) -> Result<RequestBuilder, SessionError> {
        let signer = self.signer.as_ref().ok_or_else(|| {
            SessionError::AuthError("Authentication required but no signer provided".to_string())
        })?;

        for (key, value) in signer.sign_request(method.as_str(), endpoint)? {
            request = request.header(&key, &value);
        }
        Ok(request)
    }

    /// Collect status, headers and body
    #[instrument(skip(self, response), fields(provider = %self.config.provider_name, status = %response.status()))]
    async fn handle_response(&self, response: Response) -> Result<HttpResponse, SessionError> {
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.text().await.map_err(|e| {
            SessionError::NetworkError(format!("Failed to read response body: {}", e))
        })?;

        trace!("Response body: {}", body);

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    async fn send(&self, request: RequestBuilder) -> Result<HttpResponse, SessionError> {
        let response = request
            .send()
            .await
            .map_err(|e| SessionError::NetworkError(format!("Request failed: {}", e)))?;

        self.handle_response(response).await
    }
}

#[async_trait]
impl RestClient for ReqwestRest {
    #[instrument(skip(self), fields(provider = %self.config.provider_name))]
    async fn get(
        &self,
        endpoint: &str,
        authenticated: bool,
    ) -> Result<HttpResponse, SessionError> {
        let mut request = self.client.get(self.build_url(endpoint));
        if authenticated {
            request = self.authenticate(request, &Method::GET, endpoint)?;
        }

        self.send(request).await
    }

    #[instrument(skip(self, form, headers), fields(provider = %self.config.provider_name, field_count = form.len()))]
    async fn post_form(
        &self,
        endpoint: &str,
        form: &[(&str, &str)],
        headers: &[(&str, &str)],
        authenticated: bool,
    ) -> Result<HttpResponse, SessionError> {
        let mut request = self.client.post(self.build_url(endpoint)).form(form);
        for (key, value) in headers {
            request = request.header(*key, *value);
        }
        if authenticated {
            request = self.authenticate(request, &Method::POST, endpoint)?;
        }

        self.send(request).await
    }
}
