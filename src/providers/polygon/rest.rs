use super::conversions::symbolize_keys;
use super::types::RawAccountRecord;
use crate::core::config::SessionConfig;
use crate::core::errors::SessionError;
use crate::core::kernel::{HttpResponse, RestClient};
use crate::core::traits::DashboardSource;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument, warn};

pub const ACCOUNT_ENDPOINT: &str = "/api/v1/account";
pub const KEYS_ENDPOINT: &str = "/dashboard/keys";

/// Key ids come from scraped markup and are encoded as a single path segment
pub fn key_detail_endpoint(key_id: &str) -> String {
    format!("{}/{}", KEYS_ENDPOINT, urlencoding::encode(key_id))
}

/// Thin typed wrapper around `RestClient` for the Polygon dashboard
///
/// Every read validates the session identity first, then treats any transport
/// failure, unsuccessful status or unparseable body as "not available".
#[derive(Clone)]
pub struct PolygonRest<R: RestClient> {
    client: R,
    config: SessionConfig,
}

impl<R: RestClient> PolygonRest<R> {
    pub fn new(client: R, config: SessionConfig) -> Self {
        Self { client, config }
    }

    pub fn account_id(&self) -> &str {
        &self.config.account_id
    }

    /// Account record from the REST API, keys symbolized
    #[instrument(skip(self), fields(provider = "polygon", account_id = %self.config.account_id))]
    pub async fn get_account_record(&self) -> Result<Option<RawAccountRecord>, SessionError> {
        self.config.validate()?;

        let value = match self.client.get_json::<Value>(ACCOUNT_ENDPOINT, true).await {
            Ok(value) => value,
            Err(e) if e.is_invalid_input() => return Err(e),
            Err(e) => {
                warn!("Account record unavailable: {}", e);
                return Ok(None);
            }
        };

        match RawAccountRecord::from_value(symbolize_keys(value)) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!("Account record has an unexpected shape: {}", e);
                Ok(None)
            }
        }
    }

    /// HTML of the API keys listing
    #[instrument(skip(self), fields(provider = "polygon", account_id = %self.config.account_id))]
    pub async fn get_keys_page(&self) -> Result<Option<String>, SessionError> {
        self.config.validate()?;

        Ok(self
            .get_page(KEYS_ENDPOINT)
            .await?
            .map(|response| response.body))
    }

    /// HTML of one key's detail page
    #[instrument(skip(self), fields(provider = "polygon", account_id = %self.config.account_id))]
    pub async fn get_key_detail_page(&self, key_id: &str) -> Result<Option<String>, SessionError> {
        self.config.validate()?;
        SessionError::require("key_id", key_id)?;

        Ok(self
            .get_page(&key_detail_endpoint(key_id))
            .await?
            .map(|response| response.body))
    }

    /// Page response when the status is exactly 200, `None` for anything else
    async fn get_page(&self, endpoint: &str) -> Result<Option<HttpResponse>, SessionError> {
        match self.client.get(endpoint, true).await {
            Ok(response) if response.status == 200 => Ok(Some(response)),
            Ok(response) => {
                debug!("{} answered with status {}", endpoint, response.status);
                Ok(None)
            }
            Err(e) if e.is_invalid_input() => Err(e),
            Err(e) => {
                warn!("Request to {} failed: {}", endpoint, e);
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl<R: RestClient> DashboardSource for PolygonRest<R> {
    type AccountRecord = RawAccountRecord;

    async fn fetch_account_record(&self) -> Result<Option<RawAccountRecord>, SessionError> {
        self.get_account_record().await
    }

    async fn fetch_keys_page(&self) -> Result<Option<String>, SessionError> {
        self.get_keys_page().await
    }

    async fn fetch_key_detail_page(&self, key_id: &str) -> Result<Option<String>, SessionError> {
        self.get_key_detail_page(key_id).await
    }
}
