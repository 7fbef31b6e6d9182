use crate::core::errors::SessionError;
use async_trait::async_trait;

/// Authenticated dashboard reads the session is assembled from.
///
/// `Ok(None)` means the data was not available (failed request, non-2xx
/// status, unparseable body). `Err` is reserved for caller mistakes such as a
/// missing account id or token.
#[async_trait]
pub trait DashboardSource: Send + Sync {
    /// Provider-specific shape of the account record
    type AccountRecord: Send;

    /// Account record from the provider REST API
    async fn fetch_account_record(&self) -> Result<Option<Self::AccountRecord>, SessionError>;

    /// Server-rendered HTML of the API keys listing
    async fn fetch_keys_page(&self) -> Result<Option<String>, SessionError>;

    /// Server-rendered HTML of a single key's detail page
    async fn fetch_key_detail_page(&self, key_id: &str) -> Result<Option<String>, SessionError>;
}
