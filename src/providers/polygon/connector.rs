use super::conversions;
use super::parser;
use super::payload;
use super::types::{RawAccountRecord, RawKeyDetail, RawKeySummary};
use crate::core::config::SessionConfig;
use crate::core::errors::SessionError;
use crate::core::traits::DashboardSource;
use crate::core::types::{AccountModel, AssetClass, CredentialSet, RateLimit};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

/// Authenticated view of one Polygon account
///
/// The account model is assembled on first use (one API call, one keys page,
/// then one detail page per key, strictly in sequence) and cached for the
/// lifetime of the session. Build a new session to refresh it.
pub struct PolygonSession<S: DashboardSource> {
    config: SessionConfig,
    source: S,
    account: OnceCell<AccountModel>,
}

impl<S> PolygonSession<S>
where
    S: DashboardSource<AccountRecord = RawAccountRecord>,
{
    /// Rejects a config without account id or token
    pub fn new(config: SessionConfig, source: S) -> Result<Self, SessionError> {
        config.validate()?;

        Ok(Self {
            config,
            source,
            account: OnceCell::new(),
        })
    }

    pub fn account_id(&self) -> &str {
        &self.config.account_id
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Account model, fetched on the first call and cached afterwards.
    ///
    /// Concurrent first callers share a single fetch.
    pub async fn account_info(&self) -> Result<&AccountModel, SessionError> {
        self.account
            .get_or_try_init(|| self.load_account())
            .await
    }

    pub async fn asset_classes(&self) -> Result<&BTreeSet<AssetClass>, SessionError> {
        Ok(&self.account_info().await?.asset_classes)
    }

    /// `None` when the account has no such asset class
    pub async fn rest_rate_limit(
        &self,
        asset_class: &str,
    ) -> Result<Option<RateLimit>, SessionError> {
        Ok(self.account_info().await?.rest_rate_limit(asset_class))
    }

    pub async fn rest_rate_limits(&self) -> Result<BTreeMap<AssetClass, RateLimit>, SessionError> {
        Ok(self.account_info().await?.rest_rate_limits())
    }

    /// Zero when the account has no such asset class
    pub async fn websocket_connection_limit(&self, asset_class: &str) -> Result<u32, SessionError> {
        Ok(self
            .account_info()
            .await?
            .websocket_connection_limit(asset_class))
    }

    pub async fn credential_sets(&self) -> Result<&[CredentialSet], SessionError> {
        Ok(&self.account_info().await?.credential_sets)
    }

    pub async fn primary_credential_set(&self) -> Result<Option<&CredentialSet>, SessionError> {
        Ok(self.account_info().await?.primary_credential_set())
    }

    /// Scrape the keys listing; empty when the page is unavailable
    #[instrument(skip(self), fields(provider = "polygon", account_id = %self.config.account_id))]
    pub async fn fetch_key_summaries(&self) -> Result<Vec<RawKeySummary>, SessionError> {
        let Some(html) = self.source.fetch_keys_page().await? else {
            warn!("Keys page unavailable");
            return Ok(Vec::new());
        };

        let summaries = parser::parse_key_summaries(&payload::extract(&html));
        debug!("Found {} keys", summaries.len());
        Ok(summaries)
    }

    /// Scrape one key's detail page; empty detail when the page is unavailable
    #[instrument(skip(self), fields(provider = "polygon", account_id = %self.config.account_id))]
    pub async fn fetch_key_detail(&self, key_id: &str) -> Result<RawKeyDetail, SessionError> {
        match self.source.fetch_key_detail_page(key_id).await? {
            Some(html) => Ok(parser::parse_key_detail(&payload::extract(&html))),
            None => {
                warn!("Detail page for key {} unavailable", key_id);
                Ok(RawKeyDetail::default())
            }
        }
    }

    #[instrument(skip(self), fields(provider = "polygon", account_id = %self.config.account_id))]
    async fn load_account(&self) -> Result<AccountModel, SessionError> {
        let record = self.source.fetch_account_record().await?;
        if record.is_none() {
            warn!("Account record unavailable, continuing with scraped keys only");
        }

        let summaries = self.fetch_key_summaries().await?;

        let mut details: HashMap<String, RawKeyDetail> = HashMap::new();
        for key_id in summaries.iter().filter_map(|summary| summary.id.as_deref()) {
            if key_id.trim().is_empty() || details.contains_key(key_id) {
                continue;
            }
            let detail = self.fetch_key_detail(key_id).await?;
            details.insert(key_id.to_string(), detail);
        }

        let account = conversions::normalize(record.as_ref(), &summaries, |key_id| {
            details.get(key_id).cloned()
        });
        info!(
            asset_classes = account.asset_classes.len(),
            credential_sets = account.credential_sets.len(),
            "Account loaded"
        );
        Ok(account)
    }
}
