use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Requests allowed per second when the provider reports no REST limit
pub const UNLIMITED_REQUESTS: u32 = 99;
pub const UNLIMITED_WINDOW_SECONDS: u32 = 1;
/// Reported REST limits are per minute
pub const RATE_LIMIT_WINDOW_SECONDS: u32 = 60;

/// Canonical asset-class identifier (e.g. "stocks", "options")
///
/// The set is open-ended: any key reported by the provider is a valid asset
/// class. Identifiers are trimmed and lowercased on construction so that
/// `"Stocks"`, `" stocks"` and `"stocks"` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct AssetClass(String);

impl AssetClass {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for AssetClass {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for AssetClass {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<AssetClass> for String {
    fn from(value: AssetClass) -> Self {
        value.0
    }
}

impl Borrow<str> for AssetClass {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// REST request budget: `requests` per `window_seconds`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    pub requests: u32,
    pub window_seconds: u32,
}

impl RateLimit {
    /// Derive the budget from the provider's per-asset limit, if any
    pub fn from_reported(limit: Option<u32>) -> Self {
        limit.map_or(Self::unlimited(), Self::per_minute)
    }

    pub const fn per_minute(requests: u32) -> Self {
        Self {
            requests,
            window_seconds: RATE_LIMIT_WINDOW_SECONDS,
        }
    }

    pub const fn unlimited() -> Self {
        Self {
            requests: UNLIMITED_REQUESTS,
            window_seconds: UNLIMITED_WINDOW_SECONDS,
        }
    }
}

/// Derived per-asset-class configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetConfig {
    pub websocket_connection_limit: u32,
    pub rest_rate_limit: RateLimit,
}

/// S3-compatible flat-file credentials attached to an API key
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Credentials {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
}

impl S3Credentials {
    pub const fn is_empty(&self) -> bool {
        self.access_key_id.is_none()
            && self.secret_access_key.is_none()
            && self.endpoint.is_none()
            && self.bucket.is_none()
    }
}

impl fmt::Debug for S3Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Credentials")
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("endpoint", &self.endpoint)
            .field("bucket", &self.bucket)
            .finish()
    }
}

/// One named API key plus its S3 credentials
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3: Option<S3Credentials>,
}

impl CredentialSet {
    /// Case-insensitive name comparison
    pub fn is_named(&self, name: &str) -> bool {
        self.name
            .as_deref()
            .is_some_and(|own| own.eq_ignore_ascii_case(name))
    }
}

impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSet")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("created_at", &self.created_at)
            .field("s3", &self.s3)
            .finish()
    }
}

/// Normalized account: identity, per-asset limits and credential sets
///
/// Built once per session and never mutated afterwards. Every optional field
/// is omitted from the serialized form when unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountModel {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_interval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    pub asset_classes: BTreeSet<AssetClass>,
    pub assets: BTreeMap<AssetClass, AssetConfig>,
    pub credential_sets: Vec<CredentialSet>,
}

impl AccountModel {
    pub fn asset_config(&self, asset_class: &str) -> Option<&AssetConfig> {
        self.assets.get(AssetClass::new(asset_class).as_str())
    }

    /// `None` when the asset class is not part of the account
    pub fn rest_rate_limit(&self, asset_class: &str) -> Option<RateLimit> {
        self.asset_config(asset_class)
            .map(|config| config.rest_rate_limit)
    }

    pub fn rest_rate_limits(&self) -> BTreeMap<AssetClass, RateLimit> {
        self.assets
            .iter()
            .map(|(asset_class, config)| (asset_class.clone(), config.rest_rate_limit))
            .collect()
    }

    /// Zero when the asset class is not part of the account
    pub fn websocket_connection_limit(&self, asset_class: &str) -> u32 {
        self.asset_config(asset_class)
            .map_or(0, |config| config.websocket_connection_limit)
    }

    pub fn primary_credential_set(&self) -> Option<&CredentialSet> {
        crate::core::selection::primary(&self.credential_sets)
    }
}
