use crate::core::types::AssetClass;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Spellings the API uses for the same field, canonical name first
const FIELD_ALIASES: &[(&str, &[&str])] = &[
    ("provider", &["provider_name"]),
    ("account_type", &["type"]),
    (
        "websocket_limits_by_asset",
        &["websocket_limits", "websocket_limit"],
    ),
    ("rate_limit_by_asset", &["rate_limits", "rate_limit"]),
];

/// Fields whose object keys are asset-class names rather than field names
pub(crate) fn is_asset_keyed(field: &str) -> bool {
    FIELD_ALIASES
        .iter()
        .filter(|(canonical, _)| canonical.ends_with("_by_asset"))
        .any(|(canonical, aliases)| *canonical == field || aliases.contains(&field))
}

/// Account record as returned by the provider REST API (keys already symbolized)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RawAccountRecord {
    #[serde(deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub subscription_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub provider: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub billing_interval: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub account_type: Option<String>,
    #[serde(deserialize_with = "lenient_bool")]
    pub email_verified: Option<bool>,
    #[serde(deserialize_with = "lenient_string")]
    pub created_at: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub updated_at: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub payment_id: Option<String>,
    #[serde(deserialize_with = "limits_by_asset")]
    pub websocket_limits_by_asset: BTreeMap<AssetClass, u32>,
    #[serde(deserialize_with = "limits_by_asset")]
    pub rate_limit_by_asset: BTreeMap<AssetClass, u32>,
}

impl RawAccountRecord {
    /// Deserialize a symbolized account object.
    ///
    /// Every spelling of a field is folded into its canonical name first; the
    /// first non-null value wins, canonical spelling before aliases.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let value = match value {
            Value::Object(map) => Value::Object(resolve_aliases(map)),
            other => other,
        };
        serde_json::from_value(value)
    }
}

fn resolve_aliases(mut map: Map<String, Value>) -> Map<String, Value> {
    for (canonical, aliases) in FIELD_ALIASES {
        let spellings: Vec<Value> = std::iter::once(*canonical)
            .chain(aliases.iter().copied())
            .filter_map(|name| map.remove(name))
            .collect();
        let chosen = spellings.into_iter().find(|value| !value.is_null());
        if let Some(value) = chosen {
            map.insert((*canonical).to_string(), value);
        }
    }
    map
}

/// One row of the API keys listing; every field may be missing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawKeySummary {
    pub id: Option<String>,
    pub name: Option<String>,
    pub key: Option<String>,
    pub created_at: Option<String>,
}

/// Fields scraped from a key's detail page; each is set only if its marker was found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawKeyDetail {
    pub name: Option<String>,
    pub id: Option<String>,
    pub api_key: Option<String>,
    pub s3_access_key_id: Option<String>,
    pub s3_secret_access_key: Option<String>,
    pub s3_endpoint: Option<String>,
    pub s3_bucket: Option<String>,
}

/// Render a scalar JSON value as text; `null`, arrays and objects are unknown
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_to_string(&value))
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => Some(b),
        Value::String(s) => s.parse().ok(),
        _ => None,
    })
}

/// Keep only entries whose limit is a non-negative integer
fn limits_by_asset<'de, D>(deserializer: D) -> Result<BTreeMap<AssetClass, u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, Value>> = Option::deserialize(deserializer)?;

    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(asset_class, limit)| {
            let limit = match limit {
                Value::Number(n) => n.as_u64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            }?;
            Some((AssetClass::new(asset_class), u32::try_from(limit).ok()?))
        })
        .collect())
}
