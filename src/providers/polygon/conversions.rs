use super::types::{is_asset_keyed, RawAccountRecord, RawKeyDetail, RawKeySummary};
use crate::core::types::{
    AccountModel, AssetClass, AssetConfig, CredentialSet, RateLimit, S3Credentials,
};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Sorted, duplicate-free union of both limit maps' asset classes
pub fn asset_classes(raw: &RawAccountRecord) -> BTreeSet<AssetClass> {
    raw.websocket_limits_by_asset
        .keys()
        .chain(raw.rate_limit_by_asset.keys())
        .cloned()
        .collect()
}

/// Derive one asset class's configuration from the reported limits
pub fn asset_config(raw: &RawAccountRecord, asset_class: &AssetClass) -> AssetConfig {
    AssetConfig {
        websocket_connection_limit: raw
            .websocket_limits_by_asset
            .get(asset_class)
            .copied()
            .unwrap_or(0),
        rest_rate_limit: RateLimit::from_reported(raw.rate_limit_by_asset.get(asset_class).copied()),
    }
}

/// Combine a listing row with its detail page.
///
/// Listing fields win; the detail page fills whatever the listing lacked.
/// The `s3` block is dropped entirely when none of its fields were found.
pub fn convert_credential_set(
    summary: &RawKeySummary,
    detail: Option<&RawKeyDetail>,
) -> CredentialSet {
    let detail_field =
        |pick: fn(&RawKeyDetail) -> &Option<String>| detail.and_then(|d| pick(d).clone());

    let s3 = S3Credentials {
        access_key_id: detail_field(|d| &d.s3_access_key_id),
        secret_access_key: detail_field(|d| &d.s3_secret_access_key),
        endpoint: detail_field(|d| &d.s3_endpoint),
        bucket: detail_field(|d| &d.s3_bucket),
    };

    CredentialSet {
        id: summary.id.clone().or_else(|| detail_field(|d| &d.id)),
        name: summary.name.clone().or_else(|| detail_field(|d| &d.name)),
        api_key: summary.key.clone().or_else(|| detail_field(|d| &d.api_key)),
        created_at: summary.created_at.clone(),
        s3: (!s3.is_empty()).then_some(s3),
    }
}

/// Merge the API account record and the scraped keys into one account model.
///
/// A missing record (the API fetch failed) yields no asset classes but still
/// keeps every credential set. `detail_lookup` is called once per listing row
/// that carries an id, in listing order.
pub fn normalize<F>(
    raw: Option<&RawAccountRecord>,
    summaries: &[RawKeySummary],
    mut detail_lookup: F,
) -> AccountModel
where
    F: FnMut(&str) -> Option<RawKeyDetail>,
{
    let empty = RawAccountRecord::default();
    let raw = raw.unwrap_or(&empty);

    let asset_classes = asset_classes(raw);
    let assets: BTreeMap<AssetClass, AssetConfig> = asset_classes
        .iter()
        .map(|asset_class| (asset_class.clone(), asset_config(raw, asset_class)))
        .collect();

    let credential_sets = summaries
        .iter()
        .map(|summary| {
            let detail = summary.id.as_deref().and_then(&mut detail_lookup);
            convert_credential_set(summary, detail.as_ref())
        })
        .collect();

    AccountModel {
        id: raw.id.clone(),
        email: raw.email.clone(),
        subscription_id: raw.subscription_id.clone(),
        provider: raw.provider.clone(),
        billing_interval: raw.billing_interval.clone(),
        account_type: raw.account_type.clone(),
        email_verified: raw.email_verified,
        created_at: raw.created_at.clone(),
        updated_at: raw.updated_at.clone(),
        payment_id: raw.payment_id.clone(),
        asset_classes,
        assets,
        credential_sets,
    }
}

/// Recursively rewrite every object key into its canonical snake_case form
///
/// `"websocketLimits"`, `"Websocket-Limits"` and `"websocket_limits"` all
/// become `"websocket_limits"`. Keys of the per-asset limit maps are asset-class
/// names and keep the provider's spelling. When two keys collapse into the same
/// symbol, the first non-null value is kept.
pub fn symbolize_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut symbolized = Map::with_capacity(map.len());
            for (key, value) in map {
                let key = symbolize_key(&key);
                let value = if is_asset_keyed(&key) {
                    value
                } else {
                    symbolize_keys(value)
                };
                match symbolized.get(&key) {
                    Some(existing) if !existing.is_null() => {}
                    _ => {
                        symbolized.insert(key, value);
                    }
                }
            }
            Value::Object(symbolized)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(symbolize_keys).collect()),
        other => other,
    }
}

fn symbolize_key(key: &str) -> String {
    let mut symbol = String::with_capacity(key.len() + 4);
    let mut previous: Option<char> = None;

    for c in key.trim().chars() {
        if c == '-' || c == ' ' || c == '.' {
            if !symbol.ends_with('_') {
                symbol.push('_');
            }
        } else if c.is_uppercase() {
            if previous.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit()) {
                symbol.push('_');
            }
            symbol.extend(c.to_lowercase());
        } else {
            symbol.push(c);
        }
        previous = Some(c);
    }

    symbol
}
