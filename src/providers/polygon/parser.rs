//! Pattern-based parsing of extracted dashboard payloads into raw key records.
//!
//! Both entry points work on the text produced by [`super::payload::extract`],
//! not on raw HTML. Every marker is matched independently; a missing marker
//! leaves the corresponding field unset.

use super::types::{scalar_to_string, RawKeyDetail, RawKeySummary};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::debug;

const ROWS_MARKER: &str = r#""rows":["#;

static ROWS_LAZY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)"rows":(\[.*?\])"#).expect("rows pattern is valid"));
static BARE_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""key":"([A-Za-z0-9_-]{30,})""#).expect("bare key pattern is valid")
});
static NAME_AND_KEY_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""name":"([^"]*)","keyId":"([^"]*)""#).expect("name/keyId pattern is valid")
});
static ACCESS_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""accessKey":"([^"]*)""#).expect("accessKey pattern is valid"));
static S3_ACCESS_KEY_ID: Lazy<Regex> = Lazy::new(|| labelled_children("Access Key ID"));
static S3_SECRET_ACCESS_KEY: Lazy<Regex> = Lazy::new(|| labelled_children("Secret Access Key"));
static S3_ENDPOINT: Lazy<Regex> = Lazy::new(|| labelled_children("S3 Endpoint"));
static S3_BUCKET: Lazy<Regex> = Lazy::new(|| labelled_children("Bucket"));

/// `"<label>"` followed, anywhere later, by the nearest `"children":"<value>"`
fn labelled_children(label: &str) -> Regex {
    Regex::new(&format!(
        r#"(?s)"{}".*?"children":"([^"]*)""#,
        regex::escape(label)
    ))
    .expect("labelled children pattern is valid")
}

fn first_capture(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}

/// Parse the key listing.
///
/// Prefers the `"rows":[...]` table embedded in the payload. When that is
/// missing or does not parse, falls back to every distinct bare
/// `"key":"<30+ chars>"` in the text, in first-seen order, with all other
/// fields unknown.
pub fn parse_key_summaries(payload: &str) -> Vec<RawKeySummary> {
    if let Some(rows) = parse_rows(payload) {
        return rows;
    }

    let mut seen = HashSet::new();
    BARE_KEY
        .captures_iter(payload)
        .filter_map(|captures| captures.get(1))
        .map(|m| m.as_str())
        .filter(|key| seen.insert(*key))
        .map(|key| RawKeySummary {
            key: Some(key.to_string()),
            ..RawKeySummary::default()
        })
        .collect()
}

fn parse_rows(payload: &str) -> Option<Vec<RawKeySummary>> {
    let rows_text = rows_span(payload)?;

    match serde_json::from_str::<Vec<Value>>(rows_text) {
        Ok(rows) => Some(
            rows.iter()
                .filter_map(Value::as_object)
                .map(summary_from_row)
                .collect(),
        ),
        Err(e) => {
            debug!("Key rows did not parse, falling back to bare keys: {}", e);
            None
        }
    }
}

/// Text of the first `"rows"` array.
///
/// Takes the bracket-balanced span when the array is complete, which keeps
/// nested arrays inside a row intact; a truncated array falls back to the
/// shortest `[...]` span.
fn rows_span(payload: &str) -> Option<&str> {
    let start = payload.find(ROWS_MARKER)? + ROWS_MARKER.len() - 1;

    balanced_array(&payload[start..]).or_else(|| {
        ROWS_LAZY
            .captures(payload)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str())
    })
}

fn balanced_array(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (index, byte) in text.bytes().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'[' => depth += 1,
            b']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[..=index]);
                }
            }
            _ => {}
        }
    }

    None
}

fn summary_from_row(row: &Map<String, Value>) -> RawKeySummary {
    let field = |names: &[&str]| {
        names
            .iter()
            .find_map(|name| row.get(*name).and_then(scalar_to_string))
    };

    RawKeySummary {
        id: field(&["id", "keyId"]),
        name: field(&["name"]),
        key: field(&["key", "accessKey"]),
        created_at: field(&["created_at", "createdAt", "created"]),
    }
}

/// Parse a single key's detail page payload
pub fn parse_key_detail(payload: &str) -> RawKeyDetail {
    let (name, id) = parse_name_and_id(payload);

    RawKeyDetail {
        name,
        id,
        api_key: parse_api_key(payload),
        s3_access_key_id: parse_s3_access_key_id(payload),
        s3_secret_access_key: parse_s3_secret_access_key(payload),
        s3_endpoint: parse_s3_endpoint(payload),
        s3_bucket: parse_s3_bucket(payload),
    }
}

/// `"name":"<name>","keyId":"<id>"`
pub fn parse_name_and_id(payload: &str) -> (Option<String>, Option<String>) {
    NAME_AND_KEY_ID.captures(payload).map_or((None, None), |captures| {
        (
            captures.get(1).map(|m| m.as_str().to_string()),
            captures.get(2).map(|m| m.as_str().to_string()),
        )
    })
}

pub fn parse_api_key(payload: &str) -> Option<String> {
    first_capture(&ACCESS_KEY, payload)
}

pub fn parse_s3_access_key_id(payload: &str) -> Option<String> {
    first_capture(&S3_ACCESS_KEY_ID, payload)
}

pub fn parse_s3_secret_access_key(payload: &str) -> Option<String> {
    first_capture(&S3_SECRET_ACCESS_KEY, payload)
}

pub fn parse_s3_endpoint(payload: &str) -> Option<String> {
    first_capture(&S3_ENDPOINT, payload)
}

pub fn parse_s3_bucket(payload: &str) -> Option<String> {
    first_capture(&S3_BUCKET, payload)
}
