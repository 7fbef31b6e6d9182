//! Recovery of streaming-chunk payloads from server-rendered dashboard pages.
//!
//! The dashboard embeds its component data as a sequence of
//! `self.__next_f.push([id, content])` script calls. [`extract`] concatenates
//! the `content` of every call into one searchable blob.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::trace;

static CHUNK_PUSH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)self\.__next_f\.push\(\[(.*?)\]\)").expect("chunk push pattern is valid")
});

/// Concatenate the decoded payload of every chunk push in `html`, in source order.
///
/// A push whose arguments do not parse as a JSON array (the lazy match can cut
/// through escaped content or span several calls) contributes its raw
/// argument text instead, so its contents stay searchable. Returns an empty
/// string when the page has no chunk pushes.
pub fn extract(html: &str) -> String {
    let mut payload = String::new();

    for captures in CHUNK_PUSH.captures_iter(html) {
        let Some(args) = captures.get(1) else {
            continue;
        };
        let args = args.as_str();

        match serde_json::from_str::<Vec<Value>>(&format!("[{}]", args)) {
            Ok(values) => {
                if let Some(content) = values.get(1) {
                    payload.push_str(&value_text(content));
                }
            }
            Err(e) => {
                trace!("Keeping unparsed chunk ({} bytes): {}", args.len(), e);
                payload.push_str(args);
            }
        }
    }

    payload
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_chunks_yields_empty_string() {
        assert_eq!(extract(""), "");
        assert_eq!(
            extract("<html><body><script>console.log(1)</script></body></html>"),
            ""
        );
    }

    #[test]
    fn test_chunks_concatenate_in_order() {
        let html = r#"self.__next_f.push([1,"A"]) self.__next_f.push([2,"B"])"#;
        assert_eq!(extract(html), "AB");
    }

    #[test]
    fn test_script_tags_and_escapes() {
        let html = concat!(
            r#"<script>self.__next_f.push([1,"4:{\"rows\":[{\"key\":\"k\\\\1\"}]}\n"])</script>"#,
            r#"<script>self.__next_f.push([1,"tail"])</script>"#
        );
        assert_eq!(extract(html), "4:{\"rows\":[{\"key\":\"k\\\\1\"}]}\ntail");
    }

    #[test]
    fn test_single_element_push_contributes_nothing() {
        let html = r#"self.__next_f.push([0])self.__next_f.push([1,"x"])"#;
        assert_eq!(extract(html), "x");
    }

    #[test]
    fn test_non_string_content_is_rendered() {
        let html = r#"self.__next_f.push([3,42])"#;
        assert_eq!(extract(html), "42");
    }

    #[test]
    fn test_malformed_chunk_is_kept_verbatim() {
        let html = r#"self.__next_f.push([1,"broken \"accessKey\":\"zzz])"#;
        assert_eq!(extract(html), r#"1,"broken \"accessKey\":\"zzz"#);
    }

    #[test]
    fn test_multiline_chunk() {
        let html = "self.__next_f.push([1,\n\"line\"\n])";
        assert_eq!(extract(html), "line");
    }
}
