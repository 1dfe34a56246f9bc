//! Turn the agent's free-form reply into a JSON array.
//!
//! The agent is asked for a bare JSON array but in practice answers with
//! code fences, prose around the array, the literal `null`, or a truncated
//! body. [`extract_json_array`] never fails: every reply lands in one of the
//! three [`Extracted`] cases.

use crate::utils::{looks_truncated, preview};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

/// Maximum number of characters kept from an unparseable reply.
pub const PREVIEW_CHARS: usize = 400;

/// Keys under which some agents wrap the result array.
const WRAPPER_KEYS: [&str; 5] = ["articles", "results", "items", "news", "value"];

static LANG_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_+.-]*$").unwrap());

/// What the sanitizer recovered from a reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    /// The agent explicitly reported no results.
    Empty,
    /// Raw JSON entries, in the order the agent returned them.
    Articles(Vec<Value>),
    /// Nothing usable; carries a bounded prefix of the reply.
    ParseError(String),
}

impl Extracted {
    /// Split into the `(list, error)` pair consumed by the orchestrator.
    pub fn into_parts(self) -> (Vec<Value>, Option<String>) {
        match self {
            Extracted::Empty => (Vec::new(), None),
            Extracted::Articles(items) => (items, None),
            Extracted::ParseError(preview) => (Vec::new(), Some(preview)),
        }
    }
}

/// Extract a JSON array from arbitrary agent text.
pub fn extract_json_array(raw_text: &str) -> Extracted {
    let text = strip_code_fence(raw_text.trim());

    if matches!(text.to_lowercase().as_str(), "" | "null" | "none") {
        return Extracted::Empty;
    }

    match serde_json::from_str::<Value>(text) {
        Ok(value) => {
            if let Some(extracted) = from_value(value) {
                return extracted;
            }
        }
        Err(e) => {
            debug!(error = %e, truncated = looks_truncated(&e), "Strict JSON decode failed; trying bracket recovery");
        }
    }

    if let Some(inner) = bracketed(text) {
        if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(inner) {
            return from_items(items);
        }
    }

    Extracted::ParseError(preview(raw_text, PREVIEW_CHARS))
}

/// Extract a single JSON object (used for enrichment replies).
pub fn extract_json_object(raw_text: &str) -> Option<serde_json::Map<String, Value>> {
    let text = strip_code_fence(raw_text.trim());
    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(text) {
        return Some(obj);
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(Value::Object(obj)) => Some(obj),
        _ => None,
    }
}

fn from_value(value: Value) -> Option<Extracted> {
    match value {
        Value::Null => Some(Extracted::Empty),
        Value::Array(items) => Some(from_items(items)),
        Value::Object(mut obj) => {
            for key in WRAPPER_KEYS {
                match obj.remove(key) {
                    Some(Value::Array(items)) => return Some(from_items(items)),
                    Some(other) => {
                        obj.insert(key.to_string(), other);
                    }
                    None => {}
                }
            }
            Some(Extracted::Articles(vec![Value::Object(obj)]))
        }
        // A bare scalar is not a result list; let bracket recovery decide.
        _ => None,
    }
}

fn from_items(items: Vec<Value>) -> Extracted {
    if items.is_empty() {
        Extracted::Empty
    } else {
        Extracted::Articles(items)
    }
}

/// Strip one outermost pair of triple-backtick fences, with an optional
/// language tag on the opening line.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = match rest.split_once('\n') {
        Some((first_line, body)) if LANG_TAG.is_match(first_line.trim()) => body,
        _ => rest,
    };
    let rest = rest.trim_end();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Slice from the first `[` to the last `]`, if they are in order.
fn bracketed(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_results_are_empty_without_error() {
        for input in ["null", "None", "NULL", "", "   ", "```json\n[]\n```", "[]", "```\nnull\n```"] {
            assert_eq!(extract_json_array(input), Extracted::Empty, "input: {input:?}");
            let (items, err) = extract_json_array(input).into_parts();
            assert!(items.is_empty());
            assert!(err.is_none());
        }
    }

    #[test]
    fn test_plain_array() {
        let raw = r#"[{"title": "a"}, {"title": "b"}]"#;
        match extract_json_array(raw) {
            Extracted::Articles(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[1], json!({"title": "b"}));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_fenced_array_with_language_tag() {
        let raw = "```json\n[{\"title\": \"fenced\"}]\n```";
        assert_eq!(
            extract_json_array(raw),
            Extracted::Articles(vec![json!({"title": "fenced"})])
        );
    }

    #[test]
    fn test_fenced_array_without_newline() {
        let raw = "```[{\"title\": \"inline\"}]```";
        assert_eq!(
            extract_json_array(raw),
            Extracted::Articles(vec![json!({"title": "inline"})])
        );
    }

    #[test]
    fn test_only_outermost_fence_is_stripped() {
        let raw = "```\n```json\n[1]\n```\n```";
        // Inner fence stays, bracket recovery still finds the array.
        assert_eq!(extract_json_array(raw), Extracted::Articles(vec![json!(1)]));
    }

    #[test]
    fn test_prose_around_array_is_recovered() {
        let raw = "Here are the results:\n[{\"title\": \"x\"}]\nLet me know if you need more.";
        assert_eq!(
            extract_json_array(raw),
            Extracted::Articles(vec![json!({"title": "x"})])
        );
    }

    #[test]
    fn test_refusal_yields_bounded_prefix_preview() {
        let raw = "Sorry, I cannot comply.";
        match extract_json_array(raw) {
            Extracted::ParseError(p) => {
                assert!(p.chars().count() <= PREVIEW_CHARS);
                assert!(raw.starts_with(&p));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_long_garbage_preview_is_capped() {
        let raw = format!("I could not find anything {}", "뉴스 ".repeat(500));
        match extract_json_array(&raw) {
            Extracted::ParseError(p) => {
                assert_eq!(p.chars().count(), PREVIEW_CHARS);
                assert!(raw.starts_with(&p));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_truncated_array_is_parse_error() {
        let raw = r#"[{"title": "a"}, {"title": "b"#;
        assert!(matches!(extract_json_array(raw), Extracted::ParseError(_)));
    }

    #[test]
    fn test_wrapped_object_is_unwrapped() {
        let raw = r#"{"articles": [{"title": "wrapped"}]}"#;
        assert_eq!(
            extract_json_array(raw),
            Extracted::Articles(vec![json!({"title": "wrapped"})])
        );
    }

    #[test]
    fn test_single_object_is_one_entry() {
        let raw = r#"{"title": "solo", "url": "https://a.com"}"#;
        assert_eq!(
            extract_json_array(raw),
            Extracted::Articles(vec![json!({"title": "solo", "url": "https://a.com"})])
        );
    }

    #[test]
    fn test_scalar_array_is_accepted() {
        let raw = r#"["headline one", "headline two"]"#;
        assert_eq!(
            extract_json_array(raw),
            Extracted::Articles(vec![json!("headline one"), json!("headline two")])
        );
    }

    #[test]
    fn test_never_panics_on_odd_inputs() {
        for input in ["]", "[", "][", "```", "``````", "\"just a string\"", "42", "{", "```json"] {
            let _ = extract_json_array(input);
        }
    }

    #[test]
    fn test_extract_json_object() {
        let raw = "```json\n{\"summary\": \"s\", \"sentiment\": \"positive\"}\n```";
        let obj = extract_json_object(raw).unwrap();
        assert_eq!(obj.get("sentiment"), Some(&json!("positive")));

        let raw = "Result: {\"summary\": \"s\"} done";
        assert!(extract_json_object(raw).is_some());
        assert!(extract_json_object("no object here").is_none());
    }
}
