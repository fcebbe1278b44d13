//! Turns a free-text model reply into a [`ContentMap`].
//!
//! Step 1 parses the whole reply as JSON. Step 2 looks for a fenced code
//! block (```json or a bare ```) and parses its body. Nothing is retried.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::document::ContentMap;
use crate::errors::AppError;

/// Why neither parse step produced a content map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    /// The reply was not JSON and held no fenced block.
    NoFencedBlock { direct: String },
    /// A fenced block was found but its body did not parse.
    InvalidFencedBlock { direct: String, fenced: String },
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseFailure::NoFencedBlock { direct } => {
                write!(f, "reply is not JSON ({direct}) and contains no fenced block")
            }
            ParseFailure::InvalidFencedBlock { direct, fenced } => write!(
                f,
                "reply is not JSON ({direct}) and its fenced block is invalid ({fenced})"
            ),
        }
    }
}

fn fenced_block_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)```(?:json|JSON)?[ \t]*\r?\n(.*?)\r?\n?```")
            .expect("fenced block pattern is valid")
    })
}

/// Body of the first fenced code block in `text`, if any.
pub fn extract_fenced_block(text: &str) -> Option<&str> {
    fenced_block_pattern()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Two-step parse. Returns the typed failure reason on error.
pub fn try_parse_content_map(raw: &str) -> Result<ContentMap, ParseFailure> {
    let direct = match serde_json::from_str::<ContentMap>(raw.trim()) {
        Ok(map) => return Ok(map),
        Err(e) => e.to_string(),
    };
    let Some(body) = extract_fenced_block(raw) else {
        return Err(ParseFailure::NoFencedBlock { direct });
    };
    serde_json::from_str::<ContentMap>(body.trim()).map_err(|e| ParseFailure::InvalidFencedBlock {
        direct,
        fenced: e.to_string(),
    })
}

/// Same as [`try_parse_content_map`] but keeps the raw reply in the error.
pub fn parse_content_map(raw: &str) -> Result<ContentMap, AppError> {
    try_parse_content_map(raw).map_err(|reason| AppError::GenerationParse {
        reason,
        raw: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ContentValue;

    #[test]
    fn test_direct_json() {
        let map = parse_content_map(r#" {"summary": ["a"], "NAME": "Jane"} "#).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("NAME"), Some(&ContentValue::Text("Jane".to_string())));
    }

    #[test]
    fn test_fenced_json_after_preamble() {
        let raw = "Here you go:\n```json\n{\"summary\": [\"New summary line\"]}\n```";
        let map = parse_content_map(raw).unwrap();
        assert_eq!(
            map.get("summary"),
            Some(&ContentValue::Lines(vec!["New summary line".to_string()]))
        );
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_bare_fence_is_accepted() {
        let raw = "```\n{\"skills\": \"Rust\"}\n```\nLet me know if you need changes.";
        let map = parse_content_map(raw).unwrap();
        assert_eq!(map.get("skills").unwrap().text(), "Rust");
    }

    #[test]
    fn test_no_json_anywhere_keeps_raw_reply() {
        let raw = "Sorry, I can't help with that.";
        match parse_content_map(raw) {
            Err(AppError::GenerationParse { reason, raw: kept }) => {
                assert!(matches!(reason, ParseFailure::NoFencedBlock { .. }));
                assert_eq!(kept, raw);
            }
            other => panic!("expected GenerationParse, got {other:?}"),
        }
    }

    #[test]
    fn test_broken_fenced_block() {
        let raw = "```json\n{\"summary\": [\"unterminated\"\n```";
        let reason = try_parse_content_map(raw).unwrap_err();
        assert!(matches!(reason, ParseFailure::InvalidFencedBlock { .. }));
    }

    #[test]
    fn test_malformed_values_are_rejected_not_partially_accepted() {
        let raw = r#"{"summary": ["ok"], "skills": {"nested": true}}"#;
        assert!(try_parse_content_map(raw).is_err());
    }

    #[test]
    fn test_extract_fenced_block_takes_first() {
        let text = "```json\n{\"a\": \"1\"}\n```\n```json\n{\"b\": \"2\"}\n```";
        assert_eq!(extract_fenced_block(text), Some("{\"a\": \"1\"}"));
        assert_eq!(extract_fenced_block("no fences"), None);
    }
}
