//! `{{TOKEN}}` placeholder discovery and substitution.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use super::content::ContentMap;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{\{([^}]*)\}\}").expect("placeholder pattern is valid"))
}

/// Distinct token names found in `text`.
pub fn extract_placeholders(text: &str) -> BTreeSet<String> {
    placeholder_pattern()
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Replaces every `{{key}}` in `text` that has a mapped value, in one pass.
/// Tokens with no mapped value are left as they are, and replacement text is
/// never scanned again. Returns the new text and the number of replacements.
pub fn substitute(text: &str, content: &ContentMap) -> (String, usize) {
    let mut replaced = 0;
    let out = placeholder_pattern().replace_all(text, |caps: &Captures| {
        match content.get(&caps[1]) {
            Some(value) => {
                replaced += 1;
                value.text()
            }
            None => caps[0].to_string(),
        }
    });
    (out.into_owned(), replaced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::content::ContentValue;
    use crate::document::model::{Cell, Paragraph, SourceDocument, Table};

    fn template() -> SourceDocument {
        let mut doc = SourceDocument::new();
        doc.push_paragraph(Paragraph::new("{{NAME}} — {{TITLE}}"));
        doc.push_paragraph(Paragraph::new("{{SUMMARY}}"));
        doc.push_table(Table {
            rows: vec![vec![Cell::from_text("{{SKILLS}}"), Cell::from_text("{{NAME}}")]],
        });
        doc
    }

    #[test]
    fn test_extract_deduplicates() {
        let tokens = extract_placeholders(&template().flattened_text());
        let expected: BTreeSet<String> = ["NAME", "SKILLS", "SUMMARY", "TITLE"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(tokens, expected);
    }

    #[test]
    fn test_extract_is_idempotent() {
        let text = template().flattened_text();
        assert_eq!(extract_placeholders(&text), extract_placeholders(&text));
    }

    #[test]
    fn test_extract_ignores_unclosed_and_handles_empty_token() {
        let tokens = extract_placeholders("{{OPEN and {{}} and {{A}}");
        // "{{OPEN and {{}}" → inner text runs to the first '}'
        assert!(tokens.contains("A"));
        assert!(tokens.iter().all(|t| !t.contains('}')));
    }

    fn content(pairs: &[(&str, &str)]) -> ContentMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), ContentValue::Text(v.to_string())))
            .collect()
    }

    #[test]
    fn test_substitute_replaces_every_occurrence() {
        let content = content(&[("NAME", "Jane Doe"), ("TITLE", "Engineer")]);
        let (text, replaced) = substitute("{{NAME}} — {{TITLE}}, signed {{NAME}}", &content);
        assert_eq!(replaced, 3);
        assert_eq!(text, "Jane Doe — Engineer, signed Jane Doe");
    }

    #[test]
    fn test_missing_and_extra_keys_are_tolerated() {
        let content = content(&[("NAME", "Jane"), ("UNUSED", "ignored")]);
        let (text, replaced) = substitute("{{NAME}}: {{SUMMARY}}", &content);
        assert_eq!(replaced, 1);
        assert_eq!(text, "Jane: {{SUMMARY}}");
    }

    #[test]
    fn test_replacement_text_is_not_rescanned() {
        let content = content(&[("A", "{{B}}"), ("B", "oops")]);
        let (text, replaced) = substitute("{{A}} {{B}}", &content);
        assert_eq!(replaced, 2);
        assert_eq!(text, "{{B}} oops");
    }
}
