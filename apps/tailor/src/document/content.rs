//! Generated Content Map: replacement text keyed by section or placeholder name.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::sections::Category;

/// A replacement value. Section keys normally carry a list of paragraphs,
/// placeholder keys a single string; both shapes are accepted for either.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentValue {
    Lines(Vec<String>),
    Text(String),
}

impl ContentValue {
    /// As paragraphs: a string becomes one paragraph.
    pub fn lines(&self) -> Vec<String> {
        match self {
            ContentValue::Lines(lines) => lines.clone(),
            ContentValue::Text(text) => vec![text.clone()],
        }
    }

    /// As inline text: a list is joined with newlines.
    pub fn text(&self) -> String {
        match self {
            ContentValue::Lines(lines) => lines.join("\n"),
            ContentValue::Text(text) => text.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ContentValue::Lines(lines) => lines.is_empty(),
            ContentValue::Text(text) => text.is_empty(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentMap(BTreeMap<String, ContentValue>);

impl ContentMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: ContentValue) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&ContentValue> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Non-empty replacement paragraphs for a section, if the map has any.
    pub fn section(&self, category: Category) -> Option<Vec<String>> {
        self.0
            .get(category.as_str())
            .filter(|value| !value.is_empty())
            .map(ContentValue::lines)
    }

    /// Keys that do not name any of the given template keys.
    pub fn unknown_keys<'a>(&'a self, known: &'a [String]) -> Vec<&'a str> {
        self.0
            .keys()
            .filter(|k| !known.contains(k))
            .map(String::as_str)
            .collect()
    }
}

impl FromIterator<(String, ContentValue)> for ContentMap {
    fn from_iter<I: IntoIterator<Item = (String, ContentValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
