//! Heuristic section classifier.
//!
//! Walks body paragraphs in order with a "current category" cursor. Headings
//! (heading-styled, or short all-caps lines) move the cursor according to the
//! first keyword family they match; every non-blank paragraph, headings
//! included, lands in the cursor's category.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::model::{Paragraph, SourceDocument, StyleSheet};

/// Short all-caps lines under this many characters count as headings.
const CAPS_HEADING_MAX_CHARS: usize = 30;

/// Semantic bucket of a resume/cover-letter paragraph. Declaration order is
/// the Section Map's iteration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    PersonalInfo,
    Summary,
    Experience,
    Skills,
    Education,
    Other,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::PersonalInfo,
        Category::Summary,
        Category::Experience,
        Category::Skills,
        Category::Education,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::PersonalInfo => "personal_info",
            Category::Summary => "summary",
            Category::Experience => "experience",
            Category::Skills => "skills",
            Category::Education => "education",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s.trim())
            .ok_or_else(|| format!("unknown section '{s}'"))
    }
}

/// Keyword families in precedence order. A heading matching several families
/// resolves to the first one listed.
const KEYWORD_FAMILIES: &[(Category, &[&str])] = &[
    (Category::Summary, &["profile", "summary", "objective", "about"]),
    (Category::Experience, &["experience", "employment", "work", "career"]),
    (Category::Skills, &["skill", "expertise", "competenc", "proficienc"]),
    (Category::Education, &["education", "academic", "qualification", "degree"]),
    (Category::PersonalInfo, &["contact", "personal", "info"]),
];

/// Ordered category → paragraph texts. Every category is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionMap(BTreeMap<Category, Vec<String>>);

impl Default for SectionMap {
    fn default() -> Self {
        Self(Category::ALL.into_iter().map(|c| (c, Vec::new())).collect())
    }
}

impl SectionMap {
    pub fn get(&self, category: Category) -> &[String] {
        self.0.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn push(&mut self, category: Category, text: String) {
        self.0.entry(category).or_default().push(text);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &[String])> {
        self.0.iter().map(|(c, texts)| (*c, texts.as_slice()))
    }

    /// Categories that received at least one paragraph.
    pub fn populated(&self) -> impl Iterator<Item = Category> + '_ {
        self.0
            .iter()
            .filter(|(_, texts)| !texts.is_empty())
            .map(|(c, _)| *c)
    }

    pub fn total_len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }
}

/// At least one cased character and none of them lower-case.
fn is_all_caps(text: &str) -> bool {
    let mut has_cased = false;
    for c in text.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            has_cased = true;
        }
    }
    has_cased
}

fn has_heading_style(paragraph: &Paragraph, styles: &StyleSheet) -> bool {
    paragraph.style.as_deref().is_some_and(|id| {
        id.to_lowercase().starts_with("heading")
            || styles.display_name(id).to_lowercase().starts_with("heading")
    })
}

/// Whether a (trimmed, non-empty) paragraph reads as a section heading.
pub fn is_heading(paragraph: &Paragraph, text: &str, styles: &StyleSheet) -> bool {
    has_heading_style(paragraph, styles)
        || (text.chars().count() < CAPS_HEADING_MAX_CHARS && is_all_caps(text))
}

/// Maps a heading's text to a category. Unmatched headings fall to `Other`.
pub fn category_for_heading(text: &str) -> Category {
    let lower = text.to_lowercase();
    KEYWORD_FAMILIES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or(Category::Other)
}

/// Category of every body paragraph, in order. Blank paragraphs get `None`
/// and do not move the cursor.
pub fn classify_paragraphs(doc: &SourceDocument) -> Vec<Option<Category>> {
    let mut current = Category::Other;
    doc.paragraphs()
        .map(|paragraph| {
            let text = paragraph.text.trim();
            if text.is_empty() {
                return None;
            }
            if is_heading(paragraph, text, &doc.styles) {
                current = category_for_heading(text);
            }
            Some(current)
        })
        .collect()
}

/// Builds the Section Map (trimmed paragraph texts per category).
pub fn analyze_sections(doc: &SourceDocument) -> SectionMap {
    let mut sections = SectionMap::default();
    for (paragraph, category) in doc.paragraphs().zip(classify_paragraphs(doc)) {
        if let Some(category) = category {
            sections.push(category, paragraph.text.trim().to_string());
        }
    }
    sections
}
