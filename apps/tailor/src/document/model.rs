//! In-memory representation of an editable (.docx) document.
//!
//! A flat view of the package: paragraph text, paragraph style ids, table
//! geometry with cell paragraphs, and the declared paragraph styles. Used for
//! classification and prompting; output is written from the package itself.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single paragraph: its style id (the `w:pStyle` value) and flattened text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    pub style: Option<String>,
    pub text: String,
}

impl Paragraph {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            style: None,
            text: text.into(),
        }
    }

    pub fn styled(text: impl Into<String>, style: impl Into<String>) -> Self {
        Self {
            style: Some(style.into()),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub paragraphs: Vec<Paragraph>,
}

impl Cell {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            paragraphs: vec![Paragraph::new(text)],
        }
    }

    /// Cell text with paragraphs joined by newlines.
    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Widest row; ragged rows are padded to this when rebuilt.
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
}

/// Paragraph styles declared by a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleSheet {
    /// style id → display name (e.g. `Heading1` → `heading 1`).
    pub paragraph_styles: BTreeMap<String, String>,
}

impl StyleSheet {
    pub fn declares(&self, style_id: &str) -> bool {
        self.paragraph_styles.contains_key(style_id)
    }

    pub fn display_name<'a>(&'a self, style_id: &'a str) -> &'a str {
        self.paragraph_styles
            .get(style_id)
            .map(String::as_str)
            .unwrap_or(style_id)
    }
}

/// Flat view of a parsed document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub blocks: Vec<Block>,
    pub styles: StyleSheet,
}

impl SourceDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty document that carries `styles` over from another document.
    pub fn with_styles(styles: StyleSheet) -> Self {
        Self {
            blocks: Vec::new(),
            styles,
        }
    }

    pub fn push_paragraph(&mut self, paragraph: Paragraph) {
        self.blocks.push(Block::Paragraph(paragraph));
    }

    pub fn push_table(&mut self, table: Table) {
        self.blocks.push(Block::Table(table));
    }

    /// Top-level body paragraphs in order (table cells excluded).
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Paragraph(p) => Some(p),
            Block::Table(_) => None,
        })
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Table(t) => Some(t),
            Block::Paragraph(_) => None,
        })
    }

    /// Body paragraphs first, then every table cell paragraph, newline-joined.
    pub fn flattened_text(&self) -> String {
        let mut lines: Vec<&str> = self.paragraphs().map(|p| p.text.as_str()).collect();
        for table in self.tables() {
            for row in &table.rows {
                for cell in row {
                    lines.extend(cell.paragraphs.iter().map(|p| p.text.as_str()));
                }
            }
        }
        let mut text = lines.join("\n");
        if !lines.is_empty() {
            text.push('\n');
        }
        text
    }
}
