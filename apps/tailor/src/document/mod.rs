// Editable-document layer: .docx codec, section/placeholder classification,
// and splicing generated content back into a document.

pub mod content;
pub mod docx;
pub mod model;
pub mod placeholders;
pub mod sections;
pub mod templates;
pub mod writer;

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use docx_rs::Docx;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

pub use content::{ContentMap, ContentValue};
pub use model::SourceDocument;
pub use sections::{Category, SectionMap};

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Document not found: {0}")]
    NotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid .docx package: {0}")]
    Parse(String),

    #[error("Failed to write .docx package: {0}")]
    Pack(String),
}

/// How a template marks the content to be regenerated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateMode {
    /// Paragraphs are grouped into heuristic sections.
    #[default]
    Sections,
    /// Literal `{{TOKEN}}` placeholders are filled in.
    Placeholders,
}

impl fmt::Display for TemplateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TemplateMode::Sections => "sections",
            TemplateMode::Placeholders => "placeholders",
        })
    }
}

impl FromStr for TemplateMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sections" => Ok(TemplateMode::Sections),
            "placeholders" => Ok(TemplateMode::Placeholders),
            other => Err(format!("unknown template mode '{other}'")),
        }
    }
}

/// A source document read once per run, with both classifications of it.
/// `source` names the package the output is built from; without one the
/// output is generated from `document` alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateContent {
    pub document: SourceDocument,
    pub text: String,
    pub sections: SectionMap,
    pub placeholders: BTreeSet<String>,
    #[serde(default)]
    pub source: Option<PathBuf>,
}

impl TemplateContent {
    pub fn from_document(document: SourceDocument) -> Self {
        let text = document.flattened_text();
        let sections = sections::analyze_sections(&document);
        let placeholders = placeholders::extract_placeholders(&text);
        Self {
            document,
            text,
            sections,
            placeholders,
            source: None,
        }
    }

    pub fn with_source(mut self, path: &Path) -> Self {
        self.source = Some(path.to_path_buf());
        self
    }

    /// Keys a generated content map is expected to use in `mode`.
    pub fn keys(&self, mode: TemplateMode) -> Vec<String> {
        match mode {
            TemplateMode::Sections => self.sections.populated().map(|c| c.to_string()).collect(),
            TemplateMode::Placeholders => self.placeholders.iter().cloned().collect(),
        }
    }

    /// Applies generated content to a fresh copy of the source package,
    /// leaving the source file and `self` untouched.
    pub fn render(
        &self,
        mode: TemplateMode,
        content: &ContentMap,
    ) -> Result<Docx, DocumentError> {
        let package = match &self.source {
            Some(path) => docx::load_docx(path)?,
            None => docx::build_docx(&self.document),
        };
        Ok(match mode {
            TemplateMode::Sections => writer::rebuild_with_sections(&package, content),
            TemplateMode::Placeholders => {
                let mut package = package;
                writer::fill_placeholders(&mut package, content);
                package
            }
        })
    }
}

/// Parses a .docx without classifying it.
pub fn read_document(path: &Path) -> Result<SourceDocument, DocumentError> {
    docx::read_docx_file(path)
}

/// Reads a .docx and classifies it.
pub fn process_template(path: &Path) -> Result<TemplateContent, DocumentError> {
    let document = read_document(path)?;
    let template = TemplateContent::from_document(document).with_source(path);
    info!(
        "Processed template {}: {} section paragraphs, {} placeholders",
        path.display(),
        template.sections.total_len(),
        template.placeholders.len()
    );
    Ok(template)
}

/// Saves `package` as .docx at `path`, creating intermediate directories.
pub fn save_package(package: Docx, path: &Path) -> Result<PathBuf, DocumentError> {
    docx::write_docx_file(package, path)
}

/// Saves a package generated from `doc`.
pub fn save_document(doc: &SourceDocument, path: &Path) -> Result<PathBuf, DocumentError> {
    save_package(docx::build_docx(doc), path)
}
