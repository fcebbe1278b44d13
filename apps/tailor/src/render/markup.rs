//! Editable document → HTML intermediate.
//!
//! pandoc does the conversion when it is installed and succeeds; otherwise a
//! structural rendering of the document is written instead (paragraphs and
//! bordered tables, no styling).

use std::fs;
use std::path::Path;
use std::process::Command;

use quick_xml::escape::escape;
use tracing::{debug, warn};

use super::ConversionError;
use crate::document::model::SourceDocument;
use crate::document::read_document;

/// Which path produced the markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupSource {
    Pandoc,
    Fallback,
}

/// Writes HTML for `docx` to `html_out`.
pub fn docx_to_markup(
    pandoc_bin: &str,
    docx: &Path,
    html_out: &Path,
) -> Result<MarkupSource, ConversionError> {
    match run_pandoc(pandoc_bin, docx, html_out) {
        Ok(()) => {
            debug!("pandoc converted {}", docx.display());
            Ok(MarkupSource::Pandoc)
        }
        Err(reason) => {
            warn!(
                "Pandoc conversion of {} failed ({reason}); using structural fallback",
                docx.display()
            );
            let doc = read_document(docx)?;
            fs::write(html_out, fallback_markup(&doc))?;
            Ok(MarkupSource::Fallback)
        }
    }
}

fn run_pandoc(pandoc_bin: &str, docx: &Path, html_out: &Path) -> Result<(), String> {
    let output = Command::new(pandoc_bin)
        .arg(docx)
        .arg("-f")
        .arg("docx")
        .arg("-t")
        .arg("html")
        .arg("-o")
        .arg(html_out)
        .output()
        .map_err(|e| format!("could not run '{pandoc_bin}': {e}"))?;

    if output.status.success() {
        Ok(())
    } else {
        Err(format!(
            "{} exited with {}: {}",
            pandoc_bin,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ))
    }
}

fn escape_text(text: &str) -> String {
    escape(text).replace('\n', "<br/>")
}

/// Loose HTML rendering: one `<p>` per non-blank body paragraph, then every
/// table as a bordered `<table>`.
pub fn fallback_markup(doc: &SourceDocument) -> String {
    let mut html = String::from(
        "<html><head><style>body { font-family: Arial, sans-serif; }</style></head><body>",
    );

    for paragraph in doc.paragraphs() {
        if !paragraph.text.trim().is_empty() {
            html.push_str("<p>");
            html.push_str(&escape_text(&paragraph.text));
            html.push_str("</p>");
        }
    }

    for table in doc.tables() {
        html.push_str("<table border='1' cellpadding='3'>");
        for row in &table.rows {
            html.push_str("<tr>");
            for cell in row {
                html.push_str("<td>");
                for paragraph in &cell.paragraphs {
                    html.push_str(&escape_text(&paragraph.text));
                    html.push_str("<br/>");
                }
                html.push_str("</td>");
            }
            html.push_str("</tr>");
        }
        html.push_str("</table>");
    }

    html.push_str("</body></html>");
    html
}
