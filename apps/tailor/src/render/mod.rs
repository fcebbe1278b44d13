// Fixed-layout output: .docx → HTML intermediate → PDF, through an external
// HTML renderer or the built-in layout.

pub mod converter;
pub mod font_metrics;
pub mod markup;
pub mod pdf;

use std::path::PathBuf;

use thiserror::Error;

use crate::document::DocumentError;

pub use converter::FormatConverter;

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Fallback markup could not read the document: {0}")]
    Document(#[from] DocumentError),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Converter produced no markup for {0}")]
    EmptyMarkup(PathBuf),
}
