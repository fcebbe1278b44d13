use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::Builder;
use tracing::{debug, info, warn};

use super::markup::{docx_to_markup, MarkupSource};
use super::pdf::{render_pdf, PageSetup};
use super::ConversionError;

/// Which path produced the PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderSource {
    /// The external HTML renderer (`<bin> <input.html> <output.pdf>`).
    External,
    /// The built-in structural layout.
    BuiltIn,
}

/// .docx → HTML (pandoc or structural fallback) → PDF (external renderer or
/// built-in layout).
#[derive(Debug, Clone)]
pub struct FormatConverter {
    pub pandoc_bin: String,
    pub renderer_bin: String,
    /// Where the transient HTML intermediate is created.
    pub scratch_dir: PathBuf,
    /// Page geometry for the built-in layout.
    pub page: PageSetup,
}

impl FormatConverter {
    pub fn new(pandoc_bin: impl Into<String>, renderer_bin: impl Into<String>) -> Self {
        Self {
            pandoc_bin: pandoc_bin.into(),
            renderer_bin: renderer_bin.into(),
            scratch_dir: std::env::temp_dir(),
            page: PageSetup::default(),
        }
    }

    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    /// Converts `docx` to a PDF at `pdf`, creating its parent directory.
    /// The HTML intermediate is removed when this returns, on success or not.
    pub fn docx_to_pdf(&self, docx: &Path, pdf: &Path) -> Result<PathBuf, ConversionError> {
        if let Some(parent) = pdf.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::create_dir_all(&self.scratch_dir)?;

        // NamedTempFile: deleted on drop, including on the error paths below
        let intermediate = Builder::new()
            .prefix("tailor-")
            .suffix(".html")
            .tempfile_in(&self.scratch_dir)?;

        let source = docx_to_markup(&self.pandoc_bin, docx, intermediate.path())?;
        let html = fs::read_to_string(intermediate.path())?;
        if html.trim().is_empty() && source == MarkupSource::Pandoc {
            return Err(ConversionError::EmptyMarkup(docx.to_path_buf()));
        }

        let renderer = match run_renderer(&self.renderer_bin, intermediate.path(), pdf) {
            Ok(()) => RenderSource::External,
            Err(reason) => {
                warn!(
                    "HTML rendering of {} failed ({reason}); using built-in layout",
                    docx.display()
                );
                let pages = render_pdf(&html, pdf, self.page)?;
                debug!("Built-in layout wrote {pages} pages");
                RenderSource::BuiltIn
            }
        };
        info!(
            "Rendered {} → {} ({:?} markup, {:?} renderer)",
            docx.display(),
            pdf.display(),
            source,
            renderer
        );
        Ok(pdf.to_path_buf())
    }
}

fn run_renderer(renderer_bin: &str, html: &Path, pdf: &Path) -> Result<(), String> {
    let output = Command::new(renderer_bin)
        .arg(html)
        .arg(pdf)
        .output()
        .map_err(|e| format!("could not run '{renderer_bin}': {e}"))?;

    if !output.status.success() {
        return Err(format!(
            "{} exited with {}: {}",
            renderer_bin,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }
    match fs::metadata(pdf) {
        Ok(meta) if meta.len() > 0 => Ok(()),
        _ => Err(format!("{renderer_bin} exited cleanly but wrote no PDF")),
    }
}
