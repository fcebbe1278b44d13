//! .docx input and output on top of `docx_rs`.
//!
//! The package tree returned by [`load_docx`] is what the writer edits, so
//! styles, numbering, headers, footers, images and section properties of the
//! source travel into the output untouched. [`to_source_document`] derives the
//! flat model used for classification and prompting.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use docx_rs::{
    BreakType, DocumentChild, Docx, ParagraphChild, Run, RunChild, RunProperty, Style,
    StyleType, TableCellContent, TableChild, TableRowChild,
};

use super::model::{Block, Cell, Paragraph, SourceDocument, StyleSheet, Table};
use super::DocumentError;

/// Reads the package at `path`.
pub fn load_docx(path: &Path) -> Result<Docx, DocumentError> {
    if !path.exists() {
        return Err(DocumentError::NotFound(path.to_path_buf()));
    }
    let bytes = fs::read(path)?;
    docx_rs::read_docx(&bytes)
        .map_err(|e| DocumentError::Parse(format!("{}: {e:?}", path.display())))
}

pub fn read_docx_file(path: &Path) -> Result<SourceDocument, DocumentError> {
    load_docx(path).map(|docx| to_source_document(&docx))
}

/// Packs `docx` to `path`, creating intermediate directories.
pub fn write_docx_file(docx: Docx, path: &Path) -> Result<PathBuf, DocumentError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    docx.build()
        .pack(file)
        .map_err(|e| DocumentError::Pack(format!("{e:?}")))?;
    Ok(path.to_path_buf())
}

/// One model paragraph per top-level body paragraph, one model table per
/// top-level table. Other body children (content controls, bookmarks) are
/// not part of the model but stay in the package.
pub fn to_source_document(docx: &Docx) -> SourceDocument {
    let mut doc = SourceDocument::with_styles(style_sheet(docx));
    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(p) => doc.push_paragraph(model_paragraph(p)),
            DocumentChild::Table(t) => doc.push_table(model_table(t)),
            _ => {}
        }
    }
    doc
}

fn style_sheet(docx: &Docx) -> StyleSheet {
    let mut styles = StyleSheet::default();
    for style in &docx.styles.styles {
        if matches!(style.style_type, StyleType::Paragraph) {
            styles
                .paragraph_styles
                .insert(style.style_id.clone(), style_name(style));
        }
    }
    styles
}

fn style_name(style: &Style) -> String {
    serde_json::to_value(&style.name)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| style.style_id.clone())
}

fn model_paragraph(paragraph: &docx_rs::Paragraph) -> Paragraph {
    Paragraph {
        style: paragraph_style(paragraph),
        text: paragraph_text(paragraph),
    }
}

fn paragraph_style(paragraph: &docx_rs::Paragraph) -> Option<String> {
    paragraph.property.style.as_ref().map(|s| s.val.clone())
}

fn model_table(table: &docx_rs::Table) -> Table {
    let mut rows = Vec::new();
    for child in &table.rows {
        let TableChild::TableRow(row) = child;
        let mut cells = Vec::new();
        for cell in &row.cells {
            let TableRowChild::TableCell(cell) = cell;
            let mut paragraphs = Vec::new();
            cell_paragraphs(&cell.children, &mut paragraphs);
            cells.push(Cell { paragraphs });
        }
        rows.push(cells);
    }
    Table { rows }
}

// Nested tables are folded into the enclosing cell.
fn cell_paragraphs(children: &[TableCellContent], out: &mut Vec<Paragraph>) {
    for content in children {
        match content {
            TableCellContent::Paragraph(p) => out.push(model_paragraph(p)),
            TableCellContent::Table(t) => {
                for child in &t.rows {
                    let TableChild::TableRow(row) = child;
                    for cell in &row.cells {
                        let TableRowChild::TableCell(cell) = cell;
                        cell_paragraphs(&cell.children, out);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Text of the paragraph's own runs, hyperlinks included. Drawings and text
/// boxes anchored inside a run contribute nothing.
pub(crate) fn paragraph_text(paragraph: &docx_rs::Paragraph) -> String {
    let mut text = String::new();
    collect_text(&paragraph.children, &mut text);
    text
}

fn collect_text(children: &[ParagraphChild], out: &mut String) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => out.push_str(&run_text(run)),
            ParagraphChild::Hyperlink(link) => collect_text(&link.children, out),
            _ => {}
        }
    }
}

pub(crate) fn run_text(run: &Run) -> String {
    let mut text = String::new();
    for child in &run.children {
        match child {
            RunChild::Text(t) => match quick_xml::escape::unescape(&t.text) {
                Ok(plain) => text.push_str(&plain),
                Err(_) => text.push_str(&t.text),
            },
            RunChild::Tab(_) => text.push('\t'),
            RunChild::Break(_) => text.push('\n'),
            _ => {}
        }
    }
    text
}

/// Runs of `paragraph` in document order, including those inside hyperlinks.
pub(crate) fn runs_mut(paragraph: &mut docx_rs::Paragraph) -> Vec<&mut Run> {
    let mut runs: Vec<&mut Run> = Vec::new();
    collect_runs(&mut paragraph.children, &mut runs);
    runs
}

fn collect_runs<'a>(children: &'a mut [ParagraphChild], out: &mut Vec<&'a mut Run>) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => out.push(run),
            ParagraphChild::Hyperlink(link) => collect_runs(&mut link.children, out),
            _ => {}
        }
    }
}

/// Every paragraph of the body, table cells included.
pub(crate) fn paragraphs_mut(docx: &mut Docx) -> Vec<&mut docx_rs::Paragraph> {
    let mut paragraphs: Vec<&mut docx_rs::Paragraph> = Vec::new();
    for child in &mut docx.document.children {
        match child {
            DocumentChild::Paragraph(p) => paragraphs.push(p),
            DocumentChild::Table(t) => table_paragraphs_mut(t, &mut paragraphs),
            _ => {}
        }
    }
    paragraphs
}

fn table_paragraphs_mut<'a>(
    table: &'a mut docx_rs::Table,
    out: &mut Vec<&'a mut docx_rs::Paragraph>,
) {
    for child in &mut table.rows {
        let TableChild::TableRow(row) = child;
        for cell in &mut row.cells {
            let TableRowChild::TableCell(cell) = cell;
            for content in &mut cell.children {
                match content {
                    TableCellContent::Paragraph(p) => out.push(p),
                    TableCellContent::Table(t) => table_paragraphs_mut(t, out),
                    _ => {}
                }
            }
        }
    }
}

/// A run carrying `text` with `property`; `\n` becomes a line break and `\t`
/// a tab.
pub(crate) fn text_run(text: &str, property: RunProperty) -> Run {
    let mut run = Run::new();
    run.run_property = property;
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            run = run.add_break(BreakType::TextWrapping);
        }
        for (j, piece) in line.split('\t').enumerate() {
            if j > 0 {
                run = run.add_tab();
            }
            if !piece.is_empty() {
                run = run.add_text(piece);
            }
        }
    }
    run
}

/// Builds a fresh package from the model. Used for generated templates and
/// for documents that never came from a file.
pub fn build_docx(doc: &SourceDocument) -> Docx {
    let mut docx = Docx::new();
    for (id, name) in &doc.styles.paragraph_styles {
        docx = docx.add_style(paragraph_style_definition(id, name));
    }
    for block in &doc.blocks {
        docx = match block {
            Block::Paragraph(p) => docx.add_paragraph(build_paragraph(p)),
            Block::Table(t) => docx.add_table(build_table(t)),
        };
    }
    docx
}

fn paragraph_style_definition(id: &str, name: &str) -> Style {
    let style = Style::new(id, StyleType::Paragraph).name(name);
    if name.eq_ignore_ascii_case("title") {
        return style.size(36).bold();
    }
    match heading_level(name).or_else(|| heading_level(id)) {
        Some(1) => style.size(32).bold(),
        Some(2) => style.size(28).bold(),
        Some(_) => style.size(24).bold(),
        None => style,
    }
}

fn build_paragraph(paragraph: &Paragraph) -> docx_rs::Paragraph {
    let mut built = docx_rs::Paragraph::new();
    if let Some(style) = &paragraph.style {
        built = built.style(style);
    }
    if paragraph.text.is_empty() {
        return built;
    }
    built.add_run(text_run(&paragraph.text, RunProperty::new()))
}

fn build_table(table: &Table) -> docx_rs::Table {
    let columns = table.column_count();
    let rows = table
        .rows
        .iter()
        .map(|row| {
            let cells = (0..columns)
                .map(|index| {
                    let paragraphs = row
                        .get(index)
                        .map(|cell| cell.paragraphs.as_slice())
                        .unwrap_or_default();
                    let mut built = docx_rs::TableCell::new();
                    if paragraphs.is_empty() {
                        // a cell must hold at least one paragraph
                        built = built.add_paragraph(docx_rs::Paragraph::new());
                    }
                    for paragraph in paragraphs {
                        built = built.add_paragraph(build_paragraph(paragraph));
                    }
                    built
                })
                .collect();
            docx_rs::TableRow::new(cells)
        })
        .collect();
    docx_rs::Table::new(rows)
}

/// `heading 2` / `Heading2` → 2.
pub fn heading_level(name: &str) -> Option<u8> {
    let lower = name.to_ascii_lowercase();
    let rest = lower.strip_prefix("heading")?.trim_start();
    rest.parse().ok().filter(|level| (1..=9).contains(level))
}
