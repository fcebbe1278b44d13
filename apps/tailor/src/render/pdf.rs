//! Built-in HTML → PDF layout, used when the external renderer is missing or
//! fails.
//!
//! Only document structure survives: headings, paragraphs, list items, line
//! breaks and tables. Everything is set in Helvetica with greedy wrapping and
//! written with lopdf using the base-14 fonts, so no font files are embedded.

use std::path::Path;
use std::sync::OnceLock;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::font_metrics::Face;
use super::ConversionError;

/// Page geometry in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSetup {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
    pub body_size: f32,
}

impl Default for PageSetup {
    /// US letter, 1" margins, 11pt body.
    fn default() -> Self {
        Self {
            width: 612.0,
            height: 792.0,
            margin: 72.0,
            body_size: 11.0,
        }
    }
}

impl PageSetup {
    fn text_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }
}

const LEADING: f32 = 1.3;
const CELL_PADDING: f32 = 3.0;
const BULLET: &str = "\u{2022} ";

// ────────────────────────────────────────────────────────────────────────────
// HTML → blocks
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRole {
    Heading(u8),
    Body,
    ListItem,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayoutBlock {
    /// `lines` are hard breaks within the block.
    Text { role: TextRole, lines: Vec<String> },
    Table { rows: Vec<Vec<String>> },
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)<!--.*?-->|<(/?)([a-zA-Z][a-zA-Z0-9]*)[^>]*>|([^<]+)")
            .expect("tag pattern is valid")
    })
}

fn decode_entities(text: &str) -> String {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").expect("entity pattern is valid")
    });
    pattern
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            let decoded = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some(' '),
                "ndash" => Some('\u{2013}'),
                "mdash" => Some('\u{2014}'),
                "hellip" => Some('\u{2026}'),
                _ if name.starts_with("#x") || name.starts_with("#X") => {
                    u32::from_str_radix(&name[2..], 16).ok().and_then(char::from_u32)
                }
                _ if name.starts_with('#') => name[1..].parse().ok().and_then(char::from_u32),
                _ => None,
            };
            decoded.map(String::from).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Splits on hard breaks and collapses whitespace inside each line.
fn normalize_lines(raw: &str) -> Vec<String> {
    let lines: Vec<String> = raw
        .split('\n')
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect();
    let first = lines.iter().position(|l| !l.is_empty());
    let last = lines.iter().rposition(|l| !l.is_empty());
    match (first, last) {
        (Some(a), Some(b)) => lines[a..=b].to_vec(),
        _ => Vec::new(),
    }
}

#[derive(Default)]
struct TableState {
    rows: Vec<Vec<String>>,
    row: Option<Vec<String>>,
    cell: Option<String>,
}

#[derive(Default)]
struct BlockParser {
    blocks: Vec<LayoutBlock>,
    text: String,
    role: Option<TextRole>,
    tables: Vec<TableState>,
    skip_depth: usize,
}

impl BlockParser {
    fn push_text(&mut self, text: &str) {
        if self.skip_depth > 0 {
            return;
        }
        let no_tables = self.tables.is_empty();
        match self.tables.last_mut().and_then(|t| t.cell.as_mut()) {
            Some(cell) => cell.push_str(text),
            None if no_tables => self.text.push_str(text),
            // stray text between rows
            None => {}
        }
    }

    /// Emits pending text. The role survives an empty flush so that
    /// `<li><p>..</p></li>` still produces a list item.
    fn flush(&mut self) {
        let lines = normalize_lines(&decode_entities(&std::mem::take(&mut self.text)));
        if !lines.is_empty() {
            let role = self.role.take().unwrap_or(TextRole::Body);
            self.blocks.push(LayoutBlock::Text { role, lines });
        }
    }

    fn open(&mut self, tag: &str) {
        match tag {
            "head" | "style" | "script" | "title" => self.skip_depth += 1,
            "br" => self.push_text("\n"),
            "table" => {
                if self.tables.is_empty() {
                    self.flush();
                }
                self.tables.push(TableState::default());
            }
            "tr" => {
                if let Some(table) = self.tables.last_mut() {
                    table.row = Some(Vec::new());
                }
            }
            "td" | "th" => {
                if let Some(table) = self.tables.last_mut() {
                    table.cell = Some(String::new());
                }
            }
            _ if !self.tables.is_empty() => {
                if is_block_tag(tag) {
                    self.push_text("\n");
                }
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.flush();
                self.role = Some(TextRole::Heading(tag.as_bytes()[1] - b'0'));
            }
            "li" => {
                self.flush();
                self.role = Some(TextRole::ListItem);
            }
            _ if is_block_tag(tag) => self.flush(),
            _ => {}
        }
    }

    fn close(&mut self, tag: &str) {
        match tag {
            "head" | "style" | "script" | "title" => {
                self.skip_depth = self.skip_depth.saturating_sub(1)
            }
            "td" | "th" => {
                if let Some(table) = self.tables.last_mut() {
                    if let Some(cell) = table.cell.take() {
                        let text = normalize_lines(&decode_entities(&cell)).join("\n");
                        table.row.get_or_insert_with(Vec::new).push(text);
                    }
                }
            }
            "tr" => {
                if let Some(table) = self.tables.last_mut() {
                    if let Some(row) = table.row.take() {
                        table.rows.push(row);
                    }
                }
            }
            "table" => {
                if let Some(table) = self.tables.pop() {
                    match self.tables.last_mut() {
                        // nested table: fold its text into the enclosing cell
                        Some(outer) => {
                            let text: Vec<String> =
                                table.rows.iter().map(|r| r.join(" ")).collect();
                            if let Some(cell) = outer.cell.as_mut() {
                                cell.push('\n');
                                cell.push_str(&text.join("\n"));
                            }
                        }
                        None if !table.rows.is_empty() => {
                            self.blocks.push(LayoutBlock::Table { rows: table.rows })
                        }
                        None => {}
                    }
                }
            }
            _ if !self.tables.is_empty() => {
                if is_block_tag(tag) {
                    self.push_text("\n");
                }
            }
            "li" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.flush();
                self.role = None;
            }
            _ if is_block_tag(tag) => self.flush(),
            _ => {}
        }
    }
}

fn is_block_tag(tag: &str) -> bool {
    matches!(
        tag,
        "p" | "div"
            | "blockquote"
            | "pre"
            | "ul"
            | "ol"
            | "li"
            | "dl"
            | "dt"
            | "dd"
            | "section"
            | "header"
            | "footer"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "hr"
            | "body"
    )
}

/// Structural blocks of an HTML fragment or page.
pub fn parse_html(html: &str) -> Vec<LayoutBlock> {
    let mut parser = BlockParser::default();
    for caps in tag_pattern().captures_iter(html) {
        if let Some(text) = caps.get(3) {
            parser.push_text(text.as_str());
        } else if let Some(name) = caps.get(2) {
            let tag = name.as_str().to_ascii_lowercase();
            let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
            if closing {
                parser.close(&tag);
            } else {
                parser.open(&tag);
            }
        }
    }
    parser.flush();
    parser.blocks
}

// ────────────────────────────────────────────────────────────────────────────
// Layout
// ────────────────────────────────────────────────────────────────────────────

/// WinAnsi bytes for `text`; unmappable characters become '?'.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{00A0}'..='\u{00FF}' => c as u32 as u8,
            '\u{20AC}' => 0x80,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2122}' => 0x99,
            '\t' => b' ',
            _ => b'?',
        })
        .collect()
}

struct PageWriter {
    setup: PageSetup,
    pages: Vec<Vec<Operation>>,
    y: f32,
}

impl PageWriter {
    fn new(setup: PageSetup) -> Self {
        Self {
            setup,
            pages: vec![Vec::new()],
            y: setup.height - setup.margin,
        }
    }

    fn new_page(&mut self) {
        self.pages.push(Vec::new());
        self.y = self.setup.height - self.setup.margin;
    }

    fn at_top(&self) -> bool {
        self.y >= self.setup.height - self.setup.margin
    }

    /// Starts a new page unless `height` fits below the cursor.
    fn reserve(&mut self, height: f32) {
        if self.y - height < self.setup.margin && !self.at_top() {
            self.new_page();
        }
    }

    fn ops(&mut self) -> &mut Vec<Operation> {
        // `pages` always holds at least one page
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn text(&mut self, face: Face, size: f32, x: f32, baseline: f32, text: &str) {
        let ops = self.ops();
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new(
            "Tf",
            vec![face.resource_name().into(), size.into()],
        ));
        ops.push(Operation::new("Td", vec![x.into(), baseline.into()]));
        ops.push(Operation::new(
            "Tj",
            vec![Object::string_literal(win_ansi(text))],
        ));
        ops.push(Operation::new("ET", vec![]));
    }

    fn rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        let ops = self.ops();
        ops.push(Operation::new(
            "re",
            vec![x.into(), y.into(), w.into(), h.into()],
        ));
        ops.push(Operation::new("S", vec![]));
    }

    fn text_block(&mut self, role: TextRole, lines: &[String]) {
        let body = self.setup.body_size;
        let (face, size, before, indent, prefix) = match role {
            TextRole::Heading(1) => (Face::Bold, body + 5.0, body, 0.0, ""),
            TextRole::Heading(2) => (Face::Bold, body + 3.0, body * 0.8, 0.0, ""),
            TextRole::Heading(_) => (Face::Bold, body + 1.0, body * 0.6, 0.0, ""),
            TextRole::Body => (Face::Regular, body, body * 0.4, 0.0, ""),
            TextRole::ListItem => (Face::Regular, body, body * 0.2, body, BULLET),
        };
        let metrics = face.metrics();
        let leading = size * LEADING;
        let x = self.setup.margin + indent;
        let width = self.setup.text_width() - indent;

        if !self.at_top() {
            self.y -= before;
        }
        let mut first = true;
        for hard_line in lines {
            let text = if first { format!("{prefix}{hard_line}") } else { hard_line.clone() };
            first = false;
            let wrapped = metrics.wrap(&text, size, width);
            if wrapped.is_empty() {
                self.y -= leading;
                continue;
            }
            for line in wrapped {
                self.reserve(leading);
                self.y -= leading;
                let baseline = self.y + (leading - size) / 2.0;
                self.text(face, size, x, baseline, &line);
            }
        }
    }

    fn table(&mut self, rows: &[Vec<String>]) {
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        if columns == 0 {
            return;
        }
        let size = self.setup.body_size - 1.0;
        let leading = size * LEADING;
        let metrics = Face::Regular.metrics();
        let col_width = self.setup.text_width() / columns as f32;
        let inner = col_width - 2.0 * CELL_PADDING;
        let max_row_height = self.setup.height - 2.0 * self.setup.margin;

        if !self.at_top() {
            self.y -= self.setup.body_size * 0.4;
        }
        for row in rows {
            let mut cells: Vec<Vec<String>> = (0..columns)
                .map(|i| {
                    row.get(i)
                        .map(|text| {
                            text.split('\n')
                                .flat_map(|line| metrics.wrap(line, size, inner))
                                .collect()
                        })
                        .unwrap_or_default()
                })
                .collect();
            let max_lines = ((max_row_height - 2.0 * CELL_PADDING) / leading).floor() as usize;
            for cell in &mut cells {
                cell.truncate(max_lines.max(1));
            }
            let lines = cells.iter().map(Vec::len).max().unwrap_or(0).max(1);
            let height = lines as f32 * leading + 2.0 * CELL_PADDING;

            self.reserve(height);
            let top = self.y;
            for (index, cell) in cells.iter().enumerate() {
                let x = self.setup.margin + index as f32 * col_width;
                self.rect(x, top - height, col_width, height);
                for (n, line) in cell.iter().enumerate() {
                    let baseline = top - CELL_PADDING - (n as f32 + 1.0) * leading
                        + (leading - size) / 2.0;
                    self.text(Face::Regular, size, x + CELL_PADDING, baseline, line);
                }
            }
            self.y = top - height;
        }
    }
}

/// Lays `blocks` out into per-page content operations.
pub fn layout(blocks: &[LayoutBlock], setup: PageSetup) -> Vec<Vec<Operation>> {
    let mut writer = PageWriter::new(setup);
    for block in blocks {
        match block {
            LayoutBlock::Text { role, lines } => writer.text_block(*role, lines),
            LayoutBlock::Table { rows } => writer.table(rows),
        }
    }
    writer.pages
}

// ────────────────────────────────────────────────────────────────────────────
// PDF assembly
// ────────────────────────────────────────────────────────────────────────────

fn font_object(doc: &mut Document, face: Face) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => face.base_font(),
        "Encoding" => "WinAnsiEncoding",
    })
}

/// Builds the PDF document for `html`.
pub fn build_pdf(html: &str, setup: PageSetup) -> Result<Document, ConversionError> {
    let blocks = parse_html(html);
    let pages = layout(&blocks, setup);
    debug!("Laid out {} blocks on {} pages", blocks.len(), pages.len());

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let regular = font_object(&mut doc, Face::Regular);
    let bold = font_object(&mut doc, Face::Bold);
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            Face::Regular.resource_name() => regular,
            Face::Bold.resource_name() => bold,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations };
        let stream_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => stream_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let media_box: Vec<Object> = vec![0.into(), 0.into(), setup.width.into(), setup.height.into()];
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => media_box,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();
    Ok(doc)
}

/// Renders `html` to a PDF file at `out`. Returns the page count.
pub fn render_pdf(html: &str, out: &Path, setup: PageSetup) -> Result<usize, ConversionError> {
    let mut doc = build_pdf(html, setup)?;
    let pages = doc.get_pages().len();
    doc.save(out)?;
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(role: TextRole, lines: &[&str]) -> LayoutBlock {
        LayoutBlock::Text {
            role,
            lines: lines.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_parse_pandoc_style_markup() {
        let html = r#"<h1 id="skills">Skills</h1>
<p>Rust &amp; Go<br />Kafka</p>
<ul>
<li>Built &#8220;things&#8221;</li>
</ul>
<table>
<colgroup><col style="width: 50%" /></colgroup>
<thead><tr class="header"><th>Lang</th><th>Years</th></tr></thead>
<tbody><tr class="odd"><td><p>Rust</p></td><td>5</td></tr></tbody>
</table>"#;
        let blocks = parse_html(html);
        assert_eq!(
            blocks,
            vec![
                text(TextRole::Heading(1), &["Skills"]),
                text(TextRole::Body, &["Rust & Go", "Kafka"]),
                text(TextRole::ListItem, &["Built \u{201C}things\u{201D}"]),
                LayoutBlock::Table {
                    rows: vec![
                        vec!["Lang".to_string(), "Years".to_string()],
                        vec!["Rust".to_string(), "5".to_string()],
                    ]
                },
            ]
        );
    }

    #[test]
    fn test_parse_skips_head_and_comments() {
        let html = "<html><head><title>t</title><style>p { x: y }</style></head>\
                    <body><!-- note --><p>Only this</p></body></html>";
        assert_eq!(parse_html(html), vec![text(TextRole::Body, &["Only this"])]);
    }

    #[test]
    fn test_parse_fallback_markup_table() {
        let html = "<p>Intro</p><table border='1' cellpadding='3'><tr><td>a<br/></td><td>b<br/>c<br/></td></tr></table>";
        let blocks = parse_html(html);
        assert_eq!(
            blocks[1],
            LayoutBlock::Table {
                rows: vec![vec!["a".to_string(), "b\nc".to_string()]]
            }
        );
    }

    #[test]
    fn test_text_between_rows_is_dropped_and_body_resumes() {
        let html = "<p>Before</p><table>\n<tr>\n<td>x</td>\n</tr>\nstray\n</table><p>After</p>";
        assert_eq!(
            parse_html(html),
            vec![
                text(TextRole::Body, &["Before"]),
                LayoutBlock::Table {
                    rows: vec![vec!["x".to_string()]]
                },
                text(TextRole::Body, &["After"]),
            ]
        );
    }

    #[test]
    fn test_long_documents_paginate() {
        let paragraph = "Delivered measurable improvements across distributed systems. ".repeat(8);
        let blocks: Vec<LayoutBlock> = (0..60)
            .map(|_| text(TextRole::Body, &[paragraph.as_str()]))
            .collect();
        let pages = layout(&blocks, PageSetup::default());
        assert!(pages.len() > 1);
        assert!(pages.iter().all(|ops| !ops.is_empty()));
    }

    #[test]
    fn test_empty_markup_still_yields_one_page() {
        assert_eq!(layout(&parse_html(""), PageSetup::default()).len(), 1);
    }

    #[test]
    fn test_win_ansi_mapping() {
        assert_eq!(win_ansi("a\u{2022}é\u{4E2D}"), vec![b'a', 0x95, 0xE9, b'?']);
    }

    #[test]
    fn test_render_pdf_writes_loadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.pdf");
        let html = "<h1>Jane Doe</h1><p>Backend engineer (Rust)</p>\
                    <table><tr><td>Rust</td><td>5 years</td></tr></table>";

        let pages = render_pdf(html, &out, PageSetup::default()).unwrap();
        assert_eq!(pages, 1);

        let loaded = Document::load(&out).unwrap();
        assert_eq!(loaded.get_pages().len(), 1);
        assert!(std::fs::metadata(&out).unwrap().len() > 0);
    }
}
