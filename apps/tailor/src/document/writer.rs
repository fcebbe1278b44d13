//! Splices generated content back into a .docx package.

use std::collections::{HashMap, HashSet};

use docx_rs::{DocumentChild, Docx, ParagraphChild, Run, RunChild, RunProperty};
use thiserror::Error;
use tracing::debug;

use super::content::ContentMap;
use super::docx::{
    paragraph_text, paragraphs_mut, run_text, runs_mut, text_run, to_source_document,
};
use super::model::StyleSheet;
use super::placeholders::substitute;
use super::sections::{classify_paragraphs, Category};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StyleError {
    #[error("style '{0}' is not declared in the target document")]
    Undeclared(String),
}

/// Copies the paragraph properties of `source` (alignment, spacing, numbering,
/// style) onto `target`. The style reference is kept only if `styles`
/// declares it; otherwise `target` falls back to the document default.
pub fn apply_style(
    target: &mut docx_rs::Paragraph,
    source: &docx_rs::Paragraph,
    styles: &StyleSheet,
) -> Result<(), StyleError> {
    let mut property = source.property.clone();
    let style = property.style.take();
    target.property = property;
    match style {
        None => Ok(()),
        Some(style) if styles.declares(&style.val) => {
            target.property.style = Some(style);
            Ok(())
        }
        Some(style) => Err(StyleError::Undeclared(style.val)),
    }
}

fn first_run_property(paragraph: &docx_rs::Paragraph) -> RunProperty {
    paragraph
        .children
        .iter()
        .find_map(|child| match child {
            ParagraphChild::Run(run) => Some(run.run_property.clone()),
            _ => None,
        })
        .unwrap_or_else(RunProperty::new)
}

fn styled_line(
    source: &docx_rs::Paragraph,
    text: &str,
    styles: &StyleSheet,
) -> docx_rs::Paragraph {
    let mut paragraph = docx_rs::Paragraph::new();
    // Style fidelity is best-effort: an undeclared style leaves the default.
    let _ = apply_style(&mut paragraph, source, styles);
    paragraph.add_run(text_run(text, first_run_property(source)))
}

fn body_paragraph(child: &DocumentChild) -> Option<&docx_rs::Paragraph> {
    match child {
        DocumentChild::Paragraph(p) => Some(p),
        _ => None,
    }
}

/// Section-substitution mode. Returns a copy of `original` in which:
///
/// - the first paragraph of a category that has generated content is replaced
///   by the whole generated sequence; the category's remaining original
///   paragraphs are dropped
/// - generated line `i` takes the paragraph properties and first-run
///   formatting of the category's `i`-th original paragraph (the last one
///   once the originals run out)
/// - everything else (other paragraphs, tables, styles, numbering, headers,
///   footers, section properties) is carried over as it was
///
/// Generated keys that name no category are ignored.
pub fn rebuild_with_sections(original: &Docx, content: &ContentMap) -> Docx {
    let view = to_source_document(original);
    let assignments = classify_paragraphs(&view);

    let mut section_paragraphs: HashMap<Category, Vec<&docx_rs::Paragraph>> = HashMap::new();
    let body = original.document.children.iter().filter_map(body_paragraph);
    for (paragraph, category) in body.zip(&assignments) {
        if let Some(category) = category {
            section_paragraphs.entry(*category).or_default().push(paragraph);
        }
    }

    let mut rebuilt = original.clone();
    let children = std::mem::take(&mut rebuilt.document.children);
    let mut assignments = assignments.into_iter();
    let mut processed: HashSet<Category> = HashSet::new();

    for child in children {
        let Some(paragraph) = body_paragraph(&child) else {
            rebuilt.document.children.push(child);
            continue;
        };
        let category = assignments.next().flatten();

        let replacement = category.and_then(|c| content.section(c).map(|lines| (c, lines)));
        match replacement {
            Some((category, _)) if processed.contains(&category) => {
                // already emitted this category's generated content
            }
            Some((category, lines)) => {
                debug!("Replacing section {category} with {} paragraphs", lines.len());
                let sources = section_paragraphs
                    .get(&category)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                for (index, line) in lines.iter().enumerate() {
                    let source = sources
                        .get(index)
                        .or_else(|| sources.last())
                        .copied()
                        .unwrap_or(paragraph);
                    rebuilt = rebuilt.add_paragraph(styled_line(source, line, &view.styles));
                }
                processed.insert(category);
            }
            None => rebuilt.document.children.push(child),
        }
    }

    rebuilt
}

/// Placeholder-substitution mode: rewrites `{{key}}` tokens in every body and
/// table-cell paragraph of `docx` in place.
pub fn fill_placeholders(docx: &mut Docx, content: &ContentMap) {
    let mut replaced = 0;
    for paragraph in paragraphs_mut(docx) {
        replaced += fill_paragraph(paragraph, content);
    }
    debug!("Substituted {replaced} placeholder occurrences");
}

/// Substitutes inside each run so run formatting survives. When Word has
/// split a token across runs, the first text run takes the whole substituted
/// paragraph text and the other runs lose their text.
fn fill_paragraph(paragraph: &mut docx_rs::Paragraph, content: &ContentMap) -> usize {
    let (whole, expected) = substitute(&paragraph_text(paragraph), content);
    if expected == 0 {
        return 0;
    }

    let mut runs = runs_mut(paragraph);
    let mut in_runs = 0;
    for run in runs.iter_mut() {
        let (text, hits) = substitute(&run_text(run), content);
        if hits > 0 {
            set_run_text(run, &text);
            in_runs += hits;
        }
    }

    if in_runs < expected {
        let mut target = Some(whole);
        for run in runs.iter_mut() {
            if run_text(run).is_empty() {
                continue;
            }
            match target.take() {
                Some(text) => set_run_text(run, &text),
                None => set_run_text(run, ""),
            }
        }
    }
    expected
}

/// Replaces the text, tab and break children of `run`; drawings, fields and
/// other children stay, after the new text.
fn set_run_text(run: &mut Run, text: &str) {
    let kept: Vec<RunChild> = std::mem::take(&mut run.children)
        .into_iter()
        .filter(|child| {
            !matches!(
                child,
                RunChild::Text(_) | RunChild::Tab(_) | RunChild::Break(_)
            )
        })
        .collect();
    run.children = text_run(text, RunProperty::new()).children;
    run.children.extend(kept);
}

#[cfg(test)]
mod tests {
    use docx_rs::{Style, StyleType};

    use super::*;
    use crate::document::content::ContentValue;
    use crate::document::docx::build_docx;
    use crate::document::model::{Block, Cell, Paragraph, SourceDocument, Table};
    use crate::document::sections::analyze_sections;

    fn heading_styles() -> StyleSheet {
        let mut styles = StyleSheet::default();
        styles
            .paragraph_styles
            .insert("Heading1".to_string(), "heading 1".to_string());
        styles
    }

    fn resume() -> Docx {
        let mut doc = SourceDocument::with_styles(heading_styles());
        doc.push_paragraph(Paragraph::new("Jane Doe"));
        doc.push_paragraph(Paragraph::styled("SUMMARY", "Heading1"));
        doc.push_paragraph(Paragraph::new("Backend engineer."));
        doc.push_paragraph(Paragraph::new(""));
        doc.push_paragraph(Paragraph::styled("SKILLS", "Heading1"));
        doc.push_paragraph(Paragraph::new("Python, SQL"));
        doc.push_table(Table {
            rows: vec![vec![Cell::from_text("Languages"), Cell::from_text("English")]],
        });
        doc.push_paragraph(Paragraph::styled("EDUCATION", "Heading1"));
        doc.push_paragraph(Paragraph::new("BSc, MIT"));
        build_docx(&doc)
    }

    fn lines(items: &[&str]) -> ContentValue {
        ContentValue::Lines(items.iter().map(|s| s.to_string()).collect())
    }

    fn texts(docx: &Docx) -> Vec<String> {
        to_source_document(docx)
            .paragraphs()
            .map(|p| p.text.clone())
            .collect()
    }

    fn find_paragraph<'a>(docx: &'a Docx, text: &str) -> &'a docx_rs::Paragraph {
        docx.document
            .children
            .iter()
            .filter_map(body_paragraph)
            .find(|p| paragraph_text(p) == text)
            .unwrap()
    }

    fn json<T: serde::Serialize>(value: &T) -> serde_json::Value {
        serde_json::to_value(value).unwrap()
    }

    #[test]
    fn test_replaced_sections_drop_original_text() {
        let original = resume();
        let mut content = ContentMap::new();
        content.insert("summary", lines(&["SUMMARY", "Rust backend engineer focused on latency."]));
        content.insert("skills", lines(&["SKILLS", "Rust, Python, SQL, Kafka"]));

        let out = texts(&rebuild_with_sections(&original, &content));

        assert!(!out.contains(&"Backend engineer.".to_string()));
        assert!(!out.contains(&"Python, SQL".to_string()));
        assert!(out.contains(&"Rust backend engineer focused on latency.".to_string()));
        assert!(out.contains(&"Rust, Python, SQL, Kafka".to_string()));
        // untouched categories survive
        assert!(out.contains(&"BSc, MIT".to_string()));
        assert_eq!(out[0], "Jane Doe");
    }

    #[test]
    fn test_missing_key_keeps_original_content() {
        let original = resume();
        let mut content = ContentMap::new();
        content.insert("summary", lines(&["SUMMARY", "New summary"]));

        let rebuilt = rebuild_with_sections(&original, &content);
        let sections = analyze_sections(&to_source_document(&rebuilt));
        assert_eq!(
            sections.get(Category::Skills),
            analyze_sections(&to_source_document(&original)).get(Category::Skills)
        );
    }

    #[test]
    fn test_extra_key_is_ignored() {
        let original = resume();
        let mut content = ContentMap::new();
        content.insert("hobbies", lines(&["Chess"]));

        let rebuilt = rebuild_with_sections(&original, &content);
        assert_eq!(texts(&rebuilt), texts(&original));
    }

    #[test]
    fn test_replacement_lines_follow_original_styles() {
        let mut content = ContentMap::new();
        content.insert("skills", lines(&["Core Skills", "Rust", "Kafka"]));

        let rebuilt = to_source_document(&rebuild_with_sections(&resume(), &content));
        let style_of = |text: &str| {
            rebuilt
                .paragraphs()
                .find(|p| p.text == text)
                .and_then(|p| p.style.clone())
        };
        assert_eq!(style_of("Core Skills").as_deref(), Some("Heading1"));
        assert_eq!(style_of("Rust"), None);
        // past the end of the originals, the last original style is reused
        assert_eq!(style_of("Kafka"), None);
    }

    #[test]
    fn test_replacement_runs_keep_source_formatting() {
        let bold = docx_rs::Run::new().add_text("Python, SQL").bold();
        let original = Docx::new()
            .add_style(Style::new("Heading1", StyleType::Paragraph).name("heading 1"))
            .add_paragraph(
                docx_rs::Paragraph::new()
                    .style("Heading1")
                    .add_run(docx_rs::Run::new().add_text("SKILLS")),
            )
            .add_paragraph(docx_rs::Paragraph::new().add_run(bold.clone()));
        let mut content = ContentMap::new();
        content.insert("skills", lines(&["SKILLS", "Rust"]));

        let rebuilt = rebuild_with_sections(&original, &content);
        let paragraph = find_paragraph(&rebuilt, "Rust");
        assert_eq!(json(&first_run_property(paragraph)), json(&bold.run_property));
        assert_ne!(json(&first_run_property(paragraph)), json(&RunProperty::new()));
    }

    #[test]
    fn test_rebuild_carries_styles_and_section_properties() {
        let original = resume();
        let mut content = ContentMap::new();
        content.insert("summary", lines(&["SUMMARY", "New summary"]));

        let rebuilt = rebuild_with_sections(&original, &content);
        assert_eq!(json(&rebuilt.styles), json(&original.styles));
        assert_eq!(
            json(&rebuilt.document.section_property),
            json(&original.document.section_property)
        );
    }

    #[test]
    fn test_tables_keep_position_and_dimensions() {
        let original = resume();
        let rebuilt = rebuild_with_sections(&original, &ContentMap::new());

        let position = |docx: &Docx| {
            to_source_document(docx)
                .blocks
                .iter()
                .position(|b| matches!(b, Block::Table(_)))
                .unwrap()
        };
        assert_eq!(position(&rebuilt), position(&original));
        let view = to_source_document(&rebuilt);
        let table = view.tables().next().unwrap();
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.rows[0][1].text(), "English");
    }

    #[test]
    fn test_undeclared_style_falls_back_to_default() {
        let mut doc = SourceDocument::new();
        doc.push_paragraph(Paragraph::styled("SKILLS", "FancyStyle"));
        doc.push_paragraph(Paragraph::new("Python"));
        let mut content = ContentMap::new();
        content.insert("skills", lines(&["Skills", "Rust"]));

        let rebuilt = to_source_document(&rebuild_with_sections(&build_docx(&doc), &content));
        let paragraph = rebuilt.paragraphs().next().unwrap();
        assert_eq!(paragraph.text, "Skills");
        assert_eq!(paragraph.style, None);
    }

    #[test]
    fn test_apply_style_reports_undeclared() {
        let mut target = docx_rs::Paragraph::new();
        let missing = docx_rs::Paragraph::new().style("Missing");
        let result = apply_style(&mut target, &missing, &StyleSheet::default());
        assert_eq!(result, Err(StyleError::Undeclared("Missing".to_string())));
        assert!(target.property.style.is_none());

        let heading = docx_rs::Paragraph::new().style("Heading1");
        assert!(apply_style(&mut target, &heading, &heading_styles()).is_ok());
        assert_eq!(
            target.property.style.as_ref().map(|s| s.val.as_str()),
            Some("Heading1")
        );
    }

    #[test]
    fn test_original_is_not_mutated() {
        let original = resume();
        let snapshot = json(&original.document);
        let mut content = ContentMap::new();
        content.insert("summary", lines(&["Changed"]));
        let _ = rebuild_with_sections(&original, &content);
        assert_eq!(json(&original.document), snapshot);
    }

    #[test]
    fn test_fill_placeholders_in_body_and_cells() {
        let mut doc = SourceDocument::new();
        doc.push_paragraph(Paragraph::new("Hello {{NAME}}"));
        doc.push_table(Table {
            rows: vec![vec![Cell::from_text("{{SKILLS}}")]],
        });
        let mut docx = build_docx(&doc);
        let mut content = ContentMap::new();
        content.insert("NAME", ContentValue::Text("Jane".to_string()));
        content.insert("SKILLS", lines(&["Rust", "SQL"]));

        fill_placeholders(&mut docx, &content);
        let view = to_source_document(&docx);
        assert_eq!(texts(&docx), vec!["Hello Jane"]);
        assert_eq!(view.tables().next().unwrap().rows[0][0].text(), "Rust\nSQL");
    }

    #[test]
    fn test_fill_keeps_run_formatting() {
        let italic = docx_rs::Run::new().add_text("Dear {{HIRER}},").italic();
        let mut docx =
            Docx::new().add_paragraph(docx_rs::Paragraph::new().add_run(italic.clone()));
        let mut content = ContentMap::new();
        content.insert("HIRER", ContentValue::Text("Ms. Smith".to_string()));

        fill_placeholders(&mut docx, &content);
        let paragraph = find_paragraph(&docx, "Dear Ms. Smith,");
        assert_eq!(json(&first_run_property(paragraph)), json(&italic.run_property));
    }

    #[test]
    fn test_fill_token_split_across_runs() {
        let head = docx_rs::Run::new().add_text("Hello {{NA").bold();
        let tail = docx_rs::Run::new().add_text("ME}}!");
        let mut docx = Docx::new().add_paragraph(
            docx_rs::Paragraph::new()
                .add_run(head.clone())
                .add_run(tail),
        );
        let mut content = ContentMap::new();
        content.insert("NAME", ContentValue::Text("Jane".to_string()));

        fill_placeholders(&mut docx, &content);
        let paragraph = find_paragraph(&docx, "Hello Jane!");
        assert_eq!(json(&first_run_property(paragraph)), json(&head.run_property));
    }
}
