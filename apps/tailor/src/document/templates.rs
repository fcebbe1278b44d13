//! Starter resume and cover-letter templates for trying the tool out.

use std::path::{Path, PathBuf};

use tracing::info;

use super::model::{Paragraph, SourceDocument, StyleSheet};
use super::{save_document, DocumentError};

pub const RESUME_TEMPLATE_FILE: &str = "resume_template.docx";
pub const COVER_LETTER_TEMPLATE_FILE: &str = "cover_letter_template.docx";

const RESUME_SECTIONS: &[(&str, &str)] = &[
    ("Professional Summary", "{{SUMMARY}}"),
    ("Skills", "{{SKILLS}}"),
    ("Experience", "{{EXPERIENCE}}"),
    ("Education", "{{EDUCATION}}"),
    ("Projects", "{{PROJECTS}}"),
    ("Certifications", "{{CERTIFICATIONS}}"),
];

const COVER_LETTER_BODY: &[&str] = &[
    "{{GREETING}}",
    "{{INTRODUCTION}}",
    "{{BODY}}",
    "{{CLOSING}}",
];

fn template_styles() -> StyleSheet {
    let mut styles = StyleSheet::default();
    for (id, name) in [("Title", "Title"), ("Heading1", "heading 1")] {
        styles.paragraph_styles.insert(id.to_string(), name.to_string());
    }
    styles
}

pub fn resume_template() -> SourceDocument {
    let mut doc = SourceDocument::with_styles(template_styles());
    doc.push_paragraph(Paragraph::styled("Your Name", "Title"));
    doc.push_paragraph(Paragraph::new(
        "email@example.com | (123) 456-7890 | City, State | LinkedIn: linkedin.com/in/yourname",
    ));
    for (heading, token) in RESUME_SECTIONS {
        doc.push_paragraph(Paragraph::styled(*heading, "Heading1"));
        doc.push_paragraph(Paragraph::new(*token));
    }
    doc
}

pub fn cover_letter_template() -> SourceDocument {
    let mut doc = SourceDocument::with_styles(template_styles());
    doc.push_paragraph(Paragraph::new("Date: [Current Date]"));
    for token in COVER_LETTER_BODY {
        doc.push_paragraph(Paragraph::new(*token));
    }
    doc.push_paragraph(Paragraph::new(
        "{{SIGNATURE}}\nYour Name\nemail@example.com\n(123) 456-7890",
    ));
    doc
}

/// Writes both starter templates into `dir`, returning (resume, cover letter).
pub fn write_example_templates(dir: &Path) -> Result<(PathBuf, PathBuf), DocumentError> {
    let resume = save_document(&resume_template(), &dir.join(RESUME_TEMPLATE_FILE))?;
    let cover_letter =
        save_document(&cover_letter_template(), &dir.join(COVER_LETTER_TEMPLATE_FILE))?;
    info!("Example templates written to {}", dir.display());
    Ok((resume, cover_letter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{process_template, Category, TemplateMode};

    #[test]
    fn test_example_templates_classify_in_both_modes() {
        let dir = tempfile::tempdir().unwrap();
        let (resume, cover_letter) = write_example_templates(dir.path()).unwrap();

        let resume = process_template(&resume).unwrap();
        assert!(resume.placeholders.contains("SUMMARY"));
        assert!(resume.placeholders.contains("CERTIFICATIONS"));
        assert_eq!(resume.sections.get(Category::Skills), ["Skills", "{{SKILLS}}"]);
        assert_eq!(
            resume.sections.get(Category::Summary),
            ["Professional Summary", "{{SUMMARY}}"]
        );

        let letter = process_template(&cover_letter).unwrap();
        assert_eq!(letter.keys(TemplateMode::Placeholders).len(), 5);
    }
}
