//! The Pipeline Record threaded through every stage.
//!
//! Stages never mutate the record they receive: each clones it, fills in the
//! fields it owns and returns the extended copy. Fields only ever go from
//! `None` to `Some`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::document::{ContentMap, TemplateContent, TemplateMode};
use crate::errors::AppError;
use crate::generation::JobContext;

/// Caller-supplied input, as received (CLI flags, HTTP body, ...).
/// Required fields default to empty so that absence is reported by
/// validation rather than by deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationInput {
    #[serde(default)]
    pub resume_source_path: String,
    #[serde(default)]
    pub cover_letter_source_path: String,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub company_name: String,
    pub job_description: Option<String>,
    pub company_overview: Option<String>,
    pub hirer_name: Option<String>,
    pub hirer_gender: Option<String>,
    pub relevant_experience: Option<String>,
    pub output_file_name: Option<String>,
    pub mode: Option<TemplateMode>,
}

/// Input after `validate_input`: paths checked, defaults applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedInput {
    pub resume_source_path: PathBuf,
    pub cover_letter_source_path: PathBuf,
    pub job: JobContext,
    pub output_file_name: String,
    pub mode: TemplateMode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRecord {
    pub input: ApplicationInput,
    pub validated: Option<ValidatedInput>,
    pub resume_template: Option<TemplateContent>,
    pub cover_letter_template: Option<TemplateContent>,
    pub resume_content: Option<ContentMap>,
    pub cover_letter_content: Option<ContentMap>,
    pub resume_docx_path: Option<PathBuf>,
    pub resume_pdf_path: Option<PathBuf>,
    pub cover_letter_docx_path: Option<PathBuf>,
    pub cover_letter_pdf_path: Option<PathBuf>,
    pub message: Option<String>,
}

fn require<'a, T>(field: &'a Option<T>, name: &str) -> Result<&'a T, AppError> {
    field
        .as_ref()
        .ok_or_else(|| AppError::validation(format!("Missing pipeline field: {name}")))
}

impl PipelineRecord {
    pub fn new(input: ApplicationInput) -> Self {
        Self {
            input,
            ..Self::default()
        }
    }

    pub fn require_validated(&self) -> Result<&ValidatedInput, AppError> {
        require(&self.validated, "validated input")
    }

    pub fn require_resume_template(&self) -> Result<&TemplateContent, AppError> {
        require(&self.resume_template, "resume_template_content")
    }

    pub fn require_cover_letter_template(&self) -> Result<&TemplateContent, AppError> {
        require(&self.cover_letter_template, "cover_letter_template_content")
    }

    pub fn require_resume_content(&self) -> Result<&ContentMap, AppError> {
        require(&self.resume_content, "resume_content")
    }

    pub fn require_cover_letter_content(&self) -> Result<&ContentMap, AppError> {
        require(&self.cover_letter_content, "cover_letter_content")
    }

    /// The four output paths, in resume docx/pdf, cover letter docx/pdf order.
    pub fn require_output_paths(&self) -> Result<[&Path; 4], AppError> {
        Ok([
            require(&self.resume_docx_path, "resume_docx_path")?.as_path(),
            require(&self.resume_pdf_path, "resume_pdf_path")?.as_path(),
            require(&self.cover_letter_docx_path, "cover_letter_docx_path")?.as_path(),
            require(&self.cover_letter_pdf_path, "cover_letter_pdf_path")?.as_path(),
        ])
    }
}
