//! Content generation: builds one prompt per document, makes a single model
//! call, and parses the reply into a [`ContentMap`].

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::document::{ContentMap, TemplateContent, TemplateMode};
use crate::errors::AppError;
use crate::generation::parse::parse_content_map;
use crate::generation::prompts::{
    COVER_LETTER_SYSTEM, HIRING_MANAGER_LINES, PLACEHOLDERS_KEY_INSTRUCTION, RESUME_SYSTEM,
    SECTIONS_KEY_INSTRUCTION, USER_PROMPT_TEMPLATE,
};
use crate::llm_client::prompts::{JSON_OBJECT_SYSTEM, PRESERVE_STRUCTURE_INSTRUCTION};
use crate::llm_client::TextGenerator;

// ────────────────────────────────────────────────────────────────────────────
// Job context
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HirerGender {
    Male,
    Female,
    #[default]
    Unknown,
}

impl HirerGender {
    /// Lenient normalisation: anything unrecognised is `Unknown`.
    pub fn normalize(raw: &str) -> Self {
        raw.parse().unwrap_or_default()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HirerGender::Male => "male",
            HirerGender::Female => "female",
            HirerGender::Unknown => "unknown",
        }
    }
}

impl fmt::Display for HirerGender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HirerGender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(HirerGender::Male),
            "female" => Ok(HirerGender::Female),
            "unknown" | "" => Ok(HirerGender::Unknown),
            other => Err(format!("unknown hirer gender '{other}'")),
        }
    }
}

/// Job, company and candidate text that goes into every prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobContext {
    pub job_title: String,
    pub company_name: String,
    pub job_description: String,
    pub company_overview: String,
    pub hirer_name: String,
    pub hirer_gender: HirerGender,
    pub relevant_experience: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Generator
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    Resume,
    CoverLetter,
}

impl DocumentKind {
    fn label(self) -> &'static str {
        match self {
            DocumentKind::Resume => "resume",
            DocumentKind::CoverLetter => "cover letter",
        }
    }
}

#[derive(Clone)]
pub struct ContentGenerator {
    llm: Arc<dyn TextGenerator>,
}

impl ContentGenerator {
    pub fn new(llm: Arc<dyn TextGenerator>) -> Self {
        Self { llm }
    }

    pub async fn generate_resume(
        &self,
        template: &TemplateContent,
        job: &JobContext,
        mode: TemplateMode,
    ) -> Result<ContentMap, AppError> {
        self.generate(DocumentKind::Resume, template, job, mode).await
    }

    pub async fn generate_cover_letter(
        &self,
        template: &TemplateContent,
        job: &JobContext,
        mode: TemplateMode,
    ) -> Result<ContentMap, AppError> {
        self.generate(DocumentKind::CoverLetter, template, job, mode)
            .await
    }

    async fn generate(
        &self,
        kind: DocumentKind,
        template: &TemplateContent,
        job: &JobContext,
        mode: TemplateMode,
    ) -> Result<ContentMap, AppError> {
        let system = build_system_prompt(kind);
        let prompt = build_user_prompt(kind, template, job, mode)?;

        info!(
            "Generating {} content for '{}' at '{}' ({mode} mode)",
            kind.label(),
            job.job_title,
            job.company_name
        );
        let raw = self.llm.complete(&prompt, &system).await?;
        let content = parse_content_map(&raw)?;

        let known = template.keys(mode);
        let unknown = content.unknown_keys(&known);
        if !unknown.is_empty() {
            warn!(
                "Generated {} content has keys not in the template, ignoring: {:?}",
                kind.label(),
                unknown
            );
        }
        let missing: Vec<&String> = known.iter().filter(|k| content.get(k).is_none()).collect();
        if !missing.is_empty() {
            warn!(
                "Generated {} content is missing keys, originals kept: {:?}",
                kind.label(),
                missing
            );
        }
        Ok(content)
    }
}

fn field_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{(\w+)\}").expect("prompt field pattern is valid"))
}

/// Fills the `{name}` fields of `template` in a single pass. Unknown names
/// stay as written and inserted values are never scanned for fields.
fn fill_template(template: &str, fields: &[(&str, &str)]) -> String {
    field_pattern()
        .replace_all(template, |caps: &Captures| {
            fields
                .iter()
                .find(|(name, _)| *name == &caps[1])
                .map_or_else(|| caps[0].to_string(), |(_, value)| value.to_string())
        })
        .into_owned()
}

fn build_system_prompt(kind: DocumentKind) -> String {
    let template = match kind {
        DocumentKind::Resume => RESUME_SYSTEM,
        DocumentKind::CoverLetter => COVER_LETTER_SYSTEM,
    };
    fill_template(
        template,
        &[
            ("preserve_instruction", PRESERVE_STRUCTURE_INSTRUCTION),
            ("json_instruction", JSON_OBJECT_SYSTEM),
        ],
    )
}

/// Pretty Section Map (sections mode) or sorted placeholder names.
fn build_payload(template: &TemplateContent, mode: TemplateMode) -> Result<String, AppError> {
    let json = match mode {
        TemplateMode::Sections => serde_json::to_string_pretty(&template.sections),
        TemplateMode::Placeholders => serde_json::to_string_pretty(&template.placeholders),
    };
    json.map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize template payload: {e}")))
}

fn or_none(text: &str) -> &str {
    if text.trim().is_empty() {
        "(none provided)"
    } else {
        text
    }
}

fn build_user_prompt(
    kind: DocumentKind,
    template: &TemplateContent,
    job: &JobContext,
    mode: TemplateMode,
) -> Result<String, AppError> {
    let payload = build_payload(template, mode)?;

    let hiring_manager = match kind {
        DocumentKind::Resume => String::new(),
        DocumentKind::CoverLetter => fill_template(
            HIRING_MANAGER_LINES,
            &[
                ("hirer_name", or_none(&job.hirer_name)),
                ("hirer_gender", job.hirer_gender.as_str()),
            ],
        ),
    };
    let (payload_label, key_instruction) = match mode {
        TemplateMode::Sections => (
            format!("Original {} content by section", kind.label()),
            SECTIONS_KEY_INSTRUCTION,
        ),
        TemplateMode::Placeholders => (
            format!("Placeholders in the {} template", kind.label()),
            PLACEHOLDERS_KEY_INSTRUCTION,
        ),
    };

    Ok(fill_template(
        USER_PROMPT_TEMPLATE,
        &[
            ("hiring_manager", hiring_manager.as_str()),
            ("payload_label", payload_label.as_str()),
            ("key_instruction", key_instruction),
            ("payload", payload.as_str()),
            ("job_title", job.job_title.as_str()),
            ("company_name", job.company_name.as_str()),
            ("job_description", or_none(&job.job_description)),
            ("company_overview", or_none(&job.company_overview)),
            ("relevant_experience", or_none(&job.relevant_experience)),
        ],
    ))
}
