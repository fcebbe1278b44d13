//! The five pipeline stages. Each takes the current record by reference and
//! returns an extended copy.

use std::path::{Path, PathBuf};

use tokio::task;
use tracing::info;

use crate::document::{
    process_template, save_package, ContentMap, TemplateContent, TemplateMode,
};
use crate::errors::AppError;
use crate::generation::{ContentGenerator, HirerGender, JobContext};
use crate::pipeline::record::{PipelineRecord, ValidatedInput};
use crate::render::FormatConverter;

pub const RESUME_STEM: &str = "resume";
pub const COVER_LETTER_STEM: &str = "cover_letter";
pub const SUCCESS_MESSAGE: &str = "Document generation completed successfully";

/// Collaborators shared by every stage of a run.
#[derive(Clone)]
pub struct StageContext {
    pub generator: ContentGenerator,
    pub converter: FormatConverter,
    /// Each run writes into `<output_root>/<output_file_name>/`.
    pub output_root: PathBuf,
    /// Used when the input does not choose a mode.
    pub default_mode: TemplateMode,
}

fn join_error(e: task::JoinError) -> AppError {
    AppError::Internal(anyhow::anyhow!("Blocking document task failed: {e}"))
}

/// `<company>_<title>`, lower-cased, with spaces and path separators mapped
/// to `_` so the result is always a single path component.
pub fn default_output_name(company_name: &str, job_title: &str) -> String {
    format!("{company_name}_{job_title}")
        .replace([' ', '/', '\\', '\0'], "_")
        .replace("..", "_")
        .to_lowercase()
}

fn non_empty(value: &str, field: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn existing_path(value: &str, field: &str) -> Result<PathBuf, AppError> {
    let path = PathBuf::from(non_empty(value, field)?);
    if !path.is_file() {
        return Err(AppError::validation(format!(
            "{field} does not exist: {}",
            path.display()
        )));
    }
    Ok(path)
}

/// Rejects names that would escape the output root.
fn safe_output_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.contains('\0');
    if valid {
        Ok(name.to_string())
    } else {
        Err(AppError::validation(format!(
            "output_file_name '{name}' is not a valid directory name"
        )))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Stage 1: validate input
// ────────────────────────────────────────────────────────────────────────────

/// Checks required fields and template paths, applies defaults, and reads and
/// classifies both templates (once per run).
pub async fn validate_input(
    ctx: &StageContext,
    record: &PipelineRecord,
) -> Result<PipelineRecord, AppError> {
    let input = &record.input;
    let resume_path = existing_path(&input.resume_source_path, "resume_source_path")?;
    let cover_letter_path =
        existing_path(&input.cover_letter_source_path, "cover_letter_source_path")?;
    let job_title = non_empty(&input.job_title, "job_title")?;
    let company_name = non_empty(&input.company_name, "company_name")?;

    let output_file_name = match input.output_file_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => safe_output_name(name)?,
        _ => default_output_name(&company_name, &job_title),
    };

    let job = JobContext {
        job_title,
        company_name,
        job_description: input.job_description.clone().unwrap_or_default(),
        company_overview: input.company_overview.clone().unwrap_or_default(),
        hirer_name: input.hirer_name.clone().unwrap_or_default(),
        hirer_gender: HirerGender::normalize(input.hirer_gender.as_deref().unwrap_or_default()),
        relevant_experience: input.relevant_experience.clone().unwrap_or_default(),
    };

    let (resume_template, cover_letter_template) = {
        let resume_path = resume_path.clone();
        let cover_letter_path = cover_letter_path.clone();
        task::spawn_blocking(move || -> Result<(TemplateContent, TemplateContent), AppError> {
            Ok((
                process_template(&resume_path)?,
                process_template(&cover_letter_path)?,
            ))
        })
        .await
        .map_err(join_error)??
    };

    let mut next = record.clone();
    next.validated = Some(ValidatedInput {
        resume_source_path: resume_path,
        cover_letter_source_path: cover_letter_path,
        job,
        output_file_name,
        mode: input.mode.unwrap_or(ctx.default_mode),
    });
    next.resume_template = Some(resume_template);
    next.cover_letter_template = Some(cover_letter_template);
    Ok(next)
}

// ────────────────────────────────────────────────────────────────────────────
// Stages 2 and 3: content generation
// ────────────────────────────────────────────────────────────────────────────

pub async fn generate_resume(
    ctx: &StageContext,
    record: &PipelineRecord,
) -> Result<PipelineRecord, AppError> {
    let validated = record.require_validated()?;
    let template = record.require_resume_template()?;

    let content = ctx
        .generator
        .generate_resume(template, &validated.job, validated.mode)
        .await?;

    let mut next = record.clone();
    next.resume_content = Some(content);
    Ok(next)
}

pub async fn generate_cover_letter(
    ctx: &StageContext,
    record: &PipelineRecord,
) -> Result<PipelineRecord, AppError> {
    let validated = record.require_validated()?;
    let template = record.require_cover_letter_template()?;

    let content = ctx
        .generator
        .generate_cover_letter(template, &validated.job, validated.mode)
        .await?;

    let mut next = record.clone();
    next.cover_letter_content = Some(content);
    Ok(next)
}

// ────────────────────────────────────────────────────────────────────────────
// Stage 4: assemble documents
// ────────────────────────────────────────────────────────────────────────────

/// Writes `<dir>/<stem>.docx` and renders `<dir>/<stem>.pdf` from it.
fn write_pair(
    converter: &FormatConverter,
    template: &TemplateContent,
    mode: TemplateMode,
    content: &ContentMap,
    dir: &Path,
    stem: &str,
) -> Result<(PathBuf, PathBuf), AppError> {
    let package = template.render(mode, content)?;
    let docx = save_package(package, &dir.join(format!("{stem}.docx")))?;
    let pdf = converter.docx_to_pdf(&docx, &dir.join(format!("{stem}.pdf")))?;
    Ok((docx, pdf))
}

pub async fn assemble_documents(
    ctx: &StageContext,
    record: &PipelineRecord,
) -> Result<PipelineRecord, AppError> {
    let validated = record.require_validated()?;
    let resume_template = record.require_resume_template()?.clone();
    let cover_letter_template = record.require_cover_letter_template()?.clone();
    let resume_content = record.require_resume_content()?.clone();
    let cover_letter_content = record.require_cover_letter_content()?.clone();

    let mode = validated.mode;
    let dir = ctx.output_root.join(&validated.output_file_name);
    let converter = ctx.converter.clone();

    let (resume, cover_letter) = task::spawn_blocking(move || {
        std::fs::create_dir_all(&dir).map_err(anyhow::Error::from)?;
        let resume = write_pair(
            &converter,
            &resume_template,
            mode,
            &resume_content,
            &dir,
            RESUME_STEM,
        )?;
        let cover_letter = write_pair(
            &converter,
            &cover_letter_template,
            mode,
            &cover_letter_content,
            &dir,
            COVER_LETTER_STEM,
        )?;
        Ok::<_, AppError>((resume, cover_letter))
    })
    .await
    .map_err(join_error)??;

    let mut next = record.clone();
    next.resume_docx_path = Some(resume.0);
    next.resume_pdf_path = Some(resume.1);
    next.cover_letter_docx_path = Some(cover_letter.0);
    next.cover_letter_pdf_path = Some(cover_letter.1);
    Ok(next)
}

// ────────────────────────────────────────────────────────────────────────────
// Stage 5: finalize
// ────────────────────────────────────────────────────────────────────────────

/// Fails loudly unless all four output files are recorded and present.
pub async fn finalize_output(
    _ctx: &StageContext,
    record: &PipelineRecord,
) -> Result<PipelineRecord, AppError> {
    for path in record.require_output_paths()? {
        if !path.is_file() {
            return Err(AppError::validation(format!(
                "Output file is missing: {}",
                path.display()
            )));
        }
    }
    info!("All output documents present");

    let mut next = record.clone();
    next.message = Some(SUCCESS_MESSAGE.to_string());
    Ok(next)
}
