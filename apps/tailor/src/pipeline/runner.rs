use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::checkpoint::CheckpointStore;
use super::record::{ApplicationInput, PipelineRecord};
use super::stages::{self, StageContext};
use crate::errors::AppError;

/// The five states of a run, in execution order. There is no branching and
/// no way back to an earlier stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    ValidateInput,
    GenerateResume,
    GenerateCoverLetter,
    AssembleDocuments,
    FinalizeOutput,
}

impl PipelineStage {
    pub const ALL: [PipelineStage; 5] = [
        PipelineStage::ValidateInput,
        PipelineStage::GenerateResume,
        PipelineStage::GenerateCoverLetter,
        PipelineStage::AssembleDocuments,
        PipelineStage::FinalizeOutput,
    ];

    pub fn next(self) -> Option<PipelineStage> {
        match self {
            PipelineStage::ValidateInput => Some(PipelineStage::GenerateResume),
            PipelineStage::GenerateResume => Some(PipelineStage::GenerateCoverLetter),
            PipelineStage::GenerateCoverLetter => Some(PipelineStage::AssembleDocuments),
            PipelineStage::AssembleDocuments => Some(PipelineStage::FinalizeOutput),
            PipelineStage::FinalizeOutput => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStage::ValidateInput => "validate_input",
            PipelineStage::GenerateResume => "generate_resume",
            PipelineStage::GenerateCoverLetter => "generate_cover_letter",
            PipelineStage::AssembleDocuments => "assemble_documents",
            PipelineStage::FinalizeOutput => "finalize_output",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PipelineStage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| format!("unknown pipeline stage '{s}'"))
    }
}

/// Drives a record through the stages one at a time, checkpointing after each.
#[derive(Clone)]
pub struct PipelineRunner {
    ctx: StageContext,
    checkpoints: Option<CheckpointStore>,
}

impl PipelineRunner {
    pub fn new(ctx: StageContext, checkpoints: Option<CheckpointStore>) -> Self {
        Self { ctx, checkpoints }
    }

    pub fn checkpoints(&self) -> Option<&CheckpointStore> {
        self.checkpoints.as_ref()
    }

    /// Runs a fresh session from the first stage.
    pub async fn run(
        &self,
        session_id: &str,
        input: ApplicationInput,
    ) -> Result<PipelineRecord, AppError> {
        info!("Starting pipeline session {session_id}");
        self.run_from(session_id, PipelineStage::ValidateInput, PipelineRecord::new(input))
            .await
    }

    /// Continues a session from the stage after its latest checkpoint.
    /// A session that already finished returns its final record unchanged.
    pub async fn resume(&self, session_id: &str) -> Result<PipelineRecord, AppError> {
        let store = self.checkpoints.as_ref().ok_or_else(|| {
            AppError::validation("Resuming a session requires a checkpoint store")
        })?;
        let checkpoint = store
            .load_latest(session_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No checkpoint for session {session_id}")))?;

        match checkpoint.stage.next() {
            Some(stage) => {
                info!(
                    "Resuming session {session_id} at {stage} (last completed: {})",
                    checkpoint.stage
                );
                self.run_from(session_id, stage, checkpoint.record).await
            }
            None => {
                info!("Session {session_id} already finished");
                Ok(checkpoint.record)
            }
        }
    }

    async fn run_from(
        &self,
        session_id: &str,
        first: PipelineStage,
        mut record: PipelineRecord,
    ) -> Result<PipelineRecord, AppError> {
        let mut stage = Some(first);
        while let Some(current) = stage {
            info!("[{session_id}] → {current}");
            record = self.run_stage(current, &record).await?;
            if let Some(store) = &self.checkpoints {
                store.save(session_id, current, &record).await?;
            }
            info!("[{session_id}] ← {current}");
            stage = current.next();
        }
        Ok(record)
    }

    async fn run_stage(
        &self,
        stage: PipelineStage,
        record: &PipelineRecord,
    ) -> Result<PipelineRecord, AppError> {
        let ctx = &self.ctx;
        match stage {
            PipelineStage::ValidateInput => stages::validate_input(ctx, record).await,
            PipelineStage::GenerateResume => stages::generate_resume(ctx, record).await,
            PipelineStage::GenerateCoverLetter => stages::generate_cover_letter(ctx, record).await,
            PipelineStage::AssembleDocuments => stages::assemble_documents(ctx, record).await,
            PipelineStage::FinalizeOutput => stages::finalize_output(ctx, record).await,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use super::*;
    use crate::document::templates::write_example_templates;
    use crate::document::{read_document, TemplateMode};
    use crate::generation::generator::tests::StubGenerator;
    use crate::generation::ContentGenerator;
    use crate::pipeline::checkpoint::tests::memory_store;
    use crate::pipeline::stages::SUCCESS_MESSAGE;
    use crate::render::FormatConverter;

    const RESUME_REPLY: &str = r#"Sure:
```json
{"SUMMARY": "Rust engineer with eight years of backend work.",
 "SKILLS": ["Rust", "PostgreSQL", "Kubernetes"],
 "EXPERIENCE": "Example Corp, 2019-2024: led the billing rewrite."}
```"#;
    const COVER_LETTER_REPLY: &str = r#"{"GREETING": "Dear Mr. Smith,",
 "INTRODUCTION": "I am applying for the Software Engineer role.",
 "BODY": ["I build reliable services.", "I enjoy mentoring."],
 "CLOSING": "Thank you for your time.",
 "SIGNATURE": "Sincerely,"}"#;

    /// Stage collaborators backed by canned LLM replies. Neither pandoc nor
    /// the HTML renderer is ever found, so PDFs always take both fallbacks.
    pub(crate) fn stage_context(output_root: &Path, replies: &[&str]) -> StageContext {
        StageContext {
            generator: ContentGenerator::new(Arc::new(StubGenerator::new(replies))),
            converter: FormatConverter::new("no-such-pandoc", "no-such-renderer")
                .with_scratch_dir(output_root.join(".scratch")),
            output_root: output_root.to_path_buf(),
            default_mode: TemplateMode::Placeholders,
        }
    }

    fn input(dir: &Path) -> ApplicationInput {
        let (resume, cover_letter) = write_example_templates(dir).unwrap();
        ApplicationInput {
            resume_source_path: resume.display().to_string(),
            cover_letter_source_path: cover_letter.display().to_string(),
            job_title: "Software Engineer".to_string(),
            company_name: "Example Corp".to_string(),
            job_description: Some("Backend services in Rust".to_string()),
            hirer_name: Some("John Smith".to_string()),
            hirer_gender: Some("Male".to_string()),
            ..ApplicationInput::default()
        }
    }

    #[test]
    fn test_stage_order_is_linear() {
        let mut seen = vec![PipelineStage::ValidateInput];
        while let Some(next) = seen.last().and_then(|s| s.next()) {
            seen.push(next);
        }
        assert_eq!(seen, PipelineStage::ALL.to_vec());
        for stage in PipelineStage::ALL {
            assert_eq!(stage.as_str().parse::<PipelineStage>().unwrap(), stage);
        }
        assert!("render".parse::<PipelineStage>().is_err());
    }

    #[tokio::test]
    async fn test_end_to_end_writes_four_documents() {
        let dir = tempfile::tempdir().unwrap();
        let output_root = dir.path().join("output");
        let runner = PipelineRunner::new(
            stage_context(&output_root, &[RESUME_REPLY, COVER_LETTER_REPLY]),
            None,
        );

        let record = runner.run("session-1", input(dir.path())).await.unwrap();

        assert_eq!(record.message.as_deref(), Some(SUCCESS_MESSAGE));
        let run_dir = output_root.join("example_corp_software_engineer");
        let expected = [
            run_dir.join("resume.docx"),
            run_dir.join("resume.pdf"),
            run_dir.join("cover_letter.docx"),
            run_dir.join("cover_letter.pdf"),
        ];
        let recorded = record.require_output_paths().unwrap();
        for (path, recorded) in expected.iter().zip(recorded) {
            assert_eq!(path.as_path(), recorded);
            assert!(std::fs::metadata(path).unwrap().len() > 0);
        }

        let resume_text = read_document(&expected[0]).unwrap().flattened_text();
        assert!(resume_text.contains("Rust engineer with eight years"));
        assert!(!resume_text.contains("{{SUMMARY}}"));
        // no generated value: the token survives untouched
        assert!(resume_text.contains("{{EDUCATION}}"));

        let letter_text = read_document(&expected[2]).unwrap().flattened_text();
        assert!(letter_text.contains("Dear Mr. Smith,"));
    }

    #[tokio::test]
    async fn test_sections_mode_replaces_original_section_text() {
        let dir = tempfile::tempdir().unwrap();
        let output_root = dir.path().join("output");
        let resume_reply = r#"{"summary": ["Professional Summary", "Rust engineer who ships."],
            "skills": ["Skills", "Rust, PostgreSQL, Kafka"]}"#;
        let letter_reply = r#"{"other": ["Dear Mr. Smith,", "I am applying for the role."]}"#;
        let runner = PipelineRunner::new(
            stage_context(&output_root, &[resume_reply, letter_reply]),
            None,
        );
        let mut input = input(dir.path());
        input.mode = Some(TemplateMode::Sections);

        let record = runner.run("sections", input).await.unwrap();
        let [resume_docx, _, letter_docx, _] = record.require_output_paths().unwrap();

        let resume = read_document(resume_docx).unwrap();
        let resume_text = resume.flattened_text();
        assert!(!resume_text.contains("{{SUMMARY}}"));
        assert!(!resume_text.contains("{{SKILLS}}"));
        assert!(resume_text.contains("Rust engineer who ships."));
        assert!(resume_text.contains("Rust, PostgreSQL, Kafka"));
        // categories without generated content are left as they were
        assert!(resume_text.contains("{{EDUCATION}}"));
        assert!(resume_text.contains("Your Name"));
        let heading = resume
            .paragraphs()
            .find(|p| p.text == "Professional Summary")
            .unwrap();
        assert_eq!(heading.style.as_deref(), Some("Heading1"));

        let letter_text = read_document(letter_docx).unwrap().flattened_text();
        assert!(letter_text.contains("Dear Mr. Smith,"));
        assert!(!letter_text.contains("{{GREETING}}"));
    }

    #[tokio::test]
    async fn test_validation_failure_stops_before_generation() {
        let dir = tempfile::tempdir().unwrap();
        let runner = PipelineRunner::new(stage_context(dir.path(), &[]), None);
        let mut input = input(dir.path());
        input.company_name = "  ".to_string();

        let err = runner.run("s", input).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("company_name")));
    }

    #[tokio::test]
    async fn test_resume_continues_after_last_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let output_root = dir.path().join("output");
        let store = memory_store().await;

        // Only one reply: the cover letter request fails.
        let first = PipelineRunner::new(
            stage_context(&output_root, &[RESUME_REPLY]),
            Some(store.clone()),
        );
        assert!(first.run("s1", input(dir.path())).await.is_err());
        let latest = store.load_latest("s1").await.unwrap().unwrap();
        assert_eq!(latest.stage, PipelineStage::GenerateResume);

        // The resumed run must not ask for the resume again.
        let second = PipelineRunner::new(
            stage_context(&output_root, &[COVER_LETTER_REPLY]),
            Some(store.clone()),
        );
        let record = second.resume("s1").await.unwrap();
        assert_eq!(record.message.as_deref(), Some(SUCCESS_MESSAGE));

        let stages: Vec<PipelineStage> = store
            .history("s1")
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.stage)
            .collect();
        assert_eq!(stages, PipelineStage::ALL.to_vec());

        // Finished sessions come back as-is.
        let again = second.resume("s1").await.unwrap();
        assert_eq!(again, record);
    }

    #[tokio::test]
    async fn test_resume_unknown_session_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let runner = PipelineRunner::new(stage_context(dir.path(), &[]), Some(memory_store().await));
        assert!(matches!(
            runner.resume("nope").await,
            Err(AppError::NotFound(_))
        ));

        let without_store = PipelineRunner::new(stage_context(dir.path(), &[]), None);
        assert!(matches!(
            without_store.resume("nope").await,
            Err(AppError::Validation(_))
        ));
    }
}
