use std::path::PathBuf;

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::pipeline::{ApplicationInput, CheckpointSummary, PipelineRecord, PipelineStage};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ApplicationResponse {
    pub session_id: String,
    pub message: Option<String>,
    pub resume_docx_path: Option<PathBuf>,
    pub resume_pdf_path: Option<PathBuf>,
    pub cover_letter_docx_path: Option<PathBuf>,
    pub cover_letter_pdf_path: Option<PathBuf>,
}

impl ApplicationResponse {
    fn from_record(session_id: String, record: PipelineRecord) -> Self {
        Self {
            session_id,
            message: record.message,
            resume_docx_path: record.resume_docx_path,
            resume_pdf_path: record.resume_pdf_path,
            cover_letter_docx_path: record.cover_letter_docx_path,
            cover_letter_pdf_path: record.cover_letter_pdf_path,
        }
    }
}

/// Progress of a session. The stored record (template contents, generated
/// text) stays server-side.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub stage: PipelineStage,
    pub updated_at: DateTime<Utc>,
    pub history: Vec<CheckpointSummary>,
    #[serde(flatten)]
    pub application: ApplicationResponse,
}

/// POST /api/v1/applications
/// Runs the whole pipeline for one application under a fresh session id.
pub async fn handle_create_application(
    State(state): State<AppState>,
    Json(input): Json<ApplicationInput>,
) -> Result<Json<ApplicationResponse>, AppError> {
    let session_id = Uuid::new_v4().to_string();
    let record = state.runner.run(&session_id, input).await?;
    Ok(Json(ApplicationResponse::from_record(session_id, record)))
}

/// GET /api/v1/applications/:session_id
pub async fn handle_get_application(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    let store = state
        .runner
        .checkpoints()
        .ok_or_else(|| AppError::NotFound("Session storage is disabled".to_string()))?;
    let checkpoint = store
        .load_latest(&session_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Session {session_id}")))?;
    let history = store.history(&session_id).await?;

    Ok(Json(SessionResponse {
        stage: checkpoint.stage,
        updated_at: checkpoint.created_at,
        history,
        application: ApplicationResponse::from_record(session_id, checkpoint.record),
    }))
}
