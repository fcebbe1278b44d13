use crate::pipeline::PipelineRunner;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Holds the stage collaborators (LLM-backed generator, converter) and the
    /// optional checkpoint store.
    pub runner: PipelineRunner,
}
