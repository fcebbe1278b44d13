// Five-stage linear workflow: validate → resume → cover letter → assemble → finalize.

pub mod checkpoint;
pub mod handlers;
pub mod record;
pub mod runner;
pub mod stages;

pub use checkpoint::{CheckpointStore, CheckpointSummary};
pub use record::{ApplicationInput, PipelineRecord};
pub use runner::{PipelineRunner, PipelineStage};
pub use stages::StageContext;
