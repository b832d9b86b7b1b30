use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Terminal failure of a report pipeline run.
///
/// Stage variants replace the underlying cause with a fixed message; the
/// cause itself is only logged. The `Empty*` variants are raised by the
/// orchestrator when a stage succeeds with nothing to hand on.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum PipelineError {
    #[error("Failed to conduct research")]
    Research,

    #[error("Failed to analyze research data")]
    Analysis,

    #[error("Failed to synthesize report")]
    Synthesis,

    #[error("No research data found")]
    EmptyResearch,

    #[error("Analysis failed to generate sections")]
    EmptyAnalysis,

    #[error("Workflow engine error: {0}")]
    Engine(String),
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
