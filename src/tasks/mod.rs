//! graph-flow tasks wrapping the three pipeline stages.
//!
//! Stage data travels through the session context. A failed stage or an
//! empty hand-off is recorded under [`keys::FAILURE`] and ends the workflow;
//! only engine faults surface as `GraphError`.

mod analysis;
mod research;
mod synthesis;

pub use analysis::{AnalysisTask, ANALYSIS_TASK};
pub use research::{ResearchTask, RESEARCH_TASK};
pub use synthesis::{SynthesisTask, SYNTHESIS_TASK};

use crate::error::PipelineError;
use crate::pipeline::{transition, PipelineState};
use graph_flow::{Context, GraphError, NextAction, TaskResult};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, warn};

pub(crate) mod keys {
    pub const QUERY: &str = "query";
    pub const STARTED_AT: &str = "started_at";
    pub const RESEARCH: &str = "research";
    pub const SECTIONS: &str = "sections";
    pub const REPORT: &str = "report";
    pub const FAILURE: &str = "failure";
    pub const STATE: &str = "pipeline_state";
    pub const STAGE_TIMES: &str = "stage_times";
}

pub(crate) async fn require<T: DeserializeOwned>(
    context: &Context,
    key: &str,
) -> Result<T, GraphError> {
    context
        .get(key)
        .await
        .ok_or_else(|| GraphError::ContextError(format!("'{}' not found in context", key)))
}

/// Moves the run to `next`, rejecting transitions the state machine forbids.
pub(crate) async fn advance(context: &Context, next: PipelineState) -> Result<(), GraphError> {
    let current: PipelineState = context.get(keys::STATE).await.unwrap_or_default();
    let next = transition(current, next).map_err(|e| GraphError::ContextError(e.to_string()))?;
    context.set(keys::STATE, next).await;
    debug!(from = ?current, to = ?next, "Pipeline state changed");
    Ok(())
}

/// Records `error` as the outcome of the run and stops the workflow.
pub(crate) async fn fail(context: &Context, error: PipelineError) -> Result<TaskResult, GraphError> {
    warn!(error = %error, "Pipeline run failed");
    advance(context, PipelineState::Failed).await?;
    context.set(keys::FAILURE, error.clone()).await;
    Ok(TaskResult::new(Some(error.to_string()), NextAction::End))
}

pub(crate) async fn record_stage_time(context: &Context, stage: &str, start_time: Instant) {
    let elapsed = start_time.elapsed().as_millis() as u64;
    let mut stage_times: HashMap<String, u64> =
        context.get(keys::STAGE_TIMES).await.unwrap_or_default();
    stage_times.insert(stage.to_string(), elapsed);
    context.set(keys::STAGE_TIMES, stage_times).await;
}
