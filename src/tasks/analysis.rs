use super::{advance, fail, keys, record_stage_time, require};
use crate::agents::Analyst;
use crate::error::PipelineError;
use crate::models::ResearchDatum;
use crate::pipeline::PipelineState;
use async_trait::async_trait;
use graph_flow::{Context, GraphError, NextAction, Task, TaskResult};
use std::sync::Arc;
use tracing::{info, instrument};

pub const ANALYSIS_TASK: &str = "analysis";

pub struct AnalysisTask {
    analyst: Arc<dyn Analyst>,
}

impl AnalysisTask {
    pub fn new(analyst: Arc<dyn Analyst>) -> Self {
        Self { analyst }
    }
}

#[async_trait]
impl Task for AnalysisTask {
    fn id(&self) -> &str {
        ANALYSIS_TASK
    }

    #[instrument(skip(self, context))]
    async fn run(&self, context: Context) -> Result<TaskResult, GraphError> {
        let start_time = std::time::Instant::now();
        info!("Starting analysis task");

        advance(&context, PipelineState::Analyzing).await?;
        let query: String = require(&context, keys::QUERY).await?;
        let research: Vec<ResearchDatum> = require(&context, keys::RESEARCH).await?;

        let outcome = self.analyst.analyze(&query, &research).await;
        record_stage_time(&context, ANALYSIS_TASK, start_time).await;

        let sections = match outcome {
            Ok(sections) if sections.is_empty() => {
                return fail(&context, PipelineError::EmptyAnalysis).await
            }
            Ok(sections) => sections,
            Err(e) => return fail(&context, e).await,
        };

        info!("Analysis produced {} sections", sections.len());
        context.set(keys::SECTIONS, sections).await;

        Ok(TaskResult::new(
            Some("Analysis completed successfully".to_string()),
            NextAction::ContinueAndExecute,
        ))
    }
}
