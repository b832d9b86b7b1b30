use super::{advance, fail, keys, record_stage_time, require};
use crate::agents::Researcher;
use crate::error::PipelineError;
use crate::pipeline::PipelineState;
use async_trait::async_trait;
use chrono::Utc;
use graph_flow::{Context, GraphError, NextAction, Task, TaskResult};
use std::sync::Arc;
use tracing::{info, instrument};

pub const RESEARCH_TASK: &str = "research";

pub struct ResearchTask {
    researcher: Arc<dyn Researcher>,
}

impl ResearchTask {
    pub fn new(researcher: Arc<dyn Researcher>) -> Self {
        Self { researcher }
    }
}

#[async_trait]
impl Task for ResearchTask {
    fn id(&self) -> &str {
        RESEARCH_TASK
    }

    #[instrument(skip(self, context))]
    async fn run(&self, context: Context) -> Result<TaskResult, GraphError> {
        let start_time = std::time::Instant::now();
        info!("Starting research task");

        advance(&context, PipelineState::Researching).await?;
        context.set(keys::STARTED_AT, Utc::now()).await;
        let query: String = require(&context, keys::QUERY).await?;

        let outcome = self.researcher.research(&query).await;
        record_stage_time(&context, RESEARCH_TASK, start_time).await;

        let research = match outcome {
            Ok(research) if research.is_empty() => {
                return fail(&context, PipelineError::EmptyResearch).await
            }
            Ok(research) => research,
            Err(e) => return fail(&context, e).await,
        };

        info!("Research produced {} sources", research.len());
        context.set(keys::RESEARCH, research).await;

        Ok(TaskResult::new(
            Some("Research completed successfully".to_string()),
            NextAction::ContinueAndExecute,
        ))
    }
}
