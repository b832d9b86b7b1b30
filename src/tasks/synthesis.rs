use super::{advance, fail, keys, record_stage_time, require};
use crate::agents::Writer;
use crate::models::{AnalysisSection, ResearchDatum};
use crate::pipeline::PipelineState;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use graph_flow::{Context, GraphError, NextAction, Task, TaskResult};
use std::sync::Arc;
use tracing::{info, instrument};

pub const SYNTHESIS_TASK: &str = "synthesis";

pub struct SynthesisTask {
    writer: Arc<dyn Writer>,
}

impl SynthesisTask {
    pub fn new(writer: Arc<dyn Writer>) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl Task for SynthesisTask {
    fn id(&self) -> &str {
        SYNTHESIS_TASK
    }

    #[instrument(skip(self, context))]
    async fn run(&self, context: Context) -> Result<TaskResult, GraphError> {
        let start_time = std::time::Instant::now();
        info!("Starting synthesis task");

        advance(&context, PipelineState::Synthesizing).await?;
        let query: String = require(&context, keys::QUERY).await?;
        let started_at: DateTime<Utc> = require(&context, keys::STARTED_AT).await?;
        let sections: Vec<AnalysisSection> = require(&context, keys::SECTIONS).await?;
        let sources: Vec<ResearchDatum> = require(&context, keys::RESEARCH).await?;

        let outcome = self
            .writer
            .synthesize(&query, sections, sources, started_at)
            .await;
        record_stage_time(&context, SYNTHESIS_TASK, start_time).await;

        let report = match outcome {
            Ok(report) => report,
            Err(e) => return fail(&context, e).await,
        };

        info!(report_id = %report.id, "Report assembled");
        context.set(keys::REPORT, report).await;
        advance(&context, PipelineState::Done).await?;

        Ok(TaskResult::new(
            Some("Report generated successfully".to_string()),
            NextAction::End,
        ))
    }
}
