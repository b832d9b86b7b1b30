//! Sequences research, analysis and synthesis into one report.

use crate::agents::{Analyst, AnalystAgent, ResearchAgent, Researcher, Writer, WriterAgent};
use crate::config::{Config, ModelRole};
use crate::error::{PipelineError, PipelineResult};
use crate::models::Report;
use crate::tasks::{
    keys, AnalysisTask, ResearchTask, SynthesisTask, ANALYSIS_TASK, RESEARCH_TASK, SYNTHESIS_TASK,
};
use crate::tools::{build_model, SearchProvider, TavilySearch};
use graph_flow::{
    ExecutionStatus, FlowRunner, Graph, GraphBuilder, GraphError, InMemorySessionStorage, Session,
    SessionStorage,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument};
use uuid::Uuid;

pub const WORKFLOW_NAME: &str = "report_workflow";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    #[default]
    Idle,
    Researching,
    Analyzing,
    Synthesizing,
    Done,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }
}

#[derive(Debug, Error)]
#[error("Invalid pipeline transition from {from:?} to {to:?}")]
pub struct InvalidTransition {
    pub from: PipelineState,
    pub to: PipelineState,
}

pub fn can_transition(from: PipelineState, to: PipelineState) -> bool {
    use PipelineState::*;
    match (from, to) {
        (Idle, Researching) => true,
        (Researching, Analyzing) => true,
        (Analyzing, Synthesizing) => true,
        (Synthesizing, Done) => true,
        (from, Failed) => from != Idle && !from.is_terminal(),
        _ => false,
    }
}

pub fn transition(
    current: PipelineState,
    target: PipelineState,
) -> Result<PipelineState, InvalidTransition> {
    if !can_transition(current, target) {
        return Err(InvalidTransition {
            from: current,
            to: target,
        });
    }
    Ok(target)
}

fn engine_error(e: GraphError) -> PipelineError {
    PipelineError::Engine(e.to_string())
}

/// The research → analysis → synthesis workflow.
///
/// Every call to [`ReportPipeline::generate`] runs in its own session and
/// session store, so concurrent runs share nothing but the immutable graph.
pub struct ReportPipeline {
    graph: Arc<Graph>,
}

impl ReportPipeline {
    pub fn new(
        researcher: Arc<dyn Researcher>,
        analyst: Arc<dyn Analyst>,
        writer: Arc<dyn Writer>,
    ) -> Self {
        let graph = GraphBuilder::new(WORKFLOW_NAME)
            .add_task(Arc::new(ResearchTask::new(researcher)))
            .add_task(Arc::new(AnalysisTask::new(analyst)))
            .add_task(Arc::new(SynthesisTask::new(writer)))
            .add_edge(RESEARCH_TASK, ANALYSIS_TASK)
            .add_edge(ANALYSIS_TASK, SYNTHESIS_TASK)
            .build();

        Self {
            graph: Arc::new(graph),
        }
    }

    /// Wires the rig-backed agents and Tavily search from configuration.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let search: Arc<dyn SearchProvider> = Arc::new(TavilySearch::new(
            config.tavily_api_key.clone(),
            config.tavily_max_results,
        ));

        let researcher = ResearchAgent::new(build_model(config, ModelRole::Research)?, search);
        let analyst = AnalystAgent::new(
            build_model(config, ModelRole::Analysis)?,
            config.report_language.clone(),
        );
        let writer = WriterAgent::new(
            build_model(config, ModelRole::Synthesis)?,
            config.report_language.clone(),
        );

        Ok(Self::new(
            Arc::new(researcher),
            Arc::new(analyst),
            Arc::new(writer),
        ))
    }

    #[instrument(skip(self))]
    pub async fn generate(&self, query: &str) -> PipelineResult<Report> {
        let session = self.run_session(query).await?;

        let stage_times: HashMap<String, u64> = session
            .context
            .get(keys::STAGE_TIMES)
            .await
            .unwrap_or_default();
        debug!(?stage_times, "Stage timings");

        if let Some(failure) = session.context.get::<PipelineError>(keys::FAILURE).await {
            return Err(failure);
        }

        let report: Report = session.context.get(keys::REPORT).await.ok_or_else(|| {
            PipelineError::Engine("workflow completed without a report".to_string())
        })?;

        info!("Report generation complete");
        Ok(report)
    }

    /// Drives one fresh session through the graph and returns it as stored at the end.
    async fn run_session(&self, query: &str) -> PipelineResult<Session> {
        let session_id = Uuid::new_v4().to_string();
        info!("Starting report generation for session {}", session_id);

        let storage: Arc<dyn SessionStorage> = Arc::new(InMemorySessionStorage::new());
        let runner = FlowRunner::new(self.graph.clone(), storage.clone());

        let session = Session::new_from_task(session_id.clone(), RESEARCH_TASK);
        session.context.set(keys::QUERY, query.to_string()).await;
        session.context.set(keys::STATE, PipelineState::Idle).await;
        storage.save(session).await.map_err(engine_error)?;

        loop {
            let result = runner.run(&session_id).await.map_err(engine_error)?;

            match &result.status {
                ExecutionStatus::Completed => break,
                ExecutionStatus::Paused { next_task_id, .. } => {
                    debug!("Workflow paused, next task: {}", next_task_id);
                    continue;
                }
                ExecutionStatus::Error(e) => {
                    return Err(PipelineError::Engine(e.to_string()));
                }
                _ => {
                    return Err(PipelineError::Engine(
                        "workflow stopped waiting for input".to_string(),
                    ));
                }
            }
        }

        storage
            .get(&session_id)
            .await
            .map_err(engine_error)?
            .ok_or_else(|| PipelineError::Engine(format!("session {} not found", session_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::test_support::ScriptedModel;
    use crate::models::{AnalysisSection, ResearchDatum};
    use async_trait::async_trait;
    use chrono::DateTime;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedResearcher {
        result: PipelineResult<Vec<ResearchDatum>>,
        calls: AtomicUsize,
    }

    impl FixedResearcher {
        fn new(result: PipelineResult<Vec<ResearchDatum>>) -> Arc<Self> {
            Arc::new(Self {
                result,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Researcher for FixedResearcher {
        async fn research(&self, _query: &str) -> PipelineResult<Vec<ResearchDatum>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    struct FixedAnalyst {
        result: PipelineResult<Vec<AnalysisSection>>,
        calls: AtomicUsize,
    }

    impl FixedAnalyst {
        fn new(result: PipelineResult<Vec<AnalysisSection>>) -> Arc<Self> {
            Arc::new(Self {
                result,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Analyst for FixedAnalyst {
        async fn analyze(
            &self,
            _query: &str,
            _research: &[ResearchDatum],
        ) -> PipelineResult<Vec<AnalysisSection>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    fn sources(n: usize) -> Vec<ResearchDatum> {
        (0..n)
            .map(|i| ResearchDatum {
                source: format!("site{}.com", i),
                url: format!("https://site{}.com", i),
                snippet: format!("Tesla fact {}", i),
                relevance: 1.0,
            })
            .collect()
    }

    fn sections(n: usize) -> Vec<AnalysisSection> {
        (0..n)
            .map(|i| AnalysisSection {
                title: format!("Section {}", i),
                content: "content".to_string(),
                subsections: None,
            })
            .collect()
    }

    fn metadata_model(runs: usize) -> Arc<ScriptedModel> {
        let model = ScriptedModel::default();
        for _ in 0..runs {
            model.push(Ok(r#"{"title": "T", "summary": "S"}"#.to_string()));
        }
        Arc::new(model)
    }

    #[test]
    fn transitions_follow_the_stage_order() {
        use PipelineState::*;
        assert!(can_transition(Idle, Researching));
        assert!(can_transition(Researching, Analyzing));
        assert!(can_transition(Analyzing, Synthesizing));
        assert!(can_transition(Synthesizing, Done));

        assert!(!can_transition(Idle, Analyzing));
        assert!(!can_transition(Researching, Synthesizing));
        assert!(!can_transition(Done, Researching));
        assert!(transition(Analyzing, Researching).is_err());
    }

    #[test]
    fn failed_is_reachable_from_active_states_only() {
        use PipelineState::*;
        for state in [Researching, Analyzing, Synthesizing] {
            assert!(can_transition(state, Failed));
        }
        assert!(!can_transition(Idle, Failed));
        assert!(!can_transition(Done, Failed));
        assert!(!can_transition(Failed, Failed));
    }

    #[tokio::test]
    async fn produces_report_end_to_end() {
        let researcher = FixedResearcher::new(Ok(sources(3)));
        let analyst = FixedAnalyst::new(Ok(sections(2)));
        let model = metadata_model(1);
        let pipeline = ReportPipeline::new(
            researcher.clone(),
            analyst.clone(),
            Arc::new(WriterAgent::new(model.clone(), "pt-BR")),
        );

        let report = pipeline.generate("Tesla").await.unwrap();

        assert_eq!(report.query, "Tesla");
        assert_eq!(report.title, "T");
        assert_eq!(report.summary, "S");
        assert_eq!(report.sections.len(), 2);
        assert_eq!(report.sources, sources(3));
        assert!(!report.id.is_empty());
        assert!(DateTime::parse_from_rfc3339(&report.generated_at).is_ok());
        assert_eq!(researcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(analyst.calls.load(Ordering::SeqCst), 1);
        assert_eq!(model.prompts.lock().unwrap().len(), 1);
    }

    struct SlowResearcher(std::time::Duration);

    #[async_trait]
    impl Researcher for SlowResearcher {
        async fn research(&self, _query: &str) -> PipelineResult<Vec<ResearchDatum>> {
            tokio::time::sleep(self.0).await;
            Ok(sources(2))
        }
    }

    #[tokio::test]
    async fn processing_time_covers_research() {
        let pipeline = ReportPipeline::new(
            Arc::new(SlowResearcher(std::time::Duration::from_millis(50))),
            FixedAnalyst::new(Ok(sections(1))),
            Arc::new(WriterAgent::new(metadata_model(1), "pt-BR")),
        );

        let report = pipeline.generate("Tesla").await.unwrap();
        assert!(report.processing_time >= 50, "took {}ms", report.processing_time);
    }

    #[tokio::test]
    async fn session_records_every_stage() {
        let pipeline = ReportPipeline::new(
            Arc::new(SlowResearcher(std::time::Duration::from_millis(20))),
            FixedAnalyst::new(Ok(sections(1))),
            Arc::new(WriterAgent::new(metadata_model(1), "pt-BR")),
        );

        let session = pipeline.run_session("Tesla").await.unwrap();

        let state: PipelineState = session.context.get(keys::STATE).await.unwrap();
        assert_eq!(state, PipelineState::Done);

        let stage_times: HashMap<String, u64> =
            session.context.get(keys::STAGE_TIMES).await.unwrap();
        let mut stages: Vec<&str> = stage_times.keys().map(String::as_str).collect();
        stages.sort_unstable();
        assert_eq!(stages, vec![ANALYSIS_TASK, RESEARCH_TASK, SYNTHESIS_TASK]);
        assert!(stage_times[RESEARCH_TASK] >= 20);

        let report: Option<Report> = session.context.get(keys::REPORT).await;
        assert!(report.is_some());
    }

    #[tokio::test]
    async fn empty_research_stops_before_analysis() {
        let analyst = FixedAnalyst::new(Ok(sections(2)));
        let model = metadata_model(1);
        let pipeline = ReportPipeline::new(
            FixedResearcher::new(Ok(vec![])),
            analyst.clone(),
            Arc::new(WriterAgent::new(model.clone(), "pt-BR")),
        );

        let err = pipeline.generate("Tesla").await.unwrap_err();

        assert_eq!(err, PipelineError::EmptyResearch);
        assert_eq!(err.to_string(), "No research data found");
        assert_eq!(analyst.calls.load(Ordering::SeqCst), 0);
        assert!(model.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_analysis_stops_before_synthesis() {
        let model = metadata_model(1);
        let pipeline = ReportPipeline::new(
            FixedResearcher::new(Ok(sources(2))),
            FixedAnalyst::new(Ok(vec![])),
            Arc::new(WriterAgent::new(model.clone(), "pt-BR")),
        );

        let err = pipeline.generate("Tesla").await.unwrap_err();

        assert_eq!(err, PipelineError::EmptyAnalysis);
        assert_eq!(err.to_string(), "Analysis failed to generate sections");
        assert!(model.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stage_errors_pass_through_unchanged() {
        let analyst = FixedAnalyst::new(Ok(sections(1)));
        let pipeline = ReportPipeline::new(
            FixedResearcher::new(Err(PipelineError::Research)),
            analyst.clone(),
            Arc::new(WriterAgent::new(metadata_model(1), "pt-BR")),
        );
        assert_eq!(pipeline.generate("q").await, Err(PipelineError::Research));
        assert_eq!(analyst.calls.load(Ordering::SeqCst), 0);

        let pipeline = ReportPipeline::new(
            FixedResearcher::new(Ok(sources(1))),
            FixedAnalyst::new(Err(PipelineError::Analysis)),
            Arc::new(WriterAgent::new(metadata_model(1), "pt-BR")),
        );
        assert_eq!(pipeline.generate("q").await, Err(PipelineError::Analysis));

        let pipeline = ReportPipeline::new(
            FixedResearcher::new(Ok(sources(1))),
            FixedAnalyst::new(Ok(sections(1))),
            Arc::new(WriterAgent::new(Arc::new(ScriptedModel::failing("boom")), "pt-BR")),
        );
        assert_eq!(pipeline.generate("q").await, Err(PipelineError::Synthesis));
    }

    #[tokio::test]
    async fn runs_are_independent() {
        let pipeline = ReportPipeline::new(
            FixedResearcher::new(Ok(sources(3))),
            FixedAnalyst::new(Ok(sections(2))),
            Arc::new(WriterAgent::new(metadata_model(3), "pt-BR")),
        );

        let first = pipeline.generate("Tesla").await.unwrap();
        let (second, third) = tokio::join!(pipeline.generate("Tesla"), pipeline.generate("Tesla"));
        let (second, third) = (second.unwrap(), third.unwrap());

        assert_ne!(first.id, second.id);
        assert_ne!(second.id, third.id);
        assert_ne!(first.id, third.id);
    }
}
