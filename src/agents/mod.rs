//! The three pipeline stages and their model-backed implementations.

mod analyst;
mod research;
mod writer;

pub use analyst::AnalystAgent;
pub use research::{deduplicate, score_relevance, ResearchAgent, MAX_RESEARCH_RESULTS};
pub use writer::WriterAgent;
pub(crate) use writer::preview;

use crate::error::PipelineResult;
use crate::models::{AnalysisSection, Report, ResearchDatum};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait Researcher: Send + Sync {
    /// Ranked, deduplicated sources for `query`. An empty list is a valid result.
    async fn research(&self, query: &str) -> PipelineResult<Vec<ResearchDatum>>;
}

#[async_trait]
pub trait Analyst: Send + Sync {
    async fn analyze(
        &self,
        query: &str,
        research: &[ResearchDatum],
    ) -> PipelineResult<Vec<AnalysisSection>>;
}

#[async_trait]
pub trait Writer: Send + Sync {
    async fn synthesize(
        &self,
        query: &str,
        sections: Vec<AnalysisSection>,
        sources: Vec<ResearchDatum>,
        started_at: DateTime<Utc>,
    ) -> PipelineResult<Report>;
}
