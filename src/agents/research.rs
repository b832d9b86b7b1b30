use super::Researcher;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{RawSearchResult, ResearchDatum};
use crate::tools::{LanguageModel, SearchProvider};
use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

pub const MAX_RESEARCH_RESULTS: usize = 15;
const MAX_RELEVANCE: f64 = 10.0;
const UNKNOWN_SOURCE: &str = "Unknown";

/// Average case-insensitive occurrences of each query term in `content`, capped at 10.
///
/// Terms are matched as plain substrings, so "car" counts inside "scary".
/// Repeated query terms are counted once per repetition.
pub fn score_relevance(content: &str, query: &str) -> f64 {
    let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
    if terms.is_empty() {
        return 0.0;
    }

    let content = content.to_lowercase();
    let occurrences: usize = terms
        .iter()
        .map(|term| content.matches(term.as_str()).count())
        .sum();

    (occurrences as f64 / terms.len() as f64).min(MAX_RELEVANCE)
}

/// Drops every entry whose `url` was already seen; the first occurrence wins.
///
/// The empty url is an identity like any other, so url-less hits collapse
/// into one.
pub fn deduplicate(results: Vec<ResearchDatum>) -> Vec<ResearchDatum> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .filter(|datum| seen.insert(datum.url.clone()))
        .collect()
}

/// Deduplicates, sorts by relevance (stable, descending) and keeps the top entries.
pub(crate) fn rank(results: Vec<ResearchDatum>) -> Vec<ResearchDatum> {
    let mut unique = deduplicate(results);
    unique.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
    unique.truncate(MAX_RESEARCH_RESULTS);
    unique
}

fn source_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        .unwrap_or_else(|| UNKNOWN_SOURCE.to_string())
}

fn to_datum(raw: RawSearchResult, query: &str) -> ResearchDatum {
    let url = raw.url.unwrap_or_default();
    let snippet = raw.content.unwrap_or_default();
    ResearchDatum {
        source: if url.is_empty() {
            UNKNOWN_SOURCE.to_string()
        } else {
            source_of(&url)
        },
        relevance: score_relevance(&snippet, query),
        url,
        snippet,
    }
}

/// Fans a query out into several English web searches and ranks the hits.
pub struct ResearchAgent {
    llm: Arc<dyn LanguageModel>,
    search: Arc<dyn SearchProvider>,
}

impl ResearchAgent {
    pub fn new(llm: Arc<dyn LanguageModel>, search: Arc<dyn SearchProvider>) -> Self {
        Self { llm, search }
    }

    async fn generate_queries(&self, query: &str) -> anyhow::Result<Vec<String>> {
        let prompt = format!(
            r#"You are a research assistant. Given the search topic: "{}"

Generate 3-5 specific web search queries to gather comprehensive information about this topic.
Cover different aspects such as:
- Overview and background
- Recent news and developments
- Key facts and statistics
- Industry insights or market position
- Expert opinions or analysis

Requirements:
- Write every query in ENGLISH, whatever the language of the topic, for better search results
- Return ONLY the queries, one per line, no numbering or bullets"#,
            query
        );

        let response = self.llm.complete(&prompt).await?;
        Ok(response
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn search_one(&self, search_query: &str) -> Vec<RawSearchResult> {
        match self.search.search(search_query).await {
            Ok(results) => results,
            Err(e) => {
                warn!(search_query, error = %e, "Failed to search");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl Researcher for ResearchAgent {
    #[instrument(skip(self))]
    async fn research(&self, query: &str) -> PipelineResult<Vec<ResearchDatum>> {
        info!("Searching for: {}", query);

        let search_queries = self.generate_queries(query).await.map_err(|e| {
            error!(error = %e, "Research failed");
            PipelineError::Research
        })?;
        info!("Generated {} search queries", search_queries.len());

        // Batches come back in query order, so first-occurrence dedup matches
        // a sequential loop.
        let batches = join_all(search_queries.iter().map(|q| self.search_one(q))).await;

        let all_results: Vec<ResearchDatum> = batches
            .into_iter()
            .flatten()
            .map(|raw| to_datum(raw, query))
            .collect();

        let ranked = rank(all_results);
        info!("Found {} unique sources", ranked.len());
        Ok(ranked)
    }
}
