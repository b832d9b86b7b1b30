use crate::models::{RawSearchResult, TavilySearchRequest, TavilySearchResponse};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tracing::debug;

const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";

/// One query in, an ordered list of hits out. May fail per call.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<RawSearchResult>>;
}

#[derive(Debug, Clone)]
pub struct TavilySearch {
    client: reqwest::Client,
    api_key: String,
    max_results: u32,
}

impl TavilySearch {
    pub fn new(api_key: impl Into<String>, max_results: u32) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            max_results,
        }
    }
}

#[async_trait]
impl SearchProvider for TavilySearch {
    async fn search(&self, query: &str) -> Result<Vec<RawSearchResult>> {
        let request = TavilySearchRequest {
            query: query.to_string(),
            max_results: self.max_results,
            search_depth: "advanced".to_string(),
            include_raw_content: false,
        };

        let response = self
            .client
            .post(TAVILY_SEARCH_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| anyhow!("Tavily request failed: {}", e))?
            .error_for_status()
            .map_err(|e| anyhow!("Tavily returned an error status: {}", e))?;

        let search_response: TavilySearchResponse = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse Tavily response: {}", e))?;

        debug!(query, results = search_response.results.len(), "Tavily search finished");
        Ok(search_response.results)
    }
}
