use serde::{Deserialize, Serialize};

/// `query` stays untyped so a non-string value can be answered with the
/// regular validation error instead of an extractor rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateReportRequest {
    #[serde(default)]
    pub query: Option<serde_json::Value>,
}

impl GenerateReportRequest {
    /// The trimmed query, if it is a non-blank string.
    pub fn query(&self) -> Option<&str> {
        self.query
            .as_ref()
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|query| !query.is_empty())
    }
}

/// One ranked search hit, kept as a report source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchDatum {
    /// Hostname of `url`, or `"Unknown"`.
    pub source: String,
    pub url: String,
    pub snippet: String,
    /// Always within `0.0..=10.0`.
    pub relevance: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subsection {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSection {
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsections: Option<Vec<Subsection>>,
}

/// Title and executive summary produced by the synthesis stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub title: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub query: String,
    pub title: String,
    pub summary: String,
    pub sections: Vec<AnalysisSection>,
    pub sources: Vec<ResearchDatum>,
    /// RFC 3339 / ISO-8601 timestamp, UTC.
    pub generated_at: String,
    /// Milliseconds since the pipeline entered the research stage.
    pub processing_time: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Completed,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportGenerationStatus {
    pub status: GenerationStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<Report>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReportGenerationStatus {
    pub fn completed(report: Report) -> Self {
        Self {
            status: GenerationStatus::Completed,
            message: "Report generated successfully".to_string(),
            report: Some(report),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>, error: Option<String>) -> Self {
        Self {
            status: GenerationStatus::Error,
            message: message.into(),
            report: None,
            error,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TavilySearchRequest {
    pub query: String,
    pub max_results: u32,
    pub search_depth: String,
    pub include_raw_content: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TavilySearchResponse {
    #[serde(default)]
    pub results: Vec<RawSearchResult>,
}

/// A search hit as the provider returns it; both fields may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSearchResult {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl RawSearchResult {
    pub fn new(url: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            content: Some(content.into()),
        }
    }
}
