use super::Writer;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{AnalysisSection, Report, ReportMetadata, ResearchDatum};
use crate::parsing::parse_bracketed;
use crate::tools::LanguageModel;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

const SECTION_PREVIEW_CHARS: usize = 200;

/// Writes the title and executive summary and assembles the final report.
pub struct WriterAgent {
    llm: Arc<dyn LanguageModel>,
    language: String,
}

impl WriterAgent {
    pub fn new(llm: Arc<dyn LanguageModel>, language: impl Into<String>) -> Self {
        Self {
            llm,
            language: language.into(),
        }
    }

    fn build_prompt(&self, query: &str, sections: &[AnalysisSection]) -> String {
        let outline = sections
            .iter()
            .map(|s| format!("- {}: {}...", s.title, preview(&s.content, SECTION_PREVIEW_CHARS)))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"IMPORTANT: write ALL content in {language}.

You are a professional report writer. Based on the following analysis sections about "{query}", create:

1. A professional, engaging report title (12 words at most)
2. An executive summary (2-3 paragraphs) capturing the main insights

Analysis Sections:
{outline}

Return ONLY a JSON object with this structure:
{{
  "title": "Report title here",
  "summary": "Executive summary here..."
}}

REMEMBER: the title and the summary must be in {language}."#,
            language = self.language,
            query = query,
            outline = outline,
        )
    }

    async fn request_metadata(&self, prompt: &str) -> anyhow::Result<ReportMetadata> {
        let response = self.llm.complete(prompt).await?;
        parse_bracketed(&response, '{', '}')
    }
}

/// First `max_chars` characters of `text`, never splitting a code point.
pub(crate) fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[async_trait]
impl Writer for WriterAgent {
    #[instrument(skip(self, sections, sources))]
    async fn synthesize(
        &self,
        query: &str,
        sections: Vec<AnalysisSection>,
        sources: Vec<ResearchDatum>,
        started_at: DateTime<Utc>,
    ) -> PipelineResult<Report> {
        info!("Synthesizing final report");

        let prompt = self.build_prompt(query, &sections);
        let metadata = self.request_metadata(&prompt).await.map_err(|e| {
            error!(error = %e, "Synthesis failed");
            PipelineError::Synthesis
        })?;

        let now = Utc::now();
        let report = Report {
            id: Uuid::new_v4().to_string(),
            query: query.to_string(),
            title: metadata.title,
            summary: metadata.summary,
            sections,
            sources,
            generated_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            processing_time: (now - started_at).num_milliseconds().max(0) as u64,
        };

        info!("Report synthesized in {}ms", report.processing_time);
        Ok(report)
    }
}
