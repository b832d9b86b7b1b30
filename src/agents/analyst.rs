use super::Analyst;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{AnalysisSection, ResearchDatum};
use crate::parsing::parse_bracketed;
use crate::tools::LanguageModel;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Turns ranked sources into a 4-6 section outline.
pub struct AnalystAgent {
    llm: Arc<dyn LanguageModel>,
    language: String,
}

impl AnalystAgent {
    pub fn new(llm: Arc<dyn LanguageModel>, language: impl Into<String>) -> Self {
        Self {
            llm,
            language: language.into(),
        }
    }

    fn build_prompt(&self, query: &str, research: &[ResearchDatum]) -> String {
        format!(
            r#"IMPORTANT: write ALL content in {language}.

You are a specialist analyst. Analyze the following research data about "{query}" and structure it into comprehensive sections.

Research Data:
{sources}

Create a detailed analysis organized in 4-6 main sections. Each section must:
- Have a clear, descriptive title
- Contain substantive content (at least 2-3 paragraphs)
- Include specific facts, numbers and insights from the research
- Be well organized and informative

Return the analysis as a JSON array with this structure:
[
  {{
    "title": "Section title",
    "content": "Detailed multi-paragraph content...",
    "subsections": [
      {{
        "title": "Subsection title",
        "content": "Subsection content..."
      }}
    ]
  }}
]

Aim for high information density. Be specific and cite important findings.
REMEMBER: every title and every text must be in {language}."#,
            language = self.language,
            query = query,
            sources = format_sources(research),
        )
    }

    async fn request_sections(&self, prompt: &str) -> anyhow::Result<Vec<AnalysisSection>> {
        let response = self.llm.complete(prompt).await?;
        parse_bracketed(&response, '[', ']')
    }
}

fn format_sources(research: &[ResearchDatum]) -> String {
    research
        .iter()
        .enumerate()
        .map(|(idx, datum)| format!("Source {} ({}):\n{}\n---", idx + 1, datum.source, datum.snippet))
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl Analyst for AnalystAgent {
    #[instrument(skip(self, research), fields(sources = research.len()))]
    async fn analyze(
        &self,
        query: &str,
        research: &[ResearchDatum],
    ) -> PipelineResult<Vec<AnalysisSection>> {
        info!("Analyzing {} sources", research.len());

        let prompt = self.build_prompt(query, research);
        let sections = self.request_sections(&prompt).await.map_err(|e| {
            error!(error = %e, "Analysis failed");
            PipelineError::Analysis
        })?;

        info!("Created {} analysis sections", sections.len());
        Ok(sections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::test_support::ScriptedModel;
    use crate::models::Subsection;
    use pretty_assertions::assert_eq;

    fn source(name: &str, snippet: &str) -> ResearchDatum {
        ResearchDatum {
            source: name.to_string(),
            url: format!("https://{}", name),
            snippet: snippet.to_string(),
            relevance: 1.0,
        }
    }

    #[tokio::test]
    async fn parses_array_wrapped_in_prose() {
        let model = Arc::new(ScriptedModel::replying(
            r#"prefix text [ {"title":"A","content":"B","subsections":[]} ] suffix text"#,
        ));
        let agent = AnalystAgent::new(model, "pt-BR");

        let sections = agent.analyze("Tesla", &[source("a.com", "x")]).await.unwrap();
        assert_eq!(
            sections,
            vec![AnalysisSection {
                title: "A".into(),
                content: "B".into(),
                subsections: Some(vec![]),
            }]
        );
    }

    #[tokio::test]
    async fn keeps_one_level_of_subsections() {
        let model = Arc::new(ScriptedModel::replying(
            r#"```json
[
  {"title": "Mercado", "content": "Texto", "subsections": [{"title": "Vendas", "content": "Números"}]},
  {"title": "Futuro", "content": "Mais texto"}
]
```"#,
        ));
        let agent = AnalystAgent::new(model, "pt-BR");

        let sections = agent.analyze("Tesla", &[source("a.com", "x")]).await.unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(
            sections[0].subsections,
            Some(vec![Subsection {
                title: "Vendas".into(),
                content: "Números".into()
            }])
        );
        assert_eq!(sections[1].subsections, None);
    }

    #[tokio::test]
    async fn prompt_embeds_indexed_sources() {
        let model = Arc::new(ScriptedModel::replying("[]"));
        let agent = AnalystAgent::new(model.clone(), "Brazilian Portuguese (pt-BR)");

        let sections = agent
            .analyze(
                "Tesla",
                &[source("a.com", "first snippet"), source("b.com", "second snippet")],
            )
            .await
            .unwrap();
        assert!(sections.is_empty());

        let prompt = model.last_prompt();
        assert!(prompt.contains("\"Tesla\""));
        assert!(prompt.contains("Source 1 (a.com):\nfirst snippet\n---"));
        assert!(prompt.contains("Source 2 (b.com):\nsecond snippet\n---"));
        assert!(prompt.contains("Brazilian Portuguese (pt-BR)"));
    }

    #[tokio::test]
    async fn empty_research_is_accepted() {
        let model = Arc::new(ScriptedModel::replying(r#"[{"title":"A","content":"B"}]"#));
        let agent = AnalystAgent::new(model, "pt-BR");

        assert_eq!(agent.analyze("Tesla", &[]).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failures_collapse_to_analysis_error() {
        let cases = [
            ScriptedModel::failing("timeout"),
            ScriptedModel::replying("I could not produce an outline."),
            ScriptedModel::replying(r#"[{"title": "missing content"}]"#),
        ];

        for model in cases {
            let agent = AnalystAgent::new(Arc::new(model), "pt-BR");
            assert_eq!(
                agent.analyze("Tesla", &[source("a.com", "x")]).await,
                Err(PipelineError::Analysis)
            );
        }
    }
}
