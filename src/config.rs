use anyhow::{anyhow, Result};
use std::env;
use std::path::PathBuf;

const DEFAULT_REPORT_LANGUAGE: &str = "Brazilian Portuguese (pt-BR)";
const DEFAULT_TAVILY_MAX_RESULTS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Groq,
    OpenAi,
}

impl LlmProvider {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "groq" => Ok(Self::Groq),
            "openai" => Ok(Self::OpenAi),
            other => Err(anyhow!("Unsupported LLM_PROVIDER '{}'", other)),
        }
    }
}

/// The three model roles of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    Research,
    Analysis,
    Synthesis,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub model: String,
    pub temperature: f64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub provider: LlmProvider,
    pub llm_api_key: String,
    pub tavily_api_key: String,
    pub tavily_max_results: u32,
    pub report_language: String,
    pub pdf: PdfConfig,
}

#[derive(Debug, Clone)]
pub struct PdfConfig {
    pub font_dir: PathBuf,
    pub font_family: String,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            font_dir: PathBuf::from("./fonts"),
            font_family: "LiberationSans".to_string(),
        }
    }
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let provider = match lookup("LLM_PROVIDER") {
            Some(value) => LlmProvider::parse(&value)?,
            None => LlmProvider::Groq,
        };

        let key_var = match provider {
            LlmProvider::Groq => "GROQ_API_KEY",
            LlmProvider::OpenAi => "OPENAI_API_KEY",
        };
        let llm_api_key = non_empty(lookup(key_var))
            .ok_or_else(|| anyhow!("{} not configured", key_var))?;
        let tavily_api_key = non_empty(lookup("TAVILY_API_KEY"))
            .ok_or_else(|| anyhow!("TAVILY_API_KEY not configured"))?;

        let tavily_max_results = match non_empty(lookup("TAVILY_MAX_RESULTS")) {
            Some(value) => value
                .parse()
                .map_err(|_| anyhow!("TAVILY_MAX_RESULTS must be a positive integer"))?,
            None => DEFAULT_TAVILY_MAX_RESULTS,
        };

        let defaults = PdfConfig::default();
        let pdf = PdfConfig {
            font_dir: non_empty(lookup("PDF_FONT_DIR"))
                .map(PathBuf::from)
                .unwrap_or(defaults.font_dir),
            font_family: non_empty(lookup("PDF_FONT_FAMILY")).unwrap_or(defaults.font_family),
        };

        Ok(Self {
            provider,
            llm_api_key,
            tavily_api_key,
            tavily_max_results,
            report_language: non_empty(lookup("REPORT_LANGUAGE"))
                .unwrap_or_else(|| DEFAULT_REPORT_LANGUAGE.to_string()),
            pdf,
        })
    }

    pub fn model_settings(&self, role: ModelRole) -> ModelSettings {
        let model = match (self.provider, role) {
            (LlmProvider::Groq, _) => "llama-3.3-70b-versatile",
            (LlmProvider::OpenAi, ModelRole::Research) => "gpt-4o-mini",
            (LlmProvider::OpenAi, _) => "gpt-4o",
        };
        let temperature = match role {
            ModelRole::Research => 0.3,
            ModelRole::Analysis => 0.4,
            ModelRole::Synthesis => 0.5,
        };
        ModelSettings {
            model: model.to_string(),
            temperature,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
