use crate::config::{Config, LlmProvider, ModelRole};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rig::completion::Prompt;
use rig::prelude::*;
use rig::providers::{groq, openai};
use std::sync::Arc;

/// Prompt in, text out.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// A rig agent configured for one pipeline role.
pub enum RigModel {
    OpenAi(rig::agent::Agent<openai::CompletionModel>),
    Groq(rig::agent::Agent<groq::CompletionModel>),
}

#[async_trait]
impl LanguageModel for RigModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let response = match self {
            RigModel::OpenAi(agent) => agent.prompt(prompt.to_string()).await,
            RigModel::Groq(agent) => agent.prompt(prompt.to_string()).await,
        };
        response.map_err(|e| anyhow!("Prompt error: {}", e))
    }
}

pub fn build_model(config: &Config, role: ModelRole) -> Result<Arc<dyn LanguageModel>> {
    if config.llm_api_key.is_empty() {
        return Err(anyhow!("LLM API key not configured"));
    }
    let settings = config.model_settings(role);

    let model = match config.provider {
        LlmProvider::OpenAi => {
            let client = openai::Client::new(&config.llm_api_key);
            RigModel::OpenAi(
                client
                    .agent(&settings.model)
                    .temperature(settings.temperature)
                    .build(),
            )
        }
        LlmProvider::Groq => {
            let client = groq::Client::new(&config.llm_api_key);
            RigModel::Groq(
                client
                    .agent(&settings.model)
                    .temperature(settings.temperature)
                    .build(),
            )
        }
    };

    Ok(Arc::new(model))
}
