pub mod llm;
pub mod tavily;

pub use llm::{build_model, LanguageModel, RigModel};
pub use tavily::{SearchProvider, TavilySearch};
