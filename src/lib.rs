//! Turns a free-text query into a multi-section research report.
//!
//! A graph-flow workflow runs three model-backed stages in order: research
//! fans the query out to web search and ranks the hits, analysis outlines
//! them into sections, and synthesis writes the title and executive summary.

pub mod agents;
pub mod config;
pub mod error;
pub mod models;
pub mod parsing;
pub mod pdf;
pub mod pipeline;
pub mod server;
pub mod tasks;
pub mod tools;

pub use error::{PipelineError, PipelineResult};
pub use models::{AnalysisSection, Report, ResearchDatum};
pub use pipeline::ReportPipeline;
