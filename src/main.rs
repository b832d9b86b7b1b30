use anyhow::Result;
use clap::{Parser, Subcommand};
use research_report::config::Config;
use research_report::pdf::PdfExporter;
use research_report::pipeline::ReportPipeline;
use research_report::server::{self, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "research-report", about = "AI-powered research report generator")]
struct Cli {
    #[arg(long, env = "BIND_ADDRESS", default_value = "0.0.0.0", global = true)]
    bind: String,
    #[arg(long, env = "PORT", default_value_t = 4000, global = true)]
    port: u16,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API and web UI (default)
    Serve,
    /// Generate one report and print it as JSON
    Generate {
        query: String,
        /// Also write the report as a PDF
        #[arg(long)]
        pdf: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Loads `.env` first, so RUST_LOG, BIND_ADDRESS and PORT can come from it.
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("research_report=debug,graph_flow=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let pipeline = Arc::new(ReportPipeline::from_config(&config)?);
    let exporter = Arc::new(PdfExporter::new(config.pdf.clone()));

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => server::serve(AppState { pipeline, exporter }, &cli.bind, cli.port).await,
        Command::Generate { query, pdf } => {
            let report = pipeline.generate(&query).await?;
            info!(
                "Report {} generated in {}ms",
                report.id, report.processing_time
            );

            if let Some(path) = pdf {
                let bytes = exporter.render(&report)?;
                tokio::fs::write(&path, bytes).await?;
                info!("PDF written to {}", path.display());
            }

            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}
