//! Renders a finished [`Report`] as an A4 PDF.

use crate::agents::preview;
use crate::config::PdfConfig;
use crate::models::{Report, ResearchDatum};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use genpdf::elements::{Break, PageBreak, Paragraph};
use genpdf::style::{Color, Style, StyledString};
use genpdf::{Alignment, Document, SimplePageDecorator};
use tracing::{debug, instrument};

const MAX_EXPORTED_SOURCES: usize = 20;
const SNIPPET_PREVIEW_CHARS: usize = 200;

pub struct PdfExporter {
    config: PdfConfig,
}

impl PdfExporter {
    pub fn new(config: PdfConfig) -> Self {
        Self { config }
    }

    #[instrument(skip(self, report), fields(report_id = %report.id))]
    pub fn render(&self, report: &Report) -> Result<Vec<u8>> {
        let font_family =
            genpdf::fonts::from_files(&self.config.font_dir, &self.config.font_family, None)
                .map_err(|e| {
                    anyhow!(
                        "Failed to load font family '{}' from {}: {}",
                        self.config.font_family,
                        self.config.font_dir.display(),
                        e
                    )
                })?;

        let mut doc = Document::new(font_family);
        doc.set_title(report.title.clone());

        let mut decorator = SimplePageDecorator::new();
        decorator.set_margins(20);
        doc.set_page_decorator(decorator);

        doc.push(centered(&report.title, Style::new().bold().with_font_size(24)));
        doc.push(Break::new(1));
        doc.push(centered(&format!("Generated on: {}", generated_on(report)), muted()));
        doc.push(centered(&format!("Query: {}", report.query), muted()));
        doc.push(Break::new(2));

        doc.push(heading("Executive Summary", 16));
        doc.push(Break::new(0.5));
        push_text(&mut doc, &report.summary);
        doc.push(Break::new(2));

        for section in &report.sections {
            doc.push(heading(&section.title, 14));
            doc.push(Break::new(0.5));
            push_text(&mut doc, &section.content);

            if let Some(subsections) = section.subsections.as_deref().filter(|s| !s.is_empty()) {
                doc.push(Break::new(1));
                for subsection in subsections {
                    doc.push(heading(&subsection.title, 12));
                    doc.push(Break::new(0.3));
                    push_text(&mut doc, &subsection.content);
                    doc.push(Break::new(0.8));
                }
            }
            doc.push(Break::new(1.5));
        }

        doc.push(PageBreak::new());
        doc.push(heading("Sources", 16));
        doc.push(Break::new(1));

        for (index, source) in exported_sources(&report.sources).iter().enumerate() {
            doc.push(Paragraph::new(StyledString::new(
                format!("{}. {}", index + 1, source.source),
                Style::new().bold().with_font_size(10),
            )));
            doc.push(Paragraph::new(StyledString::new(
                source.url.clone(),
                Style::new().with_font_size(9).with_color(Color::Rgb(0, 102, 204)),
            )));
            doc.push(Paragraph::new(StyledString::new(
                snippet_preview(&source.snippet),
                Style::new().with_font_size(9),
            )));
            doc.push(Break::new(0.8));
        }

        let mut buffer = Vec::new();
        doc.render(&mut buffer)
            .map_err(|e| anyhow!("Failed to render PDF: {}", e))?;
        debug!(bytes = buffer.len(), "PDF rendered");
        Ok(buffer)
    }
}

/// `Content-Disposition` file name for a report.
pub fn file_name(report: &Report) -> String {
    format!("report-{}.pdf", report.id)
}

fn exported_sources(sources: &[ResearchDatum]) -> &[ResearchDatum] {
    &sources[..sources.len().min(MAX_EXPORTED_SOURCES)]
}

fn snippet_preview(snippet: &str) -> String {
    format!("{}...", preview(snippet, SNIPPET_PREVIEW_CHARS))
}

fn generated_on(report: &Report) -> String {
    DateTime::parse_from_rfc3339(&report.generated_at)
        .map(|ts| ts.with_timezone(&Utc).format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|_| report.generated_at.clone())
}

fn muted() -> Style {
    Style::new()
        .with_font_size(10)
        .with_color(Color::Rgb(102, 102, 102))
}

fn centered(text: &str, style: Style) -> Paragraph {
    Paragraph::new(StyledString::new(text.to_string(), style)).aligned(Alignment::Center)
}

fn heading(text: &str, size: u8) -> Paragraph {
    Paragraph::new(StyledString::new(
        text.to_string(),
        Style::new().bold().with_font_size(size),
    ))
}

fn push_text(doc: &mut Document, text: &str) {
    for paragraph in text.split("\n\n") {
        let trimmed = paragraph.trim();
        if !trimmed.is_empty() {
            doc.push(Paragraph::new(StyledString::new(
                trimmed.to_string(),
                Style::new().with_font_size(11),
            )));
        }
    }
}
