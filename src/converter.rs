//! Conversion engines and the unified document model.
//!
//! Engine internals are opaque to the rest of the pipeline: an engine takes
//! a local file and returns a [`DocumentModel`], and everything downstream
//! (export, metadata) works off that model. Engines are registered by
//! identifier in an [`EngineRegistry`]; unknown identifiers resolve to the
//! default engine, so a job naming an engine the worker does not know still
//! converts with the default configuration.

use crate::error::ConversionError;
use crate::job::DEFAULT_ENGINE;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Unified in-memory document produced by a conversion engine.
///
/// Read-only from the exporter's perspective and never persisted; it lives
/// only for the duration of one job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentModel {
    /// Name of the source document, taken from the input file.
    pub name: String,
    pub pages: Vec<Page>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph { text: String },
}

impl DocumentModel {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Renders the document as Markdown.
    pub fn to_markdown(&self) -> String {
        let mut parts = Vec::new();
        for page in &self.pages {
            for block in &page.blocks {
                match block {
                    Block::Heading { level, text } => {
                        parts.push(format!("{} {}", "#".repeat(*level as usize), text));
                    }
                    Block::Paragraph { text } => parts.push(text.clone()),
                }
            }
        }
        parts.join("\n\n")
    }

    /// Renders the document as a structured JSON value.
    pub fn to_structured(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Renders the document as a tagged markup dump, one element per line,
    /// pages wrapped in `<page_N>` markers.
    pub fn to_tagged(&self) -> String {
        let mut lines = vec!["<doc>".to_string()];
        for (index, page) in self.pages.iter().enumerate() {
            lines.push(format!("<page_{}>", index + 1));
            for block in &page.blocks {
                match block {
                    Block::Heading { level, text } => lines.push(format!(
                        "<heading level=\"{}\">{}</heading>",
                        level,
                        escape_markup(text)
                    )),
                    Block::Paragraph { text } => {
                        lines.push(format!("<text>{}</text>", escape_markup(text)))
                    }
                }
            }
            lines.push(format!("</page_{}>", index + 1));
        }
        lines.push("</doc>".to_string());
        lines.join("\n")
    }

    /// Renders the document as an HTML fragment, one `<div class="page">`
    /// per page.
    pub fn to_html(&self) -> String {
        let mut lines = Vec::new();
        for page in &self.pages {
            lines.push("<div class=\"page\">".to_string());
            for block in &page.blocks {
                match block {
                    Block::Heading { level, text } => {
                        let level = (*level).clamp(1, 6);
                        lines.push(format!("<h{}>{}</h{}>", level, escape_markup(text), level));
                    }
                    Block::Paragraph { text } => {
                        lines.push(format!("<p>{}</p>", escape_markup(text)))
                    }
                }
            }
            lines.push("</div>".to_string());
        }
        lines.join("\n")
    }
}

fn escape_markup(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Opaque conversion capability: local file in, document model out.
///
/// Implementations must be safe for concurrent use; one engine instance is
/// shared by all executors.
pub trait ConversionEngine: Send + Sync {
    /// Identifier the engine registers under.
    fn name(&self) -> &str;

    /// Converts the input file into a document model.
    ///
    /// Malformed or empty input surfaces as a [`ConversionError`]; the
    /// engine is never retried.
    fn convert(&self, input: &Path) -> Result<DocumentModel, ConversionError>;
}

/// Capability lookup from engine identifier to conversion strategy.
///
/// New engines are additive: register them by name. Resolution falls back to
/// the default engine for unknown identifiers, which keeps the single
/// default-configuration behavior for callers that request engines this
/// worker has no dedicated implementation for.
pub struct EngineRegistry {
    engines: HashMap<String, Arc<dyn ConversionEngine>>,
    default_engine: Arc<dyn ConversionEngine>,
}

impl EngineRegistry {
    /// Registry with the built-in default engine.
    pub fn with_defaults() -> Self {
        let standard: Arc<dyn ConversionEngine> = Arc::new(PlainTextEngine);
        let mut engines = HashMap::new();
        engines.insert(standard.name().to_string(), standard.clone());
        Self {
            engines,
            default_engine: standard,
        }
    }

    /// Registers an engine under its own name, replacing any previous entry.
    pub fn register(&mut self, engine: Arc<dyn ConversionEngine>) {
        self.engines.insert(engine.name().to_string(), engine);
    }

    /// Resolves an engine identifier, falling back to the default engine.
    pub fn resolve(&self, engine_id: &str) -> Arc<dyn ConversionEngine> {
        match self.engines.get(engine_id) {
            Some(engine) => engine.clone(),
            None => {
                debug!(
                    engine = engine_id,
                    "Unknown conversion engine, using default"
                );
                self.default_engine.clone()
            }
        }
    }
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Default engine: plain-text profile.
///
/// Pages split on form feed, blocks on blank lines, `#`-prefixed lines
/// become headings. Input that decodes to no visible text is a conversion
/// failure (no usable model).
pub struct PlainTextEngine;

impl ConversionEngine for PlainTextEngine {
    fn name(&self) -> &str {
        DEFAULT_ENGINE
    }

    fn convert(&self, input: &Path) -> Result<DocumentModel, ConversionError> {
        let bytes = std::fs::read(input)
            .map_err(|e| ConversionError::new(format!("failed to read input: {e}")))?;
        let text = String::from_utf8_lossy(&bytes);
        if text.trim().is_empty() {
            return Err(ConversionError::new("document produced no content"));
        }

        let pages: Vec<Page> = text
            .split('\u{0C}')
            .map(parse_page)
            .filter(|page| !page.blocks.is_empty())
            .collect();

        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());

        Ok(DocumentModel { name, pages })
    }
}

fn parse_page(text: &str) -> Page {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            flush_block(&mut current, &mut blocks);
        } else {
            current.push(line);
        }
    }
    flush_block(&mut current, &mut blocks);
    Page { blocks }
}

fn flush_block(lines: &mut Vec<&str>, blocks: &mut Vec<Block>) {
    if lines.is_empty() {
        return;
    }
    if lines.len() == 1 && lines[0].starts_with('#') {
        let level = lines[0].chars().take_while(|c| *c == '#').count().min(6);
        let text = lines[0].trim_start_matches('#').trim().to_string();
        blocks.push(Block::Heading {
            level: level as u8,
            text,
        });
    } else {
        blocks.push(Block::Paragraph {
            text: lines.join(" "),
        });
    }
    lines.clear();
}
