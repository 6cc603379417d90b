//! Document export to plain text and Markdown.
//!
//! Markdown goes through an embedded minijinja template so the layout
//! (summary, topic list, chapters) stays in one place.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use minijinja::{context, Environment};

use crate::config::ExportFormat;
use crate::domain::Document;

use super::Exporter;

const MARKDOWN_TEMPLATE: &str = r#"# {{ title }}

{% if author %}_by {{ author }}_

{% endif %}{% if summary %}## Summary

{{ summary }}

{% endif %}{% if chapters | length > 1 %}## Topics

{% for chapter in chapters %}- {{ chapter.title }}
{% endfor %}
{% endif %}{% for chapter in chapters %}## {{ chapter.title }}

{{ chapter.text }}

{% endfor %}"#;

/// Built-in exporter for text-based formats.
pub struct DocumentExporter;

impl DocumentExporter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DocumentExporter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Exporter for DocumentExporter {
    async fn export(&self, document: &Document, format: ExportFormat, path: &Path) -> Result<()> {
        let content = match format {
            ExportFormat::Txt => render_text(document),
            ExportFormat::Md => render_markdown(document)?,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
        }

        tokio::fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write document: {}", path.display()))?;

        Ok(())
    }
}

fn render_text(document: &Document) -> String {
    let mut out = String::new();
    out.push_str(&document.title);
    out.push_str("\n\n");

    if let Some(summary) = &document.summary {
        out.push_str("Summary\n\n");
        out.push_str(summary);
        out.push_str("\n\n");
    }

    for chapter in &document.chapters {
        out.push_str(&format!("== {} ==\n\n{}\n\n", chapter.title, chapter.text));
    }

    out.trim_end().to_string() + "\n"
}

fn render_markdown(document: &Document) -> Result<String> {
    let mut env = Environment::new();
    env.add_template("document", MARKDOWN_TEMPLATE)
        .context("Invalid markdown template")?;

    let template = env.get_template("document").context("Missing markdown template")?;
    let rendered = template
        .render(context! {
            title => document.title,
            author => document.author,
            summary => document.summary,
            chapters => document.chapters,
        })
        .context("Failed to render markdown")?;

    Ok(rendered.trim_end().to_string() + "\n")
}
