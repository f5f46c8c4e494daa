//! Pluggable content format system.
//!
//! This module provides a registry of content formats that turn a page body
//! into HTML. Markdown and HTML are registered by default; bodies of any other
//! extension pass through unchanged.
//!
//! # Adding a New Format
//!
//! ```ignore
//! struct AsciidocFormat;
//!
//! impl ContentFormat for AsciidocFormat {
//!     fn name(&self) -> &'static str { "asciidoc" }
//!     fn extensions(&self) -> &[&'static str] { &["adoc", "asciidoc"] }
//!     fn render(&self, content: &str, ctx: &FormatContext) -> Result<FormatOutput, FormatError> {
//!         // Convert AsciiDoc to HTML...
//!     }
//! }
//!
//! builder.with_format(AsciidocFormat);
//! ```

use crate::build::markdown::{MarkdownError, TocEntry, render_markdown};
use crate::config::MarkdownConfig;

/// Output from rendering a content format.
#[derive(Debug, Clone, Default)]
pub struct FormatOutput {
    /// The rendered HTML content.
    pub html: String,
    /// Table of contents extracted from headings.
    pub toc: Vec<TocEntry>,
}

/// Context available during format rendering.
pub struct FormatContext<'a> {
    pub markdown_config: &'a MarkdownConfig,
}

#[derive(thiserror::Error, Debug)]
pub enum FormatError {
    /// Generic render error for custom formats.
    #[error("render error: {0}")]
    Render(String),

    #[error("markdown error: {0}")]
    Markdown(#[from] MarkdownError),
}

/// A content format that can render page bodies to HTML.
pub trait ContentFormat: Send + Sync {
    /// The name of this format (e.g., "markdown", "asciidoc").
    fn name(&self) -> &'static str;

    /// File extensions this format handles (lowercase, without dot).
    fn extensions(&self) -> &[&'static str];

    /// Whether the body runs through the template engine before rendering.
    fn templated(&self) -> bool {
        true
    }

    fn render(&self, content: &str, ctx: &FormatContext) -> Result<FormatOutput, FormatError>;
}

/// Markdown format implementation, backed by pulldown-cmark.
pub struct MarkdownFormat;

impl ContentFormat for MarkdownFormat {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn extensions(&self) -> &[&'static str] {
        &["md", "markdown"]
    }

    // Markdown bodies are plain text; `{{` in code samples must survive.
    fn templated(&self) -> bool {
        false
    }

    fn render(&self, content: &str, ctx: &FormatContext) -> Result<FormatOutput, FormatError> {
        let output = render_markdown(content, ctx.markdown_config)?;
        Ok(FormatOutput {
            html: output.html,
            toc: output.toc,
        })
    }
}

/// HTML bodies are already rendered.
pub struct HtmlFormat;

impl ContentFormat for HtmlFormat {
    fn name(&self) -> &'static str {
        "html"
    }

    fn extensions(&self) -> &[&'static str] {
        &["html", "htm"]
    }

    fn render(&self, content: &str, _ctx: &FormatContext) -> Result<FormatOutput, FormatError> {
        Ok(FormatOutput {
            html: content.to_string(),
            toc: Vec::new(),
        })
    }
}

/// Registry of content formats.
pub struct FormatRegistry {
    formats: Vec<Box<dyn ContentFormat>>,
}

impl FormatRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            formats: Vec::new(),
        }
    }

    /// Create a registry with the default formats (Markdown, HTML).
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(MarkdownFormat);
        registry.register(HtmlFormat);
        registry
    }

    /// Register a new format.
    ///
    /// Later registrations take precedence for overlapping extensions.
    pub fn register<F: ContentFormat + 'static>(&mut self, format: F) {
        self.formats.push(Box::new(format));
    }

    /// Find the format for a file extension.
    pub fn for_extension(&self, ext: &str) -> Option<&dyn ContentFormat> {
        let ext_lower = ext.to_lowercase();
        self.formats
            .iter()
            .rev()
            .find(|f| f.extensions().iter().any(|e| *e == ext_lower))
            .map(|f| f.as_ref())
    }

    /// Get all registered extensions.
    pub fn all_extensions(&self) -> Vec<&'static str> {
        self.formats
            .iter()
            .flat_map(|f| f.extensions().iter().copied())
            .collect()
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_default_formats() {
        let registry = FormatRegistry::with_defaults();

        assert!(registry.for_extension("md").is_some());
        assert!(registry.for_extension("markdown").is_some());
        assert!(registry.for_extension("MD").is_some()); // Case insensitive
        assert_eq!(registry.for_extension("html").map(|f| f.name()), Some("html"));
        assert!(registry.for_extension("xml").is_none());
    }

    #[test]
    fn test_registry_all_extensions() {
        let registry = FormatRegistry::with_defaults();
        let exts = registry.all_extensions();

        assert!(exts.contains(&"md"));
        assert!(exts.contains(&"htm"));
    }

    #[test]
    fn test_html_passthrough_and_templating() {
        let config = MarkdownConfig::default();
        let ctx = FormatContext {
            markdown_config: &config,
        };
        let html = HtmlFormat.render("<b>{{ x }}</b>", &ctx).unwrap();
        assert_eq!(html.html, "<b>{{ x }}</b>");
        assert!(HtmlFormat.templated());
        assert!(!MarkdownFormat.templated());
    }

    struct MockFormat;
    impl ContentFormat for MockFormat {
        fn name(&self) -> &'static str {
            "mock"
        }
        fn extensions(&self) -> &[&'static str] {
            &["mock", "md"]
        }
        fn render(
            &self,
            _content: &str,
            _ctx: &FormatContext,
        ) -> Result<FormatOutput, FormatError> {
            Ok(FormatOutput {
                html: "<p>mock</p>".to_string(),
                toc: vec![],
            })
        }
    }

    #[test]
    fn test_registry_custom_format_takes_precedence() {
        let mut registry = FormatRegistry::with_defaults();
        registry.register(MockFormat);

        assert_eq!(registry.for_extension("mock").map(|f| f.name()), Some("mock"));
        assert_eq!(registry.for_extension("md").map(|f| f.name()), Some("mock"));
    }
}
