//! Pipeline context for sharing state across stages.

use crate::build::cache::RenderCache;
use crate::build::format::FormatRegistry;
use crate::build::layout::LayoutRenderer;
use crate::build::render::ContextBuilder;
use crate::build::site::Site;
use crate::config::MarkdownConfig;

/// Shared, read-only resources for pipeline stages.
///
/// Stages run on many pages at once, so everything here is `Sync`.
pub struct PipelineContext<'a> {
    /// Markdown processing configuration
    pub markdown_config: &'a MarkdownConfig,

    /// Template contexts over the frozen site
    pub contexts: &'a ContextBuilder<'a>,

    /// Layout chains and body templates
    pub layouts: &'a LayoutRenderer,

    /// Content format registry for rendering different file types
    pub format_registry: &'a FormatRegistry,

    /// Rendered bodies, shared with the search index
    pub cache: &'a RenderCache,
}

impl<'a> PipelineContext<'a> {
    pub fn site(&self) -> &'a Site {
        self.contexts.site()
    }
}
