//! Content rendering stage.
//!
//! Renders page bodies to HTML using the appropriate format from the format
//! registry (Markdown, HTML, ...).

use std::sync::Arc;

use crate::build::format::{FormatContext, FormatOutput};
use crate::build::pipeline::{PipelineContext, PipelineError, ProcessingPage, Stage};
use crate::build::render::RenderError;

/// Stage that renders content to HTML using the format registry.
///
/// Bodies with no registered format (e.g. `feed.xml`) pass through. Results
/// are memoized in the render cache, keyed by page.
///
/// After this stage, `page.content` contains HTML and `page.toc` contains
/// the extracted headings.
pub struct ContentStage;

impl Stage for ContentStage {
    fn name(&self) -> &'static str {
        "content"
    }

    fn process(
        &self,
        page: &mut ProcessingPage,
        ctx: &PipelineContext,
    ) -> Result<(), PipelineError> {
        let extension = &ctx.site().page(page.id).info.extension;
        let Some(format) = ctx.format_registry.for_extension(extension) else {
            return Ok(());
        };

        let format_ctx = FormatContext {
            markdown_config: ctx.markdown_config,
        };
        let body = std::mem::take(&mut page.content);
        let output: Arc<FormatOutput> = ctx.cache.get_or_compute(page.id, || {
            format
                .render(&body, &format_ctx)
                .map(Arc::new)
                .map_err(RenderError::from)
        })?;

        page.content = output.html.clone();
        page.toc = output.toc.clone();
        page.invalidate_context();
        Ok(())
    }
}
