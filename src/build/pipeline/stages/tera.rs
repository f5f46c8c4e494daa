//! Tera template processing stage.
//!
//! Expands template syntax in page bodies before format rendering, so an
//! HTML or XML page can loop over `site.collections` or use `paginator`.

use crate::build::pipeline::{PipelineContext, PipelineError, ProcessingPage, Stage};

/// Stage that runs page bodies through tera.
///
/// Formats that opt out (Markdown) keep their body verbatim.
pub struct TeraStage;

impl Stage for TeraStage {
    fn name(&self) -> &'static str {
        "tera"
    }

    fn process(
        &self,
        page: &mut ProcessingPage,
        ctx: &PipelineContext,
    ) -> Result<(), PipelineError> {
        let info = &ctx.site().page(page.id).info;
        let templated = ctx
            .format_registry
            .for_extension(&info.extension)
            .is_none_or(|format| format.templated());
        if !templated || !page.content.contains('{') {
            return Ok(());
        }

        let body = std::mem::take(&mut page.content);
        let context = page.context(ctx)?;
        let rendered = ctx.layouts.render_str(&body, context)?;
        page.content = rendered;
        Ok(())
    }
}
