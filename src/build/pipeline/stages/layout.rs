//! Layout rendering stage.
//!
//! Wraps rendered content in the page's layout chain, innermost first.

use crate::build::pipeline::{PipelineContext, PipelineError, ProcessingPage, Stage};

/// Stage that applies the layout chain to rendered content.
///
/// Pages without layouts are written as rendered. After this stage,
/// `page.output` holds the final file contents.
pub struct LayoutStage;

impl Stage for LayoutStage {
    fn name(&self) -> &'static str {
        "layout"
    }

    fn process(
        &self,
        page: &mut ProcessingPage,
        ctx: &PipelineContext,
    ) -> Result<(), PipelineError> {
        let chain = &ctx.site().page(page.id).layouts;
        let content = std::mem::take(&mut page.content);

        let output = if chain.is_empty() {
            content
        } else {
            let context = page.context(ctx)?;
            ctx.layouts.render(chain, content, context)?
        };

        page.output = Some(output);
        Ok(())
    }
}
