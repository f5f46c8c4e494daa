//! Page state carried through the pipeline.

use tera::Context;

use crate::build::markdown::TocEntry;
use crate::build::site::{Page, PageId};

use super::{PipelineContext, PipelineError};

/// A page being processed through the pipeline.
///
/// 1. Initially: `content` = raw body, `toc` = empty
/// 2. After tera: `content` = body with template syntax expanded
/// 3. After content: `content` = HTML fragment, `toc` = populated
/// 4. After layout: `output` = the final file contents
#[derive(Debug)]
pub struct ProcessingPage {
    pub id: PageId,
    pub content: String,
    pub toc: Vec<TocEntry>,
    pub output: Option<String>,
    context: Option<Context>,
}

impl ProcessingPage {
    pub fn new(page: &Page) -> Self {
        Self {
            id: page.id,
            content: page.body.to_string(),
            toc: Vec::new(),
            output: None,
            context: None,
        }
    }

    /// The template context, built on first use and rebuilt after `toc` changes.
    pub fn context(&mut self, ctx: &PipelineContext) -> Result<&Context, PipelineError> {
        let context = match self.context.take() {
            Some(context) => context,
            None => {
                let page = ctx.site().page(self.id);
                ctx.contexts.page_context(page, &self.toc)?
            }
        };
        Ok(&*self.context.insert(context))
    }

    /// Drop the cached context so the next stage sees updated page state.
    pub fn invalidate_context(&mut self) {
        self.context = None;
    }
}
