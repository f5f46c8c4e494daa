//! Render pipeline for pages.
//!
//! Every routable page passes through a series of stages:
//! 1. Tera processing (template syntax in non-markdown bodies)
//! 2. Content rendering (body to HTML with TOC)
//! 3. Layout rendering (layout chain wrapper)
//!
//! Custom stages can be inserted before or after any named stage. Pages are
//! independent of each other, so the pipeline runs them in parallel.

mod context;
mod error;
mod page;
mod stages;

pub use context::PipelineContext;
pub use error::PipelineError;
pub use page::ProcessingPage;

use rayon::prelude::*;

use crate::build::site::PageId;

use stages::{ContentStage, LayoutStage, TeraStage};

/// A stage in the page processing pipeline.
///
/// A stage transforms one page at a time and must not depend on other pages'
/// progress: several pages go through the same stage concurrently.
pub trait Stage: Send + Sync {
    /// Unique name for this stage (used for insertion points).
    fn name(&self) -> &'static str;

    /// Process one page. The `ctx` provides the site and shared services.
    fn process(
        &self,
        page: &mut ProcessingPage,
        ctx: &PipelineContext,
    ) -> Result<(), PipelineError>;
}

/// The page processing pipeline.
///
/// The default pipeline is: tera → content → layout.
///
/// # Extension Points
///
/// ```ignore
/// pipeline.insert_after("content", MyCustomStage)?;
/// ```
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    /// Create an empty pipeline with no stages.
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Create the default pipeline with standard stages.
    pub fn default_pipeline() -> Self {
        let mut pipeline = Self::new();
        pipeline.add_stage(TeraStage);
        pipeline.add_stage(ContentStage);
        pipeline.add_stage(LayoutStage);
        pipeline
    }

    /// Add a stage to the end of the pipeline.
    pub fn add_stage<S: Stage + 'static>(&mut self, stage: S) -> &mut Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Insert a stage before the named stage.
    pub fn insert_before<S: Stage + 'static>(
        &mut self,
        name: &str,
        stage: S,
    ) -> Result<&mut Self, PipelineError> {
        let pos = self.position(name)?;
        self.stages.insert(pos, Box::new(stage));
        Ok(self)
    }

    /// Insert a stage after the named stage.
    pub fn insert_after<S: Stage + 'static>(
        &mut self,
        name: &str,
        stage: S,
    ) -> Result<&mut Self, PipelineError> {
        let pos = self.position(name)?;
        self.stages.insert(pos + 1, Box::new(stage));
        Ok(self)
    }

    fn position(&self, name: &str) -> Result<usize, PipelineError> {
        self.stages
            .iter()
            .position(|s| s.name() == name)
            .ok_or_else(|| PipelineError::UnknownStage(name.to_string()))
    }

    /// Get the names of all stages in order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run one page through every stage and return its output.
    pub fn run_page(&self, id: PageId, ctx: &PipelineContext) -> Result<String, PipelineError> {
        let mut page = ProcessingPage::new(ctx.site().page(id));
        for stage in &self.stages {
            stage.process(&mut page, ctx)?;
        }
        Ok(page.output.unwrap_or(page.content))
    }

    /// Run `pages` in parallel. Results keep the input order.
    pub fn run(
        &self,
        pages: &[PageId],
        ctx: &PipelineContext,
    ) -> Vec<(PageId, Result<String, PipelineError>)> {
        pages
            .par_iter()
            .map(|id| (*id, self.run_page(*id, ctx)))
            .collect()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::default_pipeline()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use serde_json::json;

    use super::*;
    use crate::build::cache::RenderCache;
    use crate::build::document::FrontMatter;
    use crate::build::error::Diagnostics;
    use crate::build::format::FormatRegistry;
    use crate::build::layout::{Layout, LayoutRenderer, Layouts};
    use crate::build::link::resolve_all;
    use crate::build::render::ContextBuilder;
    use crate::build::site::{Site, SiteBuilder};
    use crate::build::testing::parsed;
    use crate::config::{RoqConfig, Strictness};

    fn layouts() -> Layouts {
        let mut layouts = Layouts::default();
        layouts.insert(Layout {
            id: "default".to_string(),
            source: PathBuf::from("default.html"),
            data: FrontMatter::new(),
            parent: None,
            body: "<title>{{ page.title }}</title><main>{{ content }}</main>".to_string(),
        });
        layouts
    }

    fn build_site(layouts: &Layouts, config: &RoqConfig) -> Site {
        let diagnostics = Diagnostics::new(Strictness::FailFast);
        let mut about = parsed("about.md", None, json!({"title": "About"}));
        about.body = "# Hi\n\n`{{ literal }}`".to_string();
        let mut list = parsed("list.html", None, json!({"title": "List"}));
        list.body = "{% for p in site.collections.posts %}[{{ p.title }}]{% endfor %}".to_string();
        let mut feed = parsed("feed.xml", None, json!({"layout": false}));
        feed.body = "<feed>{{ site.title }}</feed>".to_string();
        let mut broken = parsed("broken.html", None, json!({}));
        broken.body = "{{ nope.missing }}".to_string();

        let site = SiteBuilder::new(config, layouts, &diagnostics)
            .build(
                vec![
                    about,
                    list,
                    feed,
                    broken,
                    parsed("posts/a.md", Some(2), json!({"title": "A"})),
                ],
                FrontMatter::new(),
                Vec::new(),
            )
            .unwrap();
        resolve_all(&site, config);
        site
    }

    fn render_all(pipeline: &Pipeline) -> Vec<(PageId, Result<String, PipelineError>)> {
        let mut config = RoqConfig::default();
        config.site.title = Some("Roq".to_string());
        let layouts = layouts();
        let site = build_site(&layouts, &config);

        let contexts = ContextBuilder::new(&site).unwrap();
        let renderer = LayoutRenderer::new(&layouts).unwrap();
        let formats = FormatRegistry::with_defaults();
        let cache = RenderCache::new(16);
        let ctx = PipelineContext {
            markdown_config: &config.markdown,
            contexts: &contexts,
            layouts: &renderer,
            format_registry: &formats,
            cache: &cache,
        };

        let ids: Vec<PageId> = site.pages().iter().map(|p| p.id).collect();
        pipeline.run(&ids, &ctx)
    }

    #[test]
    fn test_default_pipeline_renders_pages() {
        let results = render_all(&Pipeline::default());
        let output = |i: usize| results[i].1.as_ref().unwrap().clone();

        let about = output(0);
        assert!(about.starts_with("<title>About</title><main><h1 id=\"hi\">"));
        assert!(about.contains("<code>{{ literal }}</code>"));

        assert_eq!(output(1), "<title>List</title><main>[A]</main>");
        assert_eq!(output(2), "<feed>Roq</feed>");
        assert!(results[3].1.is_err());
    }

    #[test]
    fn test_results_keep_input_order() {
        let results = render_all(&Pipeline::default());
        let ids: Vec<usize> = results.iter().map(|(id, _)| id.0).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    struct ShoutStage;
    impl Stage for ShoutStage {
        fn name(&self) -> &'static str {
            "shout"
        }
        fn process(
            &self,
            page: &mut ProcessingPage,
            _ctx: &PipelineContext,
        ) -> Result<(), PipelineError> {
            page.content = page.content.to_uppercase();
            Ok(())
        }
    }

    #[test]
    fn test_insert_custom_stage() {
        let mut pipeline = Pipeline::default();
        pipeline.insert_after("content", ShoutStage).unwrap();
        assert_eq!(
            pipeline.stage_names(),
            vec!["tera", "content", "shout", "layout"]
        );

        let results = render_all(&pipeline);
        assert_eq!(results[2].1.as_ref().unwrap(), "<FEED>ROQ</FEED>");
    }

    #[test]
    fn test_insert_unknown_stage_is_error() {
        let mut pipeline = Pipeline::default();
        assert!(matches!(
            pipeline.insert_before("minify", ShoutStage),
            Err(PipelineError::UnknownStage(_))
        ));
    }
}
