use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::RoqConfig;

use super::cache::RenderCache;
use super::data::{DataRegistry, load_data_dir};
use super::date::DateResolver;
use super::derive::{collect_series, derive_tags, register_aliases};
use super::error::{Diagnostics, RoqError};
use super::format::{ContentFormat, FormatContext, FormatRegistry};
use super::generated::{redirect_html, sitemap_xml};
use super::layout::{LayoutRenderer, Layouts};
use super::link::resolve_all;
use super::output::{Payload, Sanitizer, WritePlan, plan, select_paths};
use super::paginate::expand_all;
use super::pipeline::{Pipeline, PipelineContext};
use super::render::ContextBuilder;
use super::search::{search_entries, search_index_json};
use super::site::{PageId, Site, SiteBuilder};
use super::source::ContentScanner;
use super::write::{WriteContents, WriteJob, write_all};

#[derive(Debug)]
pub struct BuildResult {
    pub output_dir: PathBuf,
    /// Pages rendered to their own output file
    pub pages: usize,
    pub redirects: usize,
    pub static_files: usize,
    pub files_written: usize,
    /// Planned files whose bytes were already on disk
    pub unchanged: usize,
}

/// The assembled site and where each of its outputs goes.
pub struct ScannedSite {
    pub site: Arc<Site>,
    pub layouts: Layouts,
    pub plan: WritePlan,
}

pub struct Builder {
    config: RoqConfig,
    /// Base path for resolving relative paths (typically the config file's directory)
    base_path: PathBuf,
    formats: FormatRegistry,
    data: DataRegistry,
    pipeline: Pipeline,
    now: DateTime<Utc>,
}

impl Builder {
    pub fn new(config: RoqConfig, base_path: PathBuf) -> Self {
        Self {
            config,
            base_path,
            formats: FormatRegistry::with_defaults(),
            data: DataRegistry::new(),
            pipeline: Pipeline::default(),
            now: Utc::now(),
        }
    }

    /// Register an additional content format.
    pub fn with_format<F: ContentFormat + 'static>(mut self, format: F) -> Self {
        self.formats.register(format);
        self
    }

    /// Require `site.data.<key>` to decode as `T`.
    pub fn with_data_mapping<T>(mut self, key: impl Into<String>, required: bool) -> Self
    where
        T: DeserializeOwned + Serialize + 'static,
    {
        self.data.register::<T>(key, required);
        self
    }

    /// Replace the render pipeline.
    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Fix the build time used for `future` filtering.
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn config(&self) -> &RoqConfig {
        &self.config
    }

    pub fn output_dir(&self) -> PathBuf {
        self.base_path.join(&self.config.site.output)
    }

    /// Scan, assemble, derive, resolve and plan, then render and write.
    pub async fn build(&self) -> Result<BuildResult, RoqError> {
        let diagnostics = Diagnostics::new(self.config.strictness);
        let result = match self.scan(&diagnostics) {
            Ok(scanned) => self.generate(&scanned, &diagnostics).await,
            Err(err) => Err(err),
        };

        match result {
            Ok(result) => diagnostics.finish().map(|()| result),
            Err(err) => {
                tracing::error!("{err}");
                Err(err)
            }
        }
    }

    // =========================================================================
    // Model
    // =========================================================================

    /// Build the site model and its write plan.
    pub fn scan(&self, diagnostics: &Diagnostics) -> Result<ScannedSite, RoqError> {
        let config = &self.config;
        let site_root = self.base_path.as_path();

        // Step 1: Scan content and passthrough files
        let dates = DateResolver::new(&config.site.date_format, &config.site.timezone, self.now)
            .map_err(|e| RoqError::Config(e.to_string()))?
            .with_visibility(config.site.draft, config.site.future);
        let scanner = ContentScanner::new(config, site_root, dates)?;
        let scanned = scanner.scan(diagnostics)?;

        // Step 2: Layouts
        let layouts = Layouts::load(&site_root.join(&config.site.layouts_dir), diagnostics)?;

        // Step 3: Site data, validated against registered mappings
        let mut data = load_data_dir(&site_root.join(&config.site.data_dir), diagnostics)?;
        self.data.apply(&mut data, diagnostics)?;

        // Step 4: Assemble the model
        let mut site = SiteBuilder::new(config, &layouts, diagnostics).build(
            scanned.pages,
            data,
            scanned.static_files,
        )?;

        // Step 5: Derive tag collections and series, resolve links
        let tags = derive_tags(&mut site, config, diagnostics)?;
        let series = collect_series(&site);
        let series_count = series.len();
        site.set_series(series);
        resolve_all(&site, config);

        // Step 6: Pagination and aliases need resolved URLs
        expand_all(&mut site, config, diagnostics)?;
        resolve_all(&site, config);
        let aliases = register_aliases(&mut site);
        site.index_urls();

        tracing::info!(
            "assembled {} page(s): {} tag collection(s), {} series, {} alias(es)",
            site.pages().len(),
            tags,
            series_count,
            aliases
        );

        // Step 7: Plan outputs
        let sanitizer = Sanitizer::new(&config.output.replacements);
        let plan = plan(
            select_paths(&site, config),
            &self.output_dir(),
            &config.site.root_path,
            &sanitizer,
        )?;

        Ok(ScannedSite {
            site: Arc::new(site),
            layouts,
            plan,
        })
    }

    // =========================================================================
    // Generation
    // =========================================================================

    /// Render every planned output and write the tree.
    pub async fn generate(
        &self,
        scanned: &ScannedSite,
        diagnostics: &Diagnostics,
    ) -> Result<BuildResult, RoqError> {
        let site = scanned.site.as_ref();
        let plan = &scanned.plan;
        let cache = RenderCache::new(self.config.output.cache_capacity);

        let rendered = self.render_pages(scanned, &cache, diagnostics)?;
        let pages = rendered.len();

        let mut jobs = Vec::with_capacity(plan.len());
        let mut redirects = 0;
        let mut static_files = 0;
        for entry in plan.iter() {
            let contents = match &entry.payload {
                Payload::Page(id) => match rendered.get(id) {
                    Some(html) => WriteContents::Bytes(html.clone().into_bytes()),
                    None => continue,
                },
                Payload::Redirect { target } => {
                    redirects += 1;
                    WriteContents::Bytes(redirect_html(target).into_bytes())
                }
                Payload::Static(source) => {
                    static_files += 1;
                    WriteContents::Copy(source.clone())
                }
                Payload::Sitemap => WriteContents::Bytes(sitemap_xml(site, plan).into_bytes()),
                Payload::SearchIndex => {
                    let entries = search_entries(site, plan, |id| self.page_html(site, &cache, id));
                    let json = search_index_json(&entries)
                        .map_err(|e| RoqError::plugin("search-index", e.to_string()))?;
                    WriteContents::Bytes(json.into_bytes())
                }
            };
            jobs.push(WriteJob {
                target: entry.target.clone(),
                origin: entry.origin.clone(),
                contents,
            });
        }

        let outcome = write_all(jobs, self.config.output.io_concurrency).await?;
        tracing::info!(
            "wrote {} file(s) to {} ({} unchanged)",
            outcome.written,
            plan.output_dir.display(),
            outcome.unchanged
        );

        Ok(BuildResult {
            output_dir: plan.output_dir.clone(),
            pages,
            redirects,
            static_files,
            files_written: outcome.written,
            unchanged: outcome.unchanged,
        })
    }

    fn render_pages(
        &self,
        scanned: &ScannedSite,
        cache: &RenderCache,
        diagnostics: &Diagnostics,
    ) -> Result<HashMap<PageId, String>, RoqError> {
        let site = scanned.site.as_ref();
        let ids: Vec<PageId> = scanned
            .plan
            .iter()
            .filter_map(|entry| match entry.payload {
                Payload::Page(id) => Some(id),
                _ => None,
            })
            .collect();

        let contexts = ContextBuilder::new(site).map_err(|e| RoqError::Render {
            page: "site".to_string(),
            message: e.to_string(),
        })?;
        let layouts = LayoutRenderer::new(&scanned.layouts)?;
        let ctx = PipelineContext {
            markdown_config: &self.config.markdown,
            contexts: &contexts,
            layouts: &layouts,
            format_registry: &self.formats,
            cache,
        };

        let mut rendered = HashMap::with_capacity(ids.len());
        for (id, result) in self.pipeline.run(&ids, &ctx) {
            match result {
                Ok(html) => {
                    rendered.insert(id, html);
                }
                Err(err) => diagnostics.report(RoqError::Render {
                    page: site.page(id).info.source_path.display().to_string(),
                    message: err.to_string(),
                })?,
            }
        }

        tracing::info!("rendered {} page(s)", rendered.len());
        Ok(rendered)
    }

    /// Rendered body of a page without layouts, from the cache when possible.
    fn page_html(&self, site: &Site, cache: &RenderCache, id: PageId) -> Option<String> {
        if let Some(output) = cache.get(&id) {
            return Some(output.html.clone());
        }
        let page = site.page(id);
        let format = self.formats.for_extension(&page.info.extension)?;
        let ctx = FormatContext {
            markdown_config: &self.config.markdown,
        };
        cache
            .get_or_compute(id, || format.render(&page.body, &ctx).map(Arc::new))
            .map(|output| output.html.clone())
            .inspect_err(|err| tracing::warn!("{}: {err}", page.raw_id))
            .ok()
    }
}
