//! Template contexts: what layouts and templated bodies can see.
//!
//! | Variable | Contents |
//! |----------|----------|
//! | `site` | title, url, root_path, data, collections, series |
//! | `page` | title, url, date, collection, description, data, toc |
//! | `paginator` | index, total, url, prev_url, next_url, items |
//! | `series` | title, documents (when the page belongs to one) |
//! | `content` | the rendered body, inside layouts |

use std::collections::BTreeMap;

use serde::Serialize;
use tera::Context;

use super::derive::series_label;
use super::document::FrontMatter;
use super::format::FormatError;
use super::layout::tera_message;
use super::markdown::TocEntry;
use super::paginate::PageGroup;
use super::site::{Page, PageKind, Site};

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("template error: {}", tera_message(.0))]
    Template(#[from] tera::Error),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("failed to build template context: {0}")]
    Context(#[from] serde_json::Error),
}

/// A page as seen from templates.
#[derive(Debug, Serialize)]
pub struct PageSummary<'a> {
    pub title: String,
    pub url: &'a str,
    pub raw_id: &'a str,
    /// RFC 3339
    pub date: Option<String>,
    pub collection: Option<&'a str>,
    pub description: Option<&'a str>,
    pub data: &'a FrontMatter,
}

impl<'a> PageSummary<'a> {
    pub fn new(page: &'a Page) -> Self {
        let collection = match &page.kind {
            PageKind::Normal => None,
            PageKind::Document { collection } | PageKind::Derived { collection, .. } => {
                Some(collection.as_str())
            }
        };

        Self {
            title: page.title(),
            url: page.url(),
            raw_id: &page.raw_id,
            date: page.info.date.map(|d| d.to_rfc3339()),
            collection,
            description: page.description(),
            data: &page.data,
        }
    }
}

#[derive(Debug, Serialize)]
struct SiteContext<'a> {
    title: Option<&'a str>,
    url: Option<&'a str>,
    root_path: &'a str,
    data: &'a FrontMatter,
    collections: BTreeMap<&'a str, Vec<PageSummary<'a>>>,
    series: BTreeMap<&'a str, Vec<PageSummary<'a>>>,
}

#[derive(Debug, Serialize)]
struct PageContext<'a> {
    #[serde(flatten)]
    summary: PageSummary<'a>,
    toc: &'a [TocEntry],
}

#[derive(Debug, Serialize)]
struct SeriesContext<'a> {
    title: &'a str,
    documents: Vec<PageSummary<'a>>,
}

/// Builds per-page tera contexts over one site.
///
/// The `site` variable is serialized once and shared by every page.
pub struct ContextBuilder<'a> {
    site: &'a Site,
    site_value: serde_json::Value,
}

impl<'a> ContextBuilder<'a> {
    pub fn new(site: &'a Site) -> Result<Self, RenderError> {
        let summaries = |ids: &[super::site::PageId]| -> Vec<PageSummary<'a>> {
            ids.iter().map(|id| PageSummary::new(site.page(*id))).collect()
        };

        let context = SiteContext {
            title: site.title.as_deref(),
            url: site.url.as_deref(),
            root_path: &site.root_path,
            data: &site.data,
            collections: site
                .collections()
                .map(|c| (c.id.as_str(), summaries(&c.pages)))
                .collect(),
            series: site
                .series()
                .iter()
                .map(|(label, entry)| (label.as_str(), summaries(entry.ids(site))))
                .collect(),
        };

        Ok(Self {
            site,
            site_value: serde_json::to_value(&context)?,
        })
    }

    pub fn site(&self) -> &'a Site {
        self.site
    }

    /// The context for rendering `page`.
    pub fn page_context(&self, page: &Page, toc: &[TocEntry]) -> Result<Context, RenderError> {
        let mut context = Context::new();
        context.insert("site", &self.site_value);
        context.insert(
            "page",
            &PageContext {
                summary: PageSummary::new(page),
                toc,
            },
        );

        if let Some(group) = &page.paginator {
            context.insert("paginator", &self.paginator(group));
        }

        if let Some(label) = series_label(&page.data)
            && let Some(entry) = self.site.series().get(&label)
        {
            context.insert(
                "series",
                &SeriesContext {
                    title: &entry.title,
                    documents: entry
                        .documents(self.site)
                        .into_iter()
                        .map(PageSummary::new)
                        .collect(),
                },
            );
        }

        Ok(context)
    }

    fn paginator(&self, group: &PageGroup) -> PageGroup<PageSummary<'a>> {
        PageGroup {
            index: group.index,
            total: group.total,
            items: group
                .items
                .iter()
                .map(|id| PageSummary::new(self.site.page(*id)))
                .collect(),
            url: group.url.clone(),
            prev_url: group.prev_url.clone(),
            next_url: group.next_url.clone(),
        }
    }
}
