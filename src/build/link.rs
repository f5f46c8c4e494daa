//! Link templates: turn a page's metadata into its output URL.
//!
//! A template is a path with `:placeholder` segments, e.g. `/:collection/:slug`
//! or `/:year/:month/:title`. Built-in placeholders come from the page
//! identity; any other name is looked up in the page data.

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, FixedOffset};
use rayon::prelude::*;
use regex::{Captures, Regex};
use serde_json::Value;

use crate::config::RoqConfig;
use crate::util::slugify;

use super::document::FrontMatter;
use super::site::{Page, PageKind, Site};

/// Default template for documents of a collection.
pub const DEFAULT_DOCUMENT_LINK: &str = "/:collection/:slug";
/// Default template for standalone pages.
pub const DEFAULT_PAGE_LINK: &str = "/:path";
/// Default template for pages derived from a tagging template.
pub const DEFAULT_TAG_LINK: &str = "/:collection";

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r":([A-Za-z_][A-Za-z0-9_]*)").expect("placeholder pattern is valid")
});

/// Values a link template can reference.
#[derive(Debug, Clone, Default)]
pub struct PageLinkData<'a> {
    pub collection: &'a str,
    pub date: Option<DateTime<FixedOffset>>,
    /// File name without extension and date prefix
    pub base_file_name: &'a str,
    /// Source path without extension, `index` collapsed
    pub path: String,
    pub ext: &'a str,
    /// Pagination index (1-based)
    pub page: Option<usize>,
    pub data: Option<&'a FrontMatter>,
}

impl<'a> PageLinkData<'a> {
    pub fn for_page(page: &'a Page) -> Self {
        let collection = match &page.kind {
            PageKind::Normal => "",
            PageKind::Document { collection } | PageKind::Derived { collection, .. } => {
                collection.as_str()
            }
        };

        Self {
            collection,
            date: page.info.date,
            base_file_name: &page.info.base_file_name,
            path: page.info.link_path(),
            ext: &page.info.extension,
            page: page.paginator.as_ref().map(|g| g.index),
            data: Some(&page.data),
        }
    }

    fn string_field(&self, key: &str) -> Option<&'a str> {
        match self.data?.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim()),
            _ => None,
        }
    }

    fn value(&self, name: &str) -> String {
        match name {
            "collection" => self.collection.to_string(),
            "year" => self.date.map(|d| format!("{:04}", d.year())).unwrap_or_default(),
            "month" => self.date.map(|d| format!("{:02}", d.month())).unwrap_or_default(),
            "day" => self.date.map(|d| format!("{:02}", d.day())).unwrap_or_default(),
            "slug" => self
                .string_field("slug")
                .map(str::to_string)
                .or_else(|| self.string_field("title").map(slugify))
                .unwrap_or_else(|| slugify(self.base_file_name)),
            "title" => self
                .string_field("title")
                .map(slugify)
                .unwrap_or_else(|| slugify(self.base_file_name)),
            "name" => slugify(self.base_file_name),
            "path" => self.path.clone(),
            "ext" => self.ext.to_string(),
            "page" => self.page.map(|p| p.to_string()).unwrap_or_default(),
            other => self
                .data
                .and_then(|data| data.get(other))
                .map(value_to_segment)
                .unwrap_or_default(),
        }
    }
}

fn value_to_segment(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_to_segment)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-"),
        Value::Null | Value::Object(_) => String::new(),
    }
}

/// Render `template` for a page and prefix it with `root_path`.
pub fn resolve_link(root_path: &str, template: &str, data: &PageLinkData) -> String {
    let path = PLACEHOLDER.replace_all(template, |caps: &Captures| data.value(&caps[1]));
    with_root(root_path, &path)
}

/// Prefix `path` with the site root, collapse `//` and drop a trailing slash.
pub fn with_root(root_path: &str, path: &str) -> String {
    let root = root_path.trim_matches('/');
    let joined = if root.is_empty() {
        format!("/{path}")
    } else {
        format!("/{root}/{path}")
    };

    let mut url = String::with_capacity(joined.len());
    for c in joined.chars() {
        if c == '/' && url.ends_with('/') {
            continue;
        }
        url.push(c);
    }

    if url.len() > 1 && url.ends_with('/') {
        url.pop();
    }
    url
}

/// The template a page's URL is rendered from.
pub fn template_for<'a>(page: &'a Page, config: &'a RoqConfig) -> &'a str {
    if let Some(Value::String(link)) = page.data.get("link") {
        return link;
    }

    match &page.kind {
        PageKind::Document { collection } => config
            .collection(collection)
            .and_then(|c| c.link.as_deref())
            .unwrap_or(DEFAULT_DOCUMENT_LINK),
        PageKind::Derived { .. } => DEFAULT_TAG_LINK,
        PageKind::Normal => DEFAULT_PAGE_LINK,
    }
}

/// Assign a URL to every page that does not have one yet.
pub fn resolve_all(site: &Site, config: &RoqConfig) {
    site.pages().par_iter().for_each(|page| {
        if page.has_url() {
            return;
        }
        let template = template_for(page, config);
        let url = resolve_link(&site.root_path, template, &PageLinkData::for_page(page));
        page.set_url(url);
    });
}
