//! Search index generation.
//!
//! Produces `search-index.json`: one entry per planned HTML page with its
//! title, URL and the plain text of its rendered body. Code blocks are left
//! out of the indexed text.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::output::{OutputKind, Payload, WritePlan};
use super::site::{PageId, Site};

#[derive(thiserror::Error, Debug)]
pub enum SearchError {
    #[error("failed to serialize search index: {0}")]
    Serialize(#[from] serde_json::Error),
}

static CODE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<pre[\s>].*?</pre>").expect("valid regex"));
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

#[derive(Debug, Serialize)]
pub struct SearchEntry<'a> {
    pub title: String,
    pub url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub content: String,
}

/// Collect entries for every planned HTML page.
///
/// `body` yields the rendered (pre-layout) HTML of a page; pages it has no
/// body for are indexed by title only.
pub fn search_entries<'s>(
    site: &'s Site,
    plan: &WritePlan,
    body: impl Fn(PageId) -> Option<String>,
) -> Vec<SearchEntry<'s>> {
    plan.iter()
        .filter(|entry| entry.kind == OutputKind::Html)
        .filter_map(|entry| match entry.payload {
            Payload::Page(id) => Some(site.page(id)),
            _ => None,
        })
        .map(|page| SearchEntry {
            title: page.title(),
            url: page.url(),
            collection: page.collection(),
            date: page.info.date.map(|d| d.format("%Y-%m-%d").to_string()),
            content: body(page.id).map(|html| plain_text(&html)).unwrap_or_default(),
        })
        .collect()
}

/// Serialize the index as pretty JSON.
pub fn search_index_json(entries: &[SearchEntry<'_>]) -> Result<String, SearchError> {
    let mut json = serde_json::to_string_pretty(entries)?;
    json.push('\n');
    Ok(json)
}

/// Strip markup, decode the common entities and collapse whitespace.
pub fn plain_text(html: &str) -> String {
    let without_code = CODE_BLOCK.replace_all(html, " ");
    let text = TAG.replace_all(&without_code, " ");
    let decoded = text
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}
