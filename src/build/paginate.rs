//! Pagination of collection listings.
//!
//! A page with `paginate: posts` (or `paginate: {collection, size, link}`) is
//! expanded into one page per group of documents. Group 1 keeps the page's own
//! URL; group `n` lives at `<base>/page/<n>` unless a link template is given.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::config::RoqConfig;

use super::document::FrontMatter;
use super::error::{Diagnostics, RoqError};
use super::link::{PageLinkData, resolve_link, with_root};
use super::site::{PageId, PageKind, Site};

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum PaginateError {
    #[error("page size must be at least 1")]
    ZeroPageSize,

    #[error("invalid paginate value: {0}")]
    InvalidSpec(String),
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageGroup<T = PageId> {
    /// 1-based position
    pub index: usize,
    pub total: usize,
    pub items: Vec<T>,
    pub url: String,
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
}

impl<T> PageGroup<T> {
    pub fn is_first(&self) -> bool {
        self.index == 1
    }

    pub fn is_last(&self) -> bool {
        self.index == self.total
    }
}

/// URL of group `n` for a listing rooted at `base`.
pub fn page_url(base: &str, n: usize) -> String {
    if n <= 1 {
        base.to_string()
    } else {
        with_root("/", &format!("{base}/page/{n}"))
    }
}

/// Split `items` into groups of `page_size`, linked with prev/next URLs.
pub fn paginate<T: Clone>(
    items: &[T],
    page_size: usize,
    base_url: &str,
) -> Result<Vec<PageGroup<T>>, PaginateError> {
    paginate_with(items, page_size, |n| page_url(base_url, n))
}

/// Like [`paginate`], with a custom URL for each 1-based group index.
pub fn paginate_with<T: Clone>(
    items: &[T],
    page_size: usize,
    mut url_for: impl FnMut(usize) -> String,
) -> Result<Vec<PageGroup<T>>, PaginateError> {
    if page_size == 0 {
        return Err(PaginateError::ZeroPageSize);
    }

    let total = items.len().div_ceil(page_size);
    let urls: Vec<String> = (1..=total).map(&mut url_for).collect();

    let groups = (0..total)
        .map(|i| {
            let start = (i * page_size).min(items.len());
            let end = (start + page_size).min(items.len());
            PageGroup {
                index: i + 1,
                total,
                items: items[start..end].to_vec(),
                url: urls[i].clone(),
                prev_url: i.checked_sub(1).map(|p| urls[p].clone()),
                next_url: urls.get(i + 1).cloned(),
            }
        })
        .collect();

    Ok(groups)
}

// =============================================================================
// Page expansion
// =============================================================================

/// What a page wants paginated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginateSpec {
    /// Collection to list; `None` means the page's own derived collection
    pub collection: Option<String>,
    pub size: Option<usize>,
    /// Link template for groups after the first (may use `:page`)
    pub link: Option<String>,
}

impl PaginateSpec {
    /// Read the `paginate` front matter value, if any.
    pub fn from_data(data: &FrontMatter) -> Result<Option<Self>, PaginateError> {
        let Some(value) = data.get("paginate") else {
            return Ok(None);
        };

        let spec = match value {
            Value::Null | Value::Bool(false) => return Ok(None),
            Value::Bool(true) => Self::for_collection(None),
            Value::String(collection) => {
                Self::for_collection(Some(collection.trim().to_string()))
            }
            Value::Number(n) => Self {
                collection: None,
                size: Some(parse_size(n.as_u64())?),
                link: None,
            },
            Value::Object(map) => Self {
                collection: map
                    .get("collection")
                    .and_then(Value::as_str)
                    .map(|s| s.trim().to_string()),
                size: match map.get("size") {
                    Some(v) => Some(parse_size(v.as_u64())?),
                    None => None,
                },
                link: map.get("link").and_then(Value::as_str).map(str::to_string),
            },
            Value::Array(_) => return Err(PaginateError::InvalidSpec(value.to_string())),
        };

        Ok(Some(spec))
    }

    fn for_collection(collection: Option<String>) -> Self {
        Self {
            collection,
            size: None,
            link: None,
        }
    }
}

fn parse_size(size: Option<u64>) -> Result<usize, PaginateError> {
    match size {
        Some(0) => Err(PaginateError::ZeroPageSize),
        Some(n) => usize::try_from(n).map_err(|_| PaginateError::InvalidSpec(n.to_string())),
        None => Err(PaginateError::InvalidSpec("size must be a positive integer".to_string())),
    }
}

/// Expand every paginating page into one page per group.
///
/// Must run after link resolution: group URLs derive from the page URL.
pub fn expand_all(
    site: &mut Site,
    config: &RoqConfig,
    diagnostics: &Diagnostics,
) -> Result<(), RoqError> {
    let candidates: Vec<PageId> = site
        .pages()
        .iter()
        .filter(|p| p.routable && !matches!(PaginateSpec::from_data(&p.data), Ok(None)))
        .map(|p| p.id)
        .collect();

    let mut expanded = 0;
    for id in candidates {
        match plan_groups(site, id, config) {
            Ok((collection, groups)) => {
                expanded += groups.len();
                add_group_pages(site, id, &collection, groups);
            }
            Err(message) => diagnostics.report(RoqError::plugin(
                "pagination",
                format!("{}: {message}", site.page(id).raw_id),
            ))?,
        }
    }

    if expanded > 0 {
        tracing::debug!("expanded paginated listings into {expanded} page(s)");
    }
    Ok(())
}

fn plan_groups(
    site: &Site,
    id: PageId,
    config: &RoqConfig,
) -> Result<(String, Vec<PageGroup>), String> {
    let page = site.page(id);
    let spec = PaginateSpec::from_data(&page.data)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| "pagination disabled".to_string())?;

    let collection_id = spec
        .collection
        .clone()
        .or_else(|| {
            page.data
                .get("tagCollection")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .ok_or_else(|| "no collection to paginate".to_string())?;
    let collection = site
        .collection(&collection_id)
        .ok_or_else(|| format!("unknown collection '{collection_id}'"))?;

    let size = spec.size.unwrap_or(config.site.page_size);
    let base = page.url().to_string();

    let groups = match &spec.link {
        Some(template) => {
            let mut data = PageLinkData::for_page(page);
            paginate_with(&collection.pages, size, |n| {
                if n == 1 {
                    return base.clone();
                }
                data.page = Some(n);
                resolve_link(&site.root_path, template, &data)
            })
        }
        None => paginate(&collection.pages, size, &base),
    }
    .map_err(|e| e.to_string())?;

    Ok((collection_id, groups))
}

fn add_group_pages(site: &mut Site, id: PageId, paginated: &str, groups: Vec<PageGroup>) {
    let mut groups = groups.into_iter();
    let Some(first) = groups.next() else {
        // An empty collection still renders its listing, with no items.
        let url = site.page(id).url().to_string();
        site.page_mut(id).paginator = Some(PageGroup {
            index: 1,
            total: 1,
            items: Vec::new(),
            url,
            prev_url: None,
            next_url: None,
        });
        return;
    };

    for group in groups {
        let origin = site.page(id);
        // Later groups keep the origin's collection for `:collection` links.
        let collection = match &origin.kind {
            PageKind::Document { collection } | PageKind::Derived { collection, .. } => {
                collection.clone()
            }
            PageKind::Normal => paginated.to_string(),
        };
        let mut page = origin.derive(
            &format!("page-{}", group.index),
            collection,
            Arc::clone(&origin.data),
        );
        page.set_url(group.url.clone());
        page.paginator = Some(group);
        site.add_page(page);
    }

    site.page_mut(id).paginator = Some(first);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::link::resolve_all;
    use crate::build::testing::{parsed, site};
    use crate::config::Strictness;
    use serde_json::json;

    fn data(value: Value) -> FrontMatter {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_groups_cover_items_in_order() {
        let items: Vec<u32> = (1..=23).collect();
        let groups = paginate(&items, 10, "/posts").unwrap();

        assert_eq!(groups.len(), 3);
        assert_eq!(groups.iter().map(|g| g.items.len()).sum::<usize>(), 23);
        let flattened: Vec<u32> = groups.iter().flat_map(|g| g.items.clone()).collect();
        assert_eq!(flattened, items);
        assert!(groups.iter().all(|g| g.total == 3));
        assert_eq!(groups[2].items, vec![21, 22, 23]);
    }

    #[test]
    fn test_group_urls_and_boundaries() {
        let items: Vec<u32> = (1..=5).collect();
        let groups = paginate(&items, 2, "/posts").unwrap();

        assert_eq!(groups[0].url, "/posts");
        assert_eq!(groups[1].url, "/posts/page/2");
        assert_eq!(groups[2].url, "/posts/page/3");

        assert_eq!(groups[0].prev_url, None);
        assert_eq!(groups[0].next_url.as_deref(), Some("/posts/page/2"));
        assert_eq!(groups[1].prev_url.as_deref(), Some("/posts"));
        assert_eq!(groups[2].next_url, None);
        assert!(groups[0].is_first());
        assert!(groups[2].is_last());
    }

    #[test]
    fn test_root_listing_urls() {
        let groups = paginate(&[1, 2, 3], 1, "/").unwrap();
        assert_eq!(groups[0].url, "/");
        assert_eq!(groups[1].url, "/page/2");
    }

    #[test]
    fn test_empty_list_has_no_groups() {
        let groups = paginate::<u32>(&[], 10, "/posts").unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn test_group_count_is_ceiling() {
        for (n, p) in [(0usize, 1usize), (1, 1), (9, 3), (10, 3), (3, 10)] {
            let items: Vec<usize> = (0..n).collect();
            assert_eq!(paginate(&items, p, "/l").unwrap().len(), n.div_ceil(p));
        }
    }

    #[test]
    fn test_empty_collection_listing_still_renders() {
        let config = RoqConfig::default();
        let mut site = site(
            vec![parsed("index.html", None, json!({"paginate": "posts"}))],
            &config,
        );
        resolve_all(&site, &config);
        expand_all(&mut site, &config, &Diagnostics::new(Strictness::FailFast)).unwrap();

        assert_eq!(site.pages().len(), 1);
        let paginator = site.page(PageId(0)).paginator.as_ref().unwrap();
        assert!(paginator.items.is_empty());
        assert_eq!(paginator.url, "/");
        assert_eq!(paginator.next_url, None);
    }

    #[test]
    fn test_zero_page_size_is_error() {
        assert_eq!(
            paginate(&[1, 2], 0, "/posts").unwrap_err(),
            PaginateError::ZeroPageSize
        );
    }

    #[test]
    fn test_custom_urls() {
        let groups = paginate_with(&[1, 2, 3], 2, |n| format!("/archive/{n}")).unwrap();
        assert_eq!(groups[1].url, "/archive/2");
        assert_eq!(groups[1].prev_url.as_deref(), Some("/archive/1"));
    }

    #[test]
    fn test_spec_forms() {
        assert_eq!(
            PaginateSpec::from_data(&data(json!({"paginate": "posts"}))).unwrap(),
            Some(PaginateSpec {
                collection: Some("posts".to_string()),
                size: None,
                link: None
            })
        );
        assert_eq!(
            PaginateSpec::from_data(&data(json!({
                "paginate": {"collection": "news", "size": 5, "link": "/news/:page"}
            })))
            .unwrap(),
            Some(PaginateSpec {
                collection: Some("news".to_string()),
                size: Some(5),
                link: Some("/news/:page".to_string())
            })
        );
        assert_eq!(
            PaginateSpec::from_data(&data(json!({"paginate": true})))
                .unwrap()
                .map(|s| s.collection),
            Some(None)
        );
        assert_eq!(PaginateSpec::from_data(&data(json!({}))).unwrap(), None);
        assert_eq!(
            PaginateSpec::from_data(&data(json!({"paginate": false}))).unwrap(),
            None
        );
        assert_eq!(
            PaginateSpec::from_data(&data(json!({"paginate": {"size": 0}}))).unwrap_err(),
            PaginateError::ZeroPageSize
        );
    }
}
