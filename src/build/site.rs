//! The in-memory content model: Site → Collections → Pages.
//!
//! The [`Site`] owns every page in an arena indexed by [`PageId`]; collections,
//! aliases, series and paginators refer to pages by id only. The site is
//! assembled by [`SiteBuilder`], extended by the derivation steps, and then
//! frozen behind an `Arc` for planning and rendering.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock};

use serde_json::Value;

use crate::config::RoqConfig;

use super::derive::SeriesEntry;
use super::document::{FrontMatter, PageInfo, ParsedPage, StaticFile};
use super::error::{Diagnostics, RoqError};
use super::layout::{Layouts, merge_data};
use super::paginate::PageGroup;

// =============================================================================
// Pages
// =============================================================================

/// Index of a page in the site arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageKind {
    /// A standalone page (e.g. `about.md`, `index.html`)
    Normal,
    /// A member of a configured collection
    Document { collection: String },
    /// Synthesized from another page: tag pages, pagination pages
    Derived { origin: PageId, collection: String },
}

#[derive(Debug)]
pub struct Page {
    pub id: PageId,
    /// Stable key; derived pages append a `#suffix` to their origin's key
    pub raw_id: String,
    pub kind: PageKind,
    pub info: Arc<PageInfo>,
    /// Own front matter merged over the layout chain
    pub data: Arc<FrontMatter>,
    /// Raw body, before any rendering
    pub body: Arc<str>,
    /// Layout chain, innermost first
    pub layouts: Vec<String>,
    pub paginator: Option<PageGroup>,
    /// Whether the page produces an output file of its own
    pub routable: bool,
    url: OnceLock<String>,
}

impl Page {
    pub fn new(
        raw_id: impl Into<String>,
        kind: PageKind,
        info: Arc<PageInfo>,
        data: Arc<FrontMatter>,
        body: Arc<str>,
        layouts: Vec<String>,
    ) -> Self {
        Self {
            id: PageId(0),
            raw_id: raw_id.into(),
            kind,
            info,
            data,
            body,
            layouts,
            paginator: None,
            routable: true,
            url: OnceLock::new(),
        }
    }

    /// Front matter `title`, falling back to the file name.
    pub fn title(&self) -> String {
        match self.data.get("title") {
            Some(Value::String(title)) if !title.trim().is_empty() => title.clone(),
            _ => self.info.fallback_title(),
        }
    }

    pub fn description(&self) -> Option<&str> {
        self.data.get("description").and_then(Value::as_str)
    }

    /// The resolved URL, or an empty string before resolution.
    pub fn url(&self) -> &str {
        self.url.get().map(String::as_str).unwrap_or("")
    }

    pub fn has_url(&self) -> bool {
        self.url.get().is_some()
    }

    /// Assign the URL. Only the first assignment takes effect.
    pub fn set_url(&self, url: String) {
        if let Err(rejected) = self.url.set(url)
            && rejected != self.url()
        {
            tracing::debug!(
                "{} already resolved to {}, ignoring {rejected}",
                self.raw_id,
                self.url()
            );
        }
    }

    pub fn collection(&self) -> Option<&str> {
        match &self.kind {
            PageKind::Document { collection } => Some(collection),
            _ => None,
        }
    }

    pub fn is_document(&self) -> bool {
        matches!(self.kind, PageKind::Document { .. })
    }

    /// A derived copy of this page (shares info and body).
    pub fn derive(
        &self,
        suffix: &str,
        collection: impl Into<String>,
        data: Arc<FrontMatter>,
    ) -> Page {
        Page::new(
            format!("{}#{suffix}", self.raw_id),
            PageKind::Derived {
                origin: self.id,
                collection: collection.into(),
            },
            self.info.clone(),
            data,
            self.body.clone(),
            self.layouts.clone(),
        )
    }
}

/// Collection ordering: newest first, undated last, ties by raw id.
pub fn compare_documents(a: &Page, b: &Page) -> Ordering {
    match (&a.info.date, &b.info.date) {
        (Some(da), Some(db)) => db.cmp(da).then_with(|| a.raw_id.cmp(&b.raw_id)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.raw_id.cmp(&b.raw_id),
    }
}

// =============================================================================
// Collections and aliases
// =============================================================================

#[derive(Debug, Clone)]
pub struct RoqCollection {
    pub id: String,
    /// Member pages in collection order
    pub pages: Vec<PageId>,
    /// Data-only: members are loaded but not routed
    pub hidden: bool,
    /// Synthesized (e.g. `posts/tag/java`) rather than read from disk
    pub derived: bool,
}

impl RoqCollection {
    pub fn new(id: impl Into<String>, pages: Vec<PageId>) -> Self {
        Self {
            id: id.into(),
            pages,
            hidden: false,
            derived: false,
        }
    }
}

/// A redirect from an alias URL to a page's canonical URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEntry {
    pub target: String,
    pub page: PageId,
}

// =============================================================================
// Site
// =============================================================================

#[derive(Debug, Default)]
pub struct Site {
    pub root_path: String,
    pub title: Option<String>,
    pub url: Option<String>,
    /// Typed data loaded from the data directory, by file stem
    pub data: FrontMatter,
    pages: Vec<Page>,
    by_raw_id: HashMap<String, PageId>,
    by_url: HashMap<String, PageId>,
    collections: BTreeMap<String, RoqCollection>,
    aliases: BTreeMap<String, AliasEntry>,
    series: BTreeMap<String, SeriesEntry>,
    static_files: Vec<StaticFile>,
}

impl Site {
    pub fn new(config: &RoqConfig) -> Self {
        Self {
            root_path: config.site.root_path.clone(),
            title: config.site.title.clone(),
            url: config.site.url.clone(),
            ..Self::default()
        }
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page(&self, id: PageId) -> &Page {
        &self.pages[id.0]
    }

    pub fn page_mut(&mut self, id: PageId) -> &mut Page {
        &mut self.pages[id.0]
    }

    pub fn page_by_raw_id(&self, raw_id: &str) -> Option<&Page> {
        self.by_raw_id.get(raw_id).map(|id| self.page(*id))
    }

    pub fn page_by_url(&self, url: &str) -> Option<&Page> {
        self.by_url.get(url).map(|id| self.page(*id))
    }

    /// Add a page to the arena, assigning its id.
    pub fn add_page(&mut self, mut page: Page) -> PageId {
        let id = PageId(self.pages.len());
        page.id = id;
        self.by_raw_id.insert(page.raw_id.clone(), id);
        self.pages.push(page);
        id
    }

    pub fn collections(&self) -> impl Iterator<Item = &RoqCollection> {
        self.collections.values()
    }

    pub fn collection(&self, id: &str) -> Option<&RoqCollection> {
        self.collections.get(id)
    }

    /// Register a collection. Ids are unique; a second registration is rejected.
    pub fn add_collection(&mut self, collection: RoqCollection) -> Result<(), RoqError> {
        if self.collections.contains_key(&collection.id) {
            return Err(RoqError::plugin(
                "collections",
                format!("collection '{}' is defined twice", collection.id),
            ));
        }
        self.collections.insert(collection.id.clone(), collection);
        Ok(())
    }

    pub fn aliases(&self) -> &BTreeMap<String, AliasEntry> {
        &self.aliases
    }

    /// Register an alias. Returns the existing entry if the alias is taken.
    pub fn insert_alias(&mut self, alias: String, entry: AliasEntry) -> Option<&AliasEntry> {
        use std::collections::btree_map::Entry;
        match self.aliases.entry(alias) {
            Entry::Occupied(existing) => Some(existing.into_mut()),
            Entry::Vacant(slot) => {
                slot.insert(entry);
                None
            }
        }
    }

    pub fn series(&self) -> &BTreeMap<String, SeriesEntry> {
        &self.series
    }

    pub fn set_series(&mut self, series: BTreeMap<String, SeriesEntry>) {
        self.series = series;
    }

    pub fn static_files(&self) -> &[StaticFile] {
        &self.static_files
    }

    /// Members of a collection, in order.
    pub fn documents(&self, collection: &str) -> Vec<&Page> {
        self.collection(collection)
            .map(|c| c.pages.iter().map(|id| self.page(*id)).collect())
            .unwrap_or_default()
    }

    /// Rebuild the URL index after resolution.
    pub fn index_urls(&mut self) {
        self.by_url = self
            .pages
            .iter()
            .filter(|p| p.routable && p.has_url())
            .map(|p| (p.url().to_string(), p.id))
            .collect();
    }
}

// =============================================================================
// Assembly
// =============================================================================

/// Assembles a [`Site`] from parsed pages.
pub struct SiteBuilder<'a> {
    config: &'a RoqConfig,
    layouts: &'a Layouts,
    diagnostics: &'a Diagnostics,
}

impl<'a> SiteBuilder<'a> {
    pub fn new(config: &'a RoqConfig, layouts: &'a Layouts, diagnostics: &'a Diagnostics) -> Self {
        Self {
            config,
            layouts,
            diagnostics,
        }
    }

    pub fn build(
        &self,
        parsed: Vec<ParsedPage>,
        data: FrontMatter,
        static_files: Vec<StaticFile>,
    ) -> Result<Site, RoqError> {
        let mut site = Site::new(self.config);
        site.data = data;
        site.static_files = static_files;

        let mut members: BTreeMap<String, Vec<PageId>> = self
            .config
            .collections
            .iter()
            .map(|c| (c.id.clone(), Vec::new()))
            .collect();

        for page in parsed {
            let Some(page) = self.assemble(page)? else {
                continue;
            };
            let collection = page.collection().map(str::to_string);
            let id = site.add_page(page);
            if let Some(collection) = collection {
                members.entry(collection).or_default().push(id);
            }
        }

        for config in &self.config.collections {
            let mut pages = members.remove(&config.id).unwrap_or_default();
            pages.sort_by(|a, b| compare_documents(site.page(*a), site.page(*b)));

            if config.hidden {
                for id in &pages {
                    site.page_mut(*id).routable = false;
                }
            }

            let mut collection = RoqCollection::new(&config.id, pages);
            collection.hidden = config.hidden;
            site.add_collection(collection)?;
        }

        tracing::debug!(
            "assembled {} page(s) in {} collection(s)",
            site.pages().len(),
            self.config.collections.len()
        );
        Ok(site)
    }

    /// Resolve the layout chain and merged data of one page.
    fn assemble(&self, parsed: ParsedPage) -> Result<Option<Page>, RoqError> {
        let ParsedPage {
            info,
            front_matter,
            body,
        } = parsed;

        let kind = match &info.collection {
            Some(collection) => PageKind::Document {
                collection: collection.clone(),
            },
            None => PageKind::Normal,
        };

        let layouts = match self.layout_name(&info, &front_matter) {
            Some(name) => match self.layouts.chain(&name, &info.raw_id) {
                Ok(chain) => chain,
                Err(err) => {
                    if is_required(&front_matter) {
                        self.diagnostics.report(err)?;
                    } else {
                        self.diagnostics.skip(err);
                    }
                    return Ok(None);
                }
            },
            None => Vec::new(),
        };

        // Outermost layout first, so inner layouts and the page override it.
        let mut data = FrontMatter::new();
        for id in layouts.iter().rev() {
            if let Some(layout) = self.layouts.get(id) {
                merge_data(&mut data, &layout.data);
            }
        }
        merge_data(&mut data, &front_matter);

        Ok(Some(Page::new(
            info.raw_id.clone(),
            kind,
            Arc::new(info),
            Arc::new(data),
            Arc::from(body),
            layouts,
        )))
    }

    fn layout_name(&self, info: &PageInfo, front_matter: &FrontMatter) -> Option<String> {
        match front_matter.get("layout") {
            Some(Value::String(name)) if !name.trim().is_empty() => {
                return Some(name.trim().to_string());
            }
            Some(Value::Bool(false)) | Some(Value::Null) => return None,
            _ => {}
        }

        let collection_layout = info
            .collection
            .as_deref()
            .and_then(|c| self.config.collection(c))
            .and_then(|c| c.layout.clone());
        if collection_layout.is_some() {
            return collection_layout;
        }

        (info.renders_html() && self.layouts.contains("default")).then(|| "default".to_string())
    }
}

/// Pages that others depend on: tagging templates and paginated listings.
fn is_required(front_matter: &FrontMatter) -> bool {
    front_matter.contains_key("tagging") || front_matter.contains_key("paginate")
}
