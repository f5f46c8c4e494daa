//! Output planning: from resolved URLs to files on disk.
//!
//! [`select_paths`] lists everything the site produces; [`plan`] maps each
//! selection to a file under the output directory and rejects two different
//! contributors landing on the same file.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};

use crate::config::{CharReplacement, RoqConfig};

use super::error::RoqError;
use super::link::with_root;
use super::site::{PageId, Site};

pub const SITEMAP_FILE: &str = "sitemap.xml";
pub const SEARCH_INDEX_FILE: &str = "search-index.json";

// =============================================================================
// Selections
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// Directory index: `<url>/index.html`
    Html,
    /// Literal file at the URL path
    File,
}

/// What produces the bytes of an output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Page(PageId),
    Redirect { target: String },
    Static(PathBuf),
    Sitemap,
    SearchIndex,
}

/// One URL the site will produce.
#[derive(Debug, Clone)]
pub struct SelectedPath {
    pub url: String,
    pub kind: OutputKind,
    /// Source file, for diagnostics
    pub source: Option<PathBuf>,
    /// Identity of the contributor; equal keys are the same output
    pub key: String,
    pub payload: Payload,
}

impl SelectedPath {
    fn origin(&self) -> String {
        match &self.source {
            Some(source) => source.display().to_string(),
            None => self.key.clone(),
        }
    }
}

/// Every output of `site`: routable pages, alias redirects, passthrough files,
/// then generated files.
pub fn select_paths(site: &Site, config: &RoqConfig) -> Vec<SelectedPath> {
    let mut selections = Vec::new();

    for page in site.pages().iter().filter(|p| p.routable && p.has_url()) {
        let url = page.url().to_string();
        let kind = if page.info.renders_html() && !has_extension(&url) {
            OutputKind::Html
        } else {
            OutputKind::File
        };
        selections.push(SelectedPath {
            url,
            kind,
            source: Some(page.info.absolute_path.clone()),
            key: format!("page:{}", page.raw_id),
            payload: Payload::Page(page.id),
        });
    }

    for (alias, entry) in site.aliases() {
        selections.push(SelectedPath {
            url: alias.clone(),
            kind: if has_extension(alias) {
                OutputKind::File
            } else {
                OutputKind::Html
            },
            source: Some(site.page(entry.page).info.absolute_path.clone()),
            key: format!("page:{}", site.page(entry.page).raw_id),
            payload: Payload::Redirect {
                target: entry.target.clone(),
            },
        });
    }

    for file in site.static_files() {
        selections.push(SelectedPath {
            url: file.output_path.clone(),
            kind: OutputKind::File,
            source: Some(file.source_path.clone()),
            key: format!("static:{}", file.source_path.display()),
            payload: Payload::Static(file.source_path.clone()),
        });
    }

    if config.output.sitemap {
        selections.push(generated(site, SITEMAP_FILE, Payload::Sitemap));
    }
    if config.output.search_index {
        selections.push(generated(site, SEARCH_INDEX_FILE, Payload::SearchIndex));
    }

    selections
}

fn generated(site: &Site, file: &str, payload: Payload) -> SelectedPath {
    SelectedPath {
        url: with_root(&site.root_path, file),
        kind: OutputKind::File,
        source: None,
        key: format!("generated:{file}"),
        payload,
    }
}

fn has_extension(url: &str) -> bool {
    url.rsplit('/').next().is_some_and(|segment| segment.contains('.'))
}

// =============================================================================
// Sanitizing
// =============================================================================

/// Replaces characters that are unsafe in file names.
#[derive(Debug, Clone, Default)]
pub struct Sanitizer {
    replacements: HashMap<char, String>,
}

impl Sanitizer {
    pub fn new(replacements: &[CharReplacement]) -> Self {
        Self {
            replacements: replacements
                .iter()
                .map(|r| (r.from, r.to.clone()))
                .collect(),
        }
    }

    pub fn sanitize(&self, segment: &str) -> String {
        let mut out = String::with_capacity(segment.len());
        for c in segment.chars() {
            match self.replacements.get(&c) {
                Some(replacement) => out.push_str(replacement),
                None => out.push(c),
            }
        }
        out
    }
}

/// Map a URL to its file below `output_dir`.
///
/// The root path prefix is stripped; `.` and `..` segments are dropped so the
/// result never leaves `output_dir`.
pub fn url_to_output_path(
    url: &str,
    kind: OutputKind,
    root_path: &str,
    output_dir: &Path,
    sanitizer: &Sanitizer,
) -> PathBuf {
    let relative = strip_root(url, root_path);

    let mut path = output_dir.to_path_buf();
    for segment in relative.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            continue;
        }
        path.push(sanitizer.sanitize(segment));
    }

    if kind == OutputKind::Html || path == output_dir {
        path.push("index.html");
    }
    path
}

fn strip_root<'u>(url: &'u str, root_path: &str) -> &'u str {
    let root = root_path.trim_matches('/');
    if root.is_empty() {
        return url;
    }

    let url = url.trim_start_matches('/');
    match url.strip_prefix(root) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => url,
    }
}

// =============================================================================
// Planning
// =============================================================================

/// A selection bound to its target file.
#[derive(Debug, Clone)]
pub struct PlannedWrite {
    pub target: PathBuf,
    pub url: String,
    pub kind: OutputKind,
    /// Contributor, for diagnostics
    pub origin: String,
    pub payload: Payload,
}

#[derive(Debug, Clone, Default)]
pub struct WritePlan {
    pub output_dir: PathBuf,
    pub entries: Vec<PlannedWrite>,
}

impl WritePlan {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlannedWrite> {
        self.entries.iter()
    }
}

/// Bind every selection to a file. Duplicate keys collapse into the first
/// selection; distinct keys on one file are a [`RoqError::PathConflict`].
pub fn plan(
    selections: Vec<SelectedPath>,
    output_dir: &Path,
    root_path: &str,
    sanitizer: &Sanitizer,
) -> Result<WritePlan, RoqError> {
    let mut claimed: HashMap<PathBuf, (String, String)> = HashMap::new();
    let mut entries = Vec::with_capacity(selections.len());

    for selection in selections {
        let target = url_to_output_path(
            &selection.url,
            selection.kind,
            root_path,
            output_dir,
            sanitizer,
        );

        match claimed.entry(target.clone()) {
            Entry::Occupied(existing) => {
                let (key, origin) = existing.get();
                if *key == selection.key {
                    tracing::debug!("{} selected twice, keeping the first", selection.url);
                    continue;
                }
                return Err(RoqError::PathConflict {
                    path: target,
                    first: origin.clone(),
                    second: selection.origin(),
                });
            }
            Entry::Vacant(slot) => {
                slot.insert((selection.key.clone(), selection.origin()));
            }
        }

        entries.push(PlannedWrite {
            origin: selection.origin(),
            target,
            url: selection.url,
            kind: selection.kind,
            payload: selection.payload,
        });
    }

    Ok(WritePlan {
        output_dir: output_dir.to_path_buf(),
        entries,
    })
}
