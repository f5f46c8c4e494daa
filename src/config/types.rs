//! Configuration type definitions.
//!
//! This module contains all the data structures used in roq configuration files.
//! These types are pure data - no I/O or complex logic.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// =============================================================================
// Root config
// =============================================================================

/// Resolved site configuration consumed by the build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoqConfig {
    #[serde(default)]
    pub site: SiteConfig,
    /// Configured document collections (defaults to a single `posts` collection)
    #[serde(default = "default_collections")]
    pub collections: Vec<CollectionConfig>,
    /// Collections whose documents are grouped by their `tags` field
    #[serde(default)]
    pub tagging: Vec<String>,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub markdown: MarkdownConfig,
    /// How per-file errors affect the run
    #[serde(default)]
    pub strictness: Strictness,
}

impl Default for RoqConfig {
    fn default() -> Self {
        Self {
            site: SiteConfig::default(),
            collections: default_collections(),
            tagging: Vec::new(),
            output: OutputConfig::default(),
            markdown: MarkdownConfig::default(),
            strictness: Strictness::default(),
        }
    }
}

impl RoqConfig {
    /// Look up a collection definition by id.
    pub fn collection(&self, id: &str) -> Option<&CollectionConfig> {
        self.collections.iter().find(|c| c.id == id)
    }
}

fn default_collections() -> Vec<CollectionConfig> {
    vec![CollectionConfig::new("posts")]
}

// =============================================================================
// Site configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// URL path the site is served under (e.g. "/" or "/blog/")
    #[serde(default = "default_root_path")]
    pub root_path: String,
    /// Absolute site URL, used for sitemap entries
    pub url: Option<String>,
    pub title: Option<String>,
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default = "default_content_dir")]
    pub content_dir: PathBuf,
    #[serde(default = "default_layouts_dir")]
    pub layouts_dir: PathBuf,
    /// Files copied verbatim to the output root
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// strftime pattern for front matter dates; `[...]` sections are optional
    #[serde(default = "default_date_format")]
    pub date_format: String,
    /// `UTC`, `local`, or a fixed offset such as `+02:00`
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Include pages marked `draft: true`
    #[serde(default)]
    pub draft: bool,
    /// Include pages dated after the build time
    #[serde(default)]
    pub future: bool,
    /// Glob patterns (relative to the site root) of files to skip
    #[serde(default = "default_ignored_files")]
    pub ignored_files: Vec<String>,
    /// Default number of items per paginated listing page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
            url: None,
            title: None,
            output: default_output(),
            content_dir: default_content_dir(),
            layouts_dir: default_layouts_dir(),
            static_dir: default_static_dir(),
            data_dir: default_data_dir(),
            date_format: default_date_format(),
            timezone: default_timezone(),
            draft: false,
            future: false,
            ignored_files: default_ignored_files(),
            page_size: default_page_size(),
        }
    }
}

fn default_root_path() -> String {
    "/".to_string()
}

fn default_output() -> PathBuf {
    PathBuf::from("_site")
}

fn default_content_dir() -> PathBuf {
    PathBuf::from("content")
}

fn default_layouts_dir() -> PathBuf {
    PathBuf::from("templates/layouts")
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("public")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

pub fn default_date_format() -> String {
    "%Y-%m-%d[ %H:%M][:%S][ %z]".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

pub fn default_ignored_files() -> Vec<String> {
    vec![
        "**/.*".to_string(),
        "**/.*/**".to_string(),
        "**.DS_Store".to_string(),
        "**Thumbs.db".to_string(),
        "**node_modules/**".to_string(),
    ]
}

fn default_page_size() -> usize {
    10
}

// =============================================================================
// Collection configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Unique identifier for this collection
    pub id: String,
    /// Directory under the content root (defaults to the id)
    pub dir: Option<String>,
    /// Data-only collection: documents are loaded but not routed
    #[serde(default)]
    pub hidden: bool,
    /// Default layout for documents of this collection
    pub layout: Option<String>,
    /// Link template for documents (defaults to `/:collection/:slug`)
    pub link: Option<String>,
}

impl CollectionConfig {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            dir: None,
            hidden: false,
            layout: None,
            link: None,
        }
    }

    /// The content sub-directory holding this collection's documents.
    pub fn dir(&self) -> &str {
        self.dir.as_deref().unwrap_or(&self.id).trim_matches('/')
    }
}

// =============================================================================
// Output configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Characters replaced in output file names
    #[serde(default = "default_replacements")]
    pub replacements: Vec<CharReplacement>,
    /// Maximum number of files written concurrently
    #[serde(default = "default_io_concurrency")]
    pub io_concurrency: usize,
    /// Write `sitemap.xml`
    #[serde(default = "default_true")]
    pub sitemap: bool,
    /// Write `search-index.json`
    #[serde(default)]
    pub search_index: bool,
    /// Number of rendered page bodies kept in memory
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            replacements: default_replacements(),
            io_concurrency: default_io_concurrency(),
            sitemap: true,
            search_index: false,
            cache_capacity: default_cache_capacity(),
        }
    }
}

/// A single character substitution applied to output file names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharReplacement {
    pub from: char,
    pub to: String,
}

fn default_replacements() -> Vec<CharReplacement> {
    ['?', '#', ':', '*', '"', '<', '>', '|']
        .into_iter()
        .map(|from| CharReplacement {
            from,
            to: "-".to_string(),
        })
        .collect()
}

fn default_io_concurrency() -> usize {
    16
}

fn default_cache_capacity() -> usize {
    512
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Markdown configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkdownConfig {
    /// Extensions to enable for markdown processing
    #[serde(default = "default_markdown_extensions")]
    pub extensions: Vec<String>,
}

fn default_markdown_extensions() -> Vec<String> {
    vec![
        "footnotes".to_string(),
        "heading_attributes".to_string(),
        "strikethrough".to_string(),
        "tables".to_string(),
        "tasklists".to_string(),
    ]
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            extensions: default_markdown_extensions(),
        }
    }
}

// =============================================================================
// Error tolerance
// =============================================================================

/// How recoverable per-file errors are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strictness {
    /// Abort on the first error.
    FailFast,
    /// Keep going, then fail with every collected error.
    #[default]
    Collect,
    /// Log tolerable errors as warnings and skip the offending file.
    Lenient,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_yaml() {
        let config: RoqConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.site.root_path, "/");
        assert_eq!(config.site.output, PathBuf::from("_site"));
        assert_eq!(config.collections.len(), 1);
        assert_eq!(config.collections[0].id, "posts");
        assert_eq!(config.strictness, Strictness::Collect);
        assert_eq!(config.output.io_concurrency, 16);
        assert!(config.output.sitemap);
    }

    #[test]
    fn test_collection_dir_defaults_to_id() {
        let mut collection = CollectionConfig::new("posts");
        assert_eq!(collection.dir(), "posts");
        collection.dir = Some("/blog/".to_string());
        assert_eq!(collection.dir(), "blog");
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
site:
  root_path: /blog/
  url: https://example.com
  timezone: "+02:00"
  future: true
collections:
  - id: posts
    layout: post
  - id: authors
    hidden: true
tagging: [posts]
output:
  replacements:
    - from: "?"
      to: "_"
strictness: lenient
"#;
        let config: RoqConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.site.root_path, "/blog/");
        assert!(config.site.future);
        assert_eq!(config.collection("authors").map(|c| c.hidden), Some(true));
        assert_eq!(config.tagging, vec!["posts".to_string()]);
        assert_eq!(config.output.replacements[0].to, "_");
        assert_eq!(config.strictness, Strictness::Lenient);
    }
}
