use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, FixedOffset};
use serde_json::Value;

use crate::util::{title_case, to_slash};

// =============================================================================
// Source files
// =============================================================================

/// A file read from the content tree. Immutable once read.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Absolute path on disk
    pub path: PathBuf,
    /// Path relative to the content root (e.g., "posts/2024-08-29-hello.md")
    pub relative_path: PathBuf,
    /// Raw file contents
    pub bytes: Vec<u8>,
    /// Last modification time, when the filesystem reports one
    pub modified: Option<SystemTime>,
}

impl SourceFile {
    /// Read a file below `root`.
    pub fn read(root: &Path, path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok();
        let relative_path = path.strip_prefix(root).unwrap_or(path).to_path_buf();

        Ok(Self {
            path: path.to_path_buf(),
            relative_path,
            bytes,
            modified,
        })
    }

    /// Stable identifier: the relative path with forward slashes.
    pub fn raw_id(&self) -> String {
        to_slash(&self.relative_path)
    }

    /// Lowercase file extension, if any.
    pub fn extension(&self) -> Option<String> {
        self.relative_path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }

    /// The contents as text, if they are valid UTF-8.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }
}

/// Returns true if `bytes` open with a `---` fence line (after an optional BOM).
pub fn starts_with_front_matter(bytes: &[u8]) -> bool {
    let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);
    bytes.starts_with(b"---\n") || bytes.starts_with(b"---\r\n")
}

// =============================================================================
// Static files
// =============================================================================

/// A file (image, CSS, JS, etc.) that gets copied to output byte-for-byte.
#[derive(Debug, Clone)]
pub struct StaticFile {
    /// Absolute source path
    pub source_path: PathBuf,
    /// The URL this file will be served at (e.g., "/images/logo.png")
    pub output_path: String,
}

impl StaticFile {
    pub fn new(source_path: PathBuf, output_path: String) -> Self {
        Self {
            source_path,
            output_path,
        }
    }
}

// =============================================================================
// Front matter
// =============================================================================

/// Ordered front matter mapping.
pub type FrontMatter = serde_json::Map<String, Value>;

#[derive(thiserror::Error, Debug)]
pub enum FrontMatterError {
    #[error("malformed YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("front matter must be a mapping, found {0}")]
    NotAMapping(&'static str),

    #[error("unsupported value: {0}")]
    Value(#[from] serde_json::Error),
}

/// Result of parsing front matter from a source file.
#[derive(Debug)]
pub struct ParsedContent {
    /// The parsed front matter (empty if none found)
    pub front_matter: FrontMatter,
    /// The body without the front matter block
    pub content: String,
}

/// Parse front matter from file content.
///
/// Front matter is a YAML (or JSON) block delimited by `---` lines at the
/// start of the file:
///
/// ```markdown
/// ---
/// title: My Page
/// tags: [java, quarkus]
/// ---
///
/// # Content starts here
/// ```
///
/// Without an opening fence, or without a closing fence, the front matter is
/// empty and the whole file is the body.
pub fn parse_front_matter(content: &str) -> Result<ParsedContent, FrontMatterError> {
    let content = content.trim_start_matches('\u{feff}');

    let Some((yaml, body)) = split_front_matter(content) else {
        return Ok(ParsedContent {
            front_matter: FrontMatter::new(),
            content: content.to_string(),
        });
    };

    let value: serde_yaml::Value = serde_yaml::from_str(yaml)?;
    let front_matter = match value {
        serde_yaml::Value::Null => FrontMatter::new(),
        serde_yaml::Value::Mapping(_) => match serde_json::to_value(&value)? {
            Value::Object(map) => map,
            _ => FrontMatter::new(),
        },
        serde_yaml::Value::Bool(_) => return Err(FrontMatterError::NotAMapping("a boolean")),
        serde_yaml::Value::Number(_) => return Err(FrontMatterError::NotAMapping("a number")),
        serde_yaml::Value::String(_) => return Err(FrontMatterError::NotAMapping("a string")),
        serde_yaml::Value::Sequence(_) => return Err(FrontMatterError::NotAMapping("a list")),
        serde_yaml::Value::Tagged(_) => {
            return Err(FrontMatterError::NotAMapping("a tagged value"));
        }
    };

    Ok(ParsedContent {
        front_matter,
        content: body.trim_start_matches(['\r', '\n']).to_string(),
    })
}

/// Split `content` into the header block and the body.
fn split_front_matter(content: &str) -> Option<(&str, &str)> {
    let first_line_end = content.find('\n')?;
    if content[..first_line_end].trim_end() != "---" {
        return None;
    }

    let after_opening = &content[first_line_end + 1..];
    let mut offset = 0;
    for line in after_opening.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let header = &after_opening[..offset];
            let body = &after_opening[offset + line.len()..];
            return Some((header, body));
        }
        offset += line.len();
    }

    None
}

// =============================================================================
// Page identity
// =============================================================================

/// Derived identity of a page. Immutable after parse.
#[derive(Debug, Clone)]
pub struct PageInfo {
    /// Stable path-derived key (e.g., "posts/2024-08-29-welcome-to-roq.md")
    pub raw_id: String,
    /// Path relative to the content root
    pub source_path: PathBuf,
    /// Absolute path on disk
    pub absolute_path: PathBuf,
    /// File name without extension and without a date prefix
    pub base_file_name: String,
    /// Lowercase extension
    pub extension: String,
    /// Resolved publish date
    pub date: Option<DateTime<FixedOffset>>,
    /// Collection the page belongs to, if it is a document
    pub collection: Option<String>,
    /// Last modification time of the source
    pub modified: Option<SystemTime>,
}

impl PageInfo {
    /// Title derived from the file name: "getting-started" -> "Getting Started".
    pub fn fallback_title(&self) -> String {
        let title = title_case(&self.base_file_name);
        if title.is_empty() {
            "Untitled".to_string()
        } else {
            title
        }
    }

    /// Returns true for `.md`, `.html` and other HTML-producing sources.
    pub fn renders_html(&self) -> bool {
        matches!(
            self.extension.as_str(),
            "md" | "markdown" | "html" | "htm" | ""
        )
    }

    /// The `:path` placeholder value.
    ///
    /// HTML-producing sources lose their extension and `index` collapses into
    /// its directory; other sources (e.g. `feed.xml`) keep their file name.
    pub fn link_path(&self) -> String {
        let slash = to_slash(&self.source_path);
        if !self.renders_html() {
            return slash;
        }

        let stem = match slash.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem.to_string(),
            _ => slash,
        };

        if stem == "index" {
            String::new()
        } else if let Some(dir) = stem.strip_suffix("/index") {
            dir.to_string()
        } else {
            stem
        }
    }
}

/// A parsed, visible page source waiting to join the site.
#[derive(Debug, Clone)]
pub struct ParsedPage {
    pub info: PageInfo,
    pub front_matter: FrontMatter,
    pub body: String,
}
