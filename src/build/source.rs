use std::path::{Path, PathBuf};

use rayon::prelude::*;
use walkdir::WalkDir;

use crate::config::RoqConfig;

use super::date::{DateResolver, Visibility};
use super::document::{
    PageInfo, ParsedPage, SourceFile, StaticFile, parse_front_matter, starts_with_front_matter,
};
use super::error::{Diagnostics, RoqError};
use super::exclude::ExclusionMatcher;
use super::link::with_root;

/// Extensions that are always pages, with or without front matter.
const PAGE_EXTENSIONS: &[&str] = &["md", "markdown", "html", "htm"];

/// Content files below this directory are partials, never pages.
const INCLUDES_DIR: &str = "_includes/";

// =============================================================================
// Scan output
// =============================================================================

/// Everything discovered in the source tree, sorted by path.
#[derive(Debug, Default)]
pub struct ScanOutput {
    pub pages: Vec<ParsedPage>,
    pub static_files: Vec<StaticFile>,
    /// Pages dropped as drafts or future-dated
    pub hidden: usize,
}

/// What a single content file turned out to be.
#[derive(Debug)]
enum Classified {
    Page(Box<ParsedPage>),
    Static(StaticFile),
    Hidden,
    Partial,
}

// =============================================================================
// Scanner
// =============================================================================

/// Walks the content and static directories of a site.
pub struct ContentScanner<'a> {
    config: &'a RoqConfig,
    site_root: PathBuf,
    matcher: ExclusionMatcher,
    dates: DateResolver,
}

impl<'a> ContentScanner<'a> {
    pub fn new(
        config: &'a RoqConfig,
        site_root: &Path,
        dates: DateResolver,
    ) -> Result<Self, RoqError> {
        let matcher = ExclusionMatcher::new(site_root, &config.site.ignored_files)
            .map_err(|e| RoqError::Config(e.to_string()))?;

        Ok(Self {
            config,
            site_root: site_root.to_path_buf(),
            matcher,
            dates,
        })
    }

    pub fn content_root(&self) -> PathBuf {
        self.site_root.join(&self.config.site.content_dir)
    }

    pub fn static_root(&self) -> PathBuf {
        self.site_root.join(&self.config.site.static_dir)
    }

    /// Discover pages and passthrough files.
    ///
    /// Files are parsed in parallel; the result does not depend on the
    /// order the filesystem returns entries in.
    pub fn scan(&self, diagnostics: &Diagnostics) -> Result<ScanOutput, RoqError> {
        let content_root = self.content_root();
        let files = self.walk(&content_root)?;
        tracing::debug!("found {} file(s) in {}", files.len(), content_root.display());

        let classified: Vec<Result<Classified, RoqError>> = files
            .par_iter()
            .map(|path| self.classify(&content_root, path))
            .collect();

        let mut output = ScanOutput::default();
        for item in classified {
            match item {
                Ok(Classified::Page(page)) => output.pages.push(*page),
                Ok(Classified::Static(file)) => output.static_files.push(file),
                Ok(Classified::Hidden) => output.hidden += 1,
                Ok(Classified::Partial) => {}
                Err(err) => diagnostics.report(err)?,
            }
        }

        let static_root = self.static_root();
        for path in self.walk(&static_root)? {
            let relative = path.strip_prefix(&static_root).unwrap_or(&path);
            let url = with_root(&self.config.site.root_path, &crate::util::to_slash(relative));
            output.static_files.push(StaticFile::new(path, url));
        }

        output.pages.sort_by(|a, b| a.info.raw_id.cmp(&b.info.raw_id));
        output
            .static_files
            .sort_by(|a, b| a.output_path.cmp(&b.output_path));

        tracing::info!(
            "scanned {} page(s) and {} static file(s), {} hidden",
            output.pages.len(),
            output.static_files.len(),
            output.hidden
        );
        Ok(output)
    }

    /// Every non-excluded file below `dir`, sorted. A missing directory is empty.
    fn walk(&self, dir: &Path) -> Result<Vec<PathBuf>, RoqError> {
        if !dir.exists() {
            tracing::debug!("{} does not exist, skipping", dir.display());
            return Ok(Vec::new());
        }
        // Catch a content dir outside the site root before walking it.
        self.check_excluded(dir)?;

        let mut files = Vec::new();
        let walker = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !entry.file_type().is_dir()
                    || !matches!(self.matcher.is_excluded(entry.path()), Ok(true))
            });

        for entry in walker {
            let entry = entry.map_err(|e| RoqError::Scanning {
                path: e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf()),
                source: e.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            if let Some(pattern) = self.matcher.matching_pattern(entry.path()) {
                tracing::debug!("ignoring {} (matches {pattern})", entry.path().display());
                continue;
            }
            files.push(entry.into_path());
        }

        Ok(files)
    }

    fn check_excluded(&self, path: &Path) -> Result<bool, RoqError> {
        self.matcher
            .is_excluded(path)
            .map_err(|e| RoqError::Config(e.to_string()))
    }

    fn classify(&self, content_root: &Path, path: &Path) -> Result<Classified, RoqError> {
        let file = SourceFile::read(content_root, path).map_err(|source| RoqError::Scanning {
            path: path.to_path_buf(),
            source,
        })?;
        let raw_id = file.raw_id();

        if raw_id.starts_with(INCLUDES_DIR) {
            return Ok(Classified::Partial);
        }

        let extension = file.extension().unwrap_or_default();
        if !PAGE_EXTENSIONS.contains(&extension.as_str()) && !starts_with_front_matter(&file.bytes)
        {
            let url = with_root(&self.config.site.root_path, &raw_id);
            return Ok(Classified::Static(StaticFile::new(file.path, url)));
        }

        self.parse_page(file, raw_id, extension)
    }

    fn parse_page(
        &self,
        file: SourceFile,
        raw_id: String,
        extension: String,
    ) -> Result<Classified, RoqError> {
        let reading_error = |message: String| RoqError::FrontMatterReading {
            path: file.path.clone(),
            message,
        };

        let text = file
            .text()
            .ok_or_else(|| reading_error("file is not valid UTF-8".to_string()))?;
        let parsed = parse_front_matter(text).map_err(|e| reading_error(e.to_string()))?;

        let stem = file
            .relative_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let date = self
            .dates
            .resolve(&parsed.front_matter, stem)
            .map_err(|e| reading_error(e.to_string()))?;

        match self.dates.visibility(&parsed.front_matter, date.as_ref()) {
            Visibility::Visible => {}
            hidden => {
                tracing::debug!("skipping {raw_id} ({hidden:?})");
                return Ok(Classified::Hidden);
            }
        }

        let base_file_name = self
            .dates
            .from_file_name(stem)
            .map(|(_, rest)| rest)
            .unwrap_or(stem)
            .to_string();
        let collection = self.collection_of(&raw_id, stem);

        let info = PageInfo {
            raw_id,
            source_path: file.relative_path.clone(),
            absolute_path: file.path.clone(),
            base_file_name,
            extension,
            date,
            collection,
            modified: file.modified,
        };

        Ok(Classified::Page(Box::new(ParsedPage {
            info,
            front_matter: parsed.front_matter,
            body: parsed.content,
        })))
    }

    /// The collection whose directory holds `raw_id`. Index files are listings.
    fn collection_of(&self, raw_id: &str, stem: &str) -> Option<String> {
        if stem == "index" {
            return None;
        }
        self.config
            .collections
            .iter()
            .find(|c| {
                raw_id
                    .strip_prefix(c.dir())
                    .is_some_and(|rest| rest.starts_with('/'))
            })
            .map(|c| c.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CollectionConfig, Strictness};
    use chrono::{TimeZone, Utc};
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn resolver(config: &RoqConfig) -> DateResolver {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        DateResolver::new(&config.site.date_format, &config.site.timezone, now)
            .unwrap()
            .with_visibility(config.site.draft, config.site.future)
    }

    fn scan(root: &Path, config: &RoqConfig) -> Result<ScanOutput, RoqError> {
        let scanner = ContentScanner::new(config, root, resolver(config))?;
        scanner.scan(&Diagnostics::new(Strictness::FailFast))
    }

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "content/posts/2024-08-29-welcome-to-roq.md", "---\ntitle: Welcome\ntags: [Java, Quarkus]\n---\nHello");
        write(root, "content/posts/draft.md", "---\ndraft: true\n---\nWIP");
        write(root, "content/posts/later.md", "---\ndate: 2030-01-01\n---\nSoon");
        write(root, "content/posts/index.html", "---\npaginate: posts\n---\nlist");
        write(root, "content/about.md", "About");
        write(root, "content/feed.xml", "---\nlayout: false\n---\n<feed/>");
        write(root, "content/images/logo.png", "PNG");
        write(root, "content/_includes/nav.html", "<nav/>");
        write(root, "content/.secret.md", "hidden");
        write(root, "public/robots.txt", "User-agent: *");
        dir
    }

    #[test]
    fn test_scan_classifies_files() {
        let dir = fixture();
        let config = RoqConfig::default();
        let output = scan(dir.path(), &config).unwrap();

        let ids: Vec<&str> = output.pages.iter().map(|p| p.info.raw_id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "about.md",
                "feed.xml",
                "posts/2024-08-29-welcome-to-roq.md",
                "posts/index.html"
            ]
        );
        assert_eq!(output.hidden, 2);

        let urls: Vec<&str> = output
            .static_files
            .iter()
            .map(|f| f.output_path.as_str())
            .collect();
        assert_eq!(urls, vec!["/images/logo.png", "/robots.txt"]);
    }

    #[test]
    fn test_scan_resolves_identity() {
        let dir = fixture();
        let config = RoqConfig::default();
        let output = scan(dir.path(), &config).unwrap();

        let post = &output.pages[2].info;
        assert_eq!(post.collection.as_deref(), Some("posts"));
        assert_eq!(post.base_file_name, "welcome-to-roq");
        assert_eq!(
            post.date.map(|d| d.to_rfc3339()),
            Some("2024-08-29T12:00:00+00:00".to_string())
        );

        // index files are listings, not documents
        assert_eq!(output.pages[3].info.collection, None);
        assert_eq!(output.pages[0].info.collection, None);
    }

    #[test]
    fn test_index_prefixed_post_is_a_document() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "content/posts/indexing-tips.md", "---\ntags: [rust]\n---\nTips");
        write(dir.path(), "content/posts/index.html", "list");
        let output = scan(dir.path(), &RoqConfig::default()).unwrap();

        assert_eq!(output.pages[0].info.raw_id, "posts/index.html");
        assert_eq!(output.pages[0].info.collection, None);
        assert_eq!(output.pages[1].info.raw_id, "posts/indexing-tips.md");
        assert_eq!(output.pages[1].info.collection.as_deref(), Some("posts"));
    }

    #[test]
    fn test_scan_includes_drafts_and_future_when_enabled() {
        let dir = fixture();
        let mut config = RoqConfig::default();
        config.site.draft = true;
        config.site.future = true;
        let output = scan(dir.path(), &config).unwrap();
        assert_eq!(output.pages.len(), 6);
        assert_eq!(output.hidden, 0);
    }

    #[test]
    fn test_collection_dir_override() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "content/blog/hello.md", "Hi");
        let mut config = RoqConfig::default();
        let mut posts = CollectionConfig::new("posts");
        posts.dir = Some("blog".to_string());
        config.collections = vec![posts];

        let output = scan(dir.path(), &config).unwrap();
        assert_eq!(output.pages[0].info.collection.as_deref(), Some("posts"));
    }

    #[test]
    fn test_ignored_patterns_apply() {
        let dir = fixture();
        write(dir.path(), "content/node_modules/pkg/readme.md", "x");
        let mut config = RoqConfig::default();
        config.site.ignored_files.push("content/images/**".to_string());

        let output = scan(dir.path(), &config).unwrap();
        assert!(output.pages.iter().all(|p| !p.info.raw_id.contains("node_modules")));
        assert!(output.static_files.iter().all(|f| !f.output_path.contains("logo")));
    }

    #[test]
    fn test_bad_front_matter_is_reported() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "content/bad.md", "---\n- a list\n---\nbody");
        let err = scan(dir.path(), &RoqConfig::default()).unwrap_err();
        assert!(matches!(err, RoqError::FrontMatterReading { .. }));

        let config = RoqConfig::default();
        let scanner = ContentScanner::new(&config, dir.path(), resolver(&config)).unwrap();
        let lenient = Diagnostics::new(Strictness::Lenient);
        assert!(scanner.scan(&lenient).unwrap().pages.is_empty());
    }

    #[test]
    fn test_missing_content_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let output = scan(dir.path(), &RoqConfig::default()).unwrap();
        assert!(output.pages.is_empty());
        assert!(output.static_files.is_empty());
    }

    #[test]
    fn test_root_path_prefixes_static_urls() {
        let dir = fixture();
        let mut config = RoqConfig::default();
        config.site.root_path = "/blog/".to_string();
        let output = scan(dir.path(), &config).unwrap();
        assert_eq!(output.static_files[0].output_path, "/blog/images/logo.png");
    }
}
