use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{TimeZone, Utc};
use walkdir::WalkDir;

use roq::build::{Builder, RoqError};
use roq::config::RoqConfig;

const LAYOUT: &str =
    "<h1>{{ page.title }}</h1>{% if page.date %}<time>{{ page.date }}</time>{% endif %}\n{{ content }}\n";

const WELCOME: &str = r#"---
title: "Welcome to Roq!"
tags: [Java, Quarkus]
aliases: [/old-url]
---
# Hello

First post.
"#;

const TAGS: &str = "---
tagging: posts
paginate: true
---
<ul>{% for p in paginator.items %}<li>{{ p.title }}</li>{% endfor %}</ul>";

const INDEX: &str = "---
paginate:
  collection: posts
  size: 1
---
{% for p in paginator.items %}[{{ p.title }}]{% endfor %}{% if paginator.next_url %} next={{ paginator.next_url }}{% endif %}";

fn write(root: &Path, relative: &str, text: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, text).unwrap();
}

fn fixture() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "templates/layouts/default.html", LAYOUT);
    write(root, "content/posts/2024-08-29-welcome-to-roq.md", WELCOME);
    write(
        root,
        "content/posts/2024-09-01-second.md",
        "---\ntitle: Second\ntags: java\n---\nMore.\n",
    );
    write(
        root,
        "content/posts/2024-09-02-unfinished.md",
        "---\ntitle: Unfinished\ndraft: true\n---\nWIP\n",
    );
    write(
        root,
        "content/posts/2030-01-01-someday.md",
        "---\ntitle: Someday\n---\nLater\n",
    );
    write(root, "content/tags.html", TAGS);
    write(root, "content/index.html", INDEX);
    write(root, "public/robots.txt", "User-agent: *\n");
    dir
}

fn builder(root: &Path) -> Builder {
    let mut config = RoqConfig::default();
    config.site.url = Some("https://example.com".to_string());
    Builder::new(config, root.to_path_buf())
        .with_now(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
}

fn read(root: &Path, relative: &str) -> String {
    std::fs::read_to_string(root.join("_site").join(relative))
        .unwrap_or_else(|e| panic!("{relative}: {e}"))
}

fn tree(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    WalkDir::new(dir)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let relative = e.path().strip_prefix(dir).unwrap().to_path_buf();
            (relative, std::fs::read(e.path()).unwrap())
        })
        .collect()
}

#[tokio::test]
async fn test_document_url_and_date() {
    let site = fixture();
    let result = builder(site.path()).build().await.unwrap();
    assert_eq!(result.output_dir, site.path().join("_site"));

    let html = read(site.path(), "posts/welcome-to-roq/index.html");
    assert!(html.starts_with("<h1>Welcome to Roq!</h1><time>2024-08-29T12:00:00+00:00</time>"));
    assert!(html.contains("<h1 id=\"hello\">"));
}

#[tokio::test]
async fn test_tag_pages() {
    let site = fixture();
    builder(site.path()).build().await.unwrap();

    let java = read(site.path(), "posts/tag/java/index.html");
    assert!(java.contains("<li>Second</li><li>Welcome to Roq!</li>"));
    let quarkus = read(site.path(), "posts/tag/quarkus/index.html");
    assert!(quarkus.contains("<li>Welcome to Roq!</li>"));
    assert!(!quarkus.contains("Second"));
    assert!(!site.path().join("_site/tags/index.html").exists());
}

#[tokio::test]
async fn test_alias_redirect() {
    let site = fixture();
    builder(site.path()).build().await.unwrap();

    let redirect = read(site.path(), "old-url/index.html");
    assert!(redirect.contains("url=/posts/welcome-to-roq\""));
}

#[tokio::test]
async fn test_pagination_and_passthrough() {
    let site = fixture();
    builder(site.path()).build().await.unwrap();

    assert!(read(site.path(), "index.html").contains("[Second] next=/page/2"));
    assert!(read(site.path(), "page/2/index.html").contains("[Welcome to Roq!]"));
    assert!(!site.path().join("_site/page/3").exists());
    assert_eq!(read(site.path(), "robots.txt"), "User-agent: *\n");

    let sitemap = read(site.path(), "sitemap.xml");
    assert!(sitemap.contains("<loc>https://example.com/posts/welcome-to-roq</loc>"));
    assert!(!sitemap.contains("old-url"));
}

#[tokio::test]
async fn test_drafts_and_future_posts() {
    let site = fixture();
    builder(site.path()).build().await.unwrap();
    assert!(!site.path().join("_site/posts/unfinished").exists());
    assert!(!site.path().join("_site/posts/someday").exists());

    let mut config = RoqConfig::default();
    config.site.draft = true;
    config.site.future = true;
    Builder::new(config, site.path().to_path_buf())
        .build()
        .await
        .unwrap();
    assert!(site.path().join("_site/posts/unfinished/index.html").exists());
    assert!(site.path().join("_site/posts/someday/index.html").exists());
}

#[tokio::test]
async fn test_rebuild_is_byte_identical() {
    let site = fixture();
    let first = builder(site.path()).build().await.unwrap();
    let before = tree(&first.output_dir);

    let second = builder(site.path()).build().await.unwrap();
    assert_eq!(second.files_written, 0);
    assert_eq!(second.unchanged, before.len());
    assert_eq!(tree(&second.output_dir), before);
}

#[tokio::test]
async fn test_path_conflict_is_fatal() {
    let site = fixture();
    write(site.path(), "content/a.md", "---\nlink: /same\n---\nA\n");
    write(site.path(), "content/b.md", "---\nlink: /same\n---\nB\n");

    let err = builder(site.path()).build().await.unwrap_err();
    match err {
        RoqError::PathConflict { path, first, second } => {
            assert!(path.ends_with("same/index.html"));
            assert!(first.ends_with("a.md"));
            assert!(second.ends_with("b.md"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!site.path().join("_site").exists());
}
