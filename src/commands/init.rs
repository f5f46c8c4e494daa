use std::path::Path;

use roq::config::{DEFAULT_CONFIG_FILE, RoqConfig, SiteConfig};

use crate::InitArgs;

const DEFAULT_LAYOUT: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>{{ page.title }}{% if site.title %} | {{ site.title }}{% endif %}</title>
</head>
<body>
  <main>
{{ content }}
  </main>
</body>
</html>
"#;

const WELCOME_POST: &str = r#"---
title: Welcome to Roq
tags: [roq]
---

# Hello

This is your first post. Edit or delete it, then run `roq build`.
"#;

const INDEX_PAGE: &str = r#"---
title: Home
paginate: posts
---
<ul>
{% for post in paginator.items %}  <li><a href="{{ post.url }}">{{ post.title }}</a></li>
{% endfor %}</ul>
"#;

pub async fn run(args: &InitArgs) -> Result<(), anyhow::Error> {
    let path = if args.path.is_relative() {
        std::env::current_dir()?.join(&args.path)
    } else {
        args.path.clone()
    };

    if !path.exists() {
        if args.create {
            tokio::fs::create_dir_all(&path).await?;
            println!("Created directory {path}", path = path.display());
        } else {
            return Err(anyhow::anyhow!(
                "Directory does not exist: {path}",
                path = path.display()
            ));
        }
    }

    let config_file = path.join(DEFAULT_CONFIG_FILE);
    if config_file.exists() {
        return Err(anyhow::anyhow!(
            "{} already exists",
            config_file.display()
        ));
    }

    let default_config = RoqConfig {
        site: SiteConfig {
            title: Some("My Roq Site".into()),
            url: Some("https://example.com".into()),
            ..SiteConfig::default()
        },
        tagging: vec!["posts".into()],
        ..RoqConfig::default()
    };

    println!("Initializing project in {}", path.display());

    let config_text = serde_yaml::to_string(&default_config)?;
    tokio::fs::write(&config_file, config_text).await?;

    write_new(&path.join(&default_config.site.layouts_dir).join("default.html"), DEFAULT_LAYOUT).await?;
    let content = path.join(&default_config.site.content_dir);
    write_new(&content.join("index.html"), INDEX_PAGE).await?;
    write_new(&content.join("posts/2024-08-29-welcome-to-roq.md"), WELCOME_POST).await?;

    println!(
        "Created config file {config_file}",
        config_file = config_file.display()
    );

    Ok(())
}

/// Write a starter file unless one is already there.
async fn write_new(path: &Path, text: &str) -> Result<(), anyhow::Error> {
    if path.exists() {
        tracing::debug!("keeping existing {}", path.display());
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, text).await?;
    Ok(())
}
