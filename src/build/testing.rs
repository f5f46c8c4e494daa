//! Fixtures shared by unit tests.

use std::path::PathBuf;

use chrono::{FixedOffset, TimeZone};
use serde_json::Value;

use crate::config::{RoqConfig, Strictness};

use super::document::{FrontMatter, PageInfo, ParsedPage};
use super::error::Diagnostics;
use super::layout::Layouts;
use super::site::{Site, SiteBuilder};

/// A parsed markdown page. `day` is a day of January 2024.
pub fn parsed(raw_id: &str, day: Option<u32>, front_matter: Value) -> ParsedPage {
    let source_path = PathBuf::from(raw_id);
    let stem = source_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_string();
    let extension = source_path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_string();
    let collection = raw_id
        .split_once('/')
        .map(|(dir, _)| dir.to_string())
        .filter(|_| stem != "index");

    ParsedPage {
        info: PageInfo {
            raw_id: raw_id.to_string(),
            absolute_path: PathBuf::from("/site/content").join(raw_id),
            base_file_name: stem,
            extension,
            source_path,
            date: day.map(|d| {
                FixedOffset::east_opt(0)
                    .and_then(|tz| tz.with_ymd_and_hms(2024, 1, d, 12, 0, 0).single())
                    .unwrap()
            }),
            collection,
            modified: None,
        },
        front_matter: front_matter.as_object().cloned().unwrap_or_default(),
        body: format!("Body of {raw_id}"),
    }
}

/// Assemble a site without layouts or data.
pub fn site(pages: Vec<ParsedPage>, config: &RoqConfig) -> Site {
    let layouts = Layouts::default();
    let diagnostics = Diagnostics::new(Strictness::FailFast);
    SiteBuilder::new(config, &layouts, &diagnostics)
        .build(pages, FrontMatter::new(), Vec::new())
        .unwrap()
}
