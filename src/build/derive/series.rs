use std::collections::BTreeMap;
use std::sync::OnceLock;

use serde_json::Value;

use crate::build::site::{Page, PageId, Site, compare_documents};

/// Documents sharing a `series` label.
#[derive(Debug)]
pub struct SeriesEntry {
    pub title: String,
    /// Members in discovery order
    pub members: Vec<PageId>,
    sorted: OnceLock<Vec<PageId>>,
}

impl SeriesEntry {
    pub fn new(title: impl Into<String>, members: Vec<PageId>) -> Self {
        Self {
            title: title.into(),
            members,
            sorted: OnceLock::new(),
        }
    }

    /// Members newest first, sorted on first access.
    pub fn ids(&self, site: &Site) -> &[PageId] {
        self.sorted.get_or_init(|| {
            let mut ids = self.members.clone();
            ids.sort_by(|a, b| compare_documents(site.page(*a), site.page(*b)));
            ids
        })
    }

    pub fn documents<'s>(&self, site: &'s Site) -> Vec<&'s Page> {
        self.ids(site).iter().map(|id| site.page(*id)).collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// The series label of a page: `series: Label` or `series: {title: Label}`.
pub fn series_label(data: &serde_json::Map<String, Value>) -> Option<String> {
    let label = match data.get("series")? {
        Value::String(s) => s.trim(),
        Value::Object(map) => map.get("title").and_then(Value::as_str)?.trim(),
        _ => return None,
    };
    (!label.is_empty()).then(|| label.to_string())
}

/// Group the site's documents by series label.
pub fn collect_series(site: &Site) -> BTreeMap<String, SeriesEntry> {
    let mut members: BTreeMap<String, Vec<PageId>> = BTreeMap::new();
    for page in site.pages().iter().filter(|p| p.is_document()) {
        if let Some(label) = series_label(&page.data) {
            members.entry(label).or_default().push(page.id);
        }
    }

    members
        .into_iter()
        .map(|(label, ids)| (label.clone(), SeriesEntry::new(label, ids)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::testing::{parsed, site};
    use crate::config::RoqConfig;
    use serde_json::json;

    #[test]
    fn test_series_grouping_and_order() {
        let config = RoqConfig::default();
        let site = site(
            vec![
                parsed("posts/part-1.md", Some(1), json!({"series": "Intro to Roq"})),
                parsed("posts/part-3.md", Some(9), json!({"series": {"title": "Intro to Roq"}})),
                parsed("posts/part-2.md", Some(4), json!({"series": "Intro to Roq"})),
                parsed("posts/other.md", Some(2), json!({"series": "Other"})),
                parsed("about.md", None, json!({"series": "Intro to Roq"})),
            ],
            &config,
        );

        let series = collect_series(&site);
        assert_eq!(series.len(), 2);

        let intro = &series["Intro to Roq"];
        assert_eq!(intro.len(), 3);
        let order: Vec<&str> = intro
            .documents(&site)
            .iter()
            .map(|p| p.raw_id.as_str())
            .collect();
        assert_eq!(
            order,
            vec!["posts/part-3.md", "posts/part-2.md", "posts/part-1.md"]
        );
        // cached
        assert_eq!(intro.ids(&site).len(), 3);
    }

    #[test]
    fn test_series_label_forms() {
        let data = |v: Value| v.as_object().cloned().unwrap();
        assert_eq!(series_label(&data(json!({"series": " A "}))), Some("A".to_string()));
        assert_eq!(series_label(&data(json!({"series": {"title": "B"}}))), Some("B".to_string()));
        assert_eq!(series_label(&data(json!({"series": ""}))), None);
        assert_eq!(series_label(&data(json!({"series": 3}))), None);
        assert_eq!(series_label(&data(json!({}))), None);
    }
}
