use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde_json::Value;

use crate::build::error::{Diagnostics, RoqError};
use crate::build::site::{PageId, RoqCollection, Site};
use crate::config::RoqConfig;
use crate::util::slugify;

/// Id of the derived collection holding `collection`'s documents tagged `tag`.
pub fn tag_collection_id(collection: &str, tag: &str) -> String {
    format!("{collection}/tag/{tag}")
}

/// Read a `tags` value: a comma/space separated string or a list.
///
/// Every tag is slugified; empty and duplicate tags are dropped.
pub fn parse_tags(value: &Value) -> Vec<String> {
    let raw: Vec<String> = match value {
        Value::String(s) => s
            .split(|c: char| c == ',' || c.is_whitespace())
            .map(str::to_string)
            .collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Value::Number(n) => vec![n.to_string()],
        _ => Vec::new(),
    };

    let mut seen = BTreeSet::new();
    raw.iter()
        .map(|t| slugify(t))
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect()
}

fn tagging_targets(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.trim().to_string()],
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .collect(),
        _ => Vec::new(),
    }
}

/// Build `<collection>/tag/<tag>` collections and one page per tag for every
/// tagging template page. Returns the number of tag pages created.
pub fn derive_tags(
    site: &mut Site,
    config: &RoqConfig,
    diagnostics: &Diagnostics,
) -> Result<usize, RoqError> {
    let templates: Vec<(PageId, String)> = site
        .pages()
        .iter()
        .filter(|p| p.routable)
        .filter_map(|p| p.data.get("tagging").map(|v| (p.id, tagging_targets(v))))
        .flat_map(|(id, targets)| targets.into_iter().map(move |t| (id, t)))
        .collect();

    let tagged: BTreeSet<String> = config
        .tagging
        .iter()
        .cloned()
        .chain(templates.iter().map(|(_, c)| c.clone()))
        .filter(|c| !c.is_empty())
        .collect();

    let mut tags_by_collection: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for collection_id in &tagged {
        let Some(collection) = site.collection(collection_id) else {
            diagnostics.report(RoqError::plugin(
                "tags",
                format!("tagging refers to unknown collection '{collection_id}'"),
            ))?;
            continue;
        };
        let hidden = collection.hidden;

        let mut groups: BTreeMap<String, Vec<PageId>> = BTreeMap::new();
        for id in &collection.pages {
            if let Some(value) = site.page(*id).data.get("tags") {
                for tag in parse_tags(value) {
                    groups.entry(tag).or_default().push(*id);
                }
            }
        }

        tags_by_collection.insert(collection_id.clone(), groups.keys().cloned().collect());
        for (tag, pages) in groups {
            let mut derived = RoqCollection::new(tag_collection_id(collection_id, &tag), pages);
            derived.derived = true;
            derived.hidden = hidden;
            if let Err(err) = site.add_collection(derived) {
                diagnostics.report(err)?;
            }
        }
    }

    let mut created = 0;
    for (template_id, collection_id) in templates {
        // The template only renders through its tag pages.
        site.page_mut(template_id).routable = false;

        let Some(tags) = tags_by_collection.get(&collection_id) else {
            continue;
        };

        for tag in tags {
            let template = site.page(template_id);
            let tag_collection = tag_collection_id(&collection_id, tag);

            let mut data = (*template.data).clone();
            data.insert("tag".to_string(), Value::String(tag.clone()));
            data.insert(
                "tagCollection".to_string(),
                Value::String(tag_collection.clone()),
            );

            let page = template.derive(tag, tag_collection, Arc::new(data));
            site.add_page(page);
            created += 1;
        }
    }

    if created > 0 {
        tracing::debug!("derived {created} tag page(s)");
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::testing::{parsed, site};
    use crate::config::Strictness;
    use serde_json::json;

    #[test]
    fn test_parse_tags_forms() {
        assert_eq!(parse_tags(&json!(["Java", "Quarkus"])), vec!["java", "quarkus"]);
        assert_eq!(parse_tags(&json!("java, quarkus  rust")), vec!["java", "quarkus", "rust"]);
        assert_eq!(parse_tags(&json!(["Java", "java", ""])), vec!["java"]);
        assert_eq!(parse_tags(&json!(["C Sharp"])), vec!["c-sharp"]);
        assert!(parse_tags(&json!(null)).is_empty());
    }

    #[test]
    fn test_tag_collections_follow_source_order() {
        let mut config = RoqConfig::default();
        config.tagging.push("posts".to_string());
        let mut site = site(
            vec![
                parsed("posts/a.md", Some(1), json!({"tags": ["Java", "Quarkus"]})),
                parsed("posts/b.md", Some(5), json!({"tags": "java"})),
                parsed("posts/c.md", Some(3), json!({})),
            ],
            &config,
        );

        let diagnostics = Diagnostics::new(Strictness::FailFast);
        derive_tags(&mut site, &config, &diagnostics).unwrap();

        let java = site.collection("posts/tag/java").unwrap();
        assert!(java.derived);
        let ids: Vec<&str> = java
            .pages
            .iter()
            .map(|id| site.page(*id).raw_id.as_str())
            .collect();
        assert_eq!(ids, vec!["posts/b.md", "posts/a.md"]);

        let quarkus = site.collection("posts/tag/quarkus").unwrap();
        assert_eq!(quarkus.pages.len(), 1);
    }

    #[test]
    fn test_every_tag_has_a_collection() {
        let mut config = RoqConfig::default();
        config.tagging.push("posts".to_string());
        let mut site = site(
            vec![
                parsed("posts/a.md", Some(1), json!({"tags": ["x", "y"]})),
                parsed("posts/b.md", Some(2), json!({"tags": ["y", "z"]})),
            ],
            &config,
        );
        derive_tags(&mut site, &config, &Diagnostics::new(Strictness::FailFast)).unwrap();

        for page in site.documents("posts") {
            for tag in parse_tags(&page.data["tags"]) {
                let collection = site.collection(&tag_collection_id("posts", &tag)).unwrap();
                assert!(collection.pages.contains(&page.id));
            }
        }
    }

    #[test]
    fn test_tagging_page_produces_one_page_per_tag() {
        let config = RoqConfig::default();
        let mut site = site(
            vec![
                parsed("posts/a.md", Some(1), json!({"tags": ["Java", "Quarkus"]})),
                parsed("tags.html", None, json!({"tagging": "posts"})),
            ],
            &config,
        );

        let created =
            derive_tags(&mut site, &config, &Diagnostics::new(Strictness::FailFast)).unwrap();
        assert_eq!(created, 2);

        let template = site.page_by_raw_id("tags.html").unwrap();
        assert!(!template.routable);

        let java = site.page_by_raw_id("tags.html#java").unwrap();
        assert_eq!(java.data["tag"], "java");
        assert_eq!(java.data["tagCollection"], "posts/tag/java");
        assert!(java.routable);
    }

    #[test]
    fn test_unknown_tagging_collection_is_plugin_error() {
        let config = RoqConfig::default();
        let mut site = site(
            vec![parsed("tags.html", None, json!({"tagging": "news"}))],
            &config,
        );
        let err = derive_tags(&mut site, &config, &Diagnostics::new(Strictness::FailFast))
            .unwrap_err();
        assert!(matches!(err, RoqError::Plugin { plugin: "tags", .. }));

        let lenient = Diagnostics::new(Strictness::Lenient);
        assert_eq!(derive_tags(&mut site, &config, &lenient).unwrap(), 0);
    }
}
