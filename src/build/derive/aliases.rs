use serde_json::Value;

use crate::build::link::{PageLinkData, resolve_link};
use crate::build::site::{AliasEntry, PageKind, Site};

const ALIAS_KEYS: &[&str] = &["aliases", "redirect_from", "redirect-from"];

/// Every alias declared in `data`, in key order.
pub fn alias_texts(data: &serde_json::Map<String, Value>) -> Vec<String> {
    let mut texts = Vec::new();
    for key in ALIAS_KEYS {
        match data.get(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => texts.push(s.trim().to_string()),
            Some(Value::Array(items)) => texts.extend(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            ),
            _ => {}
        }
    }
    texts
}

/// Register the aliases of every routable page. Returns the number registered.
///
/// Alias texts are link templates resolved against the page they belong to.
/// When two pages claim the same alias the first one keeps it.
pub fn register_aliases(site: &mut Site) -> usize {
    let mut claims: Vec<(String, AliasEntry)> = Vec::new();
    for page in site.pages() {
        if !page.routable || matches!(page.kind, PageKind::Derived { .. }) || !page.has_url() {
            continue;
        }

        let data = PageLinkData::for_page(page);
        for text in alias_texts(&page.data) {
            let alias = resolve_link(&site.root_path, &text, &data);
            if alias == page.url() {
                continue;
            }
            claims.push((
                alias,
                AliasEntry {
                    target: page.url().to_string(),
                    page: page.id,
                },
            ));
        }
    }

    let mut registered = 0;
    for (alias, entry) in claims {
        let claimant = entry.page;
        match site.insert_alias(alias.clone(), entry) {
            None => registered += 1,
            Some(existing) if existing.page != claimant => {
                let kept = existing.target.clone();
                tracing::warn!(
                    "alias {alias} already redirects to {kept}, ignoring it for {}",
                    site.page(claimant).raw_id
                );
            }
            Some(_) => {}
        }
    }

    registered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::link::resolve_all;
    use crate::build::testing::{parsed, site};
    use crate::config::RoqConfig;
    use serde_json::json;

    #[test]
    fn test_alias_texts_from_all_keys() {
        let data = json!({
            "aliases": ["/a", "/b"],
            "redirect_from": "/c",
            "redirect-from": ["", "/d"]
        });
        assert_eq!(
            alias_texts(data.as_object().unwrap()),
            vec!["/a", "/b", "/c", "/d"]
        );
    }

    #[test]
    fn test_register_aliases() {
        let config = RoqConfig::default();
        let mut site = site(
            vec![
                parsed("posts/2024-01-05-hello.md", Some(5), json!({
                    "aliases": ["/old-url", "/:year/:name"]
                })),
                parsed("about.md", None, json!({"redirect_from": "/about"})),
            ],
            &config,
        );
        resolve_all(&site, &config);

        assert_eq!(register_aliases(&mut site), 2);
        let aliases = site.aliases();
        assert_eq!(aliases["/old-url"].target, "/posts/2024-01-05-hello");
        assert_eq!(aliases["/2024/2024-01-05-hello"].target, "/posts/2024-01-05-hello");
        // an alias equal to the page's own URL is ignored
        assert!(!aliases.contains_key("/about"));
    }

    #[test]
    fn test_first_alias_claim_wins() {
        let config = RoqConfig::default();
        let mut site = site(
            vec![
                parsed("a.md", None, json!({"aliases": "/shared"})),
                parsed("b.md", None, json!({"aliases": "/shared"})),
            ],
            &config,
        );
        resolve_all(&site, &config);

        assert_eq!(register_aliases(&mut site), 1);
        assert_eq!(site.aliases()["/shared"].target, "/a");
    }
}
