//! Generated outputs: alias redirect pages and the sitemap.
//!
//! # Sitemap Format
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
//!   <url>
//!     <loc>https://example.com/posts/hello</loc>
//!     <lastmod>2024-08-29</lastmod>
//!   </url>
//! </urlset>
//! ```

use chrono::{DateTime, Utc};

use super::output::{OutputKind, Payload, WritePlan};
use super::site::{Page, Site};

/// XML namespace for sitemap
const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

// =============================================================================
// Redirects
// =============================================================================

/// HTML page sending the browser to `target`.
pub fn redirect_html(target: &str) -> String {
    let target = escape_xml(target);
    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <title>Redirecting&hellip;</title>\n\
         <link rel=\"canonical\" href=\"{target}\">\n\
         <meta http-equiv=\"refresh\" content=\"0; url={target}\">\n\
         <meta name=\"robots\" content=\"noindex\">\n\
         </head>\n\
         <body>\n\
         <p>Redirecting to <a href=\"{target}\">{target}</a>&hellip;</p>\n\
         </body>\n\
         </html>\n"
    )
}

// =============================================================================
// Sitemap
// =============================================================================

/// Single URL entry in the sitemap
struct UrlEntry {
    /// Full URL location
    loc: String,
    /// Last modification date (YYYY-MM-DD)
    lastmod: Option<String>,
}

/// Sitemap of every planned HTML page, in plan order.
pub fn sitemap_xml(site: &Site, plan: &WritePlan) -> String {
    let base = site.url.as_deref().unwrap_or("").trim_end_matches('/');
    let urls = plan
        .iter()
        .filter(|entry| entry.kind == OutputKind::Html)
        .filter_map(|entry| match entry.payload {
            Payload::Page(id) => Some(site.page(id)),
            _ => None,
        })
        .map(|page| UrlEntry {
            loc: format!("{base}{}", page.url()),
            lastmod: lastmod(page),
        });
    into_xml(urls)
}

fn lastmod(page: &Page) -> Option<String> {
    if let Some(date) = page.info.date {
        return Some(date.format("%Y-%m-%d").to_string());
    }
    page.info
        .modified
        .map(|time| DateTime::<Utc>::from(time).format("%Y-%m-%d").to_string())
}

fn into_xml(urls: impl Iterator<Item = UrlEntry>) -> String {
    let mut xml = String::with_capacity(4096);

    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    xml.push_str(&format!(r#"<urlset xmlns="{SITEMAP_NS}">"#));
    xml.push('\n');

    for entry in urls {
        xml.push_str("  <url>\n");
        xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&entry.loc)));
        if let Some(lastmod) = entry.lastmod {
            xml.push_str(&format!("    <lastmod>{lastmod}</lastmod>\n"));
        }
        xml.push_str("  </url>\n");
    }

    xml.push_str("</urlset>\n");
    xml
}

/// Escape special XML characters.
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
