//! Markdown rendering with heading anchors and TOC extraction.

use std::collections::HashSet;

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd, html};
use serde::Serialize;

use crate::config::MarkdownConfig;
use crate::util::slugify;

#[derive(thiserror::Error, Debug)]
pub enum MarkdownError {
    #[error("invalid markdown extension: {0}")]
    InvalidExtension(String),
}

/// A heading, as listed in a page's table of contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    pub text: String,
    pub id: String,
    pub level: u8,
}

/// Result of rendering markdown, containing both HTML and table of contents.
pub struct MarkdownOutput {
    pub html: String,
    pub toc: Vec<TocEntry>,
}

/// Translate extension names into parser options.
pub fn markdown_options(config: &MarkdownConfig) -> Result<Options, MarkdownError> {
    let mut options = Options::empty();
    for extension in &config.extensions {
        match extension.as_str() {
            "definition_lists" => options.insert(Options::ENABLE_DEFINITION_LIST),
            "footnotes" => options.insert(Options::ENABLE_FOOTNOTES),
            "gfm" => options.insert(Options::ENABLE_GFM),
            "heading_attributes" => options.insert(Options::ENABLE_HEADING_ATTRIBUTES),
            "smart_punctuation" => options.insert(Options::ENABLE_SMART_PUNCTUATION),
            "strikethrough" => options.insert(Options::ENABLE_STRIKETHROUGH),
            "tables" => options.insert(Options::ENABLE_TABLES),
            "tasklists" => options.insert(Options::ENABLE_TASKLISTS),
            other => return Err(MarkdownError::InvalidExtension(other.to_string())),
        }
    }
    Ok(options)
}

struct HeadingState {
    level: HeadingLevel,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
    /// Inline HTML of the heading
    html: String,
    /// Plain text, for the id and the TOC
    text: String,
}

/// Render markdown to HTML using pulldown-cmark.
///
/// Headings without an explicit id get one slugified from their text, made
/// unique within the document.
pub fn render_markdown(
    markdown: &str,
    markdown_config: &MarkdownConfig,
) -> Result<MarkdownOutput, MarkdownError> {
    let options = markdown_options(markdown_config)?;
    let parser = Parser::new_ext(markdown, options);

    let mut in_heading: Option<HeadingState> = None;
    let mut used_heading_ids: HashSet<String> = HashSet::new();
    let mut toc_entries: Vec<TocEntry> = Vec::new();

    let events: Vec<Event> = parser
        .flat_map(|event| match event {
            Event::Start(Tag::Heading {
                level,
                ref id,
                ref classes,
                ref attrs,
            }) => {
                if let Some(existing_id) = id {
                    used_heading_ids.insert(existing_id.to_string());
                    return vec![event];
                }
                in_heading = Some(HeadingState {
                    level,
                    classes: classes.iter().map(|c| c.to_string()).collect(),
                    attrs: attrs
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.as_ref().map(|v| v.to_string())))
                        .collect(),
                    html: String::new(),
                    text: String::new(),
                });
                vec![]
            }
            Event::End(TagEnd::Heading(_)) if in_heading.is_some() => {
                let Some(state) = in_heading.take() else {
                    return vec![event];
                };

                let base_id = match slugify(&state.text) {
                    id if id.is_empty() => "section".to_string(),
                    id => id,
                };
                let mut id = base_id.clone();
                let mut suffix = 1;
                while used_heading_ids.contains(&id) {
                    id = format!("{base_id}-{suffix}");
                    suffix += 1;
                }
                used_heading_ids.insert(id.clone());

                toc_entries.push(TocEntry {
                    text: state.text.clone(),
                    id: id.clone(),
                    level: state.level as u8,
                });

                let class_attr = if state.classes.is_empty() {
                    String::new()
                } else {
                    format!(" class=\"{}\"", escape_html(&state.classes.join(" ")))
                };
                let extra_attrs = state
                    .attrs
                    .iter()
                    .map(|(k, v)| match v {
                        Some(val) => format!(" {}=\"{}\"", k, escape_html(val)),
                        None => format!(" {k}"),
                    })
                    .collect::<String>();

                let level = state.level as usize;
                vec![Event::Html(
                    format!(
                        "<h{level} id=\"{id}\"{class_attr}{extra_attrs}>{} <a class=\"header-anchor\" href=\"#{id}\" aria-label=\"Link to this heading\">#</a></h{level}>\n",
                        state.html,
                    )
                    .into(),
                )]
            }
            Event::Text(text) if in_heading.is_some() => {
                if let Some(state) = in_heading.as_mut() {
                    state.text.push_str(&text);
                    state.html.push_str(&escape_html(&text));
                }
                vec![]
            }
            Event::Code(code) if in_heading.is_some() => {
                if let Some(state) = in_heading.as_mut() {
                    state.text.push_str(&code);
                    state.html.push_str(&format!("<code>{}</code>", escape_html(&code)));
                }
                vec![]
            }
            other if in_heading.is_some() => {
                // Other inline markup (emphasis, links) keeps its HTML.
                if let Some(state) = in_heading.as_mut() {
                    html::push_html(&mut state.html, std::iter::once(other));
                }
                vec![]
            }
            _ => vec![event],
        })
        .collect();

    let mut html_output = String::new();
    html::push_html(&mut html_output, events.into_iter());

    Ok(MarkdownOutput {
        html: html_output,
        toc: toc_entries,
    })
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
