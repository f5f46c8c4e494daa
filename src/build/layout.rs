//! Layouts: tera templates with inheritable front matter.
//!
//! A layout lives at `templates/layouts/<id>.<ext>` and may declare a parent
//! with a `layout` key in its own front matter. Rendering a page wraps its
//! content in each layout of the chain, innermost first.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tera::{Context, Tera};
use walkdir::WalkDir;

use crate::util::to_slash;

use super::document::{FrontMatter, parse_front_matter};
use super::error::{Diagnostics, RoqError};

/// Maximum number of layouts in one chain.
pub const MAX_LAYOUT_DEPTH: usize = 32;

#[derive(Debug, Clone)]
pub struct Layout {
    pub id: String,
    pub source: PathBuf,
    /// Front matter without the `layout` key
    pub data: FrontMatter,
    pub parent: Option<String>,
    pub body: String,
}

/// All layouts of a site, by id.
#[derive(Debug, Clone, Default)]
pub struct Layouts {
    layouts: BTreeMap<String, Layout>,
}

impl Layouts {
    /// Load every layout below `dir`. A missing directory yields no layouts.
    pub fn load(dir: &Path, diagnostics: &Diagnostics) -> Result<Self, RoqError> {
        let mut layouts = Layouts::default();
        if !dir.is_dir() {
            tracing::debug!("no layouts directory at {}", dir.display());
            return Ok(layouts);
        }

        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| RoqError::Scanning {
                path: e.path().unwrap_or(dir).to_path_buf(),
                source: e.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let text = std::fs::read_to_string(path).map_err(|source| RoqError::Scanning {
                path: path.to_path_buf(),
                source,
            })?;
            let relative = path.strip_prefix(dir).unwrap_or(path).with_extension("");
            let id = to_slash(&relative);

            match Layout::parse(id, path.to_path_buf(), &text) {
                Ok(layout) => layouts.insert(layout),
                Err(message) => diagnostics.report(RoqError::FrontMatterReading {
                    path: path.to_path_buf(),
                    message,
                })?,
            }
        }

        tracing::debug!("loaded {} layout(s)", layouts.len());
        Ok(layouts)
    }

    pub fn insert(&mut self, layout: Layout) {
        self.layouts.insert(layout.id.clone(), layout);
    }

    pub fn get(&self, id: &str) -> Option<&Layout> {
        self.layouts.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.layouts.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Layout> {
        self.layouts.values()
    }

    /// The chain of layout ids starting at `id`, innermost first.
    pub fn chain(&self, id: &str, page: &str) -> Result<Vec<String>, RoqError> {
        let mut chain: Vec<String> = Vec::new();
        let mut current = Some(id.to_string());

        while let Some(id) = current {
            if chain.contains(&id) || chain.len() >= MAX_LAYOUT_DEPTH {
                chain.push(id);
                return Err(RoqError::LayoutCycle {
                    page: page.to_string(),
                    chain,
                });
            }

            let layout = self.get(&id).ok_or_else(|| RoqError::LayoutNotFound {
                layout: id.clone(),
                page: page.to_string(),
            })?;
            current = layout.parent.clone();
            chain.push(id);
        }

        Ok(chain)
    }
}

impl Layout {
    fn parse(id: String, source: PathBuf, text: &str) -> Result<Self, String> {
        let parsed = parse_front_matter(text).map_err(|e| e.to_string())?;
        let mut data = parsed.front_matter;
        let parent = match data.remove("layout") {
            Some(Value::String(parent)) if !parent.trim().is_empty() => {
                Some(parent.trim().to_string())
            }
            _ => None,
        };

        Ok(Self {
            id,
            source,
            data,
            parent,
            body: parsed.content,
        })
    }
}

/// Deep-merge `overlay` into `base`. Overlay values win; nested maps merge.
pub fn merge_data(base: &mut FrontMatter, overlay: &FrontMatter) {
    for (key, value) in overlay {
        match (base.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_data(existing, incoming);
            }
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

// =============================================================================
// Rendering
// =============================================================================

/// Renders content through layout chains with tera.
pub struct LayoutRenderer {
    tera: Tera,
}

impl LayoutRenderer {
    pub fn new(layouts: &Layouts) -> Result<Self, RoqError> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        tera.add_raw_templates(layouts.iter().map(|l| (l.id.as_str(), l.body.as_str())))
            .map_err(|e| RoqError::Render {
                page: "layouts".to_string(),
                message: tera_message(&e),
            })?;
        Ok(Self { tera })
    }

    /// Wrap `content` in each layout of `chain`, innermost first.
    pub fn render(
        &self,
        chain: &[String],
        content: String,
        context: &Context,
    ) -> Result<String, tera::Error> {
        let mut content = content;
        for id in chain {
            let mut context = context.clone();
            context.insert("content", &content);
            content = self.tera.render(id, &context)?;
        }
        Ok(content)
    }

    /// Render a standalone template string (page bodies of non-markup sources).
    pub fn render_str(&self, template: &str, context: &Context) -> Result<String, tera::Error> {
        let mut tera = self.tera.clone();
        tera.render_str(template, context)
    }
}

/// Flatten a tera error and its causes into one line.
pub fn tera_message(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
