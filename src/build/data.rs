//! Site data files and their typed mappings.
//!
//! Every `data/<name>.{yaml,yml,json}` file becomes `site.data.<name>`.
//! Callers that need a typed view register a mapping; mappings are checked
//! once when the site is assembled, and a mismatch is a build error rather
//! than a template-time surprise.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use walkdir::WalkDir;

use crate::util::to_slash;

use super::document::FrontMatter;
use super::error::{Diagnostics, RoqError};

type DecodeFn = Arc<dyn Fn(&Value) -> Result<Value, String> + Send + Sync>;

struct DataMapping {
    key: String,
    required: bool,
    decode: DecodeFn,
}

/// Explicit key → type mappings for site data.
#[derive(Default, Clone)]
pub struct DataRegistry {
    mappings: Vec<Arc<DataMapping>>,
}

impl std::fmt::Debug for DataRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.mappings.iter().map(|m| &m.key))
            .finish()
    }
}

impl DataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `site.data.<key>` to decode as `T`.
    ///
    /// The decoded value is re-encoded, so defaults applied by `T`'s
    /// deserializer are visible to templates.
    pub fn register<T>(&mut self, key: impl Into<String>, required: bool) -> &mut Self
    where
        T: DeserializeOwned + Serialize + 'static,
    {
        self.register_with(key, required, |value| {
            let typed: T = serde_json::from_value(value.clone()).map_err(|e| e.to_string())?;
            serde_json::to_value(typed).map_err(|e| e.to_string())
        })
    }

    /// Register a custom decode function for `site.data.<key>`.
    pub fn register_with<F>(&mut self, key: impl Into<String>, required: bool, decode: F) -> &mut Self
    where
        F: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.mappings.push(Arc::new(DataMapping {
            key: key.into(),
            required,
            decode: Arc::new(decode),
        }));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Validate and normalize `data` against every mapping.
    pub fn apply(&self, data: &mut FrontMatter, diagnostics: &Diagnostics) -> Result<(), RoqError> {
        for mapping in &self.mappings {
            let Some(value) = data.get(&mapping.key) else {
                if mapping.required {
                    diagnostics.report(RoqError::DataMappingMismatch {
                        key: mapping.key.clone(),
                        message: "required data is missing".to_string(),
                    })?;
                }
                continue;
            };

            match (mapping.decode)(value) {
                Ok(decoded) => {
                    data.insert(mapping.key.clone(), decoded);
                }
                Err(message) => diagnostics.report(RoqError::DataMappingMismatch {
                    key: mapping.key.clone(),
                    message,
                })?,
            }
        }
        Ok(())
    }
}

/// Load every data file below `dir`, keyed by its path without extension.
pub fn load_data_dir(dir: &Path, diagnostics: &Diagnostics) -> Result<FrontMatter, RoqError> {
    let mut data = FrontMatter::new();
    if !dir.is_dir() {
        return Ok(data);
    }

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| RoqError::Scanning {
            path: e.path().unwrap_or(dir).to_path_buf(),
            source: e.into(),
        })?;
        let path = entry.path();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);
        if !entry.file_type().is_file()
            || !matches!(extension.as_deref(), Some("yaml" | "yml" | "json"))
        {
            continue;
        }

        let text = std::fs::read_to_string(path).map_err(|source| RoqError::Scanning {
            path: path.to_path_buf(),
            source,
        })?;
        let key = to_slash(&path.strip_prefix(dir).unwrap_or(path).with_extension(""));

        match parse_data(&text) {
            Ok(value) => {
                data.insert(key, value);
            }
            Err(message) => diagnostics.report(RoqError::DataMappingMismatch { key, message })?,
        }
    }

    tracing::debug!("loaded {} data file(s)", data.len());
    Ok(data)
}

fn parse_data(text: &str) -> Result<Value, String> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(text).map_err(|e| e.to_string())?;
    serde_json::to_value(yaml).map_err(|e| e.to_string())
}
