//! Configuration loading and types for roq.
//!
//! This module handles all aspects of configuration:
//! - Type definitions for config structures (`types`)
//! - Loading configs from files and the environment (`load`)

mod load;
mod types;

pub use load::{DEFAULT_CONFIG_FILE, base_path_from_config};

// Re-export all types for convenient access
pub use types::{
    CharReplacement, CollectionConfig, MarkdownConfig, OutputConfig, RoqConfig, SiteConfig,
    Strictness, default_date_format, default_ignored_files,
};

// =============================================================================
// Errors
// =============================================================================

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("failed to get current working directory: {0}")]
    CwdFailure(std::io::Error),

    #[error("config file not found: {0}")]
    NotFound(std::path::PathBuf),

    #[error("{0}")]
    Validation(String),
}

impl RoqConfig {
    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = std::collections::HashSet::new();
        for collection in &self.collections {
            if collection.id.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "collection ids must not be empty".to_string(),
                ));
            }
            if !seen.insert(collection.id.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate collection id '{}'",
                    collection.id
                )));
            }
        }

        for id in &self.tagging {
            if self.collection(id).is_none() {
                return Err(ConfigError::Validation(format!(
                    "tagging refers to unknown collection '{id}'"
                )));
            }
        }

        if self.site.page_size == 0 {
            return Err(ConfigError::Validation(
                "site.page_size must be at least 1".to_string(),
            ));
        }

        if self.output.io_concurrency == 0 {
            return Err(ConfigError::Validation(
                "output.io_concurrency must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
