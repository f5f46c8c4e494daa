//! Configuration loading from files.
//!
//! The YAML file is layered under `ROQ__*` environment variables, so
//! `ROQ__SITE__FUTURE=true` overrides `site.future`.

use std::path::{Path, PathBuf};

use super::{ConfigError, RoqConfig};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "roq.yaml";

impl RoqConfig {
    /// Load the config from the command line argument, defaulting to `roq.yaml`
    pub fn load_from_arg(config_file: Option<&Path>) -> Result<(Self, PathBuf), ConfigError> {
        let config_file = config_file.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
        let config_file = if config_file.is_relative() {
            std::env::current_dir()
                .map_err(ConfigError::CwdFailure)?
                .join(config_file)
        } else {
            config_file.to_path_buf()
        };

        let config = Self::load_from_file(&config_file)?;
        Ok((config, config_file))
    }

    /// Load the config from a file path, applying environment overrides.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path).format(::config::FileFormat::Yaml))
            .add_source(
                ::config::Environment::with_prefix("ROQ")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: RoqConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

/// Get the base path from a config file path (its parent directory).
pub fn base_path_from_config(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roq.yaml");
        std::fs::write(
            &path,
            "site:\n  root_path: /docs/\n  page_size: 3\ncollections:\n  - id: news\n",
        )
        .unwrap();

        let config = RoqConfig::load_from_file(&path).unwrap();
        assert_eq!(config.site.root_path, "/docs/");
        assert_eq!(config.site.page_size, 3);
        assert_eq!(config.collections[0].id, "news");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = RoqConfig::load_from_file(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_base_path_from_config() {
        assert_eq!(
            base_path_from_config(Path::new("/project/roq.yaml")),
            PathBuf::from("/project")
        );
        assert_eq!(
            base_path_from_config(Path::new("roq.yaml")),
            PathBuf::from("")
        );
    }
}
