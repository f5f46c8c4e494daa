//! Build errors and the diagnostics collector.
//!
//! Every failure that reaches the caller is a [`RoqError`]. Per-file errors go
//! through [`Diagnostics`], which applies the configured [`Strictness`]:
//! abort on first error, aggregate and fail at the end, or downgrade tolerable
//! errors to warnings.

use std::path::PathBuf;

use parking_lot::Mutex;

use crate::config::Strictness;

#[derive(thiserror::Error, Debug)]
pub enum RoqError {
    #[error("failed to scan {path}: {source}")]
    Scanning {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid front matter in {path}: {message}")]
    FrontMatterReading { path: PathBuf, message: String },

    #[error("layout '{layout}' used by {page} does not exist")]
    LayoutNotFound { layout: String, page: String },

    #[error("layout cycle for {page}: {}", chain.join(" -> "))]
    LayoutCycle { page: String, chain: Vec<String> },

    #[error("output path {path} is produced by both {first} and {second}")]
    PathConflict {
        path: PathBuf,
        first: String,
        second: String,
    },

    #[error("data '{key}' does not match its mapping: {message}")]
    DataMappingMismatch { key: String, message: String },

    #[error("{plugin} failed: {message}")]
    Plugin {
        plugin: &'static str,
        message: String,
    },

    #[error("failed to render {page}: {message}")]
    Render { page: String, message: String },

    #[error("failed to write {target} (from {origin}): {error}")]
    Write {
        origin: String,
        target: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{} errors during build:\n{}", .0.len(), format_errors(.0))]
    Aggregate(Vec<RoqError>),
}

fn format_errors(errors: &[RoqError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl RoqError {
    /// Create a derivation (tags, series, aliases, sitemap) error.
    pub fn plugin(plugin: &'static str, message: impl Into<String>) -> Self {
        Self::Plugin {
            plugin,
            message: message.into(),
        }
    }

    /// Errors that abort the run regardless of strictness.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RoqError::Scanning { .. }
                | RoqError::PathConflict { .. }
                | RoqError::Config(_)
                | RoqError::Aggregate(_)
        )
    }

    /// Errors a lenient run may log and skip.
    pub fn is_tolerable(&self) -> bool {
        matches!(
            self,
            RoqError::FrontMatterReading { .. }
                | RoqError::Plugin { .. }
                | RoqError::LayoutNotFound { .. }
                | RoqError::LayoutCycle { .. }
        )
    }
}

impl From<crate::config::ConfigError> for RoqError {
    fn from(e: crate::config::ConfigError) -> Self {
        RoqError::Config(e.to_string())
    }
}

/// Collects per-file errors for one build run.
#[derive(Debug)]
pub struct Diagnostics {
    strictness: Strictness,
    errors: Mutex<Vec<RoqError>>,
}

impl Diagnostics {
    pub fn new(strictness: Strictness) -> Self {
        Self {
            strictness,
            errors: Mutex::new(Vec::new()),
        }
    }

    pub fn strictness(&self) -> Strictness {
        self.strictness
    }

    /// Report an error. Returns `Err` when the run must stop now.
    pub fn report(&self, err: RoqError) -> Result<(), RoqError> {
        if err.is_fatal() {
            tracing::error!("{err}");
            return Err(err);
        }

        match self.strictness {
            Strictness::FailFast => {
                tracing::error!("{err}");
                Err(err)
            }
            Strictness::Lenient if err.is_tolerable() => {
                tracing::warn!("skipping: {err}");
                Ok(())
            }
            Strictness::Collect | Strictness::Lenient => {
                tracing::error!("{err}");
                self.errors.lock().push(err);
                Ok(())
            }
        }
    }

    /// Record an error that only drops the offending page.
    pub fn skip(&self, err: RoqError) {
        tracing::warn!("skipping: {err}");
    }

    pub fn error_count(&self) -> usize {
        self.errors.lock().len()
    }

    /// Finish the run: fail if any errors were collected.
    pub fn finish(self) -> Result<(), RoqError> {
        let mut errors = self.errors.into_inner();
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(RoqError::Aggregate(errors)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn front_matter_error() -> RoqError {
        RoqError::FrontMatterReading {
            path: PathBuf::from("content/bad.md"),
            message: "not a mapping".to_string(),
        }
    }

    fn render_error() -> RoqError {
        RoqError::Render {
            page: "index.html".to_string(),
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_fail_fast_returns_first_error() {
        let diagnostics = Diagnostics::new(Strictness::FailFast);
        assert!(diagnostics.report(front_matter_error()).is_err());
    }

    #[test]
    fn test_collect_aggregates() {
        let diagnostics = Diagnostics::new(Strictness::Collect);
        diagnostics.report(front_matter_error()).unwrap();
        diagnostics.report(render_error()).unwrap();
        assert_eq!(diagnostics.error_count(), 2);

        match diagnostics.finish() {
            Err(RoqError::Aggregate(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected aggregate, got {other:?}"),
        }
    }

    #[test]
    fn test_lenient_tolerates_front_matter_but_not_render() {
        let diagnostics = Diagnostics::new(Strictness::Lenient);
        diagnostics.report(front_matter_error()).unwrap();
        assert_eq!(diagnostics.error_count(), 0);

        diagnostics.report(render_error()).unwrap();
        assert!(matches!(diagnostics.finish(), Err(RoqError::Render { .. })));
    }

    #[test]
    fn test_path_conflict_is_always_fatal() {
        let diagnostics = Diagnostics::new(Strictness::Lenient);
        let err = RoqError::PathConflict {
            path: PathBuf::from("_site/a/index.html"),
            first: "content/a.md".to_string(),
            second: "content/a.html".to_string(),
        };
        assert!(diagnostics.report(err).is_err());
    }

    #[test]
    fn test_aggregate_message_lists_errors() {
        let err = RoqError::Aggregate(vec![front_matter_error(), render_error()]);
        let message = err.to_string();
        assert!(message.starts_with("2 errors during build"));
        assert!(message.contains("content/bad.md"));
        assert!(message.contains("boom"));
    }
}
