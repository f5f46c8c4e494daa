//! Glob-based exclusion of source files.
//!
//! Patterns are evaluated against the path relative to the site root, using
//! forward slashes on every platform:
//!
//! | Pattern | Matches |
//! |---------|---------|
//! | `assets/**` | everything under `assets/` at the root |
//! | `**.DS_Store` | any `.DS_Store`, at any depth |
//! | `**node_modules/**` | anything inside any `node_modules` directory |
//! | `*.tmp` | `.tmp` files directly under the root |
//! | `**/.*` | hidden files at any depth (including the root) |
//!
//! `**` crosses directory separators, `*` and `?` do not. `{a,b}` and
//! `[abc]` / `[!abc]` work as in shell globs.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::util::to_slash;

#[derive(thiserror::Error, Debug)]
pub enum ExcludeError {
    #[error("invalid glob pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("{path} is not inside the site root {root}")]
    NotDescendant { path: PathBuf, root: PathBuf },
}

#[derive(Debug, Clone)]
struct GlobPattern {
    source: String,
    regex: Regex,
}

/// A compiled set of exclusion patterns, OR-combined.
#[derive(Debug, Clone)]
pub struct ExclusionMatcher {
    root: PathBuf,
    patterns: Vec<GlobPattern>,
}

impl ExclusionMatcher {
    /// Compile `patterns` relative to `root`.
    pub fn new(root: impl Into<PathBuf>, patterns: &[String]) -> Result<Self, ExcludeError> {
        let patterns = patterns
            .iter()
            .map(|pattern| {
                let expr = glob_to_regex(pattern)?;
                let regex = Regex::new(&expr).map_err(|e| ExcludeError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?;
                Ok(GlobPattern {
                    source: pattern.clone(),
                    regex,
                })
            })
            .collect::<Result<Vec<_>, ExcludeError>>()?;

        Ok(Self {
            root: root.into(),
            patterns,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns true if any pattern matches `path`.
    ///
    /// Fails if `path` is not the root or one of its descendants.
    pub fn is_excluded(&self, path: &Path) -> Result<bool, ExcludeError> {
        let relative = path
            .strip_prefix(&self.root)
            .map_err(|_| ExcludeError::NotDescendant {
                path: path.to_path_buf(),
                root: self.root.clone(),
            })?;
        let relative = to_slash(relative);

        Ok(self.patterns.iter().any(|p| p.regex.is_match(&relative)))
    }

    /// The first pattern matching `path`, if any.
    pub fn matching_pattern(&self, path: &Path) -> Option<&str> {
        let relative = to_slash(path.strip_prefix(&self.root).ok()?);
        self.patterns
            .iter()
            .find(|p| p.regex.is_match(&relative))
            .map(|p| p.source.as_str())
    }
}

/// Build an exclusion predicate for `site_root`.
pub fn is_excluded(
    site_root: &Path,
    patterns: &[String],
) -> Result<impl Fn(&Path) -> Result<bool, ExcludeError> + Send + Sync + use<>, ExcludeError> {
    let matcher = ExclusionMatcher::new(site_root, patterns)?;
    Ok(move |path: &Path| matcher.is_excluded(path))
}

/// Translate a glob into an anchored regular expression.
fn glob_to_regex(pattern: &str) -> Result<String, ExcludeError> {
    let invalid = |reason: &str| ExcludeError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    };

    let mut expr = String::with_capacity(pattern.len() * 2 + 2);
    expr.push('^');

    let mut chars = pattern.chars().peekable();
    let mut in_group = false;

    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    if chars.peek() == Some(&'/') {
                        // `**/` also matches zero directories
                        chars.next();
                        expr.push_str("(?:.*/)?");
                    } else {
                        expr.push_str(".*");
                    }
                } else {
                    expr.push_str("[^/]*");
                }
            }
            '?' => expr.push_str("[^/]"),
            '{' => {
                if in_group {
                    return Err(invalid("nested groups are not supported"));
                }
                in_group = true;
                expr.push_str("(?:");
            }
            '}' if in_group => {
                in_group = false;
                expr.push(')');
            }
            ',' if in_group => expr.push('|'),
            '[' => {
                expr.push('[');
                if chars.peek() == Some(&'!') {
                    chars.next();
                    expr.push('^');
                }
                let mut closed = false;
                for c in chars.by_ref() {
                    match c {
                        ']' => {
                            closed = true;
                            break;
                        }
                        '\\' | '[' | '^' => {
                            expr.push('\\');
                            expr.push(c);
                        }
                        _ => expr.push(c),
                    }
                }
                if !closed {
                    return Err(invalid("unclosed character class"));
                }
                expr.push(']');
            }
            '\\' => {
                let escaped = chars.next().ok_or_else(|| invalid("dangling escape"))?;
                expr.push_str(&regex::escape(&escaped.to_string()));
            }
            _ => expr.push_str(&regex::escape(&c.to_string())),
        }
    }

    if in_group {
        return Err(invalid("unclosed group"));
    }

    expr.push('$');
    Ok(expr)
}
