//! Roq: a static site engine.
//!
//! A site is scanned into a content model (pages, collections, layouts and
//! data), enriched with derived content (tag collections, series, aliases and
//! paginated listings), resolved to URLs, and generated into an output tree.
//! [`build::Builder`] drives the whole run.

pub mod build;
pub mod config;
pub mod util;
