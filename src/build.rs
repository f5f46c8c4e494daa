mod builder;
pub mod cache;
pub mod data;
pub mod date;
pub mod derive;
pub mod document;
mod error;
pub mod exclude;
pub mod format;
pub mod generated;
pub mod layout;
pub mod link;
mod markdown;
pub mod output;
pub mod paginate;
pub mod pipeline;
pub mod render;
pub mod search;
pub mod site;
pub mod source;
#[cfg(test)]
mod testing;
pub mod write;

pub use builder::{BuildResult, Builder, ScannedSite};
pub use error::{Diagnostics, RoqError};
pub use markdown::{MarkdownError, MarkdownOutput, TocEntry, render_markdown};
