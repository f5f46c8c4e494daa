//! Content derived from the base site: tag collections and tagging pages,
//! series groupings, and alias redirects.
//!
//! Derivation runs after the site is assembled. Tags run before link
//! resolution (tag pages need URLs); aliases run after it (aliases are
//! resolved against the page they point to).

mod aliases;
mod series;
mod tags;

pub use aliases::{alias_texts, register_aliases};
pub use series::{SeriesEntry, collect_series, series_label};
pub use tags::{derive_tags, parse_tags, tag_collection_id};
