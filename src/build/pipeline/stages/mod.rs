//! Default pipeline stages.
//!
//! The standard page processing pipeline consists of:
//!
//! 1. **TeraStage** - Expand template syntax in non-markdown bodies
//! 2. **ContentStage** - Convert the body to HTML with its format
//! 3. **LayoutStage** - Wrap content in the layout chain

mod content;
mod layout;
mod tera;

pub use content::ContentStage;
pub use layout::LayoutStage;
pub use tera::TeraStage;
