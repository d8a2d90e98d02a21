pub mod ai;
pub mod answers;
pub mod close;
pub mod config;
pub mod decompose;
pub mod document;
pub mod epic;
pub mod error;
pub mod frontmatter;
pub mod io;
pub mod paths;
pub mod prd;
pub mod progress;
pub mod prompt;
pub mod section;
pub mod source;
pub mod sync;
pub mod tracker;
pub mod types;
pub mod validate;
pub mod workflow;

pub use error::{AipmError, Result};
