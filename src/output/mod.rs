//! Report formatters for finished runs.
//!
//! - [`text`]: human-readable summary
//! - [`json`]: machine-readable report with per-file records
//!
//! # Example
//!
//! ```no_run
//! use rustdedup::duplicates::{DuplicateFinder, FinderConfig};
//! use rustdedup::index::HashIndex;
//! use rustdedup::output::TextOutput;
//! use rustdedup::scanner::HashAlgorithm;
//! use std::path::Path;
//!
//! let mut index = HashIndex::in_memory(HashAlgorithm::preferred());
//! let report = DuplicateFinder::with_defaults()
//!     .run(Path::new("."), &mut index)
//!     .unwrap();
//! TextOutput::new(&report).write_to(std::io::stdout()).unwrap();
//! ```

pub mod json;
pub mod text;

pub use json::JsonOutput;
pub use text::TextOutput;
