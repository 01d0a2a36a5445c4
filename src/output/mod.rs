//! Output formatters for duplicate scan results.
//!
//! - Text for people
//! - JSON for automation and scripting
//!
//! # Example
//!
//! ```no_run
//! use dedupify::duplicates::DuplicateFinder;
//! use dedupify::output::json::JsonOutput;
//! use std::path::PathBuf;
//!
//! let finder = DuplicateFinder::with_defaults();
//! let (groups, summary) = finder.find_duplicates(&[PathBuf::from(".")]).unwrap();
//!
//! let output = JsonOutput::new(&groups, Some(&summary));
//! println!("{}", output.to_json_pretty().unwrap());
//! ```

pub mod json;
pub mod text;

// Re-export main types
pub use json::{JsonOutput, JsonOutputError};
pub use text::{write_disposal, TextOutput};
