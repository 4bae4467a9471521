//! tngrun: a selective TestNG suite runner.
//!
//! This crate decides which TestNG test classes to run, writes the suite
//! document describing that choice, and drives TestNG in a child JVM.
//!
//! # Architecture
//!
//! The main components are:
//!
//! - **Catalog**: Enumerate candidate test classes from the compiled
//!   artifact (jar entries or a class directory)
//! - **Selection**: Pick classes by mode — everything, explicit patterns,
//!   previously failed, or touched by recent changes
//! - **Changes**: Discover changed files from version control, with a
//!   bounded-wait pull-request diff and a branch-diff fallback
//! - **Results**: Read the previous run's TestNG results document
//! - **Suite**: Serialize the selection into a TestNG suite document
//! - **Runner**: Launch TestNG and interpret the outcome
//!
//! # Example
//!
//! ```no_run
//! use tngrun::config::load_config;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = load_config(std::path::Path::new("tngrun.toml"))?;
//! // ... build the catalog, select, write the suite, run ...
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod changes;
pub mod config;
pub mod results;
pub mod runner;
pub mod selection;
pub mod suite;

// Re-export commonly used types
pub use catalog::ClassCatalog;
pub use config::{load_config, Config};
pub use selection::{GroupFilter, Selection, SelectionMode, SelectionOptions, Selector};
pub use suite::SuiteSpec;
