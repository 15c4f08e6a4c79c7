//! # strata_documents
//!
//! Template documents for Strata.
//!
//! Documents are YAML, JSON or TOML files declaring templates, groups, the
//! root group to build from, user templates and user variables. Templates
//! and groups may refer to each other by name; references are checked for
//! cycles before anything is handed to the engine.
//!
//! ## Example
//!
//! ```rust,no_run
//! use strata_documents::DocumentLoader;
//!
//! let set = DocumentLoader::load("templates").unwrap();
//! let build = set.into_builder().unwrap().build().unwrap();
//! println!("{}", serde_json::to_string_pretty(build.data()).unwrap());
//! ```

pub mod catalog;
pub mod document;
pub mod error;
pub mod loader;

pub use catalog::DocumentSet;
pub use document::{
    DocumentFile, GroupDocument, GroupRef, ItemDocument, TemplateDocument, TemplateRef,
    VariableDocument,
};
pub use error::{DocumentError, DocumentResult};
pub use loader::{DocumentFormat, DocumentLoader};
