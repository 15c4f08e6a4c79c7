//! Error types for template documents.

use std::path::PathBuf;

use strata_templates::TemplateError;
use thiserror::Error;

/// Result type alias for document operations.
pub type DocumentResult<T> = Result<T, DocumentError>;

/// Errors that can occur while loading or materialising documents.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Document not found at path: {0}")]
    NotFound(PathBuf),

    #[error("Unsupported document format: {0} (expected .yaml, .yml, .json or .toml)")]
    UnsupportedFormat(PathBuf),

    #[error("Unknown template '{name}' referenced by '{referenced_by}'")]
    UnknownTemplate { name: String, referenced_by: String },

    #[error("Unknown group '{name}' referenced by '{referenced_by}'")]
    UnknownGroup { name: String, referenced_by: String },

    #[error("Duplicate {kind} '{name}'")]
    DuplicateName { kind: &'static str, name: String },

    #[error("Cannot choose a root group among {}; set 'root' explicitly", .0.join(", "))]
    AmbiguousRoot(Vec<String>),

    #[error("Invalid document {path}: {message}")]
    InvalidFormat { path: PathBuf, message: String },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl DocumentError {
    /// Lift an engine error, turning dangling tree references into the
    /// document-level variants.
    pub fn from_template(err: TemplateError) -> Self {
        match err {
            TemplateError::UnknownNode {
                kind: "template",
                name,
                referenced_by,
            } => DocumentError::UnknownTemplate {
                name,
                referenced_by,
            },
            TemplateError::UnknownNode {
                kind: "group",
                name,
                referenced_by,
            } => DocumentError::UnknownGroup {
                name,
                referenced_by,
            },
            other => DocumentError::Template(other),
        }
    }

    /// The engine error behind this one, if any.
    pub fn as_template_error(&self) -> Option<&TemplateError> {
        match self {
            DocumentError::Template(err) => Some(err),
            _ => None,
        }
    }
}
