//! Error types for template composition.

use thiserror::Error;

/// Result type alias for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors that can occur while assembling or rendering a build.
///
/// Every error aborts the whole build; there is no partial result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{kind} cycle detected: {}", .chain.join(" -> "))]
    Cycle {
        kind: &'static str,
        chain: Vec<String>,
    },

    #[error("Variable '{variable}' referenced by {referenced_by}{} is not defined", in_template(.template))]
    MissingVariable {
        variable: String,
        referenced_by: String,
        template: Option<String>,
    },

    #[error("Required variable '{variable}'{}{} has no value", in_template(.template), in_group(.group))]
    RequiredVariableUnresolved {
        variable: String,
        template: Option<String>,
        group: Option<String>,
    },

    #[error("Unknown {kind} '{name}' referenced by '{referenced_by}'")]
    UnknownNode {
        kind: &'static str,
        name: String,
        referenced_by: String,
    },
}

impl TemplateError {
    /// Names involved in a cycle, empty for any other error.
    pub fn cycle_chain(&self) -> &[String] {
        match self {
            TemplateError::Cycle { chain, .. } => chain,
            _ => &[],
        }
    }
}

fn in_template(template: &Option<String>) -> String {
    template
        .as_ref()
        .map(|t| format!(" in template '{}'", t))
        .unwrap_or_default()
}

fn in_group(group: &Option<String>) -> String {
    group
        .as_ref()
        .map(|g| format!(" in group '{}'", g))
        .unwrap_or_default()
}
