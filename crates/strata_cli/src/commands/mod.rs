//! CLI command definitions.
//!
//! Every command reads a document file or directory, applies the shared
//! `--var` and `--root` options, and prints its result as JSON or YAML on
//! stdout.

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use strata_documents::{DocumentLoader, DocumentSet, VariableDocument};
use strata_templates::{Name, Scalar, TemplateBuilder};

pub mod build;
pub mod diff;
pub mod inspect;
pub mod structure;

/// Strata - composable configuration templates
#[derive(Parser)]
#[command(name = "strata")]
#[command(version, about = "Strata - composable configuration templates")]
#[command(long_about = r#"
Strata builds configuration data from composable templates. Templates hold
items and variables; `{name}` placeholders in items are filled from the
merged variables of templates, groups and the command line.

COMMANDS:
  build      → Render the final data, grouped by category
  structure  → Show the merged templates, items and variables before substitution
  inspect    → Trace every output element back to its template, group and variables
  diff       → Compare the builds of two document sets

EXIT CODES:
  0 - Success
  1 - General error (or differences found with `diff --exit-code`)
  2 - Invalid arguments or missing documents
  3 - Configuration error
  4 - Template error (cycle, missing or required variable)
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the documents and print the rendered data
    Build(build::BuildArgs),

    /// Print the merged structure without substituting variables
    Structure(structure::StructureArgs),

    /// Print where every output element comes from
    Inspect(inspect::InspectArgs),

    /// Print the differences between two builds
    Diff(diff::DiffArgs),
}

/// Options shared by every command that loads documents.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceOptions {
    /// Set a user variable, overriding template and group values (repeatable)
    #[arg(
        long = "var",
        value_name = "NAME=VALUE",
        value_parser = parse_var,
        env = "STRATA_VARS",
        value_delimiter = ','
    )]
    pub vars: Vec<VariableDocument>,

    /// Group to build from, overriding the documents' root
    #[arg(long)]
    pub root: Option<String>,
}

impl SourceOptions {
    /// Load documents and apply the command-line overrides.
    pub fn load(&self, path: &Path) -> Result<DocumentSet> {
        let mut set = DocumentLoader::load(path)
            .with_context(|| format!("Failed to load documents from {}", path.display()))?;

        if let Some(root) = &self.root {
            set.set_root(root.clone());
        }
        for variable in &self.vars {
            set.add_user_variable(variable.clone());
        }

        Ok(set)
    }

    pub fn builder(&self, path: &Path) -> Result<TemplateBuilder> {
        self.load(path)?
            .into_builder()
            .with_context(|| format!("Invalid documents in {}", path.display()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

#[derive(Args, Debug, Clone, Default)]
pub struct OutputOptions {
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

impl OutputOptions {
    pub fn render<T: Serialize>(&self, value: &T) -> Result<String> {
        let text = match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(value)?,
            OutputFormat::Yaml => serde_yaml::to_string(value)?,
        };
        Ok(text.trim_end().to_string())
    }
}

/// Parse a `NAME=VALUE` pair. The value may itself contain `=`.
pub fn parse_var(raw: &str) -> Result<VariableDocument, String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("invalid variable '{}': expected NAME=VALUE", raw))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(format!("invalid variable '{}': empty name", raw));
    }

    Ok(VariableDocument {
        name: Name::from(name),
        value: Some(Scalar::from(value)),
        required: false,
        description: None,
    })
}
