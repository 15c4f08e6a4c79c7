//! Structure command - Show the merged view before substitution.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use super::{OutputOptions, SourceOptions};
use crate::ExitCodes;

#[derive(Args)]
pub struct StructureArgs {
    /// Document file or directory
    path: PathBuf,

    #[command(flatten)]
    source: SourceOptions,

    /// Only list the categories of the merged templates
    #[arg(long)]
    categories: bool,

    #[command(flatten)]
    output: OutputOptions,
}

pub fn execute(args: StructureArgs) -> Result<u8> {
    println!("{}", render(&args)?);
    Ok(ExitCodes::SUCCESS)
}

pub fn render(args: &StructureArgs) -> Result<String> {
    info!("Assembling structure of {}", args.path.display());

    let builder = args.source.builder(&args.path)?;

    if args.categories {
        let categories = builder
            .categories()
            .with_context(|| format!("Failed to assemble {}", args.path.display()))?;
        return args.output.render(&categories);
    }

    let structure = builder
        .structure()
        .with_context(|| format!("Failed to assemble {}", args.path.display()))?;
    args.output.render(&structure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::OutputFormat;
    use std::fs;
    use tempfile::tempdir;

    fn args(path: PathBuf, categories: bool) -> StructureArgs {
        StructureArgs {
            path,
            source: SourceOptions::default(),
            categories,
            output: OutputOptions {
                format: OutputFormat::Json,
            },
        }
    }

    #[test]
    fn test_structure_keeps_placeholders() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("site.yaml");
        fs::write(
            &path,
            r#"
templates:
  - name: web
    category: http
    variables: [{ name: host, value: example.org }]
    items: [{ value: { url: "https://{host}" } }]
  - name: mail
    items: [{ value: { mx: "mail.example.org" } }]
"#,
        )
        .unwrap();

        let output = render(&args(path.clone(), false)).unwrap();
        let structure: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(structure["items"][0]["value"]["url"], "https://{host}");
        assert_eq!(structure["variables"][0]["name"], "host");

        let output = render(&args(path, true)).unwrap();
        let categories: Vec<String> = serde_json::from_str(&output).unwrap();
        assert_eq!(categories, vec!["http", "default"]);
    }
}
