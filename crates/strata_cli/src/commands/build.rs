//! Build command - Render documents into final data.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{debug, info};

use strata_templates::{BuildData, BuildOptions};

use super::{OutputOptions, SourceOptions};
use crate::ExitCodes;

#[derive(Args)]
pub struct BuildArgs {
    /// Document file or directory
    path: PathBuf,

    #[command(flatten)]
    source: SourceOptions,

    /// Print a flat list instead of grouping items by category
    #[arg(long)]
    flat: bool,

    #[command(flatten)]
    output: OutputOptions,
}

pub fn execute(args: BuildArgs) -> Result<u8> {
    println!("{}", render(&args)?);
    Ok(ExitCodes::SUCCESS)
}

pub fn render(args: &BuildArgs) -> Result<String> {
    info!("Building {}", args.path.display());

    let builder = args.source.builder(&args.path)?;
    let options = BuildOptions::new().group_by_category(!args.flat);
    let build = builder
        .build_with(options)
        .with_context(|| format!("Failed to build {}", args.path.display()))?;

    for (template, count) in items_per_template(build.data()) {
        debug!("Template '{}' produced {} item(s)", template, count);
    }

    args.output.render(build.data())
}

/// Rendered item count per template, ordered by template name.
fn items_per_template(data: &BuildData) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for item in data.items() {
        *counts.entry(item.identity.template()).or_insert(0) += 1;
    }
    counts
}
