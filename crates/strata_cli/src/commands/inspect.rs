//! Inspect command - Trace output elements to their sources.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use strata_templates::BuildOptions;

use super::{OutputOptions, SourceOptions};
use crate::ExitCodes;

#[derive(Args)]
pub struct InspectArgs {
    /// Document file or directory
    path: PathBuf,

    #[command(flatten)]
    source: SourceOptions,

    /// Index elements across the whole build instead of per category
    #[arg(long)]
    flat: bool,

    #[command(flatten)]
    output: OutputOptions,
}

pub fn execute(args: InspectArgs) -> Result<u8> {
    println!("{}", render(&args)?);
    Ok(ExitCodes::SUCCESS)
}

pub fn render(args: &InspectArgs) -> Result<String> {
    info!("Inspecting {}", args.path.display());

    let builder = args.source.builder(&args.path)?;
    let build = builder
        .build_with(BuildOptions::new().group_by_category(!args.flat))
        .with_context(|| format!("Failed to build {}", args.path.display()))?;

    args.output.render(&builder.inspect(&build))
}
