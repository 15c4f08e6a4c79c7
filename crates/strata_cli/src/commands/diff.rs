//! Diff command - Compare the builds of two document sets.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use strata_templates::{Build, BuildDiff};

use super::{OutputOptions, SourceOptions};
use crate::ExitCodes;

#[derive(Args)]
pub struct DiffArgs {
    /// Documents of the earlier build
    before: PathBuf,

    /// Documents of the later build
    after: PathBuf,

    #[command(flatten)]
    source: SourceOptions,

    /// Exit with status 1 when the builds differ
    #[arg(long)]
    exit_code: bool,

    #[command(flatten)]
    output: OutputOptions,
}

pub fn execute(args: DiffArgs) -> Result<u8> {
    let diff = compare(&args)?;
    println!("{}", args.output.render(&diff)?);

    if args.exit_code && !diff.is_empty() {
        return Ok(ExitCodes::GENERAL_ERROR);
    }
    Ok(ExitCodes::SUCCESS)
}

pub fn compare(args: &DiffArgs) -> Result<BuildDiff> {
    let before = build(&args.source, &args.before)?;
    let after = build(&args.source, &args.after)?;
    let diff = before.diff(&after);

    info!(
        "{} added, {} removed, {} changed",
        diff.added.len(),
        diff.removed.len(),
        diff.changed.len()
    );
    Ok(diff)
}

fn build(source: &SourceOptions, path: &Path) -> Result<Build> {
    source
        .builder(path)?
        .build()
        .with_context(|| format!("Failed to build {}", path.display()))
}
