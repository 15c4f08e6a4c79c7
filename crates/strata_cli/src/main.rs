//! Strata CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error, or differences found by `diff --exit-code`
//! - 2: Invalid arguments or missing documents
//! - 3: Configuration error in documents or builder setup
//! - 4: Template error (cycle, missing or required variable)

use std::process::ExitCode;

use clap::Parser;
use strata_documents::DocumentError;
use strata_templates::TemplateError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const CONFIGURATION_ERROR: u8 = 3;
    pub const TEMPLATE_ERROR: u8 = 4;
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Build(args) => commands::build::execute(args),
        Commands::Structure(args) => commands::structure::execute(args),
        Commands::Inspect(args) => commands::inspect::execute(args),
        Commands::Diff(args) => commands::diff::execute(args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Logs go to stderr so that stdout only carries command output.
fn init_logging(verbose: bool, quiet: bool) {
    let directives = if verbose {
        "strata=debug,warn"
    } else if quiet {
        "strata=error,error"
    } else {
        "strata=info,warn"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));

    let log_result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if let Some(err) = cause.downcast_ref::<TemplateError>() {
            return template_exit_code(err);
        }
        if let Some(err) = cause.downcast_ref::<DocumentError>() {
            return match err {
                DocumentError::Template(err) => template_exit_code(err),
                DocumentError::NotFound(_) | DocumentError::UnsupportedFormat(_) => {
                    ExitCodes::INVALID_ARGS
                }
                DocumentError::Io(_) => ExitCodes::GENERAL_ERROR,
                _ => ExitCodes::CONFIGURATION_ERROR,
            };
        }
    }
    ExitCodes::GENERAL_ERROR
}

fn template_exit_code(err: &TemplateError) -> u8 {
    match err {
        TemplateError::Configuration(_) => ExitCodes::CONFIGURATION_ERROR,
        _ => ExitCodes::TEMPLATE_ERROR,
    }
}
