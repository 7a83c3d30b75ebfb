//! Command-line interface for regionmap's offline import tooling.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, sync::Arc};
use thiserror::Error;

use camino::Utf8PathBuf;
use regionmap_core::SimplifyError;
use regionmap_data::{
    IngestError, IngestPipeline, IngestReport, OpenSinkError, PipelineConfig, SourceListError,
    SqliteRegionSink, expand_sources, ingest_shapefile,
};

const ARG_DATABASE: &str = "database";
const ARG_SOURCE: &str = "source";
const ENV_DATABASE: &str = "REGIONMAP_CMDS_IMPORT_DATABASE";
const ENV_SOURCE: &str = "REGIONMAP_CMDS_IMPORT_SOURCE";

/// Run the regionmap CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Import(args) => {
            let report = run_import(args)?;
            report_outcome(&report);
        }
    }
    Ok(())
}

fn run_import(args: ImportArgs) -> Result<IngestReport, CliError> {
    let config = args.into_config()?;
    execute_import(&config)
}

fn execute_import(config: &ImportConfig) -> Result<IngestReport, CliError> {
    let files = expand_sources(&config.sources)?;
    if files.is_empty() {
        return Err(CliError::NoBoundaryFiles);
    }

    let mut sink = SqliteRegionSink::open(&config.database)?;
    let mut pipeline =
        IngestPipeline::new(&mut sink, &PipelineConfig::with_tolerance(config.tolerance))?;
    for file in &files {
        ingest_shapefile(file, &mut pipeline)?;
    }
    Ok(pipeline.finish()?)
}

fn report_outcome(report: &IngestReport) {
    println!(
        "Imported {} regions, {} parts ({}/{} points kept)",
        report.summary.regions,
        report.summary.parts,
        report.summary.points_kept,
        report.summary.points_read
    );
    if report.summary.rejected > 0 {
        println!("Skipped {} malformed records (see log)", report.summary.rejected);
    }
    if !report.finalise.regions_without_parts.is_empty() {
        println!(
            "Warning: {} regions finished without parts (see log)",
            report.finalise.regions_without_parts.len()
        );
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "regionmap",
    about = "Offline boundary import utilities for the regionmap store",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Import boundary files into a regionmap SQLite store.
    Import(ImportArgs),
}

/// CLI arguments for the `import` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Import boundary files into the destination store. Inputs \
                 can come from CLI flags, configuration files, or \
                 environment variables; a fresh run replaces the store's \
                 previous contents.",
    about = "Import boundary files into a regionmap SQLite store"
)]
#[ortho_config(prefix = "REGIONMAP")]
struct ImportArgs {
    /// Destination SQLite database for the imported boundaries.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    database: Option<Utf8PathBuf>,
    /// Boundary file or directory to import; repeat to import several in
    /// order.
    #[arg(long = ARG_SOURCE, value_name = "path")]
    #[serde(default)]
    source: Option<Vec<PathBuf>>,
    /// Collinearity tolerance in coordinate units; zero keeps every point.
    #[arg(long, value_name = "epsilon")]
    #[serde(default)]
    tolerance: Option<f64>,
}

impl ImportArgs {
    fn into_config(self) -> Result<ImportConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ImportConfig::try_from(merged)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ImportConfig {
    database: Utf8PathBuf,
    sources: Vec<PathBuf>,
    tolerance: f64,
}

impl TryFrom<ImportArgs> for ImportConfig {
    type Error = CliError;

    fn try_from(args: ImportArgs) -> Result<Self, Self::Error> {
        let database = args.database.ok_or(CliError::MissingArgument {
            field: ARG_DATABASE,
            env: ENV_DATABASE,
        })?;
        let sources = args.source.unwrap_or_default();
        if sources.is_empty() {
            return Err(CliError::MissingArgument {
                field: ARG_SOURCE,
                env: ENV_SOURCE,
            });
        }
        Ok(Self {
            database,
            sources,
            tolerance: args.tolerance.unwrap_or(regionmap_core::DEFAULT_TOLERANCE),
        })
    }
}

/// Errors emitted by the regionmap CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// The missing flag.
        field: &'static str,
        /// Environment variable that can supply it instead.
        env: &'static str,
    },
    /// The source list expanded to no boundary files at all.
    #[error("no boundary files found in the given sources")]
    NoBoundaryFiles,
    /// The tolerance was rejected by the simplifier.
    #[error(transparent)]
    Tolerance(#[from] SimplifyError),
    /// Expanding the source list failed.
    #[error(transparent)]
    Sources(#[from] SourceListError),
    /// Opening the destination store failed.
    #[error(transparent)]
    Store(#[from] OpenSinkError),
    /// The ingestion run failed.
    #[error(transparent)]
    Ingest(#[from] IngestError),
}

#[cfg(test)]
mod tests;
