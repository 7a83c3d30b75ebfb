//! Focused unit tests covering import CLI configuration and wiring.

use super::*;
use clap::Parser as _;
use rstest::rstest;
use std::fs::{self, File};
use tempfile::TempDir;

#[rstest]
fn parses_minimum_arguments() {
    let cli = Cli::try_parse_from([
        "regionmap",
        "import",
        "--database",
        "boundaries.db",
        "--source",
        "tiger/tl_2010_53_county10.shp",
    ])
    .expect("arguments should parse");
    let Command::Import(args) = cli.command;
    assert_eq!(args.database.as_deref(), Some(camino::Utf8Path::new("boundaries.db")));
    assert_eq!(
        args.source.as_deref(),
        Some(&[PathBuf::from("tiger/tl_2010_53_county10.shp")][..])
    );
    assert_eq!(args.tolerance, None);
}

#[rstest]
fn repeated_sources_accumulate_in_order() {
    let cli = Cli::try_parse_from([
        "regionmap",
        "import",
        "--database",
        "boundaries.db",
        "--source",
        "a.shp",
        "--source",
        "b.shp",
        "--tolerance",
        "0.05",
    ])
    .expect("arguments should parse");
    let Command::Import(args) = cli.command;
    assert_eq!(
        args.source.as_deref(),
        Some(&[PathBuf::from("a.shp"), PathBuf::from("b.shp")][..])
    );
    assert_eq!(args.tolerance, Some(0.05));
}

#[rstest]
fn rejects_unknown_subcommand() {
    let outcome = Cli::try_parse_from(["regionmap", "export"]);
    assert!(outcome.is_err(), "parser should reject unknown subcommands");
}

#[rstest]
fn converting_without_database_errors() {
    let args = ImportArgs {
        source: Some(vec![PathBuf::from("a.shp")]),
        ..ImportArgs::default()
    };
    let err = ImportConfig::try_from(args).expect_err("missing database should error");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_DATABASE);
            assert_eq!(env, ENV_DATABASE);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn converting_without_sources_errors() {
    let args = ImportArgs {
        database: Some(Utf8PathBuf::from("boundaries.db")),
        ..ImportArgs::default()
    };
    let err = ImportConfig::try_from(args).expect_err("missing sources should error");
    assert!(matches!(
        err,
        CliError::MissingArgument {
            field: ARG_SOURCE,
            ..
        }
    ));
}

#[rstest]
fn conversion_applies_default_tolerance() {
    let args = ImportArgs {
        database: Some(Utf8PathBuf::from("boundaries.db")),
        source: Some(vec![PathBuf::from("a.shp")]),
        tolerance: None,
    };
    let config = ImportConfig::try_from(args).expect("conversion succeeds");
    assert_eq!(config.tolerance, regionmap_core::DEFAULT_TOLERANCE);
}

#[rstest]
fn import_with_no_boundary_files_errors() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("notes.txt"), b"not a boundary file").expect("write file");
    let config = ImportConfig {
        database: Utf8PathBuf::from_path_buf(dir.path().join("out.db")).expect("utf-8 path"),
        sources: vec![dir.path().to_path_buf()],
        tolerance: regionmap_core::DEFAULT_TOLERANCE,
    };
    let err = execute_import(&config).expect_err("no boundary files should error");
    assert!(matches!(err, CliError::NoBoundaryFiles));
}

#[rstest]
fn import_reports_missing_source_path() {
    let dir = TempDir::new().expect("tempdir");
    let config = ImportConfig {
        database: Utf8PathBuf::from_path_buf(dir.path().join("out.db")).expect("utf-8 path"),
        sources: vec![dir.path().join("absent.shp")],
        tolerance: regionmap_core::DEFAULT_TOLERANCE,
    };
    let err = execute_import(&config).expect_err("missing source should error");
    assert!(matches!(err, CliError::Sources(_)));
}

#[rstest]
fn import_rejects_negative_tolerance() {
    let dir = TempDir::new().expect("tempdir");
    File::create(dir.path().join("empty.shp")).expect("create placeholder file");
    let config = ImportConfig {
        database: Utf8PathBuf::from_path_buf(dir.path().join("out.db")).expect("utf-8 path"),
        sources: vec![dir.path().to_path_buf()],
        tolerance: -0.5,
    };
    let err = execute_import(&config).expect_err("negative tolerance should error");
    assert!(matches!(err, CliError::Tolerance(_)));
}
