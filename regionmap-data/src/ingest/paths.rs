//! Input source expansion for ingestion runs.
//!
//! A run names an ordered list of files and directories. Directories are
//! expanded recursively (sorted, so runs are deterministic), boundary files
//! are recognised by their `.shp` extension, and anything else is skipped
//! with a log line rather than an error.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use thiserror::Error;

/// Errors raised while expanding the input source list.
#[derive(Debug, Error)]
pub enum SourceListError {
    /// A named source does not exist.
    #[error("input source {path:?} does not exist")]
    Missing {
        /// The missing path.
        path: PathBuf,
    },
    /// A directory could not be read while recursing.
    #[error("failed to read directory {path:?}")]
    ReadDirectory {
        /// The unreadable directory.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Expand the ordered source list into the boundary files to ingest.
///
/// Caller order is preserved across entries; within a directory, files are
/// visited in sorted order.
///
/// # Examples
/// ```no_run
/// use std::path::PathBuf;
/// use regionmap_data::expand_sources;
///
/// # fn main() -> Result<(), regionmap_data::SourceListError> {
/// let files = expand_sources(&[PathBuf::from("tiger/2010")])?;
/// for file in &files {
///     println!("{}", file.display());
/// }
/// # Ok(())
/// # }
/// ```
pub fn expand_sources(paths: &[PathBuf]) -> Result<Vec<PathBuf>, SourceListError> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            expand_directory(path, &mut files)?;
        } else if path.is_file() {
            consider_file(path.clone(), &mut files);
        } else {
            return Err(SourceListError::Missing { path: path.clone() });
        }
    }
    Ok(files)
}

fn expand_directory(directory: &Path, files: &mut Vec<PathBuf>) -> Result<(), SourceListError> {
    let entries = fs::read_dir(directory).map_err(|source| SourceListError::ReadDirectory {
        path: directory.to_path_buf(),
        source,
    })?;

    let mut children = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| SourceListError::ReadDirectory {
            path: directory.to_path_buf(),
            source,
        })?;
        children.push(entry.path());
    }
    children.sort();

    for child in children {
        if child.is_dir() {
            expand_directory(&child, files)?;
        } else {
            consider_file(child, files);
        }
    }
    Ok(())
}

fn consider_file(path: PathBuf, files: &mut Vec<PathBuf>) {
    let is_boundary_file = path
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("shp"));
    if is_boundary_file {
        files.push(path);
    } else {
        debug!("skipping {}", path.display());
    }
}
