//! SQLite persistence for ingested regions and boundary parts.
//!
//! One sink instance is one run. Opening the sink prepares the schema and
//! clears the previous run's rows inside a single explicit transaction;
//! [`RegionSink::finalise`] rewrites the denormalised region bounds and
//! commits that transaction. Dropping an unfinalised sink rolls the
//! transaction back, so an aborted run leaves the store exactly as it was
//! before the run started.
#![forbid(unsafe_code)]

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use geo::Coord;
use log::warn;
use rusqlite::{Connection, Error as SqliteError, ErrorCode, params};
use thiserror::Error;

use regionmap_core::{Bounds, FinaliseReport, RegionAttributes, RegionId, RegionSink, SinkError};

use super::points::encode_points;

/// Errors raised while opening the destination store.
#[derive(Debug, Error)]
pub enum OpenSinkError {
    /// Failed to create the parent directory for the database file.
    #[error("failed to create parent directory {path:?}")]
    CreateDirectory {
        /// Path of the directory that could not be created.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path:?}")]
    Open {
        /// Destination database path.
        path: Utf8PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Applying a connection pragma failed.
    #[error("failed to apply SQLite pragma {pragma}")]
    Pragma {
        /// The pragma being applied.
        pragma: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Beginning the run transaction failed.
    #[error("failed to begin run transaction")]
    Begin {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// A schema preparation step failed.
    #[error("failed to execute schema step '{step}'")]
    Schema {
        /// The failing step.
        step: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
}

#[derive(Debug, PartialEq, Eq)]
enum SinkState {
    Accumulating,
    Finalised,
}

/// [`RegionSink`] backed by a SQLite database on disk.
///
/// # Examples
/// ```no_run
/// use camino::Utf8Path;
/// use geo::Coord;
/// use regionmap_core::{Bounds, RegionAttributes, RegionSink};
/// use regionmap_data::SqliteRegionSink;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut sink = SqliteRegionSink::open(Utf8Path::new("boundaries.db"))?;
/// let region = sink.region(&RegionAttributes::new("53033")?)?;
/// sink.part(
///     region,
///     Bounds::seeded(0.0, 0.0, 1.0, 1.0),
///     &[Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 }],
/// )?;
/// let report = sink.finalise()?;
/// assert_eq!(report.regions, 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SqliteRegionSink {
    connection: Connection,
    state: SinkState,
    regions: u64,
    parts: u64,
}

impl SqliteRegionSink {
    /// Open (or create) the destination store and start a fresh run.
    ///
    /// The parent directory is created if missing. Schema creation and the
    /// clearing of any previous run's rows happen inside the run
    /// transaction, so a failed run never destroys existing data. The
    /// original importer's bulk-load pragmas (`synchronous = OFF`,
    /// `journal_mode = MEMORY`) are applied; durability comes from the
    /// single commit at finalise time.
    pub fn open(path: &Utf8Path) -> Result<Self, OpenSinkError> {
        ensure_parent_dir(path)?;
        let connection =
            Connection::open(path.as_std_path()).map_err(|source| OpenSinkError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        // Foreign keys cannot change inside a transaction; set pragmas first.
        connection
            .pragma_update(None, "foreign_keys", true)
            .map_err(|source| OpenSinkError::Pragma {
                pragma: "foreign_keys",
                source,
            })?;
        connection
            .pragma_update(None, "synchronous", "OFF")
            .map_err(|source| OpenSinkError::Pragma {
                pragma: "synchronous",
                source,
            })?;
        // journal_mode replies with the resulting mode, which pragma_update
        // rejects, so read the reply row instead.
        let _mode: String = connection
            .query_row("PRAGMA journal_mode = MEMORY", [], |row| row.get(0))
            .map_err(|source| OpenSinkError::Pragma {
                pragma: "journal_mode",
                source,
            })?;

        connection
            .execute_batch("BEGIN")
            .map_err(|source| OpenSinkError::Begin { source })?;
        initialise_schema(&connection)?;

        Ok(Self {
            connection,
            state: SinkState::Accumulating,
            regions: 0,
            parts: 0,
        })
    }

    fn expect_accumulating(&self, operation: &'static str) -> Result<(), SinkError> {
        match self.state {
            SinkState::Accumulating => Ok(()),
            SinkState::Finalised => Err(SinkError::Finalised { operation }),
        }
    }

    fn collect_partless_geoids(&self) -> Result<Vec<String>, SinkError> {
        let mut statement = self
            .connection
            .prepare(
                "SELECT geoid FROM regions
                 WHERE NOT EXISTS (SELECT 1 FROM parts WHERE parts.region_id = regions.id)
                 ORDER BY id",
            )
            .map_err(|source| SinkError::backend("prepare part-less region query", source))?;
        let mut rows = statement
            .query([])
            .map_err(|source| SinkError::backend("query part-less regions", source))?;

        let mut geoids = Vec::new();
        while let Some(row) = rows
            .next()
            .map_err(|source| SinkError::backend("read part-less region row", source))?
        {
            let geoid = row
                .get(0)
                .map_err(|source| SinkError::backend("read part-less region geoid", source))?;
            geoids.push(geoid);
        }
        Ok(geoids)
    }
}

impl RegionSink for SqliteRegionSink {
    fn region(&mut self, attributes: &RegionAttributes) -> Result<RegionId, SinkError> {
        self.expect_accumulating("region")?;
        let metadata = serde_json::to_string(&attributes.metadata)
            .map_err(|source| SinkError::backend("serialise region metadata", source))?;

        // Placeholder bounds; finalise rewrites them from the parts.
        let placeholder = Bounds::geographic();
        let mut statement = self
            .connection
            .prepare_cached(
                "INSERT INTO regions (geoid, name, area, metadata, min_x, min_y, max_x, max_y)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )
            .map_err(|source| SinkError::backend("prepare region insert", source))?;
        statement
            .execute(params![
                attributes.geoid,
                attributes.name,
                attributes.land_area,
                metadata,
                placeholder.min_x,
                placeholder.min_y,
                placeholder.max_x,
                placeholder.max_y,
            ])
            .map_err(|source| SinkError::backend("insert region", source))?;
        drop(statement);

        self.regions += 1;
        Ok(RegionId::new(self.connection.last_insert_rowid()))
    }

    fn part(
        &mut self,
        region: RegionId,
        bounds: Bounds,
        points: &[Coord<f64>],
    ) -> Result<(), SinkError> {
        self.expect_accumulating("part")?;
        if self.regions == 0 {
            return Err(SinkError::PartBeforeRegion);
        }
        if !bounds.is_valid() {
            return Err(SinkError::InvalidBounds {
                min_x: bounds.min_x,
                min_y: bounds.min_y,
                max_x: bounds.max_x,
                max_y: bounds.max_y,
            });
        }
        if points.is_empty() {
            return Err(SinkError::EmptyPart);
        }

        let payload = encode_points(points)
            .map_err(|source| SinkError::backend("encode part points", source))?;
        let mut statement = self
            .connection
            .prepare_cached(
                "INSERT INTO parts (region_id, min_x, min_y, max_x, max_y, points)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .map_err(|source| SinkError::backend("prepare part insert", source))?;
        statement
            .execute(params![
                region.into_inner(),
                bounds.min_x,
                bounds.min_y,
                bounds.max_x,
                bounds.max_y,
                payload,
            ])
            .map_err(|source| match source {
                SqliteError::SqliteFailure(code, _)
                    if code.code == ErrorCode::ConstraintViolation =>
                {
                    SinkError::UnknownRegion {
                        id: region.into_inner(),
                    }
                }
                other => SinkError::backend("insert part", other),
            })?;
        drop(statement);

        self.parts += 1;
        Ok(())
    }

    fn finalise(&mut self) -> Result<FinaliseReport, SinkError> {
        self.expect_accumulating("finalise")?;

        self.connection
            .execute(
                "UPDATE regions SET
                    min_x = (SELECT MIN(parts.min_x) FROM parts WHERE parts.region_id = regions.id),
                    min_y = (SELECT MIN(parts.min_y) FROM parts WHERE parts.region_id = regions.id),
                    max_x = (SELECT MAX(parts.max_x) FROM parts WHERE parts.region_id = regions.id),
                    max_y = (SELECT MAX(parts.max_y) FROM parts WHERE parts.region_id = regions.id)
                 WHERE EXISTS (SELECT 1 FROM parts WHERE parts.region_id = regions.id)",
                [],
            )
            .map_err(|source| SinkError::backend("rewrite region bounds", source))?;

        let regions_without_parts = self.collect_partless_geoids()?;

        self.connection
            .execute_batch("COMMIT")
            .map_err(|source| SinkError::backend("commit run transaction", source))?;
        self.state = SinkState::Finalised;

        Ok(FinaliseReport {
            regions: self.regions,
            parts: self.parts,
            regions_without_parts,
        })
    }
}

impl Drop for SqliteRegionSink {
    fn drop(&mut self) {
        if self.state == SinkState::Finalised {
            return;
        }
        // Abandoned run: discard everything written since open so the store
        // keeps its pre-run contents.
        warn!("discarding unfinalised ingestion run");
        if let Err(err) = self.connection.execute_batch("ROLLBACK") {
            warn!("failed to roll back abandoned run: {err}");
        }
    }
}

fn initialise_schema(connection: &Connection) -> Result<(), OpenSinkError> {
    run_schema_step(
        connection,
        "create regions table",
        "CREATE TABLE IF NOT EXISTS regions (
            id INTEGER PRIMARY KEY,
            geoid TEXT NOT NULL,
            name TEXT,
            area REAL,
            metadata TEXT,
            min_x REAL NOT NULL,
            min_y REAL NOT NULL,
            max_x REAL NOT NULL,
            max_y REAL NOT NULL
        )",
    )?;
    run_schema_step(
        connection,
        "create parts table",
        "CREATE TABLE IF NOT EXISTS parts (
            id INTEGER PRIMARY KEY,
            region_id INTEGER NOT NULL REFERENCES regions(id) ON DELETE CASCADE,
            min_x REAL NOT NULL,
            min_y REAL NOT NULL,
            max_x REAL NOT NULL,
            max_y REAL NOT NULL,
            points BLOB NOT NULL
        )",
    )?;
    run_schema_step(
        connection,
        "index parts by region",
        "CREATE INDEX IF NOT EXISTS idx_parts_region_id ON parts(region_id)",
    )?;
    // A fresh run replaces the previous run's rows; parts first for the
    // foreign key.
    run_schema_step(connection, "clear parts", "DELETE FROM parts")?;
    run_schema_step(connection, "clear regions", "DELETE FROM regions")
}

fn run_schema_step(
    connection: &Connection,
    step: &'static str,
    sql: &str,
) -> Result<(), OpenSinkError> {
    connection
        .execute(sql, [])
        .map(|_| ())
        .map_err(|source| OpenSinkError::Schema { step, source })
}

fn ensure_parent_dir(path: &Utf8Path) -> Result<(), OpenSinkError> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() || parent == Utf8Path::new("/") {
        return Ok(());
    }

    let (base, relative) = if parent.is_absolute() {
        ("/", parent.strip_prefix("/").unwrap_or(parent))
    } else {
        (".", parent)
    };
    let base_dir = fs_utf8::Dir::open_ambient_dir(base, ambient_authority()).map_err(|source| {
        OpenSinkError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        }
    })?;
    base_dir
        .create_dir_all(relative)
        .map_err(|source| OpenSinkError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::points::decode_points;
    use camino::Utf8PathBuf;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn temp_dir() -> TempDir {
        TempDir::new().expect("create temp dir")
    }

    fn db_path(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join("boundaries.db")).expect("utf-8 path")
    }

    fn attributes(geoid: &str) -> RegionAttributes {
        RegionAttributes::new(geoid).expect("valid geoid")
    }

    fn store_one_region(sink: &mut SqliteRegionSink, geoid: &str) -> RegionId {
        let region = sink.region(&attributes(geoid)).expect("insert region");
        sink.part(
            region,
            Bounds::seeded(-1.0, -2.0, 3.0, 4.0),
            &[Coord { x: -1.0, y: -2.0 }, Coord { x: 3.0, y: 4.0 }],
        )
        .expect("insert part");
        region
    }

    #[rstest]
    fn persists_regions_and_parts(temp_dir: TempDir) {
        let path = db_path(&temp_dir);
        let mut sink = SqliteRegionSink::open(&path).expect("open sink");
        let region = sink
            .region(
                &RegionAttributes::new("53033")
                    .expect("valid geoid")
                    .with_name(Some("King County".into()))
                    .with_land_area(Some(5.48e9)),
            )
            .expect("insert region");
        sink.part(
            region,
            Bounds::seeded(-122.5, 47.1, -121.0, 47.8),
            &[Coord { x: -122.5, y: 47.1 }, Coord { x: -121.0, y: 47.8 }],
        )
        .expect("insert part");
        let report = sink.finalise().expect("finalise");
        assert_eq!(report.regions, 1);
        assert_eq!(report.parts, 1);
        drop(sink);

        let conn = Connection::open(path.as_std_path()).expect("reopen database");
        let (geoid, name, area): (String, String, f64) = conn
            .query_row("SELECT geoid, name, area FROM regions", [], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .expect("read region row");
        assert_eq!(geoid, "53033");
        assert_eq!(name, "King County");
        assert_eq!(area, 5.48e9);

        let payload: Vec<u8> = conn
            .query_row("SELECT points FROM parts", [], |row| row.get(0))
            .expect("read part row");
        let points = decode_points(&payload).expect("decode points");
        assert_eq!(points.len(), 2);
    }

    #[rstest]
    fn finalise_rewrites_bounds_from_part_union(temp_dir: TempDir) {
        let path = db_path(&temp_dir);
        let mut sink = SqliteRegionSink::open(&path).expect("open sink");
        let region = sink.region(&attributes("53033")).expect("insert region");
        sink.part(
            region,
            Bounds::seeded(-1.0, 0.0, 2.0, 3.0),
            &[Coord { x: -1.0, y: 0.0 }],
        )
        .expect("first part");
        sink.part(
            region,
            Bounds::seeded(0.0, -4.0, 5.0, 1.0),
            &[Coord { x: 5.0, y: -4.0 }],
        )
        .expect("second part");
        sink.finalise().expect("finalise");
        drop(sink);

        let conn = Connection::open(path.as_std_path()).expect("reopen database");
        let bounds: (f64, f64, f64, f64) = conn
            .query_row(
                "SELECT min_x, min_y, max_x, max_y FROM regions",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .expect("read region bounds");
        assert_eq!(bounds, (-1.0, -4.0, 5.0, 3.0));
    }

    #[rstest]
    fn fresh_run_clears_previous_rows(temp_dir: TempDir) {
        let path = db_path(&temp_dir);
        let mut sink = SqliteRegionSink::open(&path).expect("open first run");
        store_one_region(&mut sink, "53033");
        store_one_region(&mut sink, "06075");
        sink.finalise().expect("finalise first run");
        drop(sink);

        let mut sink = SqliteRegionSink::open(&path).expect("open second run");
        store_one_region(&mut sink, "11001");
        sink.finalise().expect("finalise second run");
        drop(sink);

        let conn = Connection::open(path.as_std_path()).expect("reopen database");
        let regions: i64 = conn
            .query_row("SELECT COUNT(*) FROM regions", [], |row| row.get(0))
            .expect("count regions");
        let parts: i64 = conn
            .query_row("SELECT COUNT(*) FROM parts", [], |row| row.get(0))
            .expect("count parts");
        assert_eq!(regions, 1);
        assert_eq!(parts, 1);
    }

    #[rstest]
    fn abandoned_run_rolls_back(temp_dir: TempDir) {
        let path = db_path(&temp_dir);
        let mut sink = SqliteRegionSink::open(&path).expect("open first run");
        store_one_region(&mut sink, "53033");
        sink.finalise().expect("finalise first run");
        drop(sink);

        let mut sink = SqliteRegionSink::open(&path).expect("open abandoned run");
        store_one_region(&mut sink, "11001");
        drop(sink); // no finalise

        let conn = Connection::open(path.as_std_path()).expect("reopen database");
        let geoid: String = conn
            .query_row("SELECT geoid FROM regions", [], |row| row.get(0))
            .expect("read surviving region");
        assert_eq!(geoid, "53033", "pre-run contents must survive an abort");
    }

    #[rstest]
    fn enforces_call_order(temp_dir: TempDir) {
        let path = db_path(&temp_dir);
        let mut sink = SqliteRegionSink::open(&path).expect("open sink");

        let err = sink
            .part(
                RegionId::new(1),
                Bounds::seeded(0.0, 0.0, 1.0, 1.0),
                &[Coord { x: 0.0, y: 0.0 }],
            )
            .expect_err("part before region must fail");
        assert!(matches!(err, SinkError::PartBeforeRegion));

        store_one_region(&mut sink, "53033");
        sink.finalise().expect("finalise");
        let err = sink
            .region(&attributes("06075"))
            .expect_err("region after finalise must fail");
        assert!(matches!(err, SinkError::Finalised { operation: "region" }));
        let err = sink.finalise().expect_err("double finalise must fail");
        assert!(matches!(
            err,
            SinkError::Finalised {
                operation: "finalise"
            }
        ));
    }

    #[rstest]
    fn rejects_unknown_region_id(temp_dir: TempDir) {
        let path = db_path(&temp_dir);
        let mut sink = SqliteRegionSink::open(&path).expect("open sink");
        store_one_region(&mut sink, "53033");

        let err = sink
            .part(
                RegionId::new(999),
                Bounds::seeded(0.0, 0.0, 1.0, 1.0),
                &[Coord { x: 0.0, y: 0.0 }],
            )
            .expect_err("unknown region must fail");
        assert!(matches!(err, SinkError::UnknownRegion { id: 999 }));
    }

    #[rstest]
    fn surfaces_partless_regions(temp_dir: TempDir) {
        let path = db_path(&temp_dir);
        let mut sink = SqliteRegionSink::open(&path).expect("open sink");
        sink.region(&attributes("53033")).expect("insert region");
        store_one_region(&mut sink, "06075");
        let report = sink.finalise().expect("finalise");
        assert_eq!(report.regions_without_parts, vec!["53033".to_owned()]);
    }

    #[rstest]
    fn creates_parent_directory(temp_dir: TempDir) {
        let nested = Utf8PathBuf::from_path_buf(temp_dir.path().join("nested/deep/boundaries.db"))
            .expect("utf-8 path");
        let mut sink = SqliteRegionSink::open(&nested).expect("open sink under nested path");
        store_one_region(&mut sink, "53033");
        sink.finalise().expect("finalise");
        assert!(nested.as_std_path().exists());
    }

    #[rstest]
    fn serialises_metadata_as_json(temp_dir: TempDir) {
        let path = db_path(&temp_dir);
        let mut sink = SqliteRegionSink::open(&path).expect("open sink");
        let region_attributes = RegionAttributes::new("53033")
            .expect("valid geoid")
            .with_metadata(regionmap_core::AttributeMap::from([
                ("GEOID10".to_owned(), "53033".to_owned()),
                ("MTFCC10".to_owned(), "G4020".to_owned()),
            ]));
        let region = sink.region(&region_attributes).expect("insert region");
        sink.part(
            region,
            Bounds::seeded(0.0, 0.0, 1.0, 1.0),
            &[Coord { x: 0.0, y: 0.0 }],
        )
        .expect("insert part");
        sink.finalise().expect("finalise");
        drop(sink);

        let conn = Connection::open(path.as_std_path()).expect("reopen database");
        let metadata: String = conn
            .query_row("SELECT metadata FROM regions", [], |row| row.get(0))
            .expect("read metadata");
        let parsed: serde_json::Value =
            serde_json::from_str(&metadata).expect("metadata is valid JSON");
        assert_eq!(parsed["MTFCC10"], "G4020");
    }
}
