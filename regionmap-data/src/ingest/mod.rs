//! The record-at-a-time ingestion pipeline.
//!
//! Drives decoded boundary records through attribute normalisation, per-part
//! simplification and bounds accumulation, and into a [`RegionSink`]. Peak
//! memory is bounded by a single record's geometry: each record is pulled
//! from the source, processed, and dropped before the next one is read.
//!
//! Malformed records (no usable identifier, no geometry) are reported and
//! skipped; decoder and sink failures abort the run.

use std::path::PathBuf;

use log::{info, warn};
use thiserror::Error;

use regionmap_core::{
    Bounds, FinaliseReport, RegionSink, Simplifier, SimplifyError, SinkError, SlopeConvention,
};

mod attributes;
mod paths;
mod shapefile;
mod source;

pub use attributes::{AttributeError, normalise_attributes};
pub use paths::{SourceListError, expand_sources};
pub use shapefile::{ShapefileSource, ingest_shapefile};
pub use source::{RawRecord, RecordSource, SourceError, VecSource};

/// Configuration threaded through the pipeline constructor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    /// Collinearity tolerance; zero disables simplification.
    pub tolerance: f64,
    /// Gradient denominator convention for the simplifier.
    pub slope_convention: SlopeConvention,
    /// Seed for per-part bounds accumulation. The geographic seed suits
    /// longitude/latitude data; other coordinate domains supply their own.
    pub seed: Bounds,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tolerance: regionmap_core::DEFAULT_TOLERANCE,
            slope_convention: SlopeConvention::default(),
            seed: Bounds::geographic(),
        }
    }
}

impl PipelineConfig {
    /// Configuration with the given tolerance and default everything else.
    #[must_use]
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self {
            tolerance,
            ..Self::default()
        }
    }
}

/// Running totals for one ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestSummary {
    /// Records pulled from the sources, including rejected ones.
    pub records: u64,
    /// Records reported and skipped.
    pub rejected: u64,
    /// Regions handed to the sink.
    pub regions: u64,
    /// Parts handed to the sink.
    pub parts: u64,
    /// Points read across all parts before simplification.
    pub points_read: u64,
    /// Points remaining after simplification.
    pub points_kept: u64,
}

/// Totals plus the sink's finalisation outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    /// Running totals for the run.
    pub summary: IngestSummary,
    /// What the sink committed.
    pub finalise: FinaliseReport,
}

/// Errors that abort an ingestion run.
#[derive(Debug, Error)]
pub enum IngestError {
    /// A boundary file could not be opened.
    #[error("failed to open boundary file at {path:?}")]
    Open {
        /// Underlying decoder error.
        #[source]
        source: ::shapefile::Error,
        /// The unreadable file.
        path: PathBuf,
    },
    /// The decoder failed mid-stream.
    #[error(transparent)]
    Source(#[from] SourceError),
    /// The sink rejected an operation or its backend failed.
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// One ingestion run feeding a sink.
///
/// Create it once per run, call [`run`](IngestPipeline::run) for each input
/// source in order, then [`finish`](IngestPipeline::finish) exactly once.
///
/// # Examples
/// ```
/// use regionmap_core::test_support::MemoryRegionSink;
/// use regionmap_data::{IngestPipeline, PipelineConfig, RawRecord, VecSource};
/// use std::collections::BTreeMap;
/// use geo::Coord;
///
/// # fn main() -> Result<(), regionmap_data::IngestError> {
/// let mut sink = MemoryRegionSink::default();
/// let mut pipeline = IngestPipeline::new(&mut sink, &PipelineConfig::default())
///     .expect("default tolerance is valid");
/// let mut source = VecSource::new(vec![RawRecord {
///     attributes: BTreeMap::from([("GEOID10".to_owned(), b"53033".to_vec())]),
///     parts: vec![vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 }]],
/// }]);
/// pipeline.run(&mut source)?;
/// let report = pipeline.finish()?;
/// assert_eq!(report.summary.regions, 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct IngestPipeline<'sink, K: RegionSink> {
    sink: &'sink mut K,
    simplifier: Simplifier,
    seed: Bounds,
    summary: IngestSummary,
}

impl<'sink, K: RegionSink> IngestPipeline<'sink, K> {
    /// Validate the configuration and bind the pipeline to its sink.
    pub fn new(sink: &'sink mut K, config: &PipelineConfig) -> Result<Self, SimplifyError> {
        let simplifier =
            Simplifier::new(config.tolerance)?.with_slope_convention(config.slope_convention);
        Ok(Self {
            sink,
            simplifier,
            seed: config.seed,
            summary: IngestSummary::default(),
        })
    }

    /// Drain one record source into the sink.
    pub fn run<S: RecordSource>(&mut self, source: &mut S) -> Result<(), IngestError> {
        while let Some(record) = source.next_record()? {
            self.process_record(&record)?;
        }
        Ok(())
    }

    /// Totals accumulated so far.
    #[must_use]
    pub const fn summary(&self) -> &IngestSummary {
        &self.summary
    }

    /// Finalise the sink and hand back the run report.
    pub fn finish(self) -> Result<IngestReport, IngestError> {
        let finalise = self.sink.finalise()?;
        for geoid in &finalise.regions_without_parts {
            warn!("region {geoid} finished the run without any parts");
        }
        Ok(IngestReport {
            summary: self.summary,
            finalise,
        })
    }

    fn process_record(&mut self, record: &RawRecord) -> Result<(), IngestError> {
        self.summary.records += 1;

        let attributes = match normalise_attributes(&record.attributes) {
            Ok(attributes) => attributes,
            Err(err) => {
                warn!("skipping record: {err}; attributes: {:?}", err.attributes());
                self.summary.rejected += 1;
                return Ok(());
            }
        };

        if record.parts.is_empty() {
            warn!(
                "skipping record {}: no geometry parts; attributes: {:?}",
                attributes.geoid, attributes.metadata
            );
            self.summary.rejected += 1;
            return Ok(());
        }

        let region = self.sink.region(&attributes)?;
        self.summary.regions += 1;

        let mut points_read: u64 = 0;
        let mut points_kept: u64 = 0;
        for points in &record.parts {
            if points.is_empty() {
                warn!("skipping empty geometry part of region {}", attributes.geoid);
                continue;
            }
            let bounds = Bounds::from_points(self.seed, points.iter().copied());
            let simplified = self.simplifier.simplify(points);
            points_read += points.len() as u64;
            points_kept += simplified.len() as u64;
            self.sink.part(region, bounds, &simplified)?;
            self.summary.parts += 1;
        }
        self.summary.points_read += points_read;
        self.summary.points_kept += points_kept;

        info!(
            "{}: {} - {}/{} points",
            attributes.geoid,
            attributes.name.as_deref().unwrap_or(""),
            points_kept,
            points_read
        );
        Ok(())
    }
}
