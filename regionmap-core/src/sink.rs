//! The visitor interface a pipeline run feeds with regions and parts.
//!
//! A sink owns the persisted entities and the transactional context for one
//! run. The pipeline calls [`RegionSink::region`] once per qualifying record,
//! [`RegionSink::part`] once per geometry part, and [`RegionSink::finalise`]
//! exactly once after the input is exhausted. Finalisation rewrites every
//! region's bounding box as the union of its parts' boxes and commits the
//! run. Implementations must enforce the call order at run time: `part`
//! before any `region`, or either after `finalise`, is a programming error
//! that fails the run rather than corrupting the store.

use geo::Coord;
use thiserror::Error;

use crate::{Bounds, RegionAttributes, RegionId};

/// Errors raised by [`RegionSink`] implementations.
#[derive(Debug, Error)]
pub enum SinkError {
    /// `part` was called before any region was registered.
    #[error("part received before any region was registered")]
    PartBeforeRegion,
    /// `part` referenced an identifier this sink never issued.
    #[error("unknown region id {id}")]
    UnknownRegion {
        /// The unrecognised identifier.
        id: i64,
    },
    /// A sink method was called after the run was finalised.
    #[error("{operation} called after finalise")]
    Finalised {
        /// The offending operation.
        operation: &'static str,
    },
    /// A part arrived with an inverted bounding box.
    #[error("part bounding box is inverted: ({min_x}, {min_y})..({max_x}, {max_y})")]
    InvalidBounds {
        /// Smallest x of the rejected box.
        min_x: f64,
        /// Smallest y of the rejected box.
        min_y: f64,
        /// Largest x of the rejected box.
        max_x: f64,
        /// Largest y of the rejected box.
        max_y: f64,
    },
    /// A part arrived without any points.
    #[error("part must contain at least one point")]
    EmptyPart,
    /// The storage backend failed.
    #[error("failed to {operation}")]
    Backend {
        /// What the sink was doing when the backend failed.
        operation: &'static str,
        /// Underlying backend error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl SinkError {
    /// Wrap a backend failure with the operation being performed.
    pub fn backend<E>(operation: &'static str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            operation,
            source: Box::new(source),
        }
    }
}

/// Outcome of [`RegionSink::finalise`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FinaliseReport {
    /// Number of regions persisted in this run.
    pub regions: u64,
    /// Number of parts persisted in this run.
    pub parts: u64,
    /// Geoids of regions that finished the run with no parts.
    ///
    /// A populated list is a data-quality anomaly in the input; the rows are
    /// kept (with their placeholder bounds) so the problem stays visible.
    pub regions_without_parts: Vec<String>,
}

/// Destination for persisted regions and their boundary parts.
///
/// Implementations own the storage transaction for the run: it is opened
/// when the sink is constructed and committed by `finalise`. Abandoning a
/// sink without finalising must discard the run's writes.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use regionmap_core::{Bounds, FinaliseReport, RegionAttributes, RegionId, RegionSink, SinkError};
///
/// #[derive(Default)]
/// struct CountingSink {
///     regions: u64,
///     parts: u64,
/// }
///
/// impl RegionSink for CountingSink {
///     fn region(&mut self, _attributes: &RegionAttributes) -> Result<RegionId, SinkError> {
///         self.regions += 1;
///         Ok(RegionId::new(self.regions as i64))
///     }
///
///     fn part(
///         &mut self,
///         _region: RegionId,
///         _bounds: Bounds,
///         _points: &[Coord<f64>],
///     ) -> Result<(), SinkError> {
///         self.parts += 1;
///         Ok(())
///     }
///
///     fn finalise(&mut self) -> Result<FinaliseReport, SinkError> {
///         Ok(FinaliseReport {
///             regions: self.regions,
///             parts: self.parts,
///             regions_without_parts: Vec::new(),
///         })
///     }
/// }
///
/// # fn main() -> Result<(), SinkError> {
/// let mut sink = CountingSink::default();
/// let region = sink.region(&RegionAttributes::new("11001").unwrap())?;
/// sink.part(region, Bounds::seeded(0.0, 0.0, 1.0, 1.0), &[Coord { x: 0.0, y: 0.0 }])?;
/// assert_eq!(sink.finalise()?.regions, 1);
/// # Ok(())
/// # }
/// ```
pub trait RegionSink {
    /// Persist a new region with placeholder bounds; returns the identifier
    /// subsequent [`part`](RegionSink::part) calls must use.
    fn region(&mut self, attributes: &RegionAttributes) -> Result<RegionId, SinkError>;

    /// Persist one boundary part of a previously registered region.
    ///
    /// `bounds` covers the part's original point stream; `points` is the
    /// already simplified sequence and must not be empty.
    fn part(
        &mut self,
        region: RegionId,
        bounds: Bounds,
        points: &[Coord<f64>],
    ) -> Result<(), SinkError>;

    /// Rewrite every region's bounds from the union of its parts' bounds and
    /// commit the run. Must be called exactly once, after all records.
    fn finalise(&mut self) -> Result<FinaliseReport, SinkError>;
}
