//! Ingestion and persistence for the regionmap boundary store.
//!
//! Responsibilities:
//! - Normalise decoded record attributes and adapt external decoders to the
//!   pipeline's record contract.
//! - Drive records through simplification and bounds accumulation into a
//!   [`regionmap_core::RegionSink`].
//! - Persist regions and parts to SQLite with the compact points encoding.
//!
//! Boundaries:
//! - Domain rules live in `regionmap-core`; this crate carries the I/O.
//! - Binary container decoding belongs to the `shapefile` collaborator
//!   crate, never to this workspace.

#![forbid(unsafe_code)]

pub mod ingest;
pub mod store;

pub use ingest::{
    AttributeError, IngestError, IngestPipeline, IngestReport, IngestSummary, PipelineConfig,
    RawRecord, RecordSource, ShapefileSource, SourceError, SourceListError, VecSource,
    expand_sources, ingest_shapefile, normalise_attributes,
};
pub use store::{OpenSinkError, PointsCodecError, SqliteRegionSink, decode_points, encode_points};
