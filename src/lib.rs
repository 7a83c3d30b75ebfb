//! Facade crate for the regionmap boundary store.
//!
//! This crate re-exports the core domain types and exposes the SQLite-backed
//! ingestion pipeline behind a feature flag.

#![forbid(unsafe_code)]

pub use regionmap_core::{
    AttributeMap, Bounds, FinaliseReport, RegionAttributes, RegionAttributesError, RegionId,
    RegionSink, Simplifier, SimplifyError, SinkError, SlopeConvention,
};

#[cfg(feature = "store-sqlite")]
pub use regionmap_data::{
    IngestError, IngestPipeline, IngestReport, IngestSummary, OpenSinkError, PipelineConfig,
    RawRecord, RecordSource, SourceError, SqliteRegionSink,
};

#[cfg(feature = "test-support")]
pub use regionmap_core::test_support::MemoryRegionSink;
