//! Core domain types for the regionmap boundary store.
//!
//! This crate holds the pieces of the ingestion pipeline that carry no I/O:
//! bounding-box accumulation, collinear-point simplification, the cleaned
//! region attribute model, and the [`RegionSink`] visitor interface that
//! storage backends implement. Constructors return `Result` to surface
//! invalid input early.

#![forbid(unsafe_code)]

mod bounds;
mod region;
mod simplify;
mod sink;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use bounds::Bounds;
pub use region::{AttributeMap, RegionAttributes, RegionAttributesError, RegionId};
pub use simplify::{DEFAULT_TOLERANCE, Simplifier, SimplifyError, SlopeConvention};
pub use sink::{FinaliseReport, RegionSink, SinkError};
