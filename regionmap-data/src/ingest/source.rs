//! The decoder collaborator contract.
//!
//! Decoding the binary boundary container is delegated to external
//! collaborators; the pipeline only consumes the record stream defined here.

use std::collections::BTreeMap;

use geo::Coord;
use thiserror::Error;

/// One decoded boundary feature handed over by a decoder.
///
/// Attribute values are the decoder's raw bytes; character re-encoding and
/// trimming happen during normalisation, not here. A record owns its data
/// for exactly one pipeline iteration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    /// Attribute name to raw value bytes.
    pub attributes: BTreeMap<String, Vec<u8>>,
    /// Geometry parts, each an ordered coordinate sequence.
    pub parts: Vec<Vec<Coord<f64>>>,
}

/// Errors raised by a [`RecordSource`].
#[derive(Debug, Error)]
pub enum SourceError {
    /// The decoder could not produce the next record.
    #[error("failed to decode boundary record")]
    Decode {
        /// Underlying decoder error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl SourceError {
    /// Wrap a decoder failure.
    pub fn decode<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Decode {
            source: Box::new(source),
        }
    }
}

/// Pull-based stream of decoded boundary records.
///
/// Implementations yield records strictly in input order and return
/// `Ok(None)` once the input is exhausted.
pub trait RecordSource {
    /// The next record, `Ok(None)` at end of input.
    fn next_record(&mut self) -> Result<Option<RawRecord>, SourceError>;
}

/// Adapter feeding pre-built records to the pipeline, mainly for tests.
///
/// # Examples
/// ```
/// use regionmap_data::{RawRecord, RecordSource, VecSource};
///
/// let mut source = VecSource::new(vec![RawRecord::default()]);
/// assert!(source.next_record().expect("no decode errors").is_some());
/// assert!(source.next_record().expect("no decode errors").is_none());
/// ```
#[derive(Debug, Default)]
pub struct VecSource {
    records: std::vec::IntoIter<RawRecord>,
}

impl VecSource {
    /// Wrap an in-memory record list.
    #[must_use]
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self {
            records: records.into_iter(),
        }
    }
}

impl RecordSource for VecSource {
    fn next_record(&mut self) -> Result<Option<RawRecord>, SourceError> {
        Ok(self.records.next())
    }
}
