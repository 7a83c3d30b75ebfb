//! Adapter from the `shapefile` crate to the [`RecordSource`] contract.
//!
//! Binary container decoding stays inside the `shapefile` crate; this module
//! only reshapes its output. Attribute values are surrendered as raw bytes so
//! normalisation owns all character handling, and each shape flattens into
//! the part/point structure the pipeline expects.

use std::collections::BTreeMap;
use std::path::Path;

use geo::Coord;
use log::warn;
use shapefile::dbase::{FieldValue, Record};
use shapefile::{Point, Shape};

use regionmap_core::RegionSink;

use super::source::{RawRecord, RecordSource, SourceError};
use super::{IngestError, IngestPipeline};

/// Open a boundary file and drain every record into the pipeline.
///
/// Opening failures are fatal (the run aborts before touching the sink);
/// per-record problems inside the file follow the pipeline's skip-and-report
/// policy.
pub fn ingest_shapefile<K: RegionSink>(
    path: &Path,
    pipeline: &mut IngestPipeline<'_, K>,
) -> Result<(), IngestError> {
    let mut reader = shapefile::Reader::from_path(path).map_err(|source| IngestError::Open {
        source,
        path: path.to_path_buf(),
    })?;
    let mut source = ShapefileSource::new(reader.iter_shapes_and_records());
    pipeline.run(&mut source)
}

/// [`RecordSource`] over a shape/record iterator produced by a
/// [`shapefile::Reader`].
///
/// The adapter is generic over the iterator rather than owning the reader so
/// it composes with the crate's borrowing iterator API.
#[derive(Debug)]
pub struct ShapefileSource<I> {
    records: I,
}

impl<I> ShapefileSource<I>
where
    I: Iterator<Item = Result<(Shape, Record), shapefile::Error>>,
{
    /// Wrap a shape/record iterator.
    pub fn new(records: I) -> Self {
        Self { records }
    }
}

impl<I> RecordSource for ShapefileSource<I>
where
    I: Iterator<Item = Result<(Shape, Record), shapefile::Error>>,
{
    fn next_record(&mut self) -> Result<Option<RawRecord>, SourceError> {
        let Some(item) = self.records.next() else {
            return Ok(None);
        };
        let (shape, record) = item.map_err(SourceError::decode)?;

        let attributes = convert_attributes(record);
        let parts = match convert_shape(shape) {
            Ok(parts) => parts,
            Err(kind) => {
                // Surrender a part-less record; the pipeline reports and
                // skips it like any other record without geometry.
                warn!("record carries unsupported shape kind {kind:?}");
                Vec::new()
            }
        };

        Ok(Some(RawRecord { attributes, parts }))
    }
}

fn convert_attributes(record: Record) -> BTreeMap<String, Vec<u8>> {
    let mut attributes = BTreeMap::new();
    for (name, value) in record {
        if let Some(bytes) = field_bytes(value) {
            attributes.insert(name, bytes);
        }
    }
    attributes
}

/// Raw bytes for a dbase field, or `None` for absent values and field types
/// with no counterpart in the region schema (dates, memos).
fn field_bytes(value: FieldValue) -> Option<Vec<u8>> {
    match value {
        FieldValue::Character(Some(text)) => Some(text.into_bytes()),
        FieldValue::Numeric(Some(number)) => Some(number.to_string().into_bytes()),
        FieldValue::Float(Some(number)) => Some(number.to_string().into_bytes()),
        FieldValue::Integer(number) => Some(number.to_string().into_bytes()),
        FieldValue::Double(number) => Some(number.to_string().into_bytes()),
        FieldValue::Logical(Some(flag)) => Some(if flag { b"Y".to_vec() } else { b"N".to_vec() }),
        _ => None,
    }
}

fn convert_shape(shape: Shape) -> Result<Vec<Vec<Coord<f64>>>, shapefile::ShapeType> {
    match shape {
        Shape::NullShape => Ok(Vec::new()),
        Shape::Point(point) => Ok(vec![vec![coord(&point)]]),
        Shape::Multipoint(multipoint) => {
            Ok(vec![multipoint.points().iter().map(coord).collect()])
        }
        Shape::Polyline(polyline) => Ok(polyline
            .parts()
            .iter()
            .map(|part| part.iter().map(coord).collect())
            .collect()),
        Shape::Polygon(polygon) => Ok(polygon
            .rings()
            .iter()
            .map(|ring| ring.points().iter().map(coord).collect())
            .collect()),
        other => Err(other.shapetype()),
    }
}

fn coord(point: &Point) -> Coord<f64> {
    Coord {
        x: point.x,
        y: point.y,
    }
}
