//! Storage backends and encodings for persisted regions and parts.

mod points;
mod sqlite;

pub use points::{PointsCodecError, decode_points, encode_points};
pub use sqlite::{OpenSinkError, SqliteRegionSink};
