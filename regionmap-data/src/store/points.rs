//! Compact BLOB encoding for part point sequences.
//!
//! Points are flattened to `[x0, y0, x1, y1, ...]` as little-endian `f64`
//! and zlib-compressed. Long boundaries carry tens of thousands of points;
//! stored uncompressed they can overflow backend row-size limits.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use geo::Coord;
use thiserror::Error;

/// Errors raised by the points codec.
#[derive(Debug, Error)]
pub enum PointsCodecError {
    /// Compressing the coordinate stream failed.
    #[error("failed to compress point stream")]
    Compress {
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The stored payload was not a valid zlib stream.
    #[error("failed to decompress point stream")]
    Decompress {
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The decompressed payload does not align to (x, y) pairs.
    #[error("point stream holds {bytes} bytes, not a whole number of coordinate pairs")]
    Misaligned {
        /// Length of the misaligned payload.
        bytes: usize,
    },
}

/// Compress a point sequence into its storage payload.
pub fn encode_points(points: &[Coord<f64>]) -> Result<Vec<u8>, PointsCodecError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    for point in points {
        encoder
            .write_all(&point.x.to_le_bytes())
            .and_then(|()| encoder.write_all(&point.y.to_le_bytes()))
            .map_err(|source| PointsCodecError::Compress { source })?;
    }
    encoder
        .finish()
        .map_err(|source| PointsCodecError::Compress { source })
}

/// Decompress a storage payload back into its point sequence.
pub fn decode_points(payload: &[u8]) -> Result<Vec<Coord<f64>>, PointsCodecError> {
    let mut raw = Vec::new();
    ZlibDecoder::new(payload)
        .read_to_end(&mut raw)
        .map_err(|source| PointsCodecError::Decompress { source })?;

    const PAIR_BYTES: usize = 2 * size_of::<f64>();
    if raw.len() % PAIR_BYTES != 0 {
        return Err(PointsCodecError::Misaligned { bytes: raw.len() });
    }

    Ok(raw
        .chunks_exact(PAIR_BYTES)
        .map(|pair| {
            let (x, y) = pair.split_at(size_of::<f64>());
            Coord {
                x: f64::from_le_bytes(x.try_into().unwrap_or_default()),
                y: f64::from_le_bytes(y.try_into().unwrap_or_default()),
            }
        })
        .collect())
}
