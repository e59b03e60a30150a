//! Polyline number codec.
//!
//! Each signed integer is zigzag-folded (sign in the low bit), split into
//! 5-bit groups from the least significant end, every group but the last
//! flagged with `0x20`, and offset by 63 into printable ASCII.
//!
//! Two framings are built on top of the number stream:
//!
//! - tile triples: absolute `z, x, y` values, three numbers per tile
//! - paths: the usual delta-encoded `lat, lng` pairs at 1e5 precision

use thiserror::Error;

use super::mercator::LngLat;

const CHUNK_BITS: u32 = 5;
const CHUNK_MASK: i64 = 0x1f;
const CONTINUATION: i64 = 0x20;
const OFFSET: i64 = 63;
const PATH_PRECISION: f64 = 1e5;

/// Errors from decoding a polyline string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolylineError {
    /// Input ended in the middle of a value
    #[error("Truncated value at byte {0}")]
    Truncated(usize),

    /// Byte below the printable offset
    #[error("Invalid character at byte {0}")]
    InvalidByte(usize),

    /// Value does not fit in 64 bits
    #[error("Value overflow at byte {0}")]
    Overflow(usize),

    /// Tile stream length is not a multiple of three
    #[error("Incomplete tile triple: {0} trailing values")]
    IncompleteTriple(usize),
}

/// Encode a sequence of signed integers.
pub fn encode_values(values: &[i64]) -> String {
    let mut out = String::with_capacity(values.len() * 2);
    for &value in values {
        let mut v = if value < 0 { !(value << 1) } else { value << 1 };
        while v >= CONTINUATION {
            out.push(((CONTINUATION | (v & CHUNK_MASK)) + OFFSET) as u8 as char);
            v >>= CHUNK_BITS;
        }
        out.push((v + OFFSET) as u8 as char);
    }
    out
}

/// Decode a sequence of signed integers.
pub fn decode_values(encoded: &str) -> Result<Vec<i64>, PolylineError> {
    let bytes = encoded.as_bytes();
    let mut values = Vec::new();
    let mut index = 0;

    while index < bytes.len() {
        let mut result: i64 = 0;
        let mut shift: u32 = 0;
        loop {
            let Some(&byte) = bytes.get(index) else {
                return Err(PolylineError::Truncated(index));
            };
            let b = byte as i64 - OFFSET;
            if b < 0 {
                return Err(PolylineError::InvalidByte(index));
            }
            if shift > 60 {
                return Err(PolylineError::Overflow(index));
            }
            result |= (b & CHUNK_MASK) << shift;
            shift += CHUNK_BITS;
            index += 1;
            if b < CONTINUATION {
                break;
            }
        }
        values.push(if result & 1 != 0 { !(result >> 1) } else { result >> 1 });
    }

    Ok(values)
}

/// Encode tile coordinates as absolute `z, x, y` triples.
pub fn encode_tiles(tiles: &[(u32, u32, u32)]) -> String {
    let values: Vec<i64> = tiles
        .iter()
        .flat_map(|&(z, x, y)| [z as i64, x as i64, y as i64])
        .collect();
    encode_values(&values)
}

/// Decode absolute `z, x, y` triples.
///
/// Values are returned as signed integers; range checks belong to the caller.
pub fn decode_tiles(encoded: &str) -> Result<Vec<(i64, i64, i64)>, PolylineError> {
    let values = decode_values(encoded)?;
    if values.len() % 3 != 0 {
        return Err(PolylineError::IncompleteTriple(values.len() % 3));
    }
    Ok(values.chunks_exact(3).map(|c| (c[0], c[1], c[2])).collect())
}

/// Decode a standard delta-encoded polyline into lon/lat points.
pub fn decode_path(encoded: &str) -> Result<Vec<LngLat>, PolylineError> {
    let values = decode_values(encoded)?;
    if values.len() % 2 != 0 {
        return Err(PolylineError::Truncated(encoded.len()));
    }

    let mut lat = 0i64;
    let mut lng = 0i64;
    Ok(values
        .chunks_exact(2)
        .map(|pair| {
            lat += pair[0];
            lng += pair[1];
            LngLat::new(lng as f64 / PATH_PRECISION, lat as f64 / PATH_PRECISION)
        })
        .collect())
}
