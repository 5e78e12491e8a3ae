//! Gzip compression for encoded snapshots

use std::io::{Read, Write};

use flate2::bufread::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::CompressionError;

/// Leading bytes of a gzip stream
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Whether the bytes start like a gzip stream
pub fn is_compressed(data: &[u8]) -> bool {
    data.starts_with(&GZIP_MAGIC)
}

/// Compress bytes at the given gzip level (clamped to 0-9)
pub fn compress(data: &[u8], level: u32) -> Result<Vec<u8>, CompressionError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::new(level.min(9)));
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Decompress a single gzip stream
///
/// Fails with `Corrupt` on anything that is not exactly one complete gzip
/// stream, and with `TooLarge` once the output would exceed `limit` bytes.
pub fn decompress(data: &[u8], limit: u64) -> Result<Vec<u8>, CompressionError> {
    if !is_compressed(data) {
        return Err(CompressionError::Corrupt("missing gzip header".into()));
    }

    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    (&mut decoder)
        .take(limit.saturating_add(1))
        .read_to_end(&mut out)
        .map_err(|e| CompressionError::Corrupt(e.to_string()))?;

    if out.len() as u64 > limit {
        return Err(CompressionError::TooLarge { limit });
    }

    let trailing = decoder.into_inner();
    if !trailing.is_empty() {
        return Err(CompressionError::Corrupt(format!(
            "{} unexpected bytes after the compressed stream",
            trailing.len()
        )));
    }

    Ok(out)
}
