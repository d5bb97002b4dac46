//! Optional DEFLATE layer around section bodies.

use crate::debug::trace_compression;
use crate::error::{CodecError, Result};
use crate::primitives::{PacketReader, PacketWriter};
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use tracing::debug;

/// Leading byte of a section body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CompressionFlag {
    Stored = 0,
    Deflated = 1,
}

impl CompressionFlag {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(CompressionFlag::Stored),
            1 => Some(CompressionFlag::Deflated),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Raw DEFLATE (no zlib or gzip framing).
pub fn deflate(data: &[u8], level: u32) -> Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::with_capacity(data.len() / 2), Compression::new(level));
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Inflates `data`, failing once the output would exceed `limit` bytes.
pub fn inflate(data: &[u8], limit: usize) -> Result<Vec<u8>> {
    let mut decoder = DeflateDecoder::new(data).take(limit as u64 + 1);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| CodecError::MalformedTileGrid(format!("inflate failed: {e}")))?;
    if out.len() > limit {
        return Err(CodecError::MalformedTileGrid(format!(
            "inflated body exceeds {limit} bytes"
        )));
    }
    Ok(out)
}

/// Writes the flag byte and `body`, deflating it when that pays off.
///
/// Bodies below the configured threshold are stored. Larger bodies are
/// deflated only when the result is strictly smaller.
pub fn write_compressed_body(writer: &mut PacketWriter<'_>, body: &[u8]) -> Result<CompressionFlag> {
    let config = writer.config();
    if body.len() >= config.compression_threshold {
        let compressed = deflate(body, config.compression_level)?;
        if compressed.len() < body.len() {
            trace_compression(body.len(), compressed.len());
            writer.write_u8(CompressionFlag::Deflated.as_u8());
            writer.write_bytes(&compressed);
            return Ok(CompressionFlag::Deflated);
        }
        debug!(size = body.len(), "deflate did not shrink section body, storing");
    }
    writer.write_u8(CompressionFlag::Stored.as_u8());
    writer.write_bytes(body);
    Ok(CompressionFlag::Stored)
}

/// Reads the flag byte and returns the plain body. Consumes the rest of the
/// reader.
pub fn read_compressed_body(reader: &mut PacketReader<'_>) -> Result<Vec<u8>> {
    let flag = reader.read_u8()?;
    let data = reader.read_remaining();
    match CompressionFlag::from_u8(flag) {
        Some(CompressionFlag::Stored) => Ok(data.to_vec()),
        Some(CompressionFlag::Deflated) => {
            let body = inflate(data, reader.config().max_inflated_size)?;
            debug!(compressed = data.len(), inflated = body.len(), "inflated section body");
            Ok(body)
        }
        None => Err(CodecError::MalformedTileGrid(format!(
            "unknown compression flag {flag}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CodecConfig;

    #[test]
    fn test_deflate_round_trip() {
        let data = vec![7u8; 4096];
        let compressed = deflate(&data, 6).unwrap();
        assert!(compressed.len() < 100);
        assert_eq!(inflate(&compressed, 4096).unwrap(), data);
    }

    #[test]
    fn test_inflate_limit() {
        let compressed = deflate(&[0u8; 1000], 6).unwrap();
        assert!(matches!(
            inflate(&compressed, 999),
            Err(CodecError::MalformedTileGrid(_))
        ));
        assert!(inflate(&compressed, 1000).is_ok());
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(inflate(&[0xFF, 0xFF, 0xFF, 0xFF], 1024).is_err());
    }

    #[test]
    fn test_below_threshold_is_stored() {
        let config = CodecConfig::new().with_compression_threshold(64);
        let body = vec![0u8; 63];
        let mut writer = PacketWriter::with_config(&config);
        let flag = write_compressed_body(&mut writer, &body).unwrap();
        assert_eq!(flag, CompressionFlag::Stored);
        assert_eq!(writer.len(), 64);
        assert_eq!(writer.as_slice()[0], 0);

        let mut reader = PacketReader::with_config(writer.as_slice(), &config);
        assert_eq!(read_compressed_body(&mut reader).unwrap(), body);
    }

    #[test]
    fn test_above_threshold_is_deflated() {
        let config = CodecConfig::new().with_compression_threshold(64);
        let body = vec![0u8; 64];
        let mut writer = PacketWriter::with_config(&config);
        let flag = write_compressed_body(&mut writer, &body).unwrap();
        assert_eq!(flag, CompressionFlag::Deflated);
        assert_eq!(writer.as_slice()[0], 1);
        assert!(writer.len() < 65);

        let mut reader = PacketReader::with_config(writer.as_slice(), &config);
        assert_eq!(read_compressed_body(&mut reader).unwrap(), body);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_incompressible_body_is_stored() {
        let config = CodecConfig::new().with_compression_threshold(1);
        // 0..=255 once each does not shrink under DEFLATE
        let body: Vec<u8> = (0..=255u8).collect();
        let mut writer = PacketWriter::with_config(&config);
        assert_eq!(
            write_compressed_body(&mut writer, &body).unwrap(),
            CompressionFlag::Stored
        );
        assert_eq!(&writer.as_slice()[1..], body.as_slice());
    }

    #[test]
    fn test_unknown_flag() {
        let mut reader = PacketReader::new(&[2, 0, 0]);
        assert!(matches!(
            read_compressed_body(&mut reader),
            Err(CodecError::MalformedTileGrid(_))
        ));
    }
}
