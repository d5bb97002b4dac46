//! Length-prefixed framing: `[u16 LE total length][u8 type][body]`.

use crate::config::CodecConfig;
use crate::debug::{trace_decode, trace_encode};
use crate::error::{CodecError, Result};
use crate::packets::Packet;
use crate::primitives::{PacketReader, PacketWriter};
use crate::protocol::{Side, HEADER_SIZE, LENGTH_PREFIX_SIZE, MAX_PACKET_SIZE};
use crate::registry::PacketRegistry;
use bytes::{BufMut, Bytes, BytesMut};

/// Reads the declared total length of the frame at the start of `bytes`.
///
/// `Ok(None)` when fewer than two bytes are available.
pub fn peek_frame_len(bytes: &[u8]) -> Result<Option<usize>> {
    let Some(prefix) = bytes.get(..LENGTH_PREFIX_SIZE) else {
        return Ok(None);
    };
    let len = usize::from(u16::from_le_bytes([prefix[0], prefix[1]]));
    if len < HEADER_SIZE {
        return Err(CodecError::MalformedLength(format!(
            "declared length {len} is shorter than the {HEADER_SIZE}-byte header"
        )));
    }
    Ok(Some(len))
}

/// Encodes and decodes whole frames against a registry.
#[derive(Debug, Clone, Copy)]
pub struct PacketCodec<'a> {
    config: &'a CodecConfig,
    registry: &'a PacketRegistry,
}

impl PacketCodec<'static> {
    /// Default configuration and the standard registry.
    pub fn new() -> Self {
        Self {
            config: CodecConfig::shared_default(),
            registry: PacketRegistry::standard(),
        }
    }
}

impl Default for PacketCodec<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> PacketCodec<'a> {
    pub fn with_parts(config: &'a CodecConfig, registry: &'a PacketRegistry) -> Self {
        Self { config, registry }
    }

    pub fn config(&self) -> &'a CodecConfig {
        self.config
    }

    pub fn registry(&self) -> &'a PacketRegistry {
        self.registry
    }

    /// Encodes `packet` as sent by `side`.
    ///
    /// Nothing is produced when the frame would exceed the length limit.
    pub fn encode(&self, packet: &Packet, side: Side) -> Result<Bytes> {
        let mut out = BytesMut::new();
        self.encode_into(packet, side, &mut out)?;
        Ok(out.freeze())
    }

    /// Appends the frame for `packet` to `out`. `out` is untouched on error.
    pub fn encode_into(&self, packet: &Packet, side: Side, out: &mut BytesMut) -> Result<()> {
        let mut body = PacketWriter::with_config(self.config);
        packet.write_body(&mut body, side)?;

        let total = HEADER_SIZE + body.len();
        let max = self.config.max_packet_size.min(MAX_PACKET_SIZE);
        if total > max {
            return Err(CodecError::PacketTooLarge { size: total, max });
        }

        out.reserve(total);
        // total <= MAX_PACKET_SIZE, so it fits the u16 prefix
        out.put_u16_le(total as u16);
        out.put_u8(packet.type_id());
        out.put_slice(body.as_slice());

        trace_encode(packet, side, total);
        Ok(())
    }

    /// Decodes one frame read by `side`. Bytes after the frame are ignored.
    pub fn decode(&self, bytes: &[u8], side: Side) -> Result<Packet> {
        self.decode_frame(bytes, side).map(|(packet, _)| packet)
    }

    /// Decodes one frame and returns it with the number of bytes it occupied.
    pub fn decode_frame(&self, bytes: &[u8], side: Side) -> Result<(Packet, usize)> {
        let len = peek_frame_len(bytes)?.ok_or_else(|| CodecError::truncated(LENGTH_PREFIX_SIZE, bytes.len()))?;
        let frame = bytes
            .get(..len)
            .ok_or_else(|| CodecError::truncated(len, bytes.len()))?;

        let type_id = frame[LENGTH_PREFIX_SIZE];
        let mut reader = PacketReader::with_config(&frame[HEADER_SIZE..], self.config);
        let packet = self.registry.decode_by_type(type_id, &mut reader, side)?;

        if !reader.is_empty() && !self.registry.allows_trailer(type_id) {
            return Err(CodecError::UnconsumedBytes {
                packet_type: type_id,
                remaining: reader.remaining(),
            });
        }

        if self.config.enforce_direction && !packet.direction().receivable_by(side) {
            return Err(CodecError::UnexpectedDirection {
                packet_type: type_id,
                side: side.name(),
            });
        }

        trace_decode(&packet, side, len);
        Ok((packet, len))
    }
}
