//! Incremental framing over a byte stream that arrives in arbitrary chunks.

use crate::debug::{hex_preview, log_packet};
use crate::envelope::{peek_frame_len, PacketCodec};
use crate::error::Result;
use crate::packets::Packet;
use crate::protocol::Side;
use bytes::{Bytes, BytesMut};
use tracing::warn;

const INITIAL_CAPACITY: usize = 8192;
const PREVIEW_BYTES: usize = 16;

/// Accumulates bytes and splits off complete frames.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: BytesMut,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_CAPACITY),
        }
    }

    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Bytes buffered but not yet returned as a frame.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Next complete frame, length prefix included. `Ok(None)` until enough
    /// bytes have been fed.
    ///
    /// A frame declaring a length below the header size poisons the stream;
    /// the buffer is cleared and the error returned.
    pub fn try_next_frame(&mut self) -> Result<Option<Bytes>> {
        let len = match peek_frame_len(&self.buffer) {
            Ok(Some(len)) => len,
            Ok(None) => return Ok(None),
            Err(e) => {
                warn!(buffered = self.buffer.len(), error = %e, "dropping unframeable stream bytes");
                self.buffer.clear();
                return Err(e);
            }
        };

        if self.buffer.len() < len {
            return Ok(None);
        }
        Ok(Some(self.buffer.split_to(len).freeze()))
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// Decodes packets from fed bytes as the given side.
#[derive(Debug)]
pub struct PacketStream<'a> {
    codec: PacketCodec<'a>,
    side: Side,
    frames: FrameDecoder,
}

impl<'a> PacketStream<'a> {
    pub fn new(codec: PacketCodec<'a>, side: Side) -> Self {
        Self {
            codec,
            side,
            frames: FrameDecoder::new(),
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn feed(&mut self, data: &[u8]) {
        self.frames.feed(data);
    }

    /// Next packet, or `Ok(None)` when no complete frame is buffered.
    ///
    /// A frame that fails to decode is consumed; later frames are still
    /// readable.
    pub fn next_packet(&mut self) -> Result<Option<Packet>> {
        let Some(frame) = self.frames.try_next_frame()? else {
            return Ok(None);
        };
        match self.codec.decode(&frame, self.side) {
            Ok(packet) => {
                log_packet("received", &packet);
                Ok(Some(packet))
            }
            Err(e) => {
                warn!(
                    type_id = frame[2],
                    len = frame.len(),
                    head = %hex_preview(&frame, PREVIEW_BYTES),
                    error = %e,
                    "rejected frame"
                );
                Err(e)
            }
        }
    }

    /// Decodes every complete buffered frame, stopping at the first error.
    pub fn drain(&mut self) -> Result<Vec<Packet>> {
        let mut packets = Vec::new();
        while let Some(packet) = self.next_packet()? {
            packets.push(packet);
        }
        Ok(packets)
    }
}

/// Batches encoded frames into one buffer.
#[derive(Debug)]
pub struct FrameEncoder<'a> {
    codec: PacketCodec<'a>,
    side: Side,
    buffer: BytesMut,
}

impl<'a> FrameEncoder<'a> {
    pub fn new(codec: PacketCodec<'a>, side: Side) -> Self {
        Self {
            codec,
            side,
            buffer: BytesMut::with_capacity(INITIAL_CAPACITY),
        }
    }

    /// Appends one frame. On error nothing is appended.
    pub fn write_packet(&mut self, packet: &Packet) -> Result<()> {
        self.codec.encode_into(packet, self.side, &mut self.buffer)?;
        log_packet("sent", packet);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Takes everything written so far.
    pub fn flush(&mut self) -> Bytes {
        self.buffer.split().freeze()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
