//! Bit-exact codec for Terraria multiplayer packets.
//!
//! Frames are `[u16 LE total length][u8 type][body]`. Bodies are read and
//! written for a [`Side`]: a body written by the server is read by the
//! client, and a few packet types differ between the two directions.
//!
//! ```
//! use trwire::{PacketCodec, Packet, Side};
//! use trwire::packets::AddNpcBuff;
//!
//! let codec = PacketCodec::new();
//! let packet = codec.decode(&[9, 0, 53, 1, 0, 20, 0, 60, 0], Side::Server).unwrap();
//! assert_eq!(packet, Packet::from(AddNpcBuff::new(1, 20, 60)));
//! ```

pub mod compression;
pub mod config;
pub mod debug;
pub mod envelope;
pub mod error;
pub mod packets;
pub mod primitives;
pub mod protocol;
pub mod registry;
pub mod stream;
pub mod tile;
pub mod tile_codec;
pub mod tracking;

pub use config::{CodecConfig, FrameImportance};

pub use envelope::{peek_frame_len, PacketCodec};

pub use error::{CodecError, Result};

pub use packets::{NetPacket, Packet, UnknownPacket};

pub use primitives::{BitsByte, Color, HalfVector2, PacketReader, PacketWriter, Vector2};

pub use protocol::{Direction, PacketType, Side, MAX_PACKET_SIZE};

pub use registry::{DecodeFn, PacketRegistry};

pub use stream::{FrameDecoder, FrameEncoder, PacketStream};

pub use tile::{BlockShape, LiquidKind, Tile, TileFlags, TileFrame, TileGrid};

pub use tracking::{DirtyFlag, TrackedArray};

pub use debug::{format_bytes, hex_preview, log_packet, trace_compression, trace_decode, trace_encode};
