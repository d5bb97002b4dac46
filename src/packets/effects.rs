//! Visual and audio effect packets.

use super::NetPacket;
use crate::error::Result;
use crate::primitives::{BitsByte, Color, HalfVector2, PacketReader, PacketWriter, Vector2};
use crate::protocol::{Direction, PacketType, Side};
use crate::tracking::DirtyFlag;
use serde::{Deserialize, Serialize};

fixed_packet! {
    /// Floating number shown above a position.
    CombatText: CombatText, Direction::TO_CLIENT;
    {
        position / set_position: Vector2 => read_vector2 / write_vector2,
        color / set_color: Color => read_color / write_color,
        amount / set_amount: i32 => read_i32 / write_i32,
    }
}

fixed_packet! {
    /// Smoke puff at a half-precision position.
    PoofOfSmoke: PoofOfSmoke, Direction::TO_CLIENT;
    {
        position / set_position: HalfVector2 => read_half_vector2 / write_half_vector2,
    }
}

const HAS_STYLE: usize = 0;
const HAS_VOLUME: usize = 1;
const HAS_PITCH: usize = 2;

/// Plays a legacy sound id. Style, volume and pitch are only on the wire
/// when set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayLegacySound {
    position: Vector2,
    sound: u16,
    style: Option<i32>,
    volume: Option<f32>,
    pitch: Option<f32>,
    #[serde(skip)]
    dirty: DirtyFlag,
}

impl PlayLegacySound {
    pub fn new(position: Vector2, sound: u16) -> Self {
        Self {
            position,
            sound,
            style: None,
            volume: None,
            pitch: None,
            dirty: DirtyFlag::dirty(),
        }
    }

    accessors!(
        position / set_position: Vector2,
        sound / set_sound: u16,
        style / set_style: Option<i32>,
        volume / set_volume: Option<f32>,
        pitch / set_pitch: Option<f32>,
    );
}

impl NetPacket for PlayLegacySound {
    const TYPE: PacketType = PacketType::PlayLegacySound;
    const DIRECTION: Direction = Direction::TO_CLIENT;

    fn read(reader: &mut PacketReader<'_>, _side: Side) -> Result<Self> {
        let position = reader.read_vector2()?;
        let sound = reader.read_u16()?;
        let flags = reader.read_bits_byte()?;
        let style = if flags.get(HAS_STYLE) {
            Some(reader.read_i32()?)
        } else {
            None
        };
        let volume = if flags.get(HAS_VOLUME) {
            Some(reader.read_f32()?)
        } else {
            None
        };
        let pitch = if flags.get(HAS_PITCH) {
            Some(reader.read_f32()?)
        } else {
            None
        };
        Ok(Self {
            position,
            sound,
            style,
            volume,
            pitch,
            dirty: DirtyFlag::clean(),
        })
    }

    fn write(&self, writer: &mut PacketWriter<'_>, _side: Side) -> Result<()> {
        let flags = BitsByte::new()
            .with(HAS_STYLE, self.style.is_some())
            .with(HAS_VOLUME, self.volume.is_some())
            .with(HAS_PITCH, self.pitch.is_some());
        writer.write_vector2(self.position);
        writer.write_u16(self.sound);
        writer.write_bits_byte(flags);
        if let Some(style) = self.style {
            writer.write_i32(style);
        }
        if let Some(volume) = self.volume {
            writer.write_f32(volume);
        }
        if let Some(pitch) = self.pitch {
            writer.write_f32(pitch);
        }
        Ok(())
    }

    fn is_dirty(&self) -> bool {
        self.dirty.is_set()
    }

    fn clean(&mut self) {
        self.dirty.clear();
    }
}
