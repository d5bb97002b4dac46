//! NPC state, naming and buff packets.

use super::NetPacket;
use crate::error::{CodecError, Result};
use crate::primitives::{BitsByte, PacketReader, PacketWriter, Vector2};
use crate::protocol::{Direction, PacketType, Side};
use crate::tracking::{DirtyFlag, TrackedArray};
use serde::{Deserialize, Serialize};

/// AI state floats carried by [`SyncNpc`].
pub const NPC_AI_SLOTS: usize = 4;

/// Buff slots an NPC carries.
pub const NPC_BUFF_SLOTS: usize = 20;

// SyncNpc first flag byte
const FACING: usize = 0;
const FACING_Y: usize = 1;
const AI_BASE: usize = 2;
const SPRITE_FACING: usize = 6;
const FULL_LIFE: usize = 7;

// SyncNpc second flag byte
const HAS_PLAYER_COUNT: usize = 0;
const FROM_STATUE: usize = 1;
const HAS_STRENGTH: usize = 2;

/// Position, motion, AI and life of one NPC.
///
/// Which optional fields are present on the wire is decided by two flag
/// bytes: each non-zero AI slot sets a bit, and life is omitted entirely
/// when the NPC is at full health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncNpc {
    index: i16,
    position: Vector2,
    velocity: Vector2,
    target: u16,
    direction: bool,
    direction_y: bool,
    sprite_direction: bool,
    ai: TrackedArray<f32>,
    net_id: i16,
    player_count: Option<u8>,
    spawned_from_statue: bool,
    strength: Option<f32>,
    /// `None` at full life.
    life: Option<i32>,
    #[serde(skip)]
    dirty: DirtyFlag,
}

impl SyncNpc {
    pub fn new(index: i16, net_id: i16) -> Self {
        Self {
            index,
            position: Vector2::ZERO,
            velocity: Vector2::ZERO,
            target: 0,
            direction: false,
            direction_y: false,
            sprite_direction: false,
            ai: TrackedArray::new(NPC_AI_SLOTS),
            net_id,
            player_count: None,
            spawned_from_statue: false,
            strength: None,
            life: None,
            dirty: DirtyFlag::dirty(),
        }
    }

    accessors!(
        index / set_index: i16,
        position / set_position: Vector2,
        velocity / set_velocity: Vector2,
        target / set_target: u16,
        direction / set_direction: bool,
        direction_y / set_direction_y: bool,
        sprite_direction / set_sprite_direction: bool,
        net_id / set_net_id: i16,
        player_count / set_player_count: Option<u8>,
        spawned_from_statue / set_spawned_from_statue: bool,
        strength / set_strength: Option<f32>,
        life / set_life: Option<i32>,
    );

    pub fn ai(&self) -> &TrackedArray<f32> {
        &self.ai
    }

    pub fn ai_mut(&mut self) -> &mut TrackedArray<f32> {
        &mut self.ai
    }

    fn flags(&self) -> (BitsByte, BitsByte) {
        let mut first = BitsByte::new()
            .with(FACING, self.direction)
            .with(FACING_Y, self.direction_y)
            .with(SPRITE_FACING, self.sprite_direction)
            .with(FULL_LIFE, self.life.is_none());
        for (slot, value) in self.ai.iter().enumerate() {
            first.set(AI_BASE + slot, *value != 0.0);
        }
        let second = BitsByte::new()
            .with(HAS_PLAYER_COUNT, self.player_count.is_some())
            .with(FROM_STATUE, self.spawned_from_statue)
            .with(HAS_STRENGTH, self.strength.is_some());
        (first, second)
    }
}

fn read_life(reader: &mut PacketReader<'_>) -> Result<i32> {
    match reader.read_u8()? {
        1 => Ok(i32::from(reader.read_i8()?)),
        2 => Ok(i32::from(reader.read_i16()?)),
        4 => reader.read_i32(),
        width => Err(CodecError::InvalidValue(format!("npc life width {width}"))),
    }
}

fn write_life(writer: &mut PacketWriter<'_>, life: i32) {
    if let Ok(life) = i8::try_from(life) {
        writer.write_u8(1);
        writer.write_i8(life);
    } else if let Ok(life) = i16::try_from(life) {
        writer.write_u8(2);
        writer.write_i16(life);
    } else {
        writer.write_u8(4);
        writer.write_i32(life);
    }
}

impl NetPacket for SyncNpc {
    const TYPE: PacketType = PacketType::SyncNpc;
    const DIRECTION: Direction = Direction::TO_CLIENT;

    fn read(reader: &mut PacketReader<'_>, _side: Side) -> Result<Self> {
        let index = reader.read_i16()?;
        let position = reader.read_vector2()?;
        let velocity = reader.read_vector2()?;
        let target = reader.read_u16()?;
        let first = reader.read_bits_byte()?;
        let second = reader.read_bits_byte()?;

        let mut ai = vec![0.0f32; NPC_AI_SLOTS];
        for (slot, value) in ai.iter_mut().enumerate() {
            if first.get(AI_BASE + slot) {
                *value = reader.read_f32()?;
            }
        }
        let net_id = reader.read_i16()?;
        let player_count = if second.get(HAS_PLAYER_COUNT) {
            Some(reader.read_u8()?)
        } else {
            None
        };
        let strength = if second.get(HAS_STRENGTH) {
            Some(reader.read_f32()?)
        } else {
            None
        };
        let life = if first.get(FULL_LIFE) {
            None
        } else {
            Some(read_life(reader)?)
        };

        Ok(Self {
            index,
            position,
            velocity,
            target,
            direction: first.get(FACING),
            direction_y: first.get(FACING_Y),
            sprite_direction: first.get(SPRITE_FACING),
            ai: TrackedArray::from_vec(ai),
            net_id,
            player_count,
            spawned_from_statue: second.get(FROM_STATUE),
            strength,
            life,
            dirty: DirtyFlag::clean(),
        })
    }

    fn write(&self, writer: &mut PacketWriter<'_>, _side: Side) -> Result<()> {
        let (first, second) = self.flags();
        writer.write_i16(self.index);
        writer.write_vector2(self.position);
        writer.write_vector2(self.velocity);
        writer.write_u16(self.target);
        writer.write_bits_byte(first);
        writer.write_bits_byte(second);
        for &value in self.ai.iter().filter(|value| **value != 0.0) {
            writer.write_f32(value);
        }
        writer.write_i16(self.net_id);
        if let Some(count) = self.player_count {
            writer.write_u8(count);
        }
        if let Some(strength) = self.strength {
            writer.write_f32(strength);
        }
        if let Some(life) = self.life {
            write_life(writer, life);
        }
        Ok(())
    }

    fn is_dirty(&self) -> bool {
        self.dirty.is_set() || self.ai.is_dirty()
    }

    fn clean(&mut self) {
        self.dirty.clear();
        self.ai.clean();
    }
}

/// Display name of a town NPC.
///
/// Only the server sends the name and variant; a client asking for them
/// sends just the NPC index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcName {
    npc: i16,
    name: String,
    town_variant: i32,
    #[serde(skip)]
    dirty: DirtyFlag,
}

impl NpcName {
    pub fn new(npc: i16, name: impl Into<String>, town_variant: i32) -> Self {
        Self {
            npc,
            name: name.into(),
            town_variant,
            dirty: DirtyFlag::dirty(),
        }
    }

    /// The client's request form, without name or variant.
    pub fn request(npc: i16) -> Self {
        Self::new(npc, String::new(), 0)
    }

    accessors!(npc / set_npc: i16, town_variant / set_town_variant: i32);

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.dirty.mark();
    }
}

impl NetPacket for NpcName {
    const TYPE: PacketType = PacketType::NpcName;
    const DIRECTION: Direction = Direction::BOTH;

    fn read(reader: &mut PacketReader<'_>, side: Side) -> Result<Self> {
        let npc = reader.read_i16()?;
        let (name, town_variant) = match side {
            Side::Client => (reader.read_string()?, reader.read_i32()?),
            Side::Server => (String::new(), 0),
        };
        Ok(Self {
            npc,
            name,
            town_variant,
            dirty: DirtyFlag::clean(),
        })
    }

    fn write(&self, writer: &mut PacketWriter<'_>, side: Side) -> Result<()> {
        writer.write_i16(self.npc);
        if side.is_server() {
            writer.write_string(&self.name)?;
            writer.write_i32(self.town_variant);
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

/// One entry of [`NpcBuffs`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpcBuff {
    pub buff: u16,
    pub ticks: i16,
}

impl NpcBuff {
    pub fn new(buff: u16, ticks: i16) -> Self {
        Self { buff, ticks }
    }
}

/// All buff slots of an NPC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcBuffs {
    npc: i16,
    buffs: TrackedArray<NpcBuff>,
    #[serde(skip)]
    dirty: DirtyFlag,
}

impl NpcBuffs {
    pub fn new(npc: i16) -> Self {
        Self {
            npc,
            buffs: TrackedArray::new(NPC_BUFF_SLOTS),
            dirty: DirtyFlag::dirty(),
        }
    }

    accessors!(npc / set_npc: i16);

    pub fn buffs(&self) -> &TrackedArray<NpcBuff> {
        &self.buffs
    }

    pub fn buffs_mut(&mut self) -> &mut TrackedArray<NpcBuff> {
        &mut self.buffs
    }
}

impl NetPacket for NpcBuffs {
    const TYPE: PacketType = PacketType::NpcBuffs;
    const DIRECTION: Direction = Direction::TO_CLIENT;

    fn read(reader: &mut PacketReader<'_>, _side: Side) -> Result<Self> {
        let npc = reader.read_i16()?;
        let mut buffs = Vec::with_capacity(NPC_BUFF_SLOTS);
        for _ in 0..NPC_BUFF_SLOTS {
            let buff = reader.read_u16()?;
            let ticks = reader.read_i16()?;
            buffs.push(NpcBuff { buff, ticks });
        }
        Ok(Self {
            npc,
            buffs: TrackedArray::from_vec(buffs),
            dirty: DirtyFlag::clean(),
        })
    }

    fn write(&self, writer: &mut PacketWriter<'_>, _side: Side) -> Result<()> {
        writer.write_i16(self.npc);
        for slot in &self.buffs {
            writer.write_u16(slot.buff);
            writer.write_i16(slot.ticks);
        }
        Ok(())
    }

    fn is_dirty(&self) -> bool {
        self.dirty.is_set() || self.buffs.is_dirty()
    }

    fn clean(&mut self) {
        self.dirty.clear();
        self.buffs.clean();
    }
}

fixed_packet! {
    /// Applies one buff to an NPC.
    AddNpcBuff: AddNpcBuff, Direction::BOTH;
    {
        npc / set_npc: i16 => read_i16 / write_i16,
        buff / set_buff: u16 => read_u16 / write_u16,
        ticks / set_ticks: i16 => read_i16 / write_i16,
    }
}

fixed_packet! {
    NpcHome: NpcHome, Direction::BOTH;
    {
        npc / set_npc: i16 => read_i16 / write_i16,
        x / set_x: i16 => read_i16 / write_i16,
        y / set_y: i16 => read_i16 / write_i16,
        homeless / set_homeless: u8 => read_u8 / write_u8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packets::test_support::round_trip;

    #[test]
    fn test_add_npc_buff_layout() {
        let packet = AddNpcBuff::new(1, 20, 60);
        let (body, decoded) = round_trip(&packet, Side::Client);
        assert_eq!(body, vec![1, 0, 20, 0, 60, 0]);
        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_sync_npc_full_life_minimal() {
        let packet = SyncNpc::new(3, 17);
        let (body, decoded) = round_trip(&packet, Side::Server);
        // index, position, velocity, target, flags, net id
        assert_eq!(body.len(), 2 + 8 + 8 + 2 + 2 + 2);
        assert_eq!(body[20], 0b1000_0000);
        assert_eq!(body[21], 0);
        assert_eq!(decoded, packet);
        assert_eq!(decoded.life(), None);
    }

    #[test]
    fn test_sync_npc_optional_fields() {
        let mut packet = SyncNpc::new(3, 17);
        packet.set_position(Vector2::new(16.0, 32.0));
        packet.set_direction(true);
        packet.ai_mut().set(1, 2.5).unwrap();
        packet.ai_mut().set(3, -1.0).unwrap();
        packet.set_player_count(Some(4));
        packet.set_strength(Some(1.5));
        packet.set_life(Some(300));

        let (body, decoded) = round_trip(&packet, Side::Server);
        // direction, ai[1], ai[3]; not full life
        assert_eq!(body[20], 0b0010_1001);
        assert_eq!(body[21], 0b0000_0101);
        // two ai floats, net id, player count, strength, life width + i16
        assert_eq!(body.len(), 22 + 8 + 2 + 1 + 4 + 3);
        assert_eq!(&body[body.len() - 3..], &[2, 0x2C, 0x01]);
        assert_eq!(decoded, packet);
        assert_eq!(decoded.ai().as_slice(), &[0.0, 2.5, 0.0, -1.0]);
    }

    #[test]
    fn test_sync_npc_life_widths() {
        for (life, width) in [(5, 1u8), (-100, 1), (1000, 2), (100_000, 4)] {
            let mut packet = SyncNpc::new(0, 1);
            packet.set_life(Some(life));
            let (body, decoded) = round_trip(&packet, Side::Server);
            assert_eq!(body[24], width);
            assert_eq!(decoded.life(), Some(life));
        }
    }

    #[test]
    fn test_sync_npc_bad_life_width() {
        let mut packet = SyncNpc::new(0, 1);
        packet.set_life(Some(5));
        let mut writer = PacketWriter::new();
        packet.write(&mut writer, Side::Server).unwrap();
        let mut body = writer.as_slice().to_vec();
        body[24] = 3;
        let mut reader = PacketReader::new(&body);
        assert!(matches!(
            SyncNpc::read(&mut reader, Side::Client),
            Err(CodecError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_sync_npc_ai_dirty() {
        let mut packet = SyncNpc::new(0, 1);
        packet.clean();
        packet.ai_mut().set(0, 1.0).unwrap();
        assert!(packet.is_dirty());
        packet.clean();
        assert!(!packet.is_dirty());
        assert_eq!(packet.ai().get(0), Some(&1.0));
    }

    #[test]
    fn test_npc_name_written_by_server() {
        let packet = NpcName::new(7, "Andrew", 1);
        let (body, decoded) = round_trip(&packet, Side::Server);
        let mut expected = vec![7, 0, 6];
        expected.extend_from_slice(b"Andrew");
        expected.extend_from_slice(&[1, 0, 0, 0]);
        assert_eq!(body, expected);
        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_npc_name_written_by_client() {
        let packet = NpcName::new(7, "Andrew", 1);
        let (body, decoded) = round_trip(&packet, Side::Client);
        assert_eq!(body, vec![7, 0]);
        assert_eq!(decoded, NpcName::request(7));
    }

    #[test]
    fn test_npc_name_decoded_by_sender_side_leaves_bytes() {
        // the server reading its own body expects the short request form
        let mut writer = PacketWriter::new();
        NpcName::new(7, "Guide", 0).write(&mut writer, Side::Server).unwrap();
        let body = writer.as_slice().to_vec();
        let mut reader = PacketReader::new(&body);
        NpcName::read(&mut reader, Side::Server).unwrap();
        assert!(!reader.is_empty());
    }

    #[test]
    fn test_npc_buffs() {
        let mut packet = NpcBuffs::new(12);
        packet.buffs_mut().set(0, NpcBuff::new(20, 600)).unwrap();
        let (body, decoded) = round_trip(&packet, Side::Server);
        assert_eq!(body.len(), 2 + 4 * NPC_BUFF_SLOTS);
        assert_eq!(&body[..6], &[12, 0, 20, 0, 0x58, 0x02]);
        assert_eq!(decoded.buffs().get(0), Some(&NpcBuff::new(20, 600)));
        assert!(!decoded.is_dirty());
    }

    #[test]
    fn test_npc_home() {
        let mut packet = NpcHome::new(4, 100, 200, 0);
        packet.clean();
        packet.set_homeless(1);
        assert!(packet.is_dirty());
        let (body, _) = round_trip(&packet, Side::Client);
        assert_eq!(body, vec![4, 0, 100, 0, 200, 0, 1]);
    }
}
