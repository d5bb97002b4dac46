//! Player stat and buff packets.

use super::NetPacket;
use crate::error::Result;
use crate::primitives::{PacketReader, PacketWriter};
use crate::protocol::{Direction, PacketType, Side};
use crate::tracking::{DirtyFlag, TrackedArray};
use serde::{Deserialize, Serialize};

/// Buff slots a player carries.
pub const PLAYER_BUFF_SLOTS: usize = 44;

fixed_packet! {
    PlayerHealth: PlayerHealth, Direction::BOTH;
    {
        player / set_player: u8 => read_u8 / write_u8,
        life / set_life: i16 => read_i16 / write_i16,
        max_life / set_max_life: i16 => read_i16 / write_i16,
    }
}

fixed_packet! {
    PlayerMana: PlayerMana, Direction::BOTH;
    {
        player / set_player: u8 => read_u8 / write_u8,
        mana / set_mana: i16 => read_i16 / write_i16,
        max_mana / set_max_mana: i16 => read_i16 / write_i16,
    }
}

fixed_packet! {
    PlayerTeam: PlayerTeam, Direction::BOTH;
    {
        player / set_player: u8 => read_u8 / write_u8,
        team / set_team: u8 => read_u8 / write_u8,
    }
}

fixed_packet! {
    /// Applies one buff to a player for `ticks` game ticks.
    AddPlayerBuff: AddPlayerBuff, Direction::BOTH;
    {
        player / set_player: u8 => read_u8 / write_u8,
        buff / set_buff: u16 => read_u16 / write_u16,
        ticks / set_ticks: i32 => read_i32 / write_i32,
    }
}

/// Full buff bar of a player: 44 buff ids, 0 for an empty slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerBuffs {
    player: u8,
    buffs: TrackedArray<u16>,
    #[serde(skip)]
    dirty: DirtyFlag,
}

impl PlayerBuffs {
    pub fn new(player: u8) -> Self {
        Self {
            player,
            buffs: TrackedArray::new(PLAYER_BUFF_SLOTS),
            dirty: DirtyFlag::dirty(),
        }
    }

    accessors!(player / set_player: u8);

    pub fn buffs(&self) -> &TrackedArray<u16> {
        &self.buffs
    }

    /// Mutable access to the buff slots; writes through it mark the packet dirty.
    pub fn buffs_mut(&mut self) -> &mut TrackedArray<u16> {
        &mut self.buffs
    }
}

impl NetPacket for PlayerBuffs {
    const TYPE: PacketType = PacketType::PlayerBuffs;
    const DIRECTION: Direction = Direction::BOTH;

    fn read(reader: &mut PacketReader<'_>, _side: Side) -> Result<Self> {
        let player = reader.read_u8()?;
        let mut buffs = Vec::with_capacity(PLAYER_BUFF_SLOTS);
        for _ in 0..PLAYER_BUFF_SLOTS {
            buffs.push(reader.read_u16()?);
        }
        Ok(Self {
            player,
            buffs: TrackedArray::from_vec(buffs),
            dirty: DirtyFlag::clean(),
        })
    }

    fn write(&self, writer: &mut PacketWriter<'_>, _side: Side) -> Result<()> {
        writer.write_u8(self.player);
        for &buff in &self.buffs {
            writer.write_u16(buff);
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
