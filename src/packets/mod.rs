//! Packet variants and the closed [`Packet`] enum.
//!
//! Every variant implements [`NetPacket`]: it reads and writes its body (the
//! bytes after the type discriminant) for a given [`Side`] and tracks whether
//! it changed since it was last decoded or cleaned.

use crate::error::Result;
use crate::primitives::{PacketReader, PacketWriter};
use crate::protocol::{Direction, PacketType, Side};
use crate::registry::PacketRegistry;
use crate::tracking::DirtyFlag;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Getter plus dirty-marking setter for `Copy` fields.
macro_rules! accessors {
    ($($field:ident / $setter:ident : $ty:ty),* $(,)?) => {
        $(
            pub fn $field(&self) -> $ty {
                self.$field
            }

            pub fn $setter(&mut self, value: $ty) {
                self.$field = value;
                self.dirty.mark();
            }
        )*
    };
}

/// Declares a packet whose body is a fixed sequence of primitive fields,
/// identical for both sides.
macro_rules! fixed_packet {
    (
        $(#[$meta:meta])*
        $name:ident: $kind:ident, $direction:expr;
        { $($field:ident / $setter:ident : $ty:ty => $read:ident / $write:ident),* $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            $($field: $ty,)*
            #[serde(skip)]
            dirty: DirtyFlag,
        }

        impl $name {
            #[allow(clippy::too_many_arguments, clippy::new_without_default)]
            pub fn new($($field: $ty),*) -> Self {
                Self {
                    $($field,)*
                    dirty: DirtyFlag::dirty(),
                }
            }

            accessors!($($field / $setter: $ty),*);
        }

        impl NetPacket for $name {
            const TYPE: PacketType = PacketType::$kind;
            const DIRECTION: Direction = $direction;

            #[allow(unused_variables)]
            fn read(reader: &mut PacketReader<'_>, _side: Side) -> Result<Self> {
                Ok(Self {
                    $($field: reader.$read()?,)*
                    dirty: DirtyFlag::clean(),
                })
            }

            #[allow(unused_variables)]
            fn write(&self, writer: &mut PacketWriter<'_>, _side: Side) -> Result<()> {
                $(writer.$write(self.$field);)*
                Ok(())
            }

            fn is_dirty(&self) -> bool {
                self.dirty.is_set()
            }

            fn clean(&mut self) {
                self.dirty.clear();
            }
        }
    };
}

mod effects;
mod npc;
mod player;
mod section;
mod simple;

pub use effects::{CombatText, PlayLegacySound, PoofOfSmoke};
pub use npc::{AddNpcBuff, NpcBuff, NpcBuffs, NpcHome, NpcName, SyncNpc, NPC_AI_SLOTS, NPC_BUFF_SLOTS};
pub use player::{AddPlayerBuff, PlayerBuffs, PlayerHealth, PlayerMana, PlayerTeam, PLAYER_BUFF_SLOTS};
pub use section::{
    Chest, ItemSlot, SectionFrame, SendSection, Sign, TileEntity, TileEntityKind,
};
pub use simple::{
    ClientUuid, ConnectRequest, FinishConnection, KillProjectile, RequestEssentialTiles,
    RequestWorldInfo, SetTime, TileChange, ToggleDoor,
};

/// A packet variant with a fixed discriminant.
pub trait NetPacket: Sized {
    const TYPE: PacketType;
    const DIRECTION: Direction;
    /// Whether trailing body bytes after the known fields are tolerated.
    const VARIABLE_TRAILER: bool = false;

    /// Reads the body as seen by `side`. The result is clean.
    fn read(reader: &mut PacketReader<'_>, side: Side) -> Result<Self>;

    /// Writes the body as sent by `side`.
    fn write(&self, writer: &mut PacketWriter<'_>, side: Side) -> Result<()>;

    fn is_dirty(&self) -> bool;

    fn clean(&mut self);
}

/// Payload of a discriminant no variant claims. Re-encodes byte-for-byte.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnknownPacket {
    type_id: u8,
    payload: Bytes,
    #[serde(skip)]
    dirty: DirtyFlag,
}

impl UnknownPacket {
    pub fn new(type_id: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            type_id,
            payload: payload.into(),
            dirty: DirtyFlag::dirty(),
        }
    }

    pub(crate) fn decoded(type_id: u8, payload: &[u8]) -> Self {
        Self {
            type_id,
            payload: Bytes::copy_from_slice(payload),
            dirty: DirtyFlag::clean(),
        }
    }

    pub fn type_id(&self) -> u8 {
        self.type_id
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn set_payload(&mut self, payload: impl Into<Bytes>) {
        self.payload = payload.into();
        self.dirty.mark();
    }

    pub fn write(&self, writer: &mut PacketWriter<'_>) {
        writer.write_bytes(&self.payload);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.is_set()
    }

    pub fn clean(&mut self) {
        self.dirty.clear();
    }
}

/// Decoder for a registered variant, usable as a registry entry.
pub fn decode_variant<P>(reader: &mut PacketReader<'_>, side: Side) -> Result<Packet>
where
    P: NetPacket + Into<Packet>,
{
    P::read(reader, side).map(Into::into)
}

macro_rules! packet_enum {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub enum Packet {
            $($variant($ty),)*
            Unknown(UnknownPacket),
        }

        impl Packet {
            /// Wire discriminant.
            pub fn type_id(&self) -> u8 {
                match self {
                    $(Packet::$variant(_) => <$ty as NetPacket>::TYPE.as_u8(),)*
                    Packet::Unknown(packet) => packet.type_id(),
                }
            }

            /// `None` for unknown packets.
            pub fn packet_type(&self) -> Option<PacketType> {
                match self {
                    $(Packet::$variant(_) => Some(<$ty as NetPacket>::TYPE),)*
                    Packet::Unknown(_) => None,
                }
            }

            pub fn direction(&self) -> Direction {
                match self {
                    $(Packet::$variant(_) => <$ty as NetPacket>::DIRECTION,)*
                    Packet::Unknown(_) => Direction::BOTH,
                }
            }

            pub fn name(&self) -> &'static str {
                match self {
                    $(Packet::$variant(_) => stringify!($variant),)*
                    Packet::Unknown(_) => "Unknown",
                }
            }

            /// Writes the body only (no length prefix or discriminant).
            pub fn write_body(&self, writer: &mut PacketWriter<'_>, side: Side) -> Result<()> {
                match self {
                    $(Packet::$variant(packet) => packet.write(writer, side),)*
                    Packet::Unknown(packet) => {
                        packet.write(writer);
                        Ok(())
                    }
                }
            }

            pub fn is_dirty(&self) -> bool {
                match self {
                    $(Packet::$variant(packet) => packet.is_dirty(),)*
                    Packet::Unknown(packet) => packet.is_dirty(),
                }
            }

            pub fn clean(&mut self) {
                match self {
                    $(Packet::$variant(packet) => packet.clean(),)*
                    Packet::Unknown(packet) => packet.clean(),
                }
            }
        }

        $(
            impl From<$ty> for Packet {
                fn from(packet: $ty) -> Self {
                    Packet::$variant(packet)
                }
            }
        )*

        pub(crate) fn register_standard(registry: &mut PacketRegistry) {
            $(registry.register_packet::<$ty>();)*
        }
    };
}

packet_enum! {
    ConnectRequest(ConnectRequest),
    RequestWorldInfo(RequestWorldInfo),
    RequestEssentialTiles(RequestEssentialTiles),
    SendSection(SendSection),
    SectionFrame(SectionFrame),
    PlayerHealth(PlayerHealth),
    TileChange(TileChange),
    SetTime(SetTime),
    ToggleDoor(ToggleDoor),
    SyncNpc(SyncNpc),
    KillProjectile(KillProjectile),
    PlayerMana(PlayerMana),
    PlayerTeam(PlayerTeam),
    FinishConnection(FinishConnection),
    PlayerBuffs(PlayerBuffs),
    AddNpcBuff(AddNpcBuff),
    NpcBuffs(NpcBuffs),
    AddPlayerBuff(AddPlayerBuff),
    NpcName(NpcName),
    NpcHome(NpcHome),
    ClientUuid(ClientUuid),
    CombatText(CombatText),
    PoofOfSmoke(PoofOfSmoke),
    PlayLegacySound(PlayLegacySound),
}

impl From<UnknownPacket> for Packet {
    fn from(packet: UnknownPacket) -> Self {
        Packet::Unknown(packet)
    }
}

impl Packet {
    /// One-line description used in logs.
    pub fn summary(&self) -> String {
        let dirty = if self.is_dirty() { " dirty" } else { "" };
        match self {
            Packet::Unknown(packet) => format!(
                "Unknown({}) {} payload bytes{}",
                packet.type_id(),
                packet.payload().len(),
                dirty
            ),
            other => format!("{}({}){}", other.name(), other.type_id(), dirty),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::primitives::{PacketReader, PacketWriter};

    /// Writes `packet` as `side` and reads it back as the opposite side,
    /// asserting the whole body was consumed.
    /// Writes `packet` as `side` and reads it back as the receiving side.
    pub fn round_trip<P: NetPacket>(packet: &P, side: Side) -> (Vec<u8>, P) {
        let mut writer = PacketWriter::new();
        packet.write(&mut writer, side).unwrap();
        let body = writer.as_slice().to_vec();
        let mut reader = PacketReader::new(&body);
        let decoded = P::read(&mut reader, side.opposite()).unwrap();
        assert!(reader.is_empty(), "{} body bytes unread", reader.remaining());
        (body, decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_metadata() {
        let packet: Packet = AddNpcBuff::new(1, 20, 60).into();
        assert_eq!(packet.type_id(), 53);
        assert_eq!(packet.packet_type(), Some(PacketType::AddNpcBuff));
        assert_eq!(packet.name(), "AddNpcBuff");
        assert_eq!(packet.summary(), "AddNpcBuff(53) dirty");

        let unknown: Packet = UnknownPacket::new(200, vec![1, 2, 3]).into();
        assert_eq!(unknown.type_id(), 200);
        assert_eq!(unknown.packet_type(), None);
        assert_eq!(unknown.direction(), Direction::BOTH);
    }

    #[test]
    fn test_every_type_has_a_variant() {
        let registry = PacketRegistry::standard();
        for packet_type in PacketType::ALL {
            assert!(registry.contains(packet_type.as_u8()), "{packet_type} missing");
        }
        assert_eq!(registry.len(), PacketType::ALL.len());
    }

    #[test]
    fn test_clean_through_enum() {
        let mut packet: Packet = PlayerTeam::new(3, 1).into();
        assert!(packet.is_dirty());
        packet.clean();
        assert!(!packet.is_dirty());
        assert_eq!(packet.summary(), "PlayerTeam(45)");
    }

    #[test]
    fn test_unknown_payload_setter() {
        let mut packet = UnknownPacket::decoded(99, &[4, 5]);
        assert!(!packet.is_dirty());
        packet.set_payload(vec![6]);
        assert!(packet.is_dirty());
        let mut writer = PacketWriter::new();
        packet.write(&mut writer);
        assert_eq!(writer.as_slice(), &[6]);
    }

    #[test]
    fn test_packet_json_dump() {
        let packet: Packet = PlayerTeam::new(3, 1).into();
        let json = serde_json::to_string(&packet).unwrap();
        assert_eq!(json, r#"{"PlayerTeam":{"player":3,"team":1}}"#);
    }
}
