use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of the little-endian `u16` total-length prefix.
pub const LENGTH_PREFIX_SIZE: usize = 2;

/// Size of the packet type discriminant.
pub const TYPE_SIZE: usize = 1;

/// Length prefix plus discriminant.
pub const HEADER_SIZE: usize = LENGTH_PREFIX_SIZE + TYPE_SIZE;

/// Largest total length the `u16` prefix can carry.
pub const MAX_PACKET_SIZE: usize = u16::MAX as usize;

/// Wire discriminants of the packet variants this crate understands.
///
/// Anything else on the wire is carried by [`crate::packets::UnknownPacket`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PacketType {
    ConnectRequest = 1,
    RequestWorldInfo = 6,
    RequestEssentialTiles = 8,
    SendSection = 10,
    SectionFrame = 11,
    PlayerHealth = 16,
    TileChange = 17,
    SetTime = 18,
    ToggleDoor = 19,
    SyncNpc = 23,
    KillProjectile = 29,
    PlayerMana = 42,
    PlayerTeam = 45,
    FinishConnection = 49,
    PlayerBuffs = 50,
    AddNpcBuff = 53,
    NpcBuffs = 54,
    AddPlayerBuff = 55,
    NpcName = 56,
    NpcHome = 60,
    ClientUuid = 68,
    CombatText = 81,
    PoofOfSmoke = 106,
    PlayLegacySound = 132,
}

impl PacketType {
    pub const ALL: [PacketType; 24] = [
        PacketType::ConnectRequest,
        PacketType::RequestWorldInfo,
        PacketType::RequestEssentialTiles,
        PacketType::SendSection,
        PacketType::SectionFrame,
        PacketType::PlayerHealth,
        PacketType::TileChange,
        PacketType::SetTime,
        PacketType::ToggleDoor,
        PacketType::SyncNpc,
        PacketType::KillProjectile,
        PacketType::PlayerMana,
        PacketType::PlayerTeam,
        PacketType::FinishConnection,
        PacketType::PlayerBuffs,
        PacketType::AddNpcBuff,
        PacketType::NpcBuffs,
        PacketType::AddPlayerBuff,
        PacketType::NpcName,
        PacketType::NpcHome,
        PacketType::ClientUuid,
        PacketType::CombatText,
        PacketType::PoofOfSmoke,
        PacketType::PlayLegacySound,
    ];

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_u8() == value)
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.as_u8())
    }
}

/// Serialization context: which role is performing a read or write.
///
/// A body written with `Side::Server` is read by a peer using `Side::Client`
/// and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Client,
    Server,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Client => Side::Server,
            Side::Server => Side::Client,
        }
    }

    pub fn is_server(self) -> bool {
        self == Side::Server
    }

    pub fn is_client(self) -> bool {
        self == Side::Client
    }

    pub fn name(self) -> &'static str {
        match self {
            Side::Client => "client",
            Side::Server => "server",
        }
    }
}

/// Which peers a packet type may be addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Direction {
    pub to_client: bool,
    pub to_server: bool,
}

impl Direction {
    pub const BOTH: Direction = Direction { to_client: true, to_server: true };
    pub const TO_CLIENT: Direction = Direction { to_client: true, to_server: false };
    pub const TO_SERVER: Direction = Direction { to_client: false, to_server: true };

    /// Whether a peer acting as `receiver` may legitimately read this packet.
    pub fn receivable_by(self, receiver: Side) -> bool {
        match receiver {
            Side::Client => self.to_client,
            Side::Server => self.to_server,
        }
    }

    /// Whether a peer acting as `sender` may legitimately write this packet.
    pub fn sendable_by(self, sender: Side) -> bool {
        self.receivable_by(sender.opposite())
    }
}
