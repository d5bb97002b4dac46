//! Connection handshake and small world-state packets.

use super::NetPacket;
use crate::error::Result;
use crate::primitives::{PacketReader, PacketWriter};
use crate::protocol::{Direction, PacketType, Side};
use crate::tracking::DirtyFlag;
use serde::{Deserialize, Serialize};

/// First packet of a session: the client's protocol version string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectRequest {
    version: String,
    #[serde(skip)]
    dirty: DirtyFlag,
}

impl ConnectRequest {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            dirty: DirtyFlag::dirty(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn set_version(&mut self, version: impl Into<String>) {
        self.version = version.into();
        self.dirty.mark();
    }
}

impl NetPacket for ConnectRequest {
    const TYPE: PacketType = PacketType::ConnectRequest;
    const DIRECTION: Direction = Direction::TO_SERVER;

    fn read(reader: &mut PacketReader<'_>, _side: Side) -> Result<Self> {
        Ok(Self {
            version: reader.read_string()?,
            dirty: DirtyFlag::clean(),
        })
    }

    fn write(&self, writer: &mut PacketWriter<'_>, _side: Side) -> Result<()> {
        writer.write_string(&self.version)
    }

    fn is_dirty(&self) -> bool {
        self.dirty.is_set()
    }

    fn clean(&mut self) {
        self.dirty.clear();
    }
}

/// Client identifier sent during the handshake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientUuid {
    uuid: String,
    #[serde(skip)]
    dirty: DirtyFlag,
}

impl ClientUuid {
    pub fn new(uuid: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            dirty: DirtyFlag::dirty(),
        }
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn set_uuid(&mut self, uuid: impl Into<String>) {
        self.uuid = uuid.into();
        self.dirty.mark();
    }
}

impl NetPacket for ClientUuid {
    const TYPE: PacketType = PacketType::ClientUuid;
    const DIRECTION: Direction = Direction::TO_SERVER;

    fn read(reader: &mut PacketReader<'_>, _side: Side) -> Result<Self> {
        Ok(Self {
            uuid: reader.read_string()?,
            dirty: DirtyFlag::clean(),
        })
    }

    fn write(&self, writer: &mut PacketWriter<'_>, _side: Side) -> Result<()> {
        writer.write_string(&self.uuid)
    }

    fn is_dirty(&self) -> bool {
        self.dirty.is_set()
    }

    fn clean(&mut self) {
        self.dirty.clear();
    }
}

fixed_packet! {
    /// Asks the server for world metadata. Empty body.
    RequestWorldInfo: RequestWorldInfo, Direction::TO_SERVER;
    {}
}

fixed_packet! {
    /// Tells the client the connection handshake is complete. Empty body.
    FinishConnection: FinishConnection, Direction::TO_CLIENT;
    {}
}

fixed_packet! {
    /// Requests the sections around a spawn point; `-1, -1` means the world spawn.
    RequestEssentialTiles: RequestEssentialTiles, Direction::TO_SERVER;
    {
        spawn_x / set_spawn_x: i32 => read_i32 / write_i32,
        spawn_y / set_spawn_y: i32 => read_i32 / write_i32,
    }
}

fixed_packet! {
    TileChange: TileChange, Direction::BOTH;
    {
        action / set_action: u8 => read_u8 / write_u8,
        x / set_x: i16 => read_i16 / write_i16,
        y / set_y: i16 => read_i16 / write_i16,
        target / set_target: i16 => read_i16 / write_i16,
        style / set_style: u8 => read_u8 / write_u8,
    }
}

fixed_packet! {
    SetTime: SetTime, Direction::TO_CLIENT;
    {
        day_time / set_day_time: bool => read_bool / write_bool,
        time / set_time: i32 => read_i32 / write_i32,
        sun_mod_y / set_sun_mod_y: i16 => read_i16 / write_i16,
        moon_mod_y / set_moon_mod_y: i16 => read_i16 / write_i16,
    }
}

fixed_packet! {
    ToggleDoor: ToggleDoor, Direction::BOTH;
    {
        action / set_action: u8 => read_u8 / write_u8,
        x / set_x: i16 => read_i16 / write_i16,
        y / set_y: i16 => read_i16 / write_i16,
        direction / set_direction: u8 => read_u8 / write_u8,
    }
}

fixed_packet! {
    KillProjectile: KillProjectile, Direction::BOTH;
    {
        identity / set_identity: i16 => read_i16 / write_i16,
        owner / set_owner: u8 => read_u8 / write_u8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CodecError;
    use crate::packets::test_support::round_trip;

    #[test]
    fn test_connect_request_layout() {
        let packet = ConnectRequest::new("Terraria279");
        let (body, decoded) = round_trip(&packet, Side::Client);
        assert_eq!(body[0], 11);
        assert_eq!(&body[1..], b"Terraria279");
        assert_eq!(decoded, packet);
        assert!(!decoded.is_dirty());
    }

    #[test]
    fn test_string_setter_marks_dirty() {
        let mut packet = ClientUuid::new("01234567-89ab-cdef-0123-456789abcdef");
        packet.clean();
        assert!(!packet.is_dirty());
        packet.set_uuid("ffffffff-ffff-ffff-ffff-ffffffffffff");
        assert!(packet.is_dirty());
        let (_, decoded) = round_trip(&packet, Side::Client);
        assert_eq!(decoded.uuid(), "ffffffff-ffff-ffff-ffff-ffffffffffff");
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let body = [2u8, 0xC3, 0x28];
        let mut reader = PacketReader::new(&body);
        assert!(matches!(
            ConnectRequest::read(&mut reader, Side::Server),
            Err(CodecError::InvalidUtf8(_))
        ));
    }

    #[test]
    fn test_empty_bodies() {
        let (body, _) = round_trip(&RequestWorldInfo::new(), Side::Client);
        assert!(body.is_empty());
        let (body, _) = round_trip(&FinishConnection::new(), Side::Server);
        assert!(body.is_empty());
    }

    #[test]
    fn test_set_time_layout() {
        let packet = SetTime::new(true, 27_000, 0, -3);
        let (body, decoded) = round_trip(&packet, Side::Server);
        assert_eq!(body, vec![1, 0x78, 0x69, 0, 0, 0, 0, 0xFD, 0xFF]);
        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_setters_mark_dirty() {
        let mut packet = TileChange::new(0, 10, 20, 1, 0);
        packet.clean();
        packet.set_style(3);
        assert!(packet.is_dirty());
        assert_eq!(packet.style(), 3);

        let mut door = ToggleDoor::new(0, 1, 2, 1);
        door.clean();
        assert_eq!(door.x(), 1);
        assert!(!door.is_dirty());
    }

    #[test]
    fn test_truncated_fixed_body() {
        let mut reader = PacketReader::new(&[5, 0]);
        assert!(matches!(
            KillProjectile::read(&mut reader, Side::Client),
            Err(CodecError::TruncatedPacket { needed: 1, remaining: 0 })
        ));
    }

    #[test]
    fn test_request_essential_tiles_defaults() {
        let packet = RequestEssentialTiles::new(-1, -1);
        let (body, decoded) = round_trip(&packet, Side::Client);
        assert_eq!(body, vec![0xFF; 8]);
        assert_eq!(decoded.spawn_x(), -1);
    }
}
