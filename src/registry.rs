//! Discriminant to decoder dispatch.

use crate::error::Result;
use crate::packets::{self, decode_variant, NetPacket, Packet, UnknownPacket};
use crate::primitives::PacketReader;
use crate::protocol::Side;
use ahash::AHashMap;
use std::sync::OnceLock;
use tracing::debug;

/// Decodes a body into a packet for the given receiving side.
pub type DecodeFn = fn(&mut PacketReader<'_>, Side) -> Result<Packet>;

#[derive(Clone, Copy)]
struct Entry {
    decode: DecodeFn,
    variable_trailer: bool,
}

/// Maps wire discriminants to decoders.
///
/// Built once and only read afterwards; share it by reference.
#[derive(Clone, Default)]
pub struct PacketRegistry {
    entries: AHashMap<u8, Entry>,
}

impl PacketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every variant of [`Packet`].
    pub fn with_standard_packets() -> Self {
        let mut registry = Self::new();
        packets::register_standard(&mut registry);
        registry
    }

    /// Process-wide standard registry.
    pub fn standard() -> &'static PacketRegistry {
        static STANDARD: OnceLock<PacketRegistry> = OnceLock::new();
        STANDARD.get_or_init(PacketRegistry::with_standard_packets)
    }

    /// Registers a decoder that must consume the whole body. Replaces any
    /// previous entry for `type_id`.
    pub fn register(&mut self, type_id: u8, decode: DecodeFn) {
        self.insert(type_id, decode, false);
    }

    /// Registers a decoder whose body may carry trailing bytes it ignores.
    pub fn register_with_trailer(&mut self, type_id: u8, decode: DecodeFn) {
        self.insert(type_id, decode, true);
    }

    pub fn register_packet<P>(&mut self)
    where
        P: NetPacket + Into<Packet>,
    {
        self.insert(P::TYPE.as_u8(), decode_variant::<P>, P::VARIABLE_TRAILER);
    }

    fn insert(&mut self, type_id: u8, decode: DecodeFn, variable_trailer: bool) {
        if self
            .entries
            .insert(type_id, Entry { decode, variable_trailer })
            .is_some()
        {
            debug!(type_id, "replaced packet decoder");
        }
    }

    pub fn contains(&self, type_id: u8) -> bool {
        self.entries.contains_key(&type_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether bytes left after decoding `type_id` are tolerated. Unknown
    /// types keep their whole payload, so nothing is ever left.
    pub fn allows_trailer(&self, type_id: u8) -> bool {
        self.entries
            .get(&type_id)
            .map(|entry| entry.variable_trailer)
            .unwrap_or(true)
    }

    /// Decodes a body. Unregistered discriminants yield
    /// [`Packet::Unknown`] holding the remaining bytes.
    pub fn decode_by_type(&self, type_id: u8, reader: &mut PacketReader<'_>, side: Side) -> Result<Packet> {
        match self.entries.get(&type_id) {
            Some(entry) => (entry.decode)(reader, side),
            None => {
                debug!(type_id, len = reader.remaining(), "no decoder registered, keeping raw payload");
                Ok(UnknownPacket::decoded(type_id, reader.read_remaining()).into())
            }
        }
    }
}

impl std::fmt::Debug for PacketRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<u8> = self.entries.keys().copied().collect();
        types.sort_unstable();
        f.debug_struct("PacketRegistry").field("types", &types).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packets::{AddNpcBuff, PlayerTeam};
    use crate::protocol::PacketType;

    #[test]
    fn test_standard_registry() {
        let registry = PacketRegistry::standard();
        assert!(registry.contains(PacketType::SendSection.as_u8()));
        assert!(!registry.contains(2));
        assert!(!registry.is_empty());
        assert!(std::ptr::eq(registry, PacketRegistry::standard()));
    }

    #[test]
    fn test_decode_registered() {
        let registry = PacketRegistry::standard();
        let body = [1, 0, 20, 0, 60, 0];
        let mut reader = PacketReader::new(&body);
        let packet = registry.decode_by_type(53, &mut reader, Side::Server).unwrap();
        assert_eq!(packet, Packet::AddNpcBuff(AddNpcBuff::new(1, 20, 60)));
        assert!(!packet.is_dirty());
    }

    #[test]
    fn test_unregistered_falls_back() {
        let registry = PacketRegistry::new();
        let body = [9, 8, 7];
        let mut reader = PacketReader::new(&body);
        let packet = registry.decode_by_type(45, &mut reader, Side::Client).unwrap();
        match packet {
            Packet::Unknown(unknown) => {
                assert_eq!(unknown.type_id(), 45);
                assert_eq!(unknown.payload().as_ref(), &[9, 8, 7]);
            }
            other => panic!("expected unknown packet, got {other:?}"),
        }
        assert!(reader.is_empty());
    }

    fn decode_team_only(reader: &mut PacketReader<'_>, _side: Side) -> Result<Packet> {
        let team = reader.read_u8()?;
        Ok(PlayerTeam::new(0, team).into())
    }

    #[test]
    fn test_custom_registration() {
        let mut registry = PacketRegistry::new();
        registry.register_packet::<AddNpcBuff>();
        registry.register_with_trailer(200, decode_team_only);
        assert_eq!(registry.len(), 2);
        assert!(!registry.allows_trailer(53));
        assert!(registry.allows_trailer(200));

        registry.register(200, decode_team_only);
        assert_eq!(registry.len(), 2);
        assert!(!registry.allows_trailer(200));
    }
}
