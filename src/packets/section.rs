//! World section transfer: tiles plus the chests, signs and tile entities
//! placed inside the section.

use super::NetPacket;
use crate::compression::{read_compressed_body, write_compressed_body};
use crate::error::{CodecError, Result};
use crate::primitives::{BitsByte, PacketReader, PacketWriter};
use crate::protocol::{Direction, PacketType, Side};
use crate::tile::TileGrid;
use crate::tile_codec::{decode_tiles, encode_tiles};
use crate::tracking::{DirtyFlag, TrackedArray};
use serde::{Deserialize, Serialize};

const DISPLAY_DOLL_SLOTS: usize = 8;
const HAT_RACK_SLOTS: usize = 2;

/// Item stored in a tile entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSlot {
    pub id: i16,
    pub prefix: u8,
    pub stack: i16,
}

impl ItemSlot {
    pub fn new(id: i16, prefix: u8, stack: i16) -> Self {
        Self { id, prefix, stack }
    }

    fn read(reader: &mut PacketReader<'_>) -> Result<Self> {
        Ok(Self {
            id: reader.read_i16()?,
            prefix: reader.read_u8()?,
            stack: reader.read_i16()?,
        })
    }

    fn write(&self, writer: &mut PacketWriter<'_>) {
        writer.write_i16(self.id);
        writer.write_u8(self.prefix);
        writer.write_i16(self.stack);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chest {
    pub id: i16,
    pub x: i16,
    pub y: i16,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sign {
    pub id: i16,
    pub x: i16,
    pub y: i16,
    pub text: String,
}

/// Kind-specific state of a tile entity. The wire tag is the declaration
/// order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TileEntityKind {
    TrainingDummy { npc: i16 },
    ItemFrame(ItemSlot),
    LogicSensor { check: u8, on: bool },
    DisplayDoll {
        items: TrackedArray<Option<ItemSlot>>,
        dyes: TrackedArray<Option<ItemSlot>>,
    },
    WeaponsRack(ItemSlot),
    HatRack {
        items: TrackedArray<Option<ItemSlot>>,
        dyes: TrackedArray<Option<ItemSlot>>,
    },
    FoodPlatter(ItemSlot),
    TeleportationPylon,
}

impl TileEntityKind {
    pub fn display_doll() -> Self {
        TileEntityKind::DisplayDoll {
            items: TrackedArray::new(DISPLAY_DOLL_SLOTS),
            dyes: TrackedArray::new(DISPLAY_DOLL_SLOTS),
        }
    }

    pub fn hat_rack() -> Self {
        TileEntityKind::HatRack {
            items: TrackedArray::new(HAT_RACK_SLOTS),
            dyes: TrackedArray::new(HAT_RACK_SLOTS),
        }
    }

    pub fn tag(&self) -> u8 {
        match self {
            TileEntityKind::TrainingDummy { .. } => 0,
            TileEntityKind::ItemFrame(_) => 1,
            TileEntityKind::LogicSensor { .. } => 2,
            TileEntityKind::DisplayDoll { .. } => 3,
            TileEntityKind::WeaponsRack(_) => 4,
            TileEntityKind::HatRack { .. } => 5,
            TileEntityKind::FoodPlatter(_) => 6,
            TileEntityKind::TeleportationPylon => 7,
        }
    }

    fn read(tag: u8, reader: &mut PacketReader<'_>) -> Result<Self> {
        Ok(match tag {
            0 => TileEntityKind::TrainingDummy {
                npc: reader.read_i16()?,
            },
            1 => TileEntityKind::ItemFrame(ItemSlot::read(reader)?),
            2 => TileEntityKind::LogicSensor {
                check: reader.read_u8()?,
                on: reader.read_bool()?,
            },
            3 => {
                let item_bits = reader.read_bits_byte()?;
                let dye_bits = reader.read_bits_byte()?;
                let items = read_slots(reader, item_bits, 0, DISPLAY_DOLL_SLOTS)?;
                let dyes = read_slots(reader, dye_bits, 0, DISPLAY_DOLL_SLOTS)?;
                TileEntityKind::DisplayDoll { items, dyes }
            }
            4 => TileEntityKind::WeaponsRack(ItemSlot::read(reader)?),
            5 => {
                let bits = reader.read_bits_byte()?;
                let items = read_slots(reader, bits, 0, HAT_RACK_SLOTS)?;
                let dyes = read_slots(reader, bits, HAT_RACK_SLOTS, HAT_RACK_SLOTS)?;
                TileEntityKind::HatRack { items, dyes }
            }
            6 => TileEntityKind::FoodPlatter(ItemSlot::read(reader)?),
            7 => TileEntityKind::TeleportationPylon,
            other => {
                return Err(CodecError::InvalidValue(format!(
                    "unknown tile entity kind {other}"
                )))
            }
        })
    }

    fn write(&self, writer: &mut PacketWriter<'_>) -> Result<()> {
        match self {
            TileEntityKind::TrainingDummy { npc } => writer.write_i16(*npc),
            TileEntityKind::ItemFrame(slot)
            | TileEntityKind::WeaponsRack(slot)
            | TileEntityKind::FoodPlatter(slot) => slot.write(writer),
            TileEntityKind::LogicSensor { check, on } => {
                writer.write_u8(*check);
                writer.write_bool(*on);
            }
            TileEntityKind::DisplayDoll { items, dyes } => {
                expect_slots(items, DISPLAY_DOLL_SLOTS, "display doll items")?;
                expect_slots(dyes, DISPLAY_DOLL_SLOTS, "display doll dyes")?;
                writer.write_bits_byte(presence(items, 0, BitsByte::new())?);
                writer.write_bits_byte(presence(dyes, 0, BitsByte::new())?);
                write_slots(writer, items);
                write_slots(writer, dyes);
            }
            TileEntityKind::HatRack { items, dyes } => {
                expect_slots(items, HAT_RACK_SLOTS, "hat rack items")?;
                expect_slots(dyes, HAT_RACK_SLOTS, "hat rack dyes")?;
                let bits = presence(items, 0, BitsByte::new())?;
                writer.write_bits_byte(presence(dyes, HAT_RACK_SLOTS, bits)?);
                write_slots(writer, items);
                write_slots(writer, dyes);
            }
            TileEntityKind::TeleportationPylon => {}
        }
        Ok(())
    }

    fn slots(&self) -> Option<(&TrackedArray<Option<ItemSlot>>, &TrackedArray<Option<ItemSlot>>)> {
        match self {
            TileEntityKind::DisplayDoll { items, dyes } | TileEntityKind::HatRack { items, dyes } => {
                Some((items, dyes))
            }
            _ => None,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.slots()
            .map(|(items, dyes)| items.is_dirty() || dyes.is_dirty())
            .unwrap_or(false)
    }

    pub fn clean(&mut self) {
        if let TileEntityKind::DisplayDoll { items, dyes } | TileEntityKind::HatRack { items, dyes } =
            self
        {
            items.clean();
            dyes.clean();
        }
    }
}

fn expect_slots(slots: &TrackedArray<Option<ItemSlot>>, len: usize, what: &str) -> Result<()> {
    if slots.len() != len {
        return Err(CodecError::InvalidValue(format!(
            "{what} hold {} slots, expected {len}",
            slots.len()
        )));
    }
    Ok(())
}

/// Sets bit `offset + i` for every occupied slot `i`.
fn presence(slots: &TrackedArray<Option<ItemSlot>>, offset: usize, mut bits: BitsByte) -> Result<BitsByte> {
    if offset + slots.len() > 8 {
        return Err(CodecError::InvalidValue(format!(
            "{} item slots do not fit a flag byte",
            slots.len()
        )));
    }
    for (index, slot) in slots.iter().enumerate() {
        bits.set(offset + index, slot.is_some());
    }
    Ok(bits)
}

fn write_slots(writer: &mut PacketWriter<'_>, slots: &TrackedArray<Option<ItemSlot>>) {
    for slot in slots.iter().flatten() {
        slot.write(writer);
    }
}

fn read_slots(
    reader: &mut PacketReader<'_>,
    bits: BitsByte,
    offset: usize,
    len: usize,
) -> Result<TrackedArray<Option<ItemSlot>>> {
    let mut slots = Vec::with_capacity(len);
    for index in 0..len {
        slots.push(if bits.get(offset + index) {
            Some(ItemSlot::read(reader)?)
        } else {
            None
        });
    }
    Ok(TrackedArray::from_vec(slots))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileEntity {
    pub id: i32,
    pub x: i16,
    pub y: i16,
    pub kind: TileEntityKind,
}

impl TileEntity {
    pub fn new(id: i32, x: i16, y: i16, kind: TileEntityKind) -> Self {
        Self { id, x, y, kind }
    }

    fn read(reader: &mut PacketReader<'_>) -> Result<Self> {
        let tag = reader.read_u8()?;
        let id = reader.read_i32()?;
        let x = reader.read_i16()?;
        let y = reader.read_i16()?;
        let kind = TileEntityKind::read(tag, reader)?;
        Ok(Self { id, x, y, kind })
    }

    fn write(&self, writer: &mut PacketWriter<'_>) -> Result<()> {
        writer.write_u8(self.kind.tag());
        writer.write_i32(self.id);
        writer.write_i16(self.x);
        writer.write_i16(self.y);
        self.kind.write(writer)
    }
}

fn read_count(reader: &mut PacketReader<'_>, what: &str) -> Result<usize> {
    let count = reader.read_i16()?;
    usize::try_from(count)
        .map_err(|_| CodecError::InvalidValue(format!("negative {what} count {count}")))
}

fn write_count(writer: &mut PacketWriter<'_>, count: usize, what: &str) -> Result<()> {
    let count = i16::try_from(count)
        .map_err(|_| CodecError::InvalidValue(format!("{count} {what} exceed the i16 count")))?;
    writer.write_i16(count);
    Ok(())
}

fn grid_dimension(value: u16) -> Result<i16> {
    i16::try_from(value)
        .map_err(|_| CodecError::InvalidValue(format!("section dimension {value} exceeds i16")))
}

/// A rectangle of the world with everything placed inside it.
///
/// The body after the compression flag is `i32 x, i32 y, i16 width,
/// i16 height`, the run-length encoded tiles, then the chest, sign and tile
/// entity lists, each prefixed by an `i16` count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendSection {
    x: i32,
    y: i32,
    tiles: TileGrid,
    chests: Vec<Chest>,
    signs: Vec<Sign>,
    tile_entities: Vec<TileEntity>,
    #[serde(skip)]
    dirty: DirtyFlag,
}

impl SendSection {
    pub fn new(x: i32, y: i32, tiles: TileGrid) -> Self {
        Self {
            x,
            y,
            tiles,
            chests: Vec::new(),
            signs: Vec::new(),
            tile_entities: Vec::new(),
            dirty: DirtyFlag::dirty(),
        }
    }

    accessors!(x / set_x: i32, y / set_y: i32);

    pub fn tiles(&self) -> &TileGrid {
        &self.tiles
    }

    /// Marks the packet dirty.
    pub fn tiles_mut(&mut self) -> &mut TileGrid {
        self.dirty.mark();
        &mut self.tiles
    }

    pub fn chests(&self) -> &[Chest] {
        &self.chests
    }

    /// Marks the packet dirty.
    pub fn chests_mut(&mut self) -> &mut Vec<Chest> {
        self.dirty.mark();
        &mut self.chests
    }

    pub fn signs(&self) -> &[Sign] {
        &self.signs
    }

    /// Marks the packet dirty.
    pub fn signs_mut(&mut self) -> &mut Vec<Sign> {
        self.dirty.mark();
        &mut self.signs
    }

    pub fn tile_entities(&self) -> &[TileEntity] {
        &self.tile_entities
    }

    /// Marks the packet dirty.
    pub fn tile_entities_mut(&mut self) -> &mut Vec<TileEntity> {
        self.dirty.mark();
        &mut self.tile_entities
    }

    fn write_plain(&self, body: &mut PacketWriter<'_>) -> Result<()> {
        let limit = body.config().max_grid_tiles;
        if self.tiles.len() > limit {
            return Err(CodecError::InvalidValue(format!(
                "{}x{} section exceeds the {limit} tile limit",
                self.tiles.width(),
                self.tiles.height()
            )));
        }
        let importance = &body.config().frame_important;
        body.write_i32(self.x);
        body.write_i32(self.y);
        body.write_i16(grid_dimension(self.tiles.width())?);
        body.write_i16(grid_dimension(self.tiles.height())?);
        encode_tiles(&self.tiles, importance, body);

        write_count(body, self.chests.len(), "chests")?;
        for chest in &self.chests {
            body.write_i16(chest.id);
            body.write_i16(chest.x);
            body.write_i16(chest.y);
            body.write_string(&chest.name)?;
        }

        write_count(body, self.signs.len(), "signs")?;
        for sign in &self.signs {
            body.write_i16(sign.id);
            body.write_i16(sign.x);
            body.write_i16(sign.y);
            body.write_string(&sign.text)?;
        }

        write_count(body, self.tile_entities.len(), "tile entities")?;
        for entity in &self.tile_entities {
            entity.write(body)?;
        }
        Ok(())
    }

    fn read_plain(body: &mut PacketReader<'_>) -> Result<Self> {
        let x = body.read_i32()?;
        let y = body.read_i32()?;
        let width = body.read_i16()?;
        let height = body.read_i16()?;
        let (width, height) = match (u16::try_from(width), u16::try_from(height)) {
            (Ok(width), Ok(height)) => (width, height),
            _ => {
                return Err(CodecError::MalformedTileGrid(format!(
                    "negative section size {width}x{height}"
                )))
            }
        };
        let importance = &body.config().frame_important;
        let tiles = decode_tiles(body, width, height, importance)?;

        let count = read_count(body, "chest")?;
        let mut chests = Vec::with_capacity(count.min(body.remaining()));
        for _ in 0..count {
            chests.push(Chest {
                id: body.read_i16()?,
                x: body.read_i16()?,
                y: body.read_i16()?,
                name: body.read_string()?,
            });
        }

        let count = read_count(body, "sign")?;
        let mut signs = Vec::with_capacity(count.min(body.remaining()));
        for _ in 0..count {
            signs.push(Sign {
                id: body.read_i16()?,
                x: body.read_i16()?,
                y: body.read_i16()?,
                text: body.read_string()?,
            });
        }

        let count = read_count(body, "tile entity")?;
        let mut tile_entities = Vec::with_capacity(count.min(body.remaining()));
        for _ in 0..count {
            tile_entities.push(TileEntity::read(body)?);
        }

        Ok(Self {
            x,
            y,
            tiles,
            chests,
            signs,
            tile_entities,
            dirty: DirtyFlag::clean(),
        })
    }
}

impl NetPacket for SendSection {
    const TYPE: PacketType = PacketType::SendSection;
    const DIRECTION: Direction = Direction::TO_CLIENT;

    fn read(reader: &mut PacketReader<'_>, _side: Side) -> Result<Self> {
        let plain = read_compressed_body(reader)?;
        let mut body = PacketReader::with_config(&plain, reader.config());
        let section = Self::read_plain(&mut body)?;
        if !body.is_empty() {
            return Err(CodecError::UnconsumedBytes {
                packet_type: Self::TYPE.as_u8(),
                remaining: body.remaining(),
            });
        }
        Ok(section)
    }

    fn write(&self, writer: &mut PacketWriter<'_>, _side: Side) -> Result<()> {
        let mut body = PacketWriter::with_config(writer.config());
        self.write_plain(&mut body)?;
        write_compressed_body(writer, body.as_slice())?;
        Ok(())
    }

    fn is_dirty(&self) -> bool {
        self.dirty.is_set() || self.tile_entities.iter().any(|entity| entity.kind.is_dirty())
    }

    fn clean(&mut self) {
        self.dirty.clear();
        for entity in &mut self.tile_entities {
            entity.kind.clean();
        }
    }
}

fixed_packet! {
    /// Asks the client to recompute tile framing for a rectangle of sections.
    SectionFrame: SectionFrame, Direction::TO_CLIENT;
    {
        start_x / set_start_x: i16 => read_i16 / write_i16,
        start_y / set_start_y: i16 => read_i16 / write_i16,
        end_x / set_end_x: i16 => read_i16 / write_i16,
        end_y / set_end_y: i16 => read_i16 / write_i16,
    }
}
