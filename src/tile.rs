//! Tile records carried by section packets.

use crate::config::FrameImportance;
use crate::error::{CodecError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LiquidKind {
    #[default]
    Water,
    Lava,
    Honey,
    Shimmer,
}

/// Block outline. Wire value is the discriminant (3 bits).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum BlockShape {
    #[default]
    Full = 0,
    HalfBrick = 1,
    SlopeDownRight = 2,
    SlopeDownLeft = 3,
    SlopeUpRight = 4,
    SlopeUpLeft = 5,
}

impl BlockShape {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(BlockShape::Full),
            1 => Some(BlockShape::HalfBrick),
            2 => Some(BlockShape::SlopeDownRight),
            3 => Some(BlockShape::SlopeDownLeft),
            4 => Some(BlockShape::SlopeUpRight),
            5 => Some(BlockShape::SlopeUpLeft),
            _ => None,
        }
    }
}

/// Wiring and rendering flags of a tile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileFlags(u16);

impl TileFlags {
    pub const NONE: TileFlags = TileFlags(0);
    pub const RED_WIRE: TileFlags = TileFlags(1 << 0);
    pub const BLUE_WIRE: TileFlags = TileFlags(1 << 1);
    pub const GREEN_WIRE: TileFlags = TileFlags(1 << 2);
    pub const YELLOW_WIRE: TileFlags = TileFlags(1 << 3);
    pub const ACTUATOR: TileFlags = TileFlags(1 << 4);
    pub const INACTIVE: TileFlags = TileFlags(1 << 5);
    pub const INVISIBLE_BLOCK: TileFlags = TileFlags(1 << 6);
    pub const INVISIBLE_WALL: TileFlags = TileFlags(1 << 7);
    pub const FULLBRIGHT_BLOCK: TileFlags = TileFlags(1 << 8);
    pub const FULLBRIGHT_WALL: TileFlags = TileFlags(1 << 9);

    pub fn from_bits(bits: u16) -> Self {
        TileFlags(bits)
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn contains(self, other: TileFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: TileFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: TileFlags) {
        self.0 &= !other.0;
    }

    pub fn set(&mut self, other: TileFlags, value: bool) {
        if value {
            self.insert(other);
        } else {
            self.remove(other);
        }
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for TileFlags {
    type Output = TileFlags;

    fn bitor(self, rhs: TileFlags) -> TileFlags {
        TileFlags(self.0 | rhs.0)
    }
}

/// Sprite-sheet coordinates of a frame-important block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileFrame {
    pub x: i16,
    pub y: i16,
}

impl TileFrame {
    pub fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    /// Block id, `None` when no block is placed.
    pub block: Option<u16>,
    /// Only sent for frame-important blocks.
    pub frame: Option<TileFrame>,
    /// Wall id, 0 for no wall.
    pub wall: u16,
    /// Liquid amount, 0-255.
    pub liquid: u8,
    pub liquid_kind: LiquidKind,
    pub block_paint: u8,
    pub wall_paint: u8,
    pub shape: BlockShape,
    pub flags: TileFlags,
}

impl Tile {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn block(id: u16) -> Self {
        Self {
            block: Some(id),
            ..Self::default()
        }
    }

    pub fn framed_block(id: u16, frame: TileFrame) -> Self {
        Self {
            block: Some(id),
            frame: Some(frame),
            ..Self::default()
        }
    }

    pub fn with_wall(mut self, wall: u16) -> Self {
        self.wall = wall;
        self
    }

    pub fn with_liquid(mut self, amount: u8, kind: LiquidKind) -> Self {
        self.liquid = amount;
        self.liquid_kind = kind;
        self
    }

    pub fn with_paint(mut self, block_paint: u8, wall_paint: u8) -> Self {
        self.block_paint = block_paint;
        self.wall_paint = wall_paint;
        self
    }

    pub fn with_shape(mut self, shape: BlockShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_flags(mut self, flags: TileFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn is_active(&self) -> bool {
        self.block.is_some()
    }

    /// The tile as it reads back after a wire round trip: attributes the
    /// encoding cannot express are reset.
    pub fn canonical(&self, importance: &FrameImportance) -> Tile {
        let mut tile = *self;
        match tile.block {
            Some(block) if importance.contains(block) => {
                tile.frame = Some(tile.frame.unwrap_or_default());
            }
            Some(_) => tile.frame = None,
            None => {
                tile.frame = None;
                tile.block_paint = 0;
            }
        }
        if tile.wall == 0 {
            tile.wall_paint = 0;
        }
        if tile.liquid == 0 {
            tile.liquid_kind = LiquidKind::Water;
        }
        tile
    }
}

/// Rectangular block of tiles stored row-major.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileGrid {
    width: u16,
    height: u16,
    tiles: Vec<Tile>,
}

impl TileGrid {
    pub fn new(width: u16, height: u16) -> Self {
        Self::filled(width, height, Tile::empty())
    }

    pub fn filled(width: u16, height: u16, tile: Tile) -> Self {
        Self {
            width,
            height,
            tiles: vec![tile; usize::from(width) * usize::from(height)],
        }
    }

    pub fn from_tiles(width: u16, height: u16, tiles: Vec<Tile>) -> Result<Self> {
        let expected = usize::from(width) * usize::from(height);
        if tiles.len() != expected {
            return Err(CodecError::InvalidValue(format!(
                "{}x{} grid needs {} tiles, got {}",
                width,
                height,
                expected,
                tiles.len()
            )));
        }
        Ok(Self { width, height, tiles })
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    fn index(&self, x: u16, y: u16) -> Option<usize> {
        if x < self.width && y < self.height {
            Some(usize::from(y) * usize::from(self.width) + usize::from(x))
        } else {
            None
        }
    }

    pub fn get(&self, x: u16, y: u16) -> Option<&Tile> {
        self.index(x, y).map(|index| &self.tiles[index])
    }

    pub fn get_mut(&mut self, x: u16, y: u16) -> Option<&mut Tile> {
        match self.index(x, y) {
            Some(index) => Some(&mut self.tiles[index]),
            None => None,
        }
    }

    pub fn set(&mut self, x: u16, y: u16, tile: Tile) -> Result<()> {
        let (width, height) = (self.width, self.height);
        let slot = self.get_mut(x, y).ok_or_else(|| {
            CodecError::InvalidValue(format!("({x}, {y}) outside {width}x{height} grid"))
        })?;
        *slot = tile;
        Ok(())
    }

    /// Tiles in scan order.
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Tile]> {
        // chunks() rejects a zero chunk size
        self.tiles.chunks(usize::from(self.width).max(1))
    }

    pub fn canonical(&self, importance: &FrameImportance) -> TileGrid {
        TileGrid {
            width: self.width,
            height: self.height,
            tiles: self.tiles.iter().map(|tile| tile.canonical(importance)).collect(),
        }
    }
}
