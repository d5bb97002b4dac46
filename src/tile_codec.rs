//! Run-length encoding of tile grids.
//!
//! Tiles are scanned row-major. Each run is written as
//!
//! ```text
//! header1 [header2 [header3 [header4]]] attribute bytes [run count]
//! ```
//!
//! | byte    | bit | meaning                                               |
//! |---------|-----|-------------------------------------------------------|
//! | header1 | 0   | header2 follows                                       |
//! |         | 1   | block present                                         |
//! |         | 2   | wall present                                          |
//! |         | 3-4 | liquid: 1 water (or shimmer), 2 lava, 3 honey          |
//! |         | 5   | block id is two bytes                                 |
//! |         | 6-7 | run count width: 0 none, 1 one byte, 2 two bytes      |
//! | header2 | 0   | header3 follows                                       |
//! |         | 1-3 | red, blue, green wire                                 |
//! |         | 4-6 | block shape                                           |
//! | header3 | 0   | header4 follows                                       |
//! |         | 1   | actuator                                              |
//! |         | 2   | inactive                                              |
//! |         | 3   | block paint byte present                              |
//! |         | 4   | wall paint byte present                               |
//! |         | 5   | yellow wire                                           |
//! |         | 6   | wall id high byte present                             |
//! |         | 7   | liquid is shimmer                                     |
//! | header4 | 1-4 | invisible block, invisible wall, fullbright block, fullbright wall |
//!
//! Attribute bytes follow in a fixed order: block id (1-2 bytes), frame x/y
//! (`i16` each, frame-important blocks only), block paint, wall id low byte,
//! wall paint, liquid amount, wall id high byte.
//!
//! The run count is the number of following tiles whose encoding is
//! byte-for-byte identical to this one.

use crate::config::FrameImportance;
use crate::error::{CodecError, Result};
use crate::primitives::{PacketReader, PacketWriter};
use crate::tile::{BlockShape, LiquidKind, Tile, TileFlags, TileFrame, TileGrid};

/// Longest run count the two-byte (signed on the wire) field can hold.
pub const MAX_RUN: usize = i16::MAX as usize;

const H1_HEADER2: u8 = 1 << 0;
const H1_BLOCK: u8 = 1 << 1;
const H1_WALL: u8 = 1 << 2;
const H1_LIQUID_SHIFT: u8 = 3;
const H1_LIQUID_MASK: u8 = 0b11 << H1_LIQUID_SHIFT;
const H1_WIDE_BLOCK: u8 = 1 << 5;
const H1_RUN_BYTE: u8 = 1 << 6;
const H1_RUN_SHORT: u8 = 1 << 7;

const H2_HEADER3: u8 = 1 << 0;
const H2_RED_WIRE: u8 = 1 << 1;
const H2_BLUE_WIRE: u8 = 1 << 2;
const H2_GREEN_WIRE: u8 = 1 << 3;
const H2_SHAPE_SHIFT: u8 = 4;
const H2_SHAPE_MASK: u8 = 0b111 << H2_SHAPE_SHIFT;

const H3_HEADER4: u8 = 1 << 0;
const H3_ACTUATOR: u8 = 1 << 1;
const H3_INACTIVE: u8 = 1 << 2;
const H3_BLOCK_PAINT: u8 = 1 << 3;
const H3_WALL_PAINT: u8 = 1 << 4;
const H3_YELLOW_WIRE: u8 = 1 << 5;
const H3_WIDE_WALL: u8 = 1 << 6;
const H3_SHIMMER: u8 = 1 << 7;

const H4_INVISIBLE_BLOCK: u8 = 1 << 1;
const H4_INVISIBLE_WALL: u8 = 1 << 2;
const H4_FULLBRIGHT_BLOCK: u8 = 1 << 3;
const H4_FULLBRIGHT_WALL: u8 = 1 << 4;

const LIQUID_WATER: u8 = 1;
const LIQUID_LAVA: u8 = 2;
const LIQUID_HONEY: u8 = 3;

/// Encodes one tile (headers and attributes, no run count) into `out`.
fn encode_tile(tile: &Tile, importance: &FrameImportance, out: &mut Vec<u8>) {
    let mut h1 = 0u8;
    let mut h2 = 0u8;
    let mut h3 = 0u8;
    let mut h4 = 0u8;
    let mut data = [0u8; 12];
    let mut len = 0usize;
    let mut push = |bytes: &[u8]| {
        data[len..len + bytes.len()].copy_from_slice(bytes);
        len += bytes.len();
    };

    if let Some(block) = tile.block {
        h1 |= H1_BLOCK;
        let [lo, hi] = block.to_le_bytes();
        push(&[lo]);
        if block > 0xFF {
            h1 |= H1_WIDE_BLOCK;
            push(&[hi]);
        }
        if importance.contains(block) {
            let frame = tile.frame.unwrap_or_default();
            push(&frame.x.to_le_bytes());
            push(&frame.y.to_le_bytes());
        }
        if tile.block_paint != 0 {
            h3 |= H3_BLOCK_PAINT;
            push(&[tile.block_paint]);
        }
    }

    if tile.wall != 0 {
        h1 |= H1_WALL;
        push(&[tile.wall.to_le_bytes()[0]]);
        if tile.wall_paint != 0 {
            h3 |= H3_WALL_PAINT;
            push(&[tile.wall_paint]);
        }
    }

    if tile.liquid != 0 {
        let kind = match tile.liquid_kind {
            LiquidKind::Water => LIQUID_WATER,
            LiquidKind::Lava => LIQUID_LAVA,
            LiquidKind::Honey => LIQUID_HONEY,
            LiquidKind::Shimmer => {
                h3 |= H3_SHIMMER;
                LIQUID_WATER
            }
        };
        h1 |= kind << H1_LIQUID_SHIFT;
        push(&[tile.liquid]);
    }

    let flags = tile.flags;
    if flags.contains(TileFlags::RED_WIRE) {
        h2 |= H2_RED_WIRE;
    }
    if flags.contains(TileFlags::BLUE_WIRE) {
        h2 |= H2_BLUE_WIRE;
    }
    if flags.contains(TileFlags::GREEN_WIRE) {
        h2 |= H2_GREEN_WIRE;
    }
    h2 |= tile.shape.as_u8() << H2_SHAPE_SHIFT;

    if flags.contains(TileFlags::ACTUATOR) {
        h3 |= H3_ACTUATOR;
    }
    if flags.contains(TileFlags::INACTIVE) {
        h3 |= H3_INACTIVE;
    }
    if flags.contains(TileFlags::YELLOW_WIRE) {
        h3 |= H3_YELLOW_WIRE;
    }
    if tile.wall > 0xFF {
        h3 |= H3_WIDE_WALL;
        push(&[tile.wall.to_le_bytes()[1]]);
    }

    if flags.contains(TileFlags::INVISIBLE_BLOCK) {
        h4 |= H4_INVISIBLE_BLOCK;
    }
    if flags.contains(TileFlags::INVISIBLE_WALL) {
        h4 |= H4_INVISIBLE_WALL;
    }
    if flags.contains(TileFlags::FULLBRIGHT_BLOCK) {
        h4 |= H4_FULLBRIGHT_BLOCK;
    }
    if flags.contains(TileFlags::FULLBRIGHT_WALL) {
        h4 |= H4_FULLBRIGHT_WALL;
    }

    if h4 != 0 {
        h3 |= H3_HEADER4;
    }
    if h3 != 0 {
        h2 |= H2_HEADER3;
    }
    if h2 != 0 {
        h1 |= H1_HEADER2;
    }

    out.clear();
    out.push(h1);
    if h1 & H1_HEADER2 != 0 {
        out.push(h2);
    }
    if h2 & H2_HEADER3 != 0 {
        out.push(h3);
    }
    if h3 & H3_HEADER4 != 0 {
        out.push(h4);
    }
    out.extend_from_slice(&data[..len]);
}

fn flush_run(encoded: &mut [u8], repeats: usize, writer: &mut PacketWriter<'_>) {
    debug_assert!(repeats <= MAX_RUN);
    if repeats > 0xFF {
        encoded[0] |= H1_RUN_SHORT;
        writer.write_bytes(encoded);
        writer.write_u16(repeats as u16);
    } else if repeats > 0 {
        encoded[0] |= H1_RUN_BYTE;
        writer.write_bytes(encoded);
        writer.write_u8(repeats as u8);
    } else {
        writer.write_bytes(encoded);
    }
}

/// Appends the run-length encoding of `grid` to `writer`.
///
/// An empty grid writes nothing.
pub fn encode_tiles(grid: &TileGrid, importance: &FrameImportance, writer: &mut PacketWriter<'_>) {
    let mut current: Vec<u8> = Vec::with_capacity(16);
    let mut candidate: Vec<u8> = Vec::with_capacity(16);
    let mut repeats = 0usize;
    let mut tiles = grid.tiles().iter();

    let Some(first) = tiles.next() else {
        return;
    };
    encode_tile(first, importance, &mut current);

    for tile in tiles {
        encode_tile(tile, importance, &mut candidate);
        if candidate == current && repeats < MAX_RUN {
            repeats += 1;
            continue;
        }
        flush_run(&mut current, repeats, writer);
        std::mem::swap(&mut current, &mut candidate);
        repeats = 0;
    }
    flush_run(&mut current, repeats, writer);
}

fn malformed(what: &str, err: CodecError) -> CodecError {
    match err {
        CodecError::TruncatedPacket { needed, remaining } => CodecError::MalformedTileGrid(format!(
            "{what} truncated: needed {needed} bytes, {remaining} remaining"
        )),
        other => other,
    }
}

/// Decodes one run: the tile and how many extra copies follow it.
fn decode_run(reader: &mut PacketReader<'_>, importance: &FrameImportance) -> Result<(Tile, usize)> {
    let h1 = reader.read_u8().map_err(|e| malformed("tile header", e))?;
    let mut h2 = 0u8;
    let mut h3 = 0u8;
    let mut h4 = 0u8;
    if h1 & H1_HEADER2 != 0 {
        h2 = reader.read_u8().map_err(|e| malformed("tile header", e))?;
        if h2 & H2_HEADER3 != 0 {
            h3 = reader.read_u8().map_err(|e| malformed("tile header", e))?;
            if h3 & H3_HEADER4 != 0 {
                h4 = reader.read_u8().map_err(|e| malformed("tile header", e))?;
            }
        }
    }

    let mut tile = Tile::empty();
    let attr = |e: CodecError| malformed("tile attributes", e);

    if h1 & H1_BLOCK != 0 {
        let block = if h1 & H1_WIDE_BLOCK != 0 {
            reader.read_u16().map_err(attr)?
        } else {
            u16::from(reader.read_u8().map_err(attr)?)
        };
        tile.block = Some(block);
        if importance.contains(block) {
            let x = reader.read_i16().map_err(attr)?;
            let y = reader.read_i16().map_err(attr)?;
            tile.frame = Some(TileFrame::new(x, y));
        }
        if h3 & H3_BLOCK_PAINT != 0 {
            tile.block_paint = reader.read_u8().map_err(attr)?;
        }
    }

    if h1 & H1_WALL != 0 {
        tile.wall = u16::from(reader.read_u8().map_err(attr)?);
        if h3 & H3_WALL_PAINT != 0 {
            tile.wall_paint = reader.read_u8().map_err(attr)?;
        }
    }

    let liquid = (h1 & H1_LIQUID_MASK) >> H1_LIQUID_SHIFT;
    if liquid != 0 {
        tile.liquid = reader.read_u8().map_err(attr)?;
        tile.liquid_kind = match liquid {
            LIQUID_WATER if h3 & H3_SHIMMER != 0 => LiquidKind::Shimmer,
            LIQUID_WATER => LiquidKind::Water,
            LIQUID_LAVA => LiquidKind::Lava,
            _ => LiquidKind::Honey,
        };
    }

    let mut flags = TileFlags::NONE;
    flags.set(TileFlags::RED_WIRE, h2 & H2_RED_WIRE != 0);
    flags.set(TileFlags::BLUE_WIRE, h2 & H2_BLUE_WIRE != 0);
    flags.set(TileFlags::GREEN_WIRE, h2 & H2_GREEN_WIRE != 0);
    let shape = (h2 & H2_SHAPE_MASK) >> H2_SHAPE_SHIFT;
    tile.shape = BlockShape::from_u8(shape)
        .ok_or_else(|| CodecError::MalformedTileGrid(format!("invalid block shape {shape}")))?;

    flags.set(TileFlags::ACTUATOR, h3 & H3_ACTUATOR != 0);
    flags.set(TileFlags::INACTIVE, h3 & H3_INACTIVE != 0);
    flags.set(TileFlags::YELLOW_WIRE, h3 & H3_YELLOW_WIRE != 0);
    if h3 & H3_WIDE_WALL != 0 {
        if h1 & H1_WALL == 0 {
            return Err(CodecError::MalformedTileGrid(
                "wall high byte without a wall".to_string(),
            ));
        }
        let hi = reader.read_u8().map_err(attr)?;
        tile.wall |= u16::from(hi) << 8;
    }

    flags.set(TileFlags::INVISIBLE_BLOCK, h4 & H4_INVISIBLE_BLOCK != 0);
    flags.set(TileFlags::INVISIBLE_WALL, h4 & H4_INVISIBLE_WALL != 0);
    flags.set(TileFlags::FULLBRIGHT_BLOCK, h4 & H4_FULLBRIGHT_BLOCK != 0);
    flags.set(TileFlags::FULLBRIGHT_WALL, h4 & H4_FULLBRIGHT_WALL != 0);
    tile.flags = flags;

    let repeats = match h1 & (H1_RUN_BYTE | H1_RUN_SHORT) {
        0 => 0,
        H1_RUN_BYTE => usize::from(reader.read_u8().map_err(|e| malformed("run count", e))?),
        H1_RUN_SHORT => usize::from(reader.read_u16().map_err(|e| malformed("run count", e))?),
        _ => {
            return Err(CodecError::MalformedTileGrid(
                "both run count width bits set".to_string(),
            ))
        }
    };

    Ok((tile, repeats))
}

/// Every run takes at least one byte, so a short body cannot fill a large
/// declared grid; reserve for what the bytes can actually describe.
fn initial_capacity(total: usize, remaining: usize) -> usize {
    total.min(remaining.saturating_mul(4))
}

/// Reads a `width x height` grid written by [`encode_tiles`].
pub fn decode_tiles(
    reader: &mut PacketReader<'_>,
    width: u16,
    height: u16,
    importance: &FrameImportance,
) -> Result<TileGrid> {
    let total = usize::from(width) * usize::from(height);
    let limit = reader.config().max_grid_tiles;
    if total > limit {
        return Err(CodecError::MalformedTileGrid(format!(
            "{width}x{height} grid exceeds the {limit} tile limit"
        )));
    }

    let mut tiles = Vec::with_capacity(initial_capacity(total, reader.remaining()));
    while tiles.len() < total {
        let (tile, repeats) = decode_run(reader, importance)?;
        let left = total - tiles.len() - 1;
        if repeats > left {
            return Err(CodecError::MalformedTileGrid(format!(
                "run of {repeats} repeats overflows the grid ({left} cells left)"
            )));
        }
        tiles.extend(std::iter::repeat(tile).take(repeats + 1));
    }

    TileGrid::from_tiles(width, height, tiles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CodecConfig;
    use proptest::prelude::*;

    fn encode(grid: &TileGrid, importance: &FrameImportance) -> Vec<u8> {
        let mut writer = PacketWriter::new();
        encode_tiles(grid, importance, &mut writer);
        writer.as_slice().to_vec()
    }

    fn decode(bytes: &[u8], width: u16, height: u16, importance: &FrameImportance) -> Result<TileGrid> {
        let mut reader = PacketReader::new(bytes);
        let grid = decode_tiles(&mut reader, width, height, importance)?;
        assert!(reader.is_empty(), "{} bytes left over", reader.remaining());
        Ok(grid)
    }

    #[test]
    fn test_empty_grid() {
        let importance = FrameImportance::default();
        for grid in [TileGrid::new(0, 0), TileGrid::new(0, 7), TileGrid::new(7, 0)] {
            let bytes = encode(&grid, &importance);
            assert!(bytes.is_empty());
            assert_eq!(decode(&bytes, grid.width(), grid.height(), &importance).unwrap(), grid);
        }
    }

    #[test]
    fn test_single_air_tile() {
        let importance = FrameImportance::default();
        let grid = TileGrid::new(1, 1);
        assert_eq!(encode(&grid, &importance), vec![0x00]);
    }

    #[test]
    fn test_known_layout() {
        let importance = FrameImportance::empty();
        // dirt block on a wall, half brick, red wire; then 3 copies
        let tile = Tile::block(0)
            .with_wall(2)
            .with_shape(BlockShape::HalfBrick)
            .with_flags(TileFlags::RED_WIRE);
        let grid = TileGrid::filled(4, 1, tile);
        let bytes = encode(&grid, &importance);
        // h1: header2 | block | wall | one-byte run
        // h2: red wire | shape 1
        assert_eq!(bytes, vec![0b0100_0111, 0b0001_0010, 0x00, 0x02, 3]);
    }

    #[test]
    fn test_wide_ids_and_frames() {
        let importance = FrameImportance::from_ids([300]);
        let tile = Tile::framed_block(300, TileFrame::new(18, -36))
            .with_wall(0x0123)
            .with_paint(5, 6);
        let grid = TileGrid::filled(1, 1, tile);
        let bytes = encode(&grid, &importance);
        assert_eq!(
            bytes,
            vec![
                0b0010_0111, // header2 | block | wall | wide block
                0b0000_0001, // header3
                0b0101_1000, // block paint | wall paint | wide wall
                0x2C, 0x01,  // block 300
                18, 0, 0xDC, 0xFF, // frame
                5,           // block paint
                0x23,        // wall low
                6,           // wall paint
                0x01,        // wall high
            ]
        );
        assert_eq!(decode(&bytes, 1, 1, &importance).unwrap(), grid);
    }

    #[test]
    fn test_liquids() {
        let importance = FrameImportance::empty();
        let tiles = vec![
            Tile::empty().with_liquid(255, LiquidKind::Water),
            Tile::empty().with_liquid(128, LiquidKind::Lava),
            Tile::empty().with_liquid(64, LiquidKind::Honey),
            Tile::empty().with_liquid(32, LiquidKind::Shimmer),
        ];
        let grid = TileGrid::from_tiles(4, 1, tiles).unwrap();
        let bytes = encode(&grid, &importance);
        assert_eq!(
            bytes,
            vec![0x08, 255, 0x10, 128, 0x18, 64, 0x09, 0x01, 0x80, 32]
        );
        assert_eq!(decode(&bytes, 4, 1, &importance).unwrap(), grid);
    }

    #[test]
    fn test_header4_flags() {
        let importance = FrameImportance::empty();
        let flags = TileFlags::INVISIBLE_BLOCK | TileFlags::FULLBRIGHT_WALL | TileFlags::YELLOW_WIRE;
        let grid = TileGrid::filled(1, 1, Tile::block(1).with_flags(flags));
        let bytes = encode(&grid, &importance);
        assert_eq!(bytes, vec![0x03, 0x01, 0x21, 0x12, 0x01]);
        assert_eq!(decode(&bytes, 1, 1, &importance).unwrap(), grid);
    }

    #[test]
    fn test_run_count_widths() {
        let importance = FrameImportance::empty();

        let grid = TileGrid::filled(256, 1, Tile::block(1));
        let bytes = encode(&grid, &importance);
        assert_eq!(bytes, vec![0x42, 0x01, 255]);

        let grid = TileGrid::filled(257, 1, Tile::block(1));
        let bytes = encode(&grid, &importance);
        assert_eq!(bytes, vec![0x82, 0x01, 0x00, 0x01]);
        assert_eq!(decode(&bytes, 257, 1, &importance).unwrap(), grid);
    }

    #[test]
    fn test_run_spanning_beyond_max() {
        let importance = FrameImportance::empty();
        // 200 x 200 = 40000 identical tiles: one capped run plus a remainder
        let grid = TileGrid::filled(200, 200, Tile::block(1));
        let bytes = encode(&grid, &importance);
        let first = MAX_RUN as u16;
        let rest = (40_000 - MAX_RUN - 2) as u16;
        let mut expected = vec![0x82, 0x01];
        expected.extend_from_slice(&first.to_le_bytes());
        expected.extend_from_slice(&[0x82, 0x01]);
        expected.extend_from_slice(&rest.to_le_bytes());
        assert_eq!(bytes, expected);
        assert_eq!(decode(&bytes, 200, 200, &importance).unwrap(), grid);
    }

    #[test]
    fn test_runs_break_on_difference() {
        let importance = FrameImportance::empty();
        let tiles = vec![
            Tile::block(1),
            Tile::block(1),
            Tile::block(2),
            Tile::empty(),
            Tile::empty(),
            Tile::empty(),
        ];
        let grid = TileGrid::from_tiles(3, 2, tiles).unwrap();
        let bytes = encode(&grid, &importance);
        assert_eq!(bytes, vec![0x42, 1, 1, 0x02, 2, 0x40, 2]);
        assert_eq!(decode(&bytes, 3, 2, &importance).unwrap(), grid);
    }

    #[test]
    fn test_unsent_attributes_do_not_break_runs() {
        let importance = FrameImportance::empty();
        // frames of non-important blocks are not on the wire
        let tiles = vec![
            Tile::framed_block(1, TileFrame::new(0, 0)),
            Tile::framed_block(1, TileFrame::new(18, 18)),
        ];
        let grid = TileGrid::from_tiles(2, 1, tiles).unwrap();
        assert_eq!(encode(&grid, &importance), vec![0x42, 1, 1]);
    }

    #[test]
    fn test_truncated_tile_data() {
        let importance = FrameImportance::empty();
        // header promises a block id that is missing
        assert!(matches!(
            decode(&[0x02], 1, 1, &importance),
            Err(CodecError::MalformedTileGrid(_))
        ));
        // header promises a two-byte run count, only one present
        assert!(matches!(
            decode(&[0x80, 0x05], 10, 1, &importance),
            Err(CodecError::MalformedTileGrid(_))
        ));
        // grid needs more runs than supplied
        assert!(matches!(
            decode(&[0x00], 2, 1, &importance),
            Err(CodecError::MalformedTileGrid(_))
        ));
    }

    #[test]
    fn test_corrupt_run_bytes() {
        let importance = FrameImportance::empty();
        // run longer than the grid
        assert!(matches!(
            decode(&[0x40, 5], 3, 1, &importance),
            Err(CodecError::MalformedTileGrid(_))
        ));
        // both run width bits
        assert!(matches!(
            decode(&[0xC0, 0, 0], 3, 1, &importance),
            Err(CodecError::MalformedTileGrid(_))
        ));
        // shape 7
        assert!(matches!(
            decode(&[0x01, 0x70], 1, 1, &importance),
            Err(CodecError::MalformedTileGrid(_))
        ));
    }

    #[test]
    fn test_grid_size_limit() {
        let config = CodecConfig::new().with_max_grid_tiles(100);
        let mut reader = PacketReader::with_config(&[0x00], &config);
        assert!(matches!(
            decode_tiles(&mut reader, 11, 10, &config.frame_important),
            Err(CodecError::MalformedTileGrid(_))
        ));
    }

    #[test]
    fn test_short_body_for_huge_grid() {
        assert_eq!(initial_capacity(1024 * 1024, 1), 4);
        assert_eq!(initial_capacity(6, 1000), 6);

        let importance = FrameImportance::default();
        let mut reader = PacketReader::new(&[0x40]);
        assert!(matches!(
            decode_tiles(&mut reader, 1024, 1024, &importance),
            Err(CodecError::MalformedTileGrid(_))
        ));
    }

    fn arb_tile() -> impl Strategy<Value = Tile> {
        (
            prop::option::of(prop_oneof![0u16..8, 250u16..700]),
            any::<(i16, i16)>(),
            prop_oneof![Just(0u16), 1u16..4, 250u16..400],
            prop_oneof![Just(0u8), any::<u8>()],
            0u8..4,
            (0u8..3, 0u8..3),
            0u8..6,
            0u16..1024,
        )
            .prop_map(|(block, frame, wall, liquid, kind, paint, shape, flags)| {
                let liquid_kind = match kind {
                    0 => LiquidKind::Water,
                    1 => LiquidKind::Lava,
                    2 => LiquidKind::Honey,
                    _ => LiquidKind::Shimmer,
                };
                Tile {
                    block,
                    frame: Some(TileFrame::new(frame.0, frame.1)),
                    wall,
                    liquid,
                    liquid_kind,
                    block_paint: paint.0,
                    wall_paint: paint.1,
                    shape: BlockShape::from_u8(shape).unwrap(),
                    flags: TileFlags::from_bits(flags),
                }
            })
    }

    fn arb_grid() -> impl Strategy<Value = TileGrid> {
        (0u16..12, 0u16..12).prop_flat_map(|(width, height)| {
            // few distinct tiles so runs actually form
            prop::collection::vec(arb_tile(), 1..4).prop_flat_map(move |palette| {
                let cells = usize::from(width) * usize::from(height);
                prop::collection::vec(0..palette.len(), cells).prop_map(move |picks| {
                    let tiles = picks.into_iter().map(|i| palette[i]).collect();
                    TileGrid::from_tiles(width, height, tiles).unwrap()
                })
            })
        })
    }

    proptest! {
        #[test]
        fn prop_encoding_is_deterministic(grid in arb_grid()) {
            let importance = FrameImportance::from_ids([3, 5, 300, 600]);
            let first = encode(&grid, &importance);
            let decoded = decode(&first, grid.width(), grid.height(), &importance).unwrap();
            prop_assert_eq!(&decoded, &grid.canonical(&importance));
            let second = encode(&decoded, &importance);
            prop_assert_eq!(first, second);
        }
    }
}
