use crate::error::{CodecError, Result};
use crate::protocol::MAX_PACKET_SIZE;
use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Block ids whose tiles carry frame coordinates on the wire.
///
/// Terraria marks these as "frame important": furniture, plants, torches and
/// other multi-tile objects whose sprite position cannot be derived from the
/// neighbouring tiles.
const DEFAULT_FRAME_IMPORTANT: &[u16] = &[
    3, 4, 5, 10, 11, 12, 13, 14, 15, 16, 17, 18, 20, 21, 24, 26, 27, 28, 29, 31, 33, 34, 35, 36,
    42, 50, 55, 61, 71, 72, 73, 74, 77, 78, 79, 81, 82, 83, 84, 85, 86, 87, 88, 89, 90, 91, 92,
    93, 94, 95, 96, 97, 98, 99, 100, 101, 102, 103, 104, 105, 106, 110, 113, 114, 125, 126, 128,
    129, 132, 133, 134, 135, 136, 137, 138, 139, 141, 142, 143, 144, 149, 165, 171, 172, 173,
    174, 178, 184, 185, 186, 187, 201, 207, 209, 210, 212, 215, 216, 217, 218, 219, 220, 227,
    228, 231, 233, 235, 236, 237, 238, 239, 240, 241, 242, 243, 244, 245, 246, 247, 254, 269,
    270, 271, 275, 276, 277, 278, 279, 280, 281, 282, 283, 285, 286, 287, 288, 289, 290, 291,
    292, 293, 294, 295, 296, 297, 298, 299, 300, 301, 302, 303, 304, 305, 306, 307, 308, 309,
    310, 314, 316, 317, 318, 319, 320, 323, 324, 334, 335, 337, 338, 339, 349, 354, 355, 356,
    358, 359, 360, 361, 362, 363, 364, 372, 373, 374, 375, 376, 377, 378, 380, 386, 387, 388,
    389, 390, 391, 392, 393, 394, 395, 405, 406, 410, 411, 412, 413, 414, 419, 420, 423, 424,
    425, 427, 428, 429, 435, 436, 437, 438, 439, 440, 441, 442, 443, 444, 445, 452, 453, 454,
    455, 456, 457, 461, 462, 463, 464, 465, 466, 467, 468, 469, 470, 471, 475, 476, 480, 484,
    485, 486, 487, 488, 489, 490, 491, 493, 494, 497, 499, 505, 506, 509, 510, 511, 518, 519,
    520, 521, 522, 523, 524, 525, 526, 527, 529, 530, 531, 532, 533, 538, 542, 543, 544, 545,
    547, 548, 549, 550, 551, 552, 553, 554, 555, 556, 558, 559, 564, 565, 567, 568, 569, 570,
    571, 572, 573, 580, 581, 582, 583, 584, 585, 586, 587, 588, 589, 590, 591, 592, 593, 594,
    595, 596, 597, 598, 599, 600, 601, 602, 603, 604, 605, 606, 607, 608, 609, 610, 611, 612,
    613, 614, 615, 616, 617, 619, 620, 621, 622, 623, 624, 629, 630, 631, 632, 634, 637, 639,
    640, 642, 643, 644, 645, 646, 647, 648, 649, 650, 651, 652, 653, 654, 655, 656, 657, 658,
    660, 663, 664, 665,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameImportance {
    ids: AHashSet<u16>,
}

impl FrameImportance {
    pub fn empty() -> Self {
        Self { ids: AHashSet::new() }
    }

    pub fn from_ids<I: IntoIterator<Item = u16>>(ids: I) -> Self {
        Self { ids: ids.into_iter().collect() }
    }

    pub fn terraria() -> Self {
        Self::from_ids(DEFAULT_FRAME_IMPORTANT.iter().copied())
    }

    pub fn contains(&self, block: u16) -> bool {
        self.ids.contains(&block)
    }

    pub fn insert(&mut self, block: u16) -> bool {
        self.ids.insert(block)
    }

    pub fn remove(&mut self, block: u16) -> bool {
        self.ids.remove(&block)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl Default for FrameImportance {
    fn default() -> Self {
        Self::terraria()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Tile bodies shorter than this are never deflated.
    pub compression_threshold: usize,
    /// flate2 level, 0-9.
    pub compression_level: u32,
    /// Upper bound for an inflated tile body.
    pub max_inflated_size: usize,
    /// Upper bound for `width * height` of a decoded tile grid.
    pub max_grid_tiles: usize,
    /// Reject packets the receiving side can never be addressed with.
    pub enforce_direction: bool,
    pub max_packet_size: usize,
    pub frame_important: FrameImportance,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            compression_threshold: 128,
            compression_level: 6,
            max_inflated_size: 4 * 1024 * 1024,
            max_grid_tiles: 1 << 20,
            enforce_direction: false,
            max_packet_size: MAX_PACKET_SIZE,
            frame_important: FrameImportance::default(),
        }
    }
}

impl CodecConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared default configuration used by readers and writers built without one.
    pub fn shared_default() -> &'static CodecConfig {
        static DEFAULT: OnceLock<CodecConfig> = OnceLock::new();
        DEFAULT.get_or_init(CodecConfig::default)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: CodecConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.compression_level > 9 {
            return Err(CodecError::Config(format!(
                "compression_level must be 0-9, got {}",
                self.compression_level
            )));
        }
        if self.max_packet_size > MAX_PACKET_SIZE {
            return Err(CodecError::Config(format!(
                "max_packet_size {} exceeds the u16 length prefix",
                self.max_packet_size
            )));
        }
        if self.max_inflated_size == 0 {
            return Err(CodecError::Config("max_inflated_size must be non-zero".to_string()));
        }
        Ok(())
    }

    pub fn with_compression_threshold(mut self, threshold: usize) -> Self {
        self.compression_threshold = threshold;
        self
    }

    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level;
        self
    }

    pub fn with_max_inflated_size(mut self, size: usize) -> Self {
        self.max_inflated_size = size;
        self
    }

    pub fn with_max_grid_tiles(mut self, tiles: usize) -> Self {
        self.max_grid_tiles = tiles;
        self
    }

    pub fn with_enforce_direction(mut self, enabled: bool) -> Self {
        self.enforce_direction = enabled;
        self
    }

    pub fn with_max_packet_size(mut self, size: usize) -> Self {
        self.max_packet_size = size;
        self
    }

    pub fn with_frame_important(mut self, frame_important: FrameImportance) -> Self {
        self.frame_important = frame_important;
        self
    }
}
