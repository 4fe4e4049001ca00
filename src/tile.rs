use std::fmt;

use bytemuck::{Pod, Zeroable};

/// 8-bit sRGB colour, laid out for direct upload.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(0xFF, 0xFF, 0xFF);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn from_u32(hex: u32) -> Self {
        Self::new((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
    }

    /// Parses `#RRGGBB`.
    pub fn from_hex(text: &str) -> Option<Self> {
        let digits = text.strip_prefix('#')?;
        if digits.len() != 6 {
            return None;
        }
        u32::from_str_radix(digits, 16).ok().map(Self::from_u32)
    }

    /// Multiplies every channel by `factor`, clamping to the 0..=255 range.
    pub fn scaled(self, factor: f32) -> Self {
        let scale = |c: u8| (c as f32 * factor).floor().clamp(0.0, 255.0) as u8;
        Self::new(scale(self.r), scale(self.g), scale(self.b))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TileKind {
    Grass,
    Flower,
    Sand,
    Dune,
    Stone,
    Mountain,
    Snow,
    Ice,
    Water,
}

#[derive(Clone, Copy, Debug)]
struct TileInfo {
    name: &'static str,
    color: Rgb,
    walkable: bool,
}

const TILE_INFOS: [TileInfo; 9] = [
    TileInfo {
        name: "grass",
        color: Rgb::from_u32(0x7AAB67),
        walkable: true,
    },
    TileInfo {
        name: "flower",
        color: Rgb::from_u32(0x8AB979),
        walkable: true,
    },
    TileInfo {
        name: "sand",
        color: Rgb::from_u32(0xDBD28E),
        walkable: true,
    },
    TileInfo {
        name: "dune",
        color: Rgb::from_u32(0xD6C97B),
        walkable: true,
    },
    TileInfo {
        name: "stone",
        color: Rgb::from_u32(0x8E8E8E),
        walkable: true,
    },
    TileInfo {
        name: "mountain",
        color: Rgb::from_u32(0x6B6B6B),
        walkable: false,
    },
    TileInfo {
        name: "snow",
        color: Rgb::from_u32(0xE8F0F0),
        walkable: true,
    },
    TileInfo {
        name: "ice",
        color: Rgb::from_u32(0xB3E0E5),
        walkable: true,
    },
    TileInfo {
        name: "water",
        color: Rgb::from_u32(0x266691),
        walkable: false,
    },
];

impl TileKind {
    fn info(self) -> &'static TileInfo {
        &TILE_INFOS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    pub fn default_color(self) -> Rgb {
        self.info().color
    }

    /// Walkability before any entity is placed on the tile.
    pub fn is_walkable(self) -> bool {
        self.info().walkable
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StructureKind {
    Ruins,
    Temple,
    Camp,
    Grave,
}

impl StructureKind {
    pub const ALL: [StructureKind; 4] = [
        StructureKind::Ruins,
        StructureKind::Temple,
        StructureKind::Camp,
        StructureKind::Grave,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StructureKind::Ruins => "ruins",
            StructureKind::Temple => "temple",
            StructureKind::Camp => "camp",
            StructureKind::Grave => "grave",
        }
    }

    pub fn color(self) -> Rgb {
        match self {
            StructureKind::Ruins => Rgb::from_u32(0x8C8C8C),
            StructureKind::Temple => Rgb::from_u32(0xD4BC7A),
            StructureKind::Camp => Rgb::from_u32(0x964B00),
            StructureKind::Grave => Rgb::from_u32(0x666666),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tile {
    pub kind: TileKind,
    pub walkable: bool,
    pub color: Rgb,
    pub elevation: i32,
    pub world_x: i32,
    pub world_y: i32,
    pub variant: u8,
    pub structure: Option<StructureKind>,
}

impl Tile {
    pub fn new(kind: TileKind) -> Self {
        Self {
            kind,
            walkable: kind.is_walkable(),
            color: kind.default_color(),
            elevation: 0,
            world_x: 0,
            world_y: 0,
            variant: 0,
            structure: None,
        }
    }

    /// Marks the tile as blocked. Walkability is never restored once lost.
    pub fn block(&mut self) {
        self.walkable = false;
    }
}

impl Default for Tile {
    fn default() -> Self {
        Tile::new(TileKind::Grass)
    }
}
