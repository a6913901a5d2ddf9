use serde::{Deserialize, Serialize};

use crate::ids::WorldId;

/// An integer block position scoped to a world. Equality is component-wise,
/// including the world — two positions in different worlds are never equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPosition {
    pub world: WorldId,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPosition {
    pub fn new(world: WorldId, x: i32, y: i32, z: i32) -> Self {
        Self { world, x, y, z }
    }

    /// The chunk key of the 16x16-column this position falls in.
    pub fn chunk_key(&self) -> ChunkKey {
        ChunkKey {
            world: self.world,
            cx: self.x.div_euclid(16),
            cz: self.z.div_euclid(16),
        }
    }
}

/// `(WorldId, cx, cz)` — the spatial index key. `cx`/`cz` are
/// `floor(x/16)`/`floor(z/16)`, computed with Euclidean division so negative
/// coordinates chunk the same way the client does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkKey {
    pub world: WorldId,
    pub cx: i32,
    pub cz: i32,
}

impl ChunkKey {
    pub fn new(world: WorldId, cx: i32, cz: i32) -> Self {
        Self { world, cx, cz }
    }

    pub fn from_block(x: i32, z: i32, world: WorldId) -> Self {
        Self {
            world,
            cx: x.div_euclid(16),
            cz: z.div_euclid(16),
        }
    }
}

/// A position relative to a view's origin; `0 <= rx < w`, etc. are enforced
/// by `BoundingBox::relative_of`, never constructed directly from untrusted
/// input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelativePos {
    pub rx: u32,
    pub ry: u32,
    pub rz: u32,
}

impl RelativePos {
    pub fn new(rx: u32, ry: u32, rz: u32) -> Self {
        Self { rx, ry, rz }
    }
}
