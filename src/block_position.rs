use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Neg, Sub};

/// Integer block coordinate. Used both for absolute world positions and for
/// offsets relative to a schematic or region corner.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct BlockPosition {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPosition {
    pub const ORIGIN: BlockPosition = BlockPosition { x: 0, y: 0, z: 0 };

    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        BlockPosition { x, y, z }
    }

    pub fn min(self, other: BlockPosition) -> BlockPosition {
        BlockPosition::new(
            self.x.min(other.x),
            self.y.min(other.y),
            self.z.min(other.z),
        )
    }

    pub fn max(self, other: BlockPosition) -> BlockPosition {
        BlockPosition::new(
            self.x.max(other.x),
            self.y.max(other.y),
            self.z.max(other.z),
        )
    }

    /// Component-wise magnitude, saturating at `i32::MAX`.
    pub fn abs(self) -> BlockPosition {
        BlockPosition::new(
            self.x.saturating_abs(),
            self.y.saturating_abs(),
            self.z.saturating_abs(),
        )
    }

    /// `None` when a component is `i32::MIN`.
    pub fn checked_abs(self) -> Option<BlockPosition> {
        Some(BlockPosition::new(
            self.x.checked_abs()?,
            self.y.checked_abs()?,
            self.z.checked_abs()?,
        ))
    }

    /// Product of the absolute components, saturating at `i64::MAX`.
    pub fn volume(self) -> i64 {
        (self.x.unsigned_abs() as i64)
            .saturating_mul(self.y.unsigned_abs() as i64)
            .saturating_mul(self.z.unsigned_abs() as i64)
    }

    /// Product of the absolute components, `None` if it does not fit a `usize`.
    pub fn checked_volume(self) -> Option<usize> {
        (self.x.unsigned_abs() as usize)
            .checked_mul(self.y.unsigned_abs() as usize)?
            .checked_mul(self.z.unsigned_abs() as usize)
    }

    pub fn checked_add(self, other: BlockPosition) -> Option<BlockPosition> {
        Some(BlockPosition::new(
            self.x.checked_add(other.x)?,
            self.y.checked_add(other.y)?,
            self.z.checked_add(other.z)?,
        ))
    }

    /// Offset from the first corner of an area of this (signed) size to its
    /// opposite corner, ie. `size - 1` towards the sign of each component.
    pub fn relative_end_from_size(self) -> BlockPosition {
        fn end(v: i32) -> i32 {
            if v >= 0 {
                v - 1
            } else {
                v + 1
            }
        }
        BlockPosition::new(end(self.x), end(self.y), end(self.z))
    }

    pub fn as_tuple(self) -> (i32, i32, i32) {
        (self.x, self.y, self.z)
    }

    /// Chunk column coordinates of this position.
    pub fn chunk_pos(self) -> (i32, i32) {
        (self.x >> 4, self.z >> 4)
    }
}

impl From<(i32, i32, i32)> for BlockPosition {
    fn from((x, y, z): (i32, i32, i32)) -> Self {
        BlockPosition::new(x, y, z)
    }
}

impl Add for BlockPosition {
    type Output = BlockPosition;

    fn add(self, rhs: BlockPosition) -> BlockPosition {
        BlockPosition::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for BlockPosition {
    type Output = BlockPosition;

    fn sub(self, rhs: BlockPosition) -> BlockPosition {
        BlockPosition::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for BlockPosition {
    type Output = BlockPosition;

    fn neg(self) -> BlockPosition {
        BlockPosition::new(-self.x, -self.y, -self.z)
    }
}

impl fmt::Display for BlockPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}
