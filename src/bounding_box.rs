use crate::block_position::BlockPosition;
use serde::{Deserialize, Serialize};

/// Inclusive integer box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: BlockPosition,
    pub max: BlockPosition,
}

impl BoundingBox {
    pub fn new(min: BlockPosition, max: BlockPosition) -> Self {
        BoundingBox { min, max }
    }

    /// Box spanning two arbitrary corners.
    pub fn from_corners(a: BlockPosition, b: BlockPosition) -> Self {
        BoundingBox {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Box of an area anchored at `position` with a signed `size`.
    /// The size must not have a zero component.
    pub fn from_position_and_size(position: BlockPosition, size: BlockPosition) -> Self {
        let end = position + size.relative_end_from_size();
        BoundingBox::from_corners(position, end)
    }

    /// The full-height box of a 16x16 chunk column.
    pub fn chunk_column(chunk_x: i32, chunk_z: i32, min_y: i32, max_y: i32) -> Self {
        BoundingBox {
            min: BlockPosition::new(chunk_x << 4, min_y, chunk_z << 4),
            max: BlockPosition::new((chunk_x << 4) + 15, max_y, (chunk_z << 4) + 15),
        }
    }

    pub fn get_dimensions(&self) -> (i32, i32, i32) {
        (
            self.max.x - self.min.x + 1,
            self.max.y - self.min.y + 1,
            self.max.z - self.min.z + 1,
        )
    }

    pub fn size(&self) -> BlockPosition {
        self.get_dimensions().into()
    }

    pub fn volume(&self) -> i64 {
        let (w, h, l) = self.get_dimensions();
        w as i64 * h as i64 * l as i64
    }

    #[inline]
    pub fn contains(&self, pos: BlockPosition) -> bool {
        pos.x >= self.min.x
            && pos.x <= self.max.x
            && pos.y >= self.min.y
            && pos.y <= self.max.y
            && pos.z >= self.min.z
            && pos.z <= self.max.z
    }

    pub fn contains_box(&self, other: &BoundingBox) -> bool {
        self.contains(other.min) && self.contains(other.max)
    }

    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);
        if min.x > max.x || min.y > max.y || min.z > max.z {
            None
        } else {
            Some(BoundingBox { min, max })
        }
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Chunk columns touched by this box, in x-major order.
    pub fn touched_chunks(&self) -> Vec<(i32, i32)> {
        let mut chunks = Vec::new();
        for cx in (self.min.x >> 4)..=(self.max.x >> 4) {
            for cz in (self.min.z >> 4)..=(self.max.z >> 4) {
                chunks.push((cx, cz));
            }
        }
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_position_and_negative_size() {
        let bb = BoundingBox::from_position_and_size(
            BlockPosition::new(5, 0, 5),
            BlockPosition::new(-3, 2, 1),
        );
        assert_eq!(bb.min, BlockPosition::new(3, 0, 5));
        assert_eq!(bb.max, BlockPosition::new(5, 1, 5));
        assert_eq!(bb.volume(), 6);
    }

    #[test]
    fn test_intersection() {
        let a = BoundingBox::new(BlockPosition::new(0, 0, 0), BlockPosition::new(20, 5, 20));
        let chunk = BoundingBox::chunk_column(1, 0, -64, 319);
        let hit = a.intersection(&chunk).unwrap();
        assert_eq!(hit.min, BlockPosition::new(16, 0, 0));
        assert_eq!(hit.max, BlockPosition::new(20, 5, 15));

        let far = BoundingBox::chunk_column(5, 5, -64, 319);
        assert!(a.intersection(&far).is_none());
    }

    #[test]
    fn test_touched_chunks_negative() {
        let bb = BoundingBox::new(BlockPosition::new(-1, 0, 0), BlockPosition::new(16, 0, 0));
        assert_eq!(bb.touched_chunks(), vec![(-1, 0), (0, 0), (1, 0)]);
    }
}
