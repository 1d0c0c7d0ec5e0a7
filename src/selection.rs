use crate::block_position::BlockPosition;
use crate::bounding_box::BoundingBox;
use crate::error::{Result, SchematicError};
use serde::{Deserialize, Serialize};

/// One named cuboid of an area selection, given by its anchor corner and a
/// signed size. The anchor becomes the sub-region's stored position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedBox {
    pub name: String,
    pub pos1: BlockPosition,
    pub size: BlockPosition,
}

impl NamedBox {
    pub fn new(name: impl Into<String>, pos1: BlockPosition, size: BlockPosition) -> Self {
        NamedBox {
            name: name.into(),
            pos1,
            size,
        }
    }

    /// Box between two inclusive corners; `pos1` is the anchor.
    pub fn from_corners(name: impl Into<String>, pos1: BlockPosition, pos2: BlockPosition) -> Self {
        fn extent(d: i32) -> i32 {
            if d >= 0 {
                d + 1
            } else {
                d - 1
            }
        }
        let d = pos2 - pos1;
        NamedBox::new(name, pos1, BlockPosition::new(extent(d.x), extent(d.y), extent(d.z)))
    }

    pub fn is_empty(&self) -> bool {
        self.size.x == 0 || self.size.y == 0 || self.size.z == 0
    }

    /// World-space box, or `EmptySelection` for a zero-sized dimension.
    pub fn bounding_box(&self) -> Result<BoundingBox> {
        if self.is_empty() {
            return Err(SchematicError::EmptySelection(self.name.clone()));
        }
        Ok(BoundingBox::from_position_and_size(self.pos1, self.size))
    }
}

/// A set of named boxes captured together, with positions stored relative to `origin`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaSelection {
    pub name: String,
    pub origin: BlockPosition,
    pub boxes: Vec<NamedBox>,
}

impl AreaSelection {
    pub fn new(name: impl Into<String>, origin: BlockPosition) -> Self {
        AreaSelection {
            name: name.into(),
            origin,
            boxes: Vec::new(),
        }
    }

    pub fn with_box(mut self, named_box: NamedBox) -> Self {
        self.boxes.push(named_box);
        self
    }

    /// Boxes that can be captured, plus the errors for the ones that cannot.
    pub fn partition_boxes(&self) -> (Vec<(&NamedBox, BoundingBox)>, Vec<SchematicError>) {
        let mut valid = Vec::new();
        let mut errors = Vec::new();
        for b in &self.boxes {
            match b.bounding_box() {
                Ok(bb) => valid.push((b, bb)),
                Err(e) => errors.push(e),
            }
        }
        (valid, errors)
    }

    pub fn enclosing_box(&self) -> Option<BoundingBox> {
        self.boxes
            .iter()
            .filter_map(|b| b.bounding_box().ok())
            .reduce(|a, b| a.union(&b))
    }

    /// Every chunk column touched by a valid box, without duplicates.
    pub fn touched_chunks(&self) -> Vec<(i32, i32)> {
        let mut chunks: Vec<(i32, i32)> = self
            .boxes
            .iter()
            .filter_map(|b| b.bounding_box().ok())
            .flat_map(|bb| bb.touched_chunks())
            .collect();
        chunks.sort_unstable();
        chunks.dedup();
        chunks
    }
}
