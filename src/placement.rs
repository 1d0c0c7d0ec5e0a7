//! Binding of a schematic to world coordinates.

use crate::block_position::BlockPosition;
use crate::bounding_box::BoundingBox;
use crate::region::SubRegion;
use crate::schematic::SchematicDocument;
use crate::transforms::{Mirror, Orientation, Rotation, Transform};
use crate::world::WorldBounds;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which destination blocks a paste may overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplaceBehavior {
    /// Only fill destinations that are air.
    None,
    /// Overwrite anything, but never with air.
    #[default]
    WithNonAir,
    All,
}

/// Per-region overrides of a placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubRegionPlacement {
    pub name: String,
    /// Anchor position relative to the placement origin, before the schematic transform.
    pub pos: BlockPosition,
    default_pos: BlockPosition,
    pub rotation: Rotation,
    pub mirror: Mirror,
    pub enabled: bool,
    pub ignore_entities: bool,
}

impl SubRegionPlacement {
    pub fn new(name: impl Into<String>, default_pos: BlockPosition) -> Self {
        SubRegionPlacement {
            name: name.into(),
            pos: default_pos,
            default_pos,
            rotation: Rotation::None,
            mirror: Mirror::None,
            enabled: true,
            ignore_entities: false,
        }
    }

    pub fn orientation(&self) -> Orientation {
        Orientation::new(self.mirror, self.rotation)
    }

    pub fn is_default(&self) -> bool {
        self.pos == self.default_pos
            && self.rotation == Rotation::None
            && self.mirror == Mirror::None
            && self.enabled
            && !self.ignore_entities
    }

    pub fn reset(&mut self) {
        *self = SubRegionPlacement::new(std::mem::take(&mut self.name), self.default_pos);
    }
}

/// A schematic placed in the world: origin, schematic-level orientation and
/// per-region overrides. Not stored in the document; many placements may
/// share one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchematicPlacement {
    pub name: String,
    pub origin: BlockPosition,
    pub rotation: Rotation,
    pub mirror: Mirror,
    pub ignore_entities: bool,
    pub enabled: bool,
    regions: BTreeMap<String, SubRegionPlacement>,
}

impl SchematicPlacement {
    pub fn new(doc: &SchematicDocument, origin: BlockPosition) -> Self {
        let regions = doc
            .regions
            .iter()
            .map(|(name, region)| {
                (
                    name.clone(),
                    SubRegionPlacement::new(name.clone(), region.position),
                )
            })
            .collect();
        SchematicPlacement {
            name: doc.metadata.name.clone(),
            origin,
            rotation: Rotation::None,
            mirror: Mirror::None,
            ignore_entities: false,
            enabled: true,
            regions,
        }
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_mirror(mut self, mirror: Mirror) -> Self {
        self.mirror = mirror;
        self
    }

    pub fn set_origin(&mut self, origin: BlockPosition) {
        self.origin = origin;
    }

    pub fn move_by(&mut self, offset: BlockPosition) {
        self.origin = self.origin + offset;
    }

    pub fn orientation(&self) -> Orientation {
        Orientation::new(self.mirror, self.rotation)
    }

    pub fn region(&self, name: &str) -> Option<&SubRegionPlacement> {
        self.regions.get(name)
    }

    pub fn region_mut(&mut self, name: &str) -> Option<&mut SubRegionPlacement> {
        self.regions.get_mut(name)
    }

    pub fn regions(&self) -> impl Iterator<Item = &SubRegionPlacement> {
        self.regions.values()
    }

    /// Returns the new enabled state, or `None` for an unknown region.
    pub fn toggle_region(&mut self, name: &str) -> Option<bool> {
        let region = self.regions.get_mut(name)?;
        region.enabled = !region.enabled;
        Some(region.enabled)
    }

    pub fn reset_region(&mut self, name: &str) -> bool {
        match self.regions.get_mut(name) {
            Some(region) => {
                region.reset();
                true
            }
            None => false,
        }
    }

    pub fn reset_all_regions(&mut self) {
        self.regions.values_mut().for_each(SubRegionPlacement::reset);
    }

    /// Enabled regions of the document paired with their placement, in name order.
    pub fn enabled_regions<'a>(
        &'a self,
        doc: &'a SchematicDocument,
    ) -> impl Iterator<Item = (&'a str, &'a SubRegion, &'a SubRegionPlacement)> + 'a {
        doc.regions.iter().filter_map(move |(name, region)| {
            if !self.enabled {
                return None;
            }
            let placement = self.regions.get(name)?;
            placement
                .enabled
                .then_some((name.as_str(), region, placement))
        })
    }

    /// Maps positions relative to a region's anchor to world positions:
    /// region orientation first, then the schematic orientation, then the origin.
    pub fn region_transform(&self, placement: &SubRegionPlacement) -> Transform {
        let schematic = Transform::from_orientation(self.orientation());
        let placed_anchor = self.origin + schematic.apply_linear(placement.pos);
        Transform::from_orientation(placement.orientation())
            .then(&schematic.with_translation(placed_anchor))
    }

    /// Maps container-local positions (relative to the minimum corner) to world positions.
    pub fn block_transform(&self, region: &SubRegion, placement: &SubRegionPlacement) -> Transform {
        Transform::translation(region.anchor_to_min()).then(&self.region_transform(placement))
    }

    /// Combined orientation applied to block states and records of a region.
    pub fn region_orientation(&self, placement: &SubRegionPlacement) -> Orientation {
        placement.orientation().then(self.orientation())
    }

    /// World-space box covered by a region.
    pub fn region_world_box(&self, region: &SubRegion, placement: &SubRegionPlacement) -> BoundingBox {
        let local = BoundingBox::new(
            BlockPosition::ORIGIN,
            region.container.size() - BlockPosition::new(1, 1, 1),
        );
        self.block_transform(region, placement).transform_box(&local)
    }

    /// World-space boxes of every enabled region.
    pub fn footprint(&self, doc: &SchematicDocument) -> BTreeMap<String, BoundingBox> {
        self.enabled_regions(doc)
            .filter(|(_, region, _)| region.container.volume() > 0)
            .map(|(name, region, placement)| {
                (name.to_string(), self.region_world_box(region, placement))
            })
            .collect()
    }

    /// Chunk columns touched by the enabled regions, sorted and unique.
    pub fn touched_chunks(&self, doc: &SchematicDocument) -> Vec<(i32, i32)> {
        let mut chunks: Vec<(i32, i32)> = self
            .footprint(doc)
            .values()
            .flat_map(BoundingBox::touched_chunks)
            .collect();
        chunks.sort_unstable();
        chunks.dedup();
        chunks
    }

    /// Part of a region's world box inside one chunk column and the world height.
    pub fn region_chunk_box(
        &self,
        region: &SubRegion,
        placement: &SubRegionPlacement,
        chunk_x: i32,
        chunk_z: i32,
        bounds: &WorldBounds,
    ) -> Option<BoundingBox> {
        let column = BoundingBox::chunk_column(chunk_x, chunk_z, bounds.min_y, bounds.max_y);
        self.region_world_box(region, placement).intersection(&column)
    }
}
