use crate::block_state::BlockState;
use crate::bounding_box::BoundingBox;
use crate::block_position::BlockPosition;
use crate::error::{Result, SchematicError};
use crate::metadata::SchematicMetadata;
use crate::region::SubRegion;
use crate::selection::AreaSelection;
use std::collections::{BTreeMap, HashMap};

pub const DEFAULT_DATA_VERSION: i32 = 1631;

/// A multi-region schematic. Regions are kept in canonical (sorted) name order.
#[derive(Debug, Clone, PartialEq)]
pub struct SchematicDocument {
    pub metadata: SchematicMetadata,
    pub regions: BTreeMap<String, SubRegion>,
    pub minecraft_data_version: i32,
}

impl SchematicDocument {
    pub fn new(name: impl Into<String>, author: impl Into<String>) -> Self {
        SchematicDocument {
            metadata: SchematicMetadata::new(name, author),
            regions: BTreeMap::new(),
            minecraft_data_version: DEFAULT_DATA_VERSION,
        }
    }

    /// Air-filled regions for every valid box of `area`, ready to be filled
    /// chunk by chunk. Boxes that cannot be captured are returned as errors;
    /// an area without any valid box is itself an error.
    pub fn empty_for_area(
        area: &AreaSelection,
        author: impl Into<String>,
    ) -> Result<(Self, Vec<SchematicError>)> {
        let (valid, errors) = area.partition_boxes();
        if valid.is_empty() {
            return Err(errors
                .into_iter()
                .next()
                .unwrap_or_else(|| SchematicError::EmptySelection(area.name.clone())));
        }
        let mut doc = SchematicDocument::new(area.name.clone(), author);
        for (named_box, _) in valid {
            doc.regions.insert(
                named_box.name.clone(),
                SubRegion::new(named_box.pos1 - area.origin, named_box.size),
            );
        }
        doc.update_metadata();
        Ok((doc, errors))
    }

    pub fn add_region(&mut self, name: impl Into<String>, region: SubRegion) {
        self.regions.insert(name.into(), region);
    }

    pub fn region(&self, name: &str) -> Option<&SubRegion> {
        self.regions.get(name)
    }

    pub fn region_mut(&mut self, name: &str) -> Option<&mut SubRegion> {
        self.regions.get_mut(name)
    }

    pub fn region_names(&self) -> Vec<&str> {
        self.regions.keys().map(String::as_str).collect()
    }

    pub fn region_positions(&self) -> BTreeMap<&str, BlockPosition> {
        self.regions
            .iter()
            .map(|(name, r)| (name.as_str(), r.position))
            .collect()
    }

    pub fn region_sizes(&self) -> BTreeMap<&str, BlockPosition> {
        self.regions
            .iter()
            .map(|(name, r)| (name.as_str(), r.size))
            .collect()
    }

    /// Union of all region boxes, relative to the schematic origin.
    pub fn enclosing_box(&self) -> Option<BoundingBox> {
        self.regions
            .values()
            .map(SubRegion::bounding_box)
            .reduce(|a, b| a.union(&b))
    }

    pub fn total_volume(&self) -> i64 {
        self.regions.values().map(SubRegion::volume).sum()
    }

    pub fn total_blocks(&self) -> i64 {
        self.regions.values().map(|r| r.count_non_air() as i64).sum()
    }

    /// Non-air block counts across all regions.
    pub fn material_counts(&self) -> HashMap<BlockState, u64> {
        let mut totals = HashMap::new();
        for region in self.regions.values() {
            for (state, count) in region.container.material_counts() {
                if !state.is_air() {
                    *totals.entry(state).or_insert(0) += count;
                }
            }
        }
        totals
    }

    /// Recompute the derived metadata fields from the regions.
    pub fn update_metadata(&mut self) {
        self.metadata.region_count = self.regions.len() as i32;
        self.metadata.total_volume = self.total_volume();
        self.metadata.total_blocks = self.total_blocks();
        self.metadata.enclosing_size = self
            .enclosing_box()
            .map(|bb| bb.size())
            .unwrap_or_default();
        self.metadata.touch();
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.metadata.name = name.into();
        self.metadata.touch();
    }

    pub fn set_author(&mut self, author: impl Into<String>) {
        self.metadata.author = author.into();
        self.metadata.touch();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.metadata.description = description.into();
        self.metadata.touch();
    }

    pub fn set_preview_image(&mut self, pixels: Option<Vec<i32>>) {
        self.metadata.preview_image = pixels;
        self.metadata.touch();
    }
}
