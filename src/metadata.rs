use crate::block_position::BlockPosition;
use crate::nbt::{get_int_lenient, read_xyz, xyz_compound};
use chrono::Utc;
use quartz_nbt::{NbtCompound, NbtTag};
use serde::{Deserialize, Serialize};

/// Document-level metadata. Timestamps are milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchematicMetadata {
    pub name: String,
    pub author: String,
    pub description: String,
    pub time_created: i64,
    pub time_modified: i64,
    pub enclosing_size: BlockPosition,
    pub region_count: i32,
    pub total_volume: i64,
    pub total_blocks: i64,
    /// ARGB pixels of a square thumbnail.
    pub preview_image: Option<Vec<i32>>,
}

impl Default for SchematicMetadata {
    fn default() -> Self {
        let now = now_millis();
        SchematicMetadata {
            name: "Unnamed".to_string(),
            author: "Unknown".to_string(),
            description: String::new(),
            time_created: now,
            time_modified: now,
            enclosing_size: BlockPosition::ORIGIN,
            region_count: 0,
            total_volume: 0,
            total_blocks: 0,
            preview_image: None,
        }
    }
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

impl SchematicMetadata {
    pub fn new(name: impl Into<String>, author: impl Into<String>) -> Self {
        SchematicMetadata {
            name: name.into(),
            author: author.into(),
            ..Default::default()
        }
    }

    pub fn touch(&mut self) {
        self.time_modified = now_millis();
    }

    pub fn to_nbt(&self) -> NbtCompound {
        let mut compound = NbtCompound::new();
        compound.insert("Name", self.name.clone());
        compound.insert("Author", self.author.clone());
        compound.insert("Description", self.description.clone());
        compound.insert("TimeCreated", self.time_created);
        compound.insert("TimeModified", self.time_modified);
        compound.insert("RegionCount", self.region_count);
        compound.insert("TotalVolume", clamp_i32(self.total_volume));
        compound.insert("TotalBlocks", clamp_i32(self.total_blocks));
        let size = self.enclosing_size;
        compound.insert("EnclosingSize", xyz_compound(size.x, size.y, size.z));
        if let Some(pixels) = &self.preview_image {
            compound.insert("PreviewImageData", NbtTag::IntArray(pixels.clone()));
        }
        compound
    }

    /// Missing fields fall back to defaults; metadata never fails a load.
    pub fn from_nbt(nbt: &NbtCompound) -> Self {
        let string = |key: &str| nbt.get::<_, &str>(key).ok().map(str::to_string);
        let defaults = SchematicMetadata::default();
        SchematicMetadata {
            name: string("Name").unwrap_or(defaults.name),
            author: string("Author").unwrap_or(defaults.author),
            description: string("Description").unwrap_or_default(),
            time_created: get_int_lenient(nbt, "TimeCreated").unwrap_or(defaults.time_created),
            time_modified: get_int_lenient(nbt, "TimeModified").unwrap_or(defaults.time_modified),
            enclosing_size: nbt
                .get::<_, &NbtCompound>("EnclosingSize")
                .ok()
                .and_then(read_xyz)
                .map(BlockPosition::from)
                .unwrap_or_default(),
            region_count: get_int_lenient(nbt, "RegionCount").unwrap_or(0) as i32,
            total_volume: get_int_lenient(nbt, "TotalVolume").unwrap_or(0),
            total_blocks: get_int_lenient(nbt, "TotalBlocks").unwrap_or(0),
            preview_image: match nbt.inner().get("PreviewImageData") {
                Some(NbtTag::IntArray(pixels)) => Some(pixels.clone()),
                _ => None,
            },
        }
    }
}

fn clamp_i32(v: i64) -> i32 {
    v.clamp(0, i32::MAX as i64) as i32
}
