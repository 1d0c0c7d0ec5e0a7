use crate::block_position::BlockPosition;
use crate::nbt::{compound_to_map, NbtValue};
use crate::transforms::{transform_rotation16, Mirror, Orientation, Rotation};
use quartz_nbt::{NbtCompound, NbtTag};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Structured data attached to one block position (container contents,
/// sign text, ...). `position` is whatever frame the owner uses: relative to
/// the region minimum corner inside a document, absolute inside a world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockEntity {
    pub id: String,
    pub position: BlockPosition,
    pub nbt: HashMap<String, NbtValue>,
}

const CONTENT_KEYS: [&str; 3] = ["Items", "RecordItem", "Book"];

impl BlockEntity {
    pub fn new(id: impl Into<String>, position: BlockPosition) -> Self {
        BlockEntity {
            id: id.into(),
            position,
            nbt: HashMap::new(),
        }
    }

    pub fn with_nbt_data(mut self, key: impl Into<String>, value: NbtValue) -> Self {
        self.nbt.insert(key.into(), value);
        self
    }

    /// Copy of this record relocated to `position`.
    pub fn at(&self, position: BlockPosition) -> BlockEntity {
        BlockEntity {
            position,
            ..self.clone()
        }
    }

    pub fn has_contents(&self) -> bool {
        CONTENT_KEYS.iter().any(|k| self.nbt.contains_key(*k))
    }

    /// Drop inventory-like payloads so nothing spills when the block is replaced.
    pub fn clear_contents(&mut self) {
        for key in CONTENT_KEYS {
            self.nbt.remove(key);
        }
    }

    /// Re-orient the direction-bearing fields of the record.
    pub fn oriented(&self, orientation: Orientation) -> BlockEntity {
        if orientation.is_identity() {
            return self.clone();
        }
        let mut out = self.clone();

        if let Some(rot) = self.nbt.get("Rot").and_then(NbtValue::as_i64) {
            let value = transform_rotation16(rot as i32, orientation.mirror, orientation.rotation);
            out.nbt.insert("Rot".to_string(), NbtValue::Byte(value as i8));
        }

        // Structure blocks carry their own orientation, which stacks under ours.
        let own_rotation = self
            .nbt
            .get("rotation")
            .and_then(NbtValue::as_str)
            .and_then(rotation_from_name);
        let own_mirror = self
            .nbt
            .get("mirror")
            .and_then(NbtValue::as_str)
            .and_then(mirror_from_name);
        if let (Some(rotation), Some(mirror)) = (own_rotation, own_mirror) {
            let combined = Orientation::new(mirror, rotation).then(orientation);
            out.nbt.insert(
                "rotation".to_string(),
                NbtValue::String(rotation_name(combined.rotation).to_string()),
            );
            out.nbt.insert(
                "mirror".to_string(),
                NbtValue::String(mirror_name(combined.mirror).to_string()),
            );
        }

        out
    }

    pub fn to_nbt(&self) -> NbtCompound {
        let mut compound = NbtCompound::new();
        for (key, value) in &self.nbt {
            compound.insert(key, value.to_tag());
        }
        if !self.id.is_empty() {
            compound.insert("id", NbtTag::String(self.id.clone()));
        }
        compound.insert("x", self.position.x);
        compound.insert("y", self.position.y);
        compound.insert("z", self.position.z);
        compound
    }

    pub fn from_nbt(nbt: &NbtCompound) -> Result<Self, String> {
        let coord = |key: &str| {
            nbt.get::<_, i32>(key)
                .map_err(|e| format!("Failed to get block entity {}: {}", key, e))
        };
        let position = BlockPosition::new(coord("x")?, coord("y")?, coord("z")?);
        let id = nbt
            .get::<_, &str>("id")
            .or_else(|_| nbt.get::<_, &str>("Id"))
            .map(str::to_string)
            .unwrap_or_default();

        let mut data = compound_to_map(nbt);
        for key in ["id", "Id", "x", "y", "z"] {
            data.remove(key);
        }

        Ok(BlockEntity {
            id,
            position,
            nbt: data,
        })
    }
}

fn rotation_from_name(name: &str) -> Option<Rotation> {
    match name {
        "NONE" => Some(Rotation::None),
        "CLOCKWISE_90" => Some(Rotation::Clockwise90),
        "CLOCKWISE_180" => Some(Rotation::Clockwise180),
        "COUNTERCLOCKWISE_90" => Some(Rotation::CounterClockwise90),
        _ => None,
    }
}

fn rotation_name(rotation: Rotation) -> &'static str {
    match rotation {
        Rotation::None => "NONE",
        Rotation::Clockwise90 => "CLOCKWISE_90",
        Rotation::Clockwise180 => "CLOCKWISE_180",
        Rotation::CounterClockwise90 => "COUNTERCLOCKWISE_90",
    }
}

fn mirror_from_name(name: &str) -> Option<Mirror> {
    match name {
        "NONE" => Some(Mirror::None),
        "LEFT_RIGHT" => Some(Mirror::LeftRight),
        "FRONT_BACK" => Some(Mirror::FrontBack),
        _ => None,
    }
}

fn mirror_name(mirror: Mirror) -> &'static str {
    match mirror {
        Mirror::None => "NONE",
        Mirror::LeftRight => "LEFT_RIGHT",
        Mirror::FrontBack => "FRONT_BACK",
    }
}
