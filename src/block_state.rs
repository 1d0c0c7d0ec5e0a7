use crate::transforms::{
    transform_block_state_mirror, transform_block_state_rotate, Mirror, Orientation, Rotation,
};
use quartz_nbt::{NbtCompound, NbtTag};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;
use std::hash::{Hash, Hasher};

pub const AIR: &str = "minecraft:air";
pub const STRUCTURE_VOID: &str = "minecraft:structure_void";
pub const BARRIER: &str = "minecraft:barrier";

/// A block id plus its property assignment. Treated as an immutable value:
/// the transform helpers return new states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockState {
    pub name: SmolStr,
    pub properties: Vec<(SmolStr, SmolStr)>,
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.properties.is_empty() {
            write!(f, "[")?;
            for (i, (key, value)) in self.properties.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{}={}", key, value)?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

impl Hash for BlockState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        for (k, v) in &self.properties {
            k.hash(state);
            v.hash(state);
        }
    }
}

impl Default for BlockState {
    fn default() -> Self {
        BlockState::air()
    }
}

impl BlockState {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        BlockState {
            name: name.into(),
            properties: Vec::new(),
        }
    }

    pub fn air() -> Self {
        BlockState::new(AIR)
    }

    pub fn get_name(&self) -> &str {
        self.name.as_str()
    }

    pub fn with_property(mut self, key: impl Into<SmolStr>, value: impl Into<SmolStr>) -> Self {
        self.set_property(key, value);
        self
    }

    pub fn with_properties(mut self, mut properties: Vec<(SmolStr, SmolStr)>) -> Self {
        sort_properties(&mut properties);
        self.properties = properties;
        self
    }

    /// Properties are kept sorted by key so that equality and hashing do not
    /// depend on the order they were read in.
    pub fn set_property(&mut self, key: impl Into<SmolStr>, value: impl Into<SmolStr>) {
        let key = key.into();
        let value = value.into();
        match self
            .properties
            .binary_search_by(|(k, _)| k.as_str().cmp(key.as_str()))
        {
            Ok(idx) => self.properties[idx].1 = value,
            Err(idx) => self.properties.insert(idx, (key, value)),
        }
    }

    pub fn get_property(&self, key: &str) -> Option<&SmolStr> {
        self.properties
            .binary_search_by(|(k, _)| k.as_str().cmp(key))
            .ok()
            .map(|idx| &self.properties[idx].1)
    }

    pub fn is_air(&self) -> bool {
        matches!(
            self.name.as_str(),
            AIR | "minecraft:cave_air" | "minecraft:void_air"
        )
    }

    /// Placeholder meaning "leave the destination untouched".
    pub fn is_structure_void(&self) -> bool {
        self.name == STRUCTURE_VOID
    }

    /// Whether the block holds a fluid, either as its own material or waterlogged.
    pub fn has_fluid(&self) -> bool {
        matches!(
            self.name.as_str(),
            "minecraft:water" | "minecraft:lava" | "minecraft:bubble_column"
        ) || self
            .get_property("waterlogged")
            .is_some_and(|v| v == "true")
    }

    pub fn rotate(&self, rotation: Rotation) -> BlockState {
        transform_block_state_rotate(self, rotation)
    }

    pub fn mirror(&self, mirror: Mirror) -> BlockState {
        transform_block_state_mirror(self, mirror)
    }

    /// Mirror first, then rotate.
    pub fn oriented(&self, orientation: Orientation) -> BlockState {
        if orientation.is_identity() {
            return self.clone();
        }
        self.mirror(orientation.mirror).rotate(orientation.rotation)
    }

    pub fn to_nbt(&self) -> NbtTag {
        let mut compound = NbtCompound::new();
        compound.insert("Name", self.name.to_string());

        if !self.properties.is_empty() {
            let mut properties = NbtCompound::new();
            for (key, value) in &self.properties {
                properties.insert(key.to_string(), value.to_string());
            }
            compound.insert("Properties", properties);
        }

        NbtTag::Compound(compound)
    }

    pub fn from_nbt(compound: &NbtCompound) -> Result<Self, String> {
        let name: SmolStr = compound
            .get::<_, &String>("Name")
            .map_err(|e| format!("Failed to get Name: {}", e))?
            .into();

        let mut properties = Vec::new();
        if let Ok(props) = compound.get::<_, &NbtCompound>("Properties") {
            for (key, value) in props.inner() {
                if let NbtTag::String(value_str) = value {
                    properties.push((key.into(), value_str.into()));
                }
            }
        }

        sort_properties(&mut properties);
        Ok(BlockState { name, properties })
    }
}

pub(crate) fn sort_properties(properties: &mut [(SmolStr, SmolStr)]) {
    properties.sort_by(|a, b| a.0.cmp(&b.0));
}
