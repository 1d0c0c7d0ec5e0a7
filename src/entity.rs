use crate::block_position::BlockPosition;
use crate::nbt::{compound_to_map, NbtValue};
use crate::transforms::Transform;
use quartz_nbt::{NbtCompound, NbtList, NbtTag};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An entity snapshot. Inside a document `position` is relative to the
/// owning region's anchor corner; inside a world it is absolute.
///
/// Passengers stay nested in `nbt["Passengers"]` and move with their vehicle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub position: (f64, f64, f64),
    pub nbt: HashMap<String, NbtValue>,
}

impl Entity {
    pub fn new(id: String, position: (f64, f64, f64)) -> Self {
        Entity {
            id,
            position,
            nbt: HashMap::new(),
        }
    }

    pub fn with_nbt_data(mut self, key: String, value: NbtValue) -> Self {
        self.nbt.insert(key, value);
        self
    }

    pub fn yaw(&self) -> Option<f32> {
        match self.nbt.get("Rotation") {
            Some(NbtValue::List(values)) => values.first().and_then(NbtValue::as_f64).map(|v| v as f32),
            _ => None,
        }
    }

    pub fn passengers(&self) -> Vec<Entity> {
        match self.nbt.get("Passengers") {
            Some(NbtValue::List(list)) => list
                .iter()
                .filter_map(|v| match v {
                    NbtValue::Compound(map) => Entity::from_value_map(map),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Shift the entity (and its passengers and hanging-block anchor) by `-offset`.
    pub fn rebased(&self, offset: BlockPosition) -> Entity {
        let (ox, oy, oz) = (offset.x as f64, offset.y as f64, offset.z as f64);
        self.map_positions(
            &|p| (p.0 - ox, p.1 - oy, p.2 - oz),
            &|b| b - offset,
            &|yaw| yaw,
            &|facing| facing,
        )
    }

    /// Apply a placement transform: position around block centres, yaw, and
    /// the anchor block and facing of hanging entities, recursively through
    /// passengers.
    pub fn transformed(&self, transform: &Transform) -> Entity {
        self.map_positions(
            &|p| transform.apply_vec(p),
            &|b| transform.apply(b),
            &|yaw| transform.transform_yaw(yaw),
            &|facing| transform.transform_direction(facing),
        )
    }

    fn map_positions(
        &self,
        pos: &dyn Fn((f64, f64, f64)) -> (f64, f64, f64),
        block: &dyn Fn(BlockPosition) -> BlockPosition,
        yaw: &dyn Fn(f32) -> f32,
        facing: &dyn Fn(i8) -> i8,
    ) -> Entity {
        let mut out = self.clone();
        out.position = pos(self.position);

        if let Some(NbtValue::List(rotation)) = out.nbt.get_mut("Rotation") {
            if let Some(NbtValue::Float(y)) = rotation.first_mut() {
                *y = yaw(*y);
            }
        }

        let tile = (
            self.nbt.get("TileX").and_then(NbtValue::as_i64),
            self.nbt.get("TileY").and_then(NbtValue::as_i64),
            self.nbt.get("TileZ").and_then(NbtValue::as_i64),
        );
        if let (Some(x), Some(y), Some(z)) = tile {
            let moved = block(BlockPosition::new(x as i32, y as i32, z as i32));
            out.nbt.insert("TileX".to_string(), NbtValue::Int(moved.x));
            out.nbt.insert("TileY".to_string(), NbtValue::Int(moved.y));
            out.nbt.insert("TileZ".to_string(), NbtValue::Int(moved.z));
        }

        // item frames, paintings and the like hang on the wall named by Facing
        match out.nbt.get_mut("Facing") {
            Some(NbtValue::Byte(id)) => *id = facing(*id),
            Some(NbtValue::Int(id)) => {
                if let Ok(small) = i8::try_from(*id) {
                    *id = facing(small) as i32;
                }
            }
            _ => {}
        }

        let passengers = self.passengers();
        if !passengers.is_empty() {
            let moved: Vec<NbtValue> = passengers
                .iter()
                .map(|p| NbtValue::from_tag(&NbtTag::Compound(p.map_positions(pos, block, yaw, facing).to_nbt())))
                .collect();
            out.nbt.insert("Passengers".to_string(), NbtValue::List(moved));
        }

        out
    }

    fn from_value_map(map: &HashMap<String, NbtValue>) -> Option<Entity> {
        match NbtValue::Compound(map.clone()).to_tag() {
            NbtTag::Compound(compound) => Entity::from_nbt(&compound).ok(),
            _ => None,
        }
    }

    pub fn to_nbt(&self) -> NbtCompound {
        let mut compound = NbtCompound::new();

        // Always store the full minecraft:id format
        let full_id = if self.id.starts_with("minecraft:") {
            self.id.clone()
        } else {
            format!("minecraft:{}", self.id)
        };
        compound.insert("id", NbtTag::String(full_id));

        let pos_list = NbtList::from(vec![
            NbtTag::Double(self.position.0),
            NbtTag::Double(self.position.1),
            NbtTag::Double(self.position.2),
        ]);
        compound.insert("Pos", NbtTag::List(pos_list));

        for (key, value) in &self.nbt {
            compound.insert(key, value.to_tag());
        }

        compound
    }

    pub fn from_nbt(nbt: &NbtCompound) -> Result<Self, String> {
        let id = match nbt.get::<_, &str>("id") {
            Ok(id) => id.to_string(),
            Err(_) => match nbt.get::<_, &str>("Id") {
                Ok(id) => id.to_string(),
                Err(e) => return Err(format!("Failed to get Entity id: {}", e)),
            },
        };
        let id = if id.starts_with("minecraft:") {
            id
        } else {
            format!("minecraft:{}", id)
        };

        let position = nbt
            .get::<_, &NbtList>("Pos")
            .map_err(|e| format!("Failed to get Entity position: {}", e))?;
        let position = if position.len() == 3 {
            (
                position
                    .get::<f64>(0)
                    .map_err(|e| format!("Failed to get X position: {}", e))?,
                position
                    .get::<f64>(1)
                    .map_err(|e| format!("Failed to get Y position: {}", e))?,
                position
                    .get::<f64>(2)
                    .map_err(|e| format!("Failed to get Z position: {}", e))?,
            )
        } else {
            return Err("Invalid position data".to_string());
        };

        let mut data = compound_to_map(nbt);
        for key in ["id", "Id", "Pos"] {
            data.remove(key);
        }

        Ok(Entity {
            id,
            position,
            nbt: data,
        })
    }
}
