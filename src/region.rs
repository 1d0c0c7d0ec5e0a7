use crate::block_entity::BlockEntity;
use crate::block_position::BlockPosition;
use crate::block_state::BlockState;
use crate::bounding_box::BoundingBox;
use crate::container::PackedVoxelContainer;
use crate::entity::Entity;
use crate::error::{Result, SchematicError};
use crate::nbt::{read_xyz, xyz_compound};
use crate::tick::{ScheduledTick, TickKind};
use quartz_nbt::{NbtCompound, NbtList, NbtTag};
use std::collections::BTreeMap;

/// One named cuboid of a schematic.
///
/// `position` is the anchor corner relative to the schematic origin and
/// `size` is signed: its sign gives the direction from the anchor to the
/// opposite corner. Block entities and ticks are keyed relative to the
/// region's minimum corner, entities are relative to the anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct SubRegion {
    pub position: BlockPosition,
    pub size: BlockPosition,
    pub container: PackedVoxelContainer,
    pub block_entities: BTreeMap<BlockPosition, BlockEntity>,
    pub entities: Vec<Entity>,
    pub ticks: BTreeMap<(TickKind, BlockPosition), ScheduledTick>,
}

impl SubRegion {
    pub fn new(position: BlockPosition, size: BlockPosition) -> Self {
        SubRegion {
            position,
            size,
            container: PackedVoxelContainer::new(size),
            block_entities: BTreeMap::new(),
            entities: Vec::new(),
            ticks: BTreeMap::new(),
        }
    }

    /// Area relative to the schematic origin.
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_position_and_size(self.position, self.size)
    }

    /// Minimum corner relative to the schematic origin.
    pub fn min_corner(&self) -> BlockPosition {
        self.bounding_box().min
    }

    /// Offset from the anchor corner to the minimum corner.
    pub fn anchor_to_min(&self) -> BlockPosition {
        self.min_corner() - self.position
    }

    pub fn get_block(&self, x: i32, y: i32, z: i32) -> Result<&BlockState> {
        self.container.get(x, y, z)
    }

    pub fn set_block(&mut self, x: i32, y: i32, z: i32, state: &BlockState) -> Result<()> {
        self.container.set(x, y, z, state)
    }

    /// Stores the record keyed (and positioned) at `pos`, relative to the minimum corner.
    pub fn set_block_entity(&mut self, pos: BlockPosition, block_entity: BlockEntity) {
        self.block_entities.insert(pos, block_entity.at(pos));
    }

    pub fn get_block_entity(&self, pos: BlockPosition) -> Option<&BlockEntity> {
        self.block_entities.get(&pos)
    }

    pub fn add_entity(&mut self, entity: Entity) {
        self.entities.push(entity);
    }

    /// A later tick for the same kind and position replaces the earlier one.
    pub fn add_tick(&mut self, tick: ScheduledTick) {
        self.ticks.insert(tick.key(), tick);
    }

    pub fn ticks_of(&self, kind: TickKind) -> impl Iterator<Item = &ScheduledTick> {
        self.ticks.values().filter(move |t| t.kind == kind)
    }

    pub fn count_non_air(&self) -> u64 {
        self.container.count_non_air()
    }

    pub fn volume(&self) -> i64 {
        self.size.volume()
    }

    pub fn to_litematic_nbt(&self) -> NbtCompound {
        let mut region_nbt = NbtCompound::new();

        region_nbt.insert(
            "Position",
            xyz_compound(self.position.x, self.position.y, self.position.z),
        );
        region_nbt.insert("Size", xyz_compound(self.size.x, self.size.y, self.size.z));

        let (palette, block_states) = self.container.serialize();
        let palette_nbt =
            NbtList::from(palette.iter().map(BlockState::to_nbt).collect::<Vec<NbtTag>>());
        region_nbt.insert("BlockStatePalette", NbtTag::List(palette_nbt));
        region_nbt.insert("BlockStates", NbtTag::LongArray(block_states));

        let entities_nbt = NbtList::from(
            self.entities
                .iter()
                .map(|entity| NbtTag::Compound(entity.to_nbt()))
                .collect::<Vec<NbtTag>>(),
        );
        region_nbt.insert("Entities", NbtTag::List(entities_nbt));

        let tile_entities = NbtList::from(
            self.block_entities
                .values()
                .map(|be| NbtTag::Compound(be.to_nbt()))
                .collect::<Vec<NbtTag>>(),
        );
        region_nbt.insert("TileEntities", NbtTag::List(tile_entities));

        for kind in [TickKind::Block, TickKind::Fluid] {
            let ticks = NbtList::from(
                self.ticks_of(kind)
                    .map(|tick| NbtTag::Compound(tick.to_nbt()))
                    .collect::<Vec<NbtTag>>(),
            );
            let key = match kind {
                TickKind::Block => "PendingBlockTicks",
                TickKind::Fluid => "PendingFluidTicks",
            };
            region_nbt.insert(key, NbtTag::List(ticks));
        }

        region_nbt
    }

    /// Decode one region of a document written with format `version`.
    pub fn from_litematic_nbt(name: &str, nbt: &NbtCompound, version: i32) -> Result<Self> {
        let vec3 = |key: &str| -> Result<BlockPosition> {
            nbt.get::<_, &NbtCompound>(key)
                .ok()
                .and_then(read_xyz)
                .map(BlockPosition::from)
                .ok_or_else(|| {
                    SchematicError::corrupt(format!("region '{}' has no valid {}", name, key))
                })
        };
        let position = vec3("Position")?;
        let size = vec3("Size")?;
        // the far corner must stay addressable
        if size.checked_abs().is_none()
            || position.checked_add(size.relative_end_from_size()).is_none()
        {
            return Err(SchematicError::corrupt(format!(
                "region '{}' has out of range size {} at {}",
                name, size, position
            )));
        }

        let palette_tag = nbt.get::<_, &NbtList>("BlockStatePalette").map_err(|e| {
            SchematicError::corrupt(format!("region '{}' has no palette: {}", name, e))
        })?;
        let palette = palette_tag
            .iter()
            .map(|tag| match tag {
                NbtTag::Compound(compound) => {
                    BlockState::from_nbt(compound).map_err(SchematicError::CorruptData)
                }
                _ => Err(SchematicError::corrupt("palette entry is not a compound")),
            })
            .collect::<Result<Vec<_>>>()?;

        let block_states = match nbt.inner().get("BlockStates") {
            Some(NbtTag::LongArray(words)) => words,
            _ => {
                return Err(SchematicError::corrupt(format!(
                    "region '{}' has no block state array",
                    name
                )))
            }
        };
        let container = PackedVoxelContainer::deserialize(palette, block_states, size)?;

        let mut region = SubRegion {
            position,
            size,
            container,
            block_entities: BTreeMap::new(),
            entities: Vec::new(),
            ticks: BTreeMap::new(),
        };

        for tag in compounds(nbt, "TileEntities") {
            let be = if version >= 2 {
                BlockEntity::from_nbt(tag).ok()
            } else {
                legacy_block_entity(tag)
            };
            if let Some(be) = be {
                region.block_entities.insert(be.position, be);
            }
        }

        for tag in compounds(nbt, "Entities") {
            let entity = if version >= 2 {
                Entity::from_nbt(tag).ok()
            } else {
                legacy_entity(tag)
            };
            if let Some(entity) = entity {
                region.entities.push(entity);
            }
        }

        if version >= 3 {
            for tag in compounds(nbt, "PendingBlockTicks") {
                if let Some(tick) = ScheduledTick::from_nbt(TickKind::Block, tag) {
                    region.add_tick(tick);
                }
            }
        }
        if version >= 5 {
            for tag in compounds(nbt, "PendingFluidTicks") {
                if let Some(tick) = ScheduledTick::from_nbt(TickKind::Fluid, tag) {
                    region.add_tick(tick);
                }
            }
        }

        Ok(region)
    }
}

fn compounds<'a>(nbt: &'a NbtCompound, key: &str) -> impl Iterator<Item = &'a NbtCompound> {
    nbt.get::<_, &NbtList>(key)
        .ok()
        .into_iter()
        .flat_map(|list| list.iter())
        .filter_map(|tag| match tag {
            NbtTag::Compound(c) => Some(c),
            _ => None,
        })
}

/// Version 1 kept the position beside the record: `{x, y, z, TileNBT}`.
fn legacy_block_entity(tag: &NbtCompound) -> Option<BlockEntity> {
    let pos = BlockPosition::from(read_xyz(tag)?);
    let mut inner = tag.get::<_, &NbtCompound>("TileNBT").ok()?.clone();
    if inner.inner().is_empty() {
        return None;
    }
    inner.insert("x", pos.x);
    inner.insert("y", pos.y);
    inner.insert("z", pos.z);
    BlockEntity::from_nbt(&inner).ok()
}

/// Version 1 entities: `{dx, dy, dz, EntityData}`.
fn legacy_entity(tag: &NbtCompound) -> Option<Entity> {
    let pos = (
        tag.get::<_, f64>("dx").ok()?,
        tag.get::<_, f64>("dy").ok()?,
        tag.get::<_, f64>("dz").ok()?,
    );
    let mut inner = tag.get::<_, &NbtCompound>("EntityData").ok()?.clone();
    if inner.inner().is_empty() {
        return None;
    }
    inner.insert(
        "Pos",
        NbtTag::List(NbtList::from(vec![
            NbtTag::Double(pos.0),
            NbtTag::Double(pos.1),
            NbtTag::Double(pos.2),
        ])),
    );
    Entity::from_nbt(&inner).ok()
}
