use super::{PendingTick, TickAccess, WorldAccess, WorldBounds, WorldEntity};
use crate::block_entity::BlockEntity;
use crate::block_position::BlockPosition;
use crate::block_state::BlockState;
use crate::bounding_box::BoundingBox;
use crate::entity::Entity;
use crate::error::{Result, SchematicError};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
struct MemoryTicks {
    game_time: i64,
    pending: Vec<PendingTick>,
}

impl TickAccess for MemoryTicks {
    fn game_time(&self) -> i64 {
        self.game_time
    }

    fn pending_ticks_in(&self, bb: &BoundingBox) -> Vec<PendingTick> {
        self.pending
            .iter()
            .filter(|t| bb.contains(t.position))
            .cloned()
            .collect()
    }

    fn schedule(&mut self, tick: PendingTick) {
        self.pending
            .retain(|t| !(t.kind == tick.kind && t.position == tick.position));
        self.pending.push(tick);
    }
}

/// Sparse in-memory world. Unset positions read as air and every chunk is
/// loaded unless marked otherwise.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorld {
    blocks: FxHashMap<BlockPosition, BlockState>,
    block_entities: FxHashMap<BlockPosition, BlockEntity>,
    entities: Vec<WorldEntity>,
    next_uuid: u128,
    unloaded: FxHashSet<(i32, i32)>,
    notified: Vec<BlockPosition>,
    bounds: WorldBounds,
    ticks: Option<MemoryTicks>,
}

impl MemoryWorld {
    pub fn new() -> Self {
        MemoryWorld::default()
    }

    /// A world with scheduled-tick queues, as on an authoritative server.
    pub fn with_ticks(game_time: i64) -> Self {
        MemoryWorld {
            ticks: Some(MemoryTicks {
                game_time,
                pending: Vec::new(),
            }),
            ..MemoryWorld::default()
        }
    }

    pub fn with_bounds(mut self, bounds: WorldBounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn set_chunk_loaded(&mut self, chunk_x: i32, chunk_z: i32, loaded: bool) {
        if loaded {
            self.unloaded.remove(&(chunk_x, chunk_z));
        } else {
            self.unloaded.insert((chunk_x, chunk_z));
        }
    }

    pub fn fill(&mut self, bb: &BoundingBox, state: &BlockState) {
        for y in bb.min.y..=bb.max.y {
            for z in bb.min.z..=bb.max.z {
                for x in bb.min.x..=bb.max.x {
                    self.set_block(BlockPosition::new(x, y, z), state);
                }
            }
        }
    }

    pub fn add_entity(&mut self, entity: Entity) -> u128 {
        self.next_uuid += 1;
        let uuid = self.next_uuid;
        self.entities.push(WorldEntity {
            uuid,
            entity,
            is_passenger: false,
        });
        uuid
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter().map(|e| &e.entity)
    }

    pub fn add_pending_tick(&mut self, tick: PendingTick) {
        if let Some(ticks) = self.ticks.as_mut() {
            ticks.schedule(tick);
        }
    }

    pub fn pending_ticks(&self) -> &[PendingTick] {
        self.ticks.as_ref().map(|t| t.pending.as_slice()).unwrap_or(&[])
    }

    pub fn notified_positions(&self) -> &[BlockPosition] {
        &self.notified
    }

    /// Snapshot of every non-air block, in position order.
    pub fn non_air_blocks(&self) -> BTreeMap<BlockPosition, BlockState> {
        self.blocks
            .iter()
            .map(|(pos, state)| (*pos, state.clone()))
            .collect()
    }

    pub fn block_entity_count(&self) -> usize {
        self.block_entities.len()
    }
}

impl WorldAccess for MemoryWorld {
    fn get_block(&self, pos: BlockPosition) -> BlockState {
        self.blocks.get(&pos).cloned().unwrap_or_else(BlockState::air)
    }

    fn set_block(&mut self, pos: BlockPosition, state: &BlockState) -> bool {
        let unchanged_block = self
            .blocks
            .get(&pos)
            .is_some_and(|old| old.name == state.name);
        if !unchanged_block {
            self.block_entities.remove(&pos);
        }
        if state.is_air() {
            self.blocks.remove(&pos);
        } else {
            self.blocks.insert(pos, state.clone());
        }
        true
    }

    fn get_block_entity(&self, pos: BlockPosition) -> Option<BlockEntity> {
        self.block_entities.get(&pos).cloned()
    }

    fn set_block_entity(&mut self, pos: BlockPosition, block_entity: BlockEntity) -> Result<()> {
        if !self.blocks.contains_key(&pos) {
            return Err(SchematicError::MetadataApplyFailure {
                state: BlockState::air().to_string(),
                pos,
                reason: "no block to attach the record to".to_string(),
            });
        }
        self.block_entities.insert(pos, block_entity.at(pos));
        Ok(())
    }

    fn clear_block_entity_contents(&mut self, pos: BlockPosition) {
        if let Some(be) = self.block_entities.get_mut(&pos) {
            be.clear_contents();
        }
    }

    fn entities_in_box(&self, bb: &BoundingBox) -> Vec<WorldEntity> {
        let inside = |e: &Entity| {
            let p = e.position;
            bb.contains(BlockPosition::new(
                p.0.floor() as i32,
                p.1.floor() as i32,
                p.2.floor() as i32,
            ))
        };
        let mut found = Vec::new();
        for vehicle in &self.entities {
            if inside(&vehicle.entity) {
                found.push(vehicle.clone());
            }
            for (i, passenger) in vehicle.entity.passengers().into_iter().enumerate() {
                if inside(&passenger) {
                    found.push(WorldEntity {
                        uuid: vehicle.uuid ^ ((i as u128 + 1) << 64),
                        entity: passenger,
                        is_passenger: true,
                    });
                }
            }
        }
        found
    }

    fn spawn_entity(&mut self, entity: Entity) -> bool {
        self.add_entity(entity);
        true
    }

    fn is_chunk_loaded(&self, chunk_x: i32, chunk_z: i32) -> bool {
        !self.unloaded.contains(&(chunk_x, chunk_z))
    }

    fn notify_neighbors(&mut self, pos: BlockPosition) {
        self.notified.push(pos);
    }

    fn world_bounds(&self) -> WorldBounds {
        self.bounds
    }

    fn ticks(&self) -> Option<&dyn TickAccess> {
        self.ticks.as_ref().map(|t| t as &dyn TickAccess)
    }

    fn ticks_mut(&mut self) -> Option<&mut dyn TickAccess> {
        self.ticks.as_mut().map(|t| t as &mut dyn TickAccess)
    }
}
