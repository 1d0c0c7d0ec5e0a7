//! The environment the engines read from and write to.

mod memory;

pub use memory::MemoryWorld;

use crate::block_entity::BlockEntity;
use crate::block_position::BlockPosition;
use crate::block_state::BlockState;
use crate::bounding_box::BoundingBox;
use crate::entity::Entity;
use crate::error::Result;
use crate::tick::{TickKind, TickPriority};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Vertical and horizontal limits of a world, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldBounds {
    pub min_y: i32,
    pub max_y: i32,
    pub horizontal_limit: i32,
}

impl Default for WorldBounds {
    fn default() -> Self {
        WorldBounds {
            min_y: -64,
            max_y: 319,
            horizontal_limit: 30_000_000,
        }
    }
}

impl WorldBounds {
    pub fn contains_box(&self, bb: &BoundingBox) -> bool {
        let h = self.horizontal_limit;
        bb.min.y >= self.min_y
            && bb.max.y <= self.max_y
            && bb.min.x >= -h
            && bb.max.x < h
            && bb.min.z >= -h
            && bb.max.z < h
    }
}

/// An entity as enumerated from a world.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldEntity {
    pub uuid: u128,
    /// Absolute position; passengers ride inside `entity.nbt["Passengers"]`.
    pub entity: Entity,
    pub is_passenger: bool,
}

/// A pending tick in world time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTick {
    pub kind: TickKind,
    pub target: SmolStr,
    pub position: BlockPosition,
    pub scheduled_time: i64,
    pub priority: TickPriority,
}

/// Scheduled-tick queues. Only authoritative worlds have them.
pub trait TickAccess {
    fn game_time(&self) -> i64;

    fn pending_ticks_in(&self, bb: &BoundingBox) -> Vec<PendingTick>;

    fn schedule(&mut self, tick: PendingTick);
}

/// Block, block entity and entity access to a live world.
///
/// All engine work runs on the thread that owns the world.
pub trait WorldAccess {
    fn get_block(&self, pos: BlockPosition) -> BlockState;

    /// Returns false when the world refused the change.
    fn set_block(&mut self, pos: BlockPosition, state: &BlockState) -> bool;

    fn get_block_entity(&self, pos: BlockPosition) -> Option<BlockEntity>;

    fn set_block_entity(&mut self, pos: BlockPosition, block_entity: BlockEntity) -> Result<()>;

    /// Empty a container-like block entity without removing it.
    fn clear_block_entity_contents(&mut self, pos: BlockPosition);

    fn entities_in_box(&self, bb: &BoundingBox) -> Vec<WorldEntity>;

    /// Spawn an entity, with its passengers, at its absolute position.
    fn spawn_entity(&mut self, entity: Entity) -> bool;

    fn is_chunk_loaded(&self, _chunk_x: i32, _chunk_z: i32) -> bool {
        true
    }

    fn notify_neighbors(&mut self, _pos: BlockPosition) {}

    fn world_bounds(&self) -> WorldBounds {
        WorldBounds::default()
    }

    fn ticks(&self) -> Option<&dyn TickAccess> {
        None
    }

    fn ticks_mut(&mut self) -> Option<&mut dyn TickAccess> {
        None
    }
}
