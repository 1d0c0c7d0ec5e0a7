//! Multi-region voxel schematics in the Litematica format: capture an area
//! of a world, place it back with rotation and mirroring, and verify a
//! placement against the world, all in chunk-sized increments.

pub mod block_entity;
pub mod block_position;
pub mod block_state;
pub mod bounding_box;
pub mod capture;
pub mod config;
pub mod container;
pub mod entity;
pub mod error;
pub mod formats;
pub mod logging;
pub mod metadata;
pub mod nbt;
pub mod paste;
pub mod placement;
pub mod region;
pub mod scheduler;
pub mod schematic;
pub mod selection;
pub mod tick;
pub mod transforms;
pub mod verifier;
pub mod world;

pub use block_entity::BlockEntity;
pub use block_position::BlockPosition;
pub use block_state::BlockState;
pub use bounding_box::BoundingBox;
pub use capture::{capture_chunk_bounded, capture_full, CaptureReport, CaptureTask};
pub use config::{CaptureOptions, EngineConfig, PasteOptions, TaskOptions, VerifierOptions};
pub use container::PackedVoxelContainer;
pub use entity::Entity;
pub use error::{Result, SchematicError};
pub use metadata::SchematicMetadata;
pub use paste::{place_chunk_bounded, place_full, PasteReport, PasteTask, RegionPasteStats};
pub use placement::{ReplaceBehavior, SchematicPlacement, SubRegionPlacement};
pub use region::SubRegion;
pub use scheduler::{Progress, Task, TaskBudget, TaskId, TaskScheduler};
pub use schematic::SchematicDocument;
pub use selection::{AreaSelection, NamedBox};
pub use tick::{ScheduledTick, TickKind, TickPriority};
pub use transforms::{Mirror, Orientation, Rotation, Transform};
pub use verifier::{
    MismatchCategory, MismatchRecord, SchematicVerifier, SortCriteria, VerificationSummary,
    VerifierState, VerifierTask,
};
pub use world::{MemoryWorld, WorldAccess};
