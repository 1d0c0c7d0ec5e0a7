//! Writing a placed schematic into a world.
//!
//! Two modes share one per-region pass: a full paste of every enabled
//! region, and a chunk-bounded paste that only touches one chunk column, used
//! by [`PasteTask`] to spread the work over several ticks.

use crate::block_position::BlockPosition;
use crate::block_state::{BlockState, BARRIER};
use crate::bounding_box::BoundingBox;
use crate::config::PasteOptions;
use crate::error::{Result, SchematicError};
use crate::placement::{ReplaceBehavior, SchematicPlacement, SubRegionPlacement};
use crate::region::SubRegion;
use crate::scheduler::{Progress, Task, TaskBudget};
use crate::schematic::SchematicDocument;
use crate::tick::TickKind;
use crate::transforms::{Orientation, Transform};
use crate::world::{PendingTick, WorldAccess, WorldBounds};
use log::{debug, info, warn};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;
use std::sync::Arc;

/// Counters for one region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegionPasteStats {
    pub blocks_placed: u64,
    /// Blocks the world refused to change.
    pub blocks_rejected: u64,
    pub block_entities_placed: u64,
    pub block_entity_failures: u64,
    pub ticks_scheduled: u64,
    pub entities_spawned: u64,
}

impl RegionPasteStats {
    pub fn merge(&mut self, other: &RegionPasteStats) {
        self.blocks_placed += other.blocks_placed;
        self.blocks_rejected += other.blocks_rejected;
        self.block_entities_placed += other.block_entities_placed;
        self.block_entity_failures += other.block_entity_failures;
        self.ticks_scheduled += other.ticks_scheduled;
        self.entities_spawned += other.entities_spawned;
    }
}

/// Per-region outcome of a paste. A failed region does not stop the others.
#[derive(Debug, Default)]
pub struct PasteReport {
    pub regions: BTreeMap<String, Result<RegionPasteStats>>,
}

impl PasteReport {
    /// Sum of the successful regions.
    pub fn total(&self) -> RegionPasteStats {
        let mut total = RegionPasteStats::default();
        for stats in self.regions.values().flatten() {
            total.merge(stats);
        }
        total
    }

    pub fn errors(&self) -> impl Iterator<Item = (&str, &SchematicError)> {
        self.regions
            .iter()
            .filter_map(|(name, r)| r.as_ref().err().map(|e| (name.as_str(), e)))
    }

    pub fn is_success(&self) -> bool {
        self.regions.values().all(|r| r.is_ok())
    }

    /// Adds a region outcome. The first error of a region sticks.
    pub fn record(&mut self, name: &str, outcome: Result<RegionPasteStats>) {
        match self.regions.get_mut(name) {
            Some(slot) => match outcome {
                Ok(stats) => {
                    if let Ok(existing) = slot {
                        existing.merge(&stats);
                    }
                }
                Err(e) => {
                    if slot.is_ok() {
                        *slot = Err(e);
                    }
                }
            },
            None => {
                self.regions.insert(name.to_string(), outcome);
            }
        }
    }

    pub fn absorb(&mut self, other: PasteReport) {
        for (name, outcome) in other.regions {
            self.record(&name, outcome);
        }
    }
}

/// Everything one region's pass needs, resolved once.
struct RegionPass<'a> {
    name: &'a str,
    region: &'a SubRegion,
    block_transform: Transform,
    region_transform: Transform,
    orientation: Orientation,
    options: &'a PasteOptions,
    paste_entities: bool,
}

impl<'a> RegionPass<'a> {
    fn new(
        name: &'a str,
        region: &'a SubRegion,
        placement: &SchematicPlacement,
        sub: &SubRegionPlacement,
        options: &'a PasteOptions,
    ) -> Self {
        RegionPass {
            name,
            region,
            block_transform: placement.block_transform(region, sub),
            region_transform: placement.region_transform(sub),
            orientation: placement.region_orientation(sub),
            options,
            paste_entities: !(options.ignore_entities
                || placement.ignore_entities
                || sub.ignore_entities),
        }
    }

    fn container_box(&self) -> BoundingBox {
        BoundingBox::new(
            BlockPosition::ORIGIN,
            self.region.container.size() - BlockPosition::new(1, 1, 1),
        )
    }

    /// Container-local box that maps onto `world_box`.
    fn local_box(&self, world_box: &BoundingBox) -> Result<BoundingBox> {
        let local = self.block_transform.inverse().transform_box(world_box);
        if !self.container_box().contains_box(&local) {
            let outside = if self.container_box().contains(local.min) {
                local.max
            } else {
                local.min
            };
            return Err(SchematicError::OutOfBounds {
                pos: outside,
                size: self.region.container.size(),
                context: Some(format!("region '{}'", self.name)),
            });
        }
        Ok(local)
    }

    /// Voxel pass over `local` followed by the optional neighbour-update pass.
    fn place_blocks(&self, world: &mut dyn WorldAccess, local: &BoundingBox, stats: &mut RegionPasteStats) {
        let container = &self.region.container;
        let oriented: FxHashMap<&BlockState, BlockState> = container
            .palette()
            .iter()
            .map(|s| (s, s.oriented(self.orientation)))
            .collect();
        let barrier = BlockState::new(BARRIER);
        let mut placed = Vec::new();

        for y in local.min.y..=local.max.y {
            for z in local.min.z..=local.max.z {
                for x in local.min.x..=local.max.x {
                    let state = container.get_unchecked(x, y, z);
                    if state.is_structure_void() {
                        continue;
                    }
                    let local_pos = BlockPosition::new(x, y, z);
                    let pos = self.block_transform.apply(local_pos);
                    let existing = world.get_block(pos);
                    match self.options.replace {
                        ReplaceBehavior::None if !existing.is_air() => continue,
                        ReplaceBehavior::WithNonAir if state.is_air() => continue,
                        _ => {}
                    }
                    let new_state = match oriented.get(state) {
                        Some(s) => s.clone(),
                        None => state.oriented(self.orientation),
                    };
                    if existing == new_state {
                        continue;
                    }

                    // Empty an existing container first so nothing drops when it is replaced.
                    if world.get_block_entity(pos).is_some() {
                        world.clear_block_entity_contents(pos);
                        world.set_block(pos, &barrier);
                    }
                    if !world.set_block(pos, &new_state) {
                        stats.blocks_rejected += 1;
                        continue;
                    }
                    stats.blocks_placed += 1;
                    placed.push(pos);

                    if let Some(record) = self.region.block_entities.get(&local_pos) {
                        match world.set_block_entity(pos, record.oriented(self.orientation)) {
                            Ok(()) => stats.block_entities_placed += 1,
                            Err(e) => {
                                warn!("Region '{}': {}", self.name, e);
                                stats.block_entity_failures += 1;
                            }
                        }
                    }
                }
            }
        }

        if self.options.notify_neighbors {
            for pos in placed {
                world.notify_neighbors(pos);
            }
        }
    }

    /// Re-registers captured ticks whose world position passes `filter`.
    fn place_ticks(&self, world: &mut dyn WorldAccess, filter: Option<&BoundingBox>, stats: &mut RegionPasteStats) {
        if !self.options.paste_ticks || self.region.ticks.is_empty() {
            return;
        }
        let Some(game_time) = world.ticks().map(|t| t.game_time()) else {
            return;
        };
        for tick in self.region.ticks.values() {
            let pos = self.block_transform.apply(tick.position);
            if filter.is_some_and(|bb| !bb.contains(pos)) {
                continue;
            }
            if tick.kind == TickKind::Fluid && !world.get_block(pos).has_fluid() {
                continue;
            }
            if let Some(queue) = world.ticks_mut() {
                queue.schedule(PendingTick {
                    kind: tick.kind,
                    target: tick.target.clone(),
                    position: pos,
                    scheduled_time: game_time + tick.delay as i64,
                    priority: tick.priority,
                });
                stats.ticks_scheduled += 1;
            }
        }
    }

    /// Spawns the region's entities. In chunk mode an entity belongs to the
    /// chunk that contains its position clamped into the region's world box,
    /// so every entity is spawned by exactly one chunk.
    fn place_entities(
        &self,
        world: &mut dyn WorldAccess,
        chunk: Option<(BoundingBox, (i32, i32))>,
        stats: &mut RegionPasteStats,
    ) {
        if !self.paste_entities {
            return;
        }
        for entity in &self.region.entities {
            let moved = entity.transformed(&self.region_transform);
            if let Some((region_box, (cx, cz))) = chunk {
                let p = moved.position;
                let block = BlockPosition::new(p.0.floor() as i32, p.1.floor() as i32, p.2.floor() as i32)
                    .max(region_box.min)
                    .min(region_box.max);
                if block.chunk_pos() != (cx, cz) {
                    continue;
                }
            }
            if world.spawn_entity(moved) {
                stats.entities_spawned += 1;
            }
        }
    }
}

/// A region is placed whole or not at all; partial overlap with the world is an error.
fn check_world_bounds(name: &str, world_box: &BoundingBox, bounds: &WorldBounds) -> Result<()> {
    if bounds.contains_box(world_box) {
        Ok(())
    } else {
        Err(SchematicError::OutOfWorldBounds {
            region: name.to_string(),
            min: world_box.min,
            max: world_box.max,
        })
    }
}

fn paste_region_full(
    world: &mut dyn WorldAccess,
    pass: &RegionPass,
    world_box: &BoundingBox,
) -> Result<RegionPasteStats> {
    if pass.region.container.volume() == 0 {
        return Err(SchematicError::EmptySelection(pass.name.to_string()));
    }
    check_world_bounds(pass.name, world_box, &world.world_bounds())?;
    let mut stats = RegionPasteStats::default();
    pass.place_blocks(world, &pass.container_box(), &mut stats);
    pass.place_ticks(world, None, &mut stats);
    pass.place_entities(world, None, &mut stats);
    Ok(stats)
}

/// Places every enabled region of `doc` at `placement` in one go.
pub fn place_full(
    world: &mut dyn WorldAccess,
    doc: &SchematicDocument,
    placement: &SchematicPlacement,
    options: &PasteOptions,
) -> PasteReport {
    let mut report = PasteReport::default();
    for (name, region, sub) in placement.enabled_regions(doc) {
        let pass = RegionPass::new(name, region, placement, sub, options);
        let world_box = placement.region_world_box(region, sub);
        let outcome = paste_region_full(world, &pass, &world_box);
        if let Err(e) = &outcome {
            warn!("Skipping region '{}': {}", name, e);
        }
        report.record(name, outcome);
    }
    let total = report.total();
    info!(
        "Pasted '{}' at {}: {} blocks, {} block entities, {} entities",
        placement.name, placement.origin, total.blocks_placed, total.block_entities_placed, total.entities_spawned
    );
    report
}

/// Places the parts of every enabled region that fall inside one chunk column.
/// Regions that do not touch the chunk are left out of the report.
pub fn place_chunk_bounded(
    world: &mut dyn WorldAccess,
    doc: &SchematicDocument,
    placement: &SchematicPlacement,
    chunk_x: i32,
    chunk_z: i32,
    options: &PasteOptions,
) -> PasteReport {
    let mut report = PasteReport::default();
    let bounds = world.world_bounds();
    for (name, region, sub) in placement.enabled_regions(doc) {
        if region.container.volume() == 0 {
            continue;
        }
        let region_box = placement.region_world_box(region, sub);
        let column = BoundingBox::chunk_column(chunk_x, chunk_z, region_box.min.y, region_box.max.y);
        if region_box.intersection(&column).is_none() {
            continue;
        }
        let outcome = check_world_bounds(name, &region_box, &bounds).and_then(|()| {
            let Some(chunk_box) = placement.region_chunk_box(region, sub, chunk_x, chunk_z, &bounds) else {
                return Ok(RegionPasteStats::default());
            };
            let pass = RegionPass::new(name, region, placement, sub, options);
            let local = pass.local_box(&chunk_box)?;
            let mut stats = RegionPasteStats::default();
            pass.place_blocks(world, &local, &mut stats);
            pass.place_ticks(world, Some(&chunk_box), &mut stats);
            pass.place_entities(world, Some((region_box, (chunk_x, chunk_z))), &mut stats);
            Ok(stats)
        });
        if let Err(e) = &outcome {
            warn!("Region '{}' in chunk {},{}: {}", name, chunk_x, chunk_z, e);
        }
        report.record(name, outcome);
    }
    report
}

/// Incremental paste, one chunk column at a time. Chunks that are not loaded
/// are retried after the others.
pub struct PasteTask {
    name: String,
    doc: Arc<SchematicDocument>,
    placement: SchematicPlacement,
    options: PasteOptions,
    pending: VecDeque<(i32, i32)>,
    deferred: Vec<(i32, i32)>,
    report: PasteReport,
    result: Rc<RefCell<Option<PasteReport>>>,
}

impl PasteTask {
    pub fn new(doc: Arc<SchematicDocument>, placement: SchematicPlacement, options: PasteOptions) -> Self {
        let pending = placement.touched_chunks(&doc).into();
        PasteTask {
            name: format!("paste '{}'", placement.name),
            doc,
            placement,
            options,
            pending,
            deferred: Vec::new(),
            report: PasteReport::default(),
            result: Rc::new(RefCell::new(None)),
        }
    }

    /// Receives the report once the task is done.
    pub fn result_handle(&self) -> Rc<RefCell<Option<PasteReport>>> {
        self.result.clone()
    }

    pub fn remaining_chunks(&self) -> usize {
        self.pending.len() + self.deferred.len()
    }
}

impl Task for PasteTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn advance(&mut self, world: Option<&mut dyn WorldAccess>, budget: &TaskBudget) -> Progress {
        let Some(world) = world else {
            return Progress::Failed("world unavailable".to_string());
        };
        let mut done = 0;
        while !budget.exhausted(done) {
            let Some((cx, cz)) = self.pending.pop_front() else {
                break;
            };
            if !world.is_chunk_loaded(cx, cz) {
                self.deferred.push((cx, cz));
                continue;
            }
            let chunk_report = place_chunk_bounded(world, &self.doc, &self.placement, cx, cz, &self.options);
            self.report.absorb(chunk_report);
            done += 1;
        }
        debug!("{}: {} chunks this tick, {} left", self.name, done, self.remaining_chunks());

        if self.pending.is_empty() {
            if self.deferred.is_empty() {
                *self.result.borrow_mut() = Some(std::mem::take(&mut self.report));
                return Progress::Done;
            }
            self.pending.extend(self.deferred.drain(..));
        }
        Progress::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_entity::BlockEntity;
    use crate::entity::Entity;
    use crate::nbt::NbtValue;
    use crate::tick::{ScheduledTick, TickPriority};
    use crate::transforms::{Mirror, Rotation};
    use crate::world::MemoryWorld;
    use smol_str::SmolStr;

    fn stone() -> BlockState {
        BlockState::new("minecraft:stone")
    }

    fn doc_with_line() -> SchematicDocument {
        let mut doc = SchematicDocument::new("line", "tester");
        let mut region = SubRegion::new(BlockPosition::ORIGIN, BlockPosition::new(3, 1, 1));
        region.set_block(0, 0, 0, &stone()).unwrap();
        region
            .set_block(1, 0, 0, &BlockState::new("minecraft:furnace").with_property("facing", "north"))
            .unwrap();
        region.set_block(2, 0, 0, &BlockState::new("minecraft:structure_void")).unwrap();
        region.set_block_entity(
            BlockPosition::new(1, 0, 0),
            BlockEntity::new("minecraft:furnace", BlockPosition::ORIGIN)
                .with_nbt_data("CookTime", NbtValue::Short(5)),
        );
        doc.add_region("main", region);
        doc
    }

    #[test]
    fn test_full_paste_rotates_blocks_and_records() {
        let doc = doc_with_line();
        let placement = SchematicPlacement::new(&doc, BlockPosition::new(10, 64, 10))
            .with_rotation(Rotation::Clockwise90);
        let mut world = MemoryWorld::new();
        let report = place_full(&mut world, &doc, &placement, &PasteOptions::default());
        assert!(report.is_success());
        assert_eq!(report.total().blocks_placed, 2);

        assert_eq!(world.get_block(BlockPosition::new(10, 64, 10)), stone());
        let furnace = BlockPosition::new(10, 64, 11);
        assert_eq!(
            world.get_block(furnace).get_property("facing").map(|s| s.as_str()),
            Some("east")
        );
        let record = world.get_block_entity(furnace).unwrap();
        assert_eq!(record.position, furnace);
        assert_eq!(record.nbt.get("CookTime"), Some(&NbtValue::Short(5)));
        // structure void leaves the destination alone
        assert!(world.get_block(BlockPosition::new(10, 64, 12)).is_air());
    }

    #[test]
    fn test_replace_behaviors() {
        let mut doc = SchematicDocument::new("r", "t");
        let mut region = SubRegion::new(BlockPosition::ORIGIN, BlockPosition::new(2, 1, 1));
        region.set_block(0, 0, 0, &stone()).unwrap();
        doc.add_region("r", region);
        let placement = SchematicPlacement::new(&doc, BlockPosition::ORIGIN);
        let dirt = BlockState::new("minecraft:dirt");

        let setup = || {
            let mut world = MemoryWorld::new();
            world.set_block(BlockPosition::new(0, 0, 0), &dirt);
            world.set_block(BlockPosition::new(1, 0, 0), &dirt);
            world
        };
        let paste = |replace| {
            let mut world = setup();
            let options = PasteOptions {
                replace,
                ..PasteOptions::default()
            };
            place_full(&mut world, &doc, &placement, &options);
            (
                world.get_block(BlockPosition::new(0, 0, 0)),
                world.get_block(BlockPosition::new(1, 0, 0)),
            )
        };

        assert_eq!(paste(ReplaceBehavior::None), (dirt.clone(), dirt.clone()));
        assert_eq!(paste(ReplaceBehavior::WithNonAir), (stone(), dirt.clone()));
        assert_eq!(paste(ReplaceBehavior::All), (stone(), BlockState::air()));
    }

    #[test]
    fn test_out_of_world_region_is_reported_and_others_continue() {
        let mut doc = doc_with_line();
        doc.add_region(
            "tall",
            SubRegion::new(BlockPosition::new(0, 0, 5), BlockPosition::new(1, 400, 1)),
        );
        let placement = SchematicPlacement::new(&doc, BlockPosition::new(0, 0, 0));
        let mut world = MemoryWorld::new();
        let report = place_full(&mut world, &doc, &placement, &PasteOptions::default());
        assert!(matches!(
            report.regions["tall"],
            Err(SchematicError::OutOfWorldBounds { .. })
        ));
        assert_eq!(report.regions["main"].as_ref().unwrap().blocks_placed, 2);
        assert_eq!(report.errors().count(), 1);

        let mut chunked = MemoryWorld::new();
        let chunk_report = place_chunk_bounded(&mut chunked, &doc, &placement, 0, 0, &PasteOptions::default());
        assert!(matches!(
            chunk_report.regions["tall"],
            Err(SchematicError::OutOfWorldBounds { .. })
        ));
        assert_eq!(chunked.non_air_blocks(), world.non_air_blocks());
    }

    #[test]
    fn test_existing_container_is_emptied_before_replacement() {
        let doc = doc_with_line();
        let placement = SchematicPlacement::new(&doc, BlockPosition::ORIGIN);
        let mut world = MemoryWorld::new();
        let chest = BlockPosition::new(0, 0, 0);
        world.set_block(chest, &BlockState::new("minecraft:chest"));
        world
            .set_block_entity(
                chest,
                BlockEntity::new("minecraft:chest", chest).with_nbt_data("Items", NbtValue::List(vec![])),
            )
            .unwrap();
        place_full(&mut world, &doc, &placement, &PasteOptions::default());
        assert_eq!(world.get_block(chest), stone());
        assert!(world.get_block_entity(chest).is_none());
    }

    #[test]
    fn test_block_entity_failure_is_counted_not_fatal() {
        let mut doc = SchematicDocument::new("f", "t");
        let mut region = SubRegion::new(BlockPosition::ORIGIN, BlockPosition::new(1, 1, 1));
        region.set_block(0, 0, 0, &BlockState::air()).unwrap();
        region.set_block_entity(BlockPosition::ORIGIN, BlockEntity::new("minecraft:chest", BlockPosition::ORIGIN));
        doc.add_region("f", region);
        let placement = SchematicPlacement::new(&doc, BlockPosition::ORIGIN);
        let mut world = MemoryWorld::new();
        world.set_block(BlockPosition::ORIGIN, &stone());
        let options = PasteOptions {
            replace: ReplaceBehavior::All,
            ..PasteOptions::default()
        };
        let report = place_full(&mut world, &doc, &placement, &options);
        let stats = report.regions["f"].as_ref().unwrap();
        assert_eq!(stats.blocks_placed, 1);
        assert_eq!(stats.block_entity_failures, 1);
    }

    #[test]
    fn test_ticks_and_entities() {
        let mut doc = SchematicDocument::new("t", "t");
        let mut region = SubRegion::new(BlockPosition::ORIGIN, BlockPosition::new(2, 1, 1));
        region.set_block(0, 0, 0, &BlockState::new("minecraft:repeater")).unwrap();
        region.set_block(1, 0, 0, &stone()).unwrap();
        region.add_tick(ScheduledTick {
            kind: TickKind::Block,
            target: SmolStr::new("minecraft:repeater"),
            position: BlockPosition::new(0, 0, 0),
            delay: 2,
            priority: TickPriority::High,
        });
        region.add_tick(ScheduledTick {
            kind: TickKind::Fluid,
            target: SmolStr::new("minecraft:water"),
            position: BlockPosition::new(1, 0, 0),
            delay: 5,
            priority: TickPriority::Normal,
        });
        region.add_entity(Entity::new("minecraft:pig".to_string(), (0.5, 0.0, 0.5)));
        doc.add_region("t", region);

        let mut placement = SchematicPlacement::new(&doc, BlockPosition::new(4, 0, 0));
        placement.mirror = Mirror::FrontBack;
        let mut world = MemoryWorld::with_ticks(1000);
        let report = place_full(&mut world, &doc, &placement, &PasteOptions::default());
        let stats = report.regions["t"].as_ref().unwrap();
        assert_eq!(stats.ticks_scheduled, 1);
        assert_eq!(stats.entities_spawned, 1);

        let tick = &world.pending_ticks()[0];
        assert_eq!(tick.position, BlockPosition::new(4, 0, 0));
        assert_eq!(tick.scheduled_time, 1002);
        let pig = world.entities().next().unwrap();
        assert_eq!(pig.position, (4.5, 0.0, 0.5));

        let mut plain = MemoryWorld::new();
        let mut ignoring = placement.clone();
        ignoring.ignore_entities = true;
        let report = place_full(&mut plain, &doc, &ignoring, &PasteOptions::default());
        assert_eq!(report.total().entities_spawned, 0);
        assert_eq!(report.total().ticks_scheduled, 0);
    }

    #[test]
    fn test_task_defers_unloaded_chunks() {
        let mut doc = SchematicDocument::new("wide", "t");
        let mut region = SubRegion::new(BlockPosition::ORIGIN, BlockPosition::new(20, 1, 1));
        for x in 0..20 {
            region.set_block(x, 0, 0, &stone()).unwrap();
        }
        doc.add_region("w", region);
        let placement = SchematicPlacement::new(&doc, BlockPosition::ORIGIN);
        let mut task = PasteTask::new(Arc::new(doc), placement, PasteOptions::default());
        let handle = task.result_handle();

        let mut world = MemoryWorld::new();
        world.set_chunk_loaded(0, 0, false);
        let budget = TaskBudget::unlimited();
        assert_eq!(task.advance(Some(&mut world), &budget), Progress::Continue);
        assert!(world.get_block(BlockPosition::new(0, 0, 0)).is_air());
        assert_eq!(world.get_block(BlockPosition::new(16, 0, 0)), stone());

        world.set_chunk_loaded(0, 0, true);
        assert_eq!(task.advance(Some(&mut world), &budget), Progress::Done);
        assert_eq!(world.get_block(BlockPosition::new(0, 0, 0)), stone());
        let report = handle.borrow_mut().take().unwrap();
        assert_eq!(report.total().blocks_placed, 20);
    }
}
