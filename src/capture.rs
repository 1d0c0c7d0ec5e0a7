//! Reading an area of a world into a schematic document.

use crate::block_position::BlockPosition;
use crate::bounding_box::BoundingBox;
use crate::config::CaptureOptions;
use crate::error::{Result, SchematicError};
use crate::region::SubRegion;
use crate::scheduler::{Progress, Task, TaskBudget};
use crate::schematic::SchematicDocument;
use crate::selection::AreaSelection;
use crate::tick::ScheduledTick;
use crate::world::WorldAccess;
use log::{debug, info, warn};
use rustc_hash::FxHashSet;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// What a capture picked up, plus the boxes it had to skip.
#[derive(Debug, Default)]
pub struct CaptureReport {
    pub non_air_blocks: u64,
    pub block_entities: u64,
    pub entities: u64,
    pub ticks: u64,
    pub skipped: Vec<SchematicError>,
}

impl CaptureReport {
    fn merge(&mut self, other: CaptureReport) {
        self.non_air_blocks += other.non_air_blocks;
        self.block_entities += other.block_entities;
        self.entities += other.entities;
        self.ticks += other.ticks;
        self.skipped.extend(other.skipped);
    }
}

/// Copies `scan` (a part of `region_box`, world coordinates) into `region`.
/// `anchor` is the world position of the region's anchor corner.
fn capture_into_region(
    world: &dyn WorldAccess,
    region: &mut SubRegion,
    region_box: &BoundingBox,
    anchor: BlockPosition,
    scan: &BoundingBox,
    options: &CaptureOptions,
    seen_entities: &mut FxHashSet<u128>,
) -> Result<CaptureReport> {
    let mut report = CaptureReport::default();
    let min = region_box.min;

    for y in scan.min.y..=scan.max.y {
        for z in scan.min.z..=scan.max.z {
            for x in scan.min.x..=scan.max.x {
                let pos = BlockPosition::new(x, y, z);
                let local = pos - min;
                let state = world.get_block(pos);
                if !state.is_air() {
                    report.non_air_blocks += 1;
                }
                region.set_block(local.x, local.y, local.z, &state)?;
                if let Some(record) = world.get_block_entity(pos) {
                    region.set_block_entity(local, record);
                    report.block_entities += 1;
                }
            }
        }
    }

    if options.capture_ticks {
        if let Some(queue) = world.ticks() {
            let now = queue.game_time();
            for tick in queue.pending_ticks_in(scan) {
                let delay = (tick.scheduled_time - now).clamp(0, i32::MAX as i64) as i32;
                region.add_tick(ScheduledTick {
                    kind: tick.kind,
                    target: tick.target,
                    position: tick.position - min,
                    delay,
                    priority: tick.priority,
                });
                report.ticks += 1;
            }
        }
    }

    if !options.ignore_entities {
        for found in world.entities_in_box(scan) {
            // passengers travel inside their vehicle
            if found.is_passenger || !seen_entities.insert(found.uuid) {
                continue;
            }
            region.add_entity(found.entity.rebased(anchor));
            report.entities += 1;
        }
    }

    Ok(report)
}

/// Captures every valid box of `area` in one go. Boxes with a zero-sized
/// dimension are skipped and listed in the report; an area without any
/// valid box fails.
///
/// Each entity is captured once per document. An entity inside overlapping
/// boxes belongs to the first of them in selection order, so pasting the
/// document never spawns it twice. Blocks in the overlap go to every box.
pub fn capture_full(
    world: &dyn WorldAccess,
    area: &AreaSelection,
    options: &CaptureOptions,
) -> Result<(SchematicDocument, CaptureReport)> {
    let (mut doc, skipped) = SchematicDocument::empty_for_area(area, options.author.clone())?;
    let mut report = CaptureReport {
        skipped,
        ..CaptureReport::default()
    };
    for e in &report.skipped {
        warn!("Skipping box of '{}': {}", area.name, e);
    }

    let mut seen = FxHashSet::default();
    let (valid, _) = area.partition_boxes();
    for (named_box, bb) in valid {
        let Some(region) = doc.region_mut(&named_box.name) else {
            continue;
        };
        let part = capture_into_region(world, region, &bb, named_box.pos1, &bb, options, &mut seen)?;
        report.merge(part);
    }

    doc.update_metadata();
    info!(
        "Captured '{}': {} regions, {} blocks, {} entities",
        area.name,
        doc.regions.len(),
        report.non_air_blocks,
        report.entities
    );
    Ok((doc, report))
}

/// Captures the part of every box of `area` inside one chunk column into
/// `doc`, which must come from [`SchematicDocument::empty_for_area`].
/// `seen_entities` carries the ids already captured by earlier chunks and
/// earlier boxes, which gives the same entity ownership as [`capture_full`].
pub fn capture_chunk_bounded(
    world: &dyn WorldAccess,
    area: &AreaSelection,
    doc: &mut SchematicDocument,
    chunk_x: i32,
    chunk_z: i32,
    seen_entities: &mut FxHashSet<u128>,
    options: &CaptureOptions,
) -> Result<CaptureReport> {
    let mut report = CaptureReport::default();
    let (valid, _) = area.partition_boxes();
    for (named_box, bb) in valid {
        let column = BoundingBox::chunk_column(chunk_x, chunk_z, bb.min.y, bb.max.y);
        let Some(scan) = bb.intersection(&column) else {
            continue;
        };
        let Some(region) = doc.region_mut(&named_box.name) else {
            continue;
        };
        let part = capture_into_region(world, region, &bb, named_box.pos1, &scan, options, seen_entities)?;
        report.merge(part);
    }
    Ok(report)
}

/// Incremental capture, one chunk column per unit of budget. Unloaded
/// chunks are retried after the others. The finished document, with its
/// metadata updated, is published through [`CaptureTask::result_handle`].
pub struct CaptureTask {
    name: String,
    area: AreaSelection,
    options: CaptureOptions,
    doc: Option<SchematicDocument>,
    report: CaptureReport,
    pending: VecDeque<(i32, i32)>,
    deferred: Vec<(i32, i32)>,
    seen_entities: FxHashSet<u128>,
    result: Rc<RefCell<Option<(SchematicDocument, CaptureReport)>>>,
}

impl CaptureTask {
    pub fn new(area: AreaSelection, options: CaptureOptions) -> Result<Self> {
        let (doc, skipped) = SchematicDocument::empty_for_area(&area, options.author.clone())?;
        let pending = area.touched_chunks().into();
        Ok(CaptureTask {
            name: format!("capture '{}'", area.name),
            area,
            options,
            doc: Some(doc),
            report: CaptureReport {
                skipped,
                ..CaptureReport::default()
            },
            pending,
            deferred: Vec::new(),
            seen_entities: FxHashSet::default(),
            result: Rc::new(RefCell::new(None)),
        })
    }

    pub fn result_handle(&self) -> Rc<RefCell<Option<(SchematicDocument, CaptureReport)>>> {
        self.result.clone()
    }
}

impl Task for CaptureTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn advance(&mut self, world: Option<&mut dyn WorldAccess>, budget: &TaskBudget) -> Progress {
        let Some(world) = world else {
            return Progress::Failed("world unavailable".to_string());
        };
        let Some(doc) = self.doc.as_mut() else {
            return Progress::Done;
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
            match capture_chunk_bounded(
                world,
                &self.area,
                doc,
                cx,
                cz,
                &mut self.seen_entities,
                &self.options,
            ) {
                Ok(part) => self.report.merge(part),
                Err(e) => return Progress::Failed(e.to_string()),
            }
            done += 1;
        }
        debug!("{}: {} chunks this tick", self.name, done);

        if self.pending.is_empty() {
            if self.deferred.is_empty() {
                if let Some(mut doc) = self.doc.take() {
                    doc.update_metadata();
                    let report = std::mem::take(&mut self.report);
                    *self.result.borrow_mut() = Some((doc, report));
                }
                return Progress::Done;
            }
            self.pending.extend(self.deferred.drain(..));
        }
        Progress::Continue
    }
}
