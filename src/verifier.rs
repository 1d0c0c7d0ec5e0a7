//! Comparing a placed schematic against the world, chunk by chunk.

use crate::block_position::BlockPosition;
use crate::block_state::BlockState;
use crate::bounding_box::BoundingBox;
use crate::config::VerifierOptions;
use crate::placement::SchematicPlacement;
use crate::scheduler::{Progress, Task, TaskBudget};
use crate::schematic::SchematicDocument;
use crate::world::WorldAccess;
use log::{debug, info};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchCategory {
    Correct,
    /// Expected a block, found air.
    Missing,
    WrongState,
    /// Expected air, found a block.
    Extra,
}

impl MismatchCategory {
    pub const ALL: [MismatchCategory; 4] = [
        MismatchCategory::Correct,
        MismatchCategory::Missing,
        MismatchCategory::WrongState,
        MismatchCategory::Extra,
    ];

    /// `None` for air expected and found, which is not counted.
    pub fn classify(expected: &BlockState, found: &BlockState) -> Option<MismatchCategory> {
        match (expected.is_air(), found.is_air()) {
            (true, true) => None,
            (true, false) => Some(MismatchCategory::Extra),
            (false, true) => Some(MismatchCategory::Missing),
            (false, false) if expected == found => Some(MismatchCategory::Correct),
            (false, false) => Some(MismatchCategory::WrongState),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortCriteria {
    NameExpected,
    NameFound,
    Count,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifierState {
    Idle,
    Scanning,
    Done,
}

/// Aggregated count for one (expected, found) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MismatchRecord {
    pub expected: BlockState,
    pub found: BlockState,
    pub category: MismatchCategory,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerificationSummary {
    pub correct: u64,
    pub missing: u64,
    pub wrong_state: u64,
    pub extra: u64,
}

impl VerificationSummary {
    pub fn mismatched(&self) -> u64 {
        self.missing + self.wrong_state + self.extra
    }
}

#[derive(Debug, Clone, Default)]
struct PairStats {
    count: u64,
    positions: Vec<BlockPosition>,
}

type Pair = (BlockState, BlockState);
type CompletionListener = Box<dyn FnMut(&VerificationSummary)>;

/// Incremental verifier for one placement.
///
/// Ignored pairs and categories survive a restart of the scan; only
/// [`SchematicVerifier::clear_ignored`] brings them back.
pub struct SchematicVerifier {
    doc: Arc<SchematicDocument>,
    placement: SchematicPlacement,
    options: VerifierOptions,
    state: VerifierState,
    pending: VecDeque<(i32, i32)>,
    deferred: Vec<(i32, i32)>,
    unloaded: FxHashSet<(i32, i32)>,
    chunks_total: usize,
    chunks_verified: usize,
    results: FxHashMap<Pair, PairStats>,
    ignored_pairs: FxHashSet<Pair>,
    ignored_categories: FxHashSet<MismatchCategory>,
    listeners: Vec<CompletionListener>,
}

impl SchematicVerifier {
    pub fn new(doc: Arc<SchematicDocument>, placement: SchematicPlacement, options: VerifierOptions) -> Self {
        SchematicVerifier {
            doc,
            placement,
            options,
            state: VerifierState::Idle,
            pending: VecDeque::new(),
            deferred: Vec::new(),
            unloaded: FxHashSet::default(),
            chunks_total: 0,
            chunks_verified: 0,
            results: FxHashMap::default(),
            ignored_pairs: FxHashSet::default(),
            ignored_categories: FxHashSet::default(),
            listeners: Vec::new(),
        }
    }

    pub fn state(&self) -> VerifierState {
        self.state
    }

    pub fn placement(&self) -> &SchematicPlacement {
        &self.placement
    }

    /// (Re)starts the scan from scratch.
    pub fn start(&mut self) {
        self.results.clear();
        self.pending = self.placement.touched_chunks(&self.doc).into();
        self.deferred.clear();
        self.unloaded.clear();
        self.chunks_total = self.pending.len();
        self.chunks_verified = 0;
        self.state = VerifierState::Scanning;
        debug!("Verifying '{}' over {} chunks", self.placement.name, self.chunks_total);
    }

    pub fn reset(&mut self) {
        self.results.clear();
        self.pending.clear();
        self.deferred.clear();
        self.unloaded.clear();
        self.chunks_total = 0;
        self.chunks_verified = 0;
        self.state = VerifierState::Idle;
    }

    /// Verified and total chunk counts of the current scan.
    pub fn chunk_progress(&self) -> (usize, usize) {
        (self.chunks_verified, self.chunks_total)
    }

    /// Chunks that were not loaded when last attempted, sorted.
    pub fn missing_chunks(&self) -> Vec<(i32, i32)> {
        let mut chunks: Vec<_> = self.unloaded.iter().copied().collect();
        chunks.sort_unstable();
        chunks
    }

    /// Verifies chunks until the budget runs out. Starts a scan when idle.
    pub fn advance(&mut self, world: &dyn WorldAccess, budget: &TaskBudget) -> Progress {
        match self.state {
            VerifierState::Done => return Progress::Done,
            VerifierState::Idle => self.start(),
            VerifierState::Scanning => {}
        }

        let mut done = 0;
        while !budget.exhausted(done) {
            let Some((cx, cz)) = self.pending.pop_front() else {
                break;
            };
            if !world.is_chunk_loaded(cx, cz) {
                self.deferred.push((cx, cz));
                self.unloaded.insert((cx, cz));
                continue;
            }
            self.unloaded.remove(&(cx, cz));
            self.verify_chunk(world, cx, cz);
            self.chunks_verified += 1;
            done += 1;
        }

        if self.pending.is_empty() {
            if self.deferred.is_empty() {
                self.finish();
                return Progress::Done;
            }
            self.pending.extend(self.deferred.drain(..));
        }
        Progress::Continue
    }

    fn finish(&mut self) {
        self.state = VerifierState::Done;
        let summary = self.summary();
        info!(
            "Verified '{}': {} correct, {} missing, {} wrong, {} extra",
            self.placement.name, summary.correct, summary.missing, summary.wrong_state, summary.extra
        );
        for listener in self.listeners.iter_mut() {
            listener(&summary);
        }
    }

    fn verify_chunk(&mut self, world: &dyn WorldAccess, chunk_x: i32, chunk_z: i32) {
        let bounds = world.world_bounds();
        let doc = Arc::clone(&self.doc);
        let placement = &self.placement;
        let mut counted: Vec<(Pair, BlockPosition)> = Vec::new();

        for (_, region, sub) in placement.enabled_regions(&doc) {
            if region.container.volume() == 0 {
                continue;
            }
            let Some(world_box) = placement.region_chunk_box(region, sub, chunk_x, chunk_z, &bounds) else {
                continue;
            };
            let block_transform = placement.block_transform(region, sub);
            let orientation = placement.region_orientation(sub);
            let local = block_transform.inverse().transform_box(&world_box);
            let size = region.container.size();
            let Some(local) = local.intersection(&BoundingBox::new(
                BlockPosition::ORIGIN,
                size - BlockPosition::new(1, 1, 1),
            )) else {
                continue;
            };

            for y in local.min.y..=local.max.y {
                for z in local.min.z..=local.max.z {
                    for x in local.min.x..=local.max.x {
                        let stored = region.container.get_unchecked(x, y, z);
                        if stored.is_structure_void() {
                            continue;
                        }
                        let pos = block_transform.apply(BlockPosition::new(x, y, z));
                        let expected = stored.oriented(orientation);
                        let found = world.get_block(pos);
                        counted.push(((expected, found), pos));
                    }
                }
            }
        }

        for (pair, pos) in counted {
            self.count(pair, pos);
        }
    }

    fn count(&mut self, pair: Pair, pos: BlockPosition) {
        let Some(category) = MismatchCategory::classify(&pair.0, &pair.1) else {
            return;
        };
        if self.ignored_categories.contains(&category) || self.ignored_pairs.contains(&pair) {
            return;
        }
        let stats = self.results.entry(pair).or_default();
        stats.count += 1;
        if stats.positions.len() < self.options.max_positions_per_pair {
            stats.positions.push(pos);
        }
    }

    /// Every counted pair, in category then expected-name order.
    pub fn records(&self) -> Vec<MismatchRecord> {
        self.records_sorted(SortCriteria::NameExpected, false)
    }

    pub fn records_sorted(&self, criteria: SortCriteria, descending: bool) -> Vec<MismatchRecord> {
        let mut records: Vec<MismatchRecord> = self
            .results
            .iter()
            .filter_map(|((expected, found), stats)| {
                Some(MismatchRecord {
                    category: MismatchCategory::classify(expected, found)?,
                    expected: expected.clone(),
                    found: found.clone(),
                    count: stats.count,
                })
            })
            .collect();

        let name_order = |a: &MismatchRecord, b: &MismatchRecord| {
            (a.expected.to_string(), a.found.to_string()).cmp(&(b.expected.to_string(), b.found.to_string()))
        };
        records.sort_by(|a, b| {
            let primary = match criteria {
                SortCriteria::NameExpected => a.expected.to_string().cmp(&b.expected.to_string()),
                SortCriteria::NameFound => a.found.to_string().cmp(&b.found.to_string()),
                SortCriteria::Count => a.count.cmp(&b.count),
            };
            let primary = if descending { primary.reverse() } else { primary };
            a.category
                .cmp(&b.category)
                .then(primary)
                .then_with(|| name_order(a, b))
        });
        records
    }

    pub fn records_in(&self, category: MismatchCategory) -> Vec<MismatchRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.category == category)
            .collect()
    }

    pub fn category_total(&self, category: MismatchCategory) -> u64 {
        self.results
            .iter()
            .filter(|((e, f), _)| MismatchCategory::classify(e, f) == Some(category))
            .map(|(_, s)| s.count)
            .sum()
    }

    pub fn summary(&self) -> VerificationSummary {
        VerificationSummary {
            correct: self.category_total(MismatchCategory::Correct),
            missing: self.category_total(MismatchCategory::Missing),
            wrong_state: self.category_total(MismatchCategory::WrongState),
            extra: self.category_total(MismatchCategory::Extra),
        }
    }

    /// Recorded world positions of a pair, capped per pair.
    pub fn positions(&self, expected: &BlockState, found: &BlockState) -> &[BlockPosition] {
        self.results
            .get(&(expected.clone(), found.clone()))
            .map(|s| s.positions.as_slice())
            .unwrap_or(&[])
    }

    /// Drops a pair from the results and stops counting it.
    pub fn ignore_state_mismatch(&mut self, expected: &BlockState, found: &BlockState) {
        let pair = (expected.clone(), found.clone());
        self.results.remove(&pair);
        self.ignored_pairs.insert(pair);
    }

    /// Drops a whole category from the results and stops counting it.
    pub fn ignore_category(&mut self, category: MismatchCategory) {
        self.results
            .retain(|(e, f), _| MismatchCategory::classify(e, f) != Some(category));
        self.ignored_categories.insert(category);
    }

    pub fn is_ignored(&self, expected: &BlockState, found: &BlockState) -> bool {
        MismatchCategory::classify(expected, found).is_some_and(|c| self.ignored_categories.contains(&c))
            || self.ignored_pairs.contains(&(expected.clone(), found.clone()))
    }

    /// Counts resume with the next scan; dropped results are not restored.
    pub fn clear_ignored(&mut self) {
        self.ignored_pairs.clear();
        self.ignored_categories.clear();
    }

    /// Called with the final summary when a scan completes. Listeners run
    /// while the verifier is being advanced and must not borrow it.
    pub fn add_completion_listener<F>(&mut self, listener: F)
    where
        F: FnMut(&VerificationSummary) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }
}

/// Drives a shared verifier from the task scheduler.
pub struct VerifierTask {
    name: String,
    verifier: Rc<RefCell<SchematicVerifier>>,
}

impl VerifierTask {
    pub fn new(verifier: Rc<RefCell<SchematicVerifier>>) -> Self {
        let name = format!("verify '{}'", verifier.borrow().placement().name);
        VerifierTask { name, verifier }
    }
}

impl Task for VerifierTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn advance(&mut self, world: Option<&mut dyn WorldAccess>, budget: &TaskBudget) -> Progress {
        match world {
            Some(world) => self.verifier.borrow_mut().advance(&*world, budget),
            None => Progress::Failed("world unavailable".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::SubRegion;
    use crate::world::MemoryWorld;

    fn state(name: &str) -> BlockState {
        BlockState::new(name)
    }

    fn doc() -> Arc<SchematicDocument> {
        let mut doc = SchematicDocument::new("v", "t");
        let mut region = SubRegion::new(BlockPosition::ORIGIN, BlockPosition::new(4, 1, 1));
        region.set_block(0, 0, 0, &state("minecraft:stone")).unwrap();
        region.set_block(1, 0, 0, &state("minecraft:stone")).unwrap();
        region.set_block(2, 0, 0, &state("minecraft:glass")).unwrap();
        doc.add_region("r", region);
        Arc::new(doc)
    }

    fn world() -> MemoryWorld {
        let mut world = MemoryWorld::new();
        world.set_block(BlockPosition::new(0, 0, 0), &state("minecraft:stone"));
        world.set_block(BlockPosition::new(2, 0, 0), &state("minecraft:dirt"));
        world.set_block(BlockPosition::new(3, 0, 0), &state("minecraft:sand"));
        world
    }

    fn run(verifier: &mut SchematicVerifier, world: &MemoryWorld) {
        while verifier.advance(world, &TaskBudget::unlimited()) == Progress::Continue {}
    }

    #[test]
    fn test_classify() {
        let air = BlockState::air();
        let stone = state("minecraft:stone");
        assert_eq!(MismatchCategory::classify(&air, &air), None);
        assert_eq!(MismatchCategory::classify(&air, &stone), Some(MismatchCategory::Extra));
        assert_eq!(MismatchCategory::classify(&stone, &air), Some(MismatchCategory::Missing));
        assert_eq!(MismatchCategory::classify(&stone, &stone), Some(MismatchCategory::Correct));
        assert_eq!(
            MismatchCategory::classify(&stone, &state("minecraft:dirt")),
            Some(MismatchCategory::WrongState)
        );
    }

    #[test]
    fn test_categories_and_positions() {
        let placement = SchematicPlacement::new(&doc(), BlockPosition::ORIGIN);
        let mut verifier = SchematicVerifier::new(doc(), placement, VerifierOptions::default());
        let world = world();
        run(&mut verifier, &world);
        assert_eq!(verifier.state(), VerifierState::Done);
        assert_eq!(
            verifier.summary(),
            VerificationSummary {
                correct: 1,
                missing: 1,
                wrong_state: 1,
                extra: 1
            }
        );
        assert_eq!(
            verifier.positions(&state("minecraft:glass"), &state("minecraft:dirt")),
            &[BlockPosition::new(2, 0, 0)]
        );
        let extra = verifier.records_in(MismatchCategory::Extra);
        assert_eq!(extra[0].found, state("minecraft:sand"));
    }

    #[test]
    fn test_ignore_is_idempotent_and_sticky() {
        let placement = SchematicPlacement::new(&doc(), BlockPosition::ORIGIN);
        let mut verifier = SchematicVerifier::new(doc(), placement, VerifierOptions::default());
        let world = world();
        run(&mut verifier, &world);

        let glass = state("minecraft:glass");
        let dirt = state("minecraft:dirt");
        verifier.ignore_state_mismatch(&glass, &dirt);
        let once = verifier.records();
        verifier.ignore_state_mismatch(&glass, &dirt);
        assert_eq!(verifier.records(), once);
        assert_eq!(verifier.category_total(MismatchCategory::WrongState), 0);

        verifier.ignore_category(MismatchCategory::Extra);
        verifier.start();
        run(&mut verifier, &world);
        assert_eq!(verifier.summary().wrong_state, 0);
        assert_eq!(verifier.summary().extra, 0);
        assert!(verifier.is_ignored(&glass, &dirt));

        verifier.clear_ignored();
        assert_eq!(verifier.summary().wrong_state, 0);
        verifier.start();
        run(&mut verifier, &world);
        assert_eq!(verifier.summary().wrong_state, 1);
        assert_eq!(verifier.summary().extra, 1);
    }

    #[test]
    fn test_sorting() {
        let placement = SchematicPlacement::new(&doc(), BlockPosition::ORIGIN);
        let mut verifier = SchematicVerifier::new(doc(), placement, VerifierOptions::default());
        let mut world = world();
        world.set_block(BlockPosition::new(1, 0, 0), &state("minecraft:stone"));
        world.set_block(BlockPosition::new(3, 0, 0), &BlockState::air());
        world.set_block(BlockPosition::new(0, 0, 0), &state("minecraft:andesite"));
        run(&mut verifier, &world);

        let by_found = verifier.records_sorted(SortCriteria::NameFound, false);
        let wrong: Vec<_> = by_found
            .iter()
            .filter(|r| r.category == MismatchCategory::WrongState)
            .map(|r| r.found.get_name().to_string())
            .collect();
        assert_eq!(wrong, vec!["minecraft:andesite", "minecraft:dirt"]);

        let by_count = verifier.records_sorted(SortCriteria::Count, true);
        assert_eq!(by_count[0].category, MismatchCategory::Correct);
        assert!(by_count.windows(2).all(|w| w[0].category <= w[1].category));
    }

    #[test]
    fn test_unloaded_chunks_are_deferred() {
        let placement = SchematicPlacement::new(&doc(), BlockPosition::new(-2, 0, 0));
        let mut verifier = SchematicVerifier::new(doc(), placement, VerifierOptions::default());
        let mut world = MemoryWorld::new();
        world.set_chunk_loaded(-1, 0, false);
        let finished = Rc::new(RefCell::new(None));
        let sink = finished.clone();
        verifier.add_completion_listener(move |summary| *sink.borrow_mut() = Some(*summary));

        assert_eq!(verifier.advance(&world, &TaskBudget::unlimited()), Progress::Continue);
        assert_eq!(verifier.chunk_progress(), (1, 2));
        assert_eq!(verifier.missing_chunks(), vec![(-1, 0)]);
        assert!(finished.borrow().is_none());

        world.set_chunk_loaded(-1, 0, true);
        assert_eq!(verifier.advance(&world, &TaskBudget::unlimited()), Progress::Done);
        assert_eq!(finished.borrow().unwrap().missing, 3);
        assert!(verifier.missing_chunks().is_empty());
    }
}
