mod common;

use common::{block_entities, entity_summary, sample_document, stone};
use litematic_engine::config::{TaskOptions, VerifierOptions};
use litematic_engine::selection::NamedBox;
use litematic_engine::{
    place_full, AreaSelection, BlockPosition, BlockState, CaptureOptions, CaptureTask,
    MemoryWorld, MismatchCategory, Mirror, PasteOptions, PasteTask, Progress, Rotation,
    SchematicPlacement, SchematicVerifier, TaskBudget, TaskScheduler, VerificationSummary,
    VerifierTask, WorldAccess,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

fn run_verifier(verifier: &mut SchematicVerifier, world: &MemoryWorld) {
    let budget = TaskBudget::new(std::time::Duration::from_secs(10), 2);
    while verifier.advance(world, &budget) == Progress::Continue {}
}

#[test]
fn faithful_placement_verifies_clean() {
    let doc = Arc::new(sample_document());
    let placement = SchematicPlacement::new(&doc, BlockPosition::new(-3, 40, 12))
        .with_rotation(Rotation::CounterClockwise90)
        .with_mirror(Mirror::LeftRight);
    let mut world = MemoryWorld::new();
    place_full(&mut world, &doc, &placement, &PasteOptions::default());

    let mut verifier = SchematicVerifier::new(doc.clone(), placement, VerifierOptions::default());
    run_verifier(&mut verifier, &world);
    let summary = verifier.summary();
    assert_eq!(summary.correct, doc.total_blocks() as u64);
    assert_eq!(summary.mismatched(), 0);
}

/// Every expected block lands in exactly one of correct, missing or wrong state.
#[test]
fn counts_cover_every_expected_block() {
    let doc = Arc::new(sample_document());
    let placement = SchematicPlacement::new(&doc, BlockPosition::new(0, 64, 0)).with_rotation(Rotation::Clockwise180);
    let mut world = MemoryWorld::new();
    place_full(&mut world, &doc, &placement, &PasteOptions::default());

    // damage the build: remove some blocks, swap others, add stray ones
    let placed: Vec<BlockPosition> = world.non_air_blocks().keys().copied().collect();
    for (i, pos) in placed.iter().enumerate() {
        match i % 7 {
            0 => {
                world.set_block(*pos, &BlockState::air());
            }
            3 => {
                world.set_block(*pos, &BlockState::new("minecraft:cobblestone"));
            }
            _ => {}
        }
    }
    for bb in placement.footprint(&doc).values() {
        world.set_block(bb.min, &BlockState::new("minecraft:dirt"));
    }

    let mut verifier = SchematicVerifier::new(doc.clone(), placement, VerifierOptions::default());
    run_verifier(&mut verifier, &world);

    let expected_blocks: u64 = verifier
        .records()
        .iter()
        .filter(|r| r.category != MismatchCategory::Extra)
        .map(|r| r.count)
        .sum();
    assert_eq!(expected_blocks, doc.total_blocks() as u64);
    let summary = verifier.summary();
    assert!(summary.missing > 0);
    assert!(summary.wrong_state > 0);
}

#[test]
fn ignoring_twice_equals_ignoring_once() {
    let doc = Arc::new(sample_document());
    let placement = SchematicPlacement::new(&doc, BlockPosition::ORIGIN);
    let mut world = MemoryWorld::new();
    place_full(&mut world, &doc, &placement, &PasteOptions::default());
    for pos in world.non_air_blocks().keys().copied().collect::<Vec<_>>() {
        if world.get_block(pos) == stone() {
            world.set_block(pos, &BlockState::new("minecraft:andesite"));
        }
    }

    let mut verifier = SchematicVerifier::new(doc, placement, VerifierOptions::default());
    run_verifier(&mut verifier, &world);
    let andesite = BlockState::new("minecraft:andesite");
    assert!(verifier.category_total(MismatchCategory::WrongState) > 0);

    verifier.ignore_state_mismatch(&stone(), &andesite);
    let once = (verifier.records(), verifier.summary());
    verifier.ignore_state_mismatch(&stone(), &andesite);
    assert_eq!((verifier.records(), verifier.summary()), once);
    assert_eq!(verifier.category_total(MismatchCategory::WrongState), 0);

    verifier.start();
    run_verifier(&mut verifier, &world);
    assert_eq!(verifier.summary(), once.1);
    assert!(verifier.positions(&stone(), &andesite).is_empty());
}

/// Capture, paste and verify driven only by the scheduler, with a chunk
/// unloaded for a while.
#[test]
fn scheduled_pipeline_round_trip() {
    let doc = sample_document();
    let mut source = MemoryWorld::new();
    let original = SchematicPlacement::new(&doc, BlockPosition::new(8, 0, 8));
    place_full(&mut source, &doc, &original, &PasteOptions::default());

    let mut area = AreaSelection::new("pipeline", BlockPosition::new(8, 0, 8));
    for (name, bb) in original.footprint(&doc) {
        area = area.with_box(NamedBox::from_corners(name, bb.min, bb.max));
    }

    let options = TaskOptions {
        max_chunks_per_tick: 1,
        ..TaskOptions::default()
    };
    let mut scheduler = TaskScheduler::new(options);
    let finished = Rc::new(RefCell::new(Vec::new()));
    let sink = finished.clone();
    scheduler.add_completion_listener(move |_, name, progress| {
        sink.borrow_mut().push((name.to_string(), progress.clone()));
    });

    let capture = CaptureTask::new(area, CaptureOptions::default()).unwrap();
    let captured = capture.result_handle();
    scheduler.add_task(Box::new(capture));
    assert!(scheduler.run_to_completion(&mut source, 100));
    let (captured, report) = captured.borrow_mut().take().unwrap();
    assert_eq!(report.entities, 3);
    assert_eq!(captured.total_blocks(), doc.total_blocks());

    let captured = Arc::new(captured);
    let placement = SchematicPlacement::new(&captured, BlockPosition::new(-200, 30, 64)).with_rotation(Rotation::Clockwise90);
    let mut target = MemoryWorld::new();
    let first_chunk = placement.touched_chunks(&captured)[0];
    target.set_chunk_loaded(first_chunk.0, first_chunk.1, false);

    let paste = PasteTask::new(captured.clone(), placement.clone(), PasteOptions::default());
    let pasted = paste.result_handle();
    scheduler.add_task(Box::new(paste));
    for _ in 0..5 {
        scheduler.run_tick(Some(&mut target));
    }
    assert_eq!(scheduler.len(), 1, "paste waits for the unloaded chunk");
    target.set_chunk_loaded(first_chunk.0, first_chunk.1, true);
    assert!(scheduler.run_to_completion(&mut target, 100));
    assert!(pasted.borrow().as_ref().unwrap().is_success());
    assert_eq!(entity_summary(&target).len(), 3);

    let mut reference = MemoryWorld::new();
    place_full(&mut reference, &captured, &placement, &PasteOptions::default());
    assert_eq!(reference.non_air_blocks(), target.non_air_blocks());
    assert_eq!(block_entities(&reference), block_entities(&target));

    let verifier = Rc::new(RefCell::new(SchematicVerifier::new(
        captured.clone(),
        placement,
        VerifierOptions::default(),
    )));
    let summary = Rc::new(RefCell::new(None::<VerificationSummary>));
    let summary_sink = summary.clone();
    verifier
        .borrow_mut()
        .add_completion_listener(move |s| *summary_sink.borrow_mut() = Some(*s));
    scheduler.add_task(Box::new(VerifierTask::new(verifier.clone())));
    assert!(scheduler.run_to_completion(&mut target, 100));

    let summary = summary.borrow().unwrap();
    assert_eq!(summary.correct, doc.total_blocks() as u64);
    assert_eq!(summary.mismatched(), 0);
    assert_eq!(
        finished
            .borrow()
            .iter()
            .filter(|(_, p)| *p == Progress::Done)
            .count(),
        3
    );
}
