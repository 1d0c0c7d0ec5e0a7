mod common;

use common::{block_entities, entity_summary, sample_document, stone};
use litematic_engine::selection::NamedBox;
use litematic_engine::{
    capture_full, place_chunk_bounded, place_full, AreaSelection, BlockPosition, BlockState,
    BoundingBox, CaptureOptions, MemoryWorld, Mirror, PasteOptions, PasteReport, ReplaceBehavior, Rotation,
    SchematicDocument, SchematicError, SchematicPlacement, SubRegion, WorldAccess,
};
use litematic_engine::world::WorldBounds;

fn orientations() -> impl Iterator<Item = (Rotation, Mirror)> {
    Rotation::ALL
        .into_iter()
        .flat_map(|r| Mirror::ALL.into_iter().map(move |m| (r, m)))
}

/// Full and chunk-by-chunk pastes must leave identical worlds.
#[test]
fn chunked_paste_matches_full_paste_for_every_orientation() {
    let doc = sample_document();
    let options = PasteOptions::default();

    for (rotation, mirror) in orientations() {
        let mut placement = SchematicPlacement::new(&doc, BlockPosition::new(5, 64, -7))
            .with_rotation(rotation)
            .with_mirror(mirror);
        placement.region_mut("wing").unwrap().rotation = Rotation::Clockwise90;

        let mut full = MemoryWorld::new();
        let full_report = place_full(&mut full, &doc, &placement, &options);
        assert!(full_report.is_success(), "{:?}", full_report);

        let mut chunked = MemoryWorld::new();
        let chunks = placement.touched_chunks(&doc);
        assert!(chunks.len() > 1, "fixture should span several chunks");
        let mut chunked_blocks = 0;
        for (cx, cz) in chunks {
            let report = place_chunk_bounded(&mut chunked, &doc, &placement, cx, cz, &options);
            assert!(report.is_success(), "chunk {},{}: {:?}", cx, cz, report);
            chunked_blocks += report.total().blocks_placed;
        }

        let context = format!("{:?} {:?}", rotation, mirror);
        assert_eq!(full.non_air_blocks(), chunked.non_air_blocks(), "{}", context);
        assert_eq!(block_entities(&full), block_entities(&chunked), "{}", context);
        assert_eq!(entity_summary(&full), entity_summary(&chunked), "{}", context);
        assert_eq!(full_report.total().blocks_placed, chunked_blocks, "{}", context);
        assert_eq!(entity_summary(&full).len(), 3);
    }
}

/// Pastes `placement` both ways and asserts the worlds and reports agree.
fn assert_modes_agree(world: MemoryWorld, doc: &SchematicDocument, placement: &SchematicPlacement) -> MemoryWorld {
    let options = PasteOptions::default();
    let mut full = world.clone();
    let full_report = place_full(&mut full, doc, placement, &options);

    let mut chunked = world;
    let mut chunked_report = PasteReport::default();
    for (cx, cz) in placement.touched_chunks(doc) {
        chunked_report.absorb(place_chunk_bounded(&mut chunked, doc, placement, cx, cz, &options));
    }

    assert_eq!(full.non_air_blocks(), chunked.non_air_blocks());
    assert_eq!(block_entities(&full), block_entities(&chunked));
    assert_eq!(entity_summary(&full), entity_summary(&chunked));
    let outcome = |report: &PasteReport| {
        report
            .regions
            .iter()
            .map(|(name, r)| (name.clone(), r.as_ref().map(|s| s.blocks_placed).map_err(|e| e.message_key())))
            .collect::<Vec<_>>()
    };
    assert_eq!(outcome(&full_report), outcome(&chunked_report));
    full
}

/// A mirrored sub-region inside a rotated schematic: the two do not commute.
#[test]
fn mirrored_region_in_rotated_schematic_matches_in_both_modes() {
    let doc = sample_document();
    for rotation in Rotation::ALL {
        for region_mirror in [Mirror::LeftRight, Mirror::FrontBack] {
            let mut placement = SchematicPlacement::new(&doc, BlockPosition::new(-21, 12, 9)).with_rotation(rotation);
            placement.region_mut("wing").unwrap().mirror = region_mirror;
            let world = assert_modes_agree(MemoryWorld::new(), &doc, &placement);
            assert_eq!(entity_summary(&world).len(), 3);

            let plain = SchematicPlacement::new(&doc, BlockPosition::new(-21, 12, 9)).with_rotation(rotation);
            let mut unmirrored = MemoryWorld::new();
            place_full(&mut unmirrored, &doc, &plain, &PasteOptions::default());
            assert_ne!(unmirrored.non_air_blocks(), world.non_air_blocks());
        }
    }
}

/// A column poking out of the top of the world is refused whole in both modes.
#[test]
fn region_crossing_world_height_is_refused_in_both_modes() {
    let mut doc = SchematicDocument::new("tower", "tests");
    let mut column = SubRegion::new(BlockPosition::ORIGIN, BlockPosition::new(1, 10, 1));
    for y in 0..10 {
        column.set_block(0, y, 0, &stone()).unwrap();
    }
    doc.add_region("column", column);
    let mut base = SubRegion::new(BlockPosition::new(20, 0, 0), BlockPosition::new(2, 1, 2));
    base.set_block(1, 0, 1, &stone()).unwrap();
    doc.add_region("base", base);

    let bounds = WorldBounds {
        min_y: 0,
        max_y: 319,
        ..WorldBounds::default()
    };
    let placement = SchematicPlacement::new(&doc, BlockPosition::new(3, 315, 3));
    let world = assert_modes_agree(MemoryWorld::new().with_bounds(bounds), &doc, &placement);
    assert_eq!(world.non_air_blocks().len(), 1);

    let mut chunked = MemoryWorld::new().with_bounds(bounds);
    let report = place_chunk_bounded(&mut chunked, &doc, &placement, 0, 0, &PasteOptions::default());
    assert!(matches!(
        report.regions["column"],
        Err(SchematicError::OutOfWorldBounds { .. })
    ));
    assert!(chunked.non_air_blocks().is_empty());
}

#[test]
fn placement_footprint_covers_placed_blocks() {
    let doc = sample_document();
    for (rotation, mirror) in orientations() {
        let placement = SchematicPlacement::new(&doc, BlockPosition::new(-40, 10, 33))
            .with_rotation(rotation)
            .with_mirror(mirror);
        let mut world = MemoryWorld::new();
        place_full(&mut world, &doc, &placement, &PasteOptions::default());
        let footprint = placement.footprint(&doc);
        for pos in world.non_air_blocks().keys() {
            assert!(
                footprint.values().any(|bb| bb.contains(*pos)),
                "{} outside footprint for {:?} {:?}",
                pos,
                rotation,
                mirror
            );
        }
        let volume: i64 = footprint.values().map(BoundingBox::volume).sum();
        assert_eq!(volume, doc.total_volume());
    }
}

/// Capturing an area and placing it back where it came from changes nothing.
#[test]
fn capture_then_place_back_is_identity() {
    let doc = sample_document();
    let mut source = MemoryWorld::new();
    let placement = SchematicPlacement::new(&doc, BlockPosition::new(100, 70, 100));
    place_full(&mut source, &doc, &placement, &PasteOptions::default());

    let mut area = AreaSelection::new("copy", BlockPosition::new(100, 70, 100));
    for (name, bb) in placement.footprint(&doc) {
        area = area.with_box(NamedBox::from_corners(name, bb.max, bb.min));
    }
    let (captured, report) = capture_full(&source, &area, &CaptureOptions::default()).unwrap();
    assert!(report.skipped.is_empty());
    assert_eq!(captured.total_blocks(), doc.total_blocks());

    let mut target = MemoryWorld::new();
    let back = SchematicPlacement::new(&captured, area.origin);
    let options = PasteOptions {
        replace: ReplaceBehavior::All,
        ..PasteOptions::default()
    };
    let paste = place_full(&mut target, &captured, &back, &options);
    assert!(paste.is_success());

    assert_eq!(source.non_air_blocks(), target.non_air_blocks());
    assert_eq!(block_entities(&source), block_entities(&target));
    assert_eq!(entity_summary(&source), entity_summary(&target));
}

/// A 2x2x2 block of A with B in one corner, placed with a quarter turn.
#[test]
fn rotated_corner_lands_on_rotated_position() {
    let a = stone();
    let b = BlockState::new("minecraft:gold_block");

    let mut world = MemoryWorld::new();
    world.fill(
        &BoundingBox::new(BlockPosition::new(50, 0, 50), BlockPosition::new(51, 1, 51)),
        &a,
    );
    world.set_block(BlockPosition::new(51, 0, 50), &b);

    let area = AreaSelection::new("cube", BlockPosition::new(50, 0, 50)).with_box(NamedBox::from_corners(
        "cube",
        BlockPosition::new(50, 0, 50),
        BlockPosition::new(51, 1, 51),
    ));
    let (doc, _) = capture_full(&world, &area, &CaptureOptions::default()).unwrap();
    assert_eq!(doc.region("cube").unwrap().get_block(1, 0, 0).unwrap(), &b);

    let placement = SchematicPlacement::new(&doc, BlockPosition::ORIGIN).with_rotation(Rotation::Clockwise90);
    let mut target = MemoryWorld::new();
    place_full(&mut target, &doc, &placement, &PasteOptions::default());

    // local (1, 0, 0) turned clockwise about the vertical axis
    assert_eq!(target.get_block(BlockPosition::new(0, 0, 1)), b);
    assert_eq!(target.get_block(BlockPosition::new(1, 0, 0)), BlockState::air());
    let blocks = target.non_air_blocks();
    assert_eq!(blocks.len(), 8);
    assert_eq!(blocks.values().filter(|s| **s == b).count(), 1);
    assert!(blocks.keys().all(|p| (-1..=0).contains(&p.x) && (0..=1).contains(&p.z)));
}

#[test]
fn disabled_regions_are_not_placed() {
    let doc = sample_document();
    let mut placement = SchematicPlacement::new(&doc, BlockPosition::ORIGIN);
    placement.toggle_region("wing");
    let mut world = MemoryWorld::new();
    let report = place_full(&mut world, &doc, &placement, &PasteOptions::default());
    assert_eq!(report.regions.keys().collect::<Vec<_>>(), vec!["main"]);
    assert!(world.non_air_blocks().keys().all(|p| p.x < 20));

    placement.enabled = false;
    let report = place_full(&mut MemoryWorld::new(), &doc, &placement, &PasteOptions::default());
    assert!(report.regions.is_empty());
}

#[test]
fn empty_region_is_skipped_with_error() {
    let mut doc = SchematicDocument::new("e", "t");
    doc.add_region("flat", SubRegion::new(BlockPosition::ORIGIN, BlockPosition::new(3, 0, 3)));
    let mut solid = SubRegion::new(BlockPosition::new(5, 0, 0), BlockPosition::new(1, 1, 1));
    solid.set_block(0, 0, 0, &stone()).unwrap();
    doc.add_region("solid", solid);

    let placement = SchematicPlacement::new(&doc, BlockPosition::ORIGIN);
    let mut world = MemoryWorld::new();
    let report = place_full(&mut world, &doc, &placement, &PasteOptions::default());
    assert!(report.regions["flat"].is_err());
    assert_eq!(world.get_block(BlockPosition::new(5, 0, 0)), stone());
}
