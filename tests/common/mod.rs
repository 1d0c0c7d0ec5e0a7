#![allow(dead_code)]

use litematic_engine::block_entity::BlockEntity;
use litematic_engine::nbt::NbtValue;
use litematic_engine::{BlockPosition, BlockState, Entity, MemoryWorld, SchematicDocument, SubRegion, WorldAccess};
use std::collections::BTreeMap;

/// Small deterministic generator so fixtures are stable between runs.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Lcg(seed)
    }

    pub fn next(&mut self) -> u32 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) as u32
    }

    pub fn below(&mut self, n: u32) -> u32 {
        self.next() % n
    }
}

pub fn stone() -> BlockState {
    BlockState::new("minecraft:stone")
}

/// Mix of plain and orientation-bearing states, air weighted heavier.
pub fn sample_states() -> Vec<BlockState> {
    vec![
        BlockState::air(),
        BlockState::air(),
        stone(),
        BlockState::new("minecraft:glass"),
        BlockState::new("minecraft:oak_stairs")
            .with_property("facing", "north")
            .with_property("half", "bottom")
            .with_property("shape", "inner_left")
            .with_property("waterlogged", "false"),
        BlockState::new("minecraft:rail").with_property("shape", "north_east"),
        BlockState::new("minecraft:oak_log").with_property("axis", "x"),
        BlockState::new("minecraft:oak_sign").with_property("rotation", "5"),
        BlockState::new("minecraft:oak_fence")
            .with_property("east", "true")
            .with_property("north", "false")
            .with_property("south", "false")
            .with_property("west", "true"),
    ]
}

fn chest() -> BlockState {
    BlockState::new("minecraft:chest").with_property("facing", "west")
}

/// Fills a region with random states plus a few chests carrying records.
pub fn random_region(position: BlockPosition, size: BlockPosition, rng: &mut Lcg) -> SubRegion {
    let mut region = SubRegion::new(position, size);
    let states = sample_states();
    let dims = region.container.size();
    for y in 0..dims.y {
        for z in 0..dims.z {
            for x in 0..dims.x {
                let state = if rng.below(40) == 0 {
                    let local = BlockPosition::new(x, y, z);
                    region.set_block_entity(
                        local,
                        BlockEntity::new("minecraft:chest", local)
                            .with_nbt_data("Items", NbtValue::List(vec![]))
                            .with_nbt_data("CustomName", NbtValue::String(format!("chest {}", local))),
                    );
                    chest()
                } else {
                    states[rng.below(states.len() as u32) as usize].clone()
                };
                region.set_block(x, y, z, &state).unwrap();
            }
        }
    }
    region
}

/// Two disjoint regions, one of them anchored at its maximum corner.
pub fn sample_document() -> SchematicDocument {
    let mut rng = Lcg::new(7);
    let mut doc = SchematicDocument::new("Sample", "tests");
    let mut main = random_region(BlockPosition::ORIGIN, BlockPosition::new(20, 4, 18), &mut rng);
    main.add_entity(
        Entity::new("minecraft:armor_stand".to_string(), (3.5, 1.0, 15.25))
            .with_nbt_data("Rotation".to_string(), NbtValue::List(vec![NbtValue::Float(30.0), NbtValue::Float(0.0)])),
    );
    main.add_entity(Entity::new("minecraft:cow".to_string(), (19.9, 0.0, 0.1)));
    doc.add_region("main", main);

    let mut wing = random_region(BlockPosition::new(30, 2, 5), BlockPosition::new(-9, 3, -12), &mut rng);
    wing.add_entity(Entity::new("minecraft:pig".to_string(), (-3.5, 0.0, -4.5)));
    doc.add_region("wing", wing);
    doc.update_metadata();
    doc
}

/// Entities of a world as comparable strings, sorted.
pub fn entity_summary(world: &MemoryWorld) -> Vec<String> {
    let mut out: Vec<String> = world
        .entities()
        .map(|e| format!("{} {:.3} {:.3} {:.3} {:?}", e.id, e.position.0, e.position.1, e.position.2, e.yaw()))
        .collect();
    out.sort();
    out
}

/// Every block entity of a world keyed by position.
pub fn block_entities(world: &MemoryWorld) -> BTreeMap<BlockPosition, BlockEntity> {
    world
        .non_air_blocks()
        .keys()
        .filter_map(|pos| world.get_block_entity(*pos).map(|be| (*pos, be)))
        .collect()
}
