//! End-to-end checks of the generation chain and the compiled scene.
//!
//! Run with: cargo test --test city_generation

use std::collections::HashMap;
use std::time::Duration;

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use cityscape::procgen::blocks::{can_split, min_block_size, split, CityLayout};
use cityscape::procgen::buildings::{place, BuildingSlot};
use cityscape::procgen::constants::{HIGHWAY_DECK_WIDTH, LANE_WIDTH, MAX_SPLIT_SLOTS};
use cityscape::procgen::highway::HighwaySpec;
use cityscape::procgen::{build_highways, generate_city};
use cityscape::render::instancing::{compile, CarInstanceSlots, CompiledScene};
use cityscape::render::placeholder::PlaceholderRole;
use cityscape::render::primitives::PrimitiveRegistry;
use cityscape::render::shaders::ShaderRegistry;
use cityscape::simulation::traffic::TrafficConfig;
use cityscape::simulation::vehicles::Car;
use cityscape::world::CityGenConfig;
use cityscape::CityGenPlugin;

fn single_highway_config() -> CityGenConfig {
    CityGenConfig {
        size: Vec2::new(1000.0, 1000.0),
        seed: 7,
        initial_lanes: 8,
        highways: vec![HighwaySpec::new(Vec2::X, 8.0, 0.0)],
    }
}

// ============================================================================
// LAYOUT
// ============================================================================

#[test]
fn blocks_and_roads_tile_the_world() {
    let config = single_highway_config();
    for seed in 0..5 {
        let mut rng = StdRng::seed_from_u64(seed);
        let highways = build_highways(&config, &mut rng);
        let layout = split(config.bounds(), 8, &highways.points(), &mut rng);
        let covered = layout.covered_area();
        assert!(
            (covered - 1_000_000.0).abs() <= 1.0,
            "seed {seed}: covered {covered}"
        );
        for block in layout.blocks() {
            let extent = block.bounds.size();
            assert!(!can_split(extent.x, block.lanes, MAX_SPLIT_SLOTS), "seed {seed}: {extent:?}");
            assert!(!can_split(extent.y, block.lanes, MAX_SPLIT_SLOTS), "seed {seed}: {extent:?}");
        }
    }
}

#[test]
fn leaves_respect_minimum_size() {
    let mut sizes = StdRng::seed_from_u64(1234);
    for seed in 0..20 {
        let size = Vec2::new(sizes.gen_range(200.0..2000.0), sizes.gen_range(200.0..2000.0));
        let lanes = sizes.gen_range(1..=5) * 2;
        let layout = split(
            Rect::from_corners(Vec2::ZERO, size),
            lanes,
            &[],
            &mut StdRng::seed_from_u64(seed),
        );
        for block in layout.blocks() {
            let extent = block.bounds.size();
            let minimum = min_block_size(block.lanes, 2);
            assert!(extent.x >= minimum, "{extent:?} below {minimum}");
            assert!(extent.y >= minimum, "{extent:?} below {minimum}");
            assert!(!can_split(extent.x, block.lanes, MAX_SPLIT_SLOTS));
            assert!(!can_split(extent.y, block.lanes, MAX_SPLIT_SLOTS));
        }
    }
}

#[test]
fn road_width_is_lanes_times_lane_width() {
    let layout = split(
        Rect::new(0.0, 0.0, 1500.0, 1200.0),
        10,
        &[],
        &mut StdRng::seed_from_u64(3),
    );
    assert!(layout.road_count() > 0);
    for road in layout.roads() {
        assert_eq!(road.width(), road.lanes() as f32 * LANE_WIDTH);
        assert!(road.lanes() >= 2);
    }
}

#[test]
fn lanes_reach_floor_within_expected_depth() {
    for initial in [2u32, 4, 6, 8, 10] {
        let layout = split(
            Rect::new(0.0, 0.0, 1500.0, 1500.0),
            initial,
            &[],
            &mut StdRng::seed_from_u64(initial as u64),
        );
        let floor_depth = (initial - 2).div_ceil(2) as usize;
        for leaf in layout.hierarchy.leaves() {
            let path = layout.hierarchy.lane_path(leaf);
            assert_eq!(path[0], initial);
            assert!(path.windows(2).all(|w| w[1] <= w[0]), "{path:?}");
            for (depth, lanes) in path.iter().enumerate() {
                if depth >= floor_depth {
                    assert_eq!(*lanes, 2, "initial {initial}: {path:?}");
                }
            }
        }
    }
}

fn block_count_by_depth(layout: &CityLayout) -> HashMap<u32, usize> {
    let mut counts = HashMap::new();
    for block in layout.blocks() {
        *counts.entry(block.depth).or_insert(0) += 1;
    }
    counts
}

#[test]
fn same_seed_same_layout() {
    let config = CityGenConfig::default();
    let traffic = TrafficConfig::default();
    let a = generate_city(&config, &traffic, &mut StdRng::seed_from_u64(99));
    let b = generate_city(&config, &traffic, &mut StdRng::seed_from_u64(99));
    assert_eq!(a.layout.block_count(), b.layout.block_count());
    assert_eq!(block_count_by_depth(&a.layout), block_count_by_depth(&b.layout));
    assert_eq!(a.placeholders, b.placeholders);
}

// ============================================================================
// PLACEMENT
// ============================================================================

#[test]
fn slots_host_at_most_one_tower() {
    let config = single_highway_config();
    let mut rng = StdRng::seed_from_u64(5);
    let highways = build_highways(&config, &mut rng);
    let layout = split(config.bounds(), 8, &highways.points(), &mut rng);

    let mut reserved_total = 0;
    for block in layout.blocks() {
        let placed = place(block, &mut rng);
        let mut towers: HashMap<UVec2, usize> = HashMap::new();
        for placeholder in &placed.placeholders {
            if placeholder.role == PlaceholderRole::Building {
                let slot = placeholder.slot.expect("towers carry their slot");
                *towers.entry(slot).or_insert(0) += 1;
            }
        }
        for (i, j) in placed.slots.coordinates() {
            let hosted = towers
                .get(&UVec2::new(i as u32, j as u32))
                .copied()
                .unwrap_or(0);
            match placed.slots.get(i, j) {
                BuildingSlot::Occupied { .. } => assert_eq!(hosted, 1),
                BuildingSlot::Reserved => {
                    reserved_total += 1;
                    assert_eq!(hosted, 0);
                }
                BuildingSlot::Empty => assert_eq!(hosted, 0),
            }
        }
    }
    assert!(reserved_total > 0, "the highway should reserve some slots");
}

/// Euclidean distance from `point` to `rect`, zero inside.
fn distance_to_rect(rect: Rect, point: Vec2) -> f32 {
    (rect.min - point).max(point - rect.max).max(Vec2::ZERO).length()
}

#[test]
fn towers_stay_clear_of_highway_decks() {
    let config = CityGenConfig::default();
    let half_deck = HIGHWAY_DECK_WIDTH * 0.5;
    for seed in 0..5 {
        let city = generate_city(
            &config,
            &TrafficConfig::default(),
            &mut StdRng::seed_from_u64(seed),
        );
        let centerlines: Vec<Vec<Vec2>> = city
            .highways
            .highways
            .iter()
            .map(|highway| highway.curve().sample(4000))
            .collect();

        for placeholder in &city.placeholders {
            if !matches!(placeholder.role, PlaceholderRole::Building | PlaceholderRole::Tier) {
                continue;
            }
            let footprint = placeholder.footprint();
            for centerline in &centerlines {
                let closest = centerline
                    .iter()
                    .map(|point| distance_to_rect(footprint, *point))
                    .fold(f32::INFINITY, f32::min);
                assert!(
                    closest >= half_deck - 1e-3,
                    "seed {seed}: {:?} {footprint:?} is {closest} from a deck centreline",
                    placeholder.role
                );
            }
        }
    }
}

// ============================================================================
// COMPILATION
// ============================================================================

#[test]
fn compile_is_byte_identical_for_same_seed() {
    let primitives = PrimitiveRegistry::default();
    let shaders = ShaderRegistry::default();
    let build = || {
        let city = generate_city(
            &CityGenConfig::default(),
            &TrafficConfig::default(),
            &mut StdRng::seed_from_u64(17),
        );
        compile(&city.placeholders, &city.cars, &primitives, &shaders).unwrap()
    };
    let (a, slots_a) = build();
    let (b, slots_b) = build();

    assert_eq!(slots_a, slots_b);
    assert_eq!(a.batch_count(), b.batch_count());
    for (x, y) in a.batches().zip(b.batches()) {
        assert_eq!(x.key, y.key);
        assert_eq!(x.transform_bytes(), y.transform_bytes());
        assert_eq!(x.live_range(), y.live_range());
        for (p, q) in x.attributes().iter().zip(y.attributes()) {
            assert_eq!(p.as_bytes(), q.as_bytes());
        }
    }
}

#[test]
fn every_placeholder_lands_in_one_batch() {
    let city = generate_city(
        &CityGenConfig::default(),
        &TrafficConfig::default(),
        &mut StdRng::seed_from_u64(23),
    );
    let (scene, slots) = compile(
        &city.placeholders,
        &city.cars,
        &PrimitiveRegistry::default(),
        &ShaderRegistry::default(),
    )
    .unwrap();
    assert_eq!(
        scene.instance_count(),
        city.placeholders.len() + 3 * city.cars.len()
    );
    assert_eq!(slots.len(), city.cars.len());
    assert_eq!(scene.stats.live_instances, 3 * city.cars.len());
    let live: usize = scene.batches().map(|b| b.live_range().len()).sum();
    assert_eq!(live, 3 * city.cars.len());
}

// ============================================================================
// APP
// ============================================================================

fn city_app() -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .add_plugins(CityGenPlugin)
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(100)));
    app
}

#[test]
fn app_generates_and_animates_city() {
    let mut app = city_app();
    app.update();

    let batches = app.world().resource::<CompiledScene>().batch_count();
    assert!(batches > 0);
    assert!(app.world().resource::<CityLayout>().block_count() > 1);

    let mut query = app.world_mut().query::<(&Car, &CarInstanceSlots)>();
    let before: Vec<_> = query
        .iter(app.world())
        .map(|(_, slots)| {
            app.world()
                .resource::<CompiledScene>()
                .transform(slots.body)
                .unwrap()
        })
        .collect();
    assert!(!before.is_empty(), "default traffic should spawn cars");

    app.update();
    app.update();

    let scene = app.world().resource::<CompiledScene>();
    let moved = query
        .iter(app.world())
        .zip(&before)
        .filter(|((_, slots), old)| scene.transform(slots.body).unwrap() != **old)
        .count();
    assert!(moved > 0);
    assert!(app.should_exit().is_none());
}

#[test]
fn unregistered_shader_requests_exit() {
    let mut app = city_app();
    app.insert_resource(ShaderRegistry::empty());
    app.update();

    assert!(matches!(app.should_exit(), Some(AppExit::Error(_))));
    assert_eq!(app.world().resource::<CompiledScene>().batch_count(), 0);
}
