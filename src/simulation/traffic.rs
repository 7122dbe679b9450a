//! Traffic population and the per-frame car update.
//!
//! Cars are sampled along every road at a fixed interval, one lane at a
//! time. Once spawned they only move along their own road; every frame they
//! advance in parallel and their transforms are then re-baked into the live
//! ranges of the compiled scene.

use bevy::prelude::*;
use rand::Rng;

use crate::procgen::blocks::CityLayout;
use crate::procgen::roads::RoadRef;
use crate::render::instancing::{CarInstanceSlots, CompiledScene};
use crate::world::CityRng;

use super::vehicles::Car;

/// Configuration for traffic population.
#[derive(Resource, Clone, Debug)]
pub struct TrafficConfig {
    /// Distance between candidate spawn positions along a road.
    pub spawn_interval: f32,
    /// Chance that a candidate position receives a car.
    pub spawn_probability: f32,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            spawn_interval: 10.0,
            spawn_probability: 0.2,
        }
    }
}

/// Sample cars along `roads`, lanes `1..=lanes/2` of each.
pub fn populate<'a>(
    roads: impl IntoIterator<Item = &'a RoadRef>,
    config: &TrafficConfig,
    rng: &mut impl Rng,
) -> Vec<Car> {
    let mut cars = Vec::new();
    if config.spawn_interval <= 0.0 {
        warn!("Traffic spawn interval must be positive, no cars spawned");
        return cars;
    }
    for road in roads {
        let length = road.length();
        for lane in 1..=road.lanes() / 2 {
            let mut position = 0.0;
            while position < length {
                if rng.gen::<f32>() < config.spawn_probability {
                    cars.push(Car::spawn(road.clone(), position, lane, rng));
                }
                position += config.spawn_interval;
            }
        }
    }
    cars
}

/// Spawn one entity per populated car.
pub fn spawn_traffic(
    mut commands: Commands,
    layout: Res<CityLayout>,
    config: Res<TrafficConfig>,
    mut rng: ResMut<CityRng>,
) {
    let cars = populate(layout.roads(), &config, &mut rng.0);
    info!(
        "Spawned {} cars on {} roads",
        cars.len(),
        layout.road_count()
    );
    commands.spawn_batch(cars);
}

/// Move every car. Cars never touch each other, so this runs in parallel.
pub fn advance_cars(time: Res<Time>, mut cars: Query<&mut Car>) {
    let dt = time.delta_secs();
    cars.par_iter_mut().for_each(|mut car| car.update(dt));
}

/// Copy car transforms into the compiled scene after all cars moved.
pub fn rebake_car_instances(
    mut scene: ResMut<CompiledScene>,
    cars: Query<(&Car, &CarInstanceSlots)>,
) {
    for (car, slots) in &cars {
        scene.rebake(car, slots);
    }
}
