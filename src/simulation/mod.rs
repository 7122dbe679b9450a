//! Per-frame simulation of generated traffic.
//!
//! Cars are spawned once during generation and then advanced every frame.
//! Their transforms are re-baked into the compiled scene after the move.

use bevy::prelude::*;

pub mod traffic;
pub mod vehicles;

use crate::procgen::CityGenSet;
use traffic::{advance_cars, rebake_car_instances, spawn_traffic, TrafficConfig};

pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TrafficConfig>()
            .add_systems(Startup, spawn_traffic.in_set(CityGenSet::Traffic))
            .add_systems(Update, (advance_cars, rebake_car_instances).chain());
    }
}
