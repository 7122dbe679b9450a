//! Cityscape - procedural night city generator.
//!
//! Splits a rectangular world into blocks and roads, routes elevated
//! highways across it, fills blocks with towers and street furniture,
//! populates the roads with traffic and compiles everything into
//! instance batches ready for a renderer.

use bevy::prelude::*;

pub mod error;
pub mod procgen;
pub mod render;
pub mod simulation;
pub mod world;

pub use error::CityGenError;

/// Generation, simulation and scene compilation in one plugin.
pub struct CityGenPlugin;

impl Plugin for CityGenPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(world::WorldPlugin)
            .add_plugins(procgen::ProcgenPlugin)
            .add_plugins(simulation::SimulationPlugin)
            .add_plugins(render::RenderPlugin);
    }
}
