//! Scene description and instance batching.
//!
//! Nothing here talks to the GPU. Generators produce placeholders, the
//! compile step groups them into instance batches, and a renderer reads the
//! resulting [`CompiledScene`](instancing::CompiledScene).

use bevy::prelude::*;

pub mod instancing;
pub mod placeholder;
pub mod primitives;
pub mod shaders;

use crate::procgen::{CityGenSet, CityPlaceholders};
use crate::simulation::vehicles::Car;
use instancing::{compile, CompiledScene};
use primitives::PrimitiveRegistry;
use shaders::ShaderRegistry;

pub struct RenderPlugin;

impl Plugin for RenderPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PrimitiveRegistry>()
            .init_resource::<ShaderRegistry>()
            .init_resource::<CompiledScene>()
            .add_systems(Startup, compile_scene.in_set(CityGenSet::Compile));
    }
}

/// Compile static placeholders plus every car into instance batches.
///
/// A structural error leaves the previous scene in place and asks the app
/// to exit.
fn compile_scene(
    mut commands: Commands,
    placeholders: Res<CityPlaceholders>,
    primitives: Res<PrimitiveRegistry>,
    shaders: Res<ShaderRegistry>,
    cars: Query<(Entity, &Car)>,
    mut scene: ResMut<CompiledScene>,
    mut exit: EventWriter<AppExit>,
) {
    let mut cars: Vec<(Entity, &Car)> = cars.iter().collect();
    cars.sort_by_key(|(entity, _)| *entity);
    let car_list: Vec<Car> = cars.iter().map(|(_, car)| (*car).clone()).collect();

    match compile(&placeholders.0, &car_list, &primitives, &shaders) {
        Ok((compiled, slots)) => {
            for ((entity, _), slots) in cars.iter().zip(slots) {
                commands.entity(*entity).insert(slots);
            }
            info!(
                "Compiled {} instances into {} batches ({} live)",
                compiled.stats.instances,
                compiled.batch_count(),
                compiled.stats.live_instances
            );
            *scene = compiled;
        }
        Err(err) => {
            error!("Scene compilation failed: {err}");
            exit.send(AppExit::error());
        }
    }
}
