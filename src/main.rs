//! Headless city generator.
//!
//! Builds the city once, then keeps the traffic running at 60 Hz and
//! reports scene statistics every few seconds.

use std::time::Duration;

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;

use cityscape::render::instancing::CompiledScene;
use cityscape::simulation::vehicles::Car;
use cityscape::CityGenPlugin;

const REPORT_INTERVAL_SECS: f32 = 5.0;

fn main() {
    App::new()
        .add_plugins(
            MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(
                1.0 / 60.0,
            ))),
        )
        .add_plugins(LogPlugin::default())
        .add_plugins(CityGenPlugin)
        .add_systems(Update, report_scene)
        .run();
}

fn report_scene(
    time: Res<Time>,
    mut timer: Local<Option<Timer>>,
    scene: Res<CompiledScene>,
    cars: Query<&Car>,
) {
    let timer = timer.get_or_insert_with(|| {
        Timer::from_seconds(REPORT_INTERVAL_SECS, TimerMode::Repeating)
    });
    if !timer.tick(time.delta()).just_finished() {
        return;
    }
    let turned = cars.iter().filter(|car| car.direction < 0.0).count();
    info!(
        "{} batches, {} instances, {} cars ({} heading back)",
        scene.batch_count(),
        scene.instance_count(),
        cars.iter().count(),
        turned
    );
}
