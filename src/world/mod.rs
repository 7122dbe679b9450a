//! World configuration and the shared generation RNG.

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::procgen::highway::HighwaySpec;

pub struct WorldPlugin;

impl Plugin for WorldPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CityGenConfig>()
            .init_resource::<CityRng>()
            .add_systems(PreStartup, seed_rng);
    }
}

/// Global city generation configuration.
#[derive(Resource, Clone, Debug)]
pub struct CityGenConfig {
    /// World size in meters. The world spans `[0, size.x] × [0, size.y]`.
    pub size: Vec2,
    pub seed: u64,
    /// Lanes of the road laid by the first split.
    pub initial_lanes: u32,
    pub highways: Vec<HighwaySpec>,
}

impl Default for CityGenConfig {
    fn default() -> Self {
        Self {
            size: Vec2::new(1000.0, 1000.0),
            seed: 42,
            initial_lanes: 8,
            highways: vec![
                HighwaySpec::new(Vec2::X, 8.0, 0.0),
                HighwaySpec::new(Vec2::Y, 14.0, -120.0),
            ],
        }
    }
}

impl CityGenConfig {
    pub fn bounds(&self) -> Rect {
        Rect::from_corners(Vec2::ZERO, self.size)
    }
}

/// The one PRNG every generation step draws from, in a fixed order.
#[derive(Resource)]
pub struct CityRng(pub StdRng);

impl Default for CityRng {
    fn default() -> Self {
        Self(StdRng::seed_from_u64(CityGenConfig::default().seed))
    }
}

impl CityRng {
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

fn seed_rng(config: Res<CityGenConfig>, mut rng: ResMut<CityRng>) {
    *rng = CityRng::seeded(config.seed);
    info!("City seed {}", config.seed);
}
