//! Procedural city generation.
//!
//! - Highway routing by random walk and Catmull-Rom fitting
//! - Recursive block splitting with lane-shrinking roads
//! - Building placement with merge, tier and spire heuristics
//! - Street furniture along sidewalks and highway decks
//!
//! Generation runs once at startup as a chain of [`CityGenSet`]s, all
//! drawing from the shared [`CityRng`].

use bevy::prelude::*;
use rand::Rng;

pub mod blocks;
pub mod buildings;
pub mod constants;
pub mod geometry;
pub mod highway;
pub mod roads;
pub mod street_furniture;

use crate::render::placeholder::ScenePlaceholder;
use crate::simulation::traffic::{populate, TrafficConfig};
use crate::simulation::vehicles::Car;
use crate::world::{CityGenConfig, CityRng};
use blocks::{CityElement, CityLayout};
use highway::{HighwayPoint, HighwaySpline};

pub struct ProcgenPlugin;

impl Plugin for ProcgenPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<HighwayNetwork>()
            .init_resource::<CityLayout>()
            .init_resource::<CityPlaceholders>()
            .configure_sets(
                Startup,
                (
                    CityGenSet::Highways,
                    CityGenSet::Blocks,
                    CityGenSet::Buildings,
                    CityGenSet::Traffic,
                    CityGenSet::Compile,
                )
                    .chain(),
            )
            .add_systems(
                Startup,
                (
                    generate_highways.in_set(CityGenSet::Highways),
                    split_blocks.in_set(CityGenSet::Blocks),
                    place_buildings.in_set(CityGenSet::Buildings),
                ),
            );
    }
}

/// Ordered startup stages of city generation.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CityGenSet {
    Highways,
    Blocks,
    Buildings,
    Traffic,
    Compile,
}

/// All generated highways.
#[derive(Resource, Clone, Debug, Default)]
pub struct HighwayNetwork {
    pub highways: Vec<HighwaySpline>,
}

impl HighwayNetwork {
    /// Samples of every highway, in generation order.
    pub fn points(&self) -> Vec<HighwayPoint> {
        self.highways
            .iter()
            .flat_map(|highway| highway.points().iter().copied())
            .collect()
    }
}

/// Static placeholders awaiting compilation. Cars are not included.
#[derive(Resource, Clone, Debug, Default)]
pub struct CityPlaceholders(pub Vec<ScenePlaceholder>);

pub fn build_highways(config: &CityGenConfig, rng: &mut impl Rng) -> HighwayNetwork {
    let bounds = config.bounds();
    HighwayNetwork {
        highways: config
            .highways
            .iter()
            .map(|spec| HighwaySpline::generate(bounds, *spec, rng))
            .collect(),
    }
}

/// Road surfaces, block contents and highway decks, in that order.
pub fn place_city(
    layout: &CityLayout,
    highways: &HighwayNetwork,
    rng: &mut impl Rng,
) -> Vec<ScenePlaceholder> {
    let mut placeholders = Vec::new();
    for element in &layout.elements {
        match element {
            CityElement::Road(road) => placeholders.push(road.surface_placeholder()),
            CityElement::Block(block) => {
                placeholders.extend(buildings::place(block, rng).placeholders);
            }
        }
    }
    for highway in &highways.highways {
        placeholders.extend(highway.deck_placeholders());
        placeholders.extend(highway.lamp_posts(rng));
    }
    placeholders
}

/// Everything one seed produces, before compilation.
#[derive(Clone, Debug)]
pub struct GeneratedCity {
    pub highways: HighwayNetwork,
    pub layout: CityLayout,
    pub placeholders: Vec<ScenePlaceholder>,
    pub cars: Vec<Car>,
}

/// Run the whole generation chain outside of an app.
///
/// Draws from `rng` in the same order as the startup systems.
pub fn generate_city(
    config: &CityGenConfig,
    traffic: &TrafficConfig,
    rng: &mut impl Rng,
) -> GeneratedCity {
    let highways = build_highways(config, rng);
    let layout = blocks::split(
        config.bounds(),
        config.initial_lanes,
        &highways.points(),
        rng,
    );
    let placeholders = place_city(&layout, &highways, rng);
    let cars = populate(layout.roads(), traffic, rng);
    GeneratedCity {
        highways,
        layout,
        placeholders,
        cars,
    }
}

fn generate_highways(
    config: Res<CityGenConfig>,
    mut rng: ResMut<CityRng>,
    mut network: ResMut<HighwayNetwork>,
) {
    *network = build_highways(&config, &mut rng.0);
    info!("Generated {} highways", network.highways.len());
}

fn split_blocks(
    config: Res<CityGenConfig>,
    network: Res<HighwayNetwork>,
    mut rng: ResMut<CityRng>,
    mut layout: ResMut<CityLayout>,
) {
    *layout = blocks::split(
        config.bounds(),
        config.initial_lanes,
        &network.points(),
        &mut rng.0,
    );
}

fn place_buildings(
    layout: Res<CityLayout>,
    network: Res<HighwayNetwork>,
    mut rng: ResMut<CityRng>,
    mut placeholders: ResMut<CityPlaceholders>,
) {
    placeholders.0 = place_city(&layout, &network, &mut rng.0);
    info!("Placed {} scene objects", placeholders.0.len());
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::render::placeholder::PlaceholderRole;

    #[test]
    fn generation_is_reproducible() {
        let config = CityGenConfig::default();
        let traffic = TrafficConfig::default();
        let a = generate_city(&config, &traffic, &mut StdRng::seed_from_u64(1));
        let b = generate_city(&config, &traffic, &mut StdRng::seed_from_u64(1));
        assert_eq!(a.placeholders, b.placeholders);
        assert_eq!(a.cars.len(), b.cars.len());
    }

    #[test]
    fn every_road_gets_a_surface() {
        let city = generate_city(
            &CityGenConfig::default(),
            &TrafficConfig::default(),
            &mut StdRng::seed_from_u64(2),
        );
        let surfaces = city
            .placeholders
            .iter()
            .filter(|p| p.role == PlaceholderRole::RoadSurface)
            .count();
        let grounds = city
            .placeholders
            .iter()
            .filter(|p| p.role == PlaceholderRole::Ground)
            .count();
        assert_eq!(surfaces, city.layout.road_count());
        assert_eq!(grounds, city.layout.block_count());
        assert_eq!(city.highways.highways.len(), 2);
    }
}
