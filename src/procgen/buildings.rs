//! Building placement inside leaf blocks.
//!
//! A block's interior (inside its sidewalks) is cut into a grid of building
//! slots. Slots along a road get a tower whose height grows with the traffic
//! it faces; slots under a highway are reserved. Corner towers may grow over
//! their neighbours, and any tower may receive a stacked upper section with
//! a spire and warning lamps. Empty slots get a lamp post instead.

use bevy::prelude::*;
use rand::Rng;

use super::blocks::{CityBlock, Side};
use super::constants::{BUILDING_SIZE, FLOOR_HEIGHT, GROUND_THICKNESS, HIGHWAY_WIDTH};
use super::geometry::{rectangle_sdf, to_world, within_highway_clearance};
use super::street_furniture::{lamp_post, sidewalk_lamp_posts, warning_lamp};
use crate::render::placeholder::{PlaceholderRole, ScenePlaceholder};
use crate::render::shaders::ShaderKey;

/// Per-lane chance that a corner tower merges with its neighbours.
const MERGE_CHANCE_PER_LANE: f32 = 0.01;
const TIER_CHANCE: f32 = 0.5;
const SPIRE_CHANCE: f32 = 0.5;
const SPIRE_MIN_FLOORS: f32 = 15.0;
const ROOF_LAMP_MIN_FLOORS: f32 = 10.0;
/// Roof lamps sit this fraction of the way out to the roof corners.
const ROOF_LAMP_INSET: f32 = 0.9;
const ROOF_LAMP_SCALE: f32 = 0.5;
const SPIRE_RADIUS: f32 = 0.5;
const PILLAR_RADIUS: f32 = 1.4;
/// Pillars keep this much extra distance from the sidewalk.
const PILLAR_MARGIN: f32 = 0.5;

fn concrete() -> LinearRgba {
    Color::srgb_u8(0xaa, 0xaa, 0xaa).to_linear()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildingSlot {
    Empty,
    /// Blocked by a highway or absorbed by a merged tower.
    Reserved,
    Occupied {
        merged: bool,
    },
}

/// Slot states of one block, indexed by (column, row).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotGrid {
    columns: usize,
    rows: usize,
    cells: Vec<BuildingSlot>,
}

impl SlotGrid {
    pub fn new(columns: usize, rows: usize) -> Self {
        Self {
            columns,
            rows,
            cells: vec![BuildingSlot::Empty; columns * rows],
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    fn index(&self, column: usize, row: usize) -> usize {
        column * self.rows + row
    }

    pub fn get(&self, column: usize, row: usize) -> BuildingSlot {
        self.cells[self.index(column, row)]
    }

    fn set(&mut self, column: usize, row: usize, slot: BuildingSlot) {
        let index = self.index(column, row);
        self.cells[index] = slot;
    }

    pub fn count(&self, predicate: impl Fn(BuildingSlot) -> bool) -> usize {
        self.cells.iter().filter(|slot| predicate(**slot)).count()
    }

    /// Every (column, row) pair, columns outermost.
    pub fn coordinates(&self) -> impl Iterator<Item = (usize, usize)> {
        let rows = self.rows;
        (0..self.columns).flat_map(move |i| (0..rows).map(move |j| (i, j)))
    }
}

/// Everything placed on one block.
#[derive(Clone, Debug)]
pub struct PlacedBlock {
    pub slots: SlotGrid,
    pub placeholders: Vec<ScenePlaceholder>,
}

impl PlacedBlock {
    pub fn count(&self, role: PlaceholderRole) -> usize {
        self.placeholders.iter().filter(|p| p.role == role).count()
    }
}

/// Slot geometry of a block interior.
struct SlotLayout {
    origin: Vec2,
    size: Vec2,
}

impl SlotLayout {
    fn rect(&self, column: usize, row: usize) -> Rect {
        let min = self.origin + self.size * Vec2::new(column as f32, row as f32);
        Rect::from_corners(min, min + self.size)
    }
}

/// Place buildings, lamps, pillars and the ground plate on `block`.
pub fn place(block: &CityBlock, rng: &mut impl Rng) -> PlacedBlock {
    let mut placeholders = vec![ground_plate(block)];

    let sidewalk = block.sidewalk_width();
    let inner = block.bounds.inflate(-sidewalk);
    let inner_size = inner.size().max(Vec2::ZERO);
    let columns = (inner_size.x / BUILDING_SIZE).floor() as usize;
    let rows = (inner_size.y / BUILDING_SIZE).floor() as usize;

    let slots = if columns == 0 || rows == 0 {
        warn!(
            "Block at {:?} is too small for buildings ({:.1}x{:.1} inside sidewalks)",
            block.bounds.min, inner_size.x, inner_size.y
        );
        SlotGrid::new(0, 0)
    } else {
        let layout = SlotLayout {
            origin: inner.min,
            size: inner_size / Vec2::new(columns as f32, rows as f32),
        };
        let mut placer = Placer {
            block,
            layout,
            grid: SlotGrid::new(columns, rows),
            towers: vec![None; columns * rows],
            extras: Vec::new(),
        };
        let max_road_lanes = placer.place_towers(rng);
        placer.merge_corners(max_road_lanes, rng);
        placer.add_tiers(rng);
        placer.fill_empty(rng);
        placeholders.extend(placer.towers.into_iter().flatten());
        placeholders.extend(placer.extras);
        placer.grid
    };

    placeholders.extend(pillars(block, sidewalk));
    placeholders.extend(sidewalk_lamp_posts(block, rng));

    PlacedBlock {
        slots,
        placeholders,
    }
}

struct Placer<'a> {
    block: &'a CityBlock,
    layout: SlotLayout,
    grid: SlotGrid,
    /// Base tower per slot, parallel to the grid cells.
    towers: Vec<Option<ScenePlaceholder>>,
    /// Tiers, spires, roof lamps and fallback lamp posts.
    extras: Vec<ScenePlaceholder>,
}

impl Placer<'_> {
    fn road_lanes(&self, column: usize, row: usize) -> u32 {
        let mut lanes = 0;
        if column == 0 {
            lanes += self.block.road_lanes(Side::Left);
        }
        if column + 1 == self.grid.columns() {
            lanes += self.block.road_lanes(Side::Right);
        }
        if row == 0 {
            lanes += self.block.road_lanes(Side::Top);
        }
        if row + 1 == self.grid.rows() {
            lanes += self.block.road_lanes(Side::Bottom);
        }
        lanes
    }

    /// Base towers along the block edge. Returns the largest road lane sum.
    fn place_towers(&mut self, rng: &mut impl Rng) -> u32 {
        let mut max_road_lanes = 0;
        for (i, j) in self.grid.coordinates() {
            let road_lanes = self.road_lanes(i, j);
            max_road_lanes = max_road_lanes.max(road_lanes);

            let rect = self.layout.rect(i, j);
            if self
                .block
                .highway_points
                .iter()
                .any(|point| within_highway_clearance(rect, point))
            {
                self.grid.set(i, j, BuildingSlot::Reserved);
                continue;
            }
            if road_lanes == 0 {
                continue;
            }

            let shade = 0.3 + 0.6 * rng.gen::<f32>();
            let floors = 3.0 + (2.0 * road_lanes as f32 * rng.gen::<f32>()).round();
            let height = 1.0 + FLOOR_HEIGHT * floors;
            let tower = ScenePlaceholder::cuboid(
                PlaceholderRole::Building,
                to_world(rect.center(), height * 0.5),
                Vec3::new(rect.width(), height, rect.height()),
            )
            .with_color(LinearRgba::rgb(shade, shade, shade))
            .with_shader(ShaderKey::BUILDING)
            .with_roof_height(height)
            .with_slot(i, j);

            let index = self.grid.index(i, j);
            self.towers[index] = Some(tower);
            self.grid.set(i, j, BuildingSlot::Occupied { merged: false });
        }
        max_road_lanes
    }

    fn absorbable(&self, column: usize, row: usize) -> bool {
        matches!(
            self.grid.get(column, row),
            BuildingSlot::Empty | BuildingSlot::Occupied { merged: false }
        )
    }

    /// Grow corner towers over their neighbours into a 2x2, 2x1 or 1x2 footprint.
    fn merge_corners(&mut self, max_road_lanes: u32, rng: &mut impl Rng) {
        let last_column = self.grid.columns() - 1;
        let last_row = self.grid.rows() - 1;
        let mut corners = vec![
            (0, 0),
            (0, last_row),
            (last_column, 0),
            (last_column, last_row),
        ];
        corners.sort_unstable();
        corners.dedup();

        for (i, j) in corners {
            if self.grid.get(i, j) != (BuildingSlot::Occupied { merged: false }) {
                continue;
            }
            if rng.gen::<f32>() > max_road_lanes as f32 * MERGE_CHANCE_PER_LANE {
                continue;
            }

            let ni = if i == 0 { 1 } else { i - 1 };
            let nj = if j == 0 { 1 } else { j - 1 };
            let x = (ni < self.grid.columns() && self.absorbable(ni, j)).then_some(ni);
            let mut y = (nj < self.grid.rows() && self.absorbable(i, nj)).then_some(nj);
            if let (Some(ni), Some(nj)) = (x, y) {
                if !self.absorbable(ni, nj) {
                    y = None;
                }
            }

            let mut absorbed = Vec::new();
            if let Some(ni) = x {
                absorbed.push((ni, j));
            }
            if let Some(nj) = y {
                absorbed.push((i, nj));
                if let Some(ni) = x {
                    absorbed.push((ni, nj));
                }
            }
            if absorbed.is_empty() {
                continue;
            }

            let footprint = absorbed
                .iter()
                .fold(self.layout.rect(i, j), |acc, (ai, aj)| {
                    acc.union(self.layout.rect(*ai, *aj))
                });
            for (ai, aj) in absorbed {
                self.grid.set(ai, aj, BuildingSlot::Reserved);
                let index = self.grid.index(ai, aj);
                self.towers[index] = None;
            }

            let index = self.grid.index(i, j);
            if let Some(tower) = self.towers[index].as_mut() {
                let center = footprint.center();
                tower.transform.translation.x = center.x;
                tower.transform.translation.z = center.y;
                tower.transform.scale.x = footprint.width();
                tower.transform.scale.z = footprint.height();
            }
            self.grid.set(i, j, BuildingSlot::Occupied { merged: true });
        }
    }

    /// Stacked upper sections, spires and roof warning lamps.
    fn add_tiers(&mut self, rng: &mut impl Rng) {
        for (i, j) in self.grid.coordinates() {
            if self.grid.get(i, j) != (BuildingSlot::Occupied { merged: false }) {
                continue;
            }
            let Some(base) = self.towers[self.grid.index(i, j)].clone() else {
                continue;
            };
            if rng.gen::<f32>() > TIER_CHANCE {
                continue;
            }

            let base_height = base.transform.scale.y;
            let base_top = base.transform.translation.y + base_height * 0.5;
            let upper_height = base_height * 0.5;
            let roof = base.material.roof_height.unwrap_or(base_height) + upper_height;
            let width = base.transform.scale.x * (0.5 + 0.5 * rng.gen::<f32>());
            let depth = base.transform.scale.z * (0.5 + 0.5 * rng.gen::<f32>());
            let center = base.transform.translation.with_y(base_top + upper_height * 0.5);

            let upper = ScenePlaceholder::cuboid(
                PlaceholderRole::Tier,
                center,
                Vec3::new(width, upper_height, depth),
            )
            .with_color(base.material.base_color)
            .with_shader(ShaderKey::BUILDING)
            .with_roof_height(roof)
            .with_slot(i, j);
            self.extras.push(upper);

            let upper_top = center.y + upper_height * 0.5;
            if rng.gen::<f32>() > SPIRE_CHANCE && roof > SPIRE_MIN_FLOORS * FLOOR_HEIGHT {
                let spire_height = upper_height * 0.5;
                let spire = ScenePlaceholder::cylinder(
                    PlaceholderRole::Spire,
                    center.with_y(upper_top + spire_height * 0.5),
                    Vec3::new(SPIRE_RADIUS, spire_height, SPIRE_RADIUS),
                )
                .with_color(concrete())
                .with_slot(i, j);
                self.extras.push(spire);
                self.extras
                    .extend(warning_lamp(center.with_y(upper_top + spire_height), 1.0));
            }

            if roof > ROOF_LAMP_MIN_FLOORS * FLOOR_HEIGHT {
                let half = Vec2::new(width, depth) * ROOF_LAMP_INSET * 0.5;
                for (sx, sz) in [(-1.0, 1.0), (-1.0, -1.0), (1.0, 1.0), (1.0, -1.0)] {
                    let corner = Vec3::new(center.x + sx * half.x, upper_top, center.z + sz * half.y);
                    self.extras.extend(warning_lamp(corner, ROOF_LAMP_SCALE));
                }
            }
        }
    }

    /// Lamp posts on slots nothing else claimed.
    fn fill_empty(&mut self, rng: &mut impl Rng) {
        for (i, j) in self.grid.coordinates() {
            if self.grid.get(i, j) != BuildingSlot::Empty {
                continue;
            }
            let base = to_world(self.layout.rect(i, j).center(), 0.0);
            self.extras
                .extend(lamp_post(base, 1.0, rng).map(|part| part.with_slot(i, j)));
        }
    }
}

/// Block-sized plate drawn with the grid shader.
fn ground_plate(block: &CityBlock) -> ScenePlaceholder {
    let size = block.bounds.size();
    ScenePlaceholder::cuboid(
        PlaceholderRole::Ground,
        to_world(block.bounds.center(), 0.0),
        Vec3::new(size.x, GROUND_THICKNESS, size.y),
    )
    .with_color(Color::srgb_u8(0x18, 0x18, 0x1c).to_linear())
    .with_shader(ShaderKey::GRID)
}

/// Support pillars for highway samples well inside the block.
///
/// A pillar is dropped when a lower highway passes within `HIGHWAY_WIDTH`,
/// so upper pillars never pierce a lower deck.
fn pillars(block: &CityBlock, sidewalk: f32) -> Vec<ScenePlaceholder> {
    let points = &block.highway_points;
    points
        .iter()
        .filter(|point| rectangle_sdf(block.bounds, point.position) < -PILLAR_MARGIN - sidewalk)
        .filter_map(|point| {
            let blocked = points.iter().any(|other| {
                other.bridge_height < point.bridge_height
                    && other.position.distance(point.position) < HIGHWAY_WIDTH
            });
            if blocked {
                debug!(
                    "Pillar at {:?} skipped above a lower highway",
                    point.position
                );
                return None;
            }
            Some(
                ScenePlaceholder::cylinder(
                    PlaceholderRole::Pillar,
                    to_world(point.position, point.bridge_height * 0.5),
                    Vec3::new(PILLAR_RADIUS, point.bridge_height, PILLAR_RADIUS),
                )
                .with_color(concrete()),
            )
        })
        .collect()
}
