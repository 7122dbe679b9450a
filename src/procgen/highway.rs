//! Elevated highways routed by a bounded random walk.
//!
//! The walk starts on the world edge a highway enters from and steps
//! `HIGHWAY_STEP` units at a time, wobbling its heading while staying
//! inside a 45° cone around the highway's general direction. The visited
//! points are fitted with a Catmull-Rom curve, which is then sampled into
//! [`HighwayPoint`]s for block filtering and building exclusion.

use std::f32::consts::{FRAC_PI_4, PI};

use bevy::prelude::*;
use rand::Rng;

use super::constants::{
    HIGHWAY_DECK_WIDTH, HIGHWAY_LAMP_INTERVAL, HIGHWAY_SAMPLES, HIGHWAY_STEP, HIGHWAY_THICKNESS,
    HIGHWAY_WIDTH,
};
use super::geometry::{signed_angle, to_world, yaw_towards};
use super::street_furniture::lamp_post;
use crate::render::placeholder::{PlaceholderRole, ScenePlaceholder};
use crate::render::shaders::ShaderKey;

/// Largest heading change applied after a single step.
const MAX_TURN: f32 = 1.5 * PI / 2.0 * 0.5;
/// Walks shorter than this fraction of the straight crossing are reported.
const EXHAUSTION_RATIO: f32 = 0.5;
/// Samples per control segment when measuring arc length.
const ARC_SAMPLES_PER_SEGMENT: usize = 32;
/// Subdivisions used to measure the arc between two neighbouring samples.
const ARC_SAMPLES_PER_GAP: usize = 16;

/// How one highway crosses the world.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HighwaySpec {
    /// General heading of the highway. Need not be normalized.
    pub direction: Vec2,
    /// Deck height above the ground.
    pub bridge_height: f32,
    /// Perpendicular offset of the entry point from the world's centre line.
    pub lateral_offset: f32,
}

impl HighwaySpec {
    pub fn new(direction: Vec2, bridge_height: f32, lateral_offset: f32) -> Self {
        Self {
            direction,
            bridge_height,
            lateral_offset,
        }
    }
}

/// A sampled highway position tagged with its deck height.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HighwayPoint {
    pub position: Vec2,
    pub bridge_height: f32,
    /// Radius around `position` that must stay free of ground structures.
    ///
    /// Covers the deck half-width plus half the arc to the neighbouring
    /// samples, so every point of the deck lies within the clearance of
    /// some sample.
    pub clearance: f32,
}

impl HighwayPoint {
    /// A point claiming the bare `HIGHWAY_WIDTH` around itself.
    pub fn new(position: Vec2, bridge_height: f32) -> Self {
        Self {
            position,
            bridge_height,
            clearance: HIGHWAY_WIDTH,
        }
    }

    pub fn with_clearance(mut self, clearance: f32) -> Self {
        self.clearance = clearance;
        self
    }
}

/// Uniform Catmull-Rom curve through a list of control points.
///
/// The curve passes through every control point. Missing neighbours at the
/// ends are extrapolated linearly.
#[derive(Clone, Debug, PartialEq)]
pub struct CatmullRom {
    points: Vec<Vec2>,
}

impl CatmullRom {
    pub fn new(points: Vec<Vec2>) -> Self {
        Self { points }
    }

    pub fn control_points(&self) -> &[Vec2] {
        &self.points
    }

    fn segments(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    /// Control points around segment `index`.
    fn window(&self, index: usize) -> [Vec2; 4] {
        let p1 = self.points[index];
        let p2 = self.points[index + 1];
        let p0 = if index == 0 {
            2.0 * p1 - p2
        } else {
            self.points[index - 1]
        };
        let p3 = self
            .points
            .get(index + 2)
            .copied()
            .unwrap_or(2.0 * p2 - p1);
        [p0, p1, p2, p3]
    }

    /// Segment index and local parameter for a global `t`.
    fn locate(&self, t: f32) -> (usize, f32) {
        let segments = self.segments();
        let scaled = t.clamp(0.0, 1.0) * segments as f32;
        let index = (scaled.floor() as usize).min(segments - 1);
        (index, scaled - index as f32)
    }

    /// Position at `t` in `[0, 1]`.
    pub fn point(&self, t: f32) -> Vec2 {
        match self.points.len() {
            0 => Vec2::ZERO,
            1 => self.points[0],
            _ => {
                let (index, u) = self.locate(t);
                let [p0, p1, p2, p3] = self.window(index);
                0.5 * (2.0 * p1
                    + (p2 - p0) * u
                    + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * u * u
                    + (3.0 * p1 - p0 - 3.0 * p2 + p3) * u * u * u)
            }
        }
    }

    /// Derivative with respect to `t`. Zero for degenerate curves.
    pub fn tangent(&self, t: f32) -> Vec2 {
        if self.points.len() < 2 {
            return Vec2::ZERO;
        }
        let (index, u) = self.locate(t);
        let [p0, p1, p2, p3] = self.window(index);
        let local = 0.5
            * ((p2 - p0)
                + 2.0 * (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * u
                + 3.0 * (3.0 * p1 - p0 - 3.0 * p2 + p3) * u * u);
        local * self.segments() as f32
    }

    /// `count` points at uniform parameter spacing, ends included.
    pub fn sample(&self, count: usize) -> Vec<Vec2> {
        match count {
            0 => Vec::new(),
            1 => vec![self.point(0.0)],
            _ => (0..count)
                .map(|i| self.point(i as f32 / (count - 1) as f32))
                .collect(),
        }
    }

    /// Dense polyline used for arc-length queries.
    fn polyline(&self) -> Vec<Vec2> {
        self.sample(self.segments().max(1) * ARC_SAMPLES_PER_SEGMENT + 1)
    }

    /// Arc length between parameters `from` and `to`.
    pub fn arc_length(&self, from: f32, to: f32) -> f32 {
        let points: Vec<Vec2> = (0..=ARC_SAMPLES_PER_GAP)
            .map(|i| self.point(from + (to - from) * i as f32 / ARC_SAMPLES_PER_GAP as f32))
            .collect();
        polyline_length(&points)
    }

    pub fn length(&self) -> f32 {
        polyline_length(&self.polyline())
    }

    /// Points spaced evenly by arc length, `divisions + 1` in total.
    pub fn spaced_points(&self, divisions: usize) -> Vec<Vec2> {
        let polyline = self.polyline();
        let total = polyline_length(&polyline);
        if divisions == 0 || total <= f32::EPSILON {
            return polyline.first().copied().into_iter().collect();
        }

        let step = total / divisions as f32;
        let mut result = Vec::with_capacity(divisions + 1);
        result.push(polyline[0]);
        let mut target = step;
        let mut travelled = 0.0;
        for pair in polyline.windows(2) {
            let span = pair[0].distance(pair[1]);
            while result.len() <= divisions && travelled + span >= target {
                let along = if span > 0.0 { (target - travelled) / span } else { 0.0 };
                result.push(pair[0].lerp(pair[1], along));
                target += step;
            }
            travelled += span;
        }
        // Float drift can leave the final point unplaced.
        if result.len() <= divisions {
            if let Some(last) = polyline.last() {
                result.push(*last);
            }
        }
        result
    }
}

fn polyline_length(points: &[Vec2]) -> f32 {
    points.windows(2).map(|pair| pair[0].distance(pair[1])).sum()
}

/// Longest arc between two neighbouring samples of `count` uniform samples.
fn sample_gap(curve: &CatmullRom, count: usize) -> f32 {
    if count < 2 {
        return 0.0;
    }
    let step = 1.0 / (count - 1) as f32;
    (1..count)
        .map(|i| curve.arc_length((i - 1) as f32 * step, i as f32 * step))
        .fold(0.0, f32::max)
}

/// Distance from `origin` along unit `direction` until it leaves `bounds`.
fn exit_distance(bounds: Rect, origin: Vec2, direction: Vec2) -> f32 {
    let axis = |o: f32, d: f32, min: f32, max: f32| {
        if d > f32::EPSILON {
            (max - o) / d
        } else if d < -f32::EPSILON {
            (min - o) / d
        } else {
            f32::INFINITY
        }
    };
    axis(origin.x, direction.x, bounds.min.x, bounds.max.x)
        .min(axis(origin.y, direction.y, bounds.min.y, bounds.max.y))
        .max(0.0)
}

/// A generated highway. Immutable once built.
#[derive(Clone, Debug)]
pub struct HighwaySpline {
    pub spec: HighwaySpec,
    curve: CatmullRom,
    points: Vec<HighwayPoint>,
    path_length: f32,
    crossing_length: f32,
}

impl HighwaySpline {
    /// Route a highway across `world` with a random walk.
    pub fn generate(world: Rect, spec: HighwaySpec, rng: &mut impl Rng) -> Self {
        let direction = match spec.direction.try_normalize() {
            Some(direction) => direction,
            None => {
                warn!("Highway direction {:?} is degenerate, using +X", spec.direction);
                Vec2::X
            }
        };
        let across = direction.perp();
        let origin = (world.center() + across * spec.lateral_offset).clamp(world.min, world.max);
        let start = origin - direction * exit_distance(world, origin, -direction);
        let crossing_length = exit_distance(world, start, direction);

        // Every step advances at least HIGHWAY_STEP·cos(45°) along `direction`.
        let max_steps = (crossing_length / (HIGHWAY_STEP * FRAC_PI_4.cos())).ceil() as usize + 2;

        let mut control = vec![start];
        let mut cursor = start;
        let mut heading = direction;
        for _ in 0..max_steps {
            let next = cursor + heading * HIGHWAY_STEP;
            if !world.contains(next) {
                let exit = cursor + heading * exit_distance(world, cursor, heading);
                if exit.distance(cursor) > f32::EPSILON {
                    control.push(exit);
                }
                break;
            }
            control.push(next);
            cursor = next;

            let turn = MAX_TURN * (rng.gen::<f32>() * 2.0 - 1.0);
            let mut angle = signed_angle(direction, heading) + turn;
            if angle.abs() > FRAC_PI_4 {
                angle -= 2.0 * turn;
            }
            angle = angle.clamp(-FRAC_PI_4, FRAC_PI_4);
            heading = Vec2::from_angle(angle).rotate(direction);
        }

        let path_length = polyline_length(&control);
        if path_length < crossing_length * EXHAUSTION_RATIO {
            warn!(
                "Highway towards {:?} only covers {:.0} of {:.0} units, keeping the short path",
                direction, path_length, crossing_length
            );
        }

        let curve = CatmullRom::new(control);
        let clearance = HIGHWAY_DECK_WIDTH * 0.5 + sample_gap(&curve, HIGHWAY_SAMPLES) * 0.5;
        let points = curve
            .sample(HIGHWAY_SAMPLES)
            .into_iter()
            .map(|position| {
                HighwayPoint::new(position, spec.bridge_height).with_clearance(clearance)
            })
            .collect();

        Self {
            spec,
            curve,
            points,
            path_length,
            crossing_length,
        }
    }

    pub fn points(&self) -> &[HighwayPoint] {
        &self.points
    }

    pub fn curve(&self) -> &CatmullRom {
        &self.curve
    }

    /// Length of the control polyline walked by the generator.
    pub fn path_length(&self) -> f32 {
        self.path_length
    }

    /// Straight-line distance across the world from the entry point.
    pub fn crossing_length(&self) -> f32 {
        self.crossing_length
    }

    pub fn bridge_height(&self) -> f32 {
        self.spec.bridge_height
    }

    /// Deck sections between consecutive samples, topped at bridge height.
    pub fn deck_placeholders(&self) -> Vec<ScenePlaceholder> {
        let color = Color::srgb_u8(0x55, 0x55, 0x5a).to_linear();
        let y = self.spec.bridge_height - HIGHWAY_THICKNESS * 0.5;
        self.points
            .windows(2)
            .filter_map(|pair| {
                let (a, b) = (pair[0].position, pair[1].position);
                let length = a.distance(b);
                if length <= f32::EPSILON {
                    return None;
                }
                Some(
                    ScenePlaceholder::cuboid(
                        PlaceholderRole::HighwayDeck,
                        to_world((a + b) * 0.5, y),
                        Vec3::new(length, HIGHWAY_THICKNESS, HIGHWAY_DECK_WIDTH),
                    )
                    .with_rotation(yaw_towards(b - a))
                    .with_color(color)
                    .with_shader(ShaderKey::HIGHWAY),
                )
            })
            .collect()
    }

    /// Lamp posts every `HIGHWAY_LAMP_INTERVAL` along the deck centre line.
    pub fn lamp_posts(&self, rng: &mut impl Rng) -> Vec<ScenePlaceholder> {
        let divisions = (self.curve.length() / HIGHWAY_LAMP_INTERVAL).floor() as usize;
        self.curve
            .spaced_points(divisions)
            .into_iter()
            .flat_map(|point| lamp_post(to_world(point, self.spec.bridge_height), 1.0, rng))
            .collect()
    }
}
