//! Lamp posts and warning lamps.
//!
//! Lamp posts are composites: a thin pole, an emissive head and a point
//! light at the head. Everything is expressed as placeholders so the
//! scene compiler can batch them with the rest of the city.

use bevy::prelude::*;
use rand::Rng;

use super::blocks::{CityBlock, Side};
use super::constants::LAMPPOST_INTERVAL;
use super::geometry::{to_world, within_highway_clearance};
use crate::render::placeholder::{scale_rgb, PlaceholderRole, ScenePlaceholder};
use crate::render::shaders::ShaderKey;

const POLE_HEIGHT: f32 = 5.0;
const POLE_RADIUS: f32 = 0.1;
const HEAD_RADIUS: f32 = 0.4;
const LAMP_EMISSIVE_SCALE: f32 = 15.0;
const LAMP_LIGHT_INTENSITY: f32 = 20.0;
const WARNING_LIGHT_INTENSITY: f32 = 10.0;
/// Sidewalk lamps stand this far in from the block edge.
const SIDEWALK_LAMP_INSET: f32 = 1.0;
const SIDEWALK_LAMP_SCALE: f32 = 0.5;

fn warm_white() -> LinearRgba {
    Color::srgb_u8(0xff, 0xcc, 0xaa).to_linear()
}

fn sodium() -> LinearRgba {
    Color::srgb_u8(0xff, 0xaa, 0x77).to_linear()
}

fn pole_grey() -> LinearRgba {
    Color::srgb_u8(0x55, 0x55, 0x55).to_linear()
}

/// A lamp post standing on `base`, uniformly scaled by `scale`.
///
/// Draws one value from `rng` to pick the bulb colour.
pub fn lamp_post(base: Vec3, scale: f32, rng: &mut impl Rng) -> [ScenePlaceholder; 3] {
    let color = if rng.gen::<f32>() > 0.5 {
        warm_white()
    } else {
        sodium()
    };
    let head = base + Vec3::Y * POLE_HEIGHT * scale;

    let pole = ScenePlaceholder::cylinder(
        PlaceholderRole::LampPole,
        base + Vec3::Y * POLE_HEIGHT * 0.5 * scale,
        Vec3::new(POLE_RADIUS, POLE_HEIGHT, POLE_RADIUS) * scale,
    )
    .with_color(pole_grey());

    let bulb = ScenePlaceholder::sphere(PlaceholderRole::LampHead, head, HEAD_RADIUS * scale)
        .with_color(color)
        .with_emissive(scale_rgb(color, LAMP_EMISSIVE_SCALE))
        .with_shader(ShaderKey::LAMP)
        .with_property("flickerIntensity", &[0.0]);

    let light = ScenePlaceholder::point_light(
        PlaceholderRole::LampLight,
        head,
        color,
        LAMP_LIGHT_INTENSITY * scale,
        0.0,
    );

    [pole, bulb, light]
}

/// A flickering red aircraft-warning lamp centred on `position`.
pub fn warning_lamp(position: Vec3, scale: f32) -> [ScenePlaceholder; 2] {
    let red = LinearRgba::rgb(1.0, 0.0, 0.0);
    let bulb = ScenePlaceholder::sphere(PlaceholderRole::WarningLamp, position, HEAD_RADIUS * scale)
        .with_color(red)
        .with_emissive(scale_rgb(red, LAMP_EMISSIVE_SCALE))
        .with_shader(ShaderKey::LAMP)
        .with_property("flickerIntensity", &[1.0]);
    let light = ScenePlaceholder::point_light(
        PlaceholderRole::WarningLamp,
        position,
        red,
        WARNING_LIGHT_INTENSITY * scale,
        1.0,
    );
    [bulb, light]
}

/// Evenly spaced points from `start` to `end`, both ends included.
///
/// The spacing is the largest that fits `interval` into the segment a whole
/// number of times. Segments shorter than one interval yield nothing.
pub fn spaced_points(start: Vec2, end: Vec2, interval: f32) -> Vec<Vec2> {
    let count = (start.distance(end) / interval).floor() as usize;
    if count == 0 {
        return Vec::new();
    }
    (0..=count)
        .map(|i| start.lerp(end, i as f32 / count as f32))
        .collect()
}

/// Half-scale lamp posts along every side of `block` that faces a road.
///
/// Sides run clockwise; a shared corner is emitted once, by the side that
/// starts there.
pub fn sidewalk_lamp_posts(block: &CityBlock, rng: &mut impl Rng) -> Vec<ScenePlaceholder> {
    let inner = block.bounds.inflate(-SIDEWALK_LAMP_INSET);
    if inner.is_empty() {
        return Vec::new();
    }
    let corners = [
        inner.min,
        Vec2::new(inner.max.x, inner.min.y),
        inner.max,
        Vec2::new(inner.min.x, inner.max.y),
    ];
    let sides = [Side::Top, Side::Right, Side::Bottom, Side::Left];

    let mut placeholders = Vec::new();
    for (index, side) in sides.iter().enumerate() {
        if block.road(*side).is_none() {
            continue;
        }
        let next_side = sides[(index + 1) % sides.len()];
        let mut points = spaced_points(
            corners[index],
            corners[(index + 1) % corners.len()],
            LAMPPOST_INTERVAL,
        );
        if block.road(next_side).is_some() {
            points.pop();
        }

        for point in points {
            let post = Rect::from_corners(point, point);
            if block
                .highway_points
                .iter()
                .any(|hp| within_highway_clearance(post, hp))
            {
                debug!("Sidewalk lamp at {:?} skipped under highway", point);
                continue;
            }
            placeholders.extend(lamp_post(to_world(point, 0.0), SIDEWALK_LAMP_SCALE, rng));
        }
    }
    placeholders
}
