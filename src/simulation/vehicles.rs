//! Cars shuttling back and forth along a single road.

use bevy::prelude::*;
use rand::Rng;

use crate::procgen::constants::LANE_WIDTH;
use crate::procgen::geometry::{to_world, yaw_towards};
use crate::procgen::roads::RoadRef;
use crate::render::placeholder::{PlaceholderRole, ScenePlaceholder};
use crate::render::shaders::ShaderKey;

/// Body centre height above the road.
pub const CAR_BODY_HEIGHT: f32 = 0.8;
/// Body extents: length along travel, height, width.
pub const CAR_BODY_SIZE: Vec3 = Vec3::new(4.7, 1.55, 2.0);
/// Distance of the head and tail lights from the body centre.
pub const CAR_LIGHT_OFFSET: f32 = 2.5;
pub const HEADLIGHT_INTENSITY: f32 = 15.0;
pub const TAILLIGHT_INTENSITY: f32 = 13.0;

const CAR_PALETTE: [(u8, u8, u8); 6] = [
    (0xff, 0xff, 0xff),
    (0xff, 0x11, 0x11),
    (0x11, 0x11, 0xff),
    (0x11, 0x11, 0x11),
    (0xaa, 0xaa, 0xaa),
    (0xcc, 0xcc, 0xcc),
];

fn tail_red() -> LinearRgba {
    Color::srgb_u8(0xff, 0x11, 0x11).to_linear()
}

/// A car bound to one road for its whole life.
#[derive(Component, Clone, Debug)]
pub struct Car {
    pub road: RoadRef,
    /// Distance travelled from the road's start.
    pub position: f32,
    /// Signed lane offset in lanes. Mirrored whenever the car turns around.
    pub lane: f32,
    /// +1 towards the road's end, −1 towards its start.
    pub direction: f32,
    pub speed: f32,
    pub color: LinearRgba,
}

impl Car {
    pub fn new(road: RoadRef, position: f32, lane: f32, speed: f32, color: LinearRgba) -> Self {
        Self {
            road,
            position,
            lane,
            direction: 1.0,
            speed,
            color,
        }
    }

    /// A car in lane `lane` (1-based) with a random speed and paint job.
    pub fn spawn(road: RoadRef, position: f32, lane: u32, rng: &mut impl Rng) -> Self {
        let speed = 1.0 + road.lanes() as f32 / 4.0 + rng.gen::<f32>();
        let (r, g, b) = CAR_PALETTE[rng.gen_range(0..CAR_PALETTE.len())];
        Self::new(
            road,
            position,
            lane as f32 - 0.5,
            speed,
            Color::srgb_u8(r, g, b).to_linear(),
        )
    }

    /// Advance by `dt` seconds, turning around at the end being approached.
    pub fn update(&mut self, dt: f32) {
        let length = self.road.length();
        self.position += self.direction * dt * self.speed;
        if self.direction > 0.0 && self.position >= length {
            self.position = length;
            self.direction = -1.0;
            self.lane = -self.lane;
        } else if self.direction < 0.0 && self.position <= 0.0 {
            self.position = 0.0;
            self.direction = 1.0;
            self.lane = -self.lane;
        }
    }

    /// Ground-plane position of the body centre.
    pub fn ground_position(&self) -> Vec2 {
        let dir = self.road.direction();
        let lane_offset = Vec2::new(dir.y, -dir.x) * (-self.lane * LANE_WIDTH);
        self.road.start + dir * self.position + lane_offset
    }

    pub fn world_position(&self) -> Vec3 {
        to_world(self.ground_position(), CAR_BODY_HEIGHT)
    }

    /// Unit heading in the ground plane.
    pub fn heading(&self) -> Vec2 {
        self.road.direction() * self.direction
    }

    pub fn body_placeholder(&self) -> ScenePlaceholder {
        ScenePlaceholder::cuboid(PlaceholderRole::CarBody, self.world_position(), CAR_BODY_SIZE)
            .with_rotation(yaw_towards(self.heading()))
            .with_color(self.color)
            .with_shader(ShaderKey::CAR)
    }

    /// Head and tail lights, in that order.
    pub fn light_placeholders(&self) -> [ScenePlaceholder; 2] {
        let body = self.world_position();
        let offset = to_world(self.heading() * CAR_LIGHT_OFFSET, 0.0);
        [
            ScenePlaceholder::point_light(
                PlaceholderRole::CarLight,
                body + offset,
                LinearRgba::WHITE,
                HEADLIGHT_INTENSITY,
                0.0,
            ),
            ScenePlaceholder::point_light(
                PlaceholderRole::CarLight,
                body - offset,
                tail_red(),
                TAILLIGHT_INTENSITY,
                0.0,
            ),
        ]
    }

    pub fn body_matrix(&self) -> Mat4 {
        self.body_placeholder().matrix()
    }

    pub fn light_matrices(&self) -> [Mat4; 2] {
        self.light_placeholders().map(|light| light.matrix())
    }
}
