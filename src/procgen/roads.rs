//! Straight road segments laid between city blocks.

use std::sync::Arc;

use bevy::prelude::*;

use super::constants::{LANE_WIDTH, ROAD_THICKNESS};
use super::geometry::{rect_area, to_world, yaw_towards};
use crate::render::placeholder::{PlaceholderRole, ScenePlaceholder};
use crate::render::shaders::ShaderKey;

/// Shared, read-only handle to a road. Blocks and cars hold these.
pub type RoadRef = Arc<RoadSegment>;

/// A straight road between two points.
///
/// Width is always derived from the lane count.
#[derive(Clone, Debug, PartialEq)]
pub struct RoadSegment {
    pub start: Vec2,
    pub end: Vec2,
    lanes: u32,
}

impl RoadSegment {
    pub fn new(start: Vec2, end: Vec2, lanes: u32) -> Self {
        Self { start, end, lanes }
    }

    pub fn lanes(&self) -> u32 {
        self.lanes
    }

    pub fn width(&self) -> f32 {
        self.lanes as f32 * LANE_WIDTH
    }

    pub fn length(&self) -> f32 {
        self.start.distance(self.end)
    }

    /// Unit direction from start to end.
    pub fn direction(&self) -> Vec2 {
        (self.end - self.start).normalize_or_zero()
    }

    /// Right-hand normal of the travel direction.
    pub fn normal(&self) -> Vec2 {
        let dir = self.direction();
        Vec2::new(dir.y, -dir.x)
    }

    pub fn center(&self) -> Vec2 {
        (self.start + self.end) * 0.5
    }

    /// Ground rectangle covered by the road. Roads are axis aligned.
    pub fn footprint(&self) -> Rect {
        let half_width = self.normal().abs() * (self.width() * 0.5);
        Rect::from_corners(self.start - half_width, self.end + half_width)
    }

    pub fn area(&self) -> f32 {
        rect_area(self.footprint())
    }

    /// Surface slab whose top sits at ground level.
    pub fn surface_placeholder(&self) -> ScenePlaceholder {
        ScenePlaceholder::cuboid(
            PlaceholderRole::RoadSurface,
            to_world(self.center(), -ROAD_THICKNESS * 0.5),
            Vec3::new(self.length(), ROAD_THICKNESS, self.width()),
        )
        .with_rotation(yaw_towards(self.direction()))
        .with_color(Color::srgb_u8(0x22, 0x22, 0x26).to_linear())
        .with_shader(ShaderKey::ROAD)
        .with_property("width", &[self.width()])
        .with_property("length", &[self.length()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_follows_lanes() {
        for lanes in [2, 4, 6, 8] {
            let road = RoadSegment::new(Vec2::ZERO, Vec2::new(0.0, 50.0), lanes);
            assert_eq!(road.width(), lanes as f32 * LANE_WIDTH);
        }
    }

    #[test]
    fn footprint_spans_length_and_width() {
        let road = RoadSegment::new(Vec2::new(10.0, 0.0), Vec2::new(10.0, 100.0), 4);
        let footprint = road.footprint();
        assert_eq!(footprint.min, Vec2::new(4.0, 0.0));
        assert_eq!(footprint.max, Vec2::new(16.0, 100.0));
        assert_eq!(road.area(), 1200.0);
    }

    #[test]
    fn surface_carries_road_attributes() {
        let road = RoadSegment::new(Vec2::ZERO, Vec2::new(80.0, 0.0), 6);
        let surface = road.surface_placeholder();
        assert_eq!(surface.material.shader, Some(ShaderKey::ROAD));
        assert_eq!(surface.material.property("width"), Some(&[18.0][..]));
        assert_eq!(surface.material.property("length"), Some(&[80.0][..]));
    }
}
