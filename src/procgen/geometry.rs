//! Rectangle and orientation helpers shared by splitting and placement.

use bevy::prelude::*;

use super::highway::HighwayPoint;

/// Chebyshev-style signed distance from `point` to `rect`.
///
/// Negative inside the rectangle, zero on its border, positive outside.
pub fn rectangle_sdf(rect: Rect, point: Vec2) -> f32 {
    let dx = (rect.min.x - point.x).max(point.x - rect.max.x);
    let dy = (rect.min.y - point.y).max(point.y - rect.max.y);
    dx.max(dy)
}

/// Whether a highway sample claims space around `rect`.
///
/// This single predicate decides which highway points a block keeps, which
/// building slots are excluded and which sidewalk lamps are dropped. The
/// boundary is exclusive: a point exactly `clearance` away leaves the
/// rectangle buildable.
pub fn within_highway_clearance(rect: Rect, point: &HighwayPoint) -> bool {
    rectangle_sdf(rect, point.position) < point.clearance
}

pub fn rect_area(rect: Rect) -> f32 {
    let size = rect.size();
    size.x * size.y
}

/// Overlap test that ignores contact along shared edges.
pub fn rects_overlap(a: Rect, b: Rect, epsilon: f32) -> bool {
    a.min.x < b.max.x - epsilon
        && b.min.x < a.max.x - epsilon
        && a.min.y < b.max.y - epsilon
        && b.min.y < a.max.y - epsilon
}

/// Rotation about +Y that points local +X along a ground-plane direction.
///
/// Ground-plane `y` maps to world `z`.
pub fn yaw_towards(direction: Vec2) -> Quat {
    if direction.length_squared() <= f32::EPSILON {
        return Quat::IDENTITY;
    }
    Quat::from_rotation_y((-direction.y).atan2(direction.x))
}

/// Lift a ground-plane point to world space at `height`.
pub fn to_world(point: Vec2, height: f32) -> Vec3 {
    Vec3::new(point.x, height, point.y)
}

/// Signed angle that rotates `from` onto `to`, in `(-π, π]`.
pub fn signed_angle(from: Vec2, to: Vec2) -> f32 {
    from.perp_dot(to).atan2(from.dot(to))
}
