//! Unit primitive shapes backing each [`GeometryKind`].
//!
//! Placeholders scale these through their transforms, so every shape here is
//! unit sized: a 1×1×1 cuboid, a radius-1 sphere, a cylinder of radius 1 and
//! height 1, and a plane facing +Y.

use std::collections::BTreeMap;

use bevy::prelude::*;

use super::placeholder::GeometryKind;
use crate::error::CityGenError;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PrimitiveShape {
    Cuboid(Cuboid),
    Sphere(Sphere),
    Cylinder(Cylinder),
    Plane(Plane3d),
}

impl PrimitiveShape {
    /// Tessellate the shape for a renderer that wants actual vertices.
    pub fn mesh(&self) -> Mesh {
        match *self {
            PrimitiveShape::Cuboid(shape) => Mesh::from(shape),
            PrimitiveShape::Sphere(shape) => Mesh::from(shape),
            PrimitiveShape::Cylinder(shape) => Mesh::from(shape),
            PrimitiveShape::Plane(shape) => Mesh::from(shape),
        }
    }
}

/// Geometry kinds the compiler is allowed to batch.
#[derive(Resource, Clone, Debug)]
pub struct PrimitiveRegistry {
    shapes: BTreeMap<GeometryKind, PrimitiveShape>,
}

impl Default for PrimitiveRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(GeometryKind::Box, PrimitiveShape::Cuboid(Cuboid::new(1.0, 1.0, 1.0)));
        registry.register(GeometryKind::Sphere, PrimitiveShape::Sphere(Sphere::new(1.0)));
        registry.register(GeometryKind::Cylinder, PrimitiveShape::Cylinder(Cylinder::new(1.0, 1.0)));
        registry.register(GeometryKind::Plane, PrimitiveShape::Plane(Plane3d::default()));
        registry
    }
}

impl PrimitiveRegistry {
    pub fn empty() -> Self {
        Self {
            shapes: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, kind: GeometryKind, shape: PrimitiveShape) {
        self.shapes.insert(kind, shape);
    }

    pub fn get(&self, kind: GeometryKind) -> Result<&PrimitiveShape, CityGenError> {
        self.shapes
            .get(&kind)
            .ok_or(CityGenError::UnregisteredGeometry(kind))
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_covers_every_kind() {
        let registry = PrimitiveRegistry::default();
        for kind in GeometryKind::ALL {
            assert!(registry.get(kind).is_ok(), "{kind:?} missing");
        }
        assert_eq!(registry.len(), GeometryKind::ALL.len());
    }

    #[test]
    fn missing_kind_is_structural() {
        let mut registry = PrimitiveRegistry::empty();
        registry.register(GeometryKind::Box, PrimitiveShape::Cuboid(Cuboid::default()));
        assert_eq!(
            registry.get(GeometryKind::Sphere),
            Err(CityGenError::UnregisteredGeometry(GeometryKind::Sphere))
        );
    }

    #[test]
    fn unit_cuboid_mesh_has_vertices() {
        let registry = PrimitiveRegistry::default();
        let mesh = registry.get(GeometryKind::Box).unwrap().mesh();
        assert!(mesh.count_vertices() > 0);
    }
}
