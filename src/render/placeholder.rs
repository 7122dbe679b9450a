//! Renderer-agnostic descriptions of generated objects.
//!
//! Generators emit [`ScenePlaceholder`]s; the scene compiler flattens them
//! into instance batches. A placeholder owns no GPU resources.

use bevy::prelude::*;
use smallvec::SmallVec;

use super::shaders::ShaderKey;

/// The closed set of primitive shapes a placeholder can reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GeometryKind {
    Box,
    Sphere,
    Cylinder,
    Plane,
}

impl GeometryKind {
    pub const ALL: [GeometryKind; 4] = [
        GeometryKind::Box,
        GeometryKind::Sphere,
        GeometryKind::Cylinder,
        GeometryKind::Plane,
    ];
}

/// What a placeholder stands for. Used for statistics and placement checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlaceholderRole {
    Ground,
    RoadSurface,
    HighwayDeck,
    Building,
    Tier,
    Spire,
    WarningLamp,
    LampPole,
    LampHead,
    LampLight,
    Pillar,
    CarBody,
    CarLight,
}

impl PlaceholderRole {
    /// Lamp posts, their lights and roof warning lamps.
    pub fn is_lamp(self) -> bool {
        matches!(
            self,
            PlaceholderRole::WarningLamp
                | PlaceholderRole::LampPole
                | PlaceholderRole::LampHead
                | PlaceholderRole::LampLight
        )
    }

    /// Instances whose transforms are rewritten every frame.
    pub fn is_live(self) -> bool {
        matches!(self, PlaceholderRole::CarBody | PlaceholderRole::CarLight)
    }
}

pub type PropertyValue = SmallVec<[f32; 4]>;

/// Material data carried by a placeholder.
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialDescriptor {
    pub base_color: LinearRgba,
    pub emissive: LinearRgba,
    /// Custom shader, if any. `None` batches under [`ShaderKey::DEFAULT`].
    pub shader: Option<ShaderKey>,
    /// Height of the roof above ground, for buildings and their tiers.
    pub roof_height: Option<f32>,
    properties: SmallVec<[(&'static str, PropertyValue); 2]>,
}

impl Default for MaterialDescriptor {
    fn default() -> Self {
        Self {
            base_color: LinearRgba::WHITE,
            emissive: LinearRgba::BLACK,
            shader: None,
            roof_height: None,
            properties: SmallVec::new(),
        }
    }
}

impl MaterialDescriptor {
    /// Set a named property, replacing any previous value.
    pub fn set_property(&mut self, name: &'static str, values: &[f32]) {
        let value = PropertyValue::from_slice(values);
        match self.properties.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value,
            None => self.properties.push((name, value)),
        }
    }

    pub fn property(&self, name: &str) -> Option<&[f32]> {
        self.properties
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_slice())
    }

    /// Resolve an attribute by its descriptor name.
    ///
    /// `color` and `emissive` read the colour fields; anything else is a
    /// named property.
    pub fn attribute(&self, name: &str) -> Option<PropertyValue> {
        match name {
            "color" => Some(rgb(self.base_color)),
            "emissive" => Some(rgb(self.emissive)),
            _ => self.property(name).map(PropertyValue::from_slice),
        }
    }

    /// Deterministic stand-in for a missing attribute: the base colour's
    /// components, zero-padded past alpha.
    pub fn fallback_attribute(&self, components: usize) -> PropertyValue {
        let rgba = self.base_color.to_f32_array();
        (0..components)
            .map(|i| rgba.get(i).copied().unwrap_or(0.0))
            .collect()
    }
}

fn rgb(color: LinearRgba) -> PropertyValue {
    PropertyValue::from_slice(&[color.red, color.green, color.blue])
}

/// Scale a colour's RGB channels, keeping alpha.
pub fn scale_rgb(color: LinearRgba, factor: f32) -> LinearRgba {
    LinearRgba::new(
        color.red * factor,
        color.green * factor,
        color.blue * factor,
        color.alpha,
    )
}

/// One generated object awaiting compilation.
#[derive(Clone, Debug, PartialEq)]
pub struct ScenePlaceholder {
    pub geometry: GeometryKind,
    pub transform: Transform,
    pub material: MaterialDescriptor,
    pub role: PlaceholderRole,
    /// Building slot (column, row) inside the owning block, if any.
    pub slot: Option<UVec2>,
}

impl ScenePlaceholder {
    pub fn new(geometry: GeometryKind, role: PlaceholderRole, transform: Transform) -> Self {
        Self {
            geometry,
            transform,
            material: MaterialDescriptor::default(),
            role,
            slot: None,
        }
    }

    pub fn cuboid(role: PlaceholderRole, translation: Vec3, scale: Vec3) -> Self {
        Self::new(
            GeometryKind::Box,
            role,
            Transform::from_translation(translation).with_scale(scale),
        )
    }

    pub fn sphere(role: PlaceholderRole, translation: Vec3, radius: f32) -> Self {
        Self::new(
            GeometryKind::Sphere,
            role,
            Transform::from_translation(translation).with_scale(Vec3::splat(radius)),
        )
    }

    pub fn cylinder(role: PlaceholderRole, translation: Vec3, scale: Vec3) -> Self {
        Self::new(
            GeometryKind::Cylinder,
            role,
            Transform::from_translation(translation).with_scale(scale),
        )
    }

    /// A point light rendered as a light volume in the `point_light` batch.
    pub fn point_light(
        role: PlaceholderRole,
        translation: Vec3,
        color: LinearRgba,
        intensity: f32,
        flicker: f32,
    ) -> Self {
        Self::sphere(role, translation, 1.0)
            .with_color(color)
            .with_shader(ShaderKey::POINT_LIGHT)
            .with_property("intensity", &[intensity])
            .with_property("flickerIntensity", &[flicker])
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.transform.rotation = rotation;
        self
    }

    pub fn with_color(mut self, color: LinearRgba) -> Self {
        self.material.base_color = color;
        self
    }

    pub fn with_emissive(mut self, emissive: LinearRgba) -> Self {
        self.material.emissive = emissive;
        self
    }

    pub fn with_shader(mut self, shader: ShaderKey) -> Self {
        self.material.shader = Some(shader);
        self
    }

    pub fn with_roof_height(mut self, height: f32) -> Self {
        self.material.roof_height = Some(height);
        self
    }

    pub fn with_property(mut self, name: &'static str, values: &[f32]) -> Self {
        self.material.set_property(name, values);
        self
    }

    pub fn with_slot(mut self, column: usize, row: usize) -> Self {
        self.slot = Some(UVec2::new(column as u32, row as u32));
        self
    }

    pub fn matrix(&self) -> Mat4 {
        self.transform.compute_matrix()
    }

    /// Axis-aligned ground footprint, ignoring rotation.
    pub fn footprint(&self) -> Rect {
        let center = Vec2::new(self.transform.translation.x, self.transform.translation.z);
        let size = Vec2::new(self.transform.scale.x, self.transform.scale.z);
        Rect::from_center_size(center, size)
    }
}
