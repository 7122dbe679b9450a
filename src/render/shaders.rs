//! Shader keys and the per-instance attributes each one declares.
//!
//! The renderer resolves a key to an actual program. Here a key only decides
//! batching and which attribute buffers a batch carries.

use std::collections::HashMap;
use std::fmt;

use bevy::prelude::*;

use crate::error::CityGenError;

/// Name of a shader program known to the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderKey(&'static str);

impl ShaderKey {
    pub const DEFAULT: Self = Self("default");
    pub const BUILDING: Self = Self("building");
    pub const ROAD: Self = Self("road");
    pub const GRID: Self = Self("grid");
    pub const HIGHWAY: Self = Self("highway");
    pub const LAMP: Self = Self("lamp");
    pub const POINT_LIGHT: Self = Self("point_light");
    pub const CAR: Self = Self("car");

    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ShaderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// One per-instance attribute: a name looked up on the material and its width.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AttributeDescriptor {
    pub name: &'static str,
    pub components: usize,
}

impl AttributeDescriptor {
    pub const fn new(name: &'static str, components: usize) -> Self {
        Self { name, components }
    }
}

/// Layout used by shaders that declare no attributes of their own.
pub const GENERIC_ATTRIBUTES: [AttributeDescriptor; 2] = [
    AttributeDescriptor::new("color", 3),
    AttributeDescriptor::new("emissive", 3),
];

const BUILTIN_LAYOUTS: &[(ShaderKey, &[AttributeDescriptor])] = &[
    (ShaderKey::DEFAULT, &[]),
    (ShaderKey::BUILDING, &[AttributeDescriptor::new("color", 3)]),
    (
        ShaderKey::ROAD,
        &[
            AttributeDescriptor::new("width", 1),
            AttributeDescriptor::new("length", 1),
        ],
    ),
    (
        ShaderKey::GRID,
        &[
            AttributeDescriptor::new("color", 3),
            AttributeDescriptor::new("emissive", 3),
        ],
    ),
    (ShaderKey::HIGHWAY, &[]),
    (
        ShaderKey::LAMP,
        &[
            AttributeDescriptor::new("color", 3),
            AttributeDescriptor::new("emissive", 3),
            AttributeDescriptor::new("flickerIntensity", 1),
        ],
    ),
    (
        ShaderKey::POINT_LIGHT,
        &[
            AttributeDescriptor::new("color", 3),
            AttributeDescriptor::new("intensity", 1),
            AttributeDescriptor::new("flickerIntensity", 1),
        ],
    ),
    (ShaderKey::CAR, &[AttributeDescriptor::new("color", 3)]),
];

/// Attribute layouts keyed by shader.
#[derive(Resource, Clone, Debug)]
pub struct ShaderRegistry {
    layouts: HashMap<ShaderKey, Vec<AttributeDescriptor>>,
}

impl Default for ShaderRegistry {
    fn default() -> Self {
        let layouts = BUILTIN_LAYOUTS
            .iter()
            .map(|(key, attributes)| (*key, attributes.to_vec()))
            .collect();
        Self { layouts }
    }
}

impl ShaderRegistry {
    /// A registry with no shaders at all, not even the default one.
    pub fn empty() -> Self {
        Self {
            layouts: HashMap::new(),
        }
    }

    /// Register (or replace) a shader's attribute layout.
    pub fn register(
        &mut self,
        key: ShaderKey,
        attributes: &[AttributeDescriptor],
    ) -> Result<(), CityGenError> {
        for (index, attribute) in attributes.iter().enumerate() {
            if !(1..=4).contains(&attribute.components) {
                return Err(CityGenError::InvalidAttribute {
                    shader: key,
                    name: attribute.name,
                    components: attribute.components,
                });
            }
            if attributes[..index].iter().any(|a| a.name == attribute.name) {
                return Err(CityGenError::DuplicateAttribute {
                    shader: key,
                    name: attribute.name,
                });
            }
        }
        self.layouts.insert(key, attributes.to_vec());
        Ok(())
    }

    pub fn contains(&self, key: ShaderKey) -> bool {
        self.layouts.contains_key(&key)
    }

    /// Attribute layout for a batch using `key`.
    ///
    /// Shaders registered without attributes fall back to [`GENERIC_ATTRIBUTES`].
    pub fn layout(&self, key: ShaderKey) -> Result<&[AttributeDescriptor], CityGenError> {
        match self.layouts.get(&key) {
            None => Err(CityGenError::UnregisteredShader(key)),
            Some(attributes) if attributes.is_empty() => Ok(GENERIC_ATTRIBUTES.as_slice()),
            Some(attributes) => Ok(attributes.as_slice()),
        }
    }
}
