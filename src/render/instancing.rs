//! Flattening of scene placeholders into per-shader instance batches.
//!
//! Every placeholder lands in exactly one [`InstanceBatch`], keyed by its
//! geometry kind and shader. Batches are kept in [`BatchKey`] order and
//! instances stay in submission order, so compiling the same input twice
//! produces identical buffers.
//!
//! Car instances are pushed last. Each batch records where its live range
//! starts so the per-frame re-bake only touches those transforms.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};
use std::ops::Range;

use bevy::prelude::*;
use bytemuck::{Pod, Zeroable};

use super::placeholder::{GeometryKind, ScenePlaceholder};
use super::primitives::PrimitiveRegistry;
use super::shaders::{AttributeDescriptor, ShaderKey, ShaderRegistry};
use crate::error::CityGenError;
use crate::simulation::vehicles::Car;

/// Batch grouping key. Placeholders without a shader use [`ShaderKey::DEFAULT`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchKey {
    pub geometry: GeometryKind,
    pub shader: ShaderKey,
}

impl BatchKey {
    pub fn of(placeholder: &ScenePlaceholder) -> Self {
        Self {
            geometry: placeholder.geometry,
            shader: placeholder.material.shader.unwrap_or(ShaderKey::DEFAULT),
        }
    }
}

/// Column-major 4x4 transform as uploaded to the GPU (64 bytes).
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
#[repr(C)]
pub struct InstanceTransform {
    pub columns: [[f32; 4]; 4],
}

impl From<Mat4> for InstanceTransform {
    fn from(matrix: Mat4) -> Self {
        Self {
            columns: matrix.to_cols_array_2d(),
        }
    }
}

impl InstanceTransform {
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.columns)
    }
}

/// One flattened per-instance attribute stream.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeBuffer {
    pub descriptor: AttributeDescriptor,
    pub data: Vec<f32>,
}

impl AttributeBuffer {
    fn new(descriptor: AttributeDescriptor) -> Self {
        Self {
            descriptor,
            data: Vec::new(),
        }
    }

    /// Values of instance `index`.
    pub fn instance(&self, index: usize) -> &[f32] {
        let width = self.descriptor.components;
        &self.data[index * width..(index + 1) * width]
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct InstanceBatch {
    pub key: BatchKey,
    transforms: Vec<InstanceTransform>,
    attributes: Vec<AttributeBuffer>,
    live_start: usize,
}

impl InstanceBatch {
    fn new(key: BatchKey, layout: &[AttributeDescriptor], live_start: usize) -> Self {
        Self {
            key,
            transforms: Vec::new(),
            attributes: layout.iter().copied().map(AttributeBuffer::new).collect(),
            live_start,
        }
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn transforms(&self) -> &[InstanceTransform] {
        &self.transforms
    }

    pub fn attributes(&self) -> &[AttributeBuffer] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeBuffer> {
        self.attributes.iter().find(|a| a.descriptor.name == name)
    }

    /// Instances backed by live car entities.
    pub fn live_range(&self) -> Range<usize> {
        self.live_start..self.transforms.len()
    }

    pub fn transform_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.transforms)
    }
}

/// Position of one instance inside the compiled scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InstanceSlot {
    pub batch: BatchKey,
    pub index: usize,
}

/// Where a car's body and lights live in the compiled buffers.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct CarInstanceSlots {
    pub body: InstanceSlot,
    pub front_light: InstanceSlot,
    pub rear_light: InstanceSlot,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SceneStats {
    pub instances: usize,
    pub live_instances: usize,
    pub missing_attributes: usize,
}

/// Output of a compile pass. Read-only afterwards except for live ranges.
#[derive(Resource, Clone, Debug, Default, PartialEq)]
pub struct CompiledScene {
    batches: BTreeMap<BatchKey, InstanceBatch>,
    pub stats: SceneStats,
}

impl CompiledScene {
    pub fn batch(&self, key: BatchKey) -> Option<&InstanceBatch> {
        self.batches.get(&key)
    }

    /// Batches in key order.
    pub fn batches(&self) -> impl Iterator<Item = &InstanceBatch> {
        self.batches.values()
    }

    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    pub fn instance_count(&self) -> usize {
        self.batches.values().map(InstanceBatch::len).sum()
    }

    pub fn transform(&self, slot: InstanceSlot) -> Option<Mat4> {
        self.batches
            .get(&slot.batch)
            .and_then(|batch| batch.transforms.get(slot.index))
            .map(InstanceTransform::matrix)
    }

    /// Overwrite a live transform. Static instances are never touched.
    pub fn write_transform(&mut self, slot: InstanceSlot, matrix: Mat4) -> bool {
        let Some(batch) = self.batches.get_mut(&slot.batch) else {
            return false;
        };
        if !batch.live_range().contains(&slot.index) {
            return false;
        }
        batch.transforms[slot.index] = matrix.into();
        true
    }

    /// Re-bake one car's body and light transforms.
    pub fn rebake(&mut self, car: &Car, slots: &CarInstanceSlots) {
        let [front, rear] = car.light_matrices();
        self.write_transform(slots.body, car.body_matrix());
        self.write_transform(slots.front_light, front);
        self.write_transform(slots.rear_light, rear);
    }
}

/// Accumulates placeholders into batches in a single pass.
pub struct SceneCompiler<'a> {
    primitives: &'a PrimitiveRegistry,
    shaders: &'a ShaderRegistry,
    batches: BTreeMap<BatchKey, InstanceBatch>,
    warned: HashSet<(BatchKey, &'static str)>,
    stats: SceneStats,
    live: bool,
}

impl<'a> SceneCompiler<'a> {
    pub fn new(primitives: &'a PrimitiveRegistry, shaders: &'a ShaderRegistry) -> Self {
        Self {
            primitives,
            shaders,
            batches: BTreeMap::new(),
            warned: HashSet::new(),
            stats: SceneStats::default(),
            live: false,
        }
    }

    pub fn push(&mut self, placeholder: &ScenePlaceholder) -> Result<InstanceSlot, CityGenError> {
        let key = BatchKey::of(placeholder);
        let batch = match self.batches.entry(key) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                self.primitives.get(key.geometry)?;
                let layout = self.shaders.layout(key.shader)?;
                let live_start = if self.live { 0 } else { usize::MAX };
                entry.insert(InstanceBatch::new(key, layout, live_start))
            }
        };

        let index = batch.transforms.len();
        batch.transforms.push(placeholder.matrix().into());
        for buffer in &mut batch.attributes {
            let name = buffer.descriptor.name;
            let components = buffer.descriptor.components;
            let mut value = match placeholder.material.attribute(name) {
                Some(value) => value,
                None => {
                    self.stats.missing_attributes += 1;
                    if self.warned.insert((key, name)) {
                        warn!(
                            "Batch {:?}/{} has no '{}' on some instances; using base colour",
                            key.geometry, key.shader, name
                        );
                    }
                    placeholder.material.fallback_attribute(components)
                }
            };
            value.resize(components, 0.0);
            buffer.data.extend_from_slice(&value);
        }

        self.stats.instances += 1;
        if self.live {
            self.stats.live_instances += 1;
        }
        Ok(InstanceSlot { batch: key, index })
    }

    pub fn push_all<'p>(
        &mut self,
        placeholders: impl IntoIterator<Item = &'p ScenePlaceholder>,
    ) -> Result<(), CityGenError> {
        for placeholder in placeholders {
            self.push(placeholder)?;
        }
        Ok(())
    }

    /// Everything pushed from now on belongs to a live range.
    pub fn begin_live(&mut self) {
        if self.live {
            return;
        }
        self.live = true;
        for batch in self.batches.values_mut() {
            batch.live_start = batch.transforms.len();
        }
    }

    pub fn push_car(&mut self, car: &Car) -> Result<CarInstanceSlots, CityGenError> {
        self.begin_live();
        let [front, rear] = car.light_placeholders();
        Ok(CarInstanceSlots {
            body: self.push(&car.body_placeholder())?,
            front_light: self.push(&front)?,
            rear_light: self.push(&rear)?,
        })
    }

    pub fn finish(mut self) -> CompiledScene {
        for batch in self.batches.values_mut() {
            batch.live_start = batch.live_start.min(batch.transforms.len());
        }
        CompiledScene {
            batches: self.batches,
            stats: self.stats,
        }
    }
}

/// Compile static placeholders followed by car instances.
///
/// The returned slots are parallel to `cars`.
pub fn compile(
    placeholders: &[ScenePlaceholder],
    cars: &[Car],
    primitives: &PrimitiveRegistry,
    shaders: &ShaderRegistry,
) -> Result<(CompiledScene, Vec<CarInstanceSlots>), CityGenError> {
    let mut compiler = SceneCompiler::new(primitives, shaders);
    compiler.push_all(placeholders)?;
    compiler.begin_live();
    let slots = cars
        .iter()
        .map(|car| compiler.push_car(car))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((compiler.finish(), slots))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::procgen::roads::RoadSegment;
    use crate::render::placeholder::PlaceholderRole;

    fn building(x: f32, height: f32) -> ScenePlaceholder {
        ScenePlaceholder::cuboid(
            PlaceholderRole::Building,
            Vec3::new(x, height / 2.0, 0.0),
            Vec3::new(15.0, height, 15.0),
        )
        .with_color(LinearRgba::rgb(0.5, 0.5, 0.5))
        .with_shader(ShaderKey::BUILDING)
    }

    fn sample_scene() -> Vec<ScenePlaceholder> {
        vec![
            building(0.0, 20.0),
            ScenePlaceholder::sphere(PlaceholderRole::LampHead, Vec3::Y * 5.0, 0.4),
            building(15.0, 30.0),
            ScenePlaceholder::cuboid(PlaceholderRole::Pillar, Vec3::ZERO, Vec3::ONE)
                .with_shader(ShaderKey::HIGHWAY),
        ]
    }

    #[test]
    fn compile_groups_by_geometry_and_shader() {
        let (scene, _) = compile(
            &sample_scene(),
            &[],
            &PrimitiveRegistry::default(),
            &ShaderRegistry::default(),
        )
        .unwrap();

        assert_eq!(scene.batch_count(), 3);
        assert_eq!(scene.instance_count(), 4);
        let buildings = scene
            .batch(BatchKey {
                geometry: GeometryKind::Box,
                shader: ShaderKey::BUILDING,
            })
            .unwrap();
        assert_eq!(buildings.len(), 2);
        // Instances keep submission order.
        assert_eq!(buildings.transforms()[1].columns[3][0], 15.0);
        assert_eq!(buildings.attribute("color").unwrap().instance(0), &[0.5, 0.5, 0.5]);
        assert!(buildings.live_range().is_empty());
    }

    #[test]
    fn batches_iterate_in_key_order() {
        let (scene, _) = compile(
            &sample_scene(),
            &[],
            &PrimitiveRegistry::default(),
            &ShaderRegistry::default(),
        )
        .unwrap();
        let keys: Vec<_> = scene.batches().map(|b| b.key).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn compile_is_byte_identical_across_runs() {
        let primitives = PrimitiveRegistry::default();
        let shaders = ShaderRegistry::default();
        let (a, _) = compile(&sample_scene(), &[], &primitives, &shaders).unwrap();
        let (b, _) = compile(&sample_scene(), &[], &primitives, &shaders).unwrap();
        for (x, y) in a.batches().zip(b.batches()) {
            assert_eq!(x.transform_bytes(), y.transform_bytes());
            for (p, q) in x.attributes().iter().zip(y.attributes()) {
                assert_eq!(p.as_bytes(), q.as_bytes());
            }
        }
    }

    #[test]
    fn missing_property_substitutes_base_colour() {
        let road = ScenePlaceholder::cuboid(PlaceholderRole::RoadSurface, Vec3::ZERO, Vec3::ONE)
            .with_color(LinearRgba::new(0.2, 0.4, 0.6, 1.0))
            .with_shader(ShaderKey::ROAD)
            .with_property("width", &[6.0]);
        let (scene, _) = compile(
            &[road],
            &[],
            &PrimitiveRegistry::default(),
            &ShaderRegistry::default(),
        )
        .unwrap();
        let batch = scene.batches().next().unwrap();
        assert_eq!(batch.attribute("width").unwrap().instance(0), &[6.0]);
        assert_eq!(batch.attribute("length").unwrap().instance(0), &[0.2]);
        assert_eq!(scene.stats.missing_attributes, 1);
    }

    #[test]
    fn unregistered_shader_aborts_compile() {
        let odd = ScenePlaceholder::cuboid(PlaceholderRole::Building, Vec3::ZERO, Vec3::ONE)
            .with_shader(ShaderKey::new("hologram"));
        let result = compile(
            &[odd],
            &[],
            &PrimitiveRegistry::default(),
            &ShaderRegistry::default(),
        );
        assert_eq!(
            result.unwrap_err(),
            CityGenError::UnregisteredShader(ShaderKey::new("hologram"))
        );
    }

    #[test]
    fn unregistered_geometry_aborts_compile() {
        let result = compile(
            &sample_scene(),
            &[],
            &PrimitiveRegistry::empty(),
            &ShaderRegistry::default(),
        );
        assert_eq!(
            result.unwrap_err(),
            CityGenError::UnregisteredGeometry(GeometryKind::Box)
        );
    }

    #[test]
    fn cars_fill_live_ranges_and_rebake() {
        let road = Arc::new(RoadSegment::new(Vec2::ZERO, Vec2::new(100.0, 0.0), 4));
        let mut car = Car::new(road, 10.0, 0.5, 5.0, LinearRgba::RED);
        let (mut scene, slots) = compile(
            &sample_scene(),
            std::slice::from_ref(&car),
            &PrimitiveRegistry::default(),
            &ShaderRegistry::default(),
        )
        .unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(scene.stats.live_instances, 3);

        let body_batch = scene.batch(slots[0].body.batch).unwrap();
        assert!(body_batch.live_range().contains(&slots[0].body.index));

        car.update(1.0);
        scene.rebake(&car, &slots[0]);
        let moved = scene.transform(slots[0].body).unwrap();
        assert!((moved.w_axis.x - 15.0).abs() < 1e-5);
    }

    #[test]
    fn static_instances_are_not_writable() {
        let (mut scene, _) = compile(
            &sample_scene(),
            &[],
            &PrimitiveRegistry::default(),
            &ShaderRegistry::default(),
        )
        .unwrap();
        let slot = InstanceSlot {
            batch: BatchKey {
                geometry: GeometryKind::Box,
                shader: ShaderKey::BUILDING,
            },
            index: 0,
        };
        assert!(!scene.write_transform(slot, Mat4::IDENTITY));
    }
}
