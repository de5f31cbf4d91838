// src/mesh.rs
//! Host-engine collaborators: meshes, instanced meshes, geometry attribute
//! buffers, and the per-instance projection-data allocation.

use std::collections::HashMap;

use glam::{Mat4, Quat, Vec3};

use crate::error::{Error, Result};

/// Names of the four per-instance attributes that carry one saved 4x4 model
/// matrix, one attribute per matrix column. They match the attribute names
/// the patched vertex shader declares.
pub const SAVED_MODEL_MATRIX_ATTRIBUTES: [&str; 4] = [
    "savedModelMatrix0",
    "savedModelMatrix1",
    "savedModelMatrix2",
    "savedModelMatrix3",
];

/// Stable identity of a material instance. Mesh slots reference materials
/// by id, so "the same material instance" is an id comparison rather than a
/// pointer comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(pub u64);

/// One material slot on a mesh, mirroring the flags of the material bound
/// there at assignment time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialSlot {
    pub id: MaterialId,
    /// Whether the bound material is projection-capable.
    pub projected: bool,
    pub transparent: bool,
}

/// A per-instance vertex attribute buffer with a fixed instance count.
#[derive(Debug, Clone, PartialEq)]
pub struct InstancedAttribute {
    data: Vec<f32>,
    item_size: usize,
}

impl InstancedAttribute {
    /// Allocate for a fixed instance count; never resized afterwards.
    pub fn new(count: usize, item_size: usize) -> Self {
        Self {
            data: vec![0.0; count * item_size],
            item_size,
        }
    }

    pub fn count(&self) -> usize {
        if self.item_size == 0 {
            0
        } else {
            self.data.len() / self.item_size
        }
    }

    pub fn item_size(&self) -> usize {
        self.item_size
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Write one 4-component item at `index`. An attribute narrower than
    /// four components holds no such item, so every index is out of bounds.
    pub fn set_xyzw(&mut self, index: usize, x: f32, y: f32, z: f32, w: f32) -> Result<()> {
        let count = if self.item_size < 4 { 0 } else { self.count() };
        if index >= count {
            return Err(Error::InstanceIndexOutOfBounds { index, count });
        }
        let base = index * self.item_size;
        self.data[base] = x;
        self.data[base + 1] = y;
        self.data[base + 2] = z;
        self.data[base + 3] = w;
        Ok(())
    }

    /// Read one 4-component item back.
    pub fn xyzw(&self, index: usize) -> Option<[f32; 4]> {
        if self.item_size < 4 || index >= self.count() {
            return None;
        }
        let base = index * self.item_size;
        Some([
            self.data[base],
            self.data[base + 1],
            self.data[base + 2],
            self.data[base + 3],
        ])
    }
}

/// Named vertex attribute buffers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    attributes: HashMap<String, InstancedAttribute>,
}

impl Geometry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, attribute: InstancedAttribute) {
        self.attributes.insert(name.into(), attribute);
    }

    pub fn attribute(&self, name: &str) -> Option<&InstancedAttribute> {
        self.attributes.get(name)
    }

    pub fn attribute_mut(&mut self, name: &str) -> Option<&mut InstancedAttribute> {
        self.attributes.get_mut(name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }
}

/// Pre-allocate the four per-instance transform attributes for
/// `instances_count` instances. Must be called once per geometry before any
/// `project_instance_at` use on it.
pub fn allocate_projection_data(geometry: &mut Geometry, instances_count: usize) {
    for name in SAVED_MODEL_MATRIX_ATTRIBUTES {
        geometry.set_attribute(name, InstancedAttribute::new(instances_count, 4));
    }
}

/// A renderable object with a world transform and one or more material
/// slots.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub geometry: Geometry,
    pub materials: Vec<MaterialSlot>,
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    world_matrix: Mat4,
}

impl Mesh {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            materials: Vec::new(),
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            world_matrix: Mat4::IDENTITY,
        }
    }

    /// Recompose the world matrix from position/rotation/scale.
    pub fn update_world_matrix(&mut self) {
        self.world_matrix = Mat4::from_scale_rotation_translation(
            self.scale,
            self.rotation,
            self.position,
        );
    }

    pub fn world_matrix(&self) -> Mat4 {
        self.world_matrix
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new(Geometry::new())
    }
}

/// An instanced-rendering target: shared geometry drawn `count` times.
#[derive(Debug, Clone, PartialEq)]
pub struct InstancedMesh {
    pub geometry: Geometry,
    pub materials: Vec<MaterialSlot>,
    pub count: usize,
}

impl InstancedMesh {
    pub fn new(geometry: Geometry, count: usize) -> Self {
        Self {
            geometry,
            materials: Vec::new(),
            count,
        }
    }
}

/// Test whether a single slot carries a projection-capable material.
pub fn is_projected_material(slot: &MaterialSlot) -> bool {
    slot.projected
}

/// Test whether every slot in a list carries a projection-capable material.
pub fn all_projected_materials(slots: &[MaterialSlot]) -> bool {
    !slots.is_empty() && slots.iter().all(is_projected_material)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_creates_all_four_attributes() {
        let mut geometry = Geometry::new();
        allocate_projection_data(&mut geometry, 8);
        for name in SAVED_MODEL_MATRIX_ATTRIBUTES {
            let attribute = geometry.attribute(name).unwrap();
            assert_eq!(attribute.count(), 8);
            assert_eq!(attribute.item_size(), 4);
        }
    }

    #[test]
    fn test_attribute_write_read_roundtrip() {
        let mut attribute = InstancedAttribute::new(4, 4);
        attribute.set_xyzw(2, 1.0, 2.0, 3.0, 4.0).unwrap();
        assert_eq!(attribute.xyzw(2), Some([1.0, 2.0, 3.0, 4.0]));
        // neighbours untouched
        assert_eq!(attribute.xyzw(1), Some([0.0; 4]));
        assert_eq!(attribute.xyzw(3), Some([0.0; 4]));
    }

    #[test]
    fn test_narrow_attribute_has_no_xyzw_slots() {
        let mut attribute = InstancedAttribute::new(4, 2);
        let err = attribute.set_xyzw(0, 1.0, 2.0, 3.0, 4.0).unwrap_err();
        assert_eq!(err, Error::InstanceIndexOutOfBounds { index: 0, count: 0 });
        assert_eq!(attribute.xyzw(0), None);
    }

    #[test]
    fn test_attribute_write_out_of_bounds() {
        let mut attribute = InstancedAttribute::new(2, 4);
        let err = attribute.set_xyzw(2, 0.0, 0.0, 0.0, 0.0).unwrap_err();
        assert_eq!(err, Error::InstanceIndexOutOfBounds { index: 2, count: 2 });
        assert_eq!(attribute.xyzw(5), None);
    }

    #[test]
    fn test_mesh_world_matrix_update() {
        let mut mesh = Mesh::default();
        mesh.position = Vec3::new(1.0, 2.0, 3.0);
        mesh.update_world_matrix();
        let translated = mesh.world_matrix().transform_point3(Vec3::ZERO);
        assert!(translated.abs_diff_eq(Vec3::new(1.0, 2.0, 3.0), 1e-6));
    }

    #[test]
    fn test_material_predicates() {
        let projected = MaterialSlot {
            id: MaterialId(1),
            projected: true,
            transparent: false,
        };
        let plain = MaterialSlot {
            id: MaterialId(2),
            projected: false,
            transparent: false,
        };
        assert!(is_projected_material(&projected));
        assert!(!is_projected_material(&plain));
        assert!(all_projected_materials(&[projected, projected]));
        assert!(!all_projected_materials(&[projected, plain]));
        assert!(!all_projected_materials(&[]));
    }
}
