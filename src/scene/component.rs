//! A placed instance of a [`Model`] in world space (spec §3 "Component").

use std::sync::Arc;

use crate::bvh::visitors::MaterialLookup;
use crate::math::{Mat4, Vec3};
use crate::scene::material::MaterialTable;
use crate::scene::model::Model;

/// One placement of a model in the world: its transform, its per-texture
/// material overrides, and whether it participates in sound propagation
/// at all (spec §3, grounded on `deoalAComponent`'s "affects sound" flag).
#[derive(Clone)]
pub struct Component {
    model: Arc<Model>,
    world_matrix: Mat4,
    inverse_matrix: Mat4,
    materials: MaterialTable,
    /// Bitmask matched against a probe's layer mask to decide whether this
    /// component can occlude or reflect sound for that probe.
    pub layer_mask: u32,
    /// When false, this component is invisible to every ray trace — it
    /// still occupies space in the world but contributes nothing acoustically.
    pub affects_sound: bool,
}

impl Component {
    pub fn new(model: Arc<Model>, world_matrix: Mat4, materials: MaterialTable) -> Self {
        Self {
            model,
            world_matrix,
            inverse_matrix: world_matrix.inverse(),
            materials,
            layer_mask: u32::MAX,
            affects_sound: true,
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn world_matrix(&self) -> Mat4 {
        self.world_matrix
    }

    pub fn inverse_matrix(&self) -> Mat4 {
        self.inverse_matrix
    }

    /// Replaces the transform, keeping the cached inverse in sync. Does
    /// not touch the model's BVH — geometry is defined in model space and
    /// moving a component never invalidates it.
    pub fn set_world_matrix(&mut self, world_matrix: Mat4) {
        self.world_matrix = world_matrix;
        self.inverse_matrix = world_matrix.inverse();
    }

    pub fn world_to_local_point(&self, world_point: Vec3) -> Vec3 {
        self.inverse_matrix.transform_point3(world_point)
    }

    pub fn world_to_local_direction(&self, world_dir: Vec3) -> Vec3 {
        self.inverse_matrix.transform_vector3(world_dir)
    }

    pub fn local_to_world_point(&self, local_point: Vec3) -> Vec3 {
        self.world_matrix.transform_point3(local_point)
    }

    /// World-space bounding box, used to build the per-query world BVH
    /// (spec §4.3).
    pub fn world_aabb(&self) -> crate::geometry::Aabb {
        let mut aabb = crate::geometry::Aabb::EMPTY;
        for face in self.model.faces() {
            for &v in &face.vertices {
                aabb.grow(self.world_matrix.transform_point3(v));
            }
        }
        aabb
    }

    pub fn materials(&self) -> &MaterialTable {
        &self.materials
    }
}

impl MaterialLookup for Component {
    fn is_blocking(&self, texture_index: u16) -> bool {
        match self.materials.get(texture_index) {
            Some(material) => !material.is_transparent(),
            None => true,
        }
    }
}
