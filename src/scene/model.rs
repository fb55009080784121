//! A model: an immutable triangle mesh plus its lazily-built per-model BVH
//! and ray cache (spec §3 "Model", §4.1, §4.6).

use std::sync::OnceLock;

use crate::bvh::ModelBvh;
use crate::cache::RayCache;
use crate::error::{AuralTraceError, Result};
use crate::geometry::Face;

/// Read-only triangle mesh shared by every [`crate::scene::Component`]
/// instancing it. Geometry never changes after construction — moving
/// instances move their [`crate::scene::Component`] transform instead.
#[derive(Debug)]
pub struct Model {
    faces: Vec<Face>,
    texture_count: u16,
    bvh: OnceLock<ModelBvh>,
    ray_cache: RayCache,
}

impl Model {
    /// Builds a model from raw triangle data. Each `(vertices, texture_index)`
    /// tuple becomes one [`Face`]; degenerate triangles are rejected.
    pub fn new(triangles: &[([crate::math::Vec3; 3], u16)]) -> Result<Self> {
        let mut faces = Vec::with_capacity(triangles.len());
        let mut texture_count = 0u16;
        for (i, (vertices, texture_index)) in triangles.iter().enumerate() {
            faces.push(Face::new(*vertices, i as u32, *texture_index)?);
            texture_count = texture_count.max(texture_index + 1);
        }
        Ok(Self {
            faces,
            texture_count,
            bvh: OnceLock::new(),
            ray_cache: RayCache::new(),
        })
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn texture_count(&self) -> u16 {
        self.texture_count
    }

    /// Builds the BVH on first access and reuses it afterwards. Concurrent
    /// callers block on the same build rather than racing (spec §4.1:
    /// "build is a one-shot transaction").
    pub fn bvh(&self) -> &ModelBvh {
        self.bvh.get_or_init(|| ModelBvh::build(&self.faces))
    }

    pub fn ray_cache(&self) -> &RayCache {
        &self.ray_cache
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;

    fn triangle() -> ([Vec3; 3], u16) {
        (
            [
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            0,
        )
    }

    #[test]
    fn model_builds_its_bvh_lazily_and_caches_it() {
        let model = Model::new(&[triangle(), triangle()]).unwrap();
        assert!(model.bvh.get().is_none());
        let first = model.bvh() as *const _;
        let second = model.bvh() as *const _;
        assert_eq!(first, second);
    }

    #[test]
    fn degenerate_triangle_is_rejected() {
        let degenerate = (
            [
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(0.0, 0.0, 0.0),
            ],
            0,
        );
        let err = Model::new(&[degenerate]).unwrap_err();
        assert!(matches!(err, AuralTraceError::DegenerateGeometry(_)));
    }
}
