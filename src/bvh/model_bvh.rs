//! Per-model BVH over triangles (spec §4.1).

use crate::bvh::builder::{build_bvh, BuildEntry, BuildLimits};
pub use crate::bvh::builder::{BvhNode, BvhNodeKind};
use crate::geometry::Face;

/// A node with at most this many faces is always a leaf.
pub const LEAF_FACE_THRESHOLD: usize = 2;
/// A node whose centroid extent is below this on every axis is a leaf.
pub const CENTROID_EXTENT_THRESHOLD: f32 = 0.1;
/// Never recurse past this many levels (stack safety).
pub const MAX_DEPTH: u32 = 30;

/// Binary BVH over a model's triangles.
///
/// Build is not thread-safe with respect to itself or concurrent visits;
/// visiting is thread-safe as long as no concurrent build is in flight
/// (spec §4.1). Once built, a `ModelBvh` is immutable and `Send + Sync`.
#[derive(Debug, Clone)]
pub struct ModelBvh {
    nodes: Vec<BvhNode>,
    /// Face records duplicated from the model's immutable face list and
    /// reordered so each leaf's faces are contiguous — keeps traversal
    /// cache-local (spec §4.1 "Face record (post-build)").
    faces: Vec<Face>,
}

impl ModelBvh {
    /// Builds a BVH over `faces` in local space. `faces` is not modified;
    /// the BVH keeps its own reordered copy.
    pub fn build(faces: &[Face]) -> Self {
        let mut entries: Vec<BuildEntry> = faces
            .iter()
            .enumerate()
            .map(|(i, f)| BuildEntry {
                index: i as u32,
                center: f.centroid(),
                min: f.min_extend(),
                max: f.max_extend(),
            })
            .collect();

        let limits = BuildLimits {
            max_leaf_items: LEAF_FACE_THRESHOLD,
            centroid_extent_threshold: CENTROID_EXTENT_THRESHOLD,
            max_depth: MAX_DEPTH,
        };
        let nodes = build_bvh(&mut entries, &limits);

        let reordered_faces = entries.iter().map(|e| faces[e.index as usize]).collect();

        Self {
            nodes,
            faces: reordered_faces,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn root(&self) -> Option<&BvhNode> {
        self.nodes.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;

    fn triangle_at(x: f32) -> Face {
        Face::new(
            [
                Vec3::new(x, 0.0, 0.0),
                Vec3::new(x + 1.0, 0.0, 0.0),
                Vec3::new(x, 1.0, 0.0),
            ],
            0,
            0,
        )
        .unwrap()
    }

    #[test]
    fn build_over_many_faces_preserves_all_of_them() {
        let faces: Vec<Face> = (0..40).map(|i| triangle_at(i as f32 * 3.0)).collect();
        let bvh = ModelBvh::build(&faces);
        assert_eq!(bvh.faces().len(), faces.len());
    }

    #[test]
    fn empty_model_has_no_nodes() {
        let bvh = ModelBvh::build(&[]);
        assert!(bvh.is_empty());
        assert!(bvh.root().is_none());
    }
}
