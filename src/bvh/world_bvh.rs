//! Per-query world BVH over component bounding boxes (spec §4.3).
//!
//! Rebuilt every tick from the current component list. Bounds are stored
//! relative to the listener position rather than absolute world space —
//! at the distances a world can reach, absolute float coordinates lose
//! enough precision to matter for the sub-centimetre edge tests in
//! `bvh::visitors`; listener-relative coordinates keep everything near
//! the origin for the lifetime of one tick's traversal.

use crate::bvh::builder::{build_bvh, BuildEntry, BuildLimits};
pub use crate::bvh::builder::{BvhNode, BvhNodeKind};
use crate::math::Vec3;
use crate::scene::Component;

/// A node with at most this many components is always a leaf.
pub const LEAF_COMPONENT_THRESHOLD: usize = 2;
/// A node whose centroid extent is below this on every axis is a leaf.
pub const CENTROID_EXTENT_THRESHOLD: f32 = 1.0;
pub const MAX_DEPTH: u32 = 30;

/// Binary BVH over the components visible to one probe query, with bounds
/// expressed relative to `listener_position`.
#[derive(Debug, Clone)]
pub struct WorldBvh {
    nodes: Vec<BvhNode>,
    /// Index into the caller's original component slice, one per leaf slot,
    /// reordered the same way `ModelBvh` reorders its faces.
    component_indices: Vec<u32>,
    listener_position: Vec3,
}

impl WorldBvh {
    /// Builds a BVH over `components`' world AABBs, re-centered on
    /// `listener_position`. Returns an empty BVH for an empty component
    /// list rather than erroring — an empty world is valid (spec §4.3
    /// "Non-goals" / §8 edge cases).
    pub fn build(components: &[Component], listener_position: Vec3) -> Self {
        let mut entries: Vec<BuildEntry> = components
            .iter()
            .enumerate()
            .filter(|(_, c)| c.affects_sound)
            .map(|(i, c)| {
                let aabb = c.world_aabb();
                BuildEntry {
                    index: i as u32,
                    center: aabb.center() - listener_position,
                    min: aabb.min - listener_position,
                    max: aabb.max - listener_position,
                }
            })
            .collect();

        let limits = BuildLimits {
            max_leaf_items: LEAF_COMPONENT_THRESHOLD,
            centroid_extent_threshold: CENTROID_EXTENT_THRESHOLD,
            max_depth: MAX_DEPTH,
        };
        let nodes = build_bvh(&mut entries, &limits);
        let component_indices = entries.iter().map(|e| e.index).collect();

        Self {
            nodes,
            component_indices,
            listener_position,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    pub fn root(&self) -> Option<&BvhNode> {
        self.nodes.first()
    }

    pub fn listener_position(&self) -> Vec3 {
        self.listener_position
    }

    /// Returns the indices (into the original component slice) of every
    /// leaf whose AABB the ray, given in listener-relative space, crosses.
    /// Order is front-to-back along the ray.
    pub fn candidates(&self, origin: Vec3, dir: Vec3, length: f32) -> Vec<u32> {
        let mut out = Vec::new();
        let Some(root) = self.root() else {
            return out;
        };
        let inv_dir = crate::geometry::safe_inverse_direction(dir * length);
        self.collect(0, root, origin, dir, inv_dir, &mut out);
        out
    }

    fn collect(
        &self,
        _node_index: u32,
        node: &BvhNode,
        origin: Vec3,
        dir: Vec3,
        inv_dir: Vec3,
        out: &mut Vec<u32>,
    ) {
        if !node.aabb().hit_ray(origin, inv_dir) {
            return;
        }
        match node.kind {
            BvhNodeKind::Leaf {
                first_item,
                item_count,
            } => {
                for i in first_item..first_item + item_count {
                    out.push(self.component_indices[i as usize]);
                }
            }
            BvhNodeKind::Internal { left, right } => {
                let nodes = self.nodes();
                let dl = (nodes[left as usize].center - origin).dot(dir);
                let dr = (nodes[right as usize].center - origin).dot(dir);
                let (first, second) = if dl <= dr { (left, right) } else { (right, left) };
                self.collect(first, &nodes[first as usize], origin, dir, inv_dir, out);
                self.collect(second, &nodes[second as usize], origin, dir, inv_dir, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Mat4;
    use crate::scene::material::{Material, MaterialTable};
    use crate::scene::model::Model;
    use std::sync::Arc;

    fn component_at(x: f32) -> Component {
        let model = Arc::new(
            Model::new(&[(
                [
                    Vec3::new(0.0, 0.0, 0.0),
                    Vec3::new(1.0, 0.0, 0.0),
                    Vec3::new(0.0, 1.0, 0.0),
                ],
                0,
            )])
            .unwrap(),
        );
        let mut materials = MaterialTable::new();
        materials.add(Material::CONCRETE);
        Component::new(model, Mat4::from_translation(Vec3::new(x, 0.0, 0.0)), materials)
    }

    #[test]
    fn empty_component_list_yields_empty_bvh() {
        let bvh = WorldBvh::build(&[], Vec3::ZERO);
        assert!(bvh.is_empty());
        assert!(bvh.candidates(Vec3::ZERO, Vec3::X, 10.0).is_empty());
    }

    #[test]
    fn candidates_include_components_the_ray_crosses() {
        let components = vec![component_at(0.0), component_at(20.0)];
        let bvh = WorldBvh::build(&components, Vec3::ZERO);
        let hits = bvh.candidates(Vec3::new(-1.0, 0.0, 0.0), Vec3::X, 2.0);
        assert_eq!(hits, vec![0]);
    }

    #[test]
    fn disabled_components_are_excluded() {
        let mut components = vec![component_at(0.0)];
        components[0].affects_sound = false;
        let bvh = WorldBvh::build(&components, Vec3::ZERO);
        assert!(bvh.is_empty());
    }
}
