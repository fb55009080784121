//! A simple point octree indexing cache entries by ray origin, so
//! `RayCache::find` only has to scan entries near a candidate origin
//! instead of the whole cache (spec §4.6, grounded on `deoalRayCacheOctree`).

use crate::math::Vec3;

const LEAF_CAPACITY: usize = 8;
const MAX_DEPTH: u32 = 12;

struct OctNode {
    center: Vec3,
    half_size: f32,
    /// (origin, entry index) pairs; only populated at leaves.
    items: Vec<(Vec3, usize)>,
    children: Option<Box<[OctNode; 8]>>,
}

impl OctNode {
    fn new(center: Vec3, half_size: f32) -> Self {
        Self {
            center,
            half_size,
            items: Vec::new(),
            children: None,
        }
    }

    fn child_index(&self, point: Vec3) -> usize {
        let mut index = 0;
        if point.x >= self.center.x {
            index |= 1;
        }
        if point.y >= self.center.y {
            index |= 2;
        }
        if point.z >= self.center.z {
            index |= 4;
        }
        index
    }

    fn child_center(&self, index: usize) -> Vec3 {
        let q = self.half_size * 0.5;
        Vec3::new(
            self.center.x + if index & 1 != 0 { q } else { -q },
            self.center.y + if index & 2 != 0 { q } else { -q },
            self.center.z + if index & 4 != 0 { q } else { -q },
        )
    }

    fn insert(&mut self, point: Vec3, entry: usize, depth: u32) {
        if self.children.is_none() {
            if self.items.len() < LEAF_CAPACITY || depth >= MAX_DEPTH {
                self.items.push((point, entry));
                return;
            }
            self.split(depth);
        }
        let idx = self.child_index(point);
        self.children.as_mut().unwrap()[idx].insert(point, entry, depth + 1);
    }

    fn split(&mut self, depth: u32) {
        let half = self.half_size * 0.5;
        let mut children: Vec<OctNode> = (0..8)
            .map(|i| OctNode::new(self.child_center(i), half))
            .collect();
        for (point, entry) in self.items.drain(..) {
            let idx = self.child_index_static(point, &children);
            children[idx].insert(point, entry, depth + 1);
        }
        let array: [OctNode; 8] = children.try_into().ok().unwrap();
        self.children = Some(Box::new(array));
    }

    fn child_index_static(&self, point: Vec3, _children: &[OctNode]) -> usize {
        self.child_index(point)
    }

    fn query_radius(&self, center: Vec3, radius: f32, out: &mut Vec<usize>) {
        // Reject this node outright if the query sphere cannot reach its
        // (cubical) volume.
        let d = (center - self.center).abs() - Vec3::splat(self.half_size);
        let outside = d.max(Vec3::ZERO);
        if outside.length_squared() > radius * radius {
            return;
        }
        match &self.children {
            None => {
                for &(point, entry) in &self.items {
                    if (point - center).length_squared() <= radius * radius {
                        out.push(entry);
                    }
                }
            }
            Some(children) => {
                for child in children.iter() {
                    child.query_radius(center, radius, out);
                }
            }
        }
    }
}

/// Spatial index over ray cache entry origins. Rebuilding is cheap enough
/// to do wholesale whenever the cache is cleared; incremental inserts are
/// used otherwise.
pub struct RayCacheOctree {
    root: OctNode,
}

impl RayCacheOctree {
    /// `world_half_extent` should comfortably bound every ray origin ever
    /// inserted; origins outside it still work but degrade toward a
    /// linear scan as they fall outside every node's cube.
    pub fn new(world_half_extent: f32) -> Self {
        Self {
            root: OctNode::new(Vec3::ZERO, world_half_extent),
        }
    }

    pub fn insert(&mut self, origin: Vec3, entry: usize) {
        self.root.insert(origin, entry, 0);
    }

    /// Returns entry indices whose origin lies within `radius` of `origin`.
    pub fn query_radius(&self, origin: Vec3, radius: f32) -> Vec<usize> {
        let mut out = Vec::new();
        self.root.query_radius(origin, radius, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_radius_finds_nearby_and_excludes_far_points() {
        let mut tree = RayCacheOctree::new(100.0);
        tree.insert(Vec3::new(0.0, 0.0, 0.0), 0);
        tree.insert(Vec3::new(50.0, 0.0, 0.0), 1);
        let hits = tree.query_radius(Vec3::new(0.05, 0.0, 0.0), 0.2);
        assert_eq!(hits, vec![0]);
    }

    #[test]
    fn splitting_preserves_every_inserted_point() {
        let mut tree = RayCacheOctree::new(10.0);
        for i in 0..200 {
            let x = (i as f32) * 0.01 - 1.0;
            tree.insert(Vec3::new(x, 0.0, 0.0), i);
        }
        let hits = tree.query_radius(Vec3::ZERO, 100.0);
        assert_eq!(hits.len(), 200);
    }
}
