//! Per-model ray cache: reuses a previous trace's result for a new ray
//! that starts, points, and ends close enough to one already recorded
//! (spec §4.6, grounded on `deoalRayCache`).
//!
//! The original engine hand-rolls a reader/writer lock (a write mutex plus
//! an atomic reader count) so that the common case — many concurrent
//! lookups, occasional inserts — never blocks readers on each other. We
//! get the same multiple-readers/single-writer behaviour from
//! `std::sync::RwLock` instead; see `DESIGN.md` for why the hand-rolled
//! version wasn't worth reproducing here.

use std::sync::RwLock;

use crate::bvh::visitors::TriangleHit;
use crate::cache::octree::RayCacheOctree;
use crate::math::Vec3;

/// A previously computed ray trace, cached for reuse: every hit along the
/// ray through the model, both facings, sorted by ascending distance (spec
/// §4.6 "stores the all-hits result of a ray through a model").
#[derive(Debug, Clone)]
pub struct CachedRay {
    pub origin: Vec3,
    pub direction: Vec3,
    pub length: f32,
    pub hits: Vec<TriangleHit>,
}

/// Matching tolerances for a candidate cache hit (spec §4.6).
#[derive(Debug, Clone, Copy)]
pub struct CacheTolerance {
    /// Maximum origin displacement, in metres, to still count as the same ray.
    pub range: f32,
    /// Maximum angle, in radians, between directions to still count as the same ray.
    pub spread_angle: f32,
}

impl CacheTolerance {
    pub fn cos_threshold(&self) -> f32 {
        self.spread_angle.cos()
    }
}

impl Default for CacheTolerance {
    /// Spec §4.6 defaults: `cacheRange` 0.1 m, `spreadAngle` 0.5°.
    fn default() -> Self {
        Self {
            range: 0.1,
            spread_angle: 0.5_f32.to_radians(),
        }
    }
}

struct CacheState {
    entries: Vec<CachedRay>,
    index: RayCacheOctree,
}

/// A model's ray cache. One instance is shared across every thread tracing
/// against that model; `find`/`insert` take `&self`.
pub struct RayCache {
    state: RwLock<CacheState>,
}

impl RayCache {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(CacheState {
                entries: Vec::new(),
                index: RayCacheOctree::new(1000.0),
            }),
        }
    }

    /// Looks up a cached ray matching `origin`/`direction`/`length` within
    /// `tolerance`. Returns a clone so the lock is released before the
    /// caller does anything with the result. A shorter query against a
    /// longer cached entry still matches (spec §4.6: "`entry.length >=
    /// queryLength - 1mm`") — the reader is responsible for ignoring any
    /// cached hits past its own query length.
    pub fn find(
        &self,
        origin: Vec3,
        direction: Vec3,
        length: f32,
        tolerance: CacheTolerance,
    ) -> Option<CachedRay> {
        let state = self.state.read().unwrap();
        let candidates = state.index.query_radius(origin, tolerance.range);
        let cos_threshold = tolerance.cos_threshold();
        candidates
            .into_iter()
            .map(|i| &state.entries[i])
            .find(|entry| entry.direction.dot(direction) >= cos_threshold && entry.length >= length - 0.001)
            .cloned()
    }

    /// Inserts a freshly traced ray. If a directionally-compatible entry
    /// already sits near `entry.origin` — another task raced us to the
    /// same cache slot — keeps whichever ray is longer, since the longer
    /// one subsumes the shorter (spec §4.6 "Insertion policy").
    pub fn insert(&self, entry: CachedRay, tolerance: CacheTolerance) {
        let mut state = self.state.write().unwrap();
        let cos_threshold = tolerance.cos_threshold();
        let candidates = state.index.query_radius(entry.origin, tolerance.range);
        let existing = candidates
            .into_iter()
            .find(|&i| state.entries[i].direction.dot(entry.direction) >= cos_threshold);

        match existing {
            Some(i) if state.entries[i].length >= entry.length => {}
            Some(i) => state.entries[i] = entry,
            None => {
                let index = state.entries.len();
                let origin = entry.origin;
                state.entries.push(entry);
                state.index.insert(origin, index);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.state.read().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut state = self.state.write().unwrap();
        state.entries.clear();
        state.index = RayCacheOctree::new(1000.0);
    }
}

impl Default for RayCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tolerance() -> CacheTolerance {
        CacheTolerance {
            range: 0.1,
            spread_angle: 0.5_f32.to_radians(),
        }
    }

    fn hit_at(distance: f32) -> TriangleHit {
        TriangleHit {
            distance,
            point: Vec3::new(distance, 0.0, 0.0),
            normal: Vec3::NEG_X,
            front: true,
            texture_index: 0,
            source_face_index: 0,
        }
    }

    #[test]
    fn a_shorter_query_matches_a_longer_cached_entry() {
        let cache = RayCache::new();
        cache.insert(
            CachedRay {
                origin: Vec3::new(0.0, 0.0, 0.0),
                direction: Vec3::new(1.0, 0.0, 0.0),
                length: 10.05,
                hits: vec![hit_at(5.0)],
            },
            tolerance(),
        );
        let hit = cache.find(Vec3::new(0.02, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), 10.0, tolerance());
        assert!(hit.is_some());
        assert_eq!(hit.unwrap().hits[0].distance, 5.0);
    }

    #[test]
    fn a_longer_query_than_the_cached_entry_misses() {
        let cache = RayCache::new();
        cache.insert(
            CachedRay {
                origin: Vec3::ZERO,
                direction: Vec3::X,
                length: 5.0,
                hits: vec![],
            },
            tolerance(),
        );
        let hit = cache.find(Vec3::ZERO, Vec3::X, 10.0, tolerance());
        assert!(hit.is_none());
    }

    #[test]
    fn misses_a_ray_pointed_a_different_way() {
        let cache = RayCache::new();
        cache.insert(
            CachedRay {
                origin: Vec3::new(0.0, 0.0, 0.0),
                direction: Vec3::new(1.0, 0.0, 0.0),
                length: 10.0,
                hits: vec![],
            },
            tolerance(),
        );
        let hit = cache.find(Vec3::new(0.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0), 10.0, tolerance());
        assert!(hit.is_none());
    }

    #[test]
    fn a_racing_insert_keeps_whichever_ray_is_longer() {
        let cache = RayCache::new();
        cache.insert(
            CachedRay {
                origin: Vec3::ZERO,
                direction: Vec3::X,
                length: 5.0,
                hits: vec![hit_at(4.0)],
            },
            tolerance(),
        );
        // A shorter ray racing in on the same slot must not evict the
        // longer one already there.
        cache.insert(
            CachedRay {
                origin: Vec3::ZERO,
                direction: Vec3::X,
                length: 3.0,
                hits: vec![hit_at(2.0)],
            },
            tolerance(),
        );
        assert_eq!(cache.len(), 1);
        let entry = cache.find(Vec3::ZERO, Vec3::X, 5.0, tolerance()).unwrap();
        assert_eq!(entry.length, 5.0);

        // A longer ray racing in afterwards does replace it.
        cache.insert(
            CachedRay {
                origin: Vec3::ZERO,
                direction: Vec3::X,
                length: 8.0,
                hits: vec![hit_at(4.0)],
            },
            tolerance(),
        );
        assert_eq!(cache.len(), 1);
        let entry = cache.find(Vec3::ZERO, Vec3::X, 8.0, tolerance()).unwrap();
        assert_eq!(entry.length, 8.0);
    }

    #[test]
    fn clear_empties_both_the_entries_and_the_index() {
        let cache = RayCache::new();
        cache.insert(
            CachedRay {
                origin: Vec3::ZERO,
                direction: Vec3::X,
                length: 1.0,
                hits: vec![],
            },
            tolerance(),
        );
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
