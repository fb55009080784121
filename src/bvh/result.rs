//! Growable, distance-sorted ray-trace result containers shared by the
//! probe tasks (spec §3 "Ray-trace result containers").

use crate::bvh::visitors::TriangleHit;
use crate::error::{AuralTraceError, Result};

/// Accumulates hits for one ray (or one bounce's worth of rays), keeping
/// them distance-sorted as they arrive. Growth is bounded so a pathological
/// scene (degenerate geometry producing thousands of near-duplicate hits)
/// can't exhaust memory silently — past the cap, `push` reports
/// `OutOfMemory` and the caller folds the owning probe's result to
/// degraded (spec §7).
#[derive(Debug, Default)]
pub struct HitList {
    hits: Vec<TriangleHit>,
    cap: usize,
}

impl HitList {
    pub fn new(cap: usize) -> Self {
        Self {
            hits: Vec::new(),
            cap,
        }
    }

    /// Inserts `hit` keeping the list sorted by ascending distance.
    pub fn push(&mut self, hit: TriangleHit) -> Result<()> {
        if self.hits.len() >= self.cap {
            return Err(AuralTraceError::OutOfMemory(format!(
                "hit list exceeded its cap of {}",
                self.cap
            )));
        }
        let pos = self
            .hits
            .partition_point(|existing| existing.distance <= hit.distance);
        self.hits.insert(pos, hit);
        Ok(())
    }

    pub fn extend(&mut self, hits: impl IntoIterator<Item = TriangleHit>) -> Result<()> {
        for hit in hits {
            self.push(hit)?;
        }
        Ok(())
    }

    pub fn closest(&self) -> Option<&TriangleHit> {
        self.hits.first()
    }

    pub fn as_slice(&self) -> &[TriangleHit] {
        &self.hits
    }

    pub fn into_vec(self) -> Vec<TriangleHit> {
        self.hits
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn clear(&mut self) {
        self.hits.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;

    fn hit(distance: f32) -> TriangleHit {
        TriangleHit {
            distance,
            point: Vec3::ZERO,
            normal: Vec3::Z,
            front: true,
            texture_index: 0,
            source_face_index: 0,
        }
    }

    #[test]
    fn push_keeps_the_list_sorted() {
        let mut list = HitList::new(16);
        list.push(hit(5.0)).unwrap();
        list.push(hit(1.0)).unwrap();
        list.push(hit(3.0)).unwrap();
        let distances: Vec<f32> = list.as_slice().iter().map(|h| h.distance).collect();
        assert_eq!(distances, vec![1.0, 3.0, 5.0]);
        assert_eq!(list.closest().unwrap().distance, 1.0);
    }

    #[test]
    fn push_past_cap_reports_out_of_memory() {
        let mut list = HitList::new(1);
        list.push(hit(1.0)).unwrap();
        assert!(matches!(
            list.push(hit(2.0)),
            Err(AuralTraceError::OutOfMemory(_))
        ));
    }
}
