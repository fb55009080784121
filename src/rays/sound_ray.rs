//! Flat storage for traced sound rays and their segments (spec §3
//! "Sound-ray list", §4.4).

use crate::math::{Bands, Vec3, ZERO_BANDS};

/// One bounce's worth of travel: the ray from one hit (or the cast origin)
/// to the next.
#[derive(Debug, Clone, Copy)]
pub struct Segment {
    pub origin: Vec3,
    /// Unit direction of travel for this segment.
    pub direction: Vec3,
    pub length: f32,
    /// Cumulative distance traveled by the owning ray before this segment began.
    pub distance_from_ray_start: f32,
    /// Gain in each band as the ray entered this segment.
    pub gain_on_entry: Bands,
    /// 1 for the segment following the first hit, 2+ for later bounces.
    /// The initial cast (before any hit) is not itself a segment.
    pub bounces: u32,
}

impl Segment {
    /// The point on this segment closest to `query`, and its distance from
    /// `query` (spec §4.5 "Per-segment gather").
    pub fn closest_point(&self, query: Vec3) -> (Vec3, f32) {
        let end = self.origin + self.direction * self.length;
        let (point, _t) = crate::math::closest_point_on_segment(self.origin, end, query);
        (point, (point - query).length())
    }
}

/// One traced ray: either a root ray cast from the probe origin, or a
/// transmitted child spawned when a root (or another child) ray passed
/// through a face (spec §3 "Ray").
#[derive(Debug, Clone)]
pub struct SoundRay {
    pub origin: Vec3,
    pub direction: Vec3,
    pub total_length: f32,
    pub remaining_budget: f32,
    pub bounce_count: u32,
    pub transmit_count: u32,
    pub gain: Bands,
    /// Running sum of per-band absorption taken out of the ray so far,
    /// kept only for diagnostics/logging.
    pub absorption_sum: Bands,
    /// Range into the owning `SoundRayList::segments`.
    pub segment_start: u32,
    pub segment_count: u32,
    /// Set once the ray terminates and the is-outside check runs.
    pub outside: bool,
}

impl SoundRay {
    pub fn new(origin: Vec3, direction: Vec3, budget: f32) -> Self {
        Self {
            origin,
            direction,
            total_length: 0.0,
            remaining_budget: budget,
            bounce_count: 0,
            transmit_count: 0,
            gain: [1.0, 1.0, 1.0],
            absorption_sum: ZERO_BANDS,
            segment_start: 0,
            segment_count: 0,
            outside: false,
        }
    }
}

/// Owns every ray and segment traced within one probe task. Reset (cleared,
/// not deallocated) at the start of each task (spec §3: "reset per probe task").
#[derive(Debug, Default)]
pub struct SoundRayList {
    roots: Vec<SoundRay>,
    children: Vec<SoundRay>,
    segments: Vec<Segment>,
}

impl SoundRayList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Traced rays are built up by the caller (origin/direction/gain plus a
    /// local `Vec<Segment>`) and only handed to the list once finished —
    /// this keeps the segment-append borrow entirely local to the tracing
    /// loop instead of threading `&mut SoundRayList` through it.
    pub fn finish_root(&mut self, mut ray: SoundRay, segments: Vec<Segment>) -> u32 {
        ray.segment_start = self.segments.len() as u32;
        ray.segment_count = segments.len() as u32;
        self.segments.extend(segments);
        let index = self.roots.len() as u32;
        self.roots.push(ray);
        index
    }

    pub fn finish_child(&mut self, mut ray: SoundRay, segments: Vec<Segment>) -> u32 {
        ray.segment_start = self.segments.len() as u32;
        ray.segment_count = segments.len() as u32;
        self.segments.extend(segments);
        let index = self.children.len() as u32;
        self.children.push(ray);
        index
    }

    pub fn roots(&self) -> &[SoundRay] {
        &self.roots
    }

    pub fn children(&self) -> &[SoundRay] {
        &self.children
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn ray_segments(&self, ray: &SoundRay) -> &[Segment] {
        &self.segments[ray.segment_start as usize..(ray.segment_start + ray.segment_count) as usize]
    }

    /// All rays (root and transmitted child) with an iterator over their
    /// segments, used by the listener sphere-gather (spec §4.5).
    pub fn iter_rays(&self) -> impl Iterator<Item = &SoundRay> {
        self.roots.iter().chain(self.children.iter())
    }

    pub fn clear(&mut self) {
        self.roots.clear();
        self.children.clear();
        self.segments.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_for_a_ray_stay_contiguous() {
        let mut list = SoundRayList::new();
        let seg = Segment {
            origin: Vec3::ZERO,
            direction: Vec3::X,
            length: 1.0,
            distance_from_ray_start: 0.0,
            gain_on_entry: [1.0, 1.0, 1.0],
            bounces: 1,
        };

        let a = SoundRay::new(Vec3::ZERO, Vec3::X, 10.0);
        let idx = list.finish_root(a, vec![seg, seg]);

        let b = SoundRay::new(Vec3::ZERO, Vec3::Y, 10.0);
        let other = list.finish_root(b, vec![seg]);

        assert_eq!(list.ray_segments(&list.roots()[idx as usize]).len(), 2);
        assert_eq!(list.ray_segments(&list.roots()[other as usize]).len(), 1);
    }

    #[test]
    fn closest_point_on_segment_matches_expectation() {
        let seg = Segment {
            origin: Vec3::new(0.0, 0.0, 0.0),
            direction: Vec3::X,
            length: 10.0,
            distance_from_ray_start: 0.0,
            gain_on_entry: [1.0, 1.0, 1.0],
            bounces: 1,
        };
        let (point, dist) = seg.closest_point(Vec3::new(5.0, 1.0, 0.0));
        assert!((point.x - 5.0).abs() < 1e-5);
        assert!((dist - 1.0).abs() < 1e-5);
    }
}
