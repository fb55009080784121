//! Axis-aligned bounding boxes, shared by both BVH flavors (spec §4.1, §4.3).

use crate::math::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::MAX),
        max: Vec3::splat(f32::MIN),
    };

    pub fn from_points(points: &[Vec3]) -> Self {
        let mut aabb = Self::EMPTY;
        for &p in points {
            aabb.grow(p);
        }
        aabb
    }

    pub fn grow(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_size(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Returns true if `self` fully contains `other`'s volume.
    pub fn contains(&self, other: &Self) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && self.min.z <= other.min.z
            && self.max.x >= other.max.x
            && self.max.y >= other.max.y
            && self.max.z >= other.max.z
    }

    /// Slab test against a ray given its precomputed inverse direction
    /// (spec §4.2). `inv_dir` components must be `0.0` (not `inf`) for
    /// axes where the ray direction is exactly zero, in which case that
    /// axis' slab is skipped entirely.
    ///
    /// Returns `Some(t_enter)` (clamped to `>= 0`) if the ray, restricted
    /// to `t in [0, 1]` (i.e. `limit` is baked into the caller's `dir`
    /// scale), intersects the box.
    pub fn hit_ray(&self, origin: Vec3, inv_dir: Vec3) -> bool {
        let mut tmin = 0.0_f32;
        let mut tmax = 1.0_f32;

        for axis in 0..3 {
            let inv = inv_dir[axis];
            if inv == 0.0 {
                if origin[axis] < self.min[axis] || origin[axis] > self.max[axis] {
                    return false;
                }
                continue;
            }
            let mut t1 = (self.min[axis] - origin[axis]) * inv;
            let mut t2 = (self.max[axis] - origin[axis]) * inv;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            tmin = tmin.max(t1);
            tmax = tmax.min(t2);
            if tmin > tmax {
                return false;
            }
        }

        tmin <= tmax && tmin <= 1.0 && tmax >= 0.0
    }
}

/// Computes a safe inverse-direction vector for slab tests: components
/// where `dir` is (numerically) zero map to `0.0` rather than `inf`, so
/// that axis' slab test is skipped (spec §4.2).
pub fn safe_inverse_direction(dir: Vec3) -> Vec3 {
    Vec3::new(
        if dir.x.abs() > f32::EPSILON { 1.0 / dir.x } else { 0.0 },
        if dir.y.abs() > f32::EPSILON { 1.0 / dir.y } else { 0.0 },
        if dir.z.abs() > f32::EPSILON { 1.0 / dir.z } else { 0.0 },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_contains_both_inputs() {
        let a = Aabb {
            min: Vec3::new(0.0, 0.0, 0.0),
            max: Vec3::new(1.0, 1.0, 1.0),
        };
        let b = Aabb {
            min: Vec3::new(2.0, -1.0, 0.5),
            max: Vec3::new(3.0, 0.5, 2.0),
        };
        let u = a.union(&b);
        assert!(u.contains(&a));
        assert!(u.contains(&b));
    }

    #[test]
    fn ray_hits_box_straight_on() {
        let aabb = Aabb {
            min: Vec3::new(-1.0, -1.0, -1.0),
            max: Vec3::new(1.0, 1.0, 1.0),
        };
        let origin = Vec3::new(0.0, 0.0, -5.0);
        let dir = Vec3::new(0.0, 0.0, 10.0); // length covers t in [0,1] -> z in [-5,5]
        let inv = safe_inverse_direction(dir);
        assert!(aabb.hit_ray(origin, inv));
    }

    #[test]
    fn ray_misses_box_when_parallel_and_outside_slab() {
        let aabb = Aabb {
            min: Vec3::new(-1.0, -1.0, -1.0),
            max: Vec3::new(1.0, 1.0, 1.0),
        };
        let origin = Vec3::new(5.0, 0.0, -5.0);
        let dir = Vec3::new(0.0, 0.0, 10.0);
        let inv = safe_inverse_direction(dir);
        assert!(!aabb.hit_ray(origin, inv));
    }
}
