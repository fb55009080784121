//! Math types and geometric helpers shared across the acoustic core.

pub use glam::{Mat4, Quat, Vec3};

/// Number of frequency bands tracked throughout the engine (low, mid, high).
pub const BAND_COUNT: usize = 3;

/// Per-band scalar, e.g. gain or absorption at (low, mid, high).
pub type Bands = [f32; BAND_COUNT];

pub const ZERO_BANDS: Bands = [0.0, 0.0, 0.0];

/// Speed of sound in air, in meters/second, used throughout reverb time
/// and echo delay calculations.
pub const SPEED_OF_SOUND: f32 = 343.0;

/// A world-space position/orientation pair, used for the listener.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * (-Vec3::Z)
    }

    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Transforms a world-space direction into this pose's local frame.
    pub fn inverse_transform_direction(&self, world_dir: Vec3) -> Vec3 {
        self.rotation.inverse() * world_dir
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

/// Linear interpolation gate used by the material transmission model
/// (spec §3): `t=lo` maps to `from`, `t=hi` maps to `to`, clamped outside
/// `[lo, hi]`.
pub fn linear_step(t: f32, lo: f32, hi: f32, from: f32, to: f32) -> f32 {
    if hi <= lo {
        // A zero-width gate: `t == lo` is still "at the start" and keeps
        // `from` (spec.md §8 scenario 2, a zero-thickness wall still
        // applies plain `1-α` with no extra extinction); anything past it
        // is instantly at `to`.
        return if t > lo { to } else { from };
    }
    let u = ((t - lo) / (hi - lo)).clamp(0.0, 1.0);
    from + (to - from) * u
}

/// Reflects a (not necessarily normalized) direction `d` off a surface with
/// unit normal `n`: `d' = d - 2(d . n) n`.
pub fn reflect(d: Vec3, n: Vec3) -> Vec3 {
    d - 2.0 * d.dot(n) * n
}

/// The maximum value across all three bands.
pub fn max_band(b: Bands) -> f32 {
    b[0].max(b[1]).max(b[2])
}

/// Per-component max of two band triples.
pub fn max_bands(a: Bands, b: Bands) -> Bands {
    [a[0].max(b[0]), a[1].max(b[1]), a[2].max(b[2])]
}

/// Closest point on the line segment `a..=b` to point `p`, and the
/// parametric `t in [0, 1]` at which it occurs.
pub fn closest_point_on_segment(a: Vec3, b: Vec3, p: Vec3) -> (Vec3, f32) {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return (a, 0.0);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    (a + ab * t, t)
}

/// A spherical Fibonacci lattice of `count` unit directions, used to seed
/// the per-direction probe tasks (spec §4.4). Deterministic given `count`.
pub fn fibonacci_sphere(count: usize) -> Vec<Vec3> {
    if count == 0 {
        return Vec::new();
    }
    let golden_ratio = (1.0 + 5.0_f32.sqrt()) / 2.0;
    (0..count)
        .map(|i| {
            let i = i as f32;
            let n = count as f32;
            let theta = 2.0 * std::f32::consts::PI * i / golden_ratio;
            let phi = (1.0 - 2.0 * (i + 0.5) / n).acos();
            Vec3::new(
                phi.sin() * theta.cos(),
                phi.sin() * theta.sin(),
                phi.cos(),
            )
        })
        .collect()
}
