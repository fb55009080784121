//! Shared math for the two probe passes: the empirical Lambert grazing
//! scale-up, distance attenuation, and the room-acoustics accumulator both
//! `RoomEstimate` and `TraceSoundRays` feed (spec §4.4, §4.7).

use crate::math::{max_band, Bands};

/// `1 + (1 − cosθ)·2` — an empirical correction that weights grazing hits
/// more heavily in the room-surface estimate. Not physically derived
/// (spec §9 open question); `scale` defaults to `2.0` and is exposed as a
/// tunable through `lambert_scale` on both probe configs.
pub fn lambert_factor(cos_theta_out: f32, scale: f32) -> f32 {
    1.0 + (1.0 - cos_theta_out) * scale
}

/// Simple inverse-distance falloff: full gain inside 1 m, `1/d` beyond it.
/// The spec names `distanceAttenuation(pathLength)` without pinning down a
/// curve; this is the conventional choice and is documented in `DESIGN.md`.
pub fn distance_attenuation(path_length: f32) -> f32 {
    1.0 / path_length.max(1.0)
}

/// Running sums accumulated per-direction by both probe passes, combined
/// by their respective finish step into reverb-ready scalars (spec §4.4
/// "Room totals", §4.7 "Aggregation").
#[derive(Debug, Clone, Copy, Default)]
pub struct RoomTotals {
    pub room_volume: f32,
    pub room_surface: f32,
    pub sabine: Bands,
    pub avg_absorption: Bands,
    pub hit_count: u32,
    pub ray_count: u32,
}

impl RoomTotals {
    /// Folds in one direction's first-hit sample (spec §4.4 "Room totals
    /// computed on the first hit per ray").
    pub fn accumulate_hit(&mut self, distance: f32, cos_theta_out: f32, absorption: Bands, lambert_scale: f32) {
        let surface_factor = distance * distance * lambert_factor(cos_theta_out, lambert_scale);
        self.room_volume += distance * distance * distance;
        self.room_surface += surface_factor;
        for b in 0..3 {
            self.sabine[b] += surface_factor * absorption[b];
            self.avg_absorption[b] += absorption[b];
        }
        self.hit_count += 1;
        self.ray_count += 1;
    }

    /// Folds in a ray that never hit anything: treated as fully absorptive
    /// at `range` so open scenes don't understate reverb decay (spec §4.7
    /// "Aggregation": "treats un-hit rays as absorption 1 at range").
    pub fn accumulate_miss(&mut self, range: f32) {
        self.accumulate_hit(range, 1.0, [1.0, 1.0, 1.0], 0.0);
    }

    pub fn merge(&mut self, other: &RoomTotals) {
        self.room_volume += other.room_volume;
        self.room_surface += other.room_surface;
        for b in 0..3 {
            self.sabine[b] += other.sabine[b];
            self.avg_absorption[b] += other.avg_absorption[b];
        }
        self.hit_count += other.hit_count;
        self.ray_count += other.ray_count;
    }

    /// Eyring reverberation time per band, clamped to `[0.1, 20]` s
    /// (spec §4.5.4).
    pub fn reverberation_time(&self, speed_of_sound: f32) -> Bands {
        let mut t60 = [0.0; 3];
        for b in 0..3 {
            if self.sabine[b] <= f32::EPSILON || self.room_volume <= 0.0 {
                t60[b] = 20.0;
                continue;
            }
            let raw = (24.0 * std::f32::consts::LN_10) / speed_of_sound * self.room_volume / self.sabine[b];
            t60[b] = raw.clamp(0.1, 20.0);
        }
        t60
    }

    /// Classic `4V/S` mean free path, used when no bounce-segment data is
    /// available (the `RoomEstimate` pass never bounces).
    pub fn mean_free_path_from_volume(&self) -> f32 {
        if self.room_surface <= f32::EPSILON {
            0.0
        } else {
            4.0 * self.room_volume / self.room_surface
        }
    }

    pub fn max_t60(&self, speed_of_sound: f32) -> f32 {
        max_band(self.reverberation_time(speed_of_sound))
    }
}
