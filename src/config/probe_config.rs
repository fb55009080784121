//! Per-probe tunables (spec §4.4 "Configuration (enumerated)" and §4.7).

/// Configuration for a single [`crate::probe::trace_sound_rays::TraceSoundRays`] task batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceSoundRaysConfig {
    /// Number of pre-generated unit directions (spherical Fibonacci).
    pub ray_count: usize,
    /// Maximum cumulative path length per ray, meters.
    pub range: f32,
    /// Rays whose total path is below this are skipped (not contributed
    /// to room totals or the impulse list).
    pub add_ray_min_length: f32,
    /// Hard cap on reflection bounces.
    pub max_bounce: u32,
    /// Hard cap on transmitted segments per ray.
    pub max_transmit: u32,
    /// Starting stride length for the stepwise cast, meters.
    pub initial_ray_length: f32,
    /// Ray dies once `max(gain * attenuation)` across bands drops below this.
    pub threshold_reflect: f32,
    /// Same threshold applied before spawning a transmitted child.
    pub threshold_transmit: f32,
    /// Length used by the final "is this ray outside?" check.
    pub detect_outside_length: f32,
    /// Back-step applied before spawning a continuation ray, to dodge
    /// self-intersection with the face just hit.
    pub back_step_distance: f32,
    /// Empirical Lambert grazing-angle scale-up factor (spec §9 open
    /// question: "not physically derived", exposed here as a tunable).
    pub lambert_scale: f32,
}

impl Default for TraceSoundRaysConfig {
    fn default() -> Self {
        Self {
            ray_count: 162,
            range: 60.0,
            add_ray_min_length: 0.2,
            max_bounce: 20,
            max_transmit: 2,
            initial_ray_length: 10.0,
            threshold_reflect: 1e-3,
            threshold_transmit: 1e-3,
            detect_outside_length: 60.0,
            back_step_distance: 1e-4,
            lambert_scale: 2.0,
        }
    }
}

/// Configuration for the cheaper single-hit [`crate::probe::room_estimate::RoomEstimate`] pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoomEstimateConfig {
    pub ray_count: usize,
    pub range: f32,
    pub lambert_scale: f32,
}

impl Default for RoomEstimateConfig {
    fn default() -> Self {
        Self {
            ray_count: 64,
            range: 60.0,
            lambert_scale: 2.0,
        }
    }
}
