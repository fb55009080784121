//! Listener sphere-gathering and EAX reverb parameter mapping (spec §4.5).
//!
//! Consumes the pooled `SoundRayList` produced by `TraceSoundRays` and the
//! merged `RoomTotals`, and reduces them to the handful of scalars and two
//! pan vectors an OpenAL-style reverb effect slot expects.

use crate::math::{Bands, Quat, Vec3};
use crate::probe::common::{distance_attenuation, RoomTotals};
use crate::rays::SoundRayList;

/// EAX-style reverb parameters, clamped to the hardware ranges named in
/// spec.md §6.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EaxReverbParams {
    pub master_gain: f32,
    pub gain_lf: f32,
    pub gain_hf: f32,
    pub decay_time: f32,
    pub decay_lf_ratio: f32,
    pub decay_hf_ratio: f32,
    pub reflections_gain: f32,
    pub reflections_delay: f32,
    pub late_reverb_gain: f32,
    pub late_reverb_delay: f32,
    pub echo_time: f32,
    pub reflections_pan: Vec3,
    pub late_reverb_pan: Vec3,
}

impl EaxReverbParams {
    /// The "nothing here" result (spec.md §8 scenario 1: an empty world
    /// with no reflections at all).
    pub fn silent() -> Self {
        Self {
            master_gain: 0.0,
            gain_lf: 0.0,
            gain_hf: 0.0,
            decay_time: 0.1,
            decay_lf_ratio: 1.0,
            decay_hf_ratio: 1.0,
            reflections_gain: 0.0,
            reflections_delay: 0.0,
            late_reverb_gain: 0.0,
            late_reverb_delay: 0.0,
            echo_time: 0.075,
            reflections_pan: Vec3::ZERO,
            late_reverb_pan: Vec3::ZERO,
        }
    }
}

/// User-facing scale factors applied to the raw reflections/late-reverb
/// energy ratios before they're handed to the effect slot (spec.md §4.5
/// step 5's "user-factor").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListenerTunables {
    pub reflections_factor: f32,
    pub late_reverb_factor: f32,
}

impl Default for ListenerTunables {
    fn default() -> Self {
        Self {
            reflections_factor: 1.0,
            late_reverb_factor: 1.0,
        }
    }
}

struct Accumulator {
    reflected_gain: Bands,
    reverberation_gain: Bands,
    reflection_delay: f32,
    reverberation_delay: f32,
    reflection_pan: Vec3,
    reverberation_pan: Vec3,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            reflected_gain: [0.0; 3],
            reverberation_gain: [0.0; 3],
            reflection_delay: f32::MAX,
            reverberation_delay: f32::MAX,
            reflection_pan: Vec3::ZERO,
            reverberation_pan: Vec3::ZERO,
        }
    }
}

/// Gathers every segment within sphere radius `r` of the listener
/// (listener sits at the coordinate-frame origin, matching the rest of
/// `probe`'s listener-relative convention) and folds it into reflected vs.
/// reverberant energy (spec.md §4.5 steps 1-3).
fn gather(rays: &[SoundRayList], radius: f32, speed_of_sound: f32) -> Accumulator {
    let mut acc = Accumulator::new();

    for list in rays {
        for ray in list.iter_rays() {
        for segment in list.ray_segments(ray) {
            if segment.bounces == 0 {
                // The initial cast before any reflection is the direct
                // path, handled separately by `direct_path`.
                continue;
            }

            let t = (-segment.origin).dot(segment.direction);
            if t < 0.0 || t > segment.length {
                continue;
            }
            let q = segment.origin + segment.direction * t;
            let dist = q.length();
            if dist > radius {
                continue;
            }

            let path_length = segment.distance_from_ray_start + t;
            let time = (segment.distance_from_ray_start + t - radius) / speed_of_sound;
            let mut band_sum = 0.0;
            let mut gains = [0.0; 3];
            for b in 0..3 {
                gains[b] = segment.gain_on_entry[b] * distance_attenuation(path_length);
                band_sum += gains[b];
            }
            let pan_dir = if dist > f32::EPSILON { q / dist } else { Vec3::ZERO };
            let pan_contribution = pan_dir * band_sum;

            if segment.bounces == 1 {
                for b in 0..3 {
                    acc.reflected_gain[b] += gains[b];
                }
                acc.reflection_delay = acc.reflection_delay.min(time.max(0.0));
                acc.reflection_pan += pan_contribution;
            } else {
                for b in 0..3 {
                    acc.reverberation_gain[b] += gains[b];
                }
                acc.reverberation_delay = acc.reverberation_delay.min(time.max(0.0));
                acc.reverberation_pan += pan_contribution;
            }
        }
        }
    }

    if acc.reflection_delay == f32::MAX {
        acc.reflection_delay = 0.0;
    }
    if acc.reverberation_delay == f32::MAX {
        acc.reverberation_delay = acc.reflection_delay + 0.001;
    } else {
        acc.reverberation_delay = acc.reverberation_delay.max(acc.reflection_delay + 0.001);
    }

    acc
}

/// Scales a weighted-sum pan vector down to unit length, keeping its
/// direction, or returns zero when there was nothing to average (spec.md
/// §6 "pan vectors: length ≤ 1").
fn normalize_pan(sum: Vec3, listener_orientation: Quat) -> Vec3 {
    let local = listener_orientation.inverse() * sum;
    let len = local.length();
    if len <= 1.0 {
        local
    } else {
        local / len
    }
}

/// Reduces one probe's traced rays into EAX reverb parameters (spec.md
/// §4.5 steps 1, 4-5). `rays` holds one `SoundRayList` per direction task
/// (spec §5: "SoundRayList: one per task; never shared"). `mean_free_path`
/// and `room_totals` come from `trace_sound_rays::finish_trace_sound_rays`.
pub fn compute_listener_result(
    rays: &[SoundRayList],
    room_totals: &RoomTotals,
    mean_free_path: f32,
    ray_count: usize,
    listener_orientation: Quat,
    speed_of_sound: f32,
    tunables: ListenerTunables,
) -> EaxReverbParams {
    if ray_count == 0 || mean_free_path <= 0.0 {
        return EaxReverbParams::silent();
    }

    let radius = mean_free_path * (2.0 * std::f32::consts::PI / ray_count as f32).sqrt();
    let acc = gather(rays, radius, speed_of_sound);

    let decay_time_bands = room_totals.reverberation_time(speed_of_sound);
    let decay_time = crate::math::max_band(decay_time_bands);

    let reflected_max = crate::math::max_band(acc.reflected_gain);
    let reverb_max = crate::math::max_band(acc.reverberation_gain);
    let master_gain = reflected_max.max(reverb_max).clamp(0.0, 1.0);
    let reference_gain = master_gain.max(1e-6);

    let gain_lf = (acc.reflected_gain[0].max(acc.reverberation_gain[0]) / reference_gain).clamp(0.0, 1.0);
    let gain_hf = (acc.reflected_gain[2].max(acc.reverberation_gain[2]) / reference_gain).clamp(0.0, 1.0);

    let decay_lf_ratio = (decay_time_bands[0] / decay_time).clamp(0.1, 2.0);
    let decay_hf_ratio = (decay_time_bands[2] / decay_time).clamp(0.1, 2.0);

    let reflections_gain = (reflected_max / reference_gain * tunables.reflections_factor).clamp(0.0, 3.16);
    let late_reverb_gain = (reverb_max / reference_gain * tunables.late_reverb_factor).clamp(0.0, 10.0);

    let echo_time = (mean_free_path / speed_of_sound).clamp(0.075, 0.25);

    EaxReverbParams {
        master_gain,
        gain_lf,
        gain_hf,
        decay_time: decay_time.clamp(0.1, 20.0),
        decay_lf_ratio,
        decay_hf_ratio,
        reflections_gain,
        reflections_delay: acc.reflection_delay.clamp(0.0, 0.3),
        late_reverb_gain,
        late_reverb_delay: acc.reverberation_delay.clamp(0.0, 0.1),
        echo_time,
        reflections_pan: normalize_pan(acc.reflection_pan, listener_orientation),
        late_reverb_pan: normalize_pan(acc.reverberation_pan, listener_orientation),
    }
}

/// Cheaper counterpart to [`compute_listener_result`] for sources handled
/// by the single-hit `RoomEstimate` pass (spec §4.7 "Aggregation" — the
/// RoomEstimate finish task "derives T60, meanFreePath, echoDelay, and a
/// split-time" directly from the room totals, with no per-segment
/// reflected/late split to sphere-gather). Without bounce segments there
/// is no directional pan information, so the pan vectors are left at
/// zero; this is recorded as a deliberate simplification in `DESIGN.md`.
pub fn compute_room_estimate_listener_result(
    room_totals: &RoomTotals,
    mean_free_path: f32,
    hit_count: u32,
    speed_of_sound: f32,
    tunables: ListenerTunables,
) -> EaxReverbParams {
    if hit_count == 0 || mean_free_path <= 0.0 {
        return EaxReverbParams::silent();
    }

    let decay_time_bands = room_totals.reverberation_time(speed_of_sound);
    let decay_time = crate::math::max_band(decay_time_bands);

    let avg_absorption = {
        let mut bands = room_totals.avg_absorption;
        for b in bands.iter_mut() {
            *b /= hit_count as f32;
        }
        bands
    };
    let master_gain = (1.0 - crate::math::max_band(avg_absorption)).clamp(0.0, 1.0);
    let reference_gain = master_gain.max(1e-6);

    let gain_lf = ((1.0 - avg_absorption[0]).max(0.0) / reference_gain).clamp(0.0, 1.0);
    let gain_hf = ((1.0 - avg_absorption[2]).max(0.0) / reference_gain).clamp(0.0, 1.0);

    let decay_lf_ratio = (decay_time_bands[0] / decay_time).clamp(0.1, 2.0);
    let decay_hf_ratio = (decay_time_bands[2] / decay_time).clamp(0.1, 2.0);

    let echo_time = (mean_free_path / speed_of_sound).clamp(0.075, 0.25);
    let reflections_delay = echo_time.clamp(0.0, 0.3);
    let late_reverb_delay = (reflections_delay + 0.001).clamp(0.0, 0.1);

    EaxReverbParams {
        master_gain,
        gain_lf,
        gain_hf,
        decay_time: decay_time.clamp(0.1, 20.0),
        decay_lf_ratio,
        decay_hf_ratio,
        reflections_gain: (tunables.reflections_factor).clamp(0.0, 3.16),
        reflections_delay,
        late_reverb_gain: (tunables.late_reverb_factor).clamp(0.0, 10.0),
        late_reverb_delay,
        echo_time,
        reflections_pan: Vec3::ZERO,
        late_reverb_pan: Vec3::ZERO,
    }
}
