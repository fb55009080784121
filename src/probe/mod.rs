//! Environment-probe orchestration: ties the two ray-tracing passes
//! (§4.4, §4.7) together with the listener calculator (§4.5) into one
//! source's `Environment` (§4.5.6, §1 items 1-2).
//!
//! `run_probe` is what one `submit_probe` call does once its scheduler
//! tasks have joined — `world::AcousticWorld` is responsible for actually
//! fanning the per-direction work out across the scheduler and calling
//! this with the collected samples.

pub mod common;
pub mod direct_path;
pub mod environment;
pub mod listener;
pub mod room_estimate;
pub mod trace_sound_rays;
pub mod world_trace;

use crate::bvh::WorldBvh;
use crate::cache::CacheTolerance;
use crate::math::{fibonacci_sphere, Quat, Vec3};
use crate::scene::Component;

pub use common::RoomTotals;
pub use direct_path::{trace_direct_path, trace_direct_path_cached, DirectPath};
pub use environment::{Environment, Smoother};
pub use listener::{compute_listener_result, compute_room_estimate_listener_result, EaxReverbParams, ListenerTunables};
pub use room_estimate::{finish_room_estimate, run_room_estimate_ray, run_room_estimate_ray_cached, RoomEstimateHit, RoomEstimateSample};
pub use trace_sound_rays::{
    finish_trace_sound_rays, run_trace_sound_rays_direction, run_trace_sound_rays_direction_cached, TraceSoundRaysResult,
    TraceSoundRaysSample,
};
pub use world_trace::{closest_world_hit, closest_world_hit_facing, is_blocked, WorldHit};

use crate::config::{RoomEstimateConfig, TraceSoundRaysConfig};

/// Opaque handle returned by `submit_probe` (spec §6 `probe_handle`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProbeHandle(pub u64);

/// Everything `submit_probe` needs beyond listener state: the two
/// per-pass configs, the listener-stage tunables, and the distance past
/// which the cheaper `RoomEstimate` pass replaces full `TraceSoundRays`
/// (spec §4.7 "for sources far from the listener", left to the
/// implementation to define precisely — recorded as an open question in
/// `DESIGN.md`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeConfig {
    pub trace_sound_rays: TraceSoundRaysConfig,
    pub room_estimate: RoomEstimateConfig,
    pub listener: ListenerTunables,
    pub room_estimate_distance_threshold: f32,
    /// Back-step applied when walking the direct path, reusing
    /// `trace_sound_rays.back_step_distance` unless overridden.
    pub direct_path_back_step: f32,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        let trace_sound_rays = TraceSoundRaysConfig::default();
        Self {
            direct_path_back_step: trace_sound_rays.back_step_distance,
            trace_sound_rays,
            room_estimate: RoomEstimateConfig::default(),
            listener: ListenerTunables::default(),
            room_estimate_distance_threshold: 30.0,
        }
    }
}

/// One source's finished probe result (spec §6 `result(probe_handle)`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeResult {
    pub environment: Environment,
}

/// Runs one source's probe to completion against the current `world_bvh`
/// and `components`.
///
/// `source_position` is world-space; `world_bvh.listener_position()` is
/// subtracted from it up front so everything downstream works in
/// listener-relative space, matching `world_bvh`'s own frame. Chooses
/// between the cheap `RoomEstimate` pass and the full `TraceSoundRays`
/// pass based on distance to the listener (spec §4.7 "Purpose"). Does not
/// itself touch a `TaskScheduler` — see `world::AcousticWorld` for the
/// per-direction fan-out this wraps.
pub fn run_probe(
    world_bvh: &WorldBvh,
    components: &[Component],
    source_position: Vec3,
    listener_orientation: Quat,
    speed_of_sound: f32,
    config: &ProbeConfig,
) -> ProbeResult {
    run_probe_cached(
        world_bvh,
        components,
        source_position,
        listener_orientation,
        speed_of_sound,
        config,
        CacheTolerance::default(),
    )
}

/// Same as [`run_probe`] but with an explicit ray-cache tolerance —
/// `world::AcousticWorld::submit_probe` calls this with the tolerance built
/// from its `AcousticWorldDesc` rather than the spec default.
pub fn run_probe_cached(
    world_bvh: &WorldBvh,
    components: &[Component],
    source_position: Vec3,
    listener_orientation: Quat,
    speed_of_sound: f32,
    config: &ProbeConfig,
    cache_tolerance: CacheTolerance,
) -> ProbeResult {
    let relative_source = source_position - world_bvh.listener_position();
    let distance_to_listener = relative_source.length();

    let direct = if distance_to_listener <= f32::EPSILON {
        Ok(DirectPath::from_silent_source())
    } else {
        // `world_bvh`'s frame puts the listener at the origin (spec §4.3),
        // so the direct path is cast from there toward the source.
        trace_direct_path_cached(
            world_bvh,
            components,
            Vec3::ZERO,
            relative_source / distance_to_listener,
            distance_to_listener,
            config.direct_path_back_step,
            cache_tolerance,
        )
    };
    let direct = match direct {
        Ok(direct) => direct,
        Err(err) => {
            log::warn!("probe degraded: direct path cast {}", err);
            return ProbeResult {
                environment: Environment::degraded(),
            };
        }
    };

    let reverb = if distance_to_listener > config.room_estimate_distance_threshold {
        let directions = fibonacci_sphere(config.room_estimate.ray_count);
        let samples: crate::error::Result<Vec<RoomEstimateSample>> = directions
            .iter()
            .map(|&dir| run_room_estimate_ray_cached(world_bvh, components, Vec3::ZERO, dir, &config.room_estimate, cache_tolerance))
            .collect();
        let samples = match samples {
            Ok(samples) => samples,
            Err(err) => {
                log::warn!("probe degraded: room estimate cast {}", err);
                return ProbeResult {
                    environment: Environment::degraded(),
                };
            }
        };
        let totals = finish_room_estimate(&samples, &config.room_estimate);
        let mean_free_path = totals.mean_free_path_from_volume();
        compute_room_estimate_listener_result(&totals, mean_free_path, totals.hit_count, speed_of_sound, config.listener)
    } else {
        let directions = fibonacci_sphere(config.trace_sound_rays.ray_count);
        let mut rays = Vec::with_capacity(directions.len());
        let mut samples = Vec::with_capacity(directions.len());
        for &dir in &directions {
            let outcome =
                run_trace_sound_rays_direction_cached(world_bvh, components, Vec3::ZERO, dir, &config.trace_sound_rays, cache_tolerance);
            let (list, sample) = match outcome {
                Ok(outcome) => outcome,
                Err(err) => {
                    log::warn!("probe degraded: sound ray cast {}", err);
                    return ProbeResult {
                        environment: Environment::degraded(),
                    };
                }
            };
            rays.push(list);
            samples.push(sample);
        }
        let result = finish_trace_sound_rays(&samples);
        compute_listener_result(
            &rays,
            &result.room_totals,
            result.mean_free_path,
            config.trace_sound_rays.ray_count,
            listener_orientation,
            speed_of_sound,
            config.listener,
        )
    };

    ProbeResult {
        environment: Environment::new(direct, reverb, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_world_probe_is_silent_but_unblocked() {
        let world_bvh = WorldBvh::build(&[], Vec3::ZERO);
        let config = ProbeConfig::default();
        let result = run_probe(&world_bvh, &[], Vec3::new(5.0, 0.0, 0.0), Quat::IDENTITY, 343.0, &config);
        assert_eq!(result.environment.direct_gain, [1.0, 1.0, 1.0]);
        assert_eq!(result.environment.reverb.master_gain, 0.0);
    }

    #[test]
    fn a_source_at_the_listener_position_is_never_blocked() {
        let world_bvh = WorldBvh::build(&[], Vec3::ZERO);
        let config = ProbeConfig::default();
        let result = run_probe(&world_bvh, &[], Vec3::ZERO, Quat::IDENTITY, 343.0, &config);
        assert!(!result.environment.direct_gain.iter().any(|g| *g < 1.0));
    }
}
