//! `TraceSoundRays`: the full per-ray propagation pass — reflection
//! bounces, material transmission through thin surfaces, and the room
//! totals/mean-free-path statistics the listener stage needs (spec §4.4).

use crate::bvh::{Facing, WorldBvh};
use crate::cache::CacheTolerance;
use crate::config::TraceSoundRaysConfig;
use crate::error::Result;
use crate::math::{linear_step, max_band, reflect, Bands, Vec3};
use crate::probe::common::RoomTotals;
use crate::probe::world_trace::{closest_world_hit, closest_world_hit_facing, is_blocked};
use crate::rays::{Segment, SoundRay, SoundRayList};
use crate::scene::material::Material;
use crate::scene::Component;

/// A texture index with no entry in the table is treated as fully
/// blocking, matching `Component::is_blocking`'s default.
const UNKNOWN_TEXTURE_MATERIAL: Material = Material {
    absorption: [1.0, 1.0, 1.0],
    transmission_thickness: [0.0, 0.0, 0.0],
};

/// One probe direction's contribution to the aggregate room acoustics and
/// mean free path, folded together by `finish_trace_sound_rays` (spec §4.4
/// "Room totals computed on the first hit per ray").
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceSoundRaysSample {
    pub room_totals: RoomTotals,
    pub bounce_length_sum: f32,
    pub bounce_segment_count: u32,
}

impl TraceSoundRaysSample {
    fn merge(&mut self, other: &TraceSoundRaysSample) {
        self.room_totals.merge(&other.room_totals);
        self.bounce_length_sum += other.bounce_length_sum;
        self.bounce_segment_count += other.bounce_segment_count;
    }
}

fn material_of(components: &[Component], component_index: u32, texture_index: u16) -> Material {
    components[component_index as usize]
        .materials()
        .get(texture_index)
        .copied()
        .unwrap_or(UNKNOWN_TEXTURE_MATERIAL)
}

fn is_outside(world_bvh: &WorldBvh, components: &[Component], origin: Vec3, direction: Vec3, config: &TraceSoundRaysConfig) -> bool {
    !is_blocked(world_bvh, components, origin, direction, config.detect_outside_length)
}

/// Traces one ray (root or transmitted child) to completion: stepping hit
/// to hit until it runs out of budget, drops below threshold, or hits
/// `max_bounce`. Returns the finished ray plus its segments, and appends
/// any transmitted children it spawns to `spawned` for the caller to trace
/// in turn (spec §4.4 steps 1-6).
fn trace_chain(
    world_bvh: &WorldBvh,
    components: &[Component],
    mut ray: SoundRay,
    config: &TraceSoundRaysConfig,
    cache_tolerance: CacheTolerance,
    sample: &mut TraceSoundRaysSample,
    spawned: &mut Vec<SoundRay>,
) -> Result<(SoundRay, Vec<Segment>)> {
    let mut segments = Vec::new();
    let mut current_origin = ray.origin;
    let mut current_dir = ray.direction;

    loop {
        let remaining = config.range - ray.total_length;
        if remaining <= 0.0 {
            ray.outside = is_outside(world_bvh, components, current_origin, current_dir, config);
            break;
        }

        let Some(hit) = closest_world_hit(world_bvh, components, current_origin, current_dir, remaining, cache_tolerance)? else {
            ray.outside = is_outside(world_bvh, components, current_origin, current_dir, config);
            break;
        };

        segments.push(Segment {
            origin: current_origin,
            direction: current_dir,
            length: hit.distance,
            distance_from_ray_start: ray.total_length,
            gain_on_entry: ray.gain,
            bounces: ray.bounce_count,
        });

        if ray.bounce_count == 0 {
            let cos_theta_out = (-current_dir).dot(hit.normal);
            let absorption = material_of(components, hit.component_index, hit.texture_index).absorption;
            sample
                .room_totals
                .accumulate_hit(hit.distance, cos_theta_out, absorption, config.lambert_scale);
        } else {
            sample.bounce_length_sum += hit.distance;
            sample.bounce_segment_count += 1;
        }

        ray.total_length += hit.distance;
        let hit_point_relative = hit.point - world_bvh.listener_position();
        let material = material_of(components, hit.component_index, hit.texture_index);

        let mut transmitted_gain: Bands = [0.0, 0.0, 0.0];
        if ray.transmit_count < config.max_transmit {
            let max_penetration = max_band(material.transmission_thickness);
            if max_penetration.is_finite() && max_penetration > 0.0 {
                let probe_origin = hit_point_relative + current_dir * config.back_step_distance;
                if let Some(back_hit) = closest_world_hit_facing(
                    world_bvh,
                    components,
                    probe_origin,
                    current_dir,
                    max_penetration,
                    Facing::PositiveDot,
                    cache_tolerance,
                )? {
                    // Only a back face of the same component counts as "through
                    // this wall" — a different component within penetration
                    // range is a separate surface, not this one's far side.
                    if back_hit.component_index == hit.component_index {
                        let t = back_hit.distance;
                        let mut candidate = [0.0; 3];
                        for b in 0..3 {
                            candidate[b] = linear_step(
                                t,
                                0.0,
                                material.transmission_thickness[b],
                                ray.gain[b] * (1.0 - material.absorption[b]),
                                0.0,
                            );
                        }
                        if max_band(candidate) >= config.threshold_transmit {
                            transmitted_gain = candidate;
                            let child_origin = back_hit.point - world_bvh.listener_position()
                                + current_dir * config.back_step_distance;
                            let mut child = SoundRay::new(
                                child_origin,
                                current_dir,
                                config.range - (ray.total_length + t),
                            );
                            child.gain = transmitted_gain;
                            child.transmit_count = ray.transmit_count + 1;
                            spawned.push(child);
                        }
                    }
                }
            }
        }

        let new_dir = reflect(current_dir, hit.normal);
        let mut new_gain = [0.0; 3];
        for b in 0..3 {
            new_gain[b] = ((1.0 - material.absorption[b]) * ray.gain[b] - transmitted_gain[b]).max(0.0);
            ray.absorption_sum[b] += material.absorption[b] * ray.gain[b];
        }

        if max_band(new_gain) < config.threshold_reflect
            || ray.bounce_count + 1 >= config.max_bounce
            || ray.total_length >= config.range
        {
            ray.outside = is_outside(world_bvh, components, hit_point_relative, current_dir, config);
            break;
        }

        ray.bounce_count += 1;
        ray.gain = new_gain;
        current_dir = new_dir;
        current_origin = hit_point_relative + new_dir * config.back_step_distance;
    }

    Ok((ray, segments))
}

/// Traces one probe direction to completion — the root ray and every
/// transmitted child it spawns — into a freshly owned `SoundRayList` (spec
/// §5 "SoundRayList: one per task; never shared" — each direction is its
/// own `TraceSoundRays` task and therefore owns its own list).
pub fn run_trace_sound_rays_direction(
    world_bvh: &WorldBvh,
    components: &[Component],
    origin: Vec3,
    direction: Vec3,
    config: &TraceSoundRaysConfig,
) -> (SoundRayList, TraceSoundRaysSample) {
    run_trace_sound_rays_direction_cached(world_bvh, components, origin, direction, config, CacheTolerance::default())
        // See `trace_direct_path`'s wrapper for why this degrades instead of
        // propagating: no `Result` to hand it to here, and a hit-cap
        // overflow is vanishingly unlikely against real geometry.
        .unwrap_or_else(|_| (SoundRayList::new(), TraceSoundRaysSample::default()))
}

/// Same as [`run_trace_sound_rays_direction`] but with an explicit ray-cache
/// tolerance, used by `probe::run_probe` with the value from
/// `AcousticWorldDesc` rather than the spec default. Errs if a component's
/// ray cast overflows its hit cap (spec §7); `probe::run_probe_cached` folds
/// that into the probe's `degraded` flag.
pub fn run_trace_sound_rays_direction_cached(
    world_bvh: &WorldBvh,
    components: &[Component],
    origin: Vec3,
    direction: Vec3,
    config: &TraceSoundRaysConfig,
    cache_tolerance: CacheTolerance,
) -> Result<(SoundRayList, TraceSoundRaysSample)> {
    let mut sample = TraceSoundRaysSample::default();
    let mut rays = SoundRayList::new();
    let root = SoundRay::new(origin, direction, config.range);

    let mut pending = vec![(root, true)];
    while let Some((ray, is_root)) = pending.pop() {
        let mut spawned = Vec::new();
        let (finished, segments) = trace_chain(world_bvh, components, ray, config, cache_tolerance, &mut sample, &mut spawned)?;
        if segments.is_empty() && finished.total_length < config.add_ray_min_length {
            // A ray that never travels far enough to matter still needs to
            // be accounted for in the pending queue bookkeeping, but is not
            // worth keeping in the list (spec §4.4 `addRayMinLength`).
        } else if is_root {
            rays.finish_root(finished, segments);
        } else {
            rays.finish_child(finished, segments);
        }
        for child in spawned {
            pending.push((child, false));
        }
    }

    Ok((rays, sample))
}

/// Final reduction across every probe direction: merged room totals plus
/// the mean free path (spec §4.4 "meanFreePath accumulates bounce segment
/// lengths"; falls back to the classic `4V/S` estimate when no ray ever
/// bounced, e.g. a fully open scene).
#[derive(Debug, Clone, Copy)]
pub struct TraceSoundRaysResult {
    pub room_totals: RoomTotals,
    pub mean_free_path: f32,
}

pub fn finish_trace_sound_rays(samples: &[TraceSoundRaysSample]) -> TraceSoundRaysResult {
    let mut total = TraceSoundRaysSample::default();
    for sample in samples {
        total.merge(sample);
    }

    let mean_free_path = if total.bounce_segment_count > 0 {
        total.bounce_length_sum / total.bounce_segment_count as f32
    } else {
        total.room_totals.mean_free_path_from_volume()
    };

    TraceSoundRaysResult {
        room_totals: total.room_totals,
        mean_free_path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Mat4;
    use crate::scene::material::MaterialTable;
    use crate::scene::model::Model;
    use std::sync::Arc;

    /// A large wall in the YZ plane at `x`, wound so its normal points
    /// toward `-X` — the front face for a ray traveling in `+X`.
    fn wall_facing_negative_x(x: f32, material: Material) -> Component {
        let model = Arc::new(
            Model::new(&[(
                [
                    Vec3::new(x, -10.0, -10.0),
                    Vec3::new(x, -10.0, 10.0),
                    Vec3::new(x, 10.0, -10.0),
                ],
                0,
            )])
            .unwrap(),
        );
        let mut materials = MaterialTable::new();
        materials.add(material);
        Component::new(model, Mat4::IDENTITY, materials)
    }

    #[test]
    fn a_single_wall_produces_one_bounce_and_terminates_outside() {
        let components = vec![wall_facing_negative_x(2.0, Material::CONCRETE)];
        let world_bvh = WorldBvh::build(&components, Vec3::ZERO);
        let config = TraceSoundRaysConfig {
            range: 20.0,
            max_bounce: 5,
            ..TraceSoundRaysConfig::default()
        };

        let (rays, sample) = run_trace_sound_rays_direction(&world_bvh, &components, Vec3::ZERO, Vec3::X, &config);

        assert_eq!(sample.room_totals.hit_count, 1);
        assert_eq!(rays.roots().len(), 1);
        let root = &rays.roots()[0];
        assert!(root.segment_count >= 1);
        assert!(root.outside);
    }

    #[test]
    fn a_thin_wall_spawns_a_transmitted_child_ray() {
        // Two faces of the same component, 3 cm apart, bracketing a wall
        // whose transmission thickness comfortably exceeds that gap.
        let thin = Material {
            absorption: [0.05, 0.05, 0.05],
            transmission_thickness: [0.5, 0.5, 0.5],
        };
        let model = Arc::new(
            Model::new(&[
                (
                    [
                        Vec3::new(1.0, -10.0, -10.0),
                        Vec3::new(1.0, -10.0, 10.0),
                        Vec3::new(1.0, 10.0, -10.0),
                    ],
                    0,
                ),
                (
                    [
                        Vec3::new(1.03, -10.0, -10.0),
                        Vec3::new(1.03, 10.0, -10.0),
                        Vec3::new(1.03, -10.0, 10.0),
                    ],
                    0,
                ),
            ])
            .unwrap(),
        );
        let mut materials = MaterialTable::new();
        materials.add(thin);
        let component = Component::new(model, Mat4::IDENTITY, materials);
        let components = vec![component];
        let world_bvh = WorldBvh::build(&components, Vec3::ZERO);
        let config = TraceSoundRaysConfig {
            range: 20.0,
            max_bounce: 3,
            max_transmit: 1,
            threshold_transmit: 1e-4,
            ..TraceSoundRaysConfig::default()
        };

        let (rays, _sample) = run_trace_sound_rays_direction(&world_bvh, &components, Vec3::ZERO, Vec3::X, &config);

        assert_eq!(rays.children().len(), 1);
        let child = &rays.children()[0];
        assert_eq!(child.transmit_count, 1);
        assert!(max_band(child.gain) > 0.0);
    }

    #[test]
    fn finish_falls_back_to_volume_estimate_with_no_bounces() {
        let samples = vec![TraceSoundRaysSample {
            room_totals: RoomTotals {
                room_volume: 1000.0,
                room_surface: 200.0,
                ..RoomTotals::default()
            },
            bounce_length_sum: 0.0,
            bounce_segment_count: 0,
        }];
        let result = finish_trace_sound_rays(&samples);
        assert!((result.mean_free_path - 20.0).abs() < 1e-3);
    }
}
