//! Direct-path transmission gain between a source and the listener (spec
//! §1 "Direct-path transmission gains", §8 scenarios 2 and 5).
//!
//! Unlike `TraceSoundRays`, this never reflects — it walks the straight
//! line from source to listener, multiplying in the transmission factor
//! of every material the line passes through, and reports "blocked" the
//! moment it meets a surface with no matching exit face within that
//! material's penetration range.

use crate::bvh::Facing;
use crate::cache::CacheTolerance;
use crate::error::Result;
use crate::math::{linear_step, max_band, Bands, Vec3};
use crate::probe::world_trace::{closest_world_hit, closest_world_hit_facing};
use crate::scene::material::Material;
use crate::scene::Component;

const MAX_SURFACES: u32 = 32;

/// Per-band transmission gain plus its EAX-style band-pass decomposition:
/// a reference (mid-band) scalar gain and the low/high ratios relative to
/// it, matching OpenAL's `Gain` + `GainHF` filter shape extended to three
/// bands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectPath {
    pub gain: Bands,
    pub bandpass_gain: f32,
    pub bandpass_lf: f32,
    pub bandpass_hf: f32,
    /// True once the line of sight met an opaque surface with no back
    /// face within penetration range (spec.md §8 scenario 1: the empty
    /// world leaves this false and `gain == [1,1,1]`).
    pub blocked: bool,
}

impl DirectPath {
    /// Unit gain, unblocked — used when source and listener coincide and
    /// there is no line to trace.
    pub fn from_silent_source() -> Self {
        Self::from_gain([1.0, 1.0, 1.0], false)
    }

    fn from_gain(gain: Bands, blocked: bool) -> Self {
        let reference = gain[1].max(1e-6);
        Self {
            gain,
            bandpass_gain: gain[1],
            bandpass_lf: gain[0] / reference,
            bandpass_hf: gain[2] / reference,
            blocked,
        }
    }
}

/// Casts the line from `origin` to `origin + direction * distance`
/// (listener-relative, matching `world_bvh`'s frame), threading gain
/// through every material boundary it crosses.
pub fn trace_direct_path(
    world_bvh: &crate::bvh::WorldBvh,
    components: &[Component],
    origin: Vec3,
    direction: Vec3,
    distance: f32,
    back_step_distance: f32,
) -> DirectPath {
    trace_direct_path_cached(world_bvh, components, origin, direction, distance, back_step_distance, CacheTolerance::default())
        // A hit-cap overflow is vanishingly unlikely against real geometry
        // (see `MAX_HITS_PER_CAST`); callers of this non-cached wrapper have
        // no `Result` to propagate to, so it degrades to fully blocked.
        .unwrap_or_else(|_| DirectPath::from_gain([0.0, 0.0, 0.0], true))
}

/// Same as [`trace_direct_path`] but with an explicit ray-cache tolerance,
/// used by callers (`probe::run_probe`) that already have one from
/// `AcousticWorldDesc` rather than the spec default. Errs if a component's
/// ray cast overflows its hit cap (spec §7); `probe::run_probe_cached` folds
/// that into the probe's `degraded` flag.
pub fn trace_direct_path_cached(
    world_bvh: &crate::bvh::WorldBvh,
    components: &[Component],
    origin: Vec3,
    direction: Vec3,
    distance: f32,
    back_step_distance: f32,
    cache_tolerance: CacheTolerance,
) -> Result<DirectPath> {
    let mut gain: Bands = [1.0, 1.0, 1.0];
    let mut traveled = 0.0;
    let mut current_origin = origin;

    for _ in 0..MAX_SURFACES {
        let remaining = distance - traveled;
        if remaining <= 0.0 {
            break;
        }

        let Some(hit) = closest_world_hit(world_bvh, components, current_origin, direction, remaining, cache_tolerance)? else {
            break;
        };

        let material = components[hit.component_index as usize]
            .materials()
            .get(hit.texture_index)
            .copied()
            .unwrap_or(Material {
                absorption: [1.0, 1.0, 1.0],
                transmission_thickness: [0.0, 0.0, 0.0],
            });

        let max_penetration = max_band(material.transmission_thickness);
        if !max_penetration.is_finite() {
            // An infinitely thick material (the OPEN preset, a portal with
            // no real surface) never has an exit face to find — it simply
            // isn't there for transmission purposes, so the ray passes
            // straight through with plain `1 - absorption` and keeps going
            // from the hit point itself.
            for b in 0..3 {
                gain[b] *= 1.0 - material.absorption[b];
            }
            traveled += hit.distance;
            current_origin = hit.point - world_bvh.listener_position() + direction * back_step_distance;
            if max_band(gain) <= 0.0 {
                return Ok(DirectPath::from_gain([0.0, 0.0, 0.0], true));
            }
            continue;
        }
        if max_penetration <= 0.0 {
            // A genuinely zero-thickness wall still attenuates by
            // `1 - absorption` — look for an (effectively coincident)
            // back face at `t == 0` before giving up.
            let probe_origin = hit.point - world_bvh.listener_position();
            let epsilon = back_step_distance.max(1e-4) * 10.0;
            if let Some(back_hit) = closest_world_hit_facing(
                world_bvh,
                components,
                probe_origin,
                direction,
                epsilon,
                Facing::PositiveDot,
                cache_tolerance,
            )? {
                if back_hit.component_index == hit.component_index {
                    for b in 0..3 {
                        gain[b] *= 1.0 - material.absorption[b];
                    }
                    traveled += hit.distance;
                    current_origin = back_hit.point - world_bvh.listener_position() + direction * back_step_distance;
                    continue;
                }
            }
            return Ok(DirectPath::from_gain([0.0, 0.0, 0.0], true));
        }

        let probe_origin = hit.point - world_bvh.listener_position() + direction * back_step_distance;
        let Some(back_hit) = closest_world_hit_facing(
            world_bvh,
            components,
            probe_origin,
            direction,
            max_penetration,
            Facing::PositiveDot,
            cache_tolerance,
        )?
        else {
            return Ok(DirectPath::from_gain([0.0, 0.0, 0.0], true));
        };
        if back_hit.component_index != hit.component_index {
            return Ok(DirectPath::from_gain([0.0, 0.0, 0.0], true));
        }

        let t = back_hit.distance;
        for b in 0..3 {
            gain[b] *= linear_step(
                t,
                0.0,
                material.transmission_thickness[b],
                1.0 - material.absorption[b],
                0.0,
            );
        }

        traveled += hit.distance + t;
        current_origin = back_hit.point - world_bvh.listener_position() + direction * back_step_distance;

        if max_band(gain) <= 0.0 {
            return Ok(DirectPath::from_gain([0.0, 0.0, 0.0], true));
        }
    }

    Ok(DirectPath::from_gain(gain, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bvh::WorldBvh;
    use crate::math::Mat4;
    use crate::scene::material::MaterialTable;
    use crate::scene::model::Model;
    use std::sync::Arc;

    fn thin_wall_component(x: f32, thickness: f32, material: Material) -> Component {
        let model = Arc::new(
            Model::new(&[
                (
                    [
                        Vec3::new(x, -10.0, -10.0),
                        Vec3::new(x, -10.0, 10.0),
                        Vec3::new(x, 10.0, -10.0),
                    ],
                    0,
                ),
                (
                    [
                        Vec3::new(x + thickness, -10.0, -10.0),
                        Vec3::new(x + thickness, 10.0, -10.0),
                        Vec3::new(x + thickness, -10.0, 10.0),
                    ],
                    0,
                ),
            ])
            .unwrap(),
        );
        let mut materials = MaterialTable::new();
        materials.add(material);
        Component::new(model, Mat4::IDENTITY, materials)
    }

    #[test]
    fn empty_world_passes_through_with_unit_gain() {
        let world_bvh = WorldBvh::build(&[], Vec3::ZERO);
        let result = trace_direct_path(&world_bvh, &[], Vec3::ZERO, Vec3::X, 5.0, 1e-4);
        assert_eq!(result.gain, [1.0, 1.0, 1.0]);
        assert!(!result.blocked);
    }

    #[test]
    fn zero_thickness_wall_applies_plain_one_minus_absorption() {
        let material = Material {
            absorption: [0.5, 0.5, 0.5],
            transmission_thickness: [0.0, 0.0, 0.0],
        };
        let components = vec![thin_wall_component(1.0, 0.0, material)];
        let world_bvh = WorldBvh::build(&components, Vec3::ZERO);
        let result = trace_direct_path(&world_bvh, &components, Vec3::ZERO, Vec3::X, 2.0, 1e-4);
        for b in 0..3 {
            assert!((result.gain[b] - 0.5).abs() < 1e-3);
        }
        assert!(!result.blocked);
    }

    #[test]
    fn thick_wall_attenuates_per_band_linearly() {
        let material = Material {
            absorption: [0.01, 0.01, 0.01],
            transmission_thickness: [0.3, 0.1, 0.05],
        };
        let components = vec![thin_wall_component(1.0, 0.1, material)];
        let world_bvh = WorldBvh::build(&components, Vec3::ZERO);
        let result = trace_direct_path(&world_bvh, &components, Vec3::ZERO, Vec3::X, 3.0, 1e-4);
        assert!((result.gain[0] - 0.653).abs() < 0.02);
        assert!(result.gain[1] < 1e-3);
        assert!(result.gain[2] < 1e-3);
    }

    #[test]
    fn open_portal_material_passes_through_unblocked() {
        let components = vec![thin_wall_component(1.0, 0.0, Material::OPEN)];
        let world_bvh = WorldBvh::build(&components, Vec3::ZERO);
        let result = trace_direct_path(&world_bvh, &components, Vec3::ZERO, Vec3::X, 5.0, 1e-4);
        assert!(!result.blocked);
        assert_eq!(result.gain, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn opaque_wall_with_no_exit_face_blocks_entirely() {
        let model = Arc::new(
            Model::new(&[(
                [
                    Vec3::new(1.0, -10.0, -10.0),
                    Vec3::new(1.0, -10.0, 10.0),
                    Vec3::new(1.0, 10.0, -10.0),
                ],
                0,
            )])
            .unwrap(),
        );
        let mut materials = MaterialTable::new();
        materials.add(Material::CONCRETE);
        let components = vec![Component::new(model, Mat4::IDENTITY, materials)];
        let world_bvh = WorldBvh::build(&components, Vec3::ZERO);
        let result = trace_direct_path(&world_bvh, &components, Vec3::ZERO, Vec3::X, 3.0, 1e-4);
        assert!(result.blocked);
        assert_eq!(result.gain, [0.0, 0.0, 0.0]);
    }
}
