//! `RoomEstimate`: a cheap single-hit-per-direction pass, and
//! `RoomEstimateFinish`, its aggregator (spec §4.7).

use crate::cache::CacheTolerance;
use crate::config::RoomEstimateConfig;
use crate::error::Result;
use crate::math::Vec3;
use crate::probe::common::RoomTotals;
use crate::probe::world_trace::closest_world_hit;
use crate::scene::Component;

/// One direction's result. `None` carries no information beyond "this ray
/// never hit anything within range" — `RoomEstimateFinish` decides what
/// that means (spec §4.7: treated as absorption 1 at range).
pub type RoomEstimateSample = Option<RoomEstimateHit>;

#[derive(Debug, Clone, Copy)]
pub struct RoomEstimateHit {
    pub distance: f32,
    pub cos_theta_out: f32,
    pub absorption: crate::math::Bands,
}

/// Runs one direction of the `RoomEstimate` pass. `origin` is
/// listener-relative, matching `world_bvh`'s frame.
pub fn run_room_estimate_ray(
    world_bvh: &crate::bvh::WorldBvh,
    components: &[Component],
    origin: Vec3,
    direction: Vec3,
    config: &RoomEstimateConfig,
) -> RoomEstimateSample {
    run_room_estimate_ray_cached(world_bvh, components, origin, direction, config, CacheTolerance::default())
        // See `trace_direct_path`'s wrapper for why this degrades instead of
        // propagating: no `Result` to hand it to here, and a hit-cap
        // overflow is vanishingly unlikely against real geometry.
        .unwrap_or(None)
}

/// Same as [`run_room_estimate_ray`] but with an explicit ray-cache
/// tolerance, used by `probe::run_probe` with the value from
/// `AcousticWorldDesc` rather than the spec default. Errs if a component's
/// ray cast overflows its hit cap (spec §7); `probe::run_probe_cached` folds
/// that into the probe's `degraded` flag.
pub fn run_room_estimate_ray_cached(
    world_bvh: &crate::bvh::WorldBvh,
    components: &[Component],
    origin: Vec3,
    direction: Vec3,
    config: &RoomEstimateConfig,
    cache_tolerance: CacheTolerance,
) -> Result<RoomEstimateSample> {
    let Some(hit) = closest_world_hit(world_bvh, components, origin, direction, config.range, cache_tolerance)? else {
        return Ok(None);
    };
    let component = &components[hit.component_index as usize];
    let absorption = component
        .materials()
        .get(hit.texture_index)
        .map(|m| m.absorption)
        .unwrap_or([1.0, 1.0, 1.0]);
    let cos_theta_out = (-direction).dot(hit.normal);
    Ok(Some(RoomEstimateHit {
        distance: hit.distance,
        cos_theta_out,
        absorption,
    }))
}

/// Combines every direction's sample into room totals (spec §4.7
/// "Aggregation"). A `None` sample (ray never hit) is folded in as fully
/// absorptive at `config.range`.
pub fn finish_room_estimate(samples: &[RoomEstimateSample], config: &RoomEstimateConfig) -> RoomTotals {
    let mut totals = RoomTotals::default();
    for sample in samples {
        match sample {
            Some(hit) => {
                totals.accumulate_hit(hit.distance, hit.cos_theta_out, hit.absorption, config.lambert_scale);
            }
            None => totals.accumulate_miss(config.range),
        }
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Mat4;
    use crate::scene::material::{Material, MaterialTable};
    use crate::scene::model::Model;
    use crate::scene::Component;
    use std::sync::Arc;

    fn wall_component(x: f32) -> Component {
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
        materials.add(Material::CONCRETE);
        Component::new(model, Mat4::IDENTITY, materials)
    }

    #[test]
    fn every_ray_missing_degrades_to_fully_absorptive_room() {
        let samples = vec![None; 8];
        let config = RoomEstimateConfig::default();
        let totals = finish_room_estimate(&samples, &config);
        assert_eq!(totals.avg_absorption, [8.0, 8.0, 8.0]);
        assert_eq!(totals.hit_count, 8);
    }

    #[test]
    fn a_real_hit_feeds_its_own_absorption() {
        let components = vec![wall_component(1.0)];
        let world_bvh = crate::bvh::WorldBvh::build(&components, Vec3::ZERO);
        let config = RoomEstimateConfig::default();
        let sample = run_room_estimate_ray(&world_bvh, &components, Vec3::ZERO, Vec3::X, &config);
        assert!(sample.is_some());
        assert!((sample.unwrap().distance - 1.0).abs() < 1e-3);
    }
}
