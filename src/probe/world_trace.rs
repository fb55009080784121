//! Two-level ray cast: world BVH over components, then a per-model BVH in
//! each candidate's local space (spec §4.3 "After `finish()`, visitors
//! perform ray vs. component AABB traversal and, for each candidate,
//! transform the ray into the component's local frame").

use crate::bvh::{trace_all_hits, trace_blocked, Facing, TriangleHit, WorldBvh};
use crate::cache::{CacheTolerance, CachedRay};
use crate::error::Result;
use crate::math::Vec3;
use crate::scene::Component;

/// A hit resolved back into world space, plus the component and texture it
/// came from so the caller can look up material coefficients.
#[derive(Debug, Clone, Copy)]
pub struct WorldHit {
    pub distance: f32,
    pub point: Vec3,
    pub normal: Vec3,
    pub component_index: u32,
    pub texture_index: u16,
}

/// Casts one ray against every component the world BVH reports as a
/// candidate, returning the closest forward-facing hit.
///
/// `origin`/`direction` are listener-relative, matching `world_bvh`'s own
/// coordinate frame (spec §4.3: "positions are stored relative to the
/// listener"). Component transforms may carry non-uniform scale; the
/// length limit and returned distance are corrected for the *average*
/// scale along the ray direction, which is exact for uniform scale and a
/// close approximation otherwise (see `DESIGN.md`).
pub fn closest_world_hit(
    world_bvh: &WorldBvh,
    components: &[Component],
    origin: Vec3,
    direction: Vec3,
    length: f32,
    cache_tolerance: CacheTolerance,
) -> Result<Option<WorldHit>> {
    closest_world_hit_facing(
        world_bvh,
        components,
        origin,
        direction,
        length,
        Facing::NegativeDot,
        cache_tolerance,
    )
}

/// Same as [`closest_world_hit`] but with an explicit facing convention —
/// used by the transmission step to search for the *back* face of the
/// surface a ray just entered (spec §4.4 step 3: "a back face of the same
/// material... within the maximum penetration").
///
/// Each candidate component's own [`crate::scene::Model::ray_cache`] is
/// consulted first; a miss falls back to a fresh `trace_all_hits` cast,
/// which is then inserted back into the cache for later queries to reuse
/// (spec §4.6 "the cache stores the all-hits result of a ray through a
/// model and serves compatible subsequent queries"). `TriangleHit::front`
/// is recorded the same way regardless of `facing` (see [`trace_all_hits`]),
/// so a cached hit list can answer either facing without retracing.
///
/// Errs if a per-component `trace_all_hits` cast overflows its hit cap
/// (spec §7) — callers fold that into the owning probe's `degraded` flag
/// rather than treating it as fatal.
pub fn closest_world_hit_facing(
    world_bvh: &WorldBvh,
    components: &[Component],
    origin: Vec3,
    direction: Vec3,
    length: f32,
    facing: Facing,
    cache_tolerance: CacheTolerance,
) -> Result<Option<WorldHit>> {
    let world_origin = origin + world_bvh.listener_position();
    let mut best: Option<WorldHit> = None;
    let mut limit = length;

    for &component_index in &world_bvh.candidates(origin, direction, length) {
        let component = &components[component_index as usize];
        if !component.affects_sound {
            continue;
        }

        let local_origin = component.world_to_local_point(world_origin);
        let local_dir_raw = component.world_to_local_direction(direction);
        let scale = local_dir_raw.length();
        if scale <= f32::EPSILON {
            continue;
        }
        let local_dir = local_dir_raw / scale;
        let local_limit = limit * scale;

        let cache = component.model().ray_cache();
        let hits = match cache.find(local_origin, local_dir, local_limit, cache_tolerance) {
            Some(cached) => cached.hits,
            None => {
                let hits = trace_all_hits(component.model().bvh(), local_origin, local_dir, local_limit)?;
                cache.insert(
                    CachedRay {
                        origin: local_origin,
                        direction: local_dir,
                        length: local_limit,
                        hits: hits.clone(),
                    },
                    cache_tolerance,
                );
                hits
            }
        };

        // Hits past this query's own length may be present if the cached
        // entry was cast further by another query (spec §4.6 "Hit list
        // trimming") — ignored here rather than at cache-read time.
        let Some(hit) = hits
            .into_iter()
            .find(|h| h.distance <= local_limit && facing.matches(h.front))
        else {
            continue;
        };

        let world_distance = hit.distance / scale;
        if world_distance >= limit {
            continue;
        }
        limit = world_distance;
        best = Some(WorldHit {
            distance: world_distance,
            point: component.local_to_world_point(hit.point),
            normal: component.world_matrix().transform_vector3(hit.normal).normalize_or_zero(),
            component_index,
            texture_index: hit.texture_index,
        });
    }

    Ok(best)
}

/// Same two-level traversal but for the blocked query — used by the
/// transmission step's "is there a back face of the same material ahead?"
/// check and the final is-outside check (spec §4.4 step 3 and step 5).
///
/// Unlike [`closest_world_hit`], this skips non-blocking materials (e.g. an
/// `OPEN` doorway with zero absorption) by calling `trace_blocked` with the
/// component's own `MaterialLookup` impl, rather than stopping at the first
/// geometric hit regardless of what it's made of.
pub fn is_blocked(world_bvh: &WorldBvh, components: &[Component], origin: Vec3, direction: Vec3, length: f32) -> bool {
    let world_origin = origin + world_bvh.listener_position();

    for &component_index in &world_bvh.candidates(origin, direction, length) {
        let component = &components[component_index as usize];
        if !component.affects_sound {
            continue;
        }

        let local_origin = component.world_to_local_point(world_origin);
        let local_dir_raw = component.world_to_local_direction(direction);
        let scale = local_dir_raw.length();
        if scale <= f32::EPSILON {
            continue;
        }
        let local_dir = local_dir_raw / scale;
        let local_limit = length * scale;

        if trace_blocked(
            component.model().bvh(),
            local_origin,
            local_dir,
            local_limit,
            Facing::NegativeDot,
            component,
        ) {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Mat4;
    use crate::scene::material::{Material, MaterialTable};
    use crate::scene::model::Model;
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
    fn finds_the_closest_component_hit() {
        let components = vec![wall_component(1.0), wall_component(3.0)];
        let world_bvh = WorldBvh::build(&components, Vec3::ZERO);
        let hit = closest_world_hit(
            &world_bvh,
            &components,
            Vec3::ZERO,
            Vec3::X,
            10.0,
            CacheTolerance::default(),
        )
        .unwrap();
        assert!(hit.is_some());
        let hit = hit.unwrap();
        assert!((hit.distance - 1.0).abs() < 1e-3);
        assert_eq!(hit.component_index, 0);
    }

    #[test]
    fn empty_world_is_never_blocked() {
        let world_bvh = WorldBvh::build(&[], Vec3::ZERO);
        assert!(!is_blocked(&world_bvh, &[], Vec3::ZERO, Vec3::X, 10.0));
    }

    #[test]
    fn a_concrete_wall_blocks_but_an_open_doorway_does_not() {
        let opaque = vec![wall_component(1.0)];
        let world_bvh = WorldBvh::build(&opaque, Vec3::ZERO);
        assert!(is_blocked(&world_bvh, &opaque, Vec3::ZERO, Vec3::X, 10.0));

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
        materials.add(Material::OPEN);
        let open = vec![Component::new(model, Mat4::IDENTITY, materials)];
        let world_bvh = WorldBvh::build(&open, Vec3::ZERO);
        assert!(!is_blocked(&world_bvh, &open, Vec3::ZERO, Vec3::X, 10.0));
    }

    #[test]
    fn a_cache_hit_serves_a_shorter_subsequent_query() {
        let components = vec![wall_component(1.0)];
        let world_bvh = WorldBvh::build(&components, Vec3::ZERO);
        let tolerance = CacheTolerance::default();

        let first = closest_world_hit(&world_bvh, &components, Vec3::ZERO, Vec3::X, 10.0, tolerance)
            .unwrap()
            .unwrap();
        assert!(components[0].model().ray_cache().len() > 0);

        // A nearly identical, slightly shorter query should be served from
        // the cache entry the first call populated rather than retracing.
        let second = closest_world_hit(
            &world_bvh,
            &components,
            Vec3::new(0.01, 0.0, 0.0),
            Vec3::X,
            8.0,
            tolerance,
        )
        .unwrap()
        .unwrap();
        assert!((second.distance - first.distance).abs() < 0.02);
    }
}
