//! External interface to the acoustic core (spec §6 "External interfaces").
//!
//! `AcousticWorld` is the embedding audio module's one entry point: it
//! holds the current scene and listener state, rebuilds the per-tick
//! `WorldBvh`, and fans probe work out across a `TaskScheduler`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::bvh::WorldBvh;
use crate::config::AcousticWorldDesc;
use crate::error::Result;
use crate::math::{Quat, Vec3};
use crate::probe::{run_probe_cached, ProbeConfig, ProbeHandle, ProbeResult};
use crate::scene::Component;
use crate::scheduler::TaskScheduler;

/// Caller-supplied identifier for a sound source, threaded through purely
/// for logging — the handle returned by `submit_probe` is what `result`
/// is keyed on.
pub type SourceId = u64;

/// The per-tick listener state a probe is traced against.
#[derive(Debug, Clone, Copy)]
struct ListenerState {
    orientation: Quat,
    range: f32,
}

/// Owns the scene, the current tick's `WorldBvh`, and the scheduler used
/// to fan probe work out (spec §6 Input interface).
///
/// Runs on the main thread: `set_scene` and `per_tick_begin` mutate state
/// that tasks only ever read, matching the shared-resource policy in
/// spec §5 ("WorldBVH for the current tick: built by the main thread
/// before submitting tasks; read-only during the tick").
pub struct AcousticWorld {
    desc: AcousticWorldDesc,
    scheduler: Arc<dyn TaskScheduler>,
    components: Arc<Vec<Component>>,
    scene_layer_mask: u32,
    world_bvh: Arc<WorldBvh>,
    listener: ListenerState,
    next_handle: AtomicU64,
    results: Arc<Mutex<HashMap<ProbeHandle, ProbeResult>>>,
}

impl AcousticWorld {
    pub fn new(desc: AcousticWorldDesc, scheduler: Arc<dyn TaskScheduler>) -> Self {
        Self {
            desc,
            scheduler,
            components: Arc::new(Vec::new()),
            scene_layer_mask: u32::MAX,
            world_bvh: Arc::new(WorldBvh::build(&[], Vec3::ZERO)),
            listener: ListenerState {
                orientation: Quat::IDENTITY,
                range: 60.0,
            },
            next_handle: AtomicU64::new(0),
            results: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn desc(&self) -> &AcousticWorldDesc {
        &self.desc
    }

    /// Replaces the scene at scene-change granularity (spec §6
    /// `set_scene(components, layer_mask)`). Only components whose
    /// `layer_mask` intersects `layer_mask` ever occlude or reflect sound
    /// for probes run against this scene — components outside it are
    /// dropped here rather than filtered per-query, since the World BVH
    /// doesn't carry a per-traversal layer filter (see `DESIGN.md`).
    pub fn set_scene(&mut self, components: Vec<Component>, layer_mask: u32) {
        self.scene_layer_mask = layer_mask;
        let filtered: Vec<Component> = components
            .into_iter()
            .filter(|c| c.layer_mask & layer_mask != 0)
            .collect();
        log::info!("scene replaced: {} components pass layer mask {:#x}", filtered.len(), layer_mask);
        self.components = Arc::new(filtered);
    }

    /// Builds this tick's `WorldBvh` over the current scene, re-centred on
    /// `listener_position` (spec §6 `per_tick_begin`). Must be called
    /// before any `submit_probe` in the same tick.
    pub fn per_tick_begin(&mut self, listener_position: Vec3, listener_orientation: Quat, range: f32) {
        self.world_bvh = Arc::new(WorldBvh::build(&self.components, listener_position));
        self.listener = ListenerState {
            orientation: listener_orientation,
            range,
        };
        self.results.lock().unwrap().clear();
    }

    /// Queues a probe for `source_position` on the scheduler (spec §6
    /// `submit_probe`). `run_probe` — and therefore every per-direction
    /// `TraceSoundRays`/`RoomEstimate` cast — executes on a worker thread
    /// once its turn comes up; this call only enqueues the work.
    pub fn submit_probe(&self, source_id: SourceId, source_position: Vec3, config: ProbeConfig) -> Result<ProbeHandle> {
        let handle = ProbeHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));

        let world_bvh = self.world_bvh.clone();
        let components = self.components.clone();
        let listener_orientation = self.listener.orientation;
        let speed_of_sound = self.desc.speed_of_sound;
        let cache_tolerance = self.desc.cache_tolerance();
        let results = self.results.clone();

        self.scheduler.submit(
            &[],
            Box::new(move || {
                let result = run_probe_cached(
                    &world_bvh,
                    &components,
                    source_position,
                    listener_orientation,
                    speed_of_sound,
                    &config,
                    cache_tolerance,
                );
                results.lock().unwrap().insert(handle, result);
                log::trace!("probe {:?} for source {} finished: degraded={}", handle, source_id, result.environment.degraded);
            }),
        )?;

        Ok(handle)
    }

    /// Blocks until every probe submitted so far has completed (spec §6
    /// `join_all`; the tick-boundary barrier of spec §5).
    pub fn join_all(&self) -> Result<()> {
        self.scheduler.join_all()
    }

    /// Reads a finished probe's result (spec §6 `result(probe_handle)`).
    /// Returns `None` if `handle` hasn't finished yet — callers must
    /// `join_all` first.
    pub fn result(&self, handle: ProbeHandle) -> Option<ProbeResult> {
        self.results.lock().unwrap().get(&handle).copied()
    }

    /// Current number of components in the scene, after layer filtering.
    pub fn component_count(&self) -> usize {
        self.components.len()
    }
}

impl std::fmt::Debug for AcousticWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcousticWorld")
            .field("desc", &self.desc)
            .field("component_count", &self.components.len())
            .field("scene_layer_mask", &self.scene_layer_mask)
            .finish()
    }
}

fn _assert_send_sync<T: Send + Sync>() {}
const _: fn() = || {
    _assert_send_sync::<AcousticWorld>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ThreadPoolScheduler;

    fn world() -> AcousticWorld {
        let scheduler: Arc<dyn TaskScheduler> = Arc::new(ThreadPoolScheduler::new(2));
        AcousticWorld::new(AcousticWorldDesc::default(), scheduler)
    }

    #[test]
    fn a_probe_against_an_empty_scene_reports_unblocked_direct_path() {
        let mut world = world();
        world.per_tick_begin(Vec3::ZERO, Quat::IDENTITY, 60.0);
        let handle = world
            .submit_probe(1, Vec3::new(5.0, 0.0, 0.0), ProbeConfig::default())
            .unwrap();
        world.join_all().unwrap();
        let result = world.result(handle).expect("probe should have finished after join_all");
        assert_eq!(result.environment.direct_gain, [1.0, 1.0, 1.0]);
        assert!(!result.environment.degraded);
    }

    #[test]
    fn result_is_none_before_join_all() {
        let mut world = world();
        world.per_tick_begin(Vec3::ZERO, Quat::IDENTITY, 60.0);
        let _handle = world
            .submit_probe(1, Vec3::new(5.0, 0.0, 0.0), ProbeConfig::default())
            .unwrap();
        // Not joined yet: this may or may not have completed, but querying
        // an unsubmitted handle must never panic.
        assert!(world.result(ProbeHandle(999)).is_none());
    }

    #[test]
    fn set_scene_drops_components_outside_the_layer_mask() {
        let mut world = world();
        let mut materials = crate::scene::material::MaterialTable::new();
        materials.add(crate::scene::material::Material::CONCRETE);
        let model = Arc::new(
            crate::scene::model::Model::new(&[(
                [Vec3::new(1.0, -1.0, -1.0), Vec3::new(1.0, -1.0, 1.0), Vec3::new(1.0, 1.0, -1.0)],
                0,
            )])
            .unwrap(),
        );
        let mut component = Component::new(model, crate::math::Mat4::IDENTITY, materials);
        component.layer_mask = 0b0010;
        world.set_scene(vec![component], 0b0001);
        assert_eq!(world.component_count(), 0);
    }
}
