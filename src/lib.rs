//! Geometric acoustic ray-tracing and environment-probe core for an
//! OpenAL-style 3D audio engine.
//!
//! See [`world::AcousticWorld`] for the external interface: `set_scene`,
//! `per_tick_begin`, `submit_probe`, `join_all`, `result`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use aural_trace::{
//!     AcousticWorld, AcousticWorldDesc, Component, Material, MaterialTable, Model,
//!     ProbeConfig, ThreadPoolScheduler,
//! };
//! use aural_trace::math::{Mat4, Quat, Vec3};
//! use std::sync::Arc;
//!
//! // A single wall, 5 m out along +X.
//! let model = Arc::new(Model::new(&[(
//!     [Vec3::new(5.0, -10.0, -10.0), Vec3::new(5.0, -10.0, 10.0), Vec3::new(5.0, 10.0, -10.0)],
//!     0,
//! )])?);
//! let mut materials = MaterialTable::new();
//! materials.add(Material::CONCRETE);
//! let wall = Component::new(model, Mat4::IDENTITY, materials);
//!
//! let scheduler = Arc::new(ThreadPoolScheduler::new(4));
//! let mut world = AcousticWorld::new(AcousticWorldDesc::default(), scheduler);
//! world.set_scene(vec![wall], u32::MAX);
//!
//! // Once per tick: rebuild the world BVH, then submit and collect probes.
//! world.per_tick_begin(Vec3::ZERO, Quat::IDENTITY, 60.0);
//! let handle = world.submit_probe(0, Vec3::new(3.0, 0.0, 0.0), ProbeConfig::default())?;
//! world.join_all()?;
//!
//! let result = world.result(handle).expect("submitted probes are ready after join_all");
//! println!("direct gain: {:?}", result.environment.direct_gain);
//! # Ok::<(), aural_trace::AuralTraceError>(())
//! ```

pub mod bvh;
pub mod cache;
pub mod config;
pub mod error;
pub mod geometry;
pub mod math;
pub mod probe;
pub mod rays;
pub mod scene;
pub mod scheduler;
pub mod world;

pub use bvh::{ModelBvh, WorldBvh};
pub use config::{AcousticWorldDesc, RoomEstimateConfig, TraceSoundRaysConfig};
pub use error::{AuralTraceError, Result};
pub use probe::{DirectPath, EaxReverbParams, Environment, ListenerTunables, ProbeConfig, ProbeHandle, ProbeResult, Smoother};
pub use scene::{Component, Material, MaterialTable, Model};
pub use scheduler::{TaskHandle, TaskScheduler, ThreadPoolScheduler};
pub use world::{AcousticWorld, SourceId};
