//! Per-model ray cache and its spatial index.

mod octree;
mod ray_cache;

pub use octree::RayCacheOctree;
pub use ray_cache::{CacheTolerance, CachedRay, RayCache};
