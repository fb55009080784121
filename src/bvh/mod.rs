//! Bounding volume hierarchies and ray-triangle visitors (spec §4.1–§4.3).
//!
//! Two BVH flavors share the same median-split builder (`bvh::builder`):
//! [`ModelBvh`] is built once per model over its triangles, and
//! [`world_bvh::WorldBvh`] is rebuilt every tick over the components
//! visible to a query.

pub mod builder;
pub mod model_bvh;
pub mod result;
pub mod visitors;
pub mod world_bvh;

pub use builder::{BvhNode, BvhNodeKind};
pub use model_bvh::ModelBvh;
pub use result::HitList;
pub use visitors::{trace_all_hits, trace_blocked, trace_closest, Facing, MaterialLookup, TriangleHit};
pub use world_bvh::WorldBvh;
