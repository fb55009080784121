//! Scene representation: models, their placed instances, and the acoustic
//! materials painted onto their surfaces.
//!
//! A [`Model`] is an immutable triangle mesh with a lazily-built BVH and
//! ray cache; a [`Component`] places one in world space and supplies the
//! per-texture material table used to resolve transmission and occlusion.

pub mod component;
pub mod material;
pub mod model;

pub use component::Component;
pub use material::{Material, MaterialTable};
pub use model::Model;
