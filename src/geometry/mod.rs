//! Geometry primitives: triangle faces and axis-aligned bounding boxes.

mod aabb;
mod face;

pub use aabb::{safe_inverse_direction, Aabb};
pub use face::{Face, SAFE_DISTANCE_MARGIN};
