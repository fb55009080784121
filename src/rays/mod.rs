//! Sound-ray propagation data: flat ray/segment storage shared across
//! bounces and transmissions within one probe task.

mod sound_ray;

pub use sound_ray::{Segment, SoundRay, SoundRayList};
