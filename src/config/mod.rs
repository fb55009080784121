//! Configuration structs for the acoustic core.

mod probe_config;
mod world_desc;

pub use probe_config::{RoomEstimateConfig, TraceSoundRaysConfig};
pub use world_desc::AcousticWorldDesc;
