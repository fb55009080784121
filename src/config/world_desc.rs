/// Global tunables for an [`crate::world::AcousticWorld`].
///
/// Unlike `TraceSoundRaysConfig`/`RoomEstimateConfig` (per-probe), these
/// apply to the whole acoustic core: physical constants and the ray
/// cache's matching tolerances (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcousticWorldDesc {
    /// Speed of sound in air, m/s. Drives `echoTime` and Eyring `T60`.
    pub speed_of_sound: f32,
    /// Number of time bins in the debug energy histogram (spec §3).
    pub histogram_bins: usize,
    /// Time span covered by the energy histogram, in seconds.
    pub histogram_span: f32,
    /// Ray cache spatial match tolerance, meters (spec §4.6, default 0.1 m).
    pub cache_range: f32,
    /// Ray cache directional match tolerance, degrees (spec §4.6, default 0.5°).
    pub cache_spread_angle_deg: f32,
}

impl Default for AcousticWorldDesc {
    fn default() -> Self {
        Self {
            speed_of_sound: crate::math::SPEED_OF_SOUND,
            histogram_bins: 50,
            histogram_span: 0.5,
            cache_range: 0.1,
            cache_spread_angle_deg: 0.5,
        }
    }
}

impl AcousticWorldDesc {
    /// Builds the [`crate::cache::CacheTolerance`] `run_probe` matches ray
    /// cache entries against, from this desc's `cache_range`/
    /// `cache_spread_angle_deg` (spec §4.6).
    pub fn cache_tolerance(&self) -> crate::cache::CacheTolerance {
        crate::cache::CacheTolerance {
            range: self.cache_range,
            spread_angle: self.cache_spread_angle_deg.to_radians(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_constants() {
        let desc = AcousticWorldDesc::default();
        assert_eq!(desc.speed_of_sound, 343.0);
        assert_eq!(desc.histogram_bins, 50);
        assert_eq!(desc.cache_range, 0.1);
    }
}
