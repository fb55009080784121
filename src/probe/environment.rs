//! Per-source compound result (direct path + reverb) and frame-to-frame
//! smoothing (spec §4.5.6, §1 items 1-2).

use crate::math::Bands;
use crate::probe::direct_path::DirectPath;
use crate::probe::listener::EaxReverbParams;

/// Everything a single source contributes to the mix this tick: its
/// direct-path transmission gain plus the shared-room reverb parameters.
/// `degraded` mirrors spec.md §7 — set when any contributing probe task
/// failed (cancelled or out of memory) and the aggregator fell back to a
/// partial result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Environment {
    pub direct_gain: Bands,
    pub bandpass_gain: f32,
    pub bandpass_lf: f32,
    pub bandpass_hf: f32,
    pub reverb: EaxReverbParams,
    pub degraded: bool,
}

impl Environment {
    pub fn new(direct_path: DirectPath, reverb: EaxReverbParams, degraded: bool) -> Self {
        Self {
            direct_gain: direct_path.gain,
            bandpass_gain: direct_path.bandpass_gain,
            bandpass_lf: direct_path.bandpass_lf,
            bandpass_hf: direct_path.bandpass_hf,
            reverb,
            degraded,
        }
    }

    pub fn silent() -> Self {
        Self {
            direct_gain: [1.0, 1.0, 1.0],
            bandpass_gain: 1.0,
            bandpass_lf: 1.0,
            bandpass_hf: 1.0,
            reverb: EaxReverbParams::silent(),
            degraded: false,
        }
    }

    /// A probe that couldn't finish cleanly (spec §7: a contributing task
    /// hit its hit-list cap) — silent rather than guessing at a partial
    /// gain.
    pub fn degraded() -> Self {
        Self {
            degraded: true,
            ..Self::silent()
        }
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn lerp_reverb(current: &EaxReverbParams, goal: &EaxReverbParams, t: f32) -> EaxReverbParams {
    EaxReverbParams {
        master_gain: lerp(current.master_gain, goal.master_gain, t),
        gain_lf: lerp(current.gain_lf, goal.gain_lf, t),
        gain_hf: lerp(current.gain_hf, goal.gain_hf, t),
        decay_time: lerp(current.decay_time, goal.decay_time, t),
        decay_lf_ratio: lerp(current.decay_lf_ratio, goal.decay_lf_ratio, t),
        decay_hf_ratio: lerp(current.decay_hf_ratio, goal.decay_hf_ratio, t),
        reflections_gain: lerp(current.reflections_gain, goal.reflections_gain, t),
        reflections_delay: lerp(current.reflections_delay, goal.reflections_delay, t),
        late_reverb_gain: lerp(current.late_reverb_gain, goal.late_reverb_gain, t),
        late_reverb_delay: lerp(current.late_reverb_delay, goal.late_reverb_delay, t),
        echo_time: lerp(current.echo_time, goal.echo_time, t),
        reflections_pan: current.reflections_pan.lerp(goal.reflections_pan, t),
        late_reverb_pan: current.late_reverb_pan.lerp(goal.late_reverb_pan, t),
    }
}

/// Exponentially smooths a source's reverb result frame to frame so a
/// listener moving through a room doesn't hear stepped parameter changes
/// (spec.md §4.5.6: "the eleven comparable scalars plus the two pan
/// vectors"; memory-less with respect to position — only the smoothed
/// values themselves are kept).
#[derive(Debug, Clone, Copy)]
pub struct Smoother {
    current: EaxReverbParams,
    primed: bool,
}

impl Smoother {
    pub fn new() -> Self {
        Self {
            current: EaxReverbParams::silent(),
            primed: false,
        }
    }

    /// Advances the smoother one frame toward `goal`. `rate` is the
    /// per-frame blend factor in `[0, 1]` (0 = frozen, 1 = snap
    /// immediately). `reset` bypasses smoothing for this call only — used
    /// when the source is new or the scene just changed.
    pub fn update(&mut self, goal: EaxReverbParams, rate: f32, reset: bool) -> EaxReverbParams {
        if reset || !self.primed {
            self.current = goal;
            self.primed = true;
        } else {
            self.current = lerp_reverb(&self.current, &goal, rate.clamp(0.0, 1.0));
        }
        self.current
    }
}

impl Default for Smoother {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_snaps_immediately_regardless_of_rate() {
        let mut smoother = Smoother::new();
        let mut goal = EaxReverbParams::silent();
        goal.master_gain = 0.8;
        let result = smoother.update(goal, 0.01, true);
        assert_eq!(result.master_gain, 0.8);
    }

    #[test]
    fn without_reset_the_value_moves_partway_to_the_goal() {
        let mut smoother = Smoother::new();
        let silent = EaxReverbParams::silent();
        smoother.update(silent, 1.0, true);

        let mut goal = silent;
        goal.master_gain = 1.0;
        let result = smoother.update(goal, 0.5, false);
        assert!((result.master_gain - 0.5).abs() < 1e-6);
    }

    #[test]
    fn first_update_without_reset_still_primes_from_silence() {
        let mut smoother = Smoother::new();
        let mut goal = EaxReverbParams::silent();
        goal.master_gain = 1.0;
        let result = smoother.update(goal, 0.1, false);
        assert_eq!(result.master_gain, 1.0);
    }
}
