//! Asymmetric slew limiter / LFO engine.
//!
//! Integrates each channel's output toward a target at independently
//! controlled rise and fall rates. In slew mode the target is the input
//! voltage and the output never overshoots it; in LFO mode the engine
//! self-oscillates between 0 V and 10 V, flipping direction at the
//! boundaries with a sub-sample-accurate time remainder so the oscillation
//! frequency does not depend on the frame rate.

#[allow(unused_imports)]
use num_traits::float::Float;

use crate::lights::BicolorLight;
use crate::oversampling::{Oversampler, MAX_RATIO_INDEX};
use crate::port::{InputPort, OutputPort};
use crate::utils::crossfade;
use crate::MAX_CHANNELS;

/// Operating mode.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Track the external input with rate limiting.
    #[default]
    Slew,
    /// Self-oscillate between 0 V and 10 V.
    Lfo,
}

/// Base rate tier.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Rate {
    #[default]
    Slow,
    Fast,
}

/// Added-capacitance modifier slowing both rate extremes down.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Capacitor {
    #[default]
    None,
    Slow,
    VerySlow,
}

/// Normalled voltage substituted at the input jack when it is unpatched.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NormalledVoltage {
    #[default]
    Zero,
    Five,
    Ten,
}

impl NormalledVoltage {
    #[inline]
    pub fn volts(self) -> f32 {
        match self {
            Self::Zero => 0.0,
            Self::Five => 5.0,
            Self::Ten => 10.0,
        }
    }
}

/// User-facing configuration, persisted by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SlewLfoConfig {
    /// Index into the 1/2/4/8 oversampling ratio table; only effective for
    /// the LFO in the fast rate tier.
    pub oversampling_index: usize,
    /// Subtract 5 V from the LFO output in the fast tier, centering the
    /// waveform around 0 V for audio-rate use.
    pub remove_dc: bool,
    /// Fallback voltage for the unpatched input jack.
    pub input_normal: NormalledVoltage,
}

impl Default for SlewLfoConfig {
    fn default() -> Self {
        Self {
            oversampling_index: 0,
            remove_dc: false,
            input_normal: NormalledVoltage::Zero,
        }
    }
}

/// Panel values sampled once per frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct SlewLfoParams {
    pub mode: Mode,
    pub rate: Rate,
    pub capacitor: Capacitor,
    /// Curve knob: 1 is a constant-rate (linear) ramp, 0 approaches an RC
    /// charging curve.
    pub curve: f32,
    /// Rise/fall knobs as a fraction of full scale (0..1 mapping to
    /// 0..10 V of rate CV).
    pub rise: f32,
    pub fall: f32,
}

/// Per-frame inputs from the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct SlewLfoInputs {
    pub input: InputPort,
    pub rise_cv: InputPort,
    pub fall_cv: InputPort,
}

/// Seconds to traverse the full 10 V span at the slowest and fastest
/// settings of a tier.
#[inline]
fn traverse_times(rate: Rate, capacitor: Capacitor) -> (f32, f32) {
    let (slowest, fastest) = match rate {
        Rate::Fast => (1.0, 1e-3),
        Rate::Slow => (100.0, 0.1),
    };
    let scale = match capacitor {
        Capacitor::None => 1.0,
        Capacitor::Slow => 10.0,
        Capacitor::VerySlow => 100.0,
    };
    (slowest * scale, fastest * scale)
}

/// Knob defaults the host re-applies when the module is reset; an LFO
/// makes more sense starting mid-rate, a slew limiter wide open.
pub fn default_rise_fall(mode: Mode) -> (f32, f32) {
    match mode {
        Mode::Slew => (0.0, 0.0),
        Mode::Lfo => (0.5, 0.5),
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum LfoPhase {
    #[default]
    Rising,
    Falling,
}

/// Integrator settings shared by every substep of a frame.
#[derive(Debug, Clone, Copy)]
struct StepParams {
    mode: Mode,
    input: f32,
    rise_control: f32,
    fall_control: f32,
    slew_min: f32,
    slew_max: f32,
    shape: f32,
}

/// State for one polyphony channel.
#[derive(Debug, Clone)]
struct SlewLane {
    out: f32,
    phase: LfoPhase,
    decimator: Oversampler,
}

impl SlewLane {
    fn new() -> Self {
        Self {
            out: 0.0,
            phase: LfoPhase::Rising,
            decimator: Oversampler::new(),
        }
    }

    fn reset(&mut self) {
        self.out = 0.0;
        self.phase = LfoPhase::Rising;
        self.decimator.reset();
    }

    /// One integration step of `dt` seconds. An LFO boundary crossing
    /// snaps the output to the boundary, flips the direction and re-runs
    /// the leftover fraction of the step against the new target.
    fn step(&mut self, mut dt: f32, params: &StepParams) {
        // Two boundary crossings within one step only happen at extreme
        // rate CV; anything beyond that is truncated at the boundary.
        for _ in 0..4 {
            let target = match params.mode {
                Mode::Slew => params.input,
                Mode::Lfo => match self.phase {
                    LfoPhase::Rising => 10.0,
                    LfoPhase::Falling => 0.0,
                },
            };
            let delta = target - self.out;
            if delta == 0.0 {
                // Already sitting on the target; signum(0) is 1, so the
                // blended increment would otherwise push past it.
                return;
            }
            let rate_control = if delta > 0.0 {
                params.rise_control
            } else {
                params.fall_control
            };
            let slew = params.slew_max * (params.slew_min / params.slew_max).powf(rate_control);
            let increment = slew * crossfade(delta.signum(), delta / 10.0, params.shape) * dt;
            self.out += increment;

            match params.mode {
                Mode::Slew => {
                    // Never overshoot the target.
                    if (delta > 0.0 && self.out > target) || (delta < 0.0 && self.out < target) {
                        self.out = target;
                    }
                    return;
                }
                Mode::Lfo => {
                    let crossed = match self.phase {
                        LfoPhase::Rising => self.out >= 10.0,
                        LfoPhase::Falling => self.out <= 0.0,
                    };
                    if !crossed {
                        return;
                    }
                    let overshoot = self.out - target;
                    // Leftover step time spent past the boundary; a
                    // degenerate increment leaves nothing to re-process.
                    let remainder = if increment != 0.0 && increment.is_finite() {
                        ((overshoot / increment) * dt).clamp(0.0, dt)
                    } else {
                        0.0
                    };
                    self.out = target;
                    self.phase = match self.phase {
                        LfoPhase::Rising => LfoPhase::Falling,
                        LfoPhase::Falling => LfoPhase::Rising,
                    };
                    if remainder <= 0.0 {
                        return;
                    }
                    dt = remainder;
                }
            }
        }
    }
}

/// The asymmetric slew/LFO engine.
#[derive(Debug)]
pub struct SlewLfo {
    config: SlewLfoConfig,
    lanes: [SlewLane; MAX_CHANNELS],
    in_light: BicolorLight,
    out_light: BicolorLight,
}

impl Default for SlewLfo {
    fn default() -> Self {
        Self::new()
    }
}

impl SlewLfo {
    pub fn new() -> Self {
        Self {
            config: SlewLfoConfig::default(),
            lanes: core::array::from_fn(|_| SlewLane::new()),
            in_light: BicolorLight::new(),
            out_light: BicolorLight::new(),
        }
    }

    pub fn config(&self) -> &SlewLfoConfig {
        &self.config
    }

    /// Applies a new configuration, clamping the ratio index to the
    /// supported range. A ratio change clears the decimation filters.
    pub fn set_config(&mut self, config: SlewLfoConfig) {
        let mut config = config;
        config.oversampling_index = config.oversampling_index.min(MAX_RATIO_INDEX);
        if config.oversampling_index != self.config.oversampling_index {
            for lane in self.lanes.iter_mut() {
                lane.decimator.set_ratio_index(config.oversampling_index);
            }
            log::debug!("slew/lfo oversampling: {}x", 1usize << config.oversampling_index);
        }
        self.config = config;
    }

    /// Clears all per-channel state. Must be called on a sample rate
    /// change before the next frame.
    pub fn reset(&mut self) {
        for lane in self.lanes.iter_mut() {
            lane.reset();
        }
        self.in_light.reset();
        self.out_light.reset();
    }

    pub fn in_light(&self) -> &BicolorLight {
        &self.in_light
    }

    pub fn out_light(&self) -> &BicolorLight {
        &self.out_light
    }

    /// Processes one audio frame.
    pub fn process(
        &mut self,
        sample_time: f32,
        params: &SlewLfoParams,
        inputs: &SlewLfoInputs,
        output: &mut OutputPort,
    ) {
        let config = self.config;
        let active = inputs
            .input
            .channels
            .max(inputs.rise_cv.channels)
            .max(inputs.fall_cv.channels)
            .max(1);

        let (slowest, fastest) = traverse_times(params.rate, params.capacitor);
        let slew_min = 10.0 / slowest;
        let slew_max = 10.0 / fastest;
        let shape = (1.0 - params.curve.clamp(0.0, 1.0)) * 0.998;
        let normal = config.input_normal.volts();

        // Oversampling only pays off for the LFO's corners at audio rates;
        // the slow tier always runs at the base rate, and so does slew
        // tracking, where the decimation filter would ring past a clamped
        // target.
        let oversample = params.rate == Rate::Fast && params.mode == Mode::Lfo;
        let remove_dc = config.remove_dc && params.mode == Mode::Lfo && params.rate == Rate::Fast;

        for channel in 0..active {
            let step_params = StepParams {
                mode: params.mode,
                input: inputs.input.normalled(channel, normal),
                rise_control: (params.rise * 10.0 + inputs.rise_cv.poly_voltage(channel))
                    .clamp(-5.0, 10.0)
                    * 0.1,
                fall_control: (params.fall * 10.0 + inputs.fall_cv.poly_voltage(channel))
                    .clamp(-5.0, 10.0)
                    * 0.1,
                slew_min,
                slew_max,
                shape,
            };

            let lane = &mut self.lanes[channel];
            let ratio = if oversample { lane.decimator.ratio() } else { 1 };

            let mut out = if ratio == 1 {
                lane.step(sample_time, &step_params);
                lane.out
            } else {
                let sub_dt = sample_time / ratio as f32;
                for i in 0..ratio {
                    lane.step(sub_dt, &step_params);
                    lane.decimator.buffer_mut()[i] = lane.out;
                }
                lane.decimator.downsample()
            };

            if remove_dc {
                out -= 5.0;
            }
            output.set(channel, out);
        }

        output.set_channels(active);

        // The input indicator only means something while tracking.
        if active > 1 {
            self.in_light.set_poly_smooth(sample_time);
            self.out_light.set_poly_smooth(sample_time);
        } else {
            let in_value = if params.mode == Mode::Slew {
                inputs.input.normalled(0, normal)
            } else {
                0.0
            };
            self.in_light.set_smooth(in_value, sample_time);
            self.out_light.set_smooth(output.voltages[0], sample_time);
        }
    }
}
