//! Dual-input combinational engine.
//!
//! Computes analog and boolean logic functions from two control voltages:
//! min/max ("analog AND/OR"), a through-zero clipper ("analog XOR"), sum,
//! difference and inversions, plus 0 V / 10 V gates with 1 ms triggers for
//! each logic family and its complement. Up to 16 polyphony channels are
//! processed per frame, and the discontinuous paths can optionally run at
//! an oversampled rate to keep aliasing down.

#[allow(unused_imports)]
use num_traits::float::Float;

use crate::gate::{PulseGenerator, RisingEdge, SchmittTrigger};
use crate::lights::BicolorLight;
use crate::link::ExpanderMessage;
use crate::oversampling::{Oversampler, MAX_RATIO_INDEX};
use crate::port::{InputPort, OutputPort};
use crate::{GATE_HIGH, MAX_CHANNELS, TRIGGER_DURATION};

/// User-facing configuration, persisted by the host. Every field falls
/// back to its default when absent from the stored record.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CosmosConfig {
    /// Index into the 1/2/4/8 oversampling ratio table.
    pub oversampling_index: usize,
    /// Oversample the analog OR/AND/XOR outputs.
    pub oversample_outputs: bool,
    /// Oversample the gate outputs; implies `oversample_outputs`.
    pub oversample_gates: bool,
    /// Oversample the trigger outputs; implies `oversample_gates`.
    pub oversample_triggers: bool,
    /// Comparison threshold for the gate outputs, in volts.
    pub gate_threshold: f32,
    /// Voltage produced by a pad at full pressure.
    pub pad_max_volts: f32,
}

impl Default for CosmosConfig {
    fn default() -> Self {
        Self {
            oversampling_index: 0,
            oversample_outputs: false,
            oversample_gates: false,
            oversample_triggers: false,
            gate_threshold: 1.0,
            pad_max_volts: 10.0,
        }
    }
}

/// Per-frame inputs from the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct CosmosInputs {
    pub x: InputPort,
    pub y: InputPort,
    /// Pad pressures in 0..1 (0 at the pad edge or when untouched, 1 at
    /// the center). The pad voltage is normalled into the matching input
    /// when no cable is patched.
    pub pad_x: f32,
    pub pad_y: f32,
}

/// Per-frame outputs handed back to the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct CosmosOutputs {
    pub x: OutputPort,
    pub y: OutputPort,
    pub inv_x: OutputPort,
    pub inv_y: OutputPort,
    pub sum: OutputPort,
    pub diff: OutputPort,
    pub or: OutputPort,
    pub and: OutputPort,
    pub xor: OutputPort,
    pub nor: OutputPort,
    pub nand: OutputPort,
    pub xnor: OutputPort,
    pub or_gate: OutputPort,
    pub and_gate: OutputPort,
    pub xor_gate: OutputPort,
    pub nor_gate: OutputPort,
    pub nand_gate: OutputPort,
    pub xnor_gate: OutputPort,
    pub or_trigger: OutputPort,
    pub and_trigger: OutputPort,
    pub xor_trigger: OutputPort,
    pub nor_trigger: OutputPort,
    pub nand_trigger: OutputPort,
    pub xnor_trigger: OutputPort,
}

/// Indicator states for the twelve analog outputs.
#[derive(Debug, Default, Clone, Copy)]
pub struct CosmosLights {
    pub x: BicolorLight,
    pub y: BicolorLight,
    pub inv_x: BicolorLight,
    pub inv_y: BicolorLight,
    pub sum: BicolorLight,
    pub diff: BicolorLight,
    pub or: BicolorLight,
    pub and: BicolorLight,
    pub xor: BicolorLight,
    pub nor: BicolorLight,
    pub nand: BicolorLight,
    pub xnor: BicolorLight,
}

/// Edge latch plus monostable for one trigger output.
#[derive(Debug, Default, Clone, Copy)]
struct TriggerState {
    edge: RisingEdge,
    pulse: PulseGenerator,
}

impl TriggerState {
    #[inline]
    fn process(&mut self, high: bool, dt: f32) -> f32 {
        if self.edge.process(high) {
            self.pulse.trigger(TRIGGER_DURATION);
        }
        if self.pulse.process(dt) {
            GATE_HIGH
        } else {
            0.0
        }
    }

    fn reset(&mut self) {
        self.edge.reset();
        self.pulse.reset();
    }
}

/// State for one polyphony channel.
#[derive(Debug, Clone)]
struct CosmosLane {
    up_x: Oversampler,
    up_y: Oversampler,
    down_or: Oversampler,
    down_and: Oversampler,
    down_xor: Oversampler,
    down_or_gate: Oversampler,
    down_and_gate: Oversampler,
    down_xor_gate: Oversampler,
    down_or_trigger: Oversampler,
    down_and_trigger: Oversampler,
    down_xor_trigger: Oversampler,
    down_nor_trigger: Oversampler,
    down_nand_trigger: Oversampler,
    down_xnor_trigger: Oversampler,
    or_trigger: TriggerState,
    and_trigger: TriggerState,
    xor_trigger: TriggerState,
    nor_trigger: TriggerState,
    nand_trigger: TriggerState,
    xnor_trigger: TriggerState,
    or_gate_latch: SchmittTrigger,
    and_gate_latch: SchmittTrigger,
    xor_gate_latch: SchmittTrigger,
}

impl CosmosLane {
    // Recovering base-rate booleans from a band-limited gate needs
    // hysteresis; corner ringing around half scale must not retrigger
    // the edge detectors.
    fn gate_latch() -> SchmittTrigger {
        SchmittTrigger::with_thresholds(0.4 * GATE_HIGH, 0.6 * GATE_HIGH)
    }

    fn new() -> Self {
        Self {
            up_x: Oversampler::new(),
            up_y: Oversampler::new(),
            down_or: Oversampler::new(),
            down_and: Oversampler::new(),
            down_xor: Oversampler::new(),
            down_or_gate: Oversampler::new(),
            down_and_gate: Oversampler::new(),
            down_xor_gate: Oversampler::new(),
            down_or_trigger: Oversampler::new(),
            down_and_trigger: Oversampler::new(),
            down_xor_trigger: Oversampler::new(),
            down_nor_trigger: Oversampler::new(),
            down_nand_trigger: Oversampler::new(),
            down_xnor_trigger: Oversampler::new(),
            or_trigger: TriggerState::default(),
            and_trigger: TriggerState::default(),
            xor_trigger: TriggerState::default(),
            nor_trigger: TriggerState::default(),
            nand_trigger: TriggerState::default(),
            xnor_trigger: TriggerState::default(),
            or_gate_latch: Self::gate_latch(),
            and_gate_latch: Self::gate_latch(),
            xor_gate_latch: Self::gate_latch(),
        }
    }

    fn configure(&mut self, output_index: usize, gate_index: usize, trigger_index: usize) {
        self.up_x.set_ratio_index(output_index);
        self.up_y.set_ratio_index(output_index);
        self.down_or.set_ratio_index(output_index);
        self.down_and.set_ratio_index(output_index);
        self.down_xor.set_ratio_index(output_index);
        self.down_or_gate.set_ratio_index(gate_index);
        self.down_and_gate.set_ratio_index(gate_index);
        self.down_xor_gate.set_ratio_index(gate_index);
        self.down_or_trigger.set_ratio_index(trigger_index);
        self.down_and_trigger.set_ratio_index(trigger_index);
        self.down_xor_trigger.set_ratio_index(trigger_index);
        self.down_nor_trigger.set_ratio_index(trigger_index);
        self.down_nand_trigger.set_ratio_index(trigger_index);
        self.down_xnor_trigger.set_ratio_index(trigger_index);
    }

    fn reset(&mut self) {
        self.up_x.reset();
        self.up_y.reset();
        self.down_or.reset();
        self.down_and.reset();
        self.down_xor.reset();
        self.down_or_gate.reset();
        self.down_and_gate.reset();
        self.down_xor_gate.reset();
        self.down_or_trigger.reset();
        self.down_and_trigger.reset();
        self.down_xor_trigger.reset();
        self.down_nor_trigger.reset();
        self.down_nand_trigger.reset();
        self.down_xnor_trigger.reset();
        self.or_trigger.reset();
        self.and_trigger.reset();
        self.xor_trigger.reset();
        self.nor_trigger.reset();
        self.nand_trigger.reset();
        self.xnor_trigger.reset();
        self.or_gate_latch.reset();
        self.and_gate_latch.reset();
        self.xor_gate_latch.reset();
    }
}

/// One channel's worth of stateful results.
#[derive(Debug, Default, Clone, Copy)]
struct ChannelFrame {
    or: f32,
    and: f32,
    xor: f32,
    or_gate: f32,
    and_gate: f32,
    xor_gate: f32,
    or_trigger: f32,
    and_trigger: f32,
    xor_trigger: f32,
    nor_trigger: f32,
    nand_trigger: f32,
    xnor_trigger: f32,
}

/// Analog OR (max), AND (min) and the through-zero clipper. A tie between
/// the inputs takes the `y` branch.
#[inline]
fn analog_logic(x: f32, y: f32) -> (f32, f32, f32) {
    let or = if x > y { x } else { y };
    let and = if x > y { y } else { x };
    let limit = y.abs();
    let clipped = x.clamp(-limit, limit);
    let xor = if y > 0.0 { -clipped } else { clipped };
    (or, and, xor)
}

#[inline]
fn gate_voltage(high: bool) -> f32 {
    if high {
        GATE_HIGH
    } else {
        0.0
    }
}

/// The dual-input combinational engine.
#[derive(Debug)]
pub struct Cosmos {
    config: CosmosConfig,
    lanes: [CosmosLane; MAX_CHANNELS],
    lights: CosmosLights,
}

impl Default for Cosmos {
    fn default() -> Self {
        Self::new()
    }
}

impl Cosmos {
    pub fn new() -> Self {
        Self {
            config: CosmosConfig::default(),
            lanes: core::array::from_fn(|_| CosmosLane::new()),
            lights: CosmosLights::default(),
        }
    }

    pub fn config(&self) -> &CosmosConfig {
        &self.config
    }

    /// Applies a new configuration. The ratio index clamps to the
    /// supported range and the tier dependency trigger => gate => output
    /// is enforced here, so the frame path never sees an inconsistent
    /// combination. Reconfiguring the oversampling clears all filter
    /// history.
    pub fn set_config(&mut self, config: CosmosConfig) {
        let mut config = config;
        config.oversampling_index = config.oversampling_index.min(MAX_RATIO_INDEX);
        config.oversample_gates |= config.oversample_triggers;
        config.oversample_outputs |= config.oversample_gates;

        let oversampling_changed = config.oversampling_index != self.config.oversampling_index
            || config.oversample_outputs != self.config.oversample_outputs
            || config.oversample_gates != self.config.oversample_gates
            || config.oversample_triggers != self.config.oversample_triggers;
        if oversampling_changed {
            let index = config.oversampling_index;
            let output_index = if config.oversample_outputs { index } else { 0 };
            let gate_index = if config.oversample_gates { index } else { 0 };
            let trigger_index = if config.oversample_triggers { index } else { 0 };
            for lane in self.lanes.iter_mut() {
                lane.configure(output_index, gate_index, trigger_index);
            }
            log::debug!(
                "cosmos oversampling: {}x (outputs {}, gates {}, triggers {})",
                1usize << index,
                config.oversample_outputs,
                config.oversample_gates,
                config.oversample_triggers,
            );
        }

        self.config = config;
    }

    /// Clears all per-channel state. Must be called on a sample rate
    /// change before the next frame.
    pub fn reset(&mut self) {
        for lane in self.lanes.iter_mut() {
            lane.reset();
        }
        self.lights = CosmosLights::default();
    }

    pub fn lights(&self) -> &CosmosLights {
        &self.lights
    }

    /// Processes one audio frame and returns the expander message carrying
    /// the accumulated sum for a right-hand neighbor. `neighbor` is the
    /// message received from the left-hand neighbor, if one is present.
    pub fn process(
        &mut self,
        sample_time: f32,
        inputs: &CosmosInputs,
        neighbor: Option<&ExpanderMessage>,
        outputs: &mut CosmosOutputs,
    ) -> ExpanderMessage {
        let config = self.config;
        let active = inputs.x.channels.max(inputs.y.channels).max(1);

        let pad_x_volts = inputs.pad_x.clamp(0.0, 1.0) * config.pad_max_volts;
        let pad_y_volts = inputs.pad_y.clamp(0.0, 1.0) * config.pad_max_volts;

        let mut message = ExpanderMessage::new();
        message.channels = active;

        for channel in 0..active {
            let x = inputs.x.normalled(channel, pad_x_volts);
            let y = inputs.y.normalled(channel, pad_y_volts);

            outputs.x.set(channel, x);
            outputs.y.set(channel, y);
            outputs.inv_x.set(channel, -x);
            outputs.inv_y.set(channel, -y);

            let sum = 0.5 * (x + y) + neighbor.map_or(0.0, |message| message.value(channel));
            outputs.sum.set(channel, sum);
            outputs.diff.set(channel, 0.5 * (x - y));
            message.values[channel] = sum;

            let frame = self.process_channel(channel, x, y, sample_time);

            outputs.or.set(channel, frame.or);
            outputs.and.set(channel, frame.and);
            outputs.xor.set(channel, frame.xor);
            outputs.nor.set(channel, -frame.or);
            outputs.nand.set(channel, -frame.and);
            outputs.xnor.set(channel, -frame.xor);

            outputs.or_gate.set(channel, frame.or_gate);
            outputs.and_gate.set(channel, frame.and_gate);
            outputs.xor_gate.set(channel, frame.xor_gate);
            outputs.nor_gate.set(channel, GATE_HIGH - frame.or_gate);
            outputs.nand_gate.set(channel, GATE_HIGH - frame.and_gate);
            outputs.xnor_gate.set(channel, GATE_HIGH - frame.xor_gate);

            outputs.or_trigger.set(channel, frame.or_trigger);
            outputs.and_trigger.set(channel, frame.and_trigger);
            outputs.xor_trigger.set(channel, frame.xor_trigger);
            outputs.nor_trigger.set(channel, frame.nor_trigger);
            outputs.nand_trigger.set(channel, frame.nand_trigger);
            outputs.xnor_trigger.set(channel, frame.xnor_trigger);
        }

        for port in [
            &mut outputs.x,
            &mut outputs.y,
            &mut outputs.inv_x,
            &mut outputs.inv_y,
            &mut outputs.sum,
            &mut outputs.diff,
            &mut outputs.or,
            &mut outputs.and,
            &mut outputs.xor,
            &mut outputs.nor,
            &mut outputs.nand,
            &mut outputs.xnor,
            &mut outputs.or_gate,
            &mut outputs.and_gate,
            &mut outputs.xor_gate,
            &mut outputs.nor_gate,
            &mut outputs.nand_gate,
            &mut outputs.xnor_gate,
            &mut outputs.or_trigger,
            &mut outputs.and_trigger,
            &mut outputs.xor_trigger,
            &mut outputs.nor_trigger,
            &mut outputs.nand_trigger,
            &mut outputs.xnor_trigger,
        ] {
            port.set_channels(active);
        }

        self.update_lights(outputs, active, sample_time);

        message
    }

    /// The stateful part of one channel: analog logic, gates and triggers,
    /// at the base rate or through the oversampling pipeline.
    fn process_channel(&mut self, channel: usize, x: f32, y: f32, dt: f32) -> ChannelFrame {
        let config = self.config;
        let threshold = config.gate_threshold;
        let lane = &mut self.lanes[channel];
        let mut frame = ChannelFrame::default();

        if !config.oversample_outputs {
            let (or, and, xor) = analog_logic(x, y);
            frame.or = or;
            frame.and = and;
            frame.xor = xor;

            let or_high = or > threshold;
            let and_high = and > threshold;
            let xor_high = (x - y).abs() > threshold;
            frame.or_gate = gate_voltage(or_high);
            frame.and_gate = gate_voltage(and_high);
            frame.xor_gate = gate_voltage(xor_high);

            frame.or_trigger = lane.or_trigger.process(or_high, dt);
            frame.and_trigger = lane.and_trigger.process(and_high, dt);
            frame.xor_trigger = lane.xor_trigger.process(xor_high, dt);
            frame.nor_trigger = lane.nor_trigger.process(!or_high, dt);
            frame.nand_trigger = lane.nand_trigger.process(!and_high, dt);
            frame.xnor_trigger = lane.xnor_trigger.process(!xor_high, dt);

            return frame;
        }

        let ratio = lane.up_x.ratio();
        let sub_dt = dt / ratio as f32;
        lane.up_x.upsample(x);
        lane.up_y.upsample(y);

        for i in 0..ratio {
            let x_sub = lane.up_x.buffer()[i];
            let y_sub = lane.up_y.buffer()[i];
            let (or, and, xor) = analog_logic(x_sub, y_sub);
            lane.down_or.buffer_mut()[i] = or;
            lane.down_and.buffer_mut()[i] = and;
            lane.down_xor.buffer_mut()[i] = xor;

            if config.oversample_gates {
                let or_high = or > threshold;
                let and_high = and > threshold;
                let xor_high = (x_sub - y_sub).abs() > threshold;
                lane.down_or_gate.buffer_mut()[i] = gate_voltage(or_high);
                lane.down_and_gate.buffer_mut()[i] = gate_voltage(and_high);
                lane.down_xor_gate.buffer_mut()[i] = gate_voltage(xor_high);

                if config.oversample_triggers {
                    lane.down_or_trigger.buffer_mut()[i] =
                        lane.or_trigger.process(or_high, sub_dt);
                    lane.down_and_trigger.buffer_mut()[i] =
                        lane.and_trigger.process(and_high, sub_dt);
                    lane.down_xor_trigger.buffer_mut()[i] =
                        lane.xor_trigger.process(xor_high, sub_dt);
                    lane.down_nor_trigger.buffer_mut()[i] =
                        lane.nor_trigger.process(!or_high, sub_dt);
                    lane.down_nand_trigger.buffer_mut()[i] =
                        lane.nand_trigger.process(!and_high, sub_dt);
                    lane.down_xnor_trigger.buffer_mut()[i] =
                        lane.xnor_trigger.process(!xor_high, sub_dt);
                }
            }
        }

        frame.or = lane.down_or.downsample();
        frame.and = lane.down_and.downsample();
        frame.xor = lane.down_xor.downsample();

        let (or_high, and_high, xor_high) = if config.oversample_gates {
            frame.or_gate = lane.down_or_gate.downsample();
            frame.and_gate = lane.down_and_gate.downsample();
            frame.xor_gate = lane.down_xor_gate.downsample();
            // Base-rate booleans for the trigger path, recovered from the
            // band-limited gates through the hysteresis latches.
            lane.or_gate_latch.process(frame.or_gate);
            lane.and_gate_latch.process(frame.and_gate);
            lane.xor_gate_latch.process(frame.xor_gate);
            (
                lane.or_gate_latch.is_high(),
                lane.and_gate_latch.is_high(),
                lane.xor_gate_latch.is_high(),
            )
        } else {
            let or_high = frame.or > threshold;
            let and_high = frame.and > threshold;
            let xor_high = (x - y).abs() > threshold;
            frame.or_gate = gate_voltage(or_high);
            frame.and_gate = gate_voltage(and_high);
            frame.xor_gate = gate_voltage(xor_high);
            (or_high, and_high, xor_high)
        };

        if config.oversample_triggers {
            frame.or_trigger = lane.down_or_trigger.downsample();
            frame.and_trigger = lane.down_and_trigger.downsample();
            frame.xor_trigger = lane.down_xor_trigger.downsample();
            frame.nor_trigger = lane.down_nor_trigger.downsample();
            frame.nand_trigger = lane.down_nand_trigger.downsample();
            frame.xnor_trigger = lane.down_xnor_trigger.downsample();
        } else {
            frame.or_trigger = lane.or_trigger.process(or_high, dt);
            frame.and_trigger = lane.and_trigger.process(and_high, dt);
            frame.xor_trigger = lane.xor_trigger.process(xor_high, dt);
            frame.nor_trigger = lane.nor_trigger.process(!or_high, dt);
            frame.nand_trigger = lane.nand_trigger.process(!and_high, dt);
            frame.xnor_trigger = lane.xnor_trigger.process(!xor_high, dt);
        }

        frame
    }

    fn update_lights(&mut self, outputs: &CosmosOutputs, active: usize, dt: f32) {
        let pairs = [
            (&mut self.lights.x, &outputs.x),
            (&mut self.lights.y, &outputs.y),
            (&mut self.lights.inv_x, &outputs.inv_x),
            (&mut self.lights.inv_y, &outputs.inv_y),
            (&mut self.lights.sum, &outputs.sum),
            (&mut self.lights.diff, &outputs.diff),
            (&mut self.lights.or, &outputs.or),
            (&mut self.lights.and, &outputs.and),
            (&mut self.lights.xor, &outputs.xor),
            (&mut self.lights.nor, &outputs.nor),
            (&mut self.lights.nand, &outputs.nand),
            (&mut self.lights.xnor, &outputs.xnor),
        ];
        for (light, port) in pairs {
            if active > 1 {
                light.set_poly_smooth(dt);
            } else {
                light.set_smooth(port.voltages[0], dt);
            }
        }
    }
}
