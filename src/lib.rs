#![doc = include_str!("../README.md")]
#![cfg_attr(not(test), no_std)]

pub mod cosmos;
pub mod gate;
pub mod lights;
pub mod link;
pub mod oversampling;
pub mod port;
pub mod slew_lfo;
pub mod utils;

/// Maximum number of polyphony channels per module.
pub const MAX_CHANNELS: usize = 16;

/// Logic-high output level in volts.
pub const GATE_HIGH: f32 = 10.0;

/// Width of a trigger pulse in seconds.
pub const TRIGGER_DURATION: f32 = 1e-3;
