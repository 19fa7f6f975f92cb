//! Input/output port voltages with polyphony bookkeeping.

use crate::MAX_CHANNELS;

/// Voltages presented by the host at one input jack.
///
/// `channels == 0` means no cable is patched.
#[derive(Debug, Clone, Copy)]
pub struct InputPort {
    pub voltages: [f32; MAX_CHANNELS],
    pub channels: usize,
}

impl Default for InputPort {
    fn default() -> Self {
        Self::unpatched()
    }
}

impl InputPort {
    pub fn unpatched() -> Self {
        Self {
            voltages: [0.0; MAX_CHANNELS],
            channels: 0,
        }
    }

    pub fn mono(voltage: f32) -> Self {
        let mut port = Self::unpatched();
        port.voltages[0] = voltage;
        port.channels = 1;
        port
    }

    pub fn poly(voltages: &[f32]) -> Self {
        let mut port = Self::unpatched();
        port.channels = voltages.len().min(MAX_CHANNELS);
        port.voltages[..port.channels].copy_from_slice(&voltages[..port.channels]);
        port
    }

    #[inline]
    pub fn is_patched(&self) -> bool {
        self.channels > 0
    }

    /// Host polyphony convention: a monophonic cable drives every lane
    /// with its single voltage, lanes beyond the channel count read 0 V.
    #[inline]
    pub fn poly_voltage(&self, channel: usize) -> f32 {
        if self.channels == 1 {
            self.voltages[0]
        } else if channel < self.channels {
            self.voltages[channel]
        } else {
            0.0
        }
    }

    /// Poly voltage with a normalled fallback when nothing is patched.
    #[inline]
    pub fn normalled(&self, channel: usize, fallback: f32) -> f32 {
        if self.is_patched() {
            self.poly_voltage(channel)
        } else {
            fallback
        }
    }
}

/// Voltages an engine hands back to the host for one output jack.
#[derive(Debug, Clone, Copy)]
pub struct OutputPort {
    pub voltages: [f32; MAX_CHANNELS],
    pub channels: usize,
}

impl Default for OutputPort {
    fn default() -> Self {
        Self {
            voltages: [0.0; MAX_CHANNELS],
            channels: 1,
        }
    }
}

impl OutputPort {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn set(&mut self, channel: usize, voltage: f32) {
        self.voltages[channel] = voltage;
    }

    #[inline]
    pub fn set_channels(&mut self, channels: usize) {
        self.channels = channels;
    }
}
