//! Panel indicator brightness with frame-rate smoothing.

use crate::utils::one_pole;

/// Smoothing bandwidth for indicator brightness in Hz.
const LIGHT_LAMBDA: f32 = 30.0;

/// Bicolor indicator: green for positive voltages, red for negative ones,
/// with a third color taking over for polyphonic signals.
#[derive(Debug, Default, Clone, Copy)]
pub struct BicolorLight {
    green: f32,
    red: f32,
    blue: f32,
}

impl BicolorLight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Single-channel mapping: brightness is `voltage / 10 V`, split by sign.
    #[inline]
    pub fn set_smooth(&mut self, voltage: f32, dt: f32) {
        let coefficient = (dt * LIGHT_LAMBDA).min(1.0);
        one_pole(&mut self.green, (voltage / 10.0).clamp(0.0, 1.0), coefficient);
        one_pole(&mut self.red, (-voltage / 10.0).clamp(0.0, 1.0), coefficient);
        one_pole(&mut self.blue, 0.0, coefficient);
    }

    /// Polyphonic signals show a solid indicator color instead of
    /// per-channel values.
    #[inline]
    pub fn set_poly_smooth(&mut self, dt: f32) {
        let coefficient = (dt * LIGHT_LAMBDA).min(1.0);
        one_pole(&mut self.green, 0.0, coefficient);
        one_pole(&mut self.red, 0.0, coefficient);
        one_pole(&mut self.blue, 1.0, coefficient);
    }

    #[inline]
    pub fn green(&self) -> f32 {
        self.green
    }

    #[inline]
    pub fn red(&self) -> f32 {
        self.red
    }

    #[inline]
    pub fn blue(&self) -> f32 {
        self.blue
    }
}
