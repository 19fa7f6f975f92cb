//! Edge detection and trigger pulse generation.

/// Two-threshold boolean latch for noisy gate signals.
///
/// The state goes high once the input rises to `high_threshold` and only
/// returns low once it falls back to `low_threshold`.
#[derive(Debug, Clone, Copy)]
pub struct SchmittTrigger {
    low_threshold: f32,
    high_threshold: f32,
    state: bool,
}

impl Default for SchmittTrigger {
    fn default() -> Self {
        Self::new()
    }
}

impl SchmittTrigger {
    /// Latch with the host's conventional 0.1 V / 1.0 V thresholds.
    pub fn new() -> Self {
        Self::with_thresholds(0.1, 1.0)
    }

    pub fn with_thresholds(low_threshold: f32, high_threshold: f32) -> Self {
        Self {
            low_threshold,
            high_threshold,
            state: false,
        }
    }

    pub fn reset(&mut self) {
        self.state = false;
    }

    /// Returns true on the rising edge.
    #[inline]
    pub fn process(&mut self, voltage: f32) -> bool {
        if self.state {
            if voltage <= self.low_threshold {
                self.state = false;
            }
            false
        } else if voltage >= self.high_threshold {
            self.state = true;
            true
        } else {
            false
        }
    }

    #[inline]
    pub fn is_high(&self) -> bool {
        self.state
    }
}

/// One-sample-delayed boolean latch.
#[derive(Debug, Default, Clone, Copy)]
pub struct RisingEdge {
    previous: bool,
}

impl RisingEdge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.previous = false;
    }

    /// Returns true when `high` is set and was not set on the previous call.
    #[inline]
    pub fn process(&mut self, high: bool) -> bool {
        let edge = high && !self.previous;
        self.previous = high;
        edge
    }
}

/// Monostable producing fixed-width pulses.
#[derive(Debug, Default, Clone, Copy)]
pub struct PulseGenerator {
    remaining: f32,
}

impl PulseGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.remaining = 0.0;
    }

    /// Arms a pulse of `duration` seconds. A retrigger extends an active
    /// pulse but never shortens it.
    #[inline]
    pub fn trigger(&mut self, duration: f32) {
        if duration > self.remaining {
            self.remaining = duration;
        }
    }

    /// Advances time by `dt` and reports whether the pulse is active.
    #[inline]
    pub fn process(&mut self, dt: f32) -> bool {
        if self.remaining > 0.0 {
            self.remaining -= dt;
            true
        } else {
            false
        }
    }
}
