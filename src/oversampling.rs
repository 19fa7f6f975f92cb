//! Variable-ratio oversampling with a Butterworth-class anti-aliasing filter.
//!
//! The [`Oversampler`] holds the complete per-channel, per-signal pipeline:
//! zero-stuffing upsampler, a 12th-order-equivalent lowpass in each
//! direction, and the subsample buffer exposed for in-place processing at
//! the oversampled rate.

#[allow(unused_imports)]
use num_traits::float::Float;

/// Largest supported ratio index; ratios are `1 << index` (1, 2, 4, 8).
pub const MAX_RATIO_INDEX: usize = 3;

/// Largest supported oversampling ratio.
pub const MAX_RATIO: usize = 1 << MAX_RATIO_INDEX;

/// Biquad sections per filter; the cascade yields a `2 * FILTER_STAGES`
/// order response.
pub const FILTER_STAGES: usize = 6;

/// Lowpass biquad section, transposed direct form II.
#[derive(Debug, Default, Clone, Copy)]
pub struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    s1: f32,
    s2: f32,
}

impl Biquad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.s1 = 0.0;
        self.s2 = 0.0;
    }

    /// Lowpass coefficients for normalized frequency `f` (cycles per
    /// sample) and quality `q`, via the bilinear transform.
    pub fn set_lowpass(&mut self, f: f32, q: f32) {
        let k = (core::f32::consts::PI * f).tan();
        let norm = 1.0 / (1.0 + k / q + k * k);
        self.b0 = k * k * norm;
        self.b1 = 2.0 * self.b0;
        self.b2 = self.b0;
        self.a1 = 2.0 * (k * k - 1.0) * norm;
        self.a2 = (1.0 - k / q + k * k) * norm;
    }

    #[inline]
    pub fn process(&mut self, in_: f32) -> f32 {
        let out = self.b0 * in_ + self.s1;
        self.s1 = self.b1 * in_ - self.a1 * out + self.s2;
        self.s2 = self.b2 * in_ - self.a2 * out;
        out
    }
}

/// Cascade of lowpass biquads with Butterworth-distributed Q values.
#[derive(Debug, Default, Clone)]
pub struct ButterworthLowpass {
    stages: [Biquad; FILTER_STAGES],
}

impl ButterworthLowpass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        for stage in self.stages.iter_mut() {
            stage.reset();
        }
    }

    /// Cutoff as a normalized frequency in cycles per sample.
    pub fn set_cutoff(&mut self, f: f32) {
        let order = 2 * FILTER_STAGES;
        for (k, stage) in self.stages.iter_mut().enumerate() {
            // Pole-pair Q for a Butterworth response of the full order.
            let angle = (2 * k + 1) as f32 * core::f32::consts::PI / (2 * order) as f32;
            let q = 1.0 / (2.0 * angle.cos());
            stage.set_lowpass(f, q);
        }
    }

    #[inline]
    pub fn process(&mut self, in_: f32) -> f32 {
        let mut out = in_;
        for stage in self.stages.iter_mut() {
            out = stage.process(out);
        }
        out
    }
}

/// Per-channel, per-signal upsample/decimate pipeline.
///
/// A ratio of 1 bypasses both filters. Changing the ratio recomputes the
/// coefficients and clears all filter history; the cutoff sits just below
/// the base-rate Nyquist, so it only depends on the ratio and a sample-rate
/// change merely requires a history [`reset`](Self::reset).
#[derive(Debug, Clone)]
pub struct Oversampler {
    ratio: usize,
    up: ButterworthLowpass,
    down: ButterworthLowpass,
    buffer: [f32; MAX_RATIO],
}

impl Default for Oversampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Oversampler {
    pub fn new() -> Self {
        let mut oversampler = Self {
            ratio: 1,
            up: ButterworthLowpass::new(),
            down: ButterworthLowpass::new(),
            buffer: [0.0; MAX_RATIO],
        };
        oversampler.set_ratio_index(0);
        oversampler
    }

    /// Selects a power-of-two ratio by index (0..=3 for 1, 2, 4, 8).
    /// Out-of-range indices clamp to the highest supported ratio.
    pub fn set_ratio_index(&mut self, index: usize) {
        let index = index.min(MAX_RATIO_INDEX);
        self.ratio = 1 << index;
        // 0.9 times the base-rate Nyquist, normalized to the oversampled rate.
        let cutoff = 0.45 / self.ratio as f32;
        self.up.set_cutoff(cutoff);
        self.down.set_cutoff(cutoff);
        self.reset();
    }

    #[inline]
    pub fn ratio(&self) -> usize {
        self.ratio
    }

    /// Clears all filter history. Stale history after a ratio or sample
    /// rate change corrupts the output, so the owner must call this from
    /// its reconfiguration path.
    pub fn reset(&mut self) {
        self.up.reset();
        self.down.reset();
        self.buffer = [0.0; MAX_RATIO];
    }

    /// Fills the subsample buffer from one base-rate sample by
    /// zero-stuffing and lowpass filtering, gain-compensated by the ratio.
    #[inline]
    pub fn upsample(&mut self, in_: f32) {
        if self.ratio == 1 {
            self.buffer[0] = in_;
            return;
        }
        self.buffer[..self.ratio].fill(0.0);
        self.buffer[0] = in_ * self.ratio as f32;
        for sample in self.buffer[..self.ratio].iter_mut() {
            *sample = self.up.process(*sample);
        }
    }

    /// The subsample buffer for the current ratio.
    #[inline]
    pub fn buffer(&self) -> &[f32] {
        &self.buffer[..self.ratio]
    }

    /// Mutable access for writing per-subsample results before decimation.
    #[inline]
    pub fn buffer_mut(&mut self) -> &mut [f32] {
        let ratio = self.ratio;
        &mut self.buffer[..ratio]
    }

    /// Lowpass filters the processed buffer and decimates it back to one
    /// base-rate sample.
    #[inline]
    pub fn downsample(&mut self) -> f32 {
        if self.ratio == 1 {
            return self.buffer[0];
        }
        let mut out = 0.0;
        for sample in self.buffer[..self.ratio].iter() {
            out = self.down.process(*sample);
        }
        out
    }
}
