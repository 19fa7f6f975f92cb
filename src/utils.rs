//! Small DSP helpers shared by the engines.

/// Linear crossfade between two values.
#[inline]
pub fn crossfade(a: f32, b: f32, fade: f32) -> f32 {
    a + (b - a) * fade
}

/// One-pole lowpass smoothing step.
#[inline]
pub fn one_pole(out: &mut f32, in_: f32, coefficient: f32) {
    *out += coefficient * (in_ - *out);
}
