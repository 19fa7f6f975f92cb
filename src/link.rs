//! Expander-link mailbox between adjacent module instances.
//!
//! Two same-type modules sitting next to each other can cascade their sum
//! outputs. The producer fills an [`ExpanderMessage`] once per engine tick;
//! the consumer reads it within the same tick. The host's single-threaded
//! engine stepping orders the exchange, so no synchronization is involved.
//! An absent message means "no contribution", never an error.

use crate::MAX_CHANNELS;

/// Per-channel accumulated sum handed to a neighboring instance.
#[derive(Debug, Clone, Copy)]
pub struct ExpanderMessage {
    pub values: [f32; MAX_CHANNELS],
    pub channels: usize,
}

impl Default for ExpanderMessage {
    fn default() -> Self {
        Self {
            values: [0.0; MAX_CHANNELS],
            channels: 0,
        }
    }
}

impl ExpanderMessage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contribution for one channel; lanes beyond the carried channel
    /// count contribute zero.
    #[inline]
    pub fn value(&self, channel: usize) -> f32 {
        if channel < self.channels {
            self.values[channel]
        } else {
            0.0
        }
    }
}
