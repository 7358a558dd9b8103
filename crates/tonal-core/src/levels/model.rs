//! Per-channel levels: input range, gamma and output range.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::channel::Channel;
use crate::image::{BitDepth, Color};
use crate::transform::lut::{ChannelTransfer, LutSet};

/// Accepted gamma range for [`LevelsModel::set_gamma`].
pub const GAMMA_RANGE: std::ops::RangeInclusive<f64> = 0.1..=10.0;

/// Levels parameters of one channel, in table units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelsChannel {
    pub gamma: f64,
    pub low_input: i32,
    pub high_input: i32,
    pub low_output: i32,
    pub high_output: i32,
}

impl LevelsChannel {
    pub const fn identity(depth: BitDepth) -> Self {
        let max = depth.segment_max();
        Self {
            gamma: 1.0,
            low_input: 0,
            high_input: max,
            low_output: 0,
            high_output: max,
        }
    }

    /// Map a normalized value through this channel.
    ///
    /// A degenerate input range skips normalization and clamping. Gamma 0
    /// disables the power step.
    pub fn map(&self, value: f64, segment_max: f64) -> f64 {
        let low = self.low_input as f64;
        let high = self.high_input as f64;
        let mut x = if self.high_input != self.low_input {
            ((segment_max * value - low) / (high - low)).clamp(0.0, 1.0)
        } else {
            segment_max * value - low
        };

        if self.gamma != 0.0 {
            x = if x >= 0.0 {
                x.powf(1.0 / self.gamma)
            } else {
                -(-x).powf(1.0 / self.gamma)
            };
        }

        let low_out = self.low_output as f64;
        let high_out = self.high_output as f64;
        x = if self.high_output >= self.low_output {
            x * (high_out - low_out) + low_out
        } else {
            low_out - x * (low_out - high_out)
        };

        x / segment_max
    }
}

/// Levels for all five channels at a fixed bit depth.
///
/// Setters ignore values outside `[0, segment_max]` (gamma outside
/// [`GAMMA_RANGE`]) without reporting an error. The gray picker is not
/// bound by [`GAMMA_RANGE`].
#[derive(Debug, Clone, PartialEq)]
pub struct LevelsModel {
    depth: BitDepth,
    channels: [LevelsChannel; Channel::COUNT],
    dirty: bool,
}

impl LevelsModel {
    pub fn new(depth: BitDepth) -> Self {
        Self {
            depth,
            channels: [LevelsChannel::identity(depth); Channel::COUNT],
            dirty: false,
        }
    }

    pub fn depth(&self) -> BitDepth {
        self.depth
    }

    pub fn segment_max(&self) -> i32 {
        self.depth.segment_max()
    }

    pub fn is_sixteen_bit(&self) -> bool {
        self.depth.is_sixteen_bit()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn reset_channel(&mut self, channel: Channel) {
        self.channels[channel.index()] = LevelsChannel::identity(self.depth);
    }

    pub fn reset_all(&mut self) {
        self.channels = [LevelsChannel::identity(self.depth); Channel::COUNT];
        self.dirty = false;
    }

    pub fn channel(&self, channel: Channel) -> LevelsChannel {
        self.channels[channel.index()]
    }

    pub fn is_identity(&self, channel: Channel) -> bool {
        self.channel(channel) == LevelsChannel::identity(self.depth)
    }

    pub fn gamma(&self, channel: Channel) -> f64 {
        self.channel(channel).gamma
    }

    pub fn low_input(&self, channel: Channel) -> i32 {
        self.channel(channel).low_input
    }

    pub fn high_input(&self, channel: Channel) -> i32 {
        self.channel(channel).high_input
    }

    pub fn low_output(&self, channel: Channel) -> i32 {
        self.channel(channel).low_output
    }

    pub fn high_output(&self, channel: Channel) -> i32 {
        self.channel(channel).high_output
    }

    pub fn set_gamma(&mut self, channel: Channel, gamma: f64) {
        if GAMMA_RANGE.contains(&gamma) {
            self.channels[channel.index()].gamma = gamma;
            self.dirty = true;
        }
    }

    pub fn set_low_input(&mut self, channel: Channel, value: i32) {
        if let Some(slot) = self.field(channel, |c| &mut c.low_input, value) {
            *slot = value;
        }
    }

    pub fn set_high_input(&mut self, channel: Channel, value: i32) {
        if let Some(slot) = self.field(channel, |c| &mut c.high_input, value) {
            *slot = value;
        }
    }

    pub fn set_low_output(&mut self, channel: Channel, value: i32) {
        if let Some(slot) = self.field(channel, |c| &mut c.low_output, value) {
            *slot = value;
        }
    }

    pub fn set_high_output(&mut self, channel: Channel, value: i32) {
        if let Some(slot) = self.field(channel, |c| &mut c.high_output, value) {
            *slot = value;
        }
    }

    /// Borrow an integer field for writing when `value` is in range.
    fn field(
        &mut self,
        channel: Channel,
        select: impl FnOnce(&mut LevelsChannel) -> &mut i32,
        value: i32,
    ) -> Option<&mut i32> {
        if !(0..=self.segment_max()).contains(&value) {
            return None;
        }
        self.dirty = true;
        Some(select(&mut self.channels[channel.index()]))
    }

    /// Sample value a picked color contributes to `channel`. The overall
    /// channel uses the largest of red, green and blue.
    pub fn input_from_color(channel: Channel, color: Color) -> i32 {
        let value = match channel {
            Channel::Luminosity => color.red.max(color.green).max(color.blue),
            Channel::Red => color.red,
            Channel::Green => color.green,
            Channel::Blue => color.blue,
            Channel::Alpha => color.alpha,
        };
        value as i32
    }

    /// Use a picked color as the channel's black point.
    pub fn black_point_adjust(&mut self, channel: Channel, color: Color) {
        self.set_low_input(channel, Self::input_from_color(channel, color));
    }

    /// Use a picked color as the channel's white point.
    pub fn white_point_adjust(&mut self, channel: Channel, color: Color) {
        self.set_high_input(channel, Self::input_from_color(channel, color));
    }

    /// Choose the gamma that maps a picked color's sample to its lightness.
    pub fn gray_point_adjust(&mut self, channel: Channel, color: Color) {
        let lightness =
            0.30 * color.red as f64 + 0.59 * color.green as f64 + 0.11 * color.blue as f64;
        let levels = self.channel(channel);
        let range = (levels.high_input - levels.low_input) as f64;
        if range <= 0.0 {
            return;
        }
        let input = (Self::input_from_color(channel, color) - levels.low_input) as f64;
        if input < 0.0 {
            return;
        }

        // Picked gammas are stored as computed, outside GAMMA_RANGE too.
        let gamma = (input / range).ln() / (lightness / range).ln();
        if gamma.is_finite() {
            self.channels[channel.index()].gamma = gamma;
            self.dirty = true;
        } else {
            debug!(%channel, input, lightness, "gray point gives no usable gamma");
        }
    }

    /// Compile lookup tables for `active_channels` color channels.
    pub fn compile_lut(&self, active_channels: usize) -> LutSet {
        LutSet::compile(self, active_channels)
    }
}

impl ChannelTransfer for LevelsModel {
    fn depth(&self) -> BitDepth {
        self.depth
    }

    fn transfer(&self, slot: usize, value: f64) -> f64 {
        self.channels[slot].map(value, self.segment_max() as f64)
    }
}
