//! Automatic levels from a histogram.

use tracing::{debug, warn};

use crate::channel::Channel;
use crate::histogram::Histogram;
use crate::levels::model::LevelsModel;

/// Fraction of samples clipped at each end of a color channel.
const CLIP_FRACTION: f64 = 0.006;

impl LevelsModel {
    /// Derive input ranges from `histogram`.
    ///
    /// The overall channel is reset. Every other channel gets gamma 1 and
    /// the full output range. For red, green and blue the input range is
    /// set where the cumulative share of samples from either end comes
    /// closest to [`CLIP_FRACTION`]; an empty channel collapses to `0..0`.
    pub fn auto_levels(&mut self, histogram: &Histogram) {
        if histogram.depth() != self.depth() {
            warn!(
                histogram = %histogram.depth(),
                levels = %self.depth(),
                "auto levels ignored: histogram depth differs"
            );
            return;
        }

        let max = self.segment_max();
        self.reset_channel(Channel::Luminosity);
        for channel in &Channel::ALL[1..] {
            self.set_gamma(*channel, 1.0);
            self.set_low_output(*channel, 0);
            self.set_high_output(*channel, max);
        }

        for channel in [Channel::Red, Channel::Green, Channel::Blue] {
            let (low, high) = clip_range(histogram, channel);
            debug!(%channel, low, high, "auto levels");
            self.set_low_input(channel, low);
            self.set_high_input(channel, high);
        }
    }
}

fn clip_range(histogram: &Histogram, channel: Channel) -> (i32, i32) {
    let max = histogram.max_segment_index();
    let count = histogram.count(channel, 0, max);
    if count == 0.0 {
        return (0, 0);
    }

    let closer = |share: f64, next: f64| (share - CLIP_FRACTION).abs() < (next - CLIP_FRACTION).abs();

    let mut low = 0;
    let mut seen = 0.0;
    for i in 0..max {
        seen += histogram.value(channel, i);
        let next = seen + histogram.value(channel, i + 1);
        if closer(seen / count, next / count) {
            low = i + 1;
            break;
        }
    }

    let mut high = max;
    seen = 0.0;
    for i in (1..=max).rev() {
        seen += histogram.value(channel, i);
        let next = seen + histogram.value(channel, i - 1);
        if closer(seen / count, next / count) {
            high = i - 1;
            break;
        }
    }

    (low as i32, high as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{BitDepth, PixelBuffer};

    fn uniform_8bit() -> Histogram {
        let samples: Vec<u8> = (0..=255u8).flat_map(|v| [v, v, v, 255]).collect();
        Histogram::compute(&PixelBuffer::from_u8(256, 1, samples).unwrap())
    }

    #[test]
    fn test_uniform_histogram_clips_near_six_per_mille() {
        let mut levels = LevelsModel::new(BitDepth::U8);
        levels.auto_levels(&uniform_8bit());
        for channel in [Channel::Red, Channel::Green, Channel::Blue] {
            assert_eq!(levels.low_input(channel), 2, "{channel}");
            assert_eq!(levels.high_input(channel), 253, "{channel}");
        }
        assert!(levels.is_identity(Channel::Luminosity));
        assert!(levels.is_identity(Channel::Alpha));
    }

    #[test]
    fn test_auto_levels_resets_gamma_and_output() {
        let mut levels = LevelsModel::new(BitDepth::U8);
        levels.set_gamma(Channel::Green, 3.0);
        levels.set_high_output(Channel::Green, 10);
        levels.set_low_input(Channel::Luminosity, 40);
        levels.auto_levels(&uniform_8bit());
        assert_eq!(levels.gamma(Channel::Green), 1.0);
        assert_eq!(levels.high_output(Channel::Green), 255);
        assert_eq!(levels.low_input(Channel::Luminosity), 0);
    }

    #[test]
    fn test_single_value_histogram() {
        let samples = vec![128u8; 4 * 16];
        let histogram = Histogram::compute(&PixelBuffer::from_u8(4, 4, samples).unwrap());
        let mut levels = LevelsModel::new(BitDepth::U8);
        levels.auto_levels(&histogram);
        assert_eq!(levels.low_input(Channel::Red), 128);
        assert_eq!(levels.high_input(Channel::Red), 128);
    }

    #[test]
    fn test_depth_mismatch_is_ignored() {
        let mut levels = LevelsModel::new(BitDepth::U16);
        levels.set_gamma(Channel::Red, 2.0);
        levels.auto_levels(&uniform_8bit());
        assert_eq!(levels.gamma(Channel::Red), 2.0);
    }
}
