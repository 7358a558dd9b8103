//! Histogram accumulation and range statistics.

use std::ops::RangeInclusive;

use crate::channel::Channel;
use crate::image::{BitDepth, PixelBuffer, PixelData, Sample};
use crate::transform::progress::{ProgressContext, Unobserved};

/// Bin counts for the five channels of one image.
///
/// The luminosity channel counts the per-pixel maximum of blue, green and
/// red: blue is compared with green first, then red replaces the winner
/// only when strictly greater.
///
/// A `Histogram` only exists for a completed pass; cancelled passes never
/// produce one.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    depth: BitDepth,
    bins: [Vec<f64>; Channel::COUNT],
    pixel_count: u64,
}

impl Histogram {
    /// Histogram of a whole buffer.
    pub fn compute(image: &PixelBuffer) -> Self {
        let mut histogram = Self::empty(image.depth());
        histogram.fill(image, &Unobserved);
        histogram
    }

    /// Histogram of a whole buffer, polling `ctx` once per pixel.
    /// Returns `None` when the pass was cancelled.
    pub fn accumulate(image: &PixelBuffer, ctx: &(impl ProgressContext + ?Sized)) -> Option<Self> {
        let mut histogram = Self::empty(image.depth());
        histogram.fill(image, ctx).then_some(histogram)
    }

    fn empty(depth: BitDepth) -> Self {
        Self {
            depth,
            bins: std::array::from_fn(|_| vec![0.0; depth.segments()]),
            pixel_count: 0,
        }
    }

    fn fill(&mut self, image: &PixelBuffer, ctx: &(impl ProgressContext + ?Sized)) -> bool {
        let completed = match image.data() {
            PixelData::U8(samples) => accumulate_samples(samples, &mut self.bins, ctx),
            PixelData::U16(samples) => accumulate_samples(samples, &mut self.bins, ctx),
        };
        self.pixel_count = image.pixel_count() as u64;
        completed
    }

    pub fn depth(&self) -> BitDepth {
        self.depth
    }

    /// Number of bins per channel.
    pub fn segments(&self) -> usize {
        self.depth.segments()
    }

    /// Index of the last bin.
    pub fn max_segment_index(&self) -> usize {
        self.segments() - 1
    }

    pub fn pixel_count(&self) -> u64 {
        self.pixel_count
    }

    pub fn bins(&self, channel: Channel) -> &[f64] {
        &self.bins[channel.index()]
    }

    /// Count in one bin; 0 outside the histogram.
    pub fn value(&self, channel: Channel, bin: usize) -> f64 {
        self.bins(channel).get(bin).copied().unwrap_or(0.0)
    }

    fn range(&self, start: usize, end: usize) -> Option<RangeInclusive<usize>> {
        let end = end.min(self.max_segment_index());
        (start <= end).then_some(start..=end)
    }

    /// Sum of counts over `[start, end]`.
    pub fn count(&self, channel: Channel, start: usize, end: usize) -> f64 {
        let Some(range) = self.range(start, end) else {
            return 0.0;
        };
        self.bins(channel)[range].iter().sum()
    }

    /// Count-weighted mean bin over `[start, end]`.
    ///
    /// When the range holds no samples the unnormalized weighted sum is
    /// returned as is.
    pub fn mean(&self, channel: Channel, start: usize, end: usize) -> f64 {
        let Some(range) = self.range(start, end) else {
            return 0.0;
        };
        let bins = self.bins(channel);
        let sum: f64 = range.map(|i| i as f64 * bins[i]).sum();
        let count = self.count(channel, start, end);
        if count > 0.0 { sum / count } else { sum }
    }

    /// Smallest bin where the running count exceeds half the range total.
    pub fn median(&self, channel: Channel, start: usize, end: usize) -> usize {
        let Some(range) = self.range(start, end) else {
            return 0;
        };
        let count = self.count(channel, start, end);
        let bins = self.bins(channel);
        let mut sum = 0.0;
        for i in range {
            sum += bins[i];
            if sum * 2.0 > count {
                return i;
            }
        }
        0
    }

    pub fn std_dev(&self, channel: Channel, start: usize, end: usize) -> f64 {
        let Some(range) = self.range(start, end) else {
            return 0.0;
        };
        let mean = self.mean(channel, start, end);
        let count = self.count(channel, start, end).max(1.0);
        let bins = self.bins(channel);
        let dev: f64 = range.map(|i| (i as f64 - mean) * (i as f64 - mean) * bins[i]).sum();
        (dev / count).sqrt()
    }

    /// Largest single bin count in `[start, end]`.
    pub fn maximum(&self, channel: Channel, start: usize, end: usize) -> f64 {
        let Some(range) = self.range(start, end) else {
            return 0.0;
        };
        self.bins(channel)[range].iter().copied().fold(0.0, f64::max)
    }

    /// Smallest bin at which the running count reaches `fraction` of the
    /// channel total.
    pub fn percentile(&self, channel: Channel, fraction: f64) -> usize {
        let total = self.count(channel, 0, self.max_segment_index());
        let target = total * fraction.clamp(0.0, 1.0);
        let mut sum = 0.0;
        for (i, &v) in self.bins(channel).iter().enumerate() {
            sum += v;
            if sum >= target && sum > 0.0 {
                return i;
            }
        }
        self.max_segment_index()
    }
}

fn accumulate_samples<T: Sample>(
    samples: &[T],
    bins: &mut [Vec<f64>; Channel::COUNT],
    ctx: &(impl ProgressContext + ?Sized),
) -> bool {
    for px in samples.chunks_exact(4) {
        if !ctx.is_running() {
            return false;
        }

        let blue = px[0].bin();
        let green = px[1].bin();
        let red = px[2].bin();
        let alpha = px[3].bin();

        bins[Channel::Blue.index()][blue] += 1.0;
        bins[Channel::Green.index()][green] += 1.0;
        bins[Channel::Red.index()][red] += 1.0;
        bins[Channel::Alpha.index()][alpha] += 1.0;

        let max = if blue > green { blue } else { green };
        let overall = if red > max { red } else { max };
        bins[Channel::Luminosity.index()][overall] += 1.0;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::progress::CancelToken;

    const EPSILON: f64 = 1e-9;

    fn black_with_one_white() -> PixelBuffer {
        let mut samples = vec![0u8; 16];
        samples[12..16].copy_from_slice(&[255, 255, 255, 255]);
        PixelBuffer::from_u8(2, 2, samples).unwrap()
    }

    #[test]
    fn test_black_with_one_white_pixel() {
        let hist = Histogram::compute(&black_with_one_white());
        assert_eq!(hist.count(Channel::Red, 0, 0), 3.0);
        assert_eq!(hist.count(Channel::Red, 255, 255), 1.0);
        assert!((hist.mean(Channel::Red, 0, 255) - 63.75).abs() < EPSILON);
        assert_eq!(hist.median(Channel::Red, 0, 255), 0);
        let expected = ((3.0 * 63.75f64.powi(2) + 191.25f64.powi(2)) / 4.0).sqrt();
        assert!((hist.std_dev(Channel::Red, 0, 255) - expected).abs() < EPSILON);
        assert_eq!(hist.maximum(Channel::Red, 0, 255), 3.0);
        assert_eq!(hist.count(Channel::Luminosity, 0, 0), 3.0);
    }

    #[test]
    fn test_full_range_count_matches_pixels() {
        let samples: Vec<u16> = (0..400u16).map(|i| i.wrapping_mul(977)).collect();
        let image = PixelBuffer::from_u16(10, 10, samples).unwrap();
        let hist = Histogram::compute(&image);
        assert_eq!(hist.segments(), 65536);
        for channel in Channel::ALL {
            assert_eq!(hist.count(channel, 0, 65535), 100.0, "{channel}");
        }
        assert_eq!(hist.pixel_count(), 100);
    }

    #[test]
    fn test_overall_channel_takes_rgb_maximum() {
        // B, G, R, A
        let samples = vec![10, 10, 10, 0, 200, 50, 100, 0, 1, 2, 250, 0];
        let image = PixelBuffer::from_u8(3, 1, samples).unwrap();
        let hist = Histogram::compute(&image);
        assert_eq!(hist.value(Channel::Luminosity, 10), 1.0);
        assert_eq!(hist.value(Channel::Luminosity, 200), 1.0);
        assert_eq!(hist.value(Channel::Luminosity, 250), 1.0);
        assert_eq!(hist.value(Channel::Alpha, 0), 3.0);
    }

    #[test]
    fn test_ranges_are_clamped() {
        let hist = Histogram::compute(&black_with_one_white());
        assert_eq!(hist.count(Channel::Red, 0, 10_000), 4.0);
        assert_eq!(hist.count(Channel::Red, 300, 400), 0.0);
        assert_eq!(hist.value(Channel::Red, 256), 0.0);
    }

    #[test]
    fn test_empty_range_mean_is_zero_sum() {
        let hist = Histogram::compute(&black_with_one_white());
        assert_eq!(hist.mean(Channel::Green, 10, 20), 0.0);
        assert_eq!(hist.std_dev(Channel::Green, 10, 20), 0.0);
    }

    #[test]
    fn test_percentile() {
        let hist = Histogram::compute(&black_with_one_white());
        assert_eq!(hist.percentile(Channel::Red, 0.5), 0);
        assert_eq!(hist.percentile(Channel::Red, 1.0), 255);
    }

    #[test]
    fn test_cancelled_pass_yields_nothing() {
        let token = CancelToken::new();
        token.cancel();
        assert!(Histogram::accumulate(&black_with_one_white(), &token).is_none());
    }
}
