//! Moving curves between 8-bit and 16-bit depths.
//!
//! Coordinates are scaled by [`DEPTH_MULTIPLIER`] in both directions and the
//! tables are re-derived from the scaled points rather than by stretching
//! the sampled table.

use crate::channel::Channel;
use crate::curves::model::{ControlPoint, CurveModel, CurveType, NUM_POINTS};
use crate::image::{BitDepth, DEPTH_MULTIPLIER};

impl CurveModel {
    /// Replace this model's curves with `other`'s, converting depth if needed.
    ///
    /// Smooth channels copy their enabled points (scaled when depths
    /// differ). Free channels copy their table; going 8 → 16 bits the
    /// scaled samples are joined by straight lines.
    pub fn fill_from(&mut self, other: &CurveModel) {
        self.reset_all();

        let (from, to) = (other.depth(), self.depth());
        let scale = move |v: i32| match (from, to) {
            (BitDepth::U8, BitDepth::U16) => v * DEPTH_MULTIPLIER,
            (BitDepth::U16, BitDepth::U8) => v / DEPTH_MULTIPLIER,
            _ => v,
        };

        for channel in Channel::ALL {
            match other.curve_type(channel) {
                CurveType::Smooth => {
                    self.set_curve_type(channel, CurveType::Smooth);
                    for (i, p) in other.points(channel).into_iter().enumerate() {
                        if p.is_enabled() {
                            self.set_point(channel, i, ControlPoint::new(scale(p.x), scale(p.y)));
                        } else {
                            self.disable_point(channel, i);
                        }
                    }
                }
                CurveType::Free => {
                    let table = free_table(other.curve(channel), from, to);
                    self.set_values(channel, &table);
                }
            }
        }

        self.recalculate_all();
    }

    /// A copy of this model at another depth.
    pub fn converted(&self, depth: BitDepth) -> CurveModel {
        let mut target = CurveModel::new(depth);
        target.fill_from(self);
        target
    }
}

fn free_table(source: &[u16], from: BitDepth, to: BitDepth) -> Vec<u16> {
    let m = DEPTH_MULTIPLIER as usize;
    match (from, to) {
        (BitDepth::U8, BitDepth::U16) => {
            let mut table = vec![0u16; to.segments()];
            for (i, pair) in source.windows(2).enumerate() {
                let (y0, y1) = (pair[0] as i64 * m as i64, pair[1] as i64 * m as i64);
                for step in 0..m {
                    table[i * m + step] = (y0 + (y1 - y0) * step as i64 / m as i64) as u16;
                }
            }
            let tail = source[source.len() - 1] * m as u16;
            for v in &mut table[(source.len() - 1) * m..] {
                *v = tail;
            }
            table
        }
        (BitDepth::U16, BitDepth::U8) => (0..to.segments()).map(|i| source[i * m] / m as u16).collect(),
        _ => source.to_vec(),
    }
}

/// Bring a table sized for the other depth onto `target`.
///
/// Seventeen evenly spaced samples of the table become control points of a
/// smooth curve at the source depth, which is then converted. Returns
/// `None` when the length matches neither depth.
pub(crate) fn resample_values(values: &[u16], channel: Channel, target: BitDepth) -> Option<Vec<u16>> {
    let source_depth = match values.len() {
        n if n == BitDepth::U8.segments() => BitDepth::U8,
        n if n == BitDepth::U16.segments() => BitDepth::U16,
        _ => return None,
    };
    tracing::debug!("resampling {source_depth} {channel} curve to {target}");

    let max = source_depth.segment_max();
    let mut source = CurveModel::new(source_depth);
    for i in 0..NUM_POINTS as i32 {
        let index = (i * max / (NUM_POINTS as i32 - 1)).clamp(0, max);
        source.set_point(channel, i as usize, ControlPoint::new(index, values[index as usize] as i32));
    }
    source.recalculate(channel);

    Some(source.converted(target).curve(channel).to_vec())
}
