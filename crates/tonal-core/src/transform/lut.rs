//! Per-channel 1D lookup tables compiled from curves or levels.

use tracing::warn;

use crate::image::BitDepth;

/// Maximum number of color channels a [`LutSet`] holds (R, G, B, A).
pub const MAX_LUT_CHANNELS: usize = 4;

/// A per-channel tone transfer over normalized values.
///
/// Slot 0 is the overall channel; slots 1..=4 are red, green, blue and
/// alpha. Both `CurveModel` and `LevelsModel` implement this so a single
/// compiler serves either.
pub trait ChannelTransfer {
    /// Bit depth the transfer is defined at.
    fn depth(&self) -> BitDepth;

    /// Map a normalized input through the transfer held in `slot`.
    fn transfer(&self, slot: usize, value: f64) -> f64;
}

/// Dense lookup tables, one per active color channel, each sized
/// `segment_max + 1`.
///
/// Table 0 maps red, 1 green, 2 blue and 3 alpha.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LutSet {
    depth: BitDepth,
    tables: Vec<Vec<u16>>,
}

impl LutSet {
    /// Compile tables for the first `active_channels` color channels.
    ///
    /// Each color channel is first mapped through its own transfer and then
    /// through the overall channel. When 2 or 4 channels are active the last
    /// one is alpha and skips the overall channel. A single active channel
    /// maps through the overall channel only.
    pub fn compile<T: ChannelTransfer + ?Sized>(source: &T, active_channels: usize) -> Self {
        let depth = source.depth();
        let active = if active_channels > MAX_LUT_CHANNELS {
            warn!(active_channels, "clamping LUT channel count to {MAX_LUT_CHANNELS}");
            MAX_LUT_CHANNELS
        } else {
            active_channels
        };

        let max = depth.segment_max() as f64;
        let tables = (0..active)
            .map(|channel| {
                let stages = stages(channel, active);
                (0..depth.segments())
                    .map(|v| {
                        let f = stages
                            .iter()
                            .fold(v as f64 / max, |f, &slot| source.transfer(slot, f));
                        (max * f + 0.5).clamp(0.0, max) as u16
                    })
                    .collect()
            })
            .collect();

        Self { depth, tables }
    }

    /// Identity tables for `active_channels` channels.
    pub fn identity(depth: BitDepth, active_channels: usize) -> Self {
        let active = active_channels.min(MAX_LUT_CHANNELS);
        let table: Vec<u16> = (0..depth.segments()).map(|v| v as u16).collect();
        Self {
            depth,
            tables: vec![table; active],
        }
    }

    pub fn depth(&self) -> BitDepth {
        self.depth
    }

    /// Number of compiled tables.
    pub fn channel_count(&self) -> usize {
        self.tables.len()
    }

    pub(crate) fn tables(&self) -> &[Vec<u16>] {
        &self.tables
    }

    pub fn table(&self, index: usize) -> Option<&[u16]> {
        self.tables.get(index).map(Vec::as_slice)
    }

    /// Look up `value` in table `index`. `None` if the table is missing or
    /// the value is outside the depth's range.
    pub fn lookup(&self, index: usize, value: usize) -> Option<u16> {
        self.table(index)?.get(value).copied()
    }
}

fn stages(channel: usize, active: usize) -> Vec<usize> {
    if active == 1 {
        return vec![0];
    }
    let is_alpha = (active == 2 || active == 4) && channel == active - 1;
    if is_alpha {
        vec![channel + 1]
    } else {
        vec![channel + 1, 0]
    }
}
