//! Per-channel tone curves.
//!
//! A channel is either *smooth* (a Catmull-Rom spline through up to
//! [`NUM_POINTS`] control points) or *free* (an explicit output value for
//! every input value). Both keep a fully evaluated table of
//! `segment_max + 1` entries, which is what LUT compilation reads.
//!
//! Setters silently ignore out-of-range input: undo replay and interactive
//! editing rely on them being safe no-ops.

use serde::{Deserialize, Serialize};

use crate::channel::Channel;
use crate::curves::convert;
use crate::curves::spline::plot_segment;
use crate::image::BitDepth;
use crate::transform::lut::{ChannelTransfer, LutSet};

/// Control point slots per smooth channel.
pub const NUM_POINTS: usize = 17;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CurveType {
    /// Spline through control points.
    #[default]
    Smooth,
    /// Explicit value per input level.
    Free,
}

/// A control point in table units, or the `(-1, -1)` disabled sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlPoint {
    pub x: i32,
    pub y: i32,
}

impl ControlPoint {
    pub const DISABLED: Self = Self { x: -1, y: -1 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub const fn is_enabled(self) -> bool {
        self.x > -1 && self.y > -1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChannelCurve {
    pub(crate) curve_type: CurveType,
    pub(crate) points: [ControlPoint; NUM_POINTS],
    pub(crate) curve: Vec<u16>,
}

impl ChannelCurve {
    fn linear(depth: BitDepth) -> Self {
        let mut channel = Self {
            curve_type: CurveType::Smooth,
            points: [ControlPoint::DISABLED; NUM_POINTS],
            curve: vec![0; depth.segments()],
        };
        channel.reset(depth.segment_max());
        channel
    }

    fn reset(&mut self, segment_max: i32) {
        self.curve_type = CurveType::Smooth;
        for (i, v) in self.curve.iter_mut().enumerate() {
            *v = i as u16;
        }
        self.points = [ControlPoint::DISABLED; NUM_POINTS];
        self.points[0] = ControlPoint::new(0, 0);
        self.points[NUM_POINTS - 1] = ControlPoint::new(segment_max, segment_max);
    }
}

/// Tone curves for all five channels at a fixed bit depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurveModel {
    depth: BitDepth,
    pub(crate) channels: [ChannelCurve; Channel::COUNT],
    dirty: bool,
}

impl CurveModel {
    /// Linear curves on every channel.
    pub fn new(depth: BitDepth) -> Self {
        Self {
            depth,
            channels: std::array::from_fn(|_| ChannelCurve::linear(depth)),
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

    /// True once any setter has changed the model since the last full reset.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Reset every channel to a linear smooth curve and clear the dirty flag.
    pub fn reset_all(&mut self) {
        let max = self.segment_max();
        for channel in &mut self.channels {
            channel.reset(max);
        }
        self.dirty = false;
    }

    /// Reset one channel: smooth type, endpoints `(0,0)` and
    /// `(segment_max, segment_max)`, identity table.
    pub fn reset(&mut self, channel: Channel) {
        let max = self.segment_max();
        self.channels[channel.index()].reset(max);
    }

    pub fn curve_type(&self, channel: Channel) -> CurveType {
        self.channels[channel.index()].curve_type
    }

    pub fn set_curve_type(&mut self, channel: Channel, curve_type: CurveType) {
        self.channels[channel.index()].curve_type = curve_type;
    }

    pub fn set_curve_type_all(&mut self, curve_type: CurveType) {
        for channel in &mut self.channels {
            channel.curve_type = curve_type;
        }
    }

    /// Control point at `index`, or the disabled sentinel for a bad index.
    pub fn point(&self, channel: Channel, index: usize) -> ControlPoint {
        self.channels[channel.index()]
            .points
            .get(index)
            .copied()
            .unwrap_or(ControlPoint::DISABLED)
    }

    pub fn points(&self, channel: Channel) -> [ControlPoint; NUM_POINTS] {
        self.channels[channel.index()].points
    }

    pub fn is_point_enabled(&self, channel: Channel, index: usize) -> bool {
        self.point(channel, index).is_enabled()
    }

    /// Place a control point.
    ///
    /// Accepted only for `index < NUM_POINTS`, `x` in `[-1, segment_max]`
    /// and `y` in `[0, segment_max]`; `x == -1` disables the slot.
    pub fn set_point(&mut self, channel: Channel, index: usize, point: ControlPoint) {
        let max = self.segment_max();
        if index >= NUM_POINTS || point.x < -1 || point.x > max || point.y < 0 || point.y > max {
            return;
        }
        self.dirty = true;
        self.channels[channel.index()].points[index] = point;
    }

    /// Set only the x coordinate; `-1` disables the point.
    pub fn set_point_x(&mut self, channel: Channel, index: usize, x: i32) {
        if index >= NUM_POINTS || x < -1 || x > self.segment_max() {
            return;
        }
        self.dirty = true;
        self.channels[channel.index()].points[index].x = x;
    }

    pub fn set_point_y(&mut self, channel: Channel, index: usize, y: i32) {
        if index >= NUM_POINTS || y < 0 || y > self.segment_max() {
            return;
        }
        self.dirty = true;
        self.channels[channel.index()].points[index].y = y;
    }

    /// Return a slot to the disabled sentinel.
    pub fn disable_point(&mut self, channel: Channel, index: usize) {
        if index >= NUM_POINTS {
            return;
        }
        self.dirty = true;
        self.channels[channel.index()].points[index] = ControlPoint::DISABLED;
    }

    /// Replace the control points of a channel.
    ///
    /// An empty slice resets the channel. A full set is copied slot by slot.
    /// A shorter list resets the channel first; a single point lands in the
    /// middle slot, otherwise the leading points fill the first slots and
    /// the last point goes into the last slot.
    pub fn set_points(&mut self, channel: Channel, points: &[ControlPoint]) {
        match points {
            [] => self.reset(channel),
            _ if points.len() >= NUM_POINTS => {
                for (i, &p) in points.iter().take(NUM_POINTS).enumerate() {
                    if p.is_enabled() {
                        self.set_point(channel, i, p);
                    } else {
                        self.disable_point(channel, i);
                    }
                }
            }
            [single] => {
                self.reset(channel);
                self.set_point(channel, NUM_POINTS / 2, *single);
            }
            [leading @ .., last] => {
                self.reset(channel);
                for (i, &p) in leading.iter().enumerate() {
                    self.set_point(channel, i, p);
                }
                self.set_point(channel, NUM_POINTS - 1, *last);
            }
        }
    }

    /// The evaluated table for a channel (`segment_max + 1` entries).
    pub fn curve(&self, channel: Channel) -> &[u16] {
        &self.channels[channel.index()].curve
    }

    pub fn value(&self, channel: Channel, bin: usize) -> Option<u16> {
        self.channels[channel.index()].curve.get(bin).copied()
    }

    /// Write one entry of a free curve. Ignored for smooth channels and for
    /// a bin or value outside `[0, segment_max]`.
    pub fn set_value(&mut self, channel: Channel, bin: usize, value: i32) {
        let max = self.segment_max();
        let slot = &mut self.channels[channel.index()];
        if slot.curve_type != CurveType::Free || bin > max as usize || !(0..=max).contains(&value) {
            return;
        }
        self.dirty = true;
        slot.curve[bin] = value as u16;
    }

    /// Replace a channel's table and make it a free curve.
    ///
    /// An empty slice resets the channel. A table sized for the other bit
    /// depth is resampled through a smooth curve of that depth.
    pub fn set_values(&mut self, channel: Channel, values: &[u16]) {
        if values.is_empty() {
            self.reset(channel);
            return;
        }

        let resampled;
        let table = if values.len() == self.depth.segments() {
            values
        } else {
            match convert::resample_values(values, channel, self.depth) {
                Some(v) => {
                    resampled = v;
                    &resampled[..]
                }
                None => {
                    tracing::warn!(
                        "curve table of {} entries cannot be applied to a {} curve",
                        values.len(),
                        self.depth
                    );
                    return;
                }
            }
        };

        let max = self.segment_max() as u16;
        let slot = &mut self.channels[channel.index()];
        slot.curve_type = CurveType::Free;
        for (dst, &v) in slot.curve.iter_mut().zip(table) {
            if v <= max {
                *dst = v;
            }
        }
        self.dirty = true;
    }

    /// Re-evaluate a channel's table from its control points.
    ///
    /// Free curves are left untouched. A smooth curve with fewer than two
    /// enabled points keeps its previous table.
    pub fn recalculate(&mut self, channel: Channel) {
        let max = self.segment_max();
        let slot = &mut self.channels[channel.index()];
        if slot.curve_type == CurveType::Free {
            return;
        }

        let enabled: Vec<ControlPoint> = slot.points.iter().copied().filter(|p| p.is_enabled()).collect();
        if enabled.len() < 2 {
            tracing::debug!("{channel} curve has {} enabled points, table left as is", enabled.len());
            return;
        }

        let first = enabled[0];
        let last = enabled[enabled.len() - 1];
        let curve = &mut slot.curve;

        for v in &mut curve[..first.x as usize] {
            *v = first.y as u16;
        }
        for v in &mut curve[last.x as usize..] {
            *v = last.y as u16;
        }

        let n = enabled.len();
        for i in 0..n - 1 {
            let p0 = if i == 0 { enabled[i] } else { enabled[i - 1] };
            let p3 = if i == n - 2 { enabled[n - 1] } else { enabled[i + 2] };
            let quad = [p0, enabled[i], enabled[i + 1], p3].map(|p| [p.x, p.y]);
            plot_segment(curve, max, quad);
        }

        // Rounding in the forward differences can miss a placed point by one.
        for p in &enabled {
            curve[p.x as usize] = p.y as u16;
        }
    }

    pub fn recalculate_all(&mut self) {
        for channel in Channel::ALL {
            self.recalculate(channel);
        }
    }

    /// Whether the channel is the identity mapping.
    ///
    /// Free curves compare their table against the identity. Smooth curves
    /// may only have `(0,0)` and then `(segment_max, segment_max)` enabled,
    /// either of which may be missing from the end of that sequence.
    pub fn is_linear(&self, channel: Channel) -> bool {
        let max = self.segment_max();
        let slot = &self.channels[channel.index()];
        match slot.curve_type {
            CurveType::Free => slot.curve.iter().enumerate().all(|(i, &v)| v as usize == i),
            CurveType::Smooth => {
                let endpoints = [ControlPoint::new(0, 0), ControlPoint::new(max, max)];
                let enabled: Vec<ControlPoint> = slot.points.iter().copied().filter(|p| p.is_enabled()).collect();
                enabled.len() <= endpoints.len() && enabled.iter().zip(&endpoints).all(|(p, e)| p == e)
            }
        }
    }

    pub fn is_linear_all(&self) -> bool {
        Channel::ALL.iter().all(|&c| self.is_linear(c))
    }

    /// Recalculate every channel and compile lookup tables for
    /// `active_channels` color channels.
    pub fn compile_lut(&mut self, active_channels: usize) -> LutSet {
        self.recalculate_all();
        LutSet::compile(self, active_channels)
    }
}

impl ChannelTransfer for CurveModel {
    fn depth(&self) -> BitDepth {
        self.depth
    }

    /// Linear interpolation of the evaluated table at a normalized input.
    fn transfer(&self, slot: usize, value: f64) -> f64 {
        let max = self.segment_max() as f64;
        let curve = &self.channels[slot].curve;
        if value < 0.0 {
            curve[0] as f64 / max
        } else if value >= 1.0 {
            curve[curve.len() - 1] as f64 / max
        } else {
            let pos = value * max;
            let index = pos.floor() as usize;
            let f = pos - index as f64;
            ((1.0 - f) * curve[index] as f64 + f * curve[index + 1] as f64) / max
        }
    }
}
