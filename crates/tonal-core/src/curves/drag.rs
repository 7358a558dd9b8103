//! Interactive curve editing in table coordinates.
//!
//! [`PointDrag`] moves a smooth-curve control point between its enabled
//! neighbors; [`FreeStroke`] draws line segments into a free curve.

use crate::channel::Channel;
use crate::curves::model::{ControlPoint, CurveModel, CurveType, NUM_POINTS};

/// Width of the input range covered by one control point slot.
fn slot_width(model: &CurveModel) -> i32 {
    model.depth().segments() as i32 / (NUM_POINTS as i32 - 1)
}

fn slot_for(model: &CurveModel, x: i32) -> usize {
    let width = slot_width(model);
    ((x + width / 2) / width).clamp(0, NUM_POINTS as i32 - 1) as usize
}

/// Slot a click at input `x` should act on: the nearest enabled point when
/// one is close enough, otherwise the slot covering `x`.
pub fn closest_point(model: &CurveModel, channel: Channel, x: i32) -> usize {
    let snap = model.depth().segments() as i32 / 32;
    let nearest = model
        .points(channel)
        .iter()
        .enumerate()
        .filter(|(_, p)| p.x != -1)
        .map(|(i, p)| (i, (x - p.x).abs()))
        .min_by_key(|&(i, d)| (d, i));

    match nearest {
        Some((i, d)) if d <= snap => i,
        _ => slot_for(model, x),
    }
}

/// A control point held by the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointDrag {
    channel: Channel,
    grabbed: usize,
    left_most: i32,
    right_most: i32,
}

impl PointDrag {
    /// Grab (or create) the point nearest to `(x, y)` on a smooth channel.
    ///
    /// The x range the point may move in is fixed here, from the nearest
    /// enabled slots on either side.
    pub fn grab(model: &mut CurveModel, channel: Channel, x: i32, y: i32) -> Option<Self> {
        if model.curve_type(channel) != CurveType::Smooth {
            return None;
        }
        let max = model.segment_max();
        let (x, y) = (x.clamp(0, max), y.clamp(0, max));
        let grabbed = closest_point(model, channel, x);

        let left_most = (0..grabbed)
            .rev()
            .map(|i| model.point(channel, i))
            .find(|p| p.x != -1)
            .map_or(-1, |p| p.x);
        let right_most = (grabbed + 1..NUM_POINTS)
            .map(|i| model.point(channel, i))
            .find(|p| p.x != -1)
            .map_or(max + 1, |p| p.x);

        model.set_point(channel, grabbed, ControlPoint::new(x, y));
        model.recalculate(channel);

        Some(Self { channel, grabbed, left_most, right_most })
    }

    pub fn grabbed(&self) -> usize {
        self.grabbed
    }

    /// Exclusive x bounds fixed at grab time.
    pub fn bounds(&self) -> (i32, i32) {
        (self.left_most, self.right_most)
    }

    /// Move the held point. Dragging past a neighbor removes it.
    pub fn drag_to(&mut self, model: &mut CurveModel, x: i32, y: i32) {
        let max = model.segment_max();
        let (x, y) = (x.clamp(0, max), y.clamp(0, max));

        model.set_point_x(self.channel, self.grabbed, -1);

        if x > self.left_most && x < self.right_most {
            let slot = slot_for(model, x);
            if model.point(self.channel, slot).x == -1 {
                self.grabbed = slot;
            }
            model.set_point(self.channel, self.grabbed, ControlPoint::new(x, y));
        }

        model.recalculate(self.channel);
    }
}

/// A freehand stroke on a free curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeStroke {
    channel: Channel,
    last_x: i32,
    last_y: i32,
}

impl FreeStroke {
    pub fn begin(model: &mut CurveModel, channel: Channel, x: i32, y: i32) -> Option<Self> {
        if model.curve_type(channel) != CurveType::Free {
            return None;
        }
        let max = model.segment_max();
        let (x, y) = (x.clamp(0, max), y.clamp(0, max));
        model.set_value(channel, x as usize, y);
        Some(Self { channel, last_x: x, last_y: y })
    }

    /// Draw a straight line from the previous position to `(x, y)`.
    pub fn draw_to(&mut self, model: &mut CurveModel, x: i32, y: i32) {
        let max = model.segment_max();
        let (x, y) = (x.clamp(0, max), y.clamp(0, max));

        let ((x1, y1), (x2, y2)) = if self.last_x > x {
            ((x, y), (self.last_x, self.last_y))
        } else {
            ((self.last_x, self.last_y), (x, y))
        };

        if x1 == x2 {
            model.set_value(self.channel, x as usize, y);
        } else {
            let (dy, dx) = ((y2 - y1) as i64, (x2 - x1) as i64);
            for i in x1..=x2 {
                let y = y1 as i64 + dy * (i - x1) as i64 / dx;
                model.set_value(self.channel, i as usize, y as i32);
            }
        }

        self.last_x = x;
        self.last_y = y;
    }
}
