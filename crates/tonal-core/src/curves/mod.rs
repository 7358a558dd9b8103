//! Tone curves: spline evaluation, the per-channel model, depth conversion
//! and interactive editing helpers.

pub mod convert;
pub mod drag;
pub mod model;
pub mod spline;

pub use drag::{FreeStroke, PointDrag, closest_point};
pub use model::{ControlPoint, CurveModel, CurveType, NUM_POINTS};
