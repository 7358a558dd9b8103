//! Tonal Core: tone curves, levels and histograms for 8-bit and 16-bit
//! B,G,R,A images.
//!
//! Curves and levels compile into per-channel lookup tables that remap
//! pixel buffers in one pass. Curve settings persist as compact binary
//! blobs for the undo log and as GIMP-compatible text files.

pub mod channel;
pub mod curves;
pub mod error;
pub mod histogram;
pub mod image;
pub mod io;
pub mod levels;
pub mod params;
pub mod transform;

// Re-exports for convenience.
pub use channel::Channel;
pub use curves::{ControlPoint, CurveModel, CurveType};
pub use error::{Result, ToneError};
pub use histogram::{Histogram, HistogramEvent, HistogramTask, TaskState};
pub use image::{BitDepth, Color, PixelBuffer, PixelData};
pub use io::{FilterAction, ParamValue};
pub use levels::{LevelsChannel, LevelsModel};
pub use params::{CurvesParams, LevelsParams};
pub use transform::lut::{ChannelTransfer, LutSet};
pub use transform::progress::{CancelToken, Completion, ProgressContext};
pub use transform::remap::{remap_in_place, remap_in_place_with, remap_into, remapped};
