//! Per-channel histograms and their background computation.

pub mod engine;
pub mod task;

pub use engine::Histogram;
pub use task::{HistogramEvent, HistogramTask, TaskState};
