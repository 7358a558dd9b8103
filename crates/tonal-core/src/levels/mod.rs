//! Levels adjustment: model, automatic levels and GIMP text I/O.

pub mod auto;
pub mod gimp;
pub mod model;

pub use model::{LevelsChannel, LevelsModel};
