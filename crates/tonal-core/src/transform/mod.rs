//! Lookup-table compilation, pixel remapping and progress reporting.

pub mod lut;
pub mod progress;
pub mod remap;
