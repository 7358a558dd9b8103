//! Persistence: curve blobs, GIMP curves text files and the undo-log
//! parameter bag.

pub mod action;
pub mod binary;
pub mod gimp;

pub use action::{FilterAction, ParamValue};
