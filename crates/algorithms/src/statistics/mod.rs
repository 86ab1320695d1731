//! Statistical summaries of raster data
//!
//! - **area**: Loss and gain area from change classes

pub mod area;

pub use area::{change_areas, AreaParams, ChangeAreas, ClassHistogram};
