//! Imagery analysis algorithms
//!
//! - Change detection: difference two index rasters and classify the change

mod change_detection;

pub use change_detection::{
    classify_change, ChangeClass, ChangeClassification, ChangeGrids, ChangeThresholds,
};
