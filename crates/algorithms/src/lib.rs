//! # Verdant Algorithms
//!
//! Vegetation change analysis for Verdant.
//!
//! ## Available Algorithm Categories
//!
//! - **resample**: Bilinear alignment of one raster onto another's grid
//! - **imagery**: NDVI difference and change classification
//! - **statistics**: Loss and gain area aggregation
//! - **vector**: Polygonization of class regions
//! - **restoration**: Tree planting estimate
//! - **pipeline**: The end-to-end change pipeline

pub mod imagery;
pub mod pipeline;
pub mod resample;
pub mod restoration;
pub mod statistics;
pub mod vector;

mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::imagery::{
        classify_change, ChangeClass, ChangeClassification, ChangeGrids, ChangeThresholds,
    };
    pub use crate::pipeline::{
        analyze, run, ChangeAnalysis, ChangeConfig, ChangeSummary, PipelineOutputs, PipelinePaths,
    };
    pub use crate::resample::{align_to_reference, resample_bilinear};
    pub use crate::restoration::{trees_needed, RestorationParams};
    pub use crate::statistics::{change_areas, AreaParams, ChangeAreas, ClassHistogram};
    pub use crate::vector::polygonize;
    pub use verdant_core::prelude::*;
}
