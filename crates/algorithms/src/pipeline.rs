//! End-to-end NDVI change pipeline
//!
//! Load two index rasters, put the comparison on the reference grid,
//! classify the change, total the loss and gain areas, estimate the trees
//! needed, and write the difference raster, polygon layers and summary.

use crate::imagery::{classify_change, ChangeClass, ChangeGrids, ChangeThresholds};
use crate::resample::align_to_reference;
use crate::restoration::{trees_needed, RestorationParams};
use crate::statistics::{change_areas, AreaParams, ChangeAreas};
use crate::vector::polygonize;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use verdant_core::io::{read_geotiff, write_geojson, write_geotiff, write_json, GeoTiffOptions};
use verdant_core::raster::Raster;
use verdant_core::vector::FeatureCollection;
use verdant_core::{Error, Result};

/// Reference (earlier) raster file name under `data/inputs`
pub const REFERENCE_FILE: &str = "July_2024_Sentinel-2_L2A_NDVI.tiff";
/// Comparison (later) raster file name under `data/inputs`
pub const COMPARISON_FILE: &str = "July_2025_Sentinel-2_L2A_NDVI.tiff";

pub const DELTA_FILE: &str = "delta_ndvi.tif";
pub const DECREASE_FILE: &str = "decrease.geojson";
pub const INCREASE_FILE: &str = "increase.geojson";
pub const SUMMARY_FILE: &str = "summary.json";

/// Sign convention recorded in the summary
pub const SUMMARY_NOTE: &str = "positive = vegetation increase, negative = decrease";

/// All tunable pipeline settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeConfig {
    pub thresholds: ChangeThresholds,
    pub area: AreaParams,
    pub restoration: RestorationParams,
}

impl ChangeConfig {
    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;
        self.area.validate()?;
        self.restoration.validate()
    }

    /// Load from a JSON file; missing fields keep their defaults.
    ///
    /// The result is not validated, so callers can apply overrides first.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::InputAccess {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Input and output locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelinePaths {
    pub reference: PathBuf,
    pub comparison: PathBuf,
    pub output_dir: PathBuf,
}

impl PipelinePaths {
    /// Standard layout: `<base>/data/inputs/*.tiff` in, `<base>/data/outputs/` out
    pub fn from_base_dir<P: AsRef<Path>>(base: P) -> Self {
        let data = base.as_ref().join("data");
        let inputs = data.join("inputs");
        Self {
            reference: inputs.join(REFERENCE_FILE),
            comparison: inputs.join(COMPARISON_FILE),
            output_dir: data.join("outputs"),
        }
    }

    pub fn delta(&self) -> PathBuf {
        self.output_dir.join(DELTA_FILE)
    }

    pub fn decrease(&self) -> PathBuf {
        self.output_dir.join(DECREASE_FILE)
    }

    pub fn increase(&self) -> PathBuf {
        self.output_dir.join(INCREASE_FILE)
    }

    pub fn summary(&self) -> PathBuf {
        self.output_dir.join(SUMMARY_FILE)
    }
}

/// Contents of `summary.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeSummary {
    pub note: String,
    pub total_loss_m2: f64,
    pub total_gain_m2: f64,
    pub loss_km2: f64,
    pub gain_km2: f64,
    pub trees_needed: u64,
    pub recovery_fraction: f64,
    pub crown_m2_per_tree: f64,
}

/// Everything computed from one reference/comparison pair
#[derive(Debug, Clone)]
pub struct ChangeAnalysis {
    pub grids: ChangeGrids,
    pub areas: ChangeAreas,
    pub trees_needed: u64,
    pub decrease: FeatureCollection,
    pub increase: FeatureCollection,
    pub restoration: RestorationParams,
}

impl ChangeAnalysis {
    pub fn summary(&self) -> ChangeSummary {
        ChangeSummary {
            note: SUMMARY_NOTE.to_string(),
            total_loss_m2: self.areas.loss_m2,
            total_gain_m2: self.areas.gain_m2,
            loss_km2: self.areas.loss_km2(),
            gain_km2: self.areas.gain_km2(),
            trees_needed: self.trees_needed,
            recovery_fraction: self.restoration.recovery_fraction,
            crown_m2_per_tree: self.restoration.crown_m2_per_tree,
        }
    }
}

/// Files written by [`write_outputs`]
#[derive(Debug, Clone)]
pub struct PipelineOutputs {
    pub delta: PathBuf,
    /// `None` when no pixel fell in a decrease class
    pub decrease: Option<PathBuf>,
    /// `None` when no pixel fell in an increase class
    pub increase: Option<PathBuf>,
    pub summary_path: PathBuf,
    pub summary: ChangeSummary,
}

/// Read the reference and comparison rasters
pub fn load_inputs(paths: &PipelinePaths) -> Result<(Raster<f32>, Raster<f32>)> {
    let reference = read_geotiff::<f32, _>(&paths.reference)?;
    info!(
        path = %paths.reference.display(),
        rows = reference.rows(),
        cols = reference.cols(),
        "loaded reference raster"
    );
    let comparison = read_geotiff::<f32, _>(&paths.comparison)?;
    info!(
        path = %paths.comparison.display(),
        rows = comparison.rows(),
        cols = comparison.cols(),
        "loaded comparison raster"
    );
    Ok((reference, comparison))
}

/// Align, classify, aggregate and polygonize
pub fn analyze(reference: &Raster<f32>, comparison: &Raster<f32>, config: &ChangeConfig) -> Result<ChangeAnalysis> {
    config.validate()?;

    let aligned = align_to_reference(reference, comparison)?;
    let grids = classify_change(reference, &aligned, &config.thresholds)?;
    let areas = change_areas(&grids.classes, &config.area)?;
    let trees = trees_needed(areas.loss_m2, &config.restoration)?;

    let decrease_codes = ChangeClass::DECREASE.map(ChangeClass::code);
    let increase_codes = ChangeClass::INCREASE.map(ChangeClass::code);
    let decrease = polygonize(&grids.classes, &decrease_codes)?;
    let increase = polygonize(&grids.classes, &increase_codes)?;

    info!(
        loss_km2 = areas.loss_km2(),
        gain_km2 = areas.gain_km2(),
        trees_needed = trees,
        "change analysis complete"
    );

    Ok(ChangeAnalysis {
        grids,
        areas,
        trees_needed: trees,
        decrease,
        increase,
        restoration: config.restoration,
    })
}

/// Write the difference raster, the non-empty polygon layers and the summary
pub fn write_outputs(analysis: &ChangeAnalysis, output_dir: &Path) -> Result<PipelineOutputs> {
    std::fs::create_dir_all(output_dir).map_err(|e| Error::OutputWrite {
        path: output_dir.to_path_buf(),
        reason: e.to_string(),
    })?;

    let delta = output_dir.join(DELTA_FILE);
    write_geotiff(&analysis.grids.difference, &delta, Some(GeoTiffOptions { write_nodata: true }))?;

    let decrease = write_layer(&analysis.decrease, &output_dir.join(DECREASE_FILE), "decrease")?;
    let increase = write_layer(&analysis.increase, &output_dir.join(INCREASE_FILE), "increase")?;

    let summary = analysis.summary();
    let summary_path = output_dir.join(SUMMARY_FILE);
    write_json(&summary, &summary_path)?;

    Ok(PipelineOutputs {
        delta,
        decrease,
        increase,
        summary_path,
        summary,
    })
}

fn write_layer(features: &FeatureCollection, path: &Path, label: &str) -> Result<Option<PathBuf>> {
    if features.is_empty() {
        warn!("no {} polygons; {} not written", label, path.display());
        return Ok(None);
    }
    write_geojson(features, path)?;
    info!(path = %path.display(), polygons = features.len(), "saved {} polygons", label);
    Ok(Some(path.to_path_buf()))
}

/// Run the whole pipeline on files
pub fn run(paths: &PipelinePaths, config: &ChangeConfig) -> Result<PipelineOutputs> {
    let (reference, comparison) = load_inputs(paths)?;
    let analysis = analyze(&reference, &comparison, config)?;
    write_outputs(&analysis, &paths.output_dir)
}
