//! End-to-end tests of the change pipeline on temporary GeoTIFF files.

use std::path::Path;
use verdant_algorithms::pipeline::{
    run, ChangeConfig, ChangeSummary, PipelinePaths, COMPARISON_FILE, REFERENCE_FILE, SUMMARY_NOTE,
};
use verdant_core::io::{read_geotiff, write_geotiff};
use verdant_core::raster::{GeoTransform, Raster};
use verdant_core::{Error, CRS};

const ORIGIN: (f64, f64) = (-79.42, 43.71);
const PIXEL: f64 = 0.0001;

fn georef(mut raster: Raster<f32>, pixel: f64) -> Raster<f32> {
    raster.set_transform(GeoTransform::new(ORIGIN.0, ORIGIN.1, pixel, -pixel));
    raster.set_crs(Some(CRS::wgs84()));
    raster
}

fn write_inputs(base: &Path, reference: &Raster<f32>, comparison: &Raster<f32>) {
    let inputs = base.join("data").join("inputs");
    std::fs::create_dir_all(&inputs).unwrap();
    write_geotiff(reference, inputs.join(REFERENCE_FILE), None).unwrap();
    write_geotiff(comparison, inputs.join(COMPARISON_FILE), None).unwrap();
}

fn read_summary(path: &Path) -> ChangeSummary {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn loss_in_top_half_writes_decrease_layer_only() {
    let dir = tempfile::tempdir().unwrap();
    let reference = georef(Raster::filled(20, 20, 0.5), PIXEL);
    let mut comparison = reference.clone();
    for row in 0..10 {
        for col in 0..20 {
            comparison.set(row, col, 0.1).unwrap();
        }
    }
    write_inputs(dir.path(), &reference, &comparison);

    let paths = PipelinePaths::from_base_dir(dir.path());
    let outputs = run(&paths, &ChangeConfig::default()).unwrap();

    assert_eq!(outputs.delta, paths.delta());
    assert_eq!(outputs.decrease.as_deref(), Some(paths.decrease().as_path()));
    assert!(outputs.increase.is_none());
    assert!(!paths.increase().exists());

    let delta = read_geotiff::<f32, _>(paths.delta()).unwrap();
    assert_eq!(delta.shape(), (20, 20));
    assert!((delta.get(0, 0).unwrap() + 0.4).abs() < 1e-6);
    assert_eq!(delta.get(15, 3).unwrap(), 0.0);
    assert_eq!(delta.crs().and_then(|c| c.epsg()), Some(4326));

    let text = std::fs::read_to_string(paths.decrease()).unwrap();
    let geojson: serde_json::Value = serde_json::from_str(&text).unwrap();
    let features = geojson["features"].as_array().unwrap();
    assert_eq!(features.len(), 1);
    assert_eq!(features[0]["properties"]["class"], 5);
    assert_eq!(features[0]["geometry"]["type"], "Polygon");

    let summary = read_summary(&paths.summary());
    assert_eq!(summary, outputs.summary);
    assert_eq!(summary.note, SUMMARY_NOTE);
    assert_eq!(summary.total_gain_m2, 0.0);
    let pixel_area = ChangeConfig::default().area.pixel_area_m2(reference.transform());
    assert!((summary.total_loss_m2 - 200.0 * pixel_area).abs() < 1e-6);
    assert_eq!(summary.trees_needed, (200.0 * pixel_area * 0.5 / 40.0).floor() as u64);
}

#[test]
fn finer_comparison_grid_is_aligned_to_reference() {
    let dir = tempfile::tempdir().unwrap();
    let reference = georef(Raster::filled(8, 8, 0.2), PIXEL);
    let comparison = georef(Raster::filled(16, 16, 0.9), PIXEL / 2.0);
    write_inputs(dir.path(), &reference, &comparison);

    let paths = PipelinePaths::from_base_dir(dir.path());
    let outputs = run(&paths, &ChangeConfig::default()).unwrap();

    assert!(outputs.decrease.is_none());
    assert!(outputs.increase.is_some());

    let delta = read_geotiff::<f32, _>(&outputs.delta).unwrap();
    assert_eq!(delta.shape(), reference.shape());
    assert_eq!(delta.transform(), reference.transform());
    assert!(delta.data().iter().all(|d| (d - 0.7).abs() < 1e-5));
}

#[test]
fn missing_input_is_reported_with_path() {
    let dir = tempfile::tempdir().unwrap();
    let paths = PipelinePaths::from_base_dir(dir.path());

    match run(&paths, &ChangeConfig::default()) {
        Err(Error::InputAccess { path, .. }) => assert_eq!(path, paths.reference),
        other => panic!("expected input access error, got {:?}", other.map(|o| o.summary)),
    }
    assert!(!paths.output_dir.exists());
}

#[test]
fn unwritable_output_dir_fails() {
    let dir = tempfile::tempdir().unwrap();
    let reference = georef(Raster::filled(4, 4, 0.5), PIXEL);
    write_inputs(dir.path(), &reference, &reference);

    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").unwrap();
    let mut paths = PipelinePaths::from_base_dir(dir.path());
    paths.output_dir = blocker.join("outputs");

    assert!(matches!(
        run(&paths, &ChangeConfig::default()),
        Err(Error::OutputWrite { .. })
    ));
}

#[test]
fn no_change_writes_no_polygons() {
    let dir = tempfile::tempdir().unwrap();
    let reference = georef(Raster::filled(5, 5, 0.4), PIXEL);
    write_inputs(dir.path(), &reference, &reference);

    let paths = PipelinePaths::from_base_dir(dir.path());
    let outputs = run(&paths, &ChangeConfig::default()).unwrap();

    assert!(outputs.decrease.is_none() && outputs.increase.is_none());
    assert!(paths.summary().exists());
    assert_eq!(read_summary(&paths.summary()).trees_needed, 0);
}
