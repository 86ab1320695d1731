//! I/O for the files the change pipeline reads and writes

mod features;
mod geotiff;
mod json;

pub use features::write_geojson;
pub use geotiff::{read_geotiff, write_geotiff, GeoTiffOptions};
pub use json::write_json;
