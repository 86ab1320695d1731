//! GeoJSON output for feature collections

use crate::error::{Error, Result};
use crate::vector::FeatureCollection;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write `collection` as a GeoJSON FeatureCollection to `path`.
///
/// Features are written in collection order. An empty collection still
/// produces a valid document.
pub fn write_geojson<P: AsRef<Path>>(collection: &FeatureCollection, path: P) -> Result<()> {
    let path = path.as_ref();
    let geojson = collection.to_geojson();

    let file = File::create(path).map_err(|e| Error::output(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &geojson).map_err(|e| Error::output(path, e))?;
    writer.flush().map_err(|e| Error::output(path, e))?;

    tracing::debug!(path = %path.display(), features = collection.len(), "wrote GeoJSON");
    Ok(())
}
