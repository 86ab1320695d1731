//! JSON document output

use crate::error::{Error, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Serialize `value` as pretty-printed JSON (two-space indent) to `path`.
pub fn write_json<T, P>(value: &T, path: P) -> Result<()>
where
    T: Serialize + ?Sized,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| Error::output(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|e| Error::output(path, e))?;
    writer.write_all(b"\n").map_err(|e| Error::output(path, e))?;
    writer.flush().map_err(|e| Error::output(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn writes_pretty_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        write_json(&json!({ "trees_needed": 3 }), &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "{\n  \"trees_needed\": 3\n}\n");
    }

    #[test]
    fn missing_directory_is_output_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("summary.json");
        assert!(matches!(
            write_json(&json!({}), &path),
            Err(Error::OutputWrite { .. })
        ));
    }
}
