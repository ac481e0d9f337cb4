//! Raw little-endian `f32` matrix files: no header, no compression.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::debug;

use crate::error::{NumericError, Result};

/// Write `data` to `path` as consecutive little-endian `f32` values.
pub fn write_to_binary(path: &Path, data: &[f32]) -> Result<()> {
    let io_err = |source| NumericError::Io { path: path.to_path_buf(), source };

    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    for value in data {
        writer.write_all(&value.to_le_bytes()).map_err(io_err)?;
    }
    writer.flush().map_err(io_err)?;

    debug!(path = %path.display(), elements = data.len(), "wrote matrix");
    Ok(())
}

/// Read a file written by [`write_to_binary`].
pub fn read_from_binary(path: &Path) -> Result<Vec<f32>> {
    let bytes =
        std::fs::read(path).map_err(|source| NumericError::Io { path: path.to_path_buf(), source })?;
    if bytes.len() % 4 != 0 {
        return Err(NumericError::Format {
            path: path.to_path_buf(),
            reason: format!("length {} is not a multiple of 4", bytes.len()),
        });
    }
    let data: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    debug!(path = %path.display(), elements = data.len(), "read matrix");
    Ok(data)
}
