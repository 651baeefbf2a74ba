use std::fs;
use std::io;
use std::path::Path;

use dgflow_model::Parameters;

use crate::error::{IoError, Result};

/// Reads a JSON parameter file and validates it.
///
/// Missing fields take their defaults, so `{}` is a valid file.
pub fn load_parameters(path: impl AsRef<Path>) -> Result<Parameters> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => IoError::FileNotFound(path.display().to_string()),
        _ => IoError::Io(err),
    })?;
    let params: Parameters = serde_json::from_slice(&bytes)?;
    params.check().map_err(|source| IoError::InvalidParameters {
        path: path.display().to_string(),
        source,
    })?;
    Ok(params)
}

pub fn save_parameters(path: impl AsRef<Path>, params: &Parameters) -> Result<()> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;
    let bytes = serde_json::to_vec_pretty(params)?;
    fs::write(path, bytes)?;
    Ok(())
}

pub(crate) fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}
