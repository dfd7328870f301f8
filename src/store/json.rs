//! JSON file helpers shared by the cache and state files.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tempfile::NamedTempFile;

use crate::{FeederError, Result};

/// Read and decode a JSON file. A missing file yields `Ok(None)`.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<Option<T>> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(FeederError::Storage(format!(
                "reading {} file {}: {}",
                what,
                path.display(),
                e
            )))
        }
    };

    serde_json::from_slice(&data).map(Some).map_err(|e| {
        FeederError::Storage(format!("parsing {} file {}: {}", what, path.display(), e))
    })
}

/// Encode a value as pretty JSON and write it atomically.
///
/// The data goes to a temporary file in the destination directory which is
/// then renamed over `path`, so readers never observe a partial file.
pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| {
        FeederError::Storage(format!("creating directory {}: {}", dir.display(), e))
    })?;

    let data = serde_json::to_vec_pretty(value)?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| {
        FeederError::Storage(format!("creating temp file in {}: {}", dir.display(), e))
    })?;
    tmp.write_all(&data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| {
        FeederError::Storage(format!("renaming temp file to {}: {}", path.display(), e.error))
    })?;

    Ok(())
}

/// Deserialize `null` as the type's default value.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
