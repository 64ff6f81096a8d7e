use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

/// Filesystem helpers.
pub struct IOUtil;

impl IOUtil {
    /// Create a new, uniquely named directory under `parent` and keep it.
    ///
    /// The name is `<prefix><random><suffix>`. The directory is not removed
    /// when this function returns; the caller owns it from here on.
    pub fn create_temp_directory_in(
        parent: &Path,
        prefix: &str,
        suffix: &str,
    ) -> std::io::Result<PathBuf> {
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempdir_in(parent)?;
        Ok(dir.keep())
    }

    /// Read a file and deserialize it from JSON.
    pub fn load_object<T: DeserializeOwned>(path: &Path) -> Result<T> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file '{}'", path.display()))?;
        let value = serde_json::from_str(&json)
            .with_context(|| format!("Failed to deserialize JSON from '{}'", path.display()))?;
        Ok(value)
    }

    /// Read a file to a string, returning `None` if it does not exist.
    pub fn read_optional(path: &Path) -> Result<Option<String>> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read file '{}'", path.display())),
        }
    }
}
