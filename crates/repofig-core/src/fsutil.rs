//! Filesystem helpers shared by the store and the config writer.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::CoreError;

/// Write `content` to `path` through a temp file in the same directory, so
/// readers see either the old file or the new one.
pub(crate) fn write_atomic(path: &Path, content: &str) -> Result<(), CoreError> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
