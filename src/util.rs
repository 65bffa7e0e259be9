//! Utility functions for ear-dojo.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::{DojoError, Result};

/// Maximum file size that can be read into memory (1 MB).
///
/// A profile is a few kilobytes; anything near this limit is corrupt.
pub const MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Read a file into a string with size limit protection.
///
/// # Errors
///
/// Returns an error if:
/// * The file cannot be read (doesn't exist, permission denied, etc.)
/// * The file exceeds `MAX_FILE_SIZE`
pub fn read_to_string_limited(path: &Path) -> Result<String> {
    read_to_string_with_limit(path, MAX_FILE_SIZE)
}

/// Read a file into a string with a custom size limit.
pub fn read_to_string_with_limit(path: &Path, max_size: u64) -> Result<String> {
    let metadata = fs::metadata(path).map_err(|e| DojoError::storage(path, e))?;

    let size = metadata.len();
    if size > max_size {
        return Err(DojoError::serde(format!(
            "File {} is too large ({} bytes, max {} bytes)",
            path.display(),
            size,
            max_size
        )));
    }

    fs::read_to_string(path).map_err(|e| DojoError::storage(path, e))
}

/// Write `contents` to `path` atomically via a sibling temp file + rename.
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    if !parent.as_os_str().is_empty() && !parent.exists() {
        fs::create_dir_all(parent).map_err(|e| DojoError::storage(parent, e))?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "data".to_string());
    let temp_path = parent.join(format!(".{}.tmp", file_name));

    {
        let mut file = fs::File::create(&temp_path).map_err(|e| DojoError::storage(&temp_path, e))?;
        file.write_all(contents)
            .map_err(|e| DojoError::storage(&temp_path, e))?;
        file.sync_all()
            .map_err(|e| DojoError::storage(&temp_path, e))?;
    }

    // Rename temp file to final path (atomic on POSIX)
    fs::rename(&temp_path, path).map_err(|e| DojoError::storage(path, e))?;

    Ok(())
}
