//! File system utilities for cryptopulse

use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "cryptopulse";

/// Ensures a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).with_context(|| format!("Failed to create directory: {:?}", path))?;
    } else if !path.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("Path exists but is not a directory: {:?}", path),
        )
        .into());
    }
    Ok(())
}

/// Gets the application's cache directory, creating it if it doesn't exist
pub fn app_cache_dir() -> Result<PathBuf> {
    let dir = dirs::cache_dir()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "Could not find cache directory"))?
        .join(APP_DIR);

    ensure_dir(&dir)?;
    Ok(dir)
}

/// Path of the per-user config file. The directory is not created.
pub fn user_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
}

/// Reads a file to a string with context about the operation
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path.display()))
}

/// Writes a string to a file, creating parent directories if needed.
///
/// The content is written to a sibling temp file first and renamed into place
/// so readers never observe a half-written report.
pub fn write_file<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Output path has no file name"))?;
    let tmp = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));
    fs::write(&tmp, contents).with_context(|| format!("Failed to write file: {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to move file into place: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_ensure_dir() {
        let temp_dir = tempdir().unwrap();
        let test_dir = temp_dir.path().join("test_dir");

        ensure_dir(&test_dir).unwrap();
        assert!(test_dir.exists());
        assert!(test_dir.is_dir());

        // Idempotent
        ensure_dir(&test_dir).unwrap();
    }

    #[test]
    fn test_ensure_dir_rejects_file() {
        let temp_dir = tempdir().unwrap();
        let file = temp_dir.path().join("plain.txt");
        fs::write(&file, "x").unwrap();
        assert!(ensure_dir(&file).is_err());
    }

    #[test]
    fn test_read_write_file() {
        let temp_dir = tempdir().unwrap();
        let test_file = temp_dir.path().join("nested").join("report.json");

        write_file(&test_file, "{\"ok\":true}").unwrap();
        assert!(test_file.exists());
        assert_eq!(read_file(&test_file).unwrap(), "{\"ok\":true}");

        // No temp file left behind
        let leftovers: Vec<_> = fs::read_dir(test_file.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
