//! Configuration file discovery and loading.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ProvisionError, Result};

/// One provisioning configuration file loaded into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationFile {
    /// Base name without extension; becomes the entity identifier in the
    /// domain (index name, role name, policy id, ...).
    pub name: String,
    /// Raw file text.
    pub contents: String,
}

const EXCLUDED_FILE: &str = ".gitkeep";

/// Lists every configuration file under `root`, recursively.
///
/// Entries are sorted by name at each level so processing order does not
/// depend on the platform's directory read order.
pub fn list_files(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(ProvisionError::InvalidDirectoryPath(root.to_path_buf()));
    }

    let mut files = Vec::new();
    collect(root, &mut files)?;
    Ok(files)
}

fn collect(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir)
        .map_err(|_| ProvisionError::InvalidDirectoryPath(dir.to_path_buf()))?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.file_name().is_none_or(|name| name != EXCLUDED_FILE))
        .collect();
    paths.sort();

    for path in paths {
        if path.is_dir() {
            collect(&path, files)?;
        } else {
            files.push(path);
        }
    }

    Ok(())
}

/// Loads one configuration file into memory.
pub fn load_file(path: &Path) -> Result<ConfigurationFile> {
    if !path.is_file() {
        return Err(ProvisionError::InvalidFilePath(path.to_path_buf()));
    }

    let contents = fs::read_to_string(path)
        .map_err(|_| ProvisionError::InvalidFilePath(path.to_path_buf()))?;
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
        .ok_or_else(|| ProvisionError::InvalidFilePath(path.to_path_buf()))?;

    Ok(ConfigurationFile { name, contents })
}
