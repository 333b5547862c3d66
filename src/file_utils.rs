use anyhow::{Context, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use crate::app_config::normalize_extension;

// @module: File and directory utilities

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    /// Absolute form of `path`, with symlinks resolved as far as it exists
    ///
    /// Trailing components that do not exist yet are appended unchanged.
    pub fn resolve_path<P: AsRef<Path>>(path: P) -> PathBuf {
        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            normalize(path)
        } else {
            match std::env::current_dir() {
                Ok(cwd) => normalize(&cwd.join(path)),
                Err(_) => normalize(path),
            }
        };

        let mut existing = absolute.as_path();
        let mut missing = Vec::new();
        loop {
            if let Ok(canonical) = existing.canonicalize() {
                return missing.iter().rev().fold(canonical, |acc, part| acc.join(part));
            }
            match (existing.parent(), existing.file_name()) {
                (Some(parent), Some(name)) => {
                    missing.push(name.to_os_string());
                    existing = parent;
                }
                _ => return absolute,
            }
        }
    }

    /// Whether one of the two paths is, or lies inside, the other
    pub fn paths_overlap<P1: AsRef<Path>, P2: AsRef<Path>>(a: P1, b: P2) -> bool {
        let a = Self::resolve_path(a);
        let b = Self::resolve_path(b);
        a.starts_with(&b) || b.starts_with(&a)
    }

    /// Find files with one of `extensions` under `dir`, in lexicographic walk order
    ///
    /// Entries are sorted by file name inside every directory, so the result is
    /// the same on every platform. Unreadable entries are skipped.
    pub fn find_files<P: AsRef<Path>>(dir: P, extensions: &[String]) -> Vec<PathBuf> {
        let wanted: Vec<String> = extensions.iter().map(|ext| normalize_extension(ext)).collect();

        WalkDir::new(dir.as_ref())
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                Self::extension_of(entry.path())
                    .is_some_and(|ext| wanted.contains(&ext))
            })
            .map(|entry| entry.into_path())
            .collect()
    }

    /// Lowercased extension of `path`, without the dot
    pub fn extension_of(path: &Path) -> Option<String> {
        path.extension().map(|ext| ext.to_string_lossy().to_lowercase())
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Copy a file from one location to another, ensuring the target directory exists
    pub fn copy_file<P1: AsRef<Path>, P2: AsRef<Path>>(from: P1, to: P2) -> Result<()> {
        let from = from.as_ref();
        let to = to.as_ref();

        if !from.exists() {
            return Err(anyhow::anyhow!("Source file does not exist: {:?}", from));
        }

        if let Some(parent) = to.parent() {
            Self::ensure_dir(parent)?;
        }

        fs::copy(from, to)
            .with_context(|| format!("Failed to copy {:?} to {:?}", from, to))?;

        Ok(())
    }
}

// Drop `.` components and fold `..` into their parent, without touching the disk
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
