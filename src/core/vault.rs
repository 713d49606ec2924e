//! Vault paths and asset access
//!
//! Asset references inside a block are vault-relative strings with mixed
//! separator conventions. [`resolve_with_base`] turns them into a canonical
//! `/`-separated vault path without touching the file system; the
//! [`VaultAdapter`] trait is the seam through which the plugin actually
//! reads bytes from whatever vault the host provides.

use std::cell::Cell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::core::config::{BlockConfig, ASSET_EXTENSION};

/// Resolve an asset reference against an optional note location.
pub fn resolve_asset_path(src: &str, note_path: Option<&str>) -> String {
    resolve_with_base(src, None, note_path)
}

/// Resolve an asset reference, honoring a configured assets base directory.
///
/// Rules, in order:
/// - backslashes become forward slashes, duplicate slashes collapse;
/// - a leading `/` or a drive prefix (`C:`) addresses the vault root and
///   ignores both the base and the note location;
/// - otherwise a non-empty base is joined in front (the base itself is
///   vault-root relative);
/// - otherwise the reference is relative to the note's folder, or to the
///   vault root when no note is given;
/// - `.` and `..` segments collapse lexically, clamped at the vault root.
pub fn resolve_with_base(
    src: &str,
    assets_base: Option<&str>,
    note_path: Option<&str>,
) -> String {
    let src = src.trim().replace('\\', "/");

    if is_rooted(&src) {
        return normalize_segments(&src);
    }

    let base = assets_base
        .map(|b| b.trim().replace('\\', "/"))
        .filter(|b| !b.is_empty());
    if let Some(base) = base {
        return normalize_segments(&format!("{base}/{src}"));
    }

    match note_path {
        Some(note) => {
            let note = note.trim().replace('\\', "/");
            let dir = note.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
            if dir.is_empty() {
                normalize_segments(&src)
            } else {
                normalize_segments(&format!("{dir}/{src}"))
            }
        }
        None => normalize_segments(&src),
    }
}

/// Resolve a block's `src` with its merged `assetsBase`.
pub fn resolve_block_src(config: &BlockConfig, note_path: Option<&str>) -> String {
    resolve_with_base(&config.src, config.assets_base.as_deref(), note_path)
}

/// A path addresses the vault root directly when it starts with a slash or
/// carries a Windows drive prefix.
fn is_rooted(path: &str) -> bool {
    if path.starts_with('/') {
        return true;
    }
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Collapse `.`/`..`/empty segments without consulting the file system.
/// `..` never escapes above the root.
fn normalize_segments(path: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            segment => out.push(segment),
        }
    }
    out.join("/")
}

/// Host seam for vault file access. Paths are canonical `/`-separated
/// vault-relative strings, as produced by [`resolve_with_base`].
pub trait VaultAdapter {
    /// Vault-relative paths of every file.
    fn list_files(&self) -> Vec<String>;

    fn exists(&self, path: &str) -> bool;

    /// Read a file's raw bytes.
    fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// All animation assets in the vault, sorted for determinism.
    fn riv_files(&self) -> Vec<String> {
        let mut files: Vec<String> = self
            .list_files()
            .into_iter()
            .filter(|p| p.ends_with(ASSET_EXTENSION))
            .collect();
        files.sort();
        files
    }
}

/// Vault rooted at a directory on disk.
pub struct DirectoryVault {
    root: PathBuf,
}

impl DirectoryVault {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl VaultAdapter for DirectoryVault {
    fn list_files(&self) -> Vec<String> {
        WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                e.path()
                    .strip_prefix(&self.root)
                    .ok()
                    .map(|rel| {
                        rel.components()
                            .map(|c| c.as_os_str().to_string_lossy())
                            .collect::<Vec<_>>()
                            .join("/")
                    })
            })
            // Skip hidden files and directories
            .filter(|rel| !rel.split('/').any(|seg| seg.starts_with('.')))
            .collect()
    }

    fn exists(&self, path: &str) -> bool {
        self.full_path(path).is_file()
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.full_path(path);
        std::fs::read(&full).with_context(|| format!("Failed to read asset: {}", full.display()))
    }
}

/// In-memory vault, used by the test suites and by hosts that hold notes
/// and assets outside the file system.
#[derive(Debug, Default)]
pub struct MemoryVault {
    files: HashMap<String, Vec<u8>>,
    reads: Cell<usize>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), bytes.into());
    }

    pub fn remove(&mut self, path: &str) {
        self.files.remove(path);
    }

    /// Number of `read` calls served so far, cache-hit accounting in tests.
    pub fn read_count(&self) -> usize {
        self.reads.get()
    }
}

impl VaultAdapter for MemoryVault {
    fn list_files(&self) -> Vec<String> {
        let mut files: Vec<String> = self.files.keys().cloned().collect();
        files.sort();
        files
    }

    fn exists(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.reads.set(self.reads.get() + 1);
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("No such file: {path}"))
    }
}
