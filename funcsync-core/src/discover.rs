//! Candidate file discovery and buffer loading
//!
//! The core only needs an ordered list of (identity, text) pairs; this
//! module is the collaborator that produces them from a directory tree.
//!
//! Global invariants enforced:
//! - Discovered paths are sorted, so candidate ordering is fixed before
//!   any parallel dispatch
//! - An unreadable file fails that file only; the rest of the batch
//!   continues

use crate::config::ResolvedConfig;
use crate::inventory::{Inventory, SourceBuffer};
use crate::locate::MatcherSet;
use crate::scanner::ScanOptions;
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Returns true for directory names that should not be traversed
fn is_skipped_dir(name: &str) -> bool {
    name.starts_with('.')
        || name == "node_modules"
        || name == "dist"
        || name == "build"
        || name == "out"
        || name == "coverage"
        || name == "target"
}

/// Collect candidate source files from a path (file or directory),
/// filtered by the configured extensions and include/exclude globs.
/// Paths are returned sorted for deterministic candidate order.
pub fn collect_candidate_files(path: &Path, config: &ResolvedConfig) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    if path.is_file() {
        if config.matches_extension(path) && config.should_include(path) {
            files.push(path.to_path_buf());
        }
    } else if path.is_dir() {
        collect_recursive(path, config, &mut files)?;
    }

    files.sort();
    Ok(files)
}

fn collect_recursive(dir: &Path, config: &ResolvedConfig, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry_result in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let entry = entry_result?;
        let path = entry.path();
        let metadata = std::fs::symlink_metadata(&path)
            .with_context(|| format!("failed to read metadata: {}", path.display()))?;

        if metadata.is_symlink() {
            continue;
        }

        if metadata.is_dir() {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if is_skipped_dir(name) {
                    continue;
                }
            }
            collect_recursive(&path, config, files)?;
        } else if metadata.is_file() && config.matches_extension(&path) && config.should_include(&path)
        {
            files.push(path);
        }
    }

    Ok(())
}

/// Build inventories for an ordered list of candidate files.
///
/// Per-file scanning has no cross-file dependency, so files are scanned in
/// parallel; results are merged back in the input order, preserving
/// first-file-wins semantics downstream. Unreadable files are skipped with
/// a warning.
pub fn build_inventories(
    files: &[PathBuf],
    matchers: &MatcherSet,
    options: &ScanOptions,
) -> Result<Vec<(String, Inventory)>> {
    let inventories: Vec<Option<(String, Inventory)>> = files
        .par_iter()
        .map(|path| match SourceBuffer::from_path(path) {
            Ok(buffer) => {
                let inventory = Inventory::build(&buffer, matchers, options);
                Some((buffer.id, inventory))
            }
            Err(e) => {
                eprintln!("warning: skipping file {}: {}", path.display(), e);
                None
            }
        })
        .collect();

    Ok(inventories.into_iter().flatten().collect())
}
