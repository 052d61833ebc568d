//! Funcsync core library - locates brace-delimited function declarations
//! and reconciles a reference source buffer against candidate files

#![deny(warnings)]

// Global invariants enforced in this crate:
// - Buffers are read once per run and never mutated in place
// - Matcher ordering, first-occurrence-wins, and first-file-wins are fixed
// - Per-item failures never abort a batch; every run produces a full report
// - No global mutable state
// - Identical input yields byte-for-byte identical output

pub mod config;
pub mod discover;
pub mod inventory;
pub mod locate;
pub mod patch;
pub mod reconcile;
pub mod report;
pub mod scanner;

pub use config::ResolvedConfig;
pub use inventory::{Inventory, SourceBuffer};
pub use locate::MatcherSet;
pub use reconcile::{ClassificationRecord, NormalizePolicy, Reconciliation, Verdict};
pub use report::{render_json, render_text};
pub use scanner::ScanOptions;

use anyhow::Result;
use std::path::Path;

/// Build the inventory for one file.
pub fn scan_file(path: &Path, config: &ResolvedConfig) -> Result<(SourceBuffer, Inventory)> {
    let buffer = SourceBuffer::from_path(path)?;
    let inventory = Inventory::build(&buffer, MatcherSet::shared(), &config.scan_options);
    Ok((buffer, inventory))
}

/// Reconcile a reference file against every candidate discovered under
/// `candidates_root`.
///
/// An unreadable reference buffer fails the run; unreadable candidates are
/// skipped with a warning and the run completes.
pub fn reconcile_paths(
    reference: &Path,
    candidates_root: &Path,
    config: &ResolvedConfig,
) -> Result<Reconciliation> {
    let (_, reference_inventory) = scan_file(reference, config)?;
    let files = discover::collect_candidate_files(candidates_root, config)?;
    let candidates =
        discover::build_inventories(&files, MatcherSet::shared(), &config.scan_options)?;
    Ok(reconcile::reconcile(
        &reference_inventory,
        &candidates,
        config.normalize,
    ))
}

/// Apply an override table from `overrides_path` against the candidates
/// under `candidates_root`, then verify convergence.
pub fn patch_paths(
    reference: &Path,
    candidates_root: &Path,
    overrides_path: &Path,
    config: &ResolvedConfig,
    dry_run: bool,
) -> Result<patch::PatchReport> {
    let buffer = SourceBuffer::from_path(reference)?;
    let overrides = patch::load_overrides(overrides_path)?;
    let files = discover::collect_candidate_files(candidates_root, config)?;
    patch::apply(
        &overrides,
        &buffer,
        &files,
        &config.scan_options,
        config.normalize,
        dry_run,
    )
}
