//! Targeted declaration patching
//!
//! Splices declaration spans extracted from a reference buffer into
//! candidate files, driven by a hand-authored override table. Overrides
//! exist to disambiguate same-named declarations across multiple candidate
//! files: each entry pins one reference occurrence, by line number, to one
//! destination.
//!
//! Global invariants enforced:
//! - Per-entry failures skip that entry only; the batch always completes
//! - A replacement is performed only when the old span text is
//!   verbatim-unique in the target file
//! - Names not mentioned in the override table are never touched
//!
//! Writes are whole-file and not transactional: a crash mid-run can leave
//! some targets patched and others not. Re-running reconciliation is the
//! recovery mechanism for discovering exactly which patches landed.

use crate::discover;
use crate::inventory::{Inventory, SourceBuffer};
use crate::locate::MatcherSet;
use crate::reconcile::{self, NormalizePolicy, Reconciliation, Verdict};
use crate::scanner::{self, ScanFailure, ScanOptions};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Whether an override replaces an existing declaration or appends a
/// missing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchAction {
    Replace,
    Append,
}

/// One hand-authored disambiguation fact: which reference occurrence goes
/// to which destination file. Authored once per migration episode, never
/// derived from scanning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OverrideEntry {
    /// 1-based line of the declaration in the reference buffer.
    pub reference_start_line: usize,
    pub target_file: PathBuf,
    pub name: String,
    pub action: PatchAction,
}

/// Why one override could not be applied.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PatchFailure {
    /// The reference anchor line did not yield a valid scan.
    #[error("failed to extract '{name}' from reference line {line}: {source}")]
    OverrideExtractionFailed {
        name: String,
        line: usize,
        source: ScanFailure,
    },

    /// Replace was requested but the target file holds no declaration of
    /// that name.
    #[error("no declaration of '{name}' found in {file}")]
    TargetNotFound { name: String, file: String },

    /// The old span text occurs more than once in the target file, so a
    /// textual substitution could land on the wrong occurrence.
    #[error("span of '{name}' occurs {occurrences} times in {file}; replacement is unsafe")]
    AmbiguousReplacementTarget {
        name: String,
        file: String,
        occurrences: usize,
    },

    /// Reading or writing the target file failed.
    #[error("i/o failure on {file}: {reason}")]
    Io { file: String, reason: String },
}

/// Outcome of one override.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct PatchOutcome {
    pub name: String,
    pub target_file: String,
    pub action: PatchAction,
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
}

/// Result of a whole patch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PatchReport {
    pub outcomes: Vec<PatchOutcome>,
    /// Fresh reconciliation over the patched tree. Absent on dry runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<Reconciliation>,
    /// True when every override's name reads Exact after patching.
    pub converged: bool,
}

/// Apply an override table and verify convergence with a fresh
/// reconciliation run.
///
/// `candidate_files` is the full ordered candidate list used for the
/// verification pass. With `dry_run`, extraction and safety checks run but
/// nothing is written and no verification pass happens.
pub fn apply(
    overrides: &[OverrideEntry],
    reference: &SourceBuffer,
    candidate_files: &[PathBuf],
    options: &ScanOptions,
    policy: NormalizePolicy,
    dry_run: bool,
) -> Result<PatchReport> {
    let matchers = MatcherSet::shared();
    let mut outcomes = Vec::with_capacity(overrides.len());

    for entry in overrides {
        let outcome = match apply_one(entry, reference, matchers, options, dry_run) {
            Ok(()) => PatchOutcome {
                name: entry.name.clone(),
                target_file: entry.target_file.display().to_string(),
                action: entry.action,
                applied: true,
                skip_reason: None,
            },
            Err(failure) => PatchOutcome {
                name: entry.name.clone(),
                target_file: entry.target_file.display().to_string(),
                action: entry.action,
                applied: false,
                skip_reason: Some(failure.to_string()),
            },
        };
        outcomes.push(outcome);
    }

    if dry_run {
        return Ok(PatchReport {
            outcomes,
            verification: None,
            converged: false,
        });
    }

    // Fresh reconciliation over the (possibly partially) patched tree.
    let reference_inventory = Inventory::build(reference, matchers, options);
    let candidates = discover::build_inventories(candidate_files, matchers, options)?;
    let verification = reconcile::reconcile(&reference_inventory, &candidates, policy);

    let converged = overrides
        .iter()
        .all(|entry| verification.verdict_of(&entry.name) == Some(Verdict::Exact));

    Ok(PatchReport {
        outcomes,
        verification: Some(verification),
        converged,
    })
}

fn apply_one(
    entry: &OverrideEntry,
    reference: &SourceBuffer,
    matchers: &MatcherSet,
    options: &ScanOptions,
    dry_run: bool,
) -> std::result::Result<(), PatchFailure> {
    let new_text = extract_override_span(entry, reference, options)?;
    let file = entry.target_file.display().to_string();

    let content =
        std::fs::read_to_string(&entry.target_file).map_err(|e| PatchFailure::Io {
            file: file.clone(),
            reason: e.to_string(),
        })?;

    let patched = match entry.action {
        PatchAction::Replace => {
            let target_buffer = SourceBuffer::new(file.clone(), &content);
            let target_inventory = Inventory::build(&target_buffer, matchers, options);
            let old = target_inventory
                .get(&entry.name)
                .ok_or_else(|| PatchFailure::TargetNotFound {
                    name: entry.name.clone(),
                    file: file.clone(),
                })?;

            let occurrences = content.matches(old.raw_text.as_str()).count();
            if occurrences != 1 {
                return Err(PatchFailure::AmbiguousReplacementTarget {
                    name: entry.name.clone(),
                    file,
                    occurrences,
                });
            }
            content.replacen(old.raw_text.as_str(), &new_text, 1)
        }
        PatchAction::Append => {
            format!("{content}\n\n{new_text}\n")
        }
    };

    if dry_run {
        return Ok(());
    }

    std::fs::write(&entry.target_file, patched).map_err(|e| PatchFailure::Io {
        file: entry.target_file.display().to_string(),
        reason: e.to_string(),
    })
}

/// Extract the span anchored at the override's reference line. Uses the
/// scanner directly: the exact start is already known, no locating needed.
fn extract_override_span(
    entry: &OverrideEntry,
    reference: &SourceBuffer,
    options: &ScanOptions,
) -> std::result::Result<String, PatchFailure> {
    let anchor = entry.reference_start_line;
    if anchor == 0 || anchor > reference.lines.len() {
        return Err(PatchFailure::OverrideExtractionFailed {
            name: entry.name.clone(),
            line: anchor,
            source: ScanFailure::NoOpeningBrace {
                start_line: anchor.saturating_sub(1),
            },
        });
    }
    let span = scanner::scan(&reference.lines, anchor - 1, options).map_err(|source| {
        PatchFailure::OverrideExtractionFailed {
            name: entry.name.clone(),
            line: anchor,
            source,
        }
    })?;
    Ok(reference.slice(span))
}

/// Load an override table from a JSON file.
pub fn load_overrides(path: &Path) -> Result<Vec<OverrideEntry>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read override table: {}", path.display()))?;
    let overrides: Vec<OverrideEntry> = serde_json::from_str(&json)
        .with_context(|| format!("failed to parse override table: {}", path.display()))?;
    Ok(overrides)
}
