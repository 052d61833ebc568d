//! Reference-versus-candidates reconciliation
//!
//! Classifies every declaration in a reference inventory against an
//! ordered list of candidate inventories.
//!
//! Global invariants enforced:
//! - First file wins: once a candidate contains the name, later candidates
//!   are never consulted (one true home per function)
//! - Deterministic: rerunning on unchanged inputs yields an identical
//!   record sequence in the same order
//! - Every reference name lands in exactly one verdict bucket or in the
//!   explicit failure list; nothing is silently omitted

use crate::inventory::Inventory;
use serde::{Deserialize, Serialize};

/// How texts are normalized before comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NormalizePolicy {
    /// Trim each line and drop empty lines entirely.
    #[default]
    Loose,
    /// Trim trailing whitespace only; empty lines are kept.
    Strict,
}

impl NormalizePolicy {
    pub fn normalize(&self, text: &str) -> String {
        match self {
            NormalizePolicy::Loose => text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
            NormalizePolicy::Strict => text
                .lines()
                .map(str::trim_end)
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Classification outcome for one reference declaration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Exact,
    Divergent,
    Absent,
}

/// One reference declaration's reconciliation result.
///
/// Divergent records retain both raw spans so callers can diff them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ClassificationRecord {
    pub name: String,
    /// 1-based line of the declaration in the reference buffer.
    pub reference_line: usize,
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_text: Option<String>,
    /// Whether the bodies alone (signature and closing brace stripped)
    /// match under the strict policy. Set for divergent records only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_only_match: Option<bool>,
}

/// A reference declaration that could not be processed at all.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct FailedItem {
    pub name: String,
    pub reference_line: usize,
    pub reason: String,
}

/// Bucket counts for one reconciliation run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Summary {
    pub exact: usize,
    pub divergent: usize,
    pub absent: usize,
    pub failed: usize,
}

/// Full result of one reconciliation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Reconciliation {
    pub records: Vec<ClassificationRecord>,
    pub failures: Vec<FailedItem>,
    pub summary: Summary,
}

impl Reconciliation {
    /// True when every reference declaration reads exactly in a candidate.
    ///
    /// This is the in-process verification call; convergence is a function
    /// result, not a text match on rendered output.
    pub fn converged(&self) -> bool {
        self.summary.divergent == 0 && self.summary.absent == 0 && self.summary.failed == 0
    }

    pub fn verdict_of(&self, name: &str) -> Option<Verdict> {
        self.records.iter().find(|r| r.name == name).map(|r| r.verdict)
    }
}

/// Classify every reference declaration against the candidates, in the
/// candidates' given order.
pub fn reconcile(
    reference: &Inventory,
    candidates: &[(String, Inventory)],
    policy: NormalizePolicy,
) -> Reconciliation {
    let mut records = Vec::with_capacity(reference.len());
    let mut summary = Summary::default();

    for decl in reference.iter() {
        let home = candidates
            .iter()
            .find_map(|(file, inventory)| inventory.get(&decl.name).map(|d| (file, d)));

        let record = match home {
            Some((file, found)) => {
                if policy.normalize(&decl.raw_text) == policy.normalize(&found.raw_text) {
                    summary.exact += 1;
                    ClassificationRecord {
                        name: decl.name.clone(),
                        reference_line: decl.start_line,
                        verdict: Verdict::Exact,
                        candidate_file: Some(file.clone()),
                        candidate_line: Some(found.start_line),
                        reference_text: None,
                        candidate_text: None,
                        body_only_match: None,
                    }
                } else {
                    summary.divergent += 1;
                    let body_only = NormalizePolicy::Strict.normalize(&body_of(&decl.raw_text))
                        == NormalizePolicy::Strict.normalize(&body_of(&found.raw_text));
                    ClassificationRecord {
                        name: decl.name.clone(),
                        reference_line: decl.start_line,
                        verdict: Verdict::Divergent,
                        candidate_file: Some(file.clone()),
                        candidate_line: Some(found.start_line),
                        reference_text: Some(decl.raw_text.clone()),
                        candidate_text: Some(found.raw_text.clone()),
                        body_only_match: Some(body_only),
                    }
                }
            }
            None => {
                summary.absent += 1;
                ClassificationRecord {
                    name: decl.name.clone(),
                    reference_line: decl.start_line,
                    verdict: Verdict::Absent,
                    candidate_file: None,
                    candidate_line: None,
                    reference_text: None,
                    candidate_text: None,
                    body_only_match: None,
                }
            }
        };
        records.push(record);
    }

    // A skipped occurrence whose name was accepted elsewhere in the buffer
    // already has a verdict; every name lands in exactly one bucket.
    let failures: Vec<FailedItem> = reference
        .skipped
        .iter()
        .filter(|s| !reference.contains(&s.name))
        .map(|s| FailedItem {
            name: s.name.clone(),
            reference_line: s.start_line,
            reason: s.failure.to_string(),
        })
        .collect();
    summary.failed = failures.len();

    Reconciliation {
        records,
        failures,
        summary,
    }
}

/// The body of a declaration: content after the signature line's opening
/// brace, without the final closing-brace line.
fn body_of(raw_text: &str) -> String {
    let lines: Vec<&str> = raw_text.lines().collect();
    if lines.len() <= 1 {
        return raw_text.to_string();
    }

    let mut body: Vec<String> = Vec::new();
    if let Some(pos) = lines[0].find('{') {
        let after_brace = lines[0][pos + 1..].trim();
        if !after_brace.is_empty() {
            body.push(after_brace.to_string());
        }
    }
    body.extend(lines[1..].iter().map(|l| l.to_string()));

    // Drop the final closing-brace line.
    if let Some(last) = body.last() {
        let trimmed = last.trim();
        if trimmed == "}" || trimmed == "};" {
            body.pop();
        }
    }

    body.join("\n")
}
