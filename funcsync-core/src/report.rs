//! Reporting and output generation
//!
//! Textual and JSON rendering of reconciliation and patch results.
//! The structures carry the contract; the text rendering is for humans.
//!
//! Global invariants enforced:
//! - Deterministic output ordering
//! - Byte-for-byte identical output across runs
//! - Every reference name appears in a verdict bucket or the failure list

use crate::inventory::Inventory;
use crate::patch::PatchReport;
use crate::reconcile::{Reconciliation, Verdict};
use similar::TextDiff;

/// Render a reconciliation as a text report.
///
/// With `show_diffs`, divergent entries are followed by a unified diff of
/// the two retained spans.
pub fn render_text(result: &Reconciliation, show_diffs: bool) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{:<10} {:<30} {:<8} {}\n",
        "VERDICT", "NAME", "REF", "CANDIDATE"
    ));

    for record in &result.records {
        let verdict = match record.verdict {
            Verdict::Exact => "exact",
            Verdict::Divergent => "divergent",
            Verdict::Absent => "absent",
        };
        let candidate = match (&record.candidate_file, record.candidate_line) {
            (Some(file), Some(line)) => format!("{file}:{line}"),
            _ => "-".to_string(),
        };
        output.push_str(&format!(
            "{:<10} {:<30} {:<8} {}\n",
            verdict,
            truncate_or_pad(&record.name, 30),
            record.reference_line,
            candidate,
        ));

        if record.verdict == Verdict::Divergent {
            if let Some(body_only) = record.body_only_match {
                output.push_str(&format!(
                    "           body-only match: {}\n",
                    if body_only { "yes" } else { "no" }
                ));
            }
            if show_diffs {
                if let (Some(reference), Some(candidate)) =
                    (&record.reference_text, &record.candidate_text)
                {
                    output.push_str(&render_diff(&record.name, reference, candidate));
                }
            }
        }
    }

    if !result.failures.is_empty() {
        output.push_str("\nFAILED ITEMS\n");
        for item in &result.failures {
            output.push_str(&format!(
                "  {:<30} ref:{:<6} {}\n",
                truncate_or_pad(&item.name, 30),
                item.reference_line,
                item.reason,
            ));
        }
    }

    output.push_str(&format!(
        "\nexact: {}  divergent: {}  absent: {}  failed: {}\n",
        result.summary.exact,
        result.summary.divergent,
        result.summary.absent,
        result.summary.failed,
    ));

    output
}

/// Render a reconciliation as JSON output.
pub fn render_json(result: &Reconciliation) -> String {
    serde_json::to_string_pretty(result).unwrap_or_else(|_| "{}".to_string())
}

/// Render a per-buffer inventory listing.
pub fn render_inventory_text(buffer_id: &str, inventory: &Inventory) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "{} ({} declarations)\n",
        buffer_id,
        inventory.len()
    ));
    for decl in inventory.iter() {
        output.push_str(&format!(
            "  {:<6} {:<30} {}\n",
            decl.start_line,
            truncate_or_pad(&decl.name, 30),
            decl.signature.trim_start(),
        ));
    }
    for skipped in &inventory.skipped {
        output.push_str(&format!(
            "  {:<6} {:<30} skipped: {}\n",
            skipped.start_line,
            truncate_or_pad(&skipped.name, 30),
            skipped.failure,
        ));
    }
    output
}

/// Render a patch run as a text report.
pub fn render_patch_text(report: &PatchReport) -> String {
    let mut output = String::new();

    for outcome in &report.outcomes {
        let status = if outcome.applied { "applied" } else { "skipped" };
        output.push_str(&format!(
            "{:<8} {:<30} -> {}\n",
            status,
            truncate_or_pad(&outcome.name, 30),
            outcome.target_file,
        ));
        if let Some(reason) = &outcome.skip_reason {
            output.push_str(&format!("         {reason}\n"));
        }
    }

    match &report.verification {
        Some(verification) => {
            output.push_str("\nverification:\n");
            output.push_str(&render_text(verification, false));
            output.push_str(&format!(
                "converged: {}\n",
                if report.converged { "yes" } else { "no" }
            ));
        }
        None => output.push_str("\ndry run: no files written, verification skipped\n"),
    }

    output
}

/// Render a patch run as JSON output.
pub fn render_patch_json(report: &PatchReport) -> String {
    serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
}

/// Unified diff of a divergent declaration's two spans.
fn render_diff(name: &str, reference: &str, candidate: &str) -> String {
    let diff = TextDiff::from_lines(reference, candidate);
    let mut output = String::new();
    output.push_str(
        &diff
            .unified_diff()
            .context_radius(3)
            .header(&format!("reference/{name}"), &format!("candidate/{name}"))
            .to_string(),
    );
    if !output.ends_with('\n') {
        output.push('\n');
    }
    output
}

/// Truncate or pad string to fixed width. Names out of override tables
/// are arbitrary text, so truncation counts chars, not bytes.
fn truncate_or_pad(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let kept: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{kept}...")
    } else {
        format!("{:<width$}", s, width = width)
    }
}
