//! Integration tests for the full scan -> reconcile -> patch pipeline

use funcsync_core::config::load_and_resolve;
use funcsync_core::patch::{OverrideEntry, PatchAction};
use funcsync_core::{
    patch_paths, reconcile_paths, render_json, scan_file, ResolvedConfig, Verdict,
};
use std::fs;
use std::path::{Path, PathBuf};

const REFERENCE: &str = "\
function untouched(a) {
  return a;
}

function drifted(a, b) {
  return a + b;
}

const helper = (x) => {
  return x * 2;
};

function missing() {
  return 'gone';
}
";

fn default_config() -> ResolvedConfig {
    ResolvedConfig::default_resolved().unwrap()
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn reconcile_classifies_whole_tree() {
    let dir = tempfile::tempdir().unwrap();
    let reference = write(dir.path(), "backup.js", REFERENCE);
    write(
        dir.path(),
        "src/a.js",
        "function untouched(a) {\n  return a;\n}\n\nfunction drifted(a, b) {\n  return a - b;\n}\n",
    );
    write(
        dir.path(),
        "src/b.js",
        "const helper = (x) => {\n  return x * 2;\n};\n",
    );

    let result = reconcile_paths(&reference, &dir.path().join("src"), &default_config()).unwrap();

    assert_eq!(result.verdict_of("untouched"), Some(Verdict::Exact));
    assert_eq!(result.verdict_of("drifted"), Some(Verdict::Divergent));
    assert_eq!(result.verdict_of("helper"), Some(Verdict::Exact));
    assert_eq!(result.verdict_of("missing"), Some(Verdict::Absent));
    assert_eq!(result.summary.exact, 2);
    assert_eq!(result.summary.divergent, 1);
    assert_eq!(result.summary.absent, 1);
    assert_eq!(result.summary.failed, 0);
}

#[test]
fn first_file_wins_across_candidates() {
    let dir = tempfile::tempdir().unwrap();
    let reference = write(
        dir.path(),
        "backup.js",
        "function dup() {\n  return 1;\n}\n",
    );
    // a.js sorts before b.js; only a.js diverges.
    write(dir.path(), "src/a.js", "function dup() {\n  return 2;\n}\n");
    write(dir.path(), "src/b.js", "function dup() {\n  return 1;\n}\n");

    let result = reconcile_paths(&reference, &dir.path().join("src"), &default_config()).unwrap();
    assert_eq!(result.verdict_of("dup"), Some(Verdict::Divergent));
    let record = &result.records[0];
    assert!(record.candidate_file.as_deref().unwrap().ends_with("a.js"));
}

#[test]
fn reconciliation_is_idempotent_and_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let reference = write(dir.path(), "backup.js", REFERENCE);
    write(
        dir.path(),
        "src/a.js",
        "function untouched(a) {\n  return a;\n}\n",
    );

    let first = reconcile_paths(&reference, &dir.path().join("src"), &default_config()).unwrap();
    let second = reconcile_paths(&reference, &dir.path().join("src"), &default_config()).unwrap();
    assert_eq!(render_json(&first), render_json(&second));
}

#[test]
fn patch_flips_divergent_to_exact() {
    let dir = tempfile::tempdir().unwrap();
    let reference = write(dir.path(), "backup.js", REFERENCE);
    let target = write(
        dir.path(),
        "src/a.js",
        "function untouched(a) {\n  return a;\n}\n\nfunction drifted(a, b) {\n  return a - b;\n}\n",
    );

    let before =
        reconcile_paths(&reference, &dir.path().join("src"), &default_config()).unwrap();
    assert_eq!(before.verdict_of("drifted"), Some(Verdict::Divergent));

    let overrides = vec![
        OverrideEntry {
            reference_start_line: 5,
            target_file: target.clone(),
            name: "drifted".to_string(),
            action: PatchAction::Replace,
        },
        OverrideEntry {
            reference_start_line: 13,
            target_file: target.clone(),
            name: "missing".to_string(),
            action: PatchAction::Append,
        },
    ];
    let overrides_path = dir.path().join("overrides.json");
    fs::write(&overrides_path, serde_json::to_string(&overrides).unwrap()).unwrap();

    let report = patch_paths(
        &reference,
        &dir.path().join("src"),
        &overrides_path,
        &default_config(),
        false,
    )
    .unwrap();

    assert!(report.outcomes.iter().all(|o| o.applied));
    assert!(report.converged);
    let verification = report.verification.unwrap();
    assert_eq!(verification.verdict_of("drifted"), Some(Verdict::Exact));
    assert_eq!(verification.verdict_of("missing"), Some(Verdict::Exact));
    // The declaration no override mentioned is untouched.
    assert_eq!(verification.verdict_of("untouched"), Some(Verdict::Exact));
}

#[test]
fn dry_run_reports_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let reference = write(dir.path(), "backup.js", REFERENCE);
    let content = "function drifted(a, b) {\n  return a - b;\n}\n";
    let target = write(dir.path(), "src/a.js", content);

    let overrides = vec![OverrideEntry {
        reference_start_line: 5,
        target_file: target.clone(),
        name: "drifted".to_string(),
        action: PatchAction::Replace,
    }];
    let overrides_path = dir.path().join("overrides.json");
    fs::write(&overrides_path, serde_json::to_string(&overrides).unwrap()).unwrap();

    let report = patch_paths(
        &reference,
        &dir.path().join("src"),
        &overrides_path,
        &default_config(),
        true,
    )
    .unwrap();

    assert!(report.outcomes[0].applied);
    assert!(report.verification.is_none());
    assert_eq!(fs::read_to_string(&target).unwrap(), content);
}

#[test]
fn scan_file_extracts_byte_identical_spans() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "backup.js", REFERENCE);

    let (_, inventory) = scan_file(&path, &default_config()).unwrap();
    assert_eq!(inventory.len(), 4);

    let drifted = inventory.get("drifted").unwrap();
    assert_eq!(
        drifted.raw_text,
        "function drifted(a, b) {\n  return a + b;\n}"
    );
    assert_eq!(drifted.start_line, 5);
}

#[test]
fn config_extensions_narrow_the_candidate_set() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        ".funcsyncrc.json",
        r#"{"extensions": ["mjs"]}"#,
    );
    let reference = write(
        dir.path(),
        "backup.mjs",
        "function only() {\n  return 1;\n}\n",
    );
    write(dir.path(), "src/a.js", "function only() {\n  return 1;\n}\n");
    write(
        dir.path(),
        "src/b.mjs",
        "function only() {\n  return 2;\n}\n",
    );

    let config = load_and_resolve(dir.path(), None).unwrap();
    let result = reconcile_paths(&reference, &dir.path().join("src"), &config).unwrap();

    // a.js is filtered out, so the divergent b.mjs copy is the only candidate.
    assert_eq!(result.verdict_of("only"), Some(Verdict::Divergent));
}
