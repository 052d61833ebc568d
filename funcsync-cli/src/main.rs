//! Funcsync CLI - scan, reconcile, and patch function declarations
//! across source trees

#![deny(warnings)]

// Global invariants enforced:
// - Deterministic output ordering
// - Identical input yields byte-for-byte identical output
// - A run always completes and always produces a full report

use anyhow::Context;
use clap::{Parser, Subcommand};
use funcsync_core::{config, discover, report, MatcherSet, NormalizePolicy};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "funcsync")]
#[command(about = "Locate function declarations and reconcile a reference buffer against candidate files")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every declaration found in a file or directory tree
    Scan {
        /// Path to a source file or directory
        path: PathBuf,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Classify every reference declaration as exact, divergent, or absent
    Reconcile {
        /// Path to the reference source file (the backup)
        reference: PathBuf,

        /// Path to the candidate file or directory tree
        candidates: PathBuf,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Show unified diffs for divergent declarations (text format only)
        #[arg(long)]
        diff: bool,

        /// Keep empty lines when comparing (default trims and drops them)
        #[arg(long)]
        strict: bool,

        /// Report only the first N classification records (summary counts
        /// still cover the whole run)
        #[arg(long)]
        top: Option<usize>,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Apply an override table, splicing reference spans into target files
    Patch {
        /// Path to the reference source file (the backup)
        reference: PathBuf,

        /// Path to the candidate file or directory tree
        candidates: PathBuf,

        /// Path to the override table (JSON array of override entries)
        #[arg(long)]
        overrides: PathBuf,

        /// Check and report without writing any files
        #[arg(long)]
        dry_run: bool,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Validate a configuration file
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file without running anything
    Validate {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the resolved configuration (merged defaults + config file)
    Show {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, PartialEq, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            path,
            format,
            config: config_path,
        } => {
            let path = normalize_path(path)?;
            let resolved = load_config(&path, config_path)?;

            let files = if path.is_file() {
                vec![path]
            } else {
                discover::collect_candidate_files(&path, &resolved)?
            };
            let inventories =
                discover::build_inventories(&files, MatcherSet::shared(), &resolved.scan_options)?;

            match format {
                OutputFormat::Text => {
                    for (id, inventory) in &inventories {
                        print!("{}", report::render_inventory_text(id, inventory));
                    }
                }
                OutputFormat::Json => {
                    let listing: Vec<serde_json::Value> = inventories
                        .iter()
                        .map(|(id, inventory)| {
                            serde_json::json!({
                                "file": id,
                                "declarations": inventory.iter().map(|d| {
                                    serde_json::json!({
                                        "name": d.name,
                                        "start_line": d.start_line,
                                        "signature": d.signature,
                                    })
                                }).collect::<Vec<_>>(),
                            })
                        })
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&listing)?);
                }
            }
        }
        Commands::Reconcile {
            reference,
            candidates,
            format,
            diff,
            strict,
            top,
            config: config_path,
        } => {
            let reference = normalize_path(reference)?;
            let candidates = normalize_path(candidates)?;
            let mut resolved = load_config(&candidates, config_path)?;
            if strict {
                resolved.normalize = NormalizePolicy::Strict;
            }

            let mut result = funcsync_core::reconcile_paths(&reference, &candidates, &resolved)?;
            if let Some(n) = top {
                result.records.truncate(n);
            }

            match format {
                OutputFormat::Text => print!("{}", report::render_text(&result, diff)),
                OutputFormat::Json => println!("{}", report::render_json(&result)),
            }
        }
        Commands::Patch {
            reference,
            candidates,
            overrides,
            dry_run,
            format,
            config: config_path,
        } => {
            let reference = normalize_path(reference)?;
            let candidates = normalize_path(candidates)?;
            let resolved = load_config(&candidates, config_path)?;

            let patch_report =
                funcsync_core::patch_paths(&reference, &candidates, &overrides, &resolved, dry_run)?;

            match format {
                OutputFormat::Text => print!("{}", report::render_patch_text(&patch_report)),
                OutputFormat::Json => println!("{}", report::render_patch_json(&patch_report)),
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Validate { path } => {
                let root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&root, path.as_deref())
                    .context("configuration is invalid")?;
                match &resolved.config_path {
                    Some(p) => println!("config ok: {}", p.display()),
                    None => println!("config ok: defaults (no config file found)"),
                }
            }
            ConfigAction::Show { path } => {
                let root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&root, path.as_deref())?;
                if let Some(p) = &resolved.config_path {
                    println!("loaded from: {}", p.display());
                }
                println!("extensions: {}", resolved.extensions.join(", "));
                println!("max_span_lines: {}", resolved.scan_options.max_span_lines);
                println!("unbalanced_eof: {:?}", resolved.scan_options.unbalanced_eof);
                println!("overlong: {:?}", resolved.scan_options.overlong);
                println!("comments: {:?}", resolved.scan_options.comments);
                println!("normalize: {:?}", resolved.normalize);
            }
        },
    }

    Ok(())
}

/// Normalize a CLI path to absolute and require that it exists.
fn normalize_path(path: PathBuf) -> anyhow::Result<PathBuf> {
    let normalized = if path.is_relative() {
        std::env::current_dir()?.join(&path)
    } else {
        path
    };
    if !normalized.exists() {
        anyhow::bail!("Path does not exist: {}", normalized.display());
    }
    Ok(normalized)
}

/// Load configuration, searching upward from the working path's directory.
fn load_config(
    working_path: &std::path::Path,
    explicit: Option<PathBuf>,
) -> anyhow::Result<funcsync_core::ResolvedConfig> {
    let root = if working_path.is_dir() {
        working_path.to_path_buf()
    } else {
        working_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    };
    let resolved = config::load_and_resolve(&root, explicit.as_deref())
        .context("failed to load configuration")?;
    if let Some(config_path) = &resolved.config_path {
        eprintln!("Using config: {}", config_path.display());
    }
    Ok(resolved)
}
