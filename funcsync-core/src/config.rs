//! Configuration file support
//!
//! Loads project-specific configuration from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.funcsyncrc.json` in project root
//! 3. `funcsync.config.json` in project root
//!
//! All fields are optional. CLI flags take precedence over config file
//! values.

use crate::reconcile::NormalizePolicy;
use crate::scanner::{CommentMode, OverlongPolicy, ScanOptions, UnbalancedEofPolicy};
use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default exclude patterns applied when no config is specified
const DEFAULT_EXCLUDES: &[&str] = &[
    "**/node_modules/**",
    "**/dist/**",
    "**/build/**",
    "**/coverage/**",
    "**/*.min.js",
];

/// Default file extensions considered candidate sources
const DEFAULT_EXTENSIONS: &[&str] = &["js"];

/// Funcsync configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FuncsyncConfig {
    /// File extensions to scan (default: ["js"])
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Glob patterns for files to include (default: all matching extensions)
    #[serde(default)]
    pub include: Vec<String>,

    /// Glob patterns for files to exclude (default: node_modules, dist, minified)
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Safety bound on declaration span length, in lines (default: 500)
    #[serde(default)]
    pub max_span_lines: Option<usize>,

    /// Behavior when a span is still open at end of buffer (default: fail)
    #[serde(default)]
    pub unbalanced_eof: Option<UnbalancedEofPolicy>,

    /// Behavior when a span exceeds the safety bound (default: fail)
    #[serde(default)]
    pub overlong: Option<OverlongPolicy>,

    /// Whether braces inside comments count toward depth (default: count)
    #[serde(default)]
    pub comments: Option<CommentMode>,

    /// Normalization policy for comparison (default: loose)
    #[serde(default)]
    pub normalize: Option<NormalizePolicy>,
}

/// Resolved configuration with compiled glob patterns
#[derive(Debug)]
pub struct ResolvedConfig {
    /// Compiled include patterns (None means include all)
    pub include: Option<GlobSet>,
    /// Compiled exclude patterns
    pub exclude: GlobSet,
    /// Extensions without leading dots
    pub extensions: Vec<String>,
    pub scan_options: ScanOptions,
    pub normalize: NormalizePolicy,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

impl FuncsyncConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        if let Some(max) = self.max_span_lines {
            if max == 0 {
                anyhow::bail!("max_span_lines must be positive (got 0)");
            }
        }

        for ext in &self.extensions {
            let bare = ext.trim_start_matches('.');
            if bare.is_empty() {
                anyhow::bail!("extensions must be non-empty (got {:?})", ext);
            }
            if bare.contains(['/', '\\', '*']) {
                anyhow::bail!("extensions must not contain path or glob characters (got {:?})", ext);
            }
        }

        for pattern in self.include.iter().chain(self.exclude.iter()) {
            Glob::new(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))?;
        }

        Ok(())
    }

    /// Resolve into a usable config with compiled glob sets
    pub fn resolve(self, config_path: Option<PathBuf>) -> Result<ResolvedConfig> {
        self.validate()?;

        let include = if self.include.is_empty() {
            None
        } else {
            Some(build_globset(&self.include)?)
        };

        let exclude = if self.exclude.is_empty() {
            let defaults: Vec<String> = DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect();
            build_globset(&defaults)?
        } else {
            build_globset(&self.exclude)?
        };

        let extensions = if self.extensions.is_empty() {
            DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect()
        } else {
            self.extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_string())
                .collect()
        };

        let defaults = ScanOptions::default();
        let scan_options = ScanOptions {
            max_span_lines: self.max_span_lines.unwrap_or(defaults.max_span_lines),
            unbalanced_eof: self.unbalanced_eof.unwrap_or(defaults.unbalanced_eof),
            overlong: self.overlong.unwrap_or(defaults.overlong),
            comments: self.comments.unwrap_or(defaults.comments),
        };

        Ok(ResolvedConfig {
            include,
            exclude,
            extensions,
            scan_options,
            normalize: self.normalize.unwrap_or_default(),
            config_path,
        })
    }
}

impl ResolvedConfig {
    /// Defaults with no config file
    pub fn default_resolved() -> Result<Self> {
        FuncsyncConfig::default().resolve(None)
    }

    /// Whether a file passes the include/exclude filters
    pub fn should_include(&self, path: &Path) -> bool {
        if self.exclude.is_match(path) {
            return false;
        }
        match &self.include {
            Some(include) => include.is_match(path),
            None => true,
        }
    }

    /// Whether a file has one of the configured extensions
    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|want| want == e))
            .unwrap_or(false)
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))?);
    }
    builder.build().context("failed to build glob set")
}

/// Load configuration using the documented search order and resolve it.
pub fn load_and_resolve(project_root: &Path, explicit_path: Option<&Path>) -> Result<ResolvedConfig> {
    if let Some(path) = explicit_path {
        let config = load_file(path)?;
        return config.resolve(Some(path.to_path_buf()));
    }

    for candidate in [".funcsyncrc.json", "funcsync.config.json"] {
        let path = project_root.join(candidate);
        if path.is_file() {
            let config = load_file(&path)?;
            return config.resolve(Some(path));
        }
    }

    ResolvedConfig::default_resolved()
}

fn load_file(path: &Path) -> Result<FuncsyncConfig> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let config: FuncsyncConfig = serde_json::from_str(&json)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;
    Ok(config)
}
