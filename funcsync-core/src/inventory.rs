//! Per-buffer declaration inventory
//!
//! Scans a whole source buffer top to bottom, locating declaration lines
//! and capturing each declaration's full brace-balanced span.
//!
//! Global invariants enforced:
//! - First occurrence wins: a later same-named declaration in the same
//!   buffer is discarded (later occurrences are usually re-exports or
//!   duplicates; the first textual definition is authoritative)
//! - A scan failure skips that line only; the build never aborts
//! - Iteration order is insertion order, so reruns over the same buffer
//!   produce identical inventories

use crate::locate::MatcherSet;
use crate::scanner::{self, ScanFailure, ScanOptions, Span};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

/// An immutable, line-split source text with an identity.
///
/// The identity is a path for file-backed buffers or a logical name for
/// in-memory ones. Buffers are read once per run and never mutated.
#[derive(Debug, Clone)]
pub struct SourceBuffer {
    pub id: String,
    pub lines: Vec<String>,
}

impl SourceBuffer {
    pub fn new(id: impl Into<String>, text: &str) -> Self {
        SourceBuffer {
            id: id.into(),
            lines: text.split('\n').map(|l| l.to_string()).collect(),
        }
    }

    /// Read a whole file into a buffer. Fails for this file only; callers
    /// continue with the rest of the batch.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read source file: {}", path.display()))?;
        Ok(SourceBuffer::new(path.display().to_string(), &text))
    }

    /// Verbatim join of the lines in `span`.
    pub fn slice(&self, span: Span) -> String {
        self.lines[span.start..=span.end].join("\n")
    }
}

/// One located declaration with its exact textual span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDeclaration {
    pub name: String,
    /// 1-based line number of the introducing line.
    pub start_line: usize,
    /// The introducing line up to its opening brace, indentation kept.
    pub signature: String,
    /// Verbatim join of all lines in the declaration's span.
    pub raw_text: String,
}

/// A declaration line the scanner could not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDeclaration {
    pub name: String,
    /// 1-based line number of the introducing line.
    pub start_line: usize,
    pub failure: ScanFailure,
}

/// Mapping from declaration name to its extracted declaration, one per
/// buffer. Names are unique; duplicates are dropped at build time.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    entries: HashMap<String, ExtractedDeclaration>,
    /// Names in first-seen order, for deterministic iteration.
    order: Vec<String>,
    /// Declaration lines skipped because their scan failed.
    pub skipped: Vec<SkippedDeclaration>,
}

impl Inventory {
    /// Build the inventory for one buffer.
    pub fn build(buffer: &SourceBuffer, matchers: &MatcherSet, options: &ScanOptions) -> Self {
        let mut inventory = Inventory::default();

        for (idx, line) in buffer.lines.iter().enumerate() {
            let Some(located) = matchers.locate(line) else {
                continue;
            };
            if inventory.entries.contains_key(&located.name) {
                // First occurrence wins.
                continue;
            }
            match scanner::scan(&buffer.lines, idx, options) {
                Ok(span) => {
                    let decl = ExtractedDeclaration {
                        name: located.name.clone(),
                        start_line: idx + 1,
                        signature: located.signature,
                        raw_text: buffer.slice(span),
                    };
                    inventory.order.push(located.name.clone());
                    inventory.entries.insert(located.name, decl);
                }
                Err(failure) => {
                    inventory.skipped.push(SkippedDeclaration {
                        name: located.name,
                        start_line: idx + 1,
                        failure,
                    });
                }
            }
        }

        inventory
    }

    pub fn get(&self, name: &str) -> Option<&ExtractedDeclaration> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Declarations in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &ExtractedDeclaration> {
        self.order.iter().filter_map(|name| self.entries.get(name))
    }

    /// Names in first-seen order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }
}
