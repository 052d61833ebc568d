//! Balanced-brace span scanner
//!
//! Walks a source buffer character by character from a known declaration
//! line and finds the line on which the declaration's opening brace closes.
//!
//! Global invariants enforced:
//! - Brace characters inside string or template literals never change depth
//! - An escaped quote never terminates the string it appears in
//! - A string mode is entered only from code, and closed only by its own
//!   delimiter
//! - The scan ends at the first line that leaves the span balanced
//!
//! Known limitation: regular-expression literals are not a lexical mode.
//! A regex containing a quote or brace character can desynchronize the
//! scan. Distinguishing `/` as division from `/` as a regex delimiter
//! requires real tokenization, which is out of scope.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Inclusive range of line indices (0-based) covering a declaration from
/// its opening line through the line its brace closes on.
///
/// Invariant: brace depth is zero before `start` and returns to zero for
/// the first time at `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Number of lines covered by the span.
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Why a scan could not produce a complete span.
///
/// All variants are local to one declaration: callers skip the candidate
/// line and continue, they never abort a whole build.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScanFailure {
    /// End of buffer reached without ever seeing an opening brace.
    #[error("no opening brace found from line {start_line}")]
    NoOpeningBrace { start_line: usize },

    /// End of buffer reached with the span still open.
    /// `scanned` covers everything walked so far.
    #[error("unbalanced braces at end of buffer (depth {depth} from line {})", scanned.start)]
    UnbalancedAtEof { depth: usize, scanned: Span },

    /// The span exceeded the configured safety bound.
    #[error("span exceeded {limit} lines from line {}", scanned.start)]
    Overlong { limit: usize, scanned: Span },
}

/// What to do when the buffer ends with the span still open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnbalancedEofPolicy {
    /// Surface `ScanFailure::UnbalancedAtEof`.
    #[default]
    Fail,
    /// Return the partial span accumulated so far.
    Truncate,
}

/// What to do when a span exceeds the safety bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OverlongPolicy {
    /// Surface `ScanFailure::Overlong`.
    #[default]
    Fail,
    /// Return everything scanned up to the bound.
    Truncate,
}

/// Whether braces inside comments count toward depth.
///
/// `Count` reproduces the historical behavior: a brace inside a `//` or
/// `/* */` comment perturbs depth. Overrides anchored to line numbers were
/// authored against those boundaries, so `Count` stays the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CommentMode {
    /// Comments are not a lexical mode; their braces count.
    #[default]
    Count,
    /// Treat `//` and `/* */` as lexical modes whose braces are inert.
    Skip,
}

/// Scanner configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Safety bound on span length in lines.
    pub max_span_lines: usize,
    pub unbalanced_eof: UnbalancedEofPolicy,
    pub overlong: OverlongPolicy,
    pub comments: CommentMode,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            max_span_lines: 500,
            unbalanced_eof: UnbalancedEofPolicy::default(),
            overlong: OverlongPolicy::default(),
            comments: CommentMode::default(),
        }
    }
}

/// Lexical mode of the character walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Code,
    InSingleQuote,
    InDoubleQuote,
    InTemplate,
    LineComment,
    BlockComment,
}

impl Mode {
    fn closes_on(self, c: char) -> bool {
        match self {
            Mode::InSingleQuote => c == '\'',
            Mode::InDoubleQuote => c == '"',
            Mode::InTemplate => c == '`',
            _ => false,
        }
    }
}

/// Scan forward from `start_line` for the line on which the declaration's
/// opening brace closes.
///
/// `lines` is the full buffer; `start_line` is a 0-based index known by the
/// caller to contain the opening context of a declaration.
pub fn scan(lines: &[String], start_line: usize, options: &ScanOptions) -> Result<Span, ScanFailure> {
    let mut depth: usize = 0;
    let mut opened = false;
    let mut mode = Mode::Code;
    // One-character escape inside a string mode.
    let mut escaped = false;

    for (offset, line) in lines[start_line..].iter().enumerate() {
        let line_idx = start_line + offset;

        if offset >= options.max_span_lines {
            let scanned = Span {
                start: start_line,
                end: line_idx.saturating_sub(1).max(start_line),
            };
            return match options.overlong {
                OverlongPolicy::Fail => Err(ScanFailure::Overlong {
                    limit: options.max_span_lines,
                    scanned,
                }),
                OverlongPolicy::Truncate => Ok(scanned),
            };
        }

        let mut chars = line.chars().peekable();
        while let Some(c) = chars.next() {
            if escaped {
                escaped = false;
                continue;
            }

            match mode {
                Mode::Code => {
                    if options.comments == CommentMode::Skip && c == '/' {
                        match chars.peek() {
                            Some('/') => {
                                mode = Mode::LineComment;
                                chars.next();
                                continue;
                            }
                            Some('*') => {
                                mode = Mode::BlockComment;
                                chars.next();
                                continue;
                            }
                            _ => {}
                        }
                    }
                    match c {
                        '\'' => mode = Mode::InSingleQuote,
                        '"' => mode = Mode::InDoubleQuote,
                        '`' => mode = Mode::InTemplate,
                        '{' => {
                            depth += 1;
                            opened = true;
                        }
                        '}' if opened => {
                            depth = depth.saturating_sub(1);
                        }
                        _ => {}
                    }
                }
                Mode::InSingleQuote | Mode::InDoubleQuote | Mode::InTemplate => {
                    if c == '\\' {
                        escaped = true;
                    } else if mode.closes_on(c) {
                        mode = Mode::Code;
                    }
                }
                Mode::LineComment => {
                    // Consumed until end of line below.
                }
                Mode::BlockComment => {
                    if c == '*' && chars.peek() == Some(&'/') {
                        mode = Mode::Code;
                        chars.next();
                    }
                }
            }
        }

        // A trailing backslash escapes the newline; the escape is spent.
        escaped = false;
        if mode == Mode::LineComment {
            mode = Mode::Code;
        }

        if opened && depth == 0 {
            return Ok(Span {
                start: start_line,
                end: line_idx,
            });
        }
    }

    if !opened {
        return Err(ScanFailure::NoOpeningBrace { start_line });
    }

    let scanned = Span {
        start: start_line,
        end: lines.len() - 1,
    };
    match options.unbalanced_eof {
        UnbalancedEofPolicy::Fail => Err(ScanFailure::UnbalancedAtEof { depth, scanned }),
        UnbalancedEofPolicy::Truncate => Ok(scanned),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buf(text: &str) -> Vec<String> {
        text.lines().map(|l| l.to_string()).collect()
    }

    #[test]
    fn single_line_self_closing_span() {
        let lines = buf("function add(a, b) { return a + b; }");
        let span = scan(&lines, 0, &ScanOptions::default()).unwrap();
        assert_eq!(span, Span { start: 0, end: 0 });
    }

    #[test]
    fn multi_line_balanced_span() {
        let lines = buf("function f() {\n  if (x) {\n    g();\n  }\n}\nconst after = 1;");
        let span = scan(&lines, 0, &ScanOptions::default()).unwrap();
        assert_eq!(span, Span { start: 0, end: 4 });
    }

    #[test]
    fn brace_inside_string_is_inert() {
        let lines = buf("function f() {\n  return \"{\";\n}");
        let span = scan(&lines, 0, &ScanOptions::default()).unwrap();
        assert_eq!(span.len(), 3);
    }

    #[test]
    fn brace_inside_template_is_inert() {
        let lines = buf("function f() {\n  const s = `{{{`;\n}");
        let span = scan(&lines, 0, &ScanOptions::default()).unwrap();
        assert_eq!(span, Span { start: 0, end: 2 });
    }

    #[test]
    fn escaped_quote_does_not_terminate_string() {
        let lines = buf("const f = () => { const s = \"a\\\"b{\"; }");
        let span = scan(&lines, 0, &ScanOptions::default()).unwrap();
        assert_eq!(span, Span { start: 0, end: 0 });
    }

    #[test]
    fn quote_of_other_kind_inside_string_is_inert() {
        let lines = buf("function f() {\n  const s = \"it's {\";\n}");
        let span = scan(&lines, 0, &ScanOptions::default()).unwrap();
        assert_eq!(span, Span { start: 0, end: 2 });
    }

    #[test]
    fn no_opening_brace() {
        let lines = buf("const x = 1;\nconst y = 2;");
        let err = scan(&lines, 0, &ScanOptions::default()).unwrap_err();
        assert_eq!(err, ScanFailure::NoOpeningBrace { start_line: 0 });
    }

    #[test]
    fn unbalanced_at_eof_fails_by_default() {
        let lines = buf("function f() {\n  g();");
        let err = scan(&lines, 0, &ScanOptions::default()).unwrap_err();
        assert!(matches!(err, ScanFailure::UnbalancedAtEof { depth: 1, .. }));
    }

    #[test]
    fn unbalanced_at_eof_truncates_when_asked() {
        let lines = buf("function f() {\n  g();");
        let options = ScanOptions {
            unbalanced_eof: UnbalancedEofPolicy::Truncate,
            ..ScanOptions::default()
        };
        let span = scan(&lines, 0, &options).unwrap();
        assert_eq!(span, Span { start: 0, end: 1 });
    }

    #[test]
    fn overlong_span_fails_at_bound() {
        let mut text = String::from("function f() {\n");
        for _ in 0..10 {
            text.push_str("  g();\n");
        }
        text.push('}');
        let lines = buf(&text);
        let options = ScanOptions {
            max_span_lines: 5,
            ..ScanOptions::default()
        };
        let err = scan(&lines, 0, &options).unwrap_err();
        assert!(matches!(err, ScanFailure::Overlong { limit: 5, .. }));
    }

    #[test]
    fn overlong_span_truncates_when_asked() {
        let mut text = String::from("function f() {\n");
        for _ in 0..10 {
            text.push_str("  g();\n");
        }
        text.push('}');
        let lines = buf(&text);
        let options = ScanOptions {
            max_span_lines: 5,
            overlong: OverlongPolicy::Truncate,
            ..ScanOptions::default()
        };
        let span = scan(&lines, 0, &options).unwrap();
        assert_eq!(span, Span { start: 0, end: 4 });
    }

    #[test]
    fn comment_braces_count_by_default() {
        // Historical behavior: the brace in the comment closes the span.
        let lines = buf("function f() {\n  // }\n  g();\n}");
        let span = scan(&lines, 0, &ScanOptions::default()).unwrap();
        assert_eq!(span, Span { start: 0, end: 1 });
    }

    #[test]
    fn comment_braces_inert_in_skip_mode() {
        let lines = buf("function f() {\n  // }\n  g();\n}");
        let options = ScanOptions {
            comments: CommentMode::Skip,
            ..ScanOptions::default()
        };
        let span = scan(&lines, 0, &options).unwrap();
        assert_eq!(span, Span { start: 0, end: 3 });
    }

    #[test]
    fn block_comment_braces_inert_in_skip_mode() {
        let lines = buf("function f() {\n  /* { } } */\n  g();\n}");
        let options = ScanOptions {
            comments: CommentMode::Skip,
            ..ScanOptions::default()
        };
        let span = scan(&lines, 0, &options).unwrap();
        assert_eq!(span, Span { start: 0, end: 3 });
    }

    #[test]
    fn multi_line_block_comment_in_skip_mode() {
        let lines = buf("function f() {\n  /*\n  }\n  */\n}");
        let options = ScanOptions {
            comments: CommentMode::Skip,
            ..ScanOptions::default()
        };
        let span = scan(&lines, 0, &options).unwrap();
        assert_eq!(span, Span { start: 0, end: 4 });
    }

    #[test]
    fn stray_closing_brace_before_open_is_ignored() {
        let lines = buf("}\nfunction f() {\n}\n");
        let span = scan(&lines, 0, &ScanOptions::default()).unwrap();
        assert_eq!(span, Span { start: 0, end: 2 });
    }

    #[test]
    fn multi_line_template_literal() {
        let lines = buf("function f() {\n  const t = `\n  }\n  `;\n}");
        let span = scan(&lines, 0, &ScanOptions::default()).unwrap();
        assert_eq!(span, Span { start: 0, end: 4 });
    }
}
