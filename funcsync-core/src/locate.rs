//! Declaration locator
//!
//! Decides whether a single line introduces a named function-like
//! declaration, and if so which name it binds.
//!
//! Global invariants enforced:
//! - One ordered matcher list shared by every caller; no caller carries
//!   its own pattern set
//! - Matchers are tried in a fixed order and the first match wins
//! - The method-shorthand matcher is a superset of every other pattern
//!   and must stay last
//!
//! Every pattern requires the opening brace on the matching line, directly
//! after the syntactic prefix. Pure single-expression arrow bodies carry
//! no brace and are never recognized.

use regex::Regex;
use std::sync::OnceLock;

/// Identifier shape accepted for declaration names.
const IDENT: &str = r"[A-Za-z_$][A-Za-z0-9_$]*";

/// Control-flow keywords whose heads are syntactically indistinguishable
/// from the method-shorthand pattern.
const RESERVED: &[&str] = &[
    "if", "for", "while", "switch", "catch", "try", "else", "do", "with",
];

/// Surface syntax that introduced a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclForm {
    /// `function NAME(...) {` or `async function NAME(...) {`
    Keyword,
    /// `const|let|var NAME = [async] function(...) {`
    BoundFunction,
    /// `const|let|var NAME = [async] (...) => {`
    BoundArrow,
    /// `const|let|var NAME = [async] param => {`
    BoundBareArrow,
    /// `NAME: [async] function(...) {`
    Property,
    /// `OBJ.NAME = [async] function(...) {`
    NamespacedAssignment,
    /// `[async] NAME(...) {`, the method-shorthand catch-all
    MethodShorthand,
}

/// A declaration found on one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pub name: String,
    /// Text of the line before its first opening brace, trailing-trimmed,
    /// leading indentation preserved.
    pub signature: String,
    pub form: DeclForm,
}

struct Matcher {
    form: DeclForm,
    re: Regex,
}

/// The ordered matcher list.
///
/// Ordering is load-bearing: several matchers can accept the same line,
/// and classification must be deterministic.
pub struct MatcherSet {
    matchers: Vec<Matcher>,
}

impl MatcherSet {
    pub fn new() -> Self {
        let m = |form, pattern: String| Matcher {
            form,
            // Patterns are static; a failure here is a programming error.
            re: Regex::new(&pattern).unwrap_or_else(|e| panic!("bad matcher pattern: {e}")),
        };
        let matchers = vec![
            m(
                DeclForm::Keyword,
                format!(r"^function\s+({IDENT})\s*\([^)]*\)\s*\{{"),
            ),
            m(
                DeclForm::Keyword,
                format!(r"^async\s+function\s+({IDENT})\s*\([^)]*\)\s*\{{"),
            ),
            m(
                DeclForm::BoundFunction,
                format!(
                    r"^(?:const|let|var)\s+({IDENT})\s*=\s*(?:async\s+)?function\s*\([^)]*\)\s*\{{"
                ),
            ),
            m(
                DeclForm::BoundArrow,
                format!(r"^(?:const|let|var)\s+({IDENT})\s*=\s*(?:async\s*)?\([^)]*\)\s*=>\s*\{{"),
            ),
            m(
                DeclForm::BoundBareArrow,
                format!(r"^(?:const|let|var)\s+({IDENT})\s*=\s*(?:async\s+)?{IDENT}\s*=>\s*\{{"),
            ),
            m(
                DeclForm::Property,
                format!(r"^({IDENT})\s*:\s*(?:async\s+)?function\s*\([^)]*\)\s*\{{"),
            ),
            m(
                DeclForm::NamespacedAssignment,
                format!(r"^{IDENT}\.({IDENT})\s*=\s*(?:async\s+)?function\s*\([^)]*\)\s*\{{"),
            ),
            m(
                DeclForm::MethodShorthand,
                format!(r"^async\s+({IDENT})\s*\([^)]*\)\s*\{{"),
            ),
            // Catch-all; must stay last.
            m(
                DeclForm::MethodShorthand,
                format!(r"^({IDENT})\s*\([^)]*\)\s*\{{"),
            ),
        ];
        MatcherSet { matchers }
    }

    /// Shared instance; the matcher list is immutable once compiled.
    pub fn shared() -> &'static MatcherSet {
        static SET: OnceLock<MatcherSet> = OnceLock::new();
        SET.get_or_init(MatcherSet::new)
    }

    /// Apply the matcher list to one line. Returns `None` when no matcher
    /// accepts, or when the candidate name is a reserved control-flow
    /// keyword.
    pub fn locate(&self, line: &str) -> Option<Located> {
        let trimmed = line.trim_start();

        for matcher in &self.matchers {
            if let Some(caps) = matcher.re.captures(trimmed) {
                let name = caps.get(1).map(|g| g.as_str())?;
                if RESERVED.contains(&name) {
                    return None;
                }
                return Some(Located {
                    name: name.to_string(),
                    signature: signature_of(line),
                    form: matcher.form,
                });
            }
        }
        None
    }
}

impl Default for MatcherSet {
    fn default() -> Self {
        MatcherSet::new()
    }
}

/// Everything on the line before its first opening brace, trailing-trimmed.
fn signature_of(line: &str) -> String {
    match line.find('{') {
        Some(pos) => line[..pos].trim_end().to_string(),
        None => line.trim_end().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locate(line: &str) -> Option<Located> {
        MatcherSet::shared().locate(line)
    }

    fn name_of(line: &str) -> Option<String> {
        locate(line).map(|l| l.name)
    }

    #[test]
    fn keyword_declaration() {
        let found = locate("function add(a, b) {").unwrap();
        assert_eq!(found.name, "add");
        assert_eq!(found.form, DeclForm::Keyword);
        assert_eq!(found.signature, "function add(a, b)");
    }

    #[test]
    fn single_line_complete_declaration() {
        let found = locate("function add(a, b) { return a + b; }").unwrap();
        assert_eq!(found.name, "add");
        assert_eq!(found.signature, "function add(a, b)");
    }

    #[test]
    fn async_keyword_declaration() {
        let found = locate("async function load(url) {").unwrap();
        assert_eq!(found.name, "load");
        assert_eq!(found.form, DeclForm::Keyword);
    }

    #[test]
    fn bound_function_forms() {
        for kw in ["const", "let", "var"] {
            let found = locate(&format!("{kw} f = function(a) {{")).unwrap();
            assert_eq!(found.name, "f");
            assert_eq!(found.form, DeclForm::BoundFunction);
            let found = locate(&format!("{kw} g = async function() {{")).unwrap();
            assert_eq!(found.name, "g");
        }
    }

    #[test]
    fn bound_arrow_forms() {
        let found = locate("const f = (a, b) => {").unwrap();
        assert_eq!(found.form, DeclForm::BoundArrow);
        let found = locate("let g = async (a) => {").unwrap();
        assert_eq!(found.name, "g");
    }

    #[test]
    fn bound_bare_parameter_arrow() {
        let found = locate("const double = x => {").unwrap();
        assert_eq!(found.name, "double");
        assert_eq!(found.form, DeclForm::BoundBareArrow);
        let found = locate("const fetchIt = async url => {").unwrap();
        assert_eq!(found.name, "fetchIt");
    }

    #[test]
    fn property_declaration() {
        let found = locate("  handler: function(event) {").unwrap();
        assert_eq!(found.name, "handler");
        assert_eq!(found.form, DeclForm::Property);
        assert_eq!(found.signature, "  handler: function(event)");
        let found = locate("loader: async function() {").unwrap();
        assert_eq!(found.name, "loader");
    }

    #[test]
    fn namespaced_assignment() {
        let found = locate("window.initGame = function() {").unwrap();
        assert_eq!(found.name, "initGame");
        assert_eq!(found.form, DeclForm::NamespacedAssignment);
        let found = locate("app.start = async function() {").unwrap();
        assert_eq!(found.name, "start");
    }

    #[test]
    fn method_shorthand_is_last_resort() {
        let found = locate("render(ctx) {").unwrap();
        assert_eq!(found.name, "render");
        assert_eq!(found.form, DeclForm::MethodShorthand);
        let found = locate("async update(dt) {").unwrap();
        assert_eq!(found.name, "update");
    }

    #[test]
    fn earlier_matcher_beats_catch_all() {
        let found = locate("const run = function(task) {").unwrap();
        assert_eq!(found.form, DeclForm::BoundFunction);
        assert_eq!(found.name, "run");
    }

    #[test]
    fn control_flow_heads_rejected() {
        for line in [
            "if (ready) {",
            "for (let i = 0; i < n; i++) {",
            "while (running) {",
            "switch (kind) {",
            "catch (err) {",
        ] {
            assert_eq!(name_of(line), None, "accepted control head: {line}");
        }
    }

    #[test]
    fn expression_arrow_body_not_recognized() {
        assert_eq!(name_of("const inc = x => x + 1;"), None);
        assert_eq!(name_of("const pick = (a, b) => a ?? b;"), None);
    }

    #[test]
    fn brace_on_next_line_not_recognized() {
        assert_eq!(name_of("function add(a, b)"), None);
    }

    #[test]
    fn plain_statements_not_recognized() {
        assert_eq!(name_of("const total = a + b;"), None);
        assert_eq!(name_of("return {"), None);
        assert_eq!(name_of("} else {"), None);
        assert_eq!(name_of("foo.bar();"), None);
    }

    #[test]
    fn indented_declaration_keeps_indentation_in_signature() {
        let found = locate("    function nested(a) {").unwrap();
        assert_eq!(found.signature, "    function nested(a)");
    }
}
