//! Declaration reference scanner.
//!
//! Walks the source once, char by char, skipping comments and recording the
//! target of every import form a declaration file can use to pull in
//! another module.

use std::collections::HashSet;

/// File extensions of TypeScript declaration files.
pub const DECLARATION_EXTENSIONS: &[&str] = &[".d.ts", ".d.mts", ".d.cts"];

/// Marker introducing a version hint after an import on the same line.
const VERSION_HINT: &str = "// types: ";

/// Heads of TypeScript standard-library names (`es2015.promise` -> `es2015`).
const LIB_HEADS: &[&str] = &[
    "es5",
    "es6",
    "es7",
    "esnext",
    "dom",
    "webworker",
    "scripthost",
    "decorators",
];

/// A module referenced by a declaration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationImport {
    /// Target exactly as written.
    pub module: String,
    /// `None` for relative targets; otherwise `latest` or the `// types:` hint.
    pub version: Option<String>,
}

/// Whether a path names a declaration file.
#[must_use]
pub fn is_declaration_file(path: &str) -> bool {
    DECLARATION_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Whether a target is a TypeScript standard-library name.
#[must_use]
pub fn is_lib_name(target: &str) -> bool {
    let lower = target.to_ascii_lowercase();
    let head = lower.split('.').next().unwrap_or_default();
    if LIB_HEADS.contains(&head) {
        return true;
    }
    head.strip_prefix("es20")
        .is_some_and(|year| !year.is_empty() && year.chars().all(|c| c.is_ascii_digit()))
}

/// Scan a declaration file for the modules it references.
///
/// Returns targets in first-appearance order with declaration file paths and
/// standard-library names dropped. Repeats of the same target and version
/// are collapsed; the same target with a different `// types:` hint is kept.
#[must_use]
pub fn scan_declaration_imports(source: &str) -> Vec<DeclarationImport> {
    let chars: Vec<char> = source.chars().collect();
    let mut results = Vec::new();
    let mut seen = HashSet::new();

    for (target, end) in find_targets(&chars) {
        if target.is_empty() || is_declaration_file(&target) || is_lib_name(&target) {
            continue;
        }
        let version = if target.starts_with('.') {
            None
        } else {
            Some(version_hint(&chars, end))
        };
        if !seen.insert((target.clone(), version.clone())) {
            continue;
        }
        results.push(DeclarationImport {
            module: target,
            version,
        });
    }

    results
}

/// Version hint from the rest of the line after `end`, or `latest`.
fn version_hint(chars: &[char], end: usize) -> String {
    let rest: String = chars[end.min(chars.len())..]
        .iter()
        .take_while(|&&c| c != '\n')
        .collect();
    rest.split_once(VERSION_HINT)
        .map(|(_, hint)| hint.trim())
        .filter(|hint| !hint.is_empty())
        .unwrap_or(crate::pkg::LATEST)
        .to_string()
}

/// Every raw target with the index just past its closing quote.
fn find_targets(chars: &[char]) -> Vec<(String, usize)> {
    let len = chars.len();
    let mut found = Vec::new();
    let mut i = 0;

    while i < len {
        // Triple-slash directives look like comments
        if starts_with(chars, i, "///") {
            if let Some(hit) = scan_reference_directive(chars, i + 3) {
                found.push(hit);
            }
            i = skip_line(chars, i);
            continue;
        }

        if starts_with(chars, i, "//") {
            i = skip_line(chars, i);
            continue;
        }

        if starts_with(chars, i, "/*") {
            i += 2;
            while i + 1 < len && !(chars[i] == '*' && chars[i + 1] == '/') {
                i += 1;
            }
            i += 2;
            continue;
        }

        // Literals may contain `/*` or `//`
        if is_quote(chars[i]) {
            i = read_string(chars, i).map_or(i + 1, |(_, end)| end);
            continue;
        }

        if matches_keyword(chars, i, "import") {
            if let Some(hit) = scan_import_statement(chars, i + 6) {
                i = hit.1;
                found.push(hit);
                continue;
            }
        } else if matches_keyword(chars, i, "export") {
            if let Some(hit) = scan_export_from(chars, i + 6) {
                i = hit.1;
                found.push(hit);
                continue;
            }
        } else if matches_keyword(chars, i, "require") {
            if let Some(hit) = scan_call_argument(chars, i + 7) {
                i = hit.1;
                found.push(hit);
                continue;
            }
        }

        i += 1;
    }

    found
}

fn starts_with(chars: &[char], pos: usize, pat: &str) -> bool {
    let mut j = pos;
    for c in pat.chars() {
        if j >= chars.len() || chars[j] != c {
            return false;
        }
        j += 1;
    }
    true
}

fn skip_line(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() && chars[i] != '\n' {
        i += 1;
    }
    i
}

fn skip_whitespace(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    i
}

fn is_quote(c: char) -> bool {
    c == '"' || c == '\'' || c == '`'
}

fn is_ident(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Check if chars at position match a keyword (with word boundary).
fn matches_keyword(chars: &[char], pos: usize, keyword: &str) -> bool {
    let end = pos + keyword.chars().count();
    if end > chars.len() || !starts_with(chars, pos, keyword) {
        return false;
    }
    // `.import(` or `x.require(` are member calls, not imports
    if pos > 0 && (is_ident(chars[pos - 1]) || chars[pos - 1] == '.') {
        return false;
    }
    !(end < chars.len() && is_ident(chars[end]))
}

/// Read a quoted string starting at `i` (which must be a quote).
/// Returns (contents, index past the closing quote).
fn read_string(chars: &[char], mut i: usize) -> Option<(String, usize)> {
    let quote = *chars.get(i).filter(|c| is_quote(**c))?;
    i += 1;
    let start = i;
    while i < chars.len() && chars[i] != quote {
        if chars[i] == '\\' && i + 1 < chars.len() {
            i += 2;
            continue;
        }
        if chars[i] == '\n' {
            return None;
        }
        i += 1;
    }
    if i >= chars.len() {
        return None;
    }
    Some((chars[start..i].iter().collect(), i + 1))
}

/// `/// <reference path|types|lib="x" />`, starting after the slashes.
fn scan_reference_directive(chars: &[char], start: usize) -> Option<(String, usize)> {
    let mut i = skip_whitespace(chars, start);
    if !starts_with(chars, i, "<reference") {
        return None;
    }
    i += "<reference".len();
    let line_end = skip_line(chars, i);

    while i < line_end {
        i = skip_whitespace(chars, i);
        let attr_start = i;
        while i < line_end && chars[i].is_ascii_alphabetic() {
            i += 1;
        }
        let attr: String = chars[attr_start..i].iter().collect();
        if attr.is_empty() {
            return None;
        }
        i = skip_whitespace(chars, i);
        if chars.get(i) != Some(&'=') {
            return None;
        }
        i = skip_whitespace(chars, i + 1);
        let (value, end) = read_string(chars, i)?;
        if matches!(attr.as_str(), "path" | "types" | "lib") {
            return Some((value, end));
        }
        i = end;
    }

    None
}

/// Body of an `import` statement, starting after the keyword.
///
/// Covers `import … from "x"`, `import "x"`, `import x = require("x")` and
/// `import("x")`.
fn scan_import_statement(chars: &[char], start: usize) -> Option<(String, usize)> {
    let len = chars.len();
    let mut i = skip_whitespace(chars, start);

    if i < len && chars[i] == '(' {
        return read_string(chars, skip_whitespace(chars, i + 1));
    }

    let limit = (start + 1000).min(len);
    while i < limit {
        if matches_keyword(chars, i, "from") {
            return read_string(chars, skip_whitespace(chars, i + 4));
        }
        if is_quote(chars[i]) {
            return read_string(chars, i);
        }
        if chars[i] == ';' {
            break;
        }
        i += 1;
    }

    None
}

/// `export … from "x"`, starting after the keyword.
fn scan_export_from(chars: &[char], start: usize) -> Option<(String, usize)> {
    let limit = (start + 500).min(chars.len());
    let mut i = start;
    while i < limit {
        if matches_keyword(chars, i, "from") {
            return read_string(chars, skip_whitespace(chars, i + 4));
        }
        // `export declare function f(): void;` has no source module
        if chars[i] == ';' || (chars[i] == '{' && !opens_export_list(chars, start, i)) {
            break;
        }
        i += 1;
    }
    None
}

/// Whether the `{` at `pos` opens an export list (`export { a, b } from`).
fn opens_export_list(chars: &[char], start: usize, pos: usize) -> bool {
    chars[start..pos].iter().all(|c| c.is_whitespace())
        || matches_keyword(chars, skip_whitespace(chars, start), "type")
}

/// `("x")` after `require`.
fn scan_call_argument(chars: &[char], start: usize) -> Option<(String, usize)> {
    let mut i = skip_whitespace(chars, start);
    if chars.get(i) != Some(&'(') {
        return None;
    }
    i = skip_whitespace(chars, i + 1);
    read_string(chars, i)
}
