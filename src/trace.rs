//! Sequential numbering of `TURF_TRACE` statements.
//!
//! Pass one walks every file in tree order and records each category's
//! call-site messages in discovery order, without touching anything. The
//! working lists are then frozen into a [`TraceSnapshot`]. Pass two rebuilds
//! the working lists while rewriting: call sites get their sequential index,
//! declarations carry the snapshot list's length as their count, and
//! definition blocks are regenerated wholesale from the snapshot. Because
//! both passes traverse identically, the rewrite is deterministic and
//! idempotent with respect to pass-one discovery order.
//!
//! Malformed usage (a second category opened in the same file, a call site
//! before any category is open) is reported as a [`Diagnostic`] and never
//! stops the sweep.

use crate::lines::Line;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Name stamped into regenerated definition blocks.
const GENERATOR: &str = env!("CARGO_PKG_NAME");

static RE_DECLARE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*TURF_TRACE_DECLARE\s*\(\s*(\w+)\s*,").unwrap());

static RE_DEFINE_BEGIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*TURF_TRACE_DEFINE_BEGIN\s*\(\s*(\w+)\s*,").unwrap());

static RE_DEFINE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*TURF_TRACE_DEFINE_END").unwrap());

static RE_CALL: Lazy<Regex> = Lazy::new(|| Regex::new(r#"TURF_TRACE\s*\(.*?"(.*?)""#).unwrap());

/// Malformed trace usage, reported apart from the consistency report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub path: PathBuf,
    /// Zero-based line index.
    pub line: usize,
    pub message: String,
}

impl Diagnostic {
    fn new(path: &Path, line: usize, message: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}): {}", self.path.display(), self.line, self.message)
    }
}

/// Working per-category call-site lists, built up during one pass.
#[derive(Debug, Default)]
pub struct TraceBook {
    categories: HashMap<String, Vec<String>>,
}

impl TraceBook {
    pub fn new() -> Self {
        Self::default()
    }

    fn list_mut(&mut self, category: &str) -> &mut Vec<String> {
        self.categories.entry(category.to_string()).or_default()
    }

    /// Freeze the working lists into the immutable pass-one snapshot.
    pub fn freeze(self) -> TraceSnapshot {
        TraceSnapshot {
            categories: self.categories,
        }
    }
}

/// Frozen per-category call-site lists captured at the end of pass one.
#[derive(Debug, Clone, Default)]
pub struct TraceSnapshot {
    categories: HashMap<String, Vec<String>>,
}

impl TraceSnapshot {
    pub fn list(&self, category: &str) -> Option<&[String]> {
        self.categories.get(category).map(Vec::as_slice)
    }
}

/// What pass one observed about one file's trace statements.
#[derive(Debug, Default)]
pub struct TraceArtifacts {
    /// A call site's text differed from its canonical rewrite.
    sites_dirty: bool,
    /// Declaration lines seen, as `(category, line text)`.
    declarations: Vec<(String, String)>,
    /// Definition blocks seen, as `(category, block line texts)`.
    blocks: Vec<(String, Vec<String>)>,
    /// Malformed usage found while scanning.
    pub diagnostics: Vec<Diagnostic>,
}

impl TraceArtifacts {
    /// Whether the file held any trace statements worth reconciling.
    pub fn has_content(&self) -> bool {
        self.sites_dirty || !self.declarations.is_empty() || !self.blocks.is_empty()
    }

    /// Whether pass two would rewrite this file, judged against the frozen
    /// snapshot: any dirty call site, any declaration whose count disagrees
    /// with the snapshot list, or any definition block that differs from
    /// its regenerated form.
    pub fn needs_fix(&self, snapshot: &TraceSnapshot) -> bool {
        if self.sites_dirty {
            return true;
        }
        for (category, text) in &self.declarations {
            let count = snapshot.list(category).map_or(0, <[String]>::len);
            if *text != declaration_line(category, count) {
                return true;
            }
        }
        for (category, block) in &self.blocks {
            let descriptions = snapshot.list(category).unwrap_or(&[]);
            if *block != definition_block(category, descriptions) {
                return true;
            }
        }
        false
    }
}

fn declaration_line(category: &str, count: usize) -> String {
    format!("TURF_TRACE_DECLARE({category}, {count})")
}

fn definition_block(category: &str, descriptions: &[String]) -> Vec<String> {
    let count = descriptions.len();
    let mut out =
        vec![format!("TURF_TRACE_DEFINE_BEGIN({category}, {count}) // autogenerated by {GENERATOR}")];
    for description in descriptions {
        out.push(format!("TURF_TRACE_DEFINE(\"{description}\")"));
    }
    out.push(format!("TURF_TRACE_DEFINE_END({category}, {count})"));
    out
}

fn call_site_text(category: &str, index: usize, message: &str) -> String {
    format!("TURF_TRACE({category}, {index}, \"{message}\"")
}

/// Find the matching `TURF_TRACE_DEFINE_END` of a block.
///
/// Returns the begin line itself when no end is found before EOF, so the
/// caller treats the block as zero-length and does not skip past it.
fn find_block_end(lines: &[Line], begin: usize) -> usize {
    for (i, line) in lines.iter().enumerate().skip(begin + 1) {
        if RE_DEFINE_END.is_match(&line.text) {
            return i;
        }
    }
    begin
}

/// Pass one: observe a file's trace statements in order.
///
/// Appends every call-site message to its category's working list and
/// records the artifacts needed to decide, once the snapshot exists,
/// whether the file needs its identifiers fixed.
pub fn scan_traces(path: &Path, lines: &[Line], book: &mut TraceBook) -> TraceArtifacts {
    let mut artifacts = TraceArtifacts::default();
    let mut open: Option<String> = None;

    let mut l = 0;
    while l < lines.len() {
        let text = &lines[l].text;

        if let Some(caps) = RE_DECLARE.captures(text) {
            if open.is_some() {
                artifacts.diagnostics.push(Diagnostic::new(
                    path,
                    l,
                    "file already has a TURF_TRACE category",
                ));
            } else {
                let category = caps[1].to_string();
                book.list_mut(&category);
                artifacts.declarations.push((category.clone(), text.clone()));
                open = Some(category);
            }
            l += 1;
            continue;
        }

        if let Some(caps) = RE_DEFINE_BEGIN.captures(text) {
            if open.is_some() {
                artifacts.diagnostics.push(Diagnostic::new(
                    path,
                    l,
                    "file already has a TURF_TRACE category",
                ));
                l += 1;
                continue;
            }
            let category = caps[1].to_string();
            book.list_mut(&category);
            let end = find_block_end(lines, l);
            let block: Vec<String> = lines[l..=end].iter().map(|ln| ln.text.clone()).collect();
            artifacts.blocks.push((category.clone(), block));
            open = Some(category);
            l = end + 1;
            continue;
        }

        if let Some(caps) = RE_CALL.captures(text) {
            match &open {
                None => artifacts.diagnostics.push(Diagnostic::new(
                    path,
                    l,
                    "TURF_TRACE category not declared",
                )),
                Some(category) => {
                    let whole = caps.get(0).expect("group 0 always present");
                    let message = caps[1].to_string();
                    let list = book.list_mut(category);
                    let index = list.len();
                    list.push(message.clone());
                    if text[whole.range()] != call_site_text(category, index, &message) {
                        artifacts.sites_dirty = true;
                    }
                }
            }
        }
        l += 1;
    }

    artifacts
}

/// Pass two: rewrite a file's trace statements from the frozen snapshot.
///
/// Call sites are renumbered sequentially from the fresh working lists
/// (which replay pass-one order), declarations carry the snapshot list's
/// length, and definition blocks are regenerated from the snapshot in
/// original order. A category absent from the snapshot is left unrewritten
/// and reported.
pub fn renumber_traces(
    path: &Path,
    lines: &mut Vec<Line>,
    book: &mut TraceBook,
    snapshot: &TraceSnapshot,
    ending: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let mut open: Option<String> = None;

    let mut l = 0;
    while l < lines.len() {
        let text = lines[l].text.clone();

        if let Some(caps) = RE_DECLARE.captures(&text) {
            if open.is_none() {
                let category = caps[1].to_string();
                book.list_mut(&category);
                match snapshot.list(&category) {
                    Some(original) => {
                        lines[l] = Line::new(declaration_line(&category, original.len()), ending);
                    }
                    None => diagnostics.push(Diagnostic::new(
                        path,
                        l,
                        format!("TURF_TRACE category '{category}' missing from first-pass records"),
                    )),
                }
                open = Some(category);
            }
            l += 1;
            continue;
        }

        if let Some(caps) = RE_DEFINE_BEGIN.captures(&text) {
            if open.is_some() {
                l += 1;
                continue;
            }
            let category = caps[1].to_string();
            book.list_mut(&category);
            let end = find_block_end(lines, l);
            match snapshot.list(&category) {
                Some(original) => {
                    let replacement: Vec<Line> = definition_block(&category, original)
                        .into_iter()
                        .map(|t| Line::new(t, ending))
                        .collect();
                    let advance = replacement.len();
                    lines.splice(l..=end, replacement);
                    open = Some(category);
                    l += advance;
                }
                None => {
                    diagnostics.push(Diagnostic::new(
                        path,
                        l,
                        format!("TURF_TRACE category '{category}' missing from first-pass records"),
                    ));
                    open = Some(category);
                    l = end + 1;
                }
            }
            continue;
        }

        if let Some(caps) = RE_CALL.captures(&text) {
            if let Some(category) = &open {
                let whole = caps.get(0).expect("group 0 always present");
                let message = caps[1].to_string();
                let list = book.list_mut(category);
                let index = list.len();
                list.push(message.clone());
                lines[l].text = format!(
                    "{}{}{}",
                    &text[..whole.start()],
                    call_site_text(category, index, &message),
                    &text[whole.end()..]
                );
            }
        }
        l += 1;
    }
}
