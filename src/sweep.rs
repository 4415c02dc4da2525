//! Two-pass sweep over a source tree.
//!
//! Pass one reads every file and feeds the cross-file aggregates: line-ending
//! and preamble consistency groups, guard and `#error` findings, and the
//! trace working lists. Those aggregates are then frozen into a [`Consensus`]
//! value which pass two takes as read-only input while rewriting files. Pass
//! two only runs in preview or write mode; report mode stops after pass one.

use crate::consensus::{ConsensusError, ConsistencyGroup, OrderedSet};
use crate::guard::{self, GuardError};
use crate::lines;
use crate::preamble;
use crate::quotes;
use crate::trace::{self, Diagnostic, TraceArtifacts, TraceBook, TraceSnapshot};
use colored::Colorize;
use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// Fallback when no file voted and no override was given.
const DEFAULT_LINE_ENDING: &str = "\n";

#[derive(Error, Debug)]
pub enum SweepError {
    #[error("failed to resolve root {root}: {source}")]
    Root { root: PathBuf, source: io::Error },

    #[error(transparent)]
    Guard(#[from] GuardError),

    #[error(transparent)]
    Consensus(#[from] ConsensusError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// What to do with the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Single detection pass, report findings, mutate nothing.
    Report,
    /// Both passes; collect prospective rewrites, mutate nothing.
    Preview,
    /// Both passes; rewrite divergent files in place.
    Write,
}

#[derive(Debug, Clone)]
pub struct SweepOptions {
    pub mode: Mode,
    /// Explicit expected line ending; `None` infers it by majority vote.
    pub line_ending: Option<String>,
}

/// Frozen pass-one aggregates, the read-only configuration of pass two.
#[derive(Debug, Clone)]
pub struct Consensus {
    pub line_ending: String,
    pub preamble: Option<String>,
    pub traces: TraceSnapshot,
}

/// One prospective or applied rewrite.
#[derive(Debug, Clone)]
pub struct FileChange {
    pub path: PathBuf,
    pub before: String,
    pub after: String,
}

/// Result of a completed sweep.
#[derive(Debug, Default)]
pub struct SweepOutcome {
    pub changes: Vec<FileChange>,
    pub files_scanned: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Header,
    Source,
}

fn classify(path: &Path) -> Option<FileKind> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "h" => Some(FileKind::Header),
        "cpp" => Some(FileKind::Source),
        _ => None,
    }
}

fn is_build_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir() && entry.file_name().to_string_lossy().contains("build")
}

/// Drives the two passes over one root.
pub struct Sweeper {
    root: PathBuf,
    project: String,
    options: SweepOptions,
    line_endings: ConsistencyGroup<String>,
    preambles: ConsistencyGroup<String>,
    missing_final: Vec<PathBuf>,
    mismatched_guards: Vec<PathBuf>,
    missing_error_quotes: OrderedSet<PathBuf>,
    trace_book: TraceBook,
    trace_artifacts: Vec<(PathBuf, TraceArtifacts)>,
    diagnostics: Vec<Diagnostic>,
    io_failures: Vec<(PathBuf, String)>,
    consensus: Option<Consensus>,
}

impl Sweeper {
    pub fn new(root: impl AsRef<Path>, options: SweepOptions) -> Result<Self, SweepError> {
        let root = root.as_ref();
        let root = root.canonicalize().map_err(|source| SweepError::Root {
            root: root.to_path_buf(),
            source,
        })?;
        let project = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            root,
            project,
            options,
            line_endings: ConsistencyGroup::new(),
            preambles: ConsistencyGroup::new(),
            missing_final: Vec::new(),
            mismatched_guards: Vec::new(),
            missing_error_quotes: OrderedSet::new(),
            trace_book: TraceBook::new(),
            trace_artifacts: Vec::new(),
            diagnostics: Vec::new(),
            io_failures: Vec::new(),
            consensus: None,
        })
    }

    /// Run pass one and, in preview or write mode, pass two.
    pub fn run(&mut self) -> Result<SweepOutcome, SweepError> {
        let files = self.collect_files();
        let mut outcome = SweepOutcome {
            files_scanned: files.len(),
            ..Default::default()
        };

        for (path, kind) in &files {
            match fs::read_to_string(path) {
                Ok(content) => self.observe_file(path, *kind, &content)?,
                Err(e) => self.io_failures.push((path.clone(), e.to_string())),
            }
        }

        let consensus = self.freeze();

        if matches!(self.options.mode, Mode::Preview | Mode::Write) {
            let mut book = TraceBook::new();
            for (path, kind) in &files {
                let content = match fs::read_to_string(path) {
                    Ok(content) => content,
                    // Already recorded during pass one.
                    Err(_) => continue,
                };
                let mut diags = Vec::new();
                let updated =
                    self.rewrite_file(path, *kind, &content, &consensus, &mut book, &mut diags)?;
                self.diagnostics.extend(diags);
                if let Some(after) = updated {
                    if self.options.mode == Mode::Write {
                        if let Err(e) = atomic_write(path, after.as_bytes()) {
                            self.io_failures.push((path.clone(), e.to_string()));
                            continue;
                        }
                    }
                    outcome.changes.push(FileChange {
                        path: path.clone(),
                        before: content,
                        after,
                    });
                }
            }
        }

        self.consensus = Some(consensus);
        Ok(outcome)
    }

    /// Files under the root with recognized extensions, in sorted order.
    /// Directories whose name contains a build marker are pruned entirely.
    fn collect_files(&mut self) -> Vec<(PathBuf, FileKind)> {
        let mut files = Vec::new();
        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_build_dir(e));
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                    self.io_failures.push((path, e.to_string()));
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(kind) = classify(entry.path()) {
                files.push((entry.path().to_path_buf(), kind));
            }
        }
        files
    }

    /// Pass one for a single file: observe, never mutate.
    fn observe_file(
        &mut self,
        path: &Path,
        kind: FileKind,
        content: &str,
    ) -> Result<(), SweepError> {
        let file_lines = lines::split_lines(content);

        let mut endings = OrderedSet::new();
        for line in &file_lines {
            endings.insert(line.ending.clone());
        }
        for ending in endings.iter() {
            if ending.is_empty() {
                self.missing_final.push(path.to_path_buf());
            } else {
                self.line_endings.observe(ending.clone(), path)?;
            }
        }

        let pre = preamble::preamble_len(&file_lines);
        self.preambles
            .observe(preamble::preamble_text(&file_lines, pre), path)?;

        if kind == FileKind::Header {
            let token = guard::derive_guard(&self.project, &self.root, path)?;
            let parse = guard::parse_guard(&file_lines, pre);
            if !parse.matches(&token) {
                self.mismatched_guards.push(path.to_path_buf());
            }
        }

        for line in &file_lines {
            if quotes::quote_error_directive(&line.text).is_some() {
                self.missing_error_quotes.insert(path.to_path_buf());
            }
        }

        let mut artifacts = trace::scan_traces(path, &file_lines, &mut self.trace_book);
        self.diagnostics.append(&mut artifacts.diagnostics);
        if artifacts.has_content() {
            self.trace_artifacts.push((path.to_path_buf(), artifacts));
        }

        Ok(())
    }

    /// Freeze the pass-one aggregates into pass two's read-only input.
    fn freeze(&mut self) -> Consensus {
        self.line_endings.finalize();
        self.preambles.finalize();
        let line_ending = self
            .options
            .line_ending
            .clone()
            .or_else(|| self.line_endings.expected().ok().cloned())
            .unwrap_or_else(|| DEFAULT_LINE_ENDING.to_string());
        let preamble = self.preambles.expected().ok().cloned();
        let traces = std::mem::take(&mut self.trace_book).freeze();
        Consensus {
            line_ending,
            preamble,
            traces,
        }
    }

    /// Pass two for a single file: rebuild content against the consensus.
    ///
    /// Returns the new content when it differs from the current one.
    fn rewrite_file(
        &self,
        path: &Path,
        kind: FileKind,
        content: &str,
        consensus: &Consensus,
        book: &mut TraceBook,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Option<String>, SweepError> {
        let ending = consensus.line_ending.as_str();
        let mut file_lines = lines::split_lines(content);

        for line in &mut file_lines {
            line.ending = ending.to_string();
        }

        let pre = preamble::preamble_len(&file_lines);
        // Preamble content repair stays disabled; detection only.

        if kind == FileKind::Header {
            let token = guard::derive_guard(&self.project, &self.root, path)?;
            let parse = guard::parse_guard(&file_lines, pre);
            if !parse.matches(&token) && !parse.is_bare_define() {
                file_lines = guard::rebuild_guard(&file_lines, pre, &parse, &token, ending);
            }
        }

        for line in &mut file_lines {
            if let Some(fixed) = quotes::quote_error_directive(&line.text) {
                line.text = fixed;
            }
        }

        trace::renumber_traces(
            path,
            &mut file_lines,
            book,
            &consensus.traces,
            ending,
            diagnostics,
        );

        let updated = lines::join_lines(&file_lines);
        Ok(if updated != content {
            Some(updated)
        } else {
            None
        })
    }

    /// Render the consistency report, one section per rule class.
    pub fn write_report(&self, out: &mut impl io::Write) -> io::Result<()> {
        let Some(consensus) = &self.consensus else {
            return Ok(());
        };
        let mut any_findings = false;

        let expected = &consensus.line_ending;
        for (value, files) in self.line_endings.pairs() {
            if value == expected {
                continue;
            }
            any_findings = true;
            writeln!(out)?;
            writeln!(
                out,
                "{}",
                format!(
                    "These files have inconsistent line endings ({:?} should be {:?}):",
                    value, expected
                )
                .yellow()
                .bold()
            )?;
            for file in files {
                writeln!(out, "{}", file.display())?;
            }
        }

        if !self.missing_final.is_empty() {
            any_findings = true;
            writeln!(out)?;
            writeln!(
                out,
                "{}",
                "These files are missing the final line terminator:"
                    .yellow()
                    .bold()
            )?;
            for file in &self.missing_final {
                writeln!(out, "{}", file.display())?;
            }
        }

        if !self.preambles.oddballs().is_empty() {
            any_findings = true;
            writeln!(out)?;
            writeln!(
                out,
                "{}",
                "These files have inconsistent preambles:".yellow().bold()
            )?;
            for (_, file) in self.preambles.oddballs() {
                writeln!(out, "{}", file.display())?;
            }
        }

        if !self.mismatched_guards.is_empty() {
            any_findings = true;
            writeln!(out)?;
            writeln!(
                out,
                "{}",
                "These files have mismatched include guards:".yellow().bold()
            )?;
            for file in &self.mismatched_guards {
                writeln!(out, "{}", file.display())?;
            }
        }

        if !self.missing_error_quotes.is_empty() {
            any_findings = true;
            writeln!(out)?;
            writeln!(
                out,
                "{}",
                "These files are missing quotes around #error directives:"
                    .yellow()
                    .bold()
            )?;
            for file in self.missing_error_quotes.iter() {
                writeln!(out, "{}", file.display())?;
            }
        }

        let trace_fixes: Vec<&PathBuf> = self
            .trace_artifacts
            .iter()
            .filter(|(_, artifacts)| artifacts.needs_fix(&consensus.traces))
            .map(|(path, _)| path)
            .collect();
        if !trace_fixes.is_empty() {
            any_findings = true;
            writeln!(out)?;
            writeln!(
                out,
                "{}",
                "These files need TURF_TRACE identifiers fixed:"
                    .yellow()
                    .bold()
            )?;
            for file in trace_fixes {
                writeln!(out, "{}", file.display())?;
            }
        }

        if !any_findings {
            writeln!(out)?;
            writeln!(out, "{}", "Code is already tidy.".green())?;
        }
        Ok(())
    }

    /// Malformed trace usage collected across the sweep.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Per-file read/write failures; none of them aborts the sweep.
    pub fn io_failures(&self) -> &[(PathBuf, String)] {
        &self.io_failures
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn project(&self) -> &str {
        &self.project
    }
}

/// Atomic file write: tempfile in the same directory + fsync + rename.
///
/// Either the full write succeeds or the original file is left untouched.
fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "path has no parent directory")
    })?;
    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
