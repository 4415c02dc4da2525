//! End-to-end sweeps over temporary source trees, driven through the
//! library API.

use srctidy::{Mode, SweepOptions, Sweeper};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Create a project root named `myproj` inside a fresh temp dir.
fn setup_root() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("myproj");
    fs::create_dir(&root).unwrap();
    (dir, root)
}

fn run_sweep(root: &Path, mode: Mode, line_ending: Option<&str>) -> (Sweeper, srctidy::SweepOutcome) {
    let options = SweepOptions {
        mode,
        line_ending: line_ending.map(str::to_string),
    };
    let mut sweeper = Sweeper::new(root, options).unwrap();
    let outcome = sweeper.run().unwrap();
    (sweeper, outcome)
}

fn report_text(sweeper: &Sweeper) -> String {
    let mut buf = Vec::new();
    sweeper.write_report(&mut buf).unwrap();
    String::from_utf8_lossy(&buf).into_owned()
}

#[test]
fn test_report_flags_minority_line_endings() {
    let (_dir, root) = setup_root();
    fs::write(root.join("a_unix.cpp"), "one\ntwo\nthree\n").unwrap();
    fs::write(root.join("b_win.cpp"), "one\r\ntwo\r\n").unwrap();

    let (sweeper, outcome) = run_sweep(&root, Mode::Report, None);
    assert_eq!(outcome.files_scanned, 2);
    assert!(outcome.changes.is_empty());

    // Equal file counts: the earliest-seen ending wins the tie.
    let report = report_text(&sweeper);
    assert!(report.contains("inconsistent line endings"));
    assert!(report.contains("b_win.cpp"));
    assert!(!report.contains("Code is already tidy."));
}

#[test]
fn test_report_on_tidy_tree() {
    let (_dir, root) = setup_root();
    fs::write(root.join("a.cpp"), "int x;\n").unwrap();

    let (sweeper, _) = run_sweep(&root, Mode::Report, None);
    assert!(report_text(&sweeper).contains("Code is already tidy."));
}

#[test]
fn test_report_never_mutates() {
    let (_dir, root) = setup_root();
    let path = root.join("b.cpp");
    fs::write(&path, "one\r\ntwo").unwrap();

    run_sweep(&root, Mode::Report, Some("\n"));
    assert_eq!(fs::read_to_string(&path).unwrap(), "one\r\ntwo");
}

#[test]
fn test_write_repairs_endings_and_final_terminator() {
    let (_dir, root) = setup_root();
    fs::write(root.join("a.cpp"), "a\nb\n").unwrap();
    fs::write(root.join("b.cpp"), "x\r\ny").unwrap();

    let (sweeper, outcome) = run_sweep(&root, Mode::Write, None);
    assert_eq!(outcome.changes.len(), 1);
    assert!(sweeper.io_failures().is_empty());

    assert_eq!(fs::read_to_string(root.join("a.cpp")).unwrap(), "a\nb\n");
    // Minority endings normalized, final terminator gained, no duplicates.
    assert_eq!(fs::read_to_string(root.join("b.cpp")).unwrap(), "x\ny\n");
}

#[test]
fn test_windows_override_wins_over_majority() {
    let (_dir, root) = setup_root();
    fs::write(root.join("a.cpp"), "a\nb\n").unwrap();
    fs::write(root.join("b.cpp"), "x\ny\n").unwrap();

    let (_, outcome) = run_sweep(&root, Mode::Write, Some("\r\n"));
    assert_eq!(outcome.changes.len(), 2);
    assert_eq!(fs::read_to_string(root.join("a.cpp")).unwrap(), "a\r\nb\r\n");
    assert_eq!(fs::read_to_string(root.join("b.cpp")).unwrap(), "x\r\ny\r\n");
}

#[test]
fn test_preview_collects_changes_without_writing() {
    let (_dir, root) = setup_root();
    fs::write(root.join("b.cpp"), "x\r\ny").unwrap();

    let (_, outcome) = run_sweep(&root, Mode::Preview, Some("\n"));
    assert_eq!(outcome.changes.len(), 1);
    assert_eq!(outcome.changes[0].after, "x\ny\n");
    assert_eq!(fs::read_to_string(root.join("b.cpp")).unwrap(), "x\r\ny");
}

#[test]
fn test_write_repairs_include_guard() {
    let (_dir, root) = setup_root();
    let header = root.join("Bar.h");
    fs::write(
        &header,
        "#ifndef WRONG\n#define WRONG\n\nvoid f();\n\n#endif // WRONG\n",
    )
    .unwrap();

    let (report_sweeper, _) = run_sweep(&root, Mode::Report, None);
    assert!(report_text(&report_sweeper).contains("mismatched include guards"));

    run_sweep(&root, Mode::Write, None);
    assert_eq!(
        fs::read_to_string(&header).unwrap(),
        "#ifndef MYPROJ_BAR_H\n#define MYPROJ_BAR_H\n\nvoid f();\n\n#endif // MYPROJ_BAR_H\n"
    );
}

#[test]
fn test_bare_define_header_flagged_but_untouched() {
    let (_dir, root) = setup_root();
    let header = root.join("Baz.h");
    let content = "#define SOMETHING_ELSE\nvoid g();\n";
    fs::write(&header, content).unwrap();

    let (sweeper, outcome) = run_sweep(&root, Mode::Write, None);
    assert!(report_text(&sweeper).contains("mismatched include guards"));
    assert!(outcome.changes.is_empty());
    assert_eq!(fs::read_to_string(&header).unwrap(), content);
}

#[test]
fn test_write_quotes_error_directives() {
    let (_dir, root) = setup_root();
    let path = root.join("q.cpp");
    fs::write(&path, "#error out of memory\n#error \"already quoted\"\n").unwrap();

    let (report_sweeper, _) = run_sweep(&root, Mode::Report, None);
    assert!(report_text(&report_sweeper).contains("missing quotes around #error directives"));

    run_sweep(&root, Mode::Write, None);
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "#error \"out of memory\"\n#error \"already quoted\"\n"
    );
}

fn write_trace_fixture(root: &Path) {
    fs::write(
        root.join("trace.h"),
        "#ifndef MYPROJ_TRACE_H\n\
         #define MYPROJ_TRACE_H\n\
         \n\
         TURF_TRACE_DECLARE(Foo, 0)\n\
         \n\
         inline void a() {\n\
         \x20   TURF_TRACE(Foo, 7, \"first thing\")\n\
         \x20   TURF_TRACE(Foo, 7, \"second thing\")\n\
         }\n\
         \n\
         #endif // MYPROJ_TRACE_H\n",
    )
    .unwrap();
    fs::write(
        root.join("trace.cpp"),
        "#include \"trace.h\"\n\
         \n\
         TURF_TRACE_DEFINE_BEGIN(Foo, 0)\n\
         TURF_TRACE_DEFINE(\"stale entry\")\n\
         TURF_TRACE_DEFINE_END(Foo, 0)\n",
    )
    .unwrap();
}

#[test]
fn test_trace_renumber_end_to_end() {
    let (_dir, root) = setup_root();
    write_trace_fixture(&root);

    let (report_sweeper, _) = run_sweep(&root, Mode::Report, None);
    assert!(report_text(&report_sweeper).contains("TURF_TRACE identifiers"));

    let (sweeper, outcome) = run_sweep(&root, Mode::Write, None);
    assert!(sweeper.diagnostics().is_empty());
    assert_eq!(outcome.changes.len(), 2);

    assert_eq!(
        fs::read_to_string(root.join("trace.h")).unwrap(),
        "#ifndef MYPROJ_TRACE_H\n\
         #define MYPROJ_TRACE_H\n\
         \n\
         TURF_TRACE_DECLARE(Foo, 2)\n\
         \n\
         inline void a() {\n\
         \x20   TURF_TRACE(Foo, 0, \"first thing\")\n\
         \x20   TURF_TRACE(Foo, 1, \"second thing\")\n\
         }\n\
         \n\
         #endif // MYPROJ_TRACE_H\n"
    );
    assert_eq!(
        fs::read_to_string(root.join("trace.cpp")).unwrap(),
        "#include \"trace.h\"\n\
         \n\
         TURF_TRACE_DEFINE_BEGIN(Foo, 2) // autogenerated by srctidy\n\
         TURF_TRACE_DEFINE(\"first thing\")\n\
         TURF_TRACE_DEFINE(\"second thing\")\n\
         TURF_TRACE_DEFINE_END(Foo, 2)\n"
    );
}

#[test]
fn test_write_is_idempotent() {
    let (_dir, root) = setup_root();
    write_trace_fixture(&root);
    fs::write(
        root.join("Bar.h"),
        "#ifndef WRONG\n#define WRONG\n\nvoid f();\n\n#endif // WRONG\n",
    )
    .unwrap();

    let (_, first) = run_sweep(&root, Mode::Write, None);
    assert!(!first.changes.is_empty());

    let (_, second) = run_sweep(&root, Mode::Write, None);
    assert!(second.changes.is_empty());

    let (report_sweeper, _) = run_sweep(&root, Mode::Report, None);
    assert!(report_text(&report_sweeper).contains("Code is already tidy."));
}

#[test]
fn test_preamble_oddball_reported_but_never_fixed() {
    let (_dir, root) = setup_root();
    let banner = "/*------------------------------------------------------------------------\n\
                  \x20 myproj: demo\n\
                  ------------------------------------------------------------------------*/\n\
                  \n";
    fs::write(root.join("x.cpp"), format!("{banner}int x;\n")).unwrap();
    fs::write(root.join("y.cpp"), format!("{banner}int y;\n")).unwrap();
    fs::write(root.join("z.cpp"), "int z;\n").unwrap();

    let (sweeper, outcome) = run_sweep(&root, Mode::Preview, None);
    let report = report_text(&sweeper);
    assert!(report.contains("inconsistent preambles"));
    assert!(report.contains("z.cpp"));
    // Preamble repair is intentionally disabled.
    assert!(outcome.changes.is_empty());
}

#[test]
fn test_trace_diagnostics_reported_once_across_passes() {
    let (_dir, root) = setup_root();
    fs::write(root.join("bad.cpp"), "TURF_TRACE(Foo, 0, \"orphan\")\n").unwrap();

    let (sweeper, _) = run_sweep(&root, Mode::Write, None);
    let diags = sweeper.diagnostics();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].line, 0);
    assert!(diags[0].message.contains("category not declared"));
}

#[test]
fn test_sweep_continues_past_build_dirs() {
    let (_dir, root) = setup_root();
    fs::create_dir(root.join("build")).unwrap();
    fs::write(root.join("build/gen.h"), "#define X\n").unwrap();
    fs::write(root.join("a.cpp"), "int a;\n").unwrap();

    let (sweeper, outcome) = run_sweep(&root, Mode::Report, None);
    assert_eq!(outcome.files_scanned, 1);
    assert!(report_text(&sweeper).contains("Code is already tidy."));
}
