use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use srctidy::{Mode, SweepOptions, Sweeper};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "srctidy")]
#[command(about = "Source-tree consistency checker and fixer for C/C++ house style", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory roots to sweep
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Preview changes as a unified diff without writing
    #[arg(short, long, conflicts_with = "write")]
    preview: bool,

    /// Write changes to files, overwriting previous contents
    #[arg(short, long)]
    write: bool,

    /// Expect Unix line endings '\n' (autodetect otherwise)
    #[arg(long, conflicts_with = "windows")]
    unix: bool,

    /// Expect Windows line endings '\r\n'
    #[arg(long)]
    windows: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mode = if cli.write {
        Mode::Write
    } else if cli.preview {
        Mode::Preview
    } else {
        Mode::Report
    };
    let line_ending = if cli.unix {
        Some("\n".to_string())
    } else if cli.windows {
        Some("\r\n".to_string())
    } else {
        None
    };

    let mut failures = 0usize;
    for root in &cli.paths {
        let options = SweepOptions {
            mode,
            line_ending: line_ending.clone(),
        };
        let mut sweeper = Sweeper::new(root, options)?;
        let outcome = sweeper.run()?;

        match mode {
            Mode::Report => {
                let stdout = io::stdout();
                sweeper.write_report(&mut stdout.lock())?;
            }
            Mode::Preview => {
                for change in &outcome.changes {
                    println!();
                    println!(
                        "{}",
                        format!("Changes for: {}", change.path.display()).bold()
                    );
                    display_diff(&change.path, &change.before, &change.after);
                }
            }
            Mode::Write => {
                for change in &outcome.changes {
                    println!("Writing changes to: {}", change.path.display());
                }
            }
        }

        for diag in sweeper.diagnostics() {
            eprintln!("{}", diag.to_string().yellow());
        }
        for (path, error) in sweeper.io_failures() {
            eprintln!("{}", format!("{}: {}", path.display(), error).red());
            failures += 1;
        }
    }

    if failures > 0 {
        std::process::exit(1);
    }
    Ok(())
}

/// Show a unified diff between original and rewritten content, changed
/// lines only.
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (tidied)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => continue,
        };
        print!("{}", sign);
    }
}
