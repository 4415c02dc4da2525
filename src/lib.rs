//! srctidy: source-tree consistency checker and fixer for C/C++ house style.
//!
//! Sweeps a directory tree of `.h`/`.cpp` files and detects (optionally
//! repairs) divergences from a small set of conventions: line endings,
//! banner preambles, include-guard naming, quoting of `#error` messages,
//! and sequential numbering of `TURF_TRACE` statements.
//!
//! # Architecture
//!
//! The engine is a two-pass pipeline. Pass one reads every file and builds
//! cross-file aggregates: majority votes for line endings and preambles
//! ([`consensus::ConsistencyGroup`]) and per-category trace call-site lists
//! ([`trace::TraceBook`]). The aggregates are frozen into a
//! [`sweep::Consensus`] value, which pass two takes as read-only input while
//! rewriting each file. Report mode stops after pass one.
//!
//! # Safety
//!
//! - Report and preview modes never mutate files
//! - Writes are atomic (tempfile + fsync + rename); a file is either fully
//!   rewritten or left untouched
//! - Malformed guards and trace usage are reported, never fatal
//!
//! # Example
//!
//! ```no_run
//! use srctidy::{Mode, SweepOptions, Sweeper};
//!
//! let options = SweepOptions {
//!     mode: Mode::Report,
//!     line_ending: None,
//! };
//! let mut sweeper = Sweeper::new("path/to/project", options)?;
//! let _outcome = sweeper.run()?;
//! sweeper.write_report(&mut std::io::stdout())?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod consensus;
pub mod guard;
pub mod lines;
pub mod preamble;
pub mod quotes;
pub mod sweep;
pub mod trace;

// Re-exports
pub use consensus::{ConsensusError, ConsistencyGroup, OrderedSet};
pub use guard::{derive_guard, GuardError};
pub use lines::{join_lines, split_lines, Line};
pub use sweep::{Consensus, FileChange, Mode, SweepError, SweepOptions, SweepOutcome, Sweeper};
pub use trace::{Diagnostic, TraceBook, TraceSnapshot};
