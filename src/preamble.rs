//! Banner preamble boundary detection.
//!
//! Preamble content is tracked for consistency reporting only; it is never
//! rewritten automatically.

use crate::lines::Line;

/// How many leading lines are searched for the banner closer.
pub const PREAMBLE_WINDOW: usize = 25;

/// Closing marker of a banner comment block.
const BANNER_CLOSE: &str = "-----*/";

/// Length of the leading banner preamble, in lines.
///
/// Scans the first [`PREAMBLE_WINDOW`] lines for the closing marker; the
/// preamble spans through two lines past the marker. Zero when no marker is
/// found in the window.
pub fn preamble_len(lines: &[Line]) -> usize {
    let limit = lines.len().min(PREAMBLE_WINDOW);
    for (i, line) in lines.iter().take(limit).enumerate() {
        if line.text.contains(BANNER_CLOSE) {
            return (i + 2).min(lines.len());
        }
    }
    0
}

/// Preamble payload used for cross-file consensus, terminators excluded.
pub fn preamble_text(lines: &[Line], len: usize) -> String {
    lines[..len.min(lines.len())]
        .iter()
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
