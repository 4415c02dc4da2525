//! Terminator-preserving line representation.
//!
//! Every rule in the sweep operates on the same line-boundary view of a
//! file: a text payload plus the exact terminator sequence it carried. The
//! split is lossless; [`join_lines`] reproduces the input byte for byte.

/// One line of a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// Payload without any trailing `\r` or `\n` characters.
    pub text: String,
    /// The terminator sequence as found. Empty only on a final line that
    /// ends without one.
    pub ending: String,
}

impl Line {
    pub fn new(text: impl Into<String>, ending: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ending: ending.into(),
        }
    }
}

/// Split file content into lines, preserving each line's terminator.
///
/// A segment ends at every `\n`; the terminator is the maximal trailing run
/// of `\r`/`\n` characters. Content after the last `\n` becomes a final line
/// with an empty terminator.
pub fn split_lines(content: &str) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut start = 0;
    for (i, b) in content.bytes().enumerate() {
        if b == b'\n' {
            lines.push(to_line(&content[start..=i]));
            start = i + 1;
        }
    }
    if start < content.len() {
        lines.push(to_line(&content[start..]));
    }
    lines
}

fn to_line(segment: &str) -> Line {
    let text = segment.trim_end_matches(|c| c == '\r' || c == '\n');
    Line::new(text, &segment[text.len()..])
}

/// Reassemble lines into file content.
pub fn join_lines(lines: &[Line]) -> String {
    let mut out = String::with_capacity(lines.iter().map(|l| l.text.len() + l.ending.len()).sum());
    for line in lines {
        out.push_str(&line.text);
        out.push_str(&line.ending);
    }
    out
}
