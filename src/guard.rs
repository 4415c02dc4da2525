//! Include-guard derivation and reconciliation.
//!
//! The canonical guard token is a pure function of the project name and the
//! file's path relative to the sweep root. Headers are checked for the
//! `#ifndef` / `#define` / `#endif // GUARD` triple immediately after the
//! preamble; a mismatched triple is rebuilt on repair, except for headers
//! that intentionally open with a bare `#define`.

use crate::lines::Line;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GuardError {
    #[error("path {path} is not under root {root}")]
    PathMismatch { path: PathBuf, root: PathBuf },
}

static RE_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").unwrap());

static RE_GUARD_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*#\s*(define|ifndef)\s*(.+)$").unwrap());

static RE_ENDIF: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*#\s*endif\s*(.+)$").unwrap());

/// Derive the canonical include-guard token for a file.
///
/// The root prefix is stripped from the path, the project name is prepended,
/// every maximal run of word characters is extracted, and the runs are
/// joined with underscores and uppercased. Same inputs, same token.
pub fn derive_guard(project: &str, root: &Path, path: &Path) -> Result<String, GuardError> {
    let rel = path
        .strip_prefix(root)
        .map_err(|_| GuardError::PathMismatch {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
        })?;
    let raw = format!("{}/{}", project, rel.display());
    let words: Vec<&str> = RE_WORD.find_iter(&raw).map(|m| m.as_str()).collect();
    Ok(words.join("_").to_uppercase())
}

/// The guard triple discovered in a header, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardParse {
    pub ifndef: Option<String>,
    pub define: Option<String>,
    /// Trailing text of the closing `#endif`, expected to be `// GUARD`.
    pub endif_comment: Option<String>,
    /// Guarded body, excluding the `#endif` line and surrounding blanks.
    pub body: Range<usize>,
}

impl GuardParse {
    /// Headers that open with a raw `#define` (no `#ifndef`) are a
    /// recognized alternate pattern and are never rewritten.
    pub fn is_bare_define(&self) -> bool {
        self.define.is_some() && self.ifndef.is_none()
    }

    /// Whether the discovered triple agrees with the derived guard token.
    pub fn matches(&self, guard: &str) -> bool {
        self.ifndef.as_deref() == Some(guard)
            && self.define.as_deref() == Some(guard)
            && self.endif_comment.as_deref() == Some(format!("// {guard}").as_str())
    }
}

/// Parse the guard triple of a header.
///
/// Forward from the preamble boundary: blank lines are skipped; the scan
/// accepts at most one `#ifndef` and one `#define`, in either order, and
/// stops at the first line that is neither (a repeated directive also
/// stops it). Backward from the end of file: blank lines are skipped and
/// the first non-blank line must be an `#endif` with trailing text.
pub fn parse_guard(lines: &[Line], preamble: usize) -> GuardParse {
    let mut ifndef = None;
    let mut define = None;

    let mut i = preamble.min(lines.len());
    while i < lines.len() {
        let text = &lines[i].text;
        if text.trim().is_empty() {
            i += 1;
            continue;
        }
        let Some(caps) = RE_GUARD_OPEN.captures(text) else {
            break;
        };
        let name = caps[2].to_string();
        match &caps[1] {
            "ifndef" if ifndef.is_none() => ifndef = Some(name),
            "define" if define.is_none() => define = Some(name),
            _ => break,
        }
        i += 1;
    }
    let body_start = i.min(lines.len());

    let mut endif_comment = None;
    let mut body_end = body_start;
    let mut j = lines.len();
    while j > body_start {
        j -= 1;
        let text = &lines[j].text;
        if text.trim().is_empty() {
            continue;
        }
        if endif_comment.is_none() {
            match RE_ENDIF.captures(text) {
                Some(caps) => endif_comment = Some(caps[1].to_string()),
                None => {
                    // No parsable #endif; the line is body content.
                    body_end = j + 1;
                    break;
                }
            }
        } else {
            body_end = j + 1;
            break;
        }
    }

    GuardParse {
        ifndef,
        define,
        endif_comment,
        body: body_start..body_end,
    }
}

/// Rebuild the guard triple around the parsed body.
///
/// Everything from the preamble boundary onward is replaced with
/// `#ifndef` / `#define`, a blank line, the original body, a blank line,
/// and `#endif // GUARD`.
pub fn rebuild_guard(
    lines: &[Line],
    preamble: usize,
    parse: &GuardParse,
    guard: &str,
    ending: &str,
) -> Vec<Line> {
    let mut out: Vec<Line> = lines[..preamble.min(lines.len())].to_vec();
    out.push(Line::new(format!("#ifndef {guard}"), ending));
    out.push(Line::new(format!("#define {guard}"), ending));
    out.push(Line::new("", ending));
    out.extend_from_slice(&lines[parse.body.clone()]);
    out.push(Line::new("", ending));
    out.push(Line::new(format!("#endif // {guard}"), ending));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lines::{join_lines, split_lines};
    use proptest::prelude::*;

    #[test]
    fn test_derive_guard_from_path() {
        let guard = derive_guard("myproj", Path::new("include"), Path::new("include/foo/Bar.h"))
            .unwrap();
        assert_eq!(guard, "MYPROJ_FOO_BAR_H");
    }

    #[test]
    fn test_derive_guard_path_outside_root() {
        let err = derive_guard("p", Path::new("/a/b"), Path::new("/c/d.h")).unwrap_err();
        assert!(matches!(err, GuardError::PathMismatch { .. }));
    }

    #[test]
    fn test_parse_well_formed_guard() {
        let lines = split_lines("#ifndef G\n#define G\n\nint x;\n\n#endif // G\n");
        let parse = parse_guard(&lines, 0);
        assert_eq!(parse.ifndef.as_deref(), Some("G"));
        assert_eq!(parse.define.as_deref(), Some("G"));
        assert_eq!(parse.endif_comment.as_deref(), Some("// G"));
        assert_eq!(parse.body, 3..4);
        assert!(parse.matches("G"));
        assert!(!parse.matches("OTHER"));
    }

    #[test]
    fn test_parse_missing_endif_comment() {
        // Bare "#endif" carries no trailing text and does not parse.
        let lines = split_lines("#ifndef G\n#define G\nint x;\n#endif\n");
        let parse = parse_guard(&lines, 0);
        assert_eq!(parse.endif_comment, None);
        assert!(!parse.matches("G"));
    }

    #[test]
    fn test_parse_repeated_directive_stops_scan() {
        let lines = split_lines("#ifndef A\n#ifndef B\nint x;\n#endif // A\n");
        let parse = parse_guard(&lines, 0);
        assert_eq!(parse.ifndef.as_deref(), Some("A"));
        assert_eq!(parse.define, None);
        // Scan stopped at the second #ifndef, which becomes body content.
        assert_eq!(parse.body.start, 1);
    }

    #[test]
    fn test_bare_define_detected() {
        let lines = split_lines("#define G\nint x;\n#endif // G\n");
        let parse = parse_guard(&lines, 0);
        assert!(parse.is_bare_define());
    }

    #[test]
    fn test_rebuild_guard() {
        let lines = split_lines("#ifndef OLD\n#define OLD\n\nint x;\n\n#endif // OLD\n");
        let parse = parse_guard(&lines, 0);
        let rebuilt = rebuild_guard(&lines, 0, &parse, "NEW", "\n");
        assert_eq!(
            join_lines(&rebuilt),
            "#ifndef NEW\n#define NEW\n\nint x;\n\n#endif // NEW\n"
        );
    }

    #[test]
    fn test_rebuild_drops_content_after_endif() {
        let lines = split_lines("#ifndef OLD\n#define OLD\nint x;\n#endif // OLD\n\n\n");
        let parse = parse_guard(&lines, 0);
        let rebuilt = rebuild_guard(&lines, 0, &parse, "NEW", "\n");
        assert_eq!(
            join_lines(&rebuilt),
            "#ifndef NEW\n#define NEW\n\nint x;\n\n#endif // NEW\n"
        );
    }

    #[test]
    fn test_rebuild_keeps_preamble() {
        let content = "/*---\nbanner\n-----*/\n\n#ifndef OLD\n#define OLD\nint x;\n#endif // OLD\n";
        let lines = split_lines(content);
        let preamble = crate::preamble::preamble_len(&lines);
        assert_eq!(preamble, 4);
        let parse = parse_guard(&lines, preamble);
        let rebuilt = rebuild_guard(&lines, preamble, &parse, "NEW", "\n");
        let out = join_lines(&rebuilt);
        assert!(out.starts_with("/*---\nbanner\n-----*/\n\n#ifndef NEW\n"));
    }

    proptest! {
        /// Guard derivation is pure and produces only [A-Z0-9_].
        #[test]
        fn prop_guard_token_charset(name in "[a-zA-Z0-9_./-]{1,30}") {
            let root = Path::new("root");
            let path = PathBuf::from("root").join(&name);
            if let Ok(guard) = derive_guard("proj", root, &path) {
                let again = derive_guard("proj", root, &path).unwrap();
                prop_assert_eq!(&guard, &again);
                prop_assert!(guard
                    .chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_'));
            }
        }
    }
}
