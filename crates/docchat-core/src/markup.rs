//! Per-line classification of assistant replies.
//!
//! This is a heuristic, not a markdown parser: only the start of each line is
//! inspected, and nested or repeated markers are left as they are.

const BOLD_MARKER: &str = "**";
const BULLET_MARKERS: [&str; 3] = ["- ", "* ", "• "];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// Emphasized line, marker stripped
    Bold(&'a str),
    /// List item, marker stripped
    Bullet(&'a str),
    Plain(&'a str),
}

pub fn classify_line(line: &str) -> LineKind<'_> {
    let trimmed = line.trim_start();

    if let Some(rest) = trimmed.strip_prefix(BOLD_MARKER) {
        let rest = rest.trim_end();
        let rest = rest.strip_suffix(BOLD_MARKER).unwrap_or(rest);
        return LineKind::Bold(rest);
    }

    for marker in BULLET_MARKERS {
        if let Some(rest) = trimmed.strip_prefix(marker) {
            return LineKind::Bullet(rest.trim_start());
        }
    }

    LineKind::Plain(line)
}
