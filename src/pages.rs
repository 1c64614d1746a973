//! Shape checks for whole (non-streamed) generations
//!
//! Streamed output goes through [`crate::segment`]. When a generation is
//! received in one piece, these helpers split it into pages or list items and
//! reject responses whose structure does not match what was asked for.

/// What kind of structure a [`ShapeError`] refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    /// Pages separated by marker lines
    Pages,
    /// Markdown list items
    ListItems,
}

impl std::fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShapeKind::Pages => write!(f, "pages"),
            ShapeKind::ListItems => write!(f, "list items"),
        }
    }
}

/// Upstream text did not have the expected structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeError {
    /// What was being counted
    pub kind: ShapeKind,
    /// How many were required
    pub expected: usize,
    /// How many were found
    pub found: usize,
}

impl ShapeError {
    pub fn new(kind: ShapeKind, expected: usize, found: usize) -> Self {
        Self {
            kind,
            expected,
            found,
        }
    }
}

impl std::fmt::Display for ShapeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Malformed upstream response: expected {} {}, found {}",
            self.expected, self.kind, self.found
        )
    }
}

impl std::error::Error for ShapeError {}

/// Check whether `line` (without its line break) is a page marker line
///
/// A marker line starts with `marker` and carries nothing but whitespace
/// after it.
pub fn is_marker_line(line: &str, marker: &str) -> bool {
    line.strip_prefix(marker)
        .map(|rest| rest.trim().is_empty())
        .unwrap_or(false)
}

/// Check whether `line` is a marker line behind one or more backslashes
pub fn is_escaped_marker_line(line: &str, marker: &str) -> bool {
    let mut rest = line;
    while let Some(inner) = rest.strip_prefix('\\') {
        if is_marker_line(inner, marker) {
            return true;
        }
        rest = inner;
    }
    false
}

/// Append `text` to `out`, escaping lines that would read as page markers
///
/// Marker lines (and already escaped ones) gain one leading backslash, which
/// [`split_pages`] strips again. `text` must start at a line boundary.
pub fn push_escaped(out: &mut String, text: &str, marker: &str) {
    for line in text.split_inclusive('\n') {
        let bare = line.trim_end_matches(['\n', '\r']);
        if is_marker_line(bare, marker) || is_escaped_marker_line(bare, marker) {
            out.push('\\');
        }
        out.push_str(line);
    }
}

/// Split a whole response into trimmed, non-empty pages
///
/// A backslash-escaped marker line is page text, with one backslash removed.
/// Fails if fewer than `min_pages` pages remain.
pub fn split_pages(text: &str, marker: &str, min_pages: usize) -> Result<Vec<String>, ShapeError> {
    let mut pages = Vec::new();
    let mut current = String::new();

    for line in text.split_inclusive('\n') {
        let bare = line.trim_end_matches(['\n', '\r']);
        if is_marker_line(bare, marker) {
            push_page(&mut pages, &current);
            current.clear();
        } else if is_escaped_marker_line(bare, marker) {
            current.push_str(&line[1..]);
        } else {
            current.push_str(line);
        }
    }
    push_page(&mut pages, &current);

    if pages.len() < min_pages {
        return Err(ShapeError::new(ShapeKind::Pages, min_pages, pages.len()));
    }

    Ok(pages)
}

fn push_page(pages: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        pages.push(trimmed.to_string());
    }
}

/// Extract Markdown list items (`- item` or `1. item`)
///
/// Items are trimmed and empty ones skipped. Fails unless exactly
/// `expected` items are found.
pub fn parse_list_items(text: &str, expected: usize) -> Result<Vec<String>, ShapeError> {
    let items: Vec<String> = text
        .lines()
        .filter_map(list_item_body)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if items.len() != expected {
        return Err(ShapeError::new(ShapeKind::ListItems, expected, items.len()));
    }

    Ok(items)
}

fn list_item_body(line: &str) -> Option<&str> {
    if let Some(rest) = line.strip_prefix('-') {
        return Some(rest);
    }

    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    line[digits..].strip_prefix('.')
}
