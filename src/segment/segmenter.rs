//! Incremental page segmentation
//!
//! [`Segmenter`] is a synchronous state machine fed one raw chunk at a time.
//! It goes through two phases:
//!
//! 1. **Header**: raw text is buffered until the configured anchor has been
//!    seen and real content follows it. The header, the anchor and any
//!    whitespace or marker lines after it are dropped.
//! 2. **Body**: text is classified line by line. A line holding only the
//!    marker becomes a page separator, unless the current page has no content
//!    yet (the marker is then a duplicate and is dropped) or the separator
//!    budget is spent (the marker is then kept as text).
//!
//! A line is never classified before its line break (or the end of the
//! stream) has been seen if it could still turn out to be a marker. The line
//! break in front of a marker belongs to the marker, so text that ends in an
//! undecided line break is held back together with that line. Whitespace at
//! either end of a page is dropped. The text between separators therefore
//! does not depend on how the input was chunked; only fragment boundaries do.

use crate::pages::{is_marker_line, ShapeError, ShapeKind};
use crate::registry::Fragment;

use super::config::SegmenterConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Header,
    Body,
}

/// Page segmentation state machine
#[derive(Debug)]
pub struct Segmenter {
    config: SegmenterConfig,
    phase: Phase,

    /// Raw text buffered while looking for the header anchor
    header_buf: String,

    /// Start of the current line, not yet classified
    line: String,

    /// The current line has been classified as text
    mid_line: bool,

    /// Classified text not yet emitted
    held: String,

    /// Offset in `held` where the last text line starts
    line_start: usize,

    /// A line break after the last text line awaits the next line
    break_pending: bool,

    /// Non-whitespace text seen since the last separator
    page_has_content: bool,

    /// Separators emitted so far
    separators: usize,
}

impl Segmenter {
    /// Create a segmenter
    pub fn new(config: SegmenterConfig) -> Self {
        let phase = if config.header_anchor.is_some() {
            Phase::Header
        } else {
            Phase::Body
        };

        Self {
            config,
            phase,
            header_buf: String::new(),
            line: String::new(),
            mid_line: false,
            held: String::new(),
            line_start: 0,
            break_pending: false,
            page_has_content: false,
            separators: 0,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Check if header suppression is still active
    pub fn in_header(&self) -> bool {
        self.phase == Phase::Header
    }

    /// Separators emitted so far
    pub fn separators(&self) -> usize {
        self.separators
    }

    /// Pages seen so far (a page counts once it has content)
    pub fn page_count(&self) -> usize {
        self.separators + usize::from(self.page_has_content)
    }

    /// Feed one raw chunk, returning the fragments it completes
    pub fn push(&mut self, chunk: &str) -> Vec<Fragment> {
        let mut out = Vec::new();

        match self.phase {
            Phase::Header => {
                self.header_buf.push_str(chunk);

                if let Some(body_start) = self.find_body_start() {
                    tracing::debug!(header_bytes = body_start, "Header suppressed");
                    let body = self.header_buf.split_off(body_start);
                    self.header_buf.clear();
                    self.phase = Phase::Body;
                    self.feed(&body, &mut out);
                } else if self.header_buf.len() > self.config.max_header_len {
                    if self.anchor_end(&self.header_buf).is_none() {
                        tracing::warn!(
                            buffered = self.header_buf.len(),
                            limit = self.config.max_header_len,
                            "Header anchor not found, treating buffered text as body"
                        );
                    }
                    self.abandon_header(&mut out);
                }
            }
            Phase::Body => self.feed(chunk, &mut out),
        }

        self.flush_ready(&mut out);
        out
    }

    /// Flush everything held back once the source has ended
    pub fn finish(&mut self) -> Vec<Fragment> {
        let mut out = Vec::new();

        if self.phase == Phase::Header {
            if self.anchor_end(&self.header_buf).is_some() {
                // Header arrived but nothing after it
                self.header_buf.clear();
                self.phase = Phase::Body;
            } else {
                tracing::warn!(
                    buffered = self.header_buf.len(),
                    "Stream ended before header anchor, treating buffered text as body"
                );
                self.abandon_header(&mut out);
            }
        }

        if !self.line.is_empty() {
            let line = std::mem::take(&mut self.line);
            self.on_line(&line, false, &mut out);
        }

        if self.page_has_content {
            let mut text = std::mem::take(&mut self.held);
            if self.break_pending {
                text.push('\n');
            }
            if !text.is_empty() {
                out.push(Fragment::text(text));
            }
        }
        self.held.clear();
        self.line_start = 0;
        self.break_pending = false;

        out
    }

    /// Check the page count after [`finish`](Self::finish)
    pub fn check_page_count(&self) -> Result<(), ShapeError> {
        let found = self.page_count();
        if self.config.require_page_count && found < self.config.expected_pages {
            return Err(ShapeError::new(
                ShapeKind::Pages,
                self.config.expected_pages,
                found,
            ));
        }
        Ok(())
    }

    /// Locate the first body byte after the header anchor
    ///
    /// None while the anchor has not been seen or nothing but whitespace and
    /// markers (complete or partial) follows it.
    fn find_body_start(&self) -> Option<usize> {
        let buf = self.header_buf.as_str();
        let mut pos = self.anchor_end(buf)?;

        loop {
            let rest = &buf[pos..];
            let trimmed = rest.trim_start();
            pos += rest.len() - trimmed.len();

            if trimmed.is_empty() {
                return None;
            }

            match trimmed.find('\n') {
                Some(nl) if is_marker_line(&trimmed[..nl], &self.config.marker) => {
                    pos += nl + 1;
                }
                None if could_be_marker(trimmed, &self.config.marker) => return None,
                _ => return Some(pos),
            }
        }
    }

    /// End of the header anchor in `buf`, once it has been seen
    fn anchor_end(&self, buf: &str) -> Option<usize> {
        let anchor = self.config.header_anchor.as_deref()?;
        buf.find(anchor).map(|start| start + anchor.len())
    }

    /// Leave the header phase without having found content after the anchor
    ///
    /// Text up to a seen anchor is still dropped; without an anchor the whole
    /// buffer becomes body.
    fn abandon_header(&mut self, out: &mut Vec<Fragment>) {
        let mut buffered = std::mem::take(&mut self.header_buf);

        if let Some(end) = self.anchor_end(&buffered) {
            tracing::debug!(
                header_bytes = end,
                buffered = buffered.len(),
                "Header suppressed before any content"
            );
            buffered.drain(..end);
        }

        self.phase = Phase::Body;
        self.feed(&buffered, out);
    }

    fn feed(&mut self, text: &str, out: &mut Vec<Fragment>) {
        let mut rest = text;

        while !rest.is_empty() {
            if self.mid_line {
                match rest.find('\n') {
                    Some(nl) => {
                        self.on_text(&rest[..nl]);
                        self.on_line_end();
                        self.mid_line = false;
                        rest = &rest[nl + 1..];
                    }
                    None => {
                        self.on_text(rest);
                        rest = "";
                    }
                }
                continue;
            }

            match rest.find('\n') {
                Some(nl) => {
                    self.line.push_str(&rest[..nl]);
                    let line = std::mem::take(&mut self.line);
                    self.on_line(&line, true, out);
                    rest = &rest[nl + 1..];
                }
                None => {
                    self.line.push_str(rest);
                    rest = "";

                    if !could_be_marker(&self.line, &self.config.marker) {
                        let line = std::mem::take(&mut self.line);
                        self.mid_line = true;
                        self.on_text(&line);
                    }
                }
            }
        }
    }

    /// Handle a complete line (`terminated` is false for a final line
    /// without a line break)
    fn on_line(&mut self, line: &str, terminated: bool, out: &mut Vec<Fragment>) {
        if is_marker_line(line, &self.config.marker) {
            if !self.page_has_content {
                tracing::trace!(separators = self.separators, "Dropping duplicate marker");
                return;
            }
            if self.separators < self.config.separator_budget() {
                self.emit_separator(out);
                return;
            }
        }

        self.on_text(line);
        if terminated {
            self.on_line_end();
        }
    }

    fn on_text(&mut self, text: &str) {
        if !self.page_has_content {
            let trimmed = text.trim_start();
            if trimmed.is_empty() {
                return;
            }
            self.page_has_content = true;
            self.line_start = self.held.len();
            self.held.push_str(trimmed);
            return;
        }

        if self.break_pending {
            self.held.push('\n');
            self.line_start = self.held.len();
            self.break_pending = false;
        }
        self.held.push_str(text);
    }

    fn on_line_end(&mut self) {
        if self.page_has_content {
            self.break_pending = true;
        }
    }

    fn emit_separator(&mut self, out: &mut Vec<Fragment>) {
        let text = self.held.trim_end();
        if !text.is_empty() {
            out.push(Fragment::text(text));
        }
        self.held.clear();
        self.line_start = 0;
        self.break_pending = false;
        self.page_has_content = false;

        out.push(Fragment::Separator);
        self.separators += 1;
    }

    /// Emit whatever held text is already final
    ///
    /// Trailing whitespace stays held (it is dropped if a separator follows),
    /// and so does a text line whose line break is still undecided.
    fn flush_ready(&mut self, out: &mut Vec<Fragment>) {
        let limit = if self.break_pending {
            self.line_start
        } else {
            self.held.len()
        };
        let ready = self.held[..limit].trim_end().len();

        if ready > 0 {
            out.push(Fragment::text(&self.held[..ready]));
            self.held.drain(..ready);
            self.line_start = self.line_start.saturating_sub(ready);
        }
    }
}

/// Check if `partial` (an unterminated line) may still become a marker line
fn could_be_marker(partial: &str, marker: &str) -> bool {
    if partial.len() < marker.len() {
        marker.starts_with(partial)
    } else {
        is_marker_line(partial, marker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(config: SegmenterConfig, chunks: &[&str]) -> Vec<Fragment> {
        let mut segmenter = Segmenter::new(config);
        let mut out = Vec::new();
        for chunk in chunks {
            out.extend(segmenter.push(chunk));
        }
        out.extend(segmenter.finish());
        out
    }

    /// Merge adjacent text fragments so outputs can be compared regardless
    /// of fragment boundaries
    fn merged(fragments: &[Fragment]) -> Vec<Fragment> {
        let mut out: Vec<Fragment> = Vec::new();
        for fragment in fragments {
            match (out.last_mut(), fragment) {
                (Some(Fragment::Text(prev)), Fragment::Text(next)) => {
                    *prev = format!("{}{}", prev, next).into();
                }
                _ => out.push(fragment.clone()),
            }
        }
        out
    }

    fn lenient() -> SegmenterConfig {
        SegmenterConfig::default().require_page_count(false)
    }

    #[test]
    fn test_header_scenario() {
        let chunks = [
            "# Header\n",
            "...*Network*\n",
            "---\nPage2 body",
            " more.\n---\n",
            "Page3 body.\n",
        ];
        let config = SegmenterConfig::with_header_anchor("*Network*");
        let mut segmenter = Segmenter::new(config);

        let mut out = Vec::new();
        for chunk in chunks {
            out.extend(segmenter.push(chunk));
        }
        out.extend(segmenter.finish());

        assert_eq!(
            out,
            vec![
                Fragment::text("Page2 body"),
                Fragment::text(" more."),
                Fragment::Separator,
                Fragment::text("Page3 body.\n"),
            ]
        );

        // Two pages against the default expectation of three
        assert_eq!(segmenter.page_count(), 2);
        let err = segmenter.check_page_count().unwrap_err();
        assert_eq!(err, ShapeError::new(ShapeKind::Pages, 3, 2));
    }

    #[test]
    fn test_header_scenario_with_matching_page_count() {
        let config = SegmenterConfig::with_header_anchor("*Network*").expected_pages(2);
        let mut segmenter = Segmenter::new(config);
        for chunk in ["# Header\n", "...*Network*\n", "---\nPage2 body", " more.\n---\n"] {
            segmenter.push(chunk);
        }
        segmenter.push("Page3 body.\n");
        segmenter.finish();

        assert!(segmenter.check_page_count().is_ok());
    }

    #[test]
    fn test_header_is_buffered_until_content() {
        let mut segmenter = Segmenter::new(SegmenterConfig::with_header_anchor("*Network*"));

        assert!(segmenter.push("# The Gazette\n*Net").is_empty());
        assert!(segmenter.push("work*\n\n").is_empty());
        assert!(segmenter.push("--").is_empty());
        assert!(segmenter.in_header());
        assert!(segmenter.push("-\n  \n---\n").is_empty());

        let out = segmenter.push("# Page 2");
        assert_eq!(out, vec![Fragment::text("# Page 2")]);
        assert!(!segmenter.in_header());
    }

    #[test]
    fn test_header_anchor_never_seen_falls_back_to_body() {
        let out = run(
            SegmenterConfig::with_header_anchor("*Network*").require_page_count(false),
            &["no header here\n", "---\nsecond"],
        );

        assert_eq!(
            merged(&out),
            vec![
                Fragment::text("no header here"),
                Fragment::Separator,
                Fragment::text("second"),
            ]
        );
    }

    #[test]
    fn test_header_limit_falls_back_to_body() {
        let mut segmenter = Segmenter::new(
            SegmenterConfig::with_header_anchor("*Network*").max_header_len(8),
        );

        assert!(segmenter.push("abc").is_empty());
        let out = segmenter.push("defghij");
        assert_eq!(out, vec![Fragment::text("abcdefghij")]);
        assert!(!segmenter.in_header());
    }

    #[test]
    fn test_header_limit_after_anchor_still_drops_header() {
        let config = SegmenterConfig::with_header_anchor("*Network*")
            .max_header_len(32)
            .require_page_count(false);
        let mut segmenter = Segmenter::new(config);

        assert!(segmenter.push("# The Gazette *Network*\n").is_empty());
        assert!(segmenter.in_header());

        // Over the limit with only markers and blank lines after the anchor
        assert!(segmenter.push("\n---\n   \n---\n").is_empty());
        assert!(!segmenter.in_header());

        let mut out = segmenter.push("First page\n");
        out.extend(segmenter.finish());
        assert_eq!(merged(&out), vec![Fragment::text("First page\n")]);
        assert_eq!(segmenter.separators(), 0);
    }

    #[test]
    fn test_header_without_content_emits_nothing() {
        let out = run(
            SegmenterConfig::with_header_anchor("*Network*").require_page_count(false),
            &["# Header *Network*\n", "---\n"],
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_leading_and_duplicate_markers_collapse() {
        let out = run(
            lenient(),
            &["---\n\n---\nfirst\n---\n   \n---\n---\nsecond\n"],
        );

        assert_eq!(
            out,
            vec![
                Fragment::text("first"),
                Fragment::Separator,
                Fragment::text("second\n"),
            ]
        );
    }

    #[test]
    fn test_markers_past_budget_are_text() {
        let out = run(
            lenient(),
            &["one\n---\ntwo\n---\nthree\n---\nstill three\n"],
        );

        assert_eq!(
            merged(&out),
            vec![
                Fragment::text("one"),
                Fragment::Separator,
                Fragment::text("two"),
                Fragment::Separator,
                Fragment::text("three\n---\nstill three\n"),
            ]
        );
    }

    #[test]
    fn test_separator_count_never_exceeds_budget() {
        let text = "a\n---\nb\n---\nc\n---\nd\n---\ne";
        let out = run(lenient(), &[text]);
        let separators = out.iter().filter(|f| f.is_separator()).count();

        assert_eq!(separators, 2);
    }

    #[test]
    fn test_custom_page_count() {
        let text = "a\n---\nb\n---\nc\n---\nd\n---\ne";
        let mut segmenter = Segmenter::new(SegmenterConfig::default().expected_pages(5));
        segmenter.push(text);
        segmenter.finish();

        assert_eq!(segmenter.separators(), 4);
        assert!(segmenter.check_page_count().is_ok());
    }

    #[test]
    fn test_marker_split_across_chunks_matches_whole() {
        let text = "Page one body.\n---\nPage two\n\n---  \nPage three.\n";
        let whole = run(lenient(), &[text]);

        for (split, _) in text.char_indices().skip(1) {
            let (a, b) = text.split_at(split);
            let out = run(lenient(), &[a, b]);
            assert_eq!(merged(&out), merged(&whole), "split at {}", split);
        }
    }

    #[test]
    fn test_char_by_char_chunks_match_whole() {
        let text = "# Gazette\n*Network*\n---\n\nFoxes win.\nMore foxes.  \n---\r\n\nMoon.\n---\nTails ---\n";
        let config = SegmenterConfig::with_header_anchor("*Network*").require_page_count(false);
        let whole = run(config.clone(), &[text]);

        let chunks: Vec<String> = text.chars().map(String::from).collect();
        let chunk_refs: Vec<&str> = chunks.iter().map(String::as_str).collect();
        let out = run(config, &chunk_refs);

        assert_eq!(merged(&out), merged(&whole));
        assert_eq!(
            merged(&whole),
            vec![
                Fragment::text("Foxes win.\nMore foxes."),
                Fragment::Separator,
                Fragment::text("Moon."),
                Fragment::Separator,
                Fragment::text("Tails ---\n"),
            ]
        );
    }

    #[test]
    fn test_no_adjacent_separators() {
        let out = run(lenient(), &["a\n---\n", "\n", "---\n", "---\n", "b\n---\n---\nc"]);

        for pair in out.windows(2) {
            assert!(!(pair[0].is_separator() && pair[1].is_separator()));
        }
    }

    #[test]
    fn test_partial_marker_is_held_until_refuted() {
        let mut segmenter = Segmenter::new(lenient());

        assert_eq!(segmenter.push("intro"), vec![Fragment::text("intro")]);
        assert!(segmenter.push("\n--").is_empty());
        assert_eq!(
            segmenter.push("x and more"),
            vec![Fragment::text("\n--x and more")]
        );
    }

    #[test]
    fn test_line_ending_chunks_emit_with_one_line_lag() {
        let mut segmenter = Segmenter::new(lenient());

        assert!(segmenter.push("a\n").is_empty());
        assert_eq!(segmenter.push("b\n"), vec![Fragment::text("a")]);
        assert_eq!(segmenter.push("c\n"), vec![Fragment::text("\nb")]);
        assert_eq!(segmenter.finish(), vec![Fragment::text("\nc\n")]);
    }

    #[test]
    fn test_trailing_marker_at_end_of_stream() {
        let out = run(lenient(), &["a\n---\nb\n---"]);

        assert_eq!(
            out,
            vec![
                Fragment::text("a"),
                Fragment::Separator,
                Fragment::text("b"),
                Fragment::Separator,
            ]
        );
    }

    #[test]
    fn test_deterministic() {
        let chunks = ["x\n--", "-\ny", "\n---\n", "z"];
        assert_eq!(run(lenient(), &chunks), run(lenient(), &chunks));
    }
}
