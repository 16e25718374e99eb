//! Per-pass emission state and escaping helpers.

use std::fmt::Write;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use pulldown_cmark::{Alignment, HeadingLevel};

/// Bytes percent-encoded inside `href`/`src` values. `%` stays so that
/// already-encoded URLs are not double-encoded.
const HREF_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'|')
    .add(b'\\')
    .add(b'^');

/// State for tracking code block rendering.
#[derive(Default)]
pub(crate) struct CodeBlockState {
    active: bool,
    buffer: String,
}

impl CodeBlockState {
    pub(crate) fn start(&mut self) {
        self.active = true;
        self.buffer.clear();
    }

    /// End the current code block and return its content.
    pub(crate) fn end(&mut self) -> String {
        self.active = false;
        std::mem::take(&mut self.buffer)
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn push_str(&mut self, text: &str) {
        self.buffer.push_str(text);
    }
}

/// State for tracking table rendering.
#[derive(Default)]
pub(crate) struct TableState {
    in_head: bool,
    alignments: Vec<Alignment>,
    cell_index: usize,
}

impl TableState {
    pub(crate) fn start(&mut self, alignments: Vec<Alignment>) {
        self.alignments = alignments;
        self.in_head = false;
        self.cell_index = 0;
    }

    pub(crate) fn start_head(&mut self) {
        self.in_head = true;
        self.cell_index = 0;
    }

    pub(crate) fn end_head(&mut self) {
        self.in_head = false;
    }

    pub(crate) fn start_row(&mut self) {
        self.cell_index = 0;
    }

    pub(crate) fn next_cell(&mut self) {
        self.cell_index += 1;
    }

    pub(crate) fn is_in_head(&self) -> bool {
        self.in_head
    }

    /// `align` attribute for the current cell, including the leading space.
    pub(crate) fn current_alignment_attr(&self) -> &'static str {
        match self.alignments.get(self.cell_index) {
            Some(Alignment::Left) => r#" align="left""#,
            Some(Alignment::Center) => r#" align="center""#,
            Some(Alignment::Right) => r#" align="right""#,
            Some(Alignment::None) | None => "",
        }
    }
}

/// State for tracking image alt text capture.
///
/// Images can nest inside image descriptions, so capture is depth-counted.
#[derive(Default)]
pub(crate) struct ImageState {
    depth: usize,
    alt_text: String,
}

impl ImageState {
    /// Start capturing. Returns `true` for the outermost image.
    pub(crate) fn start(&mut self) -> bool {
        self.depth += 1;
        if self.depth == 1 {
            self.alt_text.clear();
            true
        } else {
            false
        }
    }

    /// Finish capturing. Returns the alt text when the outermost image closes.
    pub(crate) fn end(&mut self) -> Option<String> {
        self.depth = self.depth.saturating_sub(1);
        (self.depth == 0).then(|| std::mem::take(&mut self.alt_text))
    }

    pub(crate) fn is_active(&self) -> bool {
        self.depth > 0
    }

    pub(crate) fn push_str(&mut self, text: &str) {
        self.alt_text.push_str(text);
    }
}

/// Heading counter shared by the TOC and main passes.
///
/// Both passes walk the same document, so the n-th heading gets the same
/// anchor in each.
#[derive(Default)]
pub(crate) struct HeadingCounter {
    next: usize,
}

impl HeadingCounter {
    /// Claim the index of the next heading.
    pub(crate) fn next_index(&mut self) -> usize {
        let index = self.next;
        self.next += 1;
        index
    }

    pub(crate) fn count(&self) -> usize {
        self.next
    }
}

/// Convert heading level enum to number (1-6).
pub(crate) fn heading_level_to_num(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Write the anchor id of the heading at `index`, unescaped.
pub(crate) fn write_toc_anchor(prefix: Option<&str>, index: usize, out: &mut String) {
    if let Some(prefix) = prefix {
        escape_html_into(prefix, out);
    }
    write!(out, "toc_{index}").unwrap();
}

/// Escape HTML special characters into an existing buffer.
pub(crate) fn escape_html_into(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}

/// Escape a URL for use inside a double-quoted `href` or `src`.
pub(crate) fn escape_href_into(url: &str, out: &mut String) {
    for chunk in utf8_percent_encode(url, HREF_ENCODE_SET) {
        for c in chunk.chars() {
            match c {
                '&' => out.push_str("&amp;"),
                '\'' => out.push_str("&#x27;"),
                _ => out.push(c),
            }
        }
    }
}
