//! Table-of-contents fragment built from the document's headings.

use pulldown_cmark::{Event, Parser, Tag, TagEnd};

use crate::profile::RenderProfile;
use crate::state::{HeadingCounter, escape_html_into, heading_level_to_num, write_toc_anchor};

/// A heading collected by the TOC pass.
#[derive(Clone, Debug, PartialEq, Eq)]
struct TocEntry {
    /// Heading level (1-6).
    level: u8,
    /// Plain text of the heading.
    title: String,
    /// Anchor id shared with the main document.
    id: String,
}

/// Collects headings during the TOC pass.
pub(crate) struct TocEmitter<'p> {
    profile: &'p RenderProfile,
    headings: HeadingCounter,
    entries: Vec<TocEntry>,
    current: Option<(u8, String)>,
}

impl<'p> TocEmitter<'p> {
    pub(crate) fn new(profile: &'p RenderProfile) -> Self {
        Self {
            profile,
            headings: HeadingCounter::default(),
            entries: Vec::new(),
            current: None,
        }
    }

    /// Render the TOC fragment of `document`. Empty when it has no headings.
    pub(crate) fn render(mut self, document: &str) -> String {
        let options = self.profile.parser_flags().engine_options();
        for event in Parser::new_ext(document, options) {
            self.process_event(event);
        }
        tracing::debug!(headings = self.headings.count(), "Collected TOC entries");
        write_fragment(&self.entries)
    }

    fn process_event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                self.current = Some((heading_level_to_num(level), String::new()));
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((level, title)) = self.current.take() {
                    let mut id = String::new();
                    write_toc_anchor(
                        self.profile.toc_id_prefix(),
                        self.headings.next_index(),
                        &mut id,
                    );
                    self.entries.push(TocEntry {
                        level,
                        title: title.trim().to_owned(),
                        id,
                    });
                }
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, title)) = &mut self.current {
                    title.push_str(&text);
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if let Some((_, title)) = &mut self.current {
                    title.push(' ');
                }
            }
            _ => {}
        }
    }
}

/// Write entries as nested lists, with levels taken relative to the first
/// heading.
fn write_fragment(entries: &[TocEntry]) -> String {
    let Some(first) = entries.first() else {
        return String::new();
    };
    let offset = first.level - 1;

    let mut out = String::from("<div class=\"toc\">\n");
    let mut current = 0;
    for entry in entries {
        let level = entry.level.saturating_sub(offset).max(1);
        if level > current {
            while level > current {
                out.push_str("<ul>\n<li>\n");
                current += 1;
            }
        } else if level < current {
            out.push_str("</li>\n");
            while level < current {
                out.push_str("</ul>\n</li>\n");
                current -= 1;
            }
            out.push_str("<li>\n");
        } else {
            out.push_str("</li>\n<li>\n");
        }

        out.push_str("<a href=\"#");
        out.push_str(&entry.id);
        out.push_str("\">");
        escape_html_into(&entry.title, &mut out);
        out.push_str("</a>\n");
    }
    while current > 0 {
        out.push_str("</li>\n</ul>\n");
        current -= 1;
    }
    out.push_str("</div>\n");
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::surface::{Purpose, Surface};

    fn render(markdown: &str, prefix: Option<&str>) -> String {
        let profile = RenderProfile::base(Surface::UserText, Purpose::Toc)
            .with_toc_id_prefix(prefix.map(str::to_owned));
        TocEmitter::new(&profile).render(markdown)
    }

    #[test]
    fn test_no_headings_gives_empty_fragment() {
        assert_eq!(render("just text", None), "");
        assert_eq!(render("", None), "");
    }

    #[test]
    fn test_flat_headings() {
        assert_eq!(
            render("## A\n\n## B", None),
            "<div class=\"toc\">\n\
             <ul>\n<li>\n<a href=\"#toc_0\">A</a>\n\
             </li>\n<li>\n<a href=\"#toc_1\">B</a>\n\
             </li>\n</ul>\n\
             </div>\n"
        );
    }

    #[test]
    fn test_nested_headings() {
        assert_eq!(
            render("# A\n\n## B\n\n# C", Some("md-")),
            "<div class=\"toc\">\n\
             <ul>\n<li>\n<a href=\"#md-toc_0\">A</a>\n\
             <ul>\n<li>\n<a href=\"#md-toc_1\">B</a>\n\
             </li>\n</ul>\n</li>\n<li>\n<a href=\"#md-toc_2\">C</a>\n\
             </li>\n</ul>\n\
             </div>\n"
        );
    }

    #[test]
    fn test_headings_above_first_level_clamp() {
        let toc = render("### A\n\n# B", None);
        assert_eq!(toc.matches("<ul>").count(), 1);
        assert!(toc.contains("<a href=\"#toc_1\">B</a>"));
    }

    #[test]
    fn test_title_text_is_plain_and_escaped() {
        let toc = render("# *Install* `<npm>`", None);
        assert!(toc.contains("<a href=\"#toc_0\">Install &lt;npm&gt;</a>"));
    }

    #[test]
    fn test_prefix_is_escaped() {
        let toc = render("# A", Some("a\"b"));
        assert!(toc.contains("href=\"#a&quot;btoc_0\""));
    }
}
