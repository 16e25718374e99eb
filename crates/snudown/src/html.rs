//! XHTML emission over the engine's event stream.
//!
//! [`HtmlEmitter`] walks `pulldown-cmark` events and writes HTML under one
//! [`RenderProfile`]. All per-document hooks fire here: raw HTML goes through
//! the whitelist filter, links get the profile's decoration, bare URLs,
//! mentions and superscripts are found in merged text runs, and headings get
//! anchor ids when the `TOC` output flag is set.

use std::fmt::Write;

use pulldown_cmark::{Event, LinkType, Parser, Tag, TagEnd};

use crate::RenderError;
use crate::flags::{OutputFlags, ParserFlags};
use crate::inline::{Scan, Segment, segments};
use crate::link::is_safe_link;
use crate::profile::RenderProfile;
use crate::state::{
    CodeBlockState, HeadingCounter, ImageState, TableState, escape_href_into, escape_html_into,
    heading_level_to_num, write_toc_anchor,
};
use crate::whitelist::filter_raw_html;

/// Output of one main pass.
#[derive(Debug)]
pub(crate) struct Emitted {
    pub(crate) html: String,
    pub(crate) warnings: Vec<String>,
}

/// Event-driven HTML writer for the main document.
pub(crate) struct HtmlEmitter<'p> {
    profile: &'p RenderProfile,
    flags: OutputFlags,
    output: String,
    /// Consecutive text events, scanned as one run when flushed.
    pending_text: String,
    html_block: Option<String>,
    code: CodeBlockState,
    table: TableState,
    image: ImageState,
    headings: HeadingCounter,
    pending_image: Option<(String, String)>,
    /// One entry per open nesting-counted tag; `false` once past the ceiling.
    nesting: Vec<bool>,
    /// One entry per open link; `true` when an anchor was written.
    link_stack: Vec<bool>,
    depth_exceeded: bool,
    warnings: Vec<String>,
}

impl<'p> HtmlEmitter<'p> {
    pub(crate) fn new(profile: &'p RenderProfile) -> Self {
        Self {
            profile,
            flags: profile.output_flags(),
            output: String::new(),
            pending_text: String::new(),
            html_block: None,
            code: CodeBlockState::default(),
            table: TableState::default(),
            image: ImageState::default(),
            headings: HeadingCounter::default(),
            pending_image: None,
            nesting: Vec::new(),
            link_stack: Vec::new(),
            depth_exceeded: false,
            warnings: Vec::new(),
        }
    }

    /// Render `document` to HTML.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::DepthExceeded`] when the document nests deeper
    /// than the profile allows and the profile is strict.
    pub(crate) fn render(mut self, document: &str) -> Result<Emitted, RenderError> {
        self.output.reserve(document.len() + document.len() / 2);
        let options = self.profile.parser_flags().engine_options();
        for event in Parser::new_ext(document, options) {
            self.process_event(event);
            if self.depth_exceeded && self.profile.strict_nesting() {
                return Err(RenderError::DepthExceeded {
                    limit: self.profile.max_nesting(),
                });
            }
        }
        self.flush_text();

        Ok(Emitted {
            html: self.output,
            warnings: self.warnings,
        })
    }

    fn process_event(&mut self, event: Event<'_>) {
        if !matches!(event, Event::Text(_)) {
            self.flush_text();
        }
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.inline_code(&code),
            Event::Html(html) => {
                if let Some(block) = &mut self.html_block {
                    block.push_str(&html);
                } else {
                    self.raw_html(&html);
                }
            }
            Event::InlineHtml(html) => self.raw_html(&html),
            Event::SoftBreak => self.soft_break(),
            Event::HardBreak => self.hard_break(),
            Event::Rule => {
                self.output.push_str("<hr");
                self.output.push_str(self.void_close());
                self.output.push('\n');
            }
            Event::TaskListMarker(_)
            | Event::FootnoteReference(_)
            | Event::InlineMath(_)
            | Event::DisplayMath(_) => {
                // Extensions not enabled
            }
        }
    }

    #[allow(clippy::too_many_lines)]
    fn start_tag(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.output.push_str("<p>"),
            Tag::Heading { level, .. } => {
                let level = heading_level_to_num(level);
                let index = self.headings.next_index();
                write!(self.output, "<h{level}").unwrap();
                if self.flags.contains(OutputFlags::TOC) {
                    self.output.push_str(r#" id=""#);
                    write_toc_anchor(self.profile.toc_id_prefix(), index, &mut self.output);
                    self.output.push('"');
                }
                self.output.push('>');
            }
            Tag::BlockQuote(_) => self.open_block("<blockquote>\n"),
            Tag::CodeBlock(_) => self.code.start(),
            Tag::HtmlBlock => self.html_block = Some(String::new()),
            Tag::List(start) => {
                if self.open_nested() {
                    match start {
                        Some(1) => self.output.push_str("<ol>\n"),
                        Some(n) => writeln!(self.output, r#"<ol start="{n}">"#).unwrap(),
                        None => self.output.push_str("<ul>\n"),
                    }
                }
            }
            Tag::Item => self.open_block("<li>"),
            Tag::FootnoteDefinition(_) | Tag::MetadataBlock(_) => {}
            Tag::DefinitionList => self.output.push_str("<dl>\n"),
            Tag::DefinitionListTitle => self.output.push_str("<dt>"),
            Tag::DefinitionListDefinition => self.output.push_str("<dd>"),
            Tag::Table(alignments) => {
                self.table.start(alignments);
                self.output.push_str("<table>");
            }
            Tag::TableHead => {
                self.table.start_head();
                self.output.push_str("<thead>\n<tr>\n");
            }
            Tag::TableRow => {
                self.table.start_row();
                self.output.push_str("<tr>\n");
            }
            Tag::TableCell => {
                let tag = if self.table.is_in_head() { "th" } else { "td" };
                let align = self.table.current_alignment_attr();
                write!(self.output, "<{tag}{align}>").unwrap();
            }
            Tag::Emphasis => self.open_inline("<em>"),
            Tag::Strong => self.open_inline("<strong>"),
            Tag::Strikethrough => self.open_inline("<del>"),
            Tag::Superscript => self.open_inline("<sup>"),
            Tag::Subscript => self.open_inline("<sub>"),
            Tag::Link {
                link_type,
                dest_url,
                title,
                ..
            } => {
                let href = if matches!(link_type, LinkType::Email) {
                    format!("mailto:{}", &*dest_url)
                } else {
                    dest_url.into_string()
                };
                self.start_link(&href, &title);
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                // Alt text is collected until the image closes
                if self.image.start() {
                    self.pending_image = self
                        .link_allowed(&dest_url)
                        .then(|| (dest_url.into_string(), title.into_string()));
                }
            }
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.output.push_str("</p>\n"),
            TagEnd::Heading(level) => {
                writeln!(self.output, "</h{}>", heading_level_to_num(level)).unwrap();
            }
            TagEnd::BlockQuote(_) => self.close_block("</blockquote>\n"),
            TagEnd::CodeBlock => {
                let content = self.code.end();
                self.output.push_str("<pre><code>");
                escape_html_into(&content, &mut self.output);
                self.output.push_str("</code></pre>\n");
            }
            TagEnd::HtmlBlock => {
                if let Some(block) = self.html_block.take() {
                    self.raw_html(&block);
                }
            }
            TagEnd::List(ordered) => {
                self.close_block(if ordered { "</ol>\n" } else { "</ul>\n" });
            }
            TagEnd::Item => self.close_block("</li>\n"),
            TagEnd::FootnoteDefinition | TagEnd::MetadataBlock(_) => {}
            TagEnd::DefinitionList => self.output.push_str("</dl>\n"),
            TagEnd::DefinitionListTitle => self.output.push_str("</dt>\n"),
            TagEnd::DefinitionListDefinition => self.output.push_str("</dd>\n"),
            TagEnd::Table => self.output.push_str("</tbody></table>\n"),
            TagEnd::TableHead => {
                self.output.push_str("</tr>\n</thead><tbody>\n");
                self.table.end_head();
            }
            TagEnd::TableRow => self.output.push_str("</tr>\n"),
            TagEnd::TableCell => {
                self.output.push_str(if self.table.is_in_head() {
                    "</th>\n"
                } else {
                    "</td>\n"
                });
                self.table.next_cell();
            }
            TagEnd::Emphasis => self.close_inline("</em>"),
            TagEnd::Strong => self.close_inline("</strong>"),
            TagEnd::Strikethrough => self.close_inline("</del>"),
            TagEnd::Superscript => self.close_inline("</sup>"),
            TagEnd::Subscript => self.close_inline("</sub>"),
            TagEnd::Link => {
                self.close_nested();
                if self.link_stack.pop() == Some(true) {
                    self.output.push_str("</a>");
                }
            }
            TagEnd::Image => self.end_image(),
        }
    }

    fn text(&mut self, text: &str) {
        if self.code.is_active() {
            self.code.push_str(text);
        } else if self.image.is_active() {
            self.image.push_str(text);
        } else {
            self.pending_text.push_str(text);
        }
    }

    /// Emit the buffered text run, linking bare URLs and mentions.
    fn flush_text(&mut self) {
        if self.pending_text.is_empty() {
            return;
        }
        let mut text = std::mem::take(&mut self.pending_text);
        let in_link = !self.link_stack.is_empty();
        let parser_flags = self.profile.parser_flags();
        let scan = Scan {
            autolink: !in_link && parser_flags.contains(ParserFlags::AUTOLINK),
            mentions: !in_link && self.profile.resolver().is_attached(),
            superscript: parser_flags.contains(ParserFlags::SUPERSCRIPT),
        };
        for segment in segments(&text, scan) {
            self.write_segment(segment, scan);
        }
        text.clear();
        self.pending_text = text;
    }

    fn write_segment(&mut self, segment: Segment<'_>, scan: Scan) {
        match segment {
            Segment::Text(text) => escape_html_into(text, &mut self.output),
            Segment::Url { text, href } => {
                if !self.link_allowed(&href) {
                    escape_html_into(text, &mut self.output);
                    return;
                }
                self.output.push_str(r#"<a href=""#);
                escape_href_into(&href, &mut self.output);
                self.output.push('"');
                self.profile
                    .link_policy()
                    .write_attributes(&href, &mut self.output);
                self.output.push('>');
                escape_html_into(text, &mut self.output);
                self.output.push_str("</a>");
            }
            Segment::Mention(name) => self.mention(name),
            Segment::Superscript(inner) => {
                if self.open_nested() {
                    self.output.push_str("<sup>");
                    for segment in segments(inner, scan) {
                        self.write_segment(segment, scan);
                    }
                } else {
                    escape_html_into(inner, &mut self.output);
                }
                if self.close_nested() {
                    self.output.push_str("</sup>");
                }
            }
        }
    }

    fn mention(&mut self, name: &str) {
        let resolver = self.profile.resolver();
        if resolver.user_exists(name) {
            let display = resolver.display_name_for(name);
            write!(
                self.output,
                r#"<a href="/u/{name}" class="user-mention">@"#
            )
            .unwrap();
            escape_html_into(&display, &mut self.output);
            self.output.push_str("</a>");
        } else {
            self.output.push('@');
            escape_html_into(name, &mut self.output);
        }
    }

    fn start_link(&mut self, href: &str, title: &str) {
        let within = self.open_nested();
        let allowed = self.link_allowed(href);
        if !allowed {
            tracing::debug!(href, "Dropping link with unsafe scheme");
        }
        let opened = within && allowed && !self.image.is_active();
        if opened {
            self.output.push_str(r#"<a href=""#);
            escape_href_into(href, &mut self.output);
            self.output.push('"');
            if !title.is_empty() {
                self.output.push_str(r#" title=""#);
                escape_html_into(title, &mut self.output);
                self.output.push('"');
            }
            self.profile
                .link_policy()
                .write_attributes(href, &mut self.output);
            self.output.push('>');
        }
        self.link_stack.push(opened);
    }

    fn end_image(&mut self) {
        let Some(alt) = self.image.end() else {
            return;
        };
        match self.pending_image.take() {
            Some((src, title)) => {
                self.output.push_str(r#"<img src=""#);
                escape_href_into(&src, &mut self.output);
                self.output.push_str(r#"" alt=""#);
                escape_html_into(&alt, &mut self.output);
                self.output.push('"');
                if !title.is_empty() {
                    self.output.push_str(r#" title=""#);
                    escape_html_into(&title, &mut self.output);
                    self.output.push('"');
                }
                self.output.push_str(self.void_close());
            }
            None => escape_html_into(&alt, &mut self.output),
        }
    }

    fn inline_code(&mut self, code: &str) {
        if self.image.is_active() {
            self.image.push_str(code);
        } else {
            self.output.push_str("<code>");
            escape_html_into(code, &mut self.output);
            self.output.push_str("</code>");
        }
    }

    fn raw_html(&mut self, html: &str) {
        if !self.image.is_active() {
            filter_raw_html(html, self.flags, self.profile.whitelist(), &mut self.output);
        }
    }

    fn soft_break(&mut self) {
        if self.image.is_active() {
            self.image.push_str(" ");
        } else if self.flags.contains(OutputFlags::HARD_WRAP) {
            self.line_break();
        } else {
            self.output.push('\n');
        }
    }

    fn hard_break(&mut self) {
        if self.image.is_active() {
            self.image.push_str(" ");
        } else {
            self.line_break();
        }
    }

    fn line_break(&mut self) {
        self.output.push_str("<br");
        self.output.push_str(self.void_close());
        self.output.push('\n');
    }

    fn void_close(&self) -> &'static str {
        if self.flags.contains(OutputFlags::USE_XHTML) {
            "/>"
        } else {
            ">"
        }
    }

    fn link_allowed(&self, url: &str) -> bool {
        !self.flags.contains(OutputFlags::SAFELINK) || is_safe_link(url)
    }

    /// Enter a nesting-counted tag. Returns `false` past the ceiling, in which
    /// case the tag itself is dropped and only its content is emitted.
    fn open_nested(&mut self) -> bool {
        let limit = self.profile.max_nesting();
        let within = self.nesting.len() < limit;
        self.nesting.push(within);
        if !within && !self.depth_exceeded {
            self.depth_exceeded = true;
            if !self.profile.strict_nesting() {
                tracing::warn!(
                    limit,
                    surface = self.profile.surface().as_str(),
                    "Nesting limit exceeded, flattening deeper content"
                );
                self.warnings
                    .push(format!("Nesting deeper than {limit} levels was flattened"));
            }
        }
        within
    }

    fn close_nested(&mut self) -> bool {
        self.nesting.pop().unwrap_or(false)
    }

    fn open_block(&mut self, tag: &str) {
        if self.open_nested() {
            self.output.push_str(tag);
        }
    }

    fn close_block(&mut self, tag: &str) {
        if self.close_nested() {
            self.output.push_str(tag);
        }
    }

    fn open_inline(&mut self, tag: &str) {
        if self.open_nested() && !self.image.is_active() {
            self.output.push_str(tag);
        }
    }

    fn close_inline(&mut self, tag: &str) {
        if self.close_nested() && !self.image.is_active() {
            self.output.push_str(tag);
        }
    }
}
