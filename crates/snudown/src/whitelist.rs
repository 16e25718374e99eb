//! HTML element/attribute whitelist and the raw-HTML filter that applies it.

use crate::flags::OutputFlags;
use crate::state::escape_html_into;

/// Elements allowed through when raw HTML is otherwise suppressed.
pub const ELEMENT_WHITELIST: &[&str] = &[
    "tr", "th", "td", "table", "tbody", "thead", "tfoot", "caption", "div",
];

/// Attributes allowed on whitelisted elements.
pub const ATTRIBUTE_WHITELIST: &[&str] = &[
    "colspan",
    "rowspan",
    "cellspacing",
    "cellpadding",
    "scope",
    "class",
    "style",
];

/// Closed sets of element and attribute names permitted to pass through
/// unescaped. Lookups are ASCII case-insensitive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WhitelistTable {
    elements: &'static [&'static str],
    attributes: &'static [&'static str],
}

impl WhitelistTable {
    /// Table over custom sets.
    #[must_use]
    pub const fn new(elements: &'static [&'static str], attributes: &'static [&'static str]) -> Self {
        Self {
            elements,
            attributes,
        }
    }

    /// The table used by both built-in surfaces.
    #[must_use]
    pub const fn standard() -> Self {
        Self::new(ELEMENT_WHITELIST, ATTRIBUTE_WHITELIST)
    }

    #[must_use]
    pub fn is_element_allowed(&self, name: &str) -> bool {
        self.elements.iter().any(|e| e.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn is_attribute_allowed(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn elements(&self) -> &'static [&'static str] {
        self.elements
    }

    #[must_use]
    pub fn attributes(&self) -> &'static [&'static str] {
        self.attributes
    }

    fn allows(&self, tag: &RawTag<'_>) -> bool {
        if !self.is_element_allowed(tag.name) {
            return false;
        }
        if tag.closing {
            return tag.attrs.is_empty();
        }
        tag.attrs.iter().all(|(name, _)| self.is_attribute_allowed(name))
    }
}

impl Default for WhitelistTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// A start or end tag scanned out of a raw HTML fragment.
#[derive(Debug, PartialEq, Eq)]
struct RawTag<'a> {
    name: &'a str,
    closing: bool,
    self_closing: bool,
    attrs: Vec<(&'a str, Option<&'a str>)>,
}

impl RawTag<'_> {
    /// Re-serialize with lowercase names and double-quoted, escaped values.
    fn write_normalized(&self, out: &mut String) {
        out.push('<');
        if self.closing {
            out.push('/');
        }
        out.push_str(&self.name.to_ascii_lowercase());
        for (name, value) in &self.attrs {
            out.push(' ');
            out.push_str(&name.to_ascii_lowercase());
            if let Some(value) = value {
                out.push_str("=\"");
                escape_keeping_entities(value, out);
                out.push('"');
            }
        }
        if self.self_closing {
            out.push('/');
        }
        out.push('>');
    }
}

/// Emit a raw HTML fragment according to the output flags.
///
/// - without `SKIP_HTML`: passed through, or escaped under `ESCAPE`;
/// - with `SKIP_HTML` and `ALLOW_ELEMENT_WHITELIST`: whitelisted tags are
///   re-emitted, everything else is escaped as text;
/// - with `SKIP_HTML` only: escaped under `ESCAPE`, dropped otherwise.
pub(crate) fn filter_raw_html(
    raw: &str,
    flags: OutputFlags,
    whitelist: &WhitelistTable,
    out: &mut String,
) {
    let escape = flags.contains(OutputFlags::ESCAPE);
    if !flags.contains(OutputFlags::SKIP_HTML) {
        if escape {
            escape_html_into(raw, out);
        } else {
            out.push_str(raw);
        }
        return;
    }
    if flags.contains(OutputFlags::ALLOW_ELEMENT_WHITELIST) {
        write_whitelisted(raw, whitelist, out);
    } else if escape {
        escape_html_into(raw, out);
    }
}

fn write_whitelisted(raw: &str, whitelist: &WhitelistTable, out: &mut String) {
    let mut rest = raw;
    while let Some(lt) = rest.find('<') {
        escape_keeping_entities(&rest[..lt], out);
        let candidate = &rest[lt..];
        match scan_tag(candidate) {
            Some((tag, len)) if whitelist.allows(&tag) => {
                tag.write_normalized(out);
                rest = &candidate[len..];
            }
            Some((tag, len)) => {
                tracing::trace!(element = tag.name, "Escaping non-whitelisted tag");
                escape_html_into(&candidate[..len], out);
                rest = &candidate[len..];
            }
            None => {
                out.push_str("&lt;");
                rest = &candidate[1..];
            }
        }
    }
    escape_keeping_entities(rest, out);
}

/// Escape `text` for HTML, leaving well-formed character references such as
/// `&copy;`, `&#169;` and `&#xA9;` as written.
fn escape_keeping_entities(text: &str, out: &mut String) {
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        escape_html_into(&rest[..amp], out);
        let candidate = &rest[amp..];
        if let Some(len) = entity_len(candidate) {
            out.push_str(&candidate[..len]);
            rest = &candidate[len..];
        } else {
            out.push_str("&amp;");
            rest = &candidate[1..];
        }
    }
    escape_html_into(rest, out);
}

/// Length of the character reference at the start of `s` (which starts with
/// `&`), including the closing `;`.
fn entity_len(s: &str) -> Option<usize> {
    let body = &s[1..];
    let (offset, digits) = if let Some(hex) = body
        .strip_prefix("#x")
        .or_else(|| body.strip_prefix("#X"))
    {
        (3, hex.bytes().take_while(u8::is_ascii_hexdigit).count())
    } else if let Some(dec) = body.strip_prefix('#') {
        (2, dec.bytes().take_while(u8::is_ascii_digit).count())
    } else if body.bytes().next().is_some_and(|b| b.is_ascii_alphabetic()) {
        (1, body.bytes().take_while(u8::is_ascii_alphanumeric).count())
    } else {
        return None;
    };
    let end = offset + digits;
    ((1..=32).contains(&digits) && s.as_bytes().get(end) == Some(&b';')).then_some(end + 1)
}

/// Scan a start or end tag at the beginning of `input` (which starts with `<`).
///
/// Returns the tag and the number of bytes it spans, or `None` when the text
/// is not a well-formed tag (comments, declarations, stray `<`).
fn scan_tag(input: &str) -> Option<(RawTag<'_>, usize)> {
    let bytes = input.as_bytes();
    let mut pos = 1;

    let closing = bytes.get(pos) == Some(&b'/');
    if closing {
        pos += 1;
    }

    let name_start = pos;
    if !bytes.get(pos)?.is_ascii_alphabetic() {
        return None;
    }
    while bytes
        .get(pos)
        .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'-')
    {
        pos += 1;
    }
    let name = &input[name_start..pos];

    let mut attrs = Vec::new();
    loop {
        let before_ws = pos;
        while bytes.get(pos)?.is_ascii_whitespace() {
            pos += 1;
        }
        match bytes.get(pos)? {
            b'>' => {
                let tag = RawTag {
                    name,
                    closing,
                    self_closing: false,
                    attrs,
                };
                return Some((tag, pos + 1));
            }
            b'/' if bytes.get(pos + 1) == Some(&b'>') => {
                let tag = RawTag {
                    name,
                    closing,
                    self_closing: true,
                    attrs,
                };
                return Some((tag, pos + 2));
            }
            _ if pos == before_ws => return None,
            _ => {}
        }

        let attr_start = pos;
        while bytes
            .get(pos)
            .is_some_and(|b| !b.is_ascii_whitespace() && !matches!(b, b'=' | b'>' | b'/' | b'"' | b'\'' | b'<'))
        {
            pos += 1;
        }
        if pos == attr_start {
            return None;
        }
        let attr_name = &input[attr_start..pos];

        let mut value_pos = pos;
        while bytes.get(value_pos).is_some_and(u8::is_ascii_whitespace) {
            value_pos += 1;
        }
        if bytes.get(value_pos) != Some(&b'=') {
            attrs.push((attr_name, None));
            continue;
        }
        pos = value_pos + 1;
        while bytes.get(pos)?.is_ascii_whitespace() {
            pos += 1;
        }

        let value = match bytes.get(pos)? {
            quote @ (b'"' | b'\'') => {
                let value_start = pos + 1;
                let len = input[value_start..].find(char::from(*quote))?;
                pos = value_start + len + 1;
                &input[value_start..value_start + len]
            }
            _ => {
                let value_start = pos;
                while bytes
                    .get(pos)
                    .is_some_and(|b| !b.is_ascii_whitespace() && !matches!(b, b'>' | b'"' | b'\'' | b'<' | b'=' | b'`'))
                {
                    pos += 1;
                }
                if pos == value_start {
                    return None;
                }
                &input[value_start..pos]
            }
        };
        attrs.push((attr_name, Some(value)));
    }
}
