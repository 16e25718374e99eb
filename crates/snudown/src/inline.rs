//! Inline scanning of text runs for bare URLs, `@name` mentions and `^`
//! superscripts.

use std::borrow::Cow;

/// Longest username recognized in a mention.
pub const MAX_MENTION_LEN: usize = 64;

/// Prefixes that start a bare URL under `AUTOLINK`.
const URL_PREFIXES: &[&str] = &["http://", "https://", "ftp://", "www."];

/// Punctuation trimmed from the end of a bare URL.
const URL_TRAILING: &[char] = &['.', ',', ':', ';', '!', '?', '\'', '"'];

/// A piece of a text run.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Segment<'a> {
    /// Plain text, emitted escaped.
    Text(&'a str),
    /// Bare URL as written, with the href it links to.
    Url { text: &'a str, href: Cow<'a, str> },
    /// `@name` mention, without the `@`.
    Mention(&'a str),
    /// Raw content of a `^word` or `^(group)` superscript, scanned again
    /// when written.
    Superscript(&'a str),
}

/// Inline syntax recognized by [`segments`].
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Scan {
    pub(crate) autolink: bool,
    pub(crate) mentions: bool,
    pub(crate) superscript: bool,
}

/// Whether `name` is a syntactically valid mention username.
pub(crate) fn is_mention_name(name: &str) -> bool {
    (1..=MAX_MENTION_LEN).contains(&name.len()) && name.bytes().all(is_name_byte)
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

/// Split a text run into plain text, bare URLs, mentions and superscripts.
pub(crate) fn segments(text: &str, scan: Scan) -> Vec<Segment<'_>> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut last = 0;
    let mut i = 0;

    while i < bytes.len() {
        let prev = text[..i].chars().next_back();

        if scan.autolink
            && prev.is_none_or(|c| !c.is_alphanumeric())
            && let Some(len) = bare_url_len(&text[i..])
        {
            push_text(&mut out, &text[last..i]);
            let url = &text[i..i + len];
            out.push(Segment::Url {
                text: url,
                href: bare_url_href(url),
            });
            i += len;
            last = i;
            continue;
        }

        if scan.superscript
            && bytes[i] == b'^'
            && let Some((inner, len)) = superscript_span(&text[i..])
        {
            push_text(&mut out, &text[last..i]);
            out.push(Segment::Superscript(inner));
            i += len;
            last = i;
            continue;
        }

        if scan.mentions && bytes[i] == b'@' && prev.is_none_or(opens_mention) {
            let len = bytes[i + 1..]
                .iter()
                .take_while(|b| is_name_byte(**b))
                .count();
            if (1..=MAX_MENTION_LEN).contains(&len) {
                push_text(&mut out, &text[last..i]);
                out.push(Segment::Mention(&text[i + 1..i + 1 + len]));
                i += 1 + len;
                last = i;
                continue;
            }
        }

        i += text[i..].chars().next().map_or(1, char::len_utf8);
    }

    push_text(&mut out, &text[last..]);
    out
}

fn push_text<'a>(out: &mut Vec<Segment<'a>>, text: &'a str) {
    if !text.is_empty() {
        out.push(Segment::Text(text));
    }
}

/// `@` directly after these characters is part of a word, not a mention.
fn opens_mention(prev: char) -> bool {
    !(prev.is_alphanumeric() || matches!(prev, '_' | '@' | '/'))
}

/// Content and total length of the superscript starting at the `^` of `s`.
///
/// `^(...)` runs to the first `)`; `^word` runs to the next whitespace.
fn superscript_span(s: &str) -> Option<(&str, usize)> {
    let rest = &s[1..];
    if let Some(group) = rest.strip_prefix('(') {
        let close = group.find(')')?;
        let inner = &group[..close];
        return (!inner.is_empty()).then_some((inner, close + 3));
    }
    let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    (end > 0).then_some((&rest[..end], end + 1))
}

/// Length of the bare URL starting at `s`, if any.
fn bare_url_len(s: &str) -> Option<usize> {
    let prefix = URL_PREFIXES
        .iter()
        .find(|p| s.get(..p.len()).is_some_and(|h| h.eq_ignore_ascii_case(p)))?;

    let end = s
        .find(|c: char| c.is_whitespace() || c == '<')
        .unwrap_or(s.len());
    let mut url = &s[..end];
    loop {
        if let Some(stripped) = url.strip_suffix(URL_TRAILING) {
            url = stripped;
        } else if url.ends_with(')') && url.matches(')').count() > url.matches('(').count() {
            url = &url[..url.len() - 1];
        } else {
            break;
        }
    }

    (url.len() > prefix.len()).then_some(url.len())
}

fn bare_url_href(url: &str) -> Cow<'_, str> {
    if url.get(..4).is_some_and(|h| h.eq_ignore_ascii_case("www.")) {
        Cow::Owned(format!("http://{url}"))
    } else {
        Cow::Borrowed(url)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const ALL: Scan = Scan {
        autolink: true,
        mentions: true,
        superscript: true,
    };
    const URLS: Scan = Scan {
        autolink: true,
        mentions: false,
        superscript: false,
    };
    const MENTIONS: Scan = Scan {
        autolink: false,
        mentions: true,
        superscript: false,
    };
    const SUPERSCRIPT: Scan = Scan {
        autolink: false,
        mentions: false,
        superscript: true,
    };

    fn url<'a>(text: &'a str, href: &'a str) -> Segment<'a> {
        Segment::Url {
            text,
            href: Cow::Borrowed(href),
        }
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(segments("hello", ALL), vec![Segment::Text("hello")]);
        assert!(segments("", ALL).is_empty());
    }

    #[test]
    fn test_bare_url() {
        assert_eq!(
            segments("see http://x.example/a?b=c now", URLS),
            vec![
                Segment::Text("see "),
                url("http://x.example/a?b=c", "http://x.example/a?b=c"),
                Segment::Text(" now"),
            ]
        );
    }

    #[test]
    fn test_www_url_gets_scheme() {
        assert_eq!(
            segments("www.x.example", URLS),
            vec![url("www.x.example", "http://www.x.example")]
        );
    }

    #[test]
    fn test_url_trailing_punctuation_trimmed() {
        assert_eq!(
            segments("go to https://x.example/page.", URLS),
            vec![
                Segment::Text("go to "),
                url("https://x.example/page", "https://x.example/page"),
                Segment::Text("."),
            ]
        );
    }

    #[test]
    fn test_url_parentheses() {
        assert_eq!(
            segments("(http://x.example/wiki/A_(b))", URLS),
            vec![
                Segment::Text("("),
                url("http://x.example/wiki/A_(b)", "http://x.example/wiki/A_(b)"),
                Segment::Text(")"),
            ]
        );
    }

    #[test]
    fn test_url_needs_word_boundary_and_body() {
        assert_eq!(
            segments("xhttp://x.example", URLS),
            vec![Segment::Text("xhttp://x.example")]
        );
        assert_eq!(segments("http://", URLS), vec![Segment::Text("http://")]);
    }

    #[test]
    fn test_autolink_disabled() {
        assert_eq!(
            segments("http://x.example", Scan::default()),
            vec![Segment::Text("http://x.example")]
        );
    }

    #[test]
    fn test_mentions() {
        assert_eq!(
            segments("hi @alice and @bob_2!", MENTIONS),
            vec![
                Segment::Text("hi "),
                Segment::Mention("alice"),
                Segment::Text(" and "),
                Segment::Mention("bob_2"),
                Segment::Text("!"),
            ]
        );
    }

    #[test]
    fn test_mention_boundaries() {
        assert_eq!(
            segments("mail a@b.example", MENTIONS),
            vec![Segment::Text("mail a@b.example")]
        );
        assert_eq!(
            segments("/u/x/@alice @@bob @", MENTIONS),
            vec![Segment::Text("/u/x/@alice @@bob @")]
        );
        assert_eq!(
            segments("(@alice)", MENTIONS),
            vec![
                Segment::Text("("),
                Segment::Mention("alice"),
                Segment::Text(")"),
            ]
        );
    }

    #[test]
    fn test_mention_too_long() {
        let long = format!("@{}", "a".repeat(MAX_MENTION_LEN + 1));
        assert_eq!(segments(&long, MENTIONS), vec![Segment::Text(&long)]);

        let max = format!("@{}", "a".repeat(MAX_MENTION_LEN));
        assert_eq!(
            segments(&max, MENTIONS),
            vec![Segment::Mention(&max[1..])]
        );
    }

    #[test]
    fn test_non_ascii_text_is_preserved() {
        assert_eq!(
            segments("caf\u{e9} @zo\u{eb}", MENTIONS),
            vec![
                Segment::Text("caf\u{e9} "),
                Segment::Mention("zo"),
                Segment::Text("\u{eb}"),
            ]
        );
    }

    #[test]
    fn test_superscript_inside_word() {
        assert_eq!(
            segments("x^2 + y^10.", SUPERSCRIPT),
            vec![
                Segment::Text("x"),
                Segment::Superscript("2"),
                Segment::Text(" + y"),
                Segment::Superscript("10."),
            ]
        );
    }

    #[test]
    fn test_superscript_group() {
        assert_eq!(
            segments("e^(i pi) = -1", SUPERSCRIPT),
            vec![
                Segment::Text("e"),
                Segment::Superscript("i pi"),
                Segment::Text(" = -1"),
            ]
        );
    }

    #[test]
    fn test_superscript_needs_content() {
        assert_eq!(
            segments("a ^ b ^() c^", SUPERSCRIPT),
            vec![Segment::Text("a ^ b ^() c^")]
        );
        assert_eq!(
            segments("^(open", SUPERSCRIPT),
            vec![Segment::Text("^(open")]
        );
    }

    #[test]
    fn test_superscript_content_is_raw() {
        assert_eq!(
            segments("2^10^", SUPERSCRIPT),
            vec![Segment::Text("2"), Segment::Superscript("10^")]
        );
        assert_eq!(segments("x^2", Scan::default()), vec![Segment::Text("x^2")]);
    }

    #[test]
    fn test_is_mention_name() {
        assert!(is_mention_name("alice"));
        assert!(is_mention_name("a-b_c9"));
        assert!(!is_mention_name(""));
        assert!(!is_mention_name("a b"));
        assert!(!is_mention_name(&"a".repeat(MAX_MENTION_LEN + 1)));
    }
}
