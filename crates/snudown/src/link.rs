//! Per-link attribute decoration and the safe-link scheme check.

use crate::state::escape_html_into;

/// Schemes accepted under `SAFELINK`, matched case-insensitively.
const SAFE_SCHEMES: &[&str] = &[
    "http://",
    "https://",
    "ftp://",
    "mailto:",
    "git://",
    "steam://",
    "irc://",
    "news://",
    "mumble://",
    "ssh://",
    "ircs://",
    "ts3server://",
];

/// Extra attributes emitted on every Markdown link and autolink.
///
/// The exempt-domain check is a raw substring match against the URL as
/// written, not a comparison of parsed hosts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinkPolicy {
    nofollow: bool,
    target: Option<String>,
    exempt_domain: Option<String>,
}

impl LinkPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_nofollow(mut self, nofollow: bool) -> Self {
        self.nofollow = nofollow;
        self
    }

    #[must_use]
    pub fn with_target(mut self, target: Option<String>) -> Self {
        self.target = target;
        self
    }

    /// Domain whose links keep `_blank` targets off.
    #[must_use]
    pub fn with_exempt_domain(mut self, domain: Option<String>) -> Self {
        self.exempt_domain = domain;
        self
    }

    #[must_use]
    pub fn nofollow(&self) -> bool {
        self.nofollow
    }

    #[must_use]
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    #[must_use]
    pub fn exempt_domain(&self) -> Option<&str> {
        self.exempt_domain.as_deref()
    }

    /// Attribute fragment for a link to `url`, with a leading space per
    /// attribute. Empty when no decoration applies.
    #[must_use]
    pub fn attributes_for(&self, url: &str) -> String {
        let mut out = String::new();
        self.write_attributes(url, &mut out);
        out
    }

    pub(crate) fn write_attributes(&self, url: &str, out: &mut String) {
        if self.nofollow {
            out.push_str(r#" rel="nofollow""#);
        }
        if let Some(target) = &self.target
            && !self.is_exempt(target, url)
        {
            out.push_str(r#" target=""#);
            escape_html_into(target, out);
            out.push('"');
        }
    }

    fn is_exempt(&self, target: &str, url: &str) -> bool {
        target == "_blank"
            && self
                .exempt_domain
                .as_deref()
                .is_some_and(|domain| !domain.is_empty() && url.contains(domain))
    }
}

/// Whether `url` may be emitted as a link target under `SAFELINK`.
///
/// Relative links (no scheme), absolute paths and fragments are safe, as are
/// the schemes in a fixed list. Whitespace and control characters are
/// ignored when detecting the scheme so `java\tscript:` does not slip by.
#[must_use]
pub fn is_safe_link(url: &str) -> bool {
    let cleaned: String = url
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_ascii_control())
        .collect();
    if cleaned.starts_with('/') || cleaned.starts_with('#') {
        return true;
    }
    let lowered = cleaned.to_ascii_lowercase();
    if SAFE_SCHEMES.iter().any(|scheme| lowered.starts_with(scheme)) {
        return true;
    }
    !has_scheme(&lowered)
}

/// Whether the text before the first `/`, `?` or `#` contains a `:` after a
/// valid scheme name.
fn has_scheme(url: &str) -> bool {
    let head = url.split(['/', '?', '#']).next().unwrap_or_default();
    let Some((scheme, _)) = head.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(nofollow: bool, target: Option<&str>, domain: Option<&str>) -> LinkPolicy {
        LinkPolicy::new()
            .with_nofollow(nofollow)
            .with_target(target.map(str::to_owned))
            .with_exempt_domain(domain.map(str::to_owned))
    }

    #[test]
    fn test_no_decoration_by_default() {
        assert_eq!(LinkPolicy::default().attributes_for("http://x.example"), "");
    }

    #[test]
    fn test_nofollow() {
        assert_eq!(
            policy(true, None, None).attributes_for("http://x.example"),
            r#" rel="nofollow""#
        );
    }

    #[test]
    fn test_target_without_domain_always_emitted() {
        assert_eq!(
            policy(false, Some("_blank"), None).attributes_for("http://x.example"),
            r#" target="_blank""#
        );
    }

    #[test]
    fn test_blank_target_suppressed_for_exempt_domain() {
        let policy = policy(true, Some("_blank"), Some("mysite.example"));
        assert_eq!(
            policy.attributes_for("http://mysite.example/x"),
            r#" rel="nofollow""#
        );
        assert_eq!(
            policy.attributes_for("http://other.example/x"),
            r#" rel="nofollow" target="_blank""#
        );
    }

    #[test]
    fn test_exemption_is_substring_match() {
        let policy = policy(false, Some("_blank"), Some("mysite.example"));
        assert_eq!(
            policy.attributes_for("http://evil.example/mysite.example"),
            ""
        );
    }

    #[test]
    fn test_non_blank_target_never_exempt() {
        let policy = policy(false, Some("_top"), Some("mysite.example"));
        assert_eq!(
            policy.attributes_for("http://mysite.example/x"),
            r#" target="_top""#
        );
    }

    #[test]
    fn test_empty_domain_exempts_nothing() {
        let policy = policy(false, Some("_blank"), Some(""));
        assert_eq!(
            policy.attributes_for("http://mysite.example/x"),
            r#" target="_blank""#
        );
    }

    #[test]
    fn test_target_is_escaped() {
        assert_eq!(
            policy(false, Some(r#"a"b"#), None).attributes_for("/x"),
            r#" target="a&quot;b""#
        );
    }

    #[test]
    fn test_safe_links() {
        for url in [
            "http://x.example",
            "HTTPS://x.example",
            "mailto:a@x.example",
            "ts3server://voice",
            "/r/rust",
            "#anchor",
            "relative/path",
            "page?q=a:b",
        ] {
            assert!(is_safe_link(url), "{url}");
        }
    }

    #[test]
    fn test_unsafe_links() {
        for url in [
            "javascript:alert(1)",
            "JavaScript:alert(1)",
            "java\tscript:alert(1)",
            " javascript:alert(1)",
            "data:text/html;base64,xx",
            "vbscript:msgbox",
        ] {
            assert!(!is_safe_link(url), "{url:?}");
        }
    }
}
