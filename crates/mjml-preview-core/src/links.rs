/*
 * links.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Rewrite relative resource links in rendered markup.
 */

//! Relative link rewriting.
//!
//! The preview is displayed away from the source document, so relative
//! `src`, `href` and `background` attributes and CSS `url(…)` references are
//! resolved against the document's directory. Links that already carry a
//! scheme, fragments, protocol-relative links and template placeholders are
//! left as they are.

use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use url::Url;

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(\s(?:src|href|background)\s*=\s*)(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
});

static CSS_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(url\(\s*)(?:"([^"]*)"|'([^']*)'|([^'")\s]*))(\s*\))"#).expect("valid regex")
});

static SCHEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").expect("valid regex"));

/// Resolves a link found in rendered markup to something the preview can load.
pub trait ResourceResolver: Send + Sync {
    /// Return the rewritten link, or `None` to leave it unchanged.
    fn resolve_local_resource(&self, source_path: &Path, link: &str) -> Option<String>;
}

/// Resolves relative links to `file://` URLs next to the source document.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileUrlResolver;

impl ResourceResolver for FileUrlResolver {
    fn resolve_local_resource(&self, source_path: &Path, link: &str) -> Option<String> {
        let split = link.find(['?', '#']).unwrap_or(link.len());
        let (path_part, suffix) = link.split_at(split);
        if path_part.is_empty() {
            return None;
        }

        let dir = source_path.parent().unwrap_or_else(|| Path::new("."));
        let joined = std::path::absolute(dir.join(path_part)).ok()?;
        let url = Url::from_file_path(&joined).ok()?;
        Some(format!("{}{}", url, suffix))
    }
}

/// Whether `link` should be handed to the resolver.
pub fn is_relative_resource(link: &str) -> bool {
    let link = link.trim();
    !(link.is_empty()
        || link.starts_with('#')
        || link.starts_with("//")
        || SCHEME_RE.is_match(link)
        || link.contains("[[")
        || link.contains("{{")
        || link.contains("*|"))
}

/// Rewrite every relative resource link in `html`.
pub fn fix_links(html: &str, source_path: &Path, resolver: &dyn ResourceResolver) -> String {
    let rewrite = |link: &str| -> Option<String> {
        if is_relative_resource(link) {
            resolver.resolve_local_resource(source_path, link.trim())
        } else {
            None
        }
    };

    let html = ATTR_RE.replace_all(html, |caps: &Captures| {
        let (quote, link) = match (caps.get(2), caps.get(3)) {
            (Some(m), _) => ('"', m.as_str()),
            (None, Some(m)) => ('\'', m.as_str()),
            (None, None) => return caps[0].to_string(),
        };
        match rewrite(link) {
            Some(resolved) => format!("{}{}{}{}", &caps[1], quote, resolved, quote),
            None => caps[0].to_string(),
        }
    });

    CSS_URL_RE
        .replace_all(&html, |caps: &Captures| {
            let (quote, link) = match (caps.get(2), caps.get(3), caps.get(4)) {
                (Some(m), _, _) => ("\"", m.as_str()),
                (None, Some(m), _) => ("'", m.as_str()),
                (None, None, Some(m)) => ("", m.as_str()),
                _ => return caps[0].to_string(),
            };
            match rewrite(link) {
                Some(resolved) => format!("{}{}{}{}{}", &caps[1], quote, resolved, quote, &caps[5]),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// `file://` URL of the directory containing `path`, with a trailing slash.
///
/// Used as the `<base>` of diagnostics pages so relative links in excerpts
/// resolve next to the document. `None` for a bare file name.
pub fn directory_url(path: &Path) -> Option<String> {
    let dir = path.parent().filter(|d| !d.as_os_str().is_empty())?;
    let dir = std::path::absolute(dir).ok()?;
    Url::from_directory_path(dir).ok().map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Prefix;

    impl ResourceResolver for Prefix {
        fn resolve_local_resource(&self, _source_path: &Path, link: &str) -> Option<String> {
            Some(format!("resolved:{}", link))
        }
    }

    #[test]
    fn test_relative_attributes_rewritten() {
        let html = r#"<img src="img/logo.png"><a href='page.html'>x</a><td background="bg.jpg">"#;
        let out = fix_links(html, Path::new("/mail/a.mjml"), &Prefix);
        assert_eq!(
            out,
            r#"<img src="resolved:img/logo.png"><a href='resolved:page.html'>x</a><td background="resolved:bg.jpg">"#
        );
    }

    #[test]
    fn test_prefixed_attributes_untouched() {
        let html = r#"<img data-src="lazy.png" src="logo.png"><a data-href="x.html" href="y.html">"#;
        let out = fix_links(html, Path::new("/mail/a.mjml"), &Prefix);
        assert_eq!(
            out,
            r#"<img data-src="lazy.png" src="resolved:logo.png"><a data-href="x.html" href="resolved:y.html">"#
        );
    }

    #[test]
    fn test_css_urls_rewritten() {
        let html = r#"<div style="background:url(img/a.png)"></div><style>.x{background:url('b.png')}</style>"#;
        let out = fix_links(html, Path::new("/mail/a.mjml"), &Prefix);
        assert_eq!(
            out,
            r#"<div style="background:url(resolved:img/a.png)"></div><style>.x{background:url('resolved:b.png')}</style>"#
        );
    }

    #[test]
    fn test_absolute_and_placeholder_links_untouched() {
        let html = concat!(
            r#"<a href="https://example.com">a</a>"#,
            r#"<a href="mailto:x@example.com">b</a>"#,
            r##"<a href="#top">c</a>"##,
            r#"<a href="//cdn.example.com/x.png">d</a>"#,
            r#"<a href="[[UNSUB_LINK_DE]]">e</a>"#,
            r#"<a href="*|UNSUB|*">f</a>"#,
            r#"<img src="data:image/png;base64,AAAA">"#,
            r#"<a href="">g</a>"#,
        );
        assert_eq!(fix_links(html, Path::new("/mail/a.mjml"), &Prefix), html);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_url_resolver() {
        let resolved = FileUrlResolver
            .resolve_local_resource(Path::new("/mail/a.mjml"), "img/logo 1.png?v=2")
            .unwrap();
        assert_eq!(resolved, "file:///mail/img/logo%201.png?v=2");
    }

    #[cfg(unix)]
    #[test]
    fn test_directory_url() {
        assert_eq!(
            directory_url(Path::new("/mail/a.mjml")).as_deref(),
            Some("file:///mail/")
        );
        assert_eq!(directory_url(Path::new("a.mjml")), None);
    }
}
