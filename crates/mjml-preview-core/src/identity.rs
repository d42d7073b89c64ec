/*
 * identity.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Source document and preview artifact identities.
 */

//! Source document and preview artifact identities.
//!
//! A [`SourceId`] is derived from a serialized identity token built from the
//! document's canonical URI, so two references to the same document compare
//! equal no matter how the host surfaced them. A [`PreviewId`] is a random
//! v4 UUID allocated by the [`IdentityRegistry`](crate::registry::IdentityRegistry).

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// Stable identity of a source document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId {
    /// Serialized identity token; equality is defined on this.
    token: String,
    /// Canonical URI the token was built from.
    uri: String,
}

impl SourceId {
    /// Build an identity from a URI string such as `file:///mail/welcome.mjml`.
    ///
    /// Strings that do not parse as an absolute URI are treated as paths.
    pub fn from_uri(uri: &str) -> Self {
        match Url::parse(uri) {
            Ok(url) if url.scheme().len() > 1 => Self::from_canonical(url.to_string()),
            _ => Self::from_path(Path::new(uri)),
        }
    }

    /// Build an identity from a filesystem path.
    pub fn from_path(path: &Path) -> Self {
        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        let canonical = Url::from_file_path(&absolute)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| absolute.to_string_lossy().replace('\\', "/"));
        Self::from_canonical(canonical)
    }

    fn from_canonical(uri: String) -> Self {
        let token = serde_json::json!({ "uri": uri }).to_string();
        Self { token, uri }
    }

    /// The canonical URI of the document.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The serialized identity token.
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

/// Identity of a preview artifact, unique for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PreviewId(Uuid);

impl PreviewId {
    pub(crate) fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for PreviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_uri_same_identity() {
        let a = SourceId::from_uri("file:///mail/welcome.mjml");
        let b = SourceId::from_uri("file:///mail/welcome.mjml");
        assert_eq!(a, b);
        assert_eq!(a.token(), b.token());
    }

    #[test]
    fn test_uri_is_normalized() {
        let a = SourceId::from_uri("file:///mail/./welcome.mjml");
        let b = SourceId::from_uri("FILE:///mail/welcome.mjml");
        assert_eq!(a, b);
    }

    #[cfg(unix)]
    #[test]
    fn test_path_and_uri_agree() {
        let from_path = SourceId::from_path(Path::new("/mail/welcome.mjml"));
        let from_uri = SourceId::from_uri("file:///mail/welcome.mjml");
        assert_eq!(from_path, from_uri);
    }

    #[test]
    fn test_token_is_json() {
        let id = SourceId::from_uri("file:///a.mjml");
        let parsed: serde_json::Value = serde_json::from_str(id.token()).unwrap();
        assert_eq!(parsed["uri"], "file:///a.mjml");
    }

    #[test]
    fn test_preview_ids_are_uuid_formatted() {
        let id = PreviewId::new_random();
        let text = id.to_string();
        assert_eq!(text.len(), 36);
        assert_eq!(text.chars().filter(|c| *c == '-').count(), 4);
        assert_ne!(id, PreviewId::new_random());
    }
}
