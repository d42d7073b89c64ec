/*
 * localize/mod.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Localization of embedded UI-description markup.
 */

//! Localization stage capability.
//!
//! After template expansion the document may still contain UI-description
//! markup: `<Trans>` message blocks, `<Plural>`/`<Select>` forms and `{…}`
//! expressions over the render's context data. A [`Localizer`] translates
//! those into static markup for one locale. Everything it does not
//! recognize (all MJML and HTML tags) passes through unchanged, apart from
//! `attr={expr}` attributes which become quoted attributes.

mod eval;

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use thiserror::Error;

use eval::Scope;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocalizeError {
    #[error("Unterminated {construct} starting at byte {offset}")]
    Unterminated {
        construct: &'static str,
        offset: usize,
    },

    #[error("{0} is not defined")]
    UnknownIdentifier(String),

    #[error("Unknown component <{0}>")]
    UnknownComponent(String),

    #[error("Unsupported expression `{0}`")]
    UnsupportedExpression(String),

    #[error("<{component}> requires a `{attribute}` attribute")]
    MissingAttribute {
        component: &'static str,
        attribute: &'static str,
    },

    #[error("Objects are not valid as markup content (found {0})")]
    ObjectInContent(String),
}

pub type Result<T> = std::result::Result<T, LocalizeError>;

/// Translates embedded UI-description markup into static markup.
///
/// Implementations must keep all evaluation state per call: renders for
/// different documents may run concurrently.
pub trait Localizer: Send + Sync {
    fn translate(&self, text: &str, locale: &str, data: &Map<String, Value>) -> Result<String>;
}

/// Message catalogs keyed by locale, then by message id.
pub type Catalogs = BTreeMap<String, BTreeMap<String, String>>;

/// Localizer that looks messages up in in-memory catalogs.
///
/// A `<Trans>` block without a catalog entry renders its own body, so an
/// empty catalog set yields the source-language text.
#[derive(Debug, Clone, Default)]
pub struct CatalogLocalizer {
    catalogs: Catalogs,
}

impl CatalogLocalizer {
    pub fn new(catalogs: Catalogs) -> Self {
        Self { catalogs }
    }

    /// Catalog for `locale`, falling back from `de-AT` to `de`.
    fn catalog(&self, locale: &str) -> Option<&BTreeMap<String, String>> {
        self.catalogs.get(locale).or_else(|| {
            let language = locale.split(['-', '_']).next()?;
            self.catalogs.get(language)
        })
    }
}

impl Localizer for CatalogLocalizer {
    fn translate(&self, text: &str, locale: &str, data: &Map<String, Value>) -> Result<String> {
        let scope = Scope::new(data, self.catalog(locale));
        scope.evaluate(text)
    }
}
