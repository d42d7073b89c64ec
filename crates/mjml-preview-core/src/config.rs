/*
 * config.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Preview configuration.
 */

//! Preview configuration.
//!
//! The configuration is a camelCase JSON document. Every key is optional:
//!
//! ```json
//! {
//!   "autoPreview": true,
//!   "updateWhenTyping": true,
//!   "preserveFocus": true,
//!   "locale": "de",
//!   "validationLevel": "skip",
//!   "contextData": { "UNSUB_LINK": "[[UNSUB_LINK_DE]]" },
//!   "catalogs": { "de": { "greeting": "Hallo {name}" } }
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{PreviewError, Result};

/// Default config file name looked up next to the previewed document.
pub const CONFIG_FILE_NAME: &str = ".mjml-preview.json";

/// Validation level handed to the markup compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationLevel {
    /// Do not validate; links and attributes are taken as already resolved.
    #[default]
    Skip,
    /// Validate and report, but still produce output.
    Soft,
    /// Refuse to produce output when validation fails.
    Strict,
}

impl ValidationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationLevel::Skip => "skip",
            ValidationLevel::Soft => "soft",
            ValidationLevel::Strict => "strict",
        }
    }
}

impl fmt::Display for ValidationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options recognized by the preview core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PreviewConfig {
    /// Bind newly opened or focused MJML documents while the surface is open.
    pub auto_preview: bool,

    /// Invalidate on every content change instead of only on save.
    pub update_when_typing: bool,

    /// Post-render UI hint passed through to the host.
    pub preserve_focus: bool,

    /// Locale for the localization stage.
    pub locale: String,

    pub minify: bool,

    pub beautify: bool,

    pub validation_level: ValidationLevel,

    /// Explicit path to the `mjml` binary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mjml_path: Option<PathBuf>,

    /// Default template variables. A document's own data wins on conflict.
    pub context_data: Map<String, Value>,

    /// Translation catalogs: locale -> message id -> message.
    pub catalogs: BTreeMap<String, BTreeMap<String, String>>,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            auto_preview: true,
            update_when_typing: true,
            preserve_focus: true,
            locale: "de".to_string(),
            minify: false,
            beautify: false,
            validation_level: ValidationLevel::Skip,
            mjml_path: None,
            context_data: Map::new(),
            catalogs: BTreeMap::new(),
        }
    }
}

impl PreviewConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| PreviewError::ConfigParse(e.to_string()))
    }

    /// Load a configuration file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No preview config, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| PreviewError::read(path, e))?;
        let config = Self::from_json(&text)?;
        debug!(path = %path.display(), "Loaded preview config");
        Ok(config)
    }

    /// Look for [`CONFIG_FILE_NAME`] in `dir`.
    pub fn discover(dir: &Path) -> Result<Self> {
        Self::load(&dir.join(CONFIG_FILE_NAME))
    }

    /// Merge document data over the configured defaults.
    pub fn merged_context(&self, document_data: &Map<String, Value>) -> Map<String, Value> {
        let mut merged = self.context_data.clone();
        for (key, value) in document_data {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }
}

/// Parse a JSON object of template variables, as given on a command line
/// or stored next to a document.
pub fn parse_context_data(text: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(PreviewError::ContextData(format!(
            "expected a JSON object, got {}",
            json_type_name(&other)
        ))),
        Err(e) => Err(PreviewError::ContextData(e.to_string())),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = PreviewConfig::default();
        assert!(config.auto_preview);
        assert!(config.update_when_typing);
        assert_eq!(config.locale, "de");
        assert_eq!(config.validation_level, ValidationLevel::Skip);
        assert!(!config.minify);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = PreviewConfig::from_json(
            r#"{"updateWhenTyping": false, "validationLevel": "strict", "locale": "en"}"#,
        )
        .unwrap();
        assert!(!config.update_when_typing);
        assert!(config.auto_preview);
        assert_eq!(config.validation_level, ValidationLevel::Strict);
        assert_eq!(config.locale, "en");
    }

    #[test]
    fn test_malformed_json() {
        let err = PreviewConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, PreviewError::ConfigParse(_)));
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = PreviewConfig::discover(dir.path()).unwrap();
        assert_eq!(config, PreviewConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"{"catalogs": {"de": {"hi": "Hallo"}}}"#,
        )
        .unwrap();
        let config = PreviewConfig::discover(dir.path()).unwrap();
        assert_eq!(config.catalogs["de"]["hi"], "Hallo");
    }

    #[test]
    fn test_discovers_dot_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".mjml-preview.json"), r#"{"locale": "fr"}"#).unwrap();

        let config = PreviewConfig::discover(dir.path()).unwrap();
        assert_eq!(config.locale, "fr");
    }

    #[test]
    fn test_merged_context_document_wins() {
        let config = PreviewConfig::from_json(
            r#"{"contextData": {"UNSUB_LINK": "[[UNSUB]]", "name": "default"}}"#,
        )
        .unwrap();
        let mut doc = Map::new();
        doc.insert("name".to_string(), json!("Ada"));

        let merged = config.merged_context(&doc);
        assert_eq!(merged["name"], json!("Ada"));
        assert_eq!(merged["UNSUB_LINK"], json!("[[UNSUB]]"));
    }

    #[test]
    fn test_parse_context_data() {
        let data = parse_context_data(r#"{"name": "Ada", "items": [1, 2]}"#).unwrap();
        assert_eq!(data["name"], json!("Ada"));

        let err = parse_context_data("[1, 2]").unwrap_err();
        assert!(err.to_string().contains("an array"));
        assert!(matches!(
            parse_context_data("{"),
            Err(PreviewError::ContextData(_))
        ));
    }
}
