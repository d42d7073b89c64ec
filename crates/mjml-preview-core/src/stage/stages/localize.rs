/*
 * stage/stages/localize.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Localize the expanded document.
 */

//! Localization stage.
//!
//! `<mj-style>` bodies are CSS and would not survive expression
//! evaluation (every `{` opens an expression). They are cut out before the
//! localizer runs and put back, unchanged, into the empty style blocks of
//! its output.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::{Captures, Regex};
use serde_json::json;

use crate::localize::Localizer;
use crate::render::{CompileError, RenderFailure};
use crate::stage::{
    EventLevel, PipelineData, PipelineDataKind, PipelineError, PipelineStage, StageContext,
};
use crate::trace_event;

static STYLE_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)(<mj-style\b[^>]*>)(.*?)(</mj-style\s*>)").expect("valid regex")
});

static EMPTY_STYLE_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)(<mj-style\b[^>]*>)(\s*)(</mj-style\s*>)").expect("valid regex")
});

/// Escaped apostrophes left behind by template expansion.
const APOSTROPHE_ENTITIES: [&str; 2] = ["&#39;", "&#x27;"];

/// Translate and evaluate embedded UI-description markup.
///
/// Failures carry no line: by this point the text no longer lines up with
/// anything the user wrote.
pub struct LocalizeStage {
    localizer: Arc<dyn Localizer>,
}

impl LocalizeStage {
    pub fn new(localizer: Arc<dyn Localizer>) -> Self {
        Self { localizer }
    }
}

#[async_trait]
impl PipelineStage for LocalizeStage {
    fn name(&self) -> &str {
        "localize"
    }

    fn input_kind(&self) -> PipelineDataKind {
        PipelineDataKind::Expanded
    }

    fn output_kind(&self) -> PipelineDataKind {
        PipelineDataKind::Localized
    }

    async fn run(
        &self,
        input: PipelineData,
        ctx: &mut StageContext,
    ) -> Result<PipelineData, PipelineError> {
        let PipelineData::Expanded(text) = input else {
            return Err(PipelineError::unexpected_input(
                self.name(),
                self.input_kind(),
                input.kind(),
            ));
        };

        let (stripped, styles) = extract_styles(&text);
        let stripped = APOSTROPHE_ENTITIES
            .iter()
            .fold(stripped, |acc, entity| acc.replace(entity, "'"));

        trace_event!(
            ctx,
            EventLevel::Debug,
            "localizing for {} with {} style block(s) held back",
            ctx.locale,
            styles.len()
        );

        let translated = self
            .localizer
            .translate(&stripped, &ctx.locale, &ctx.context_data)
            .map_err(|err| {
                let message = err.to_string();
                let raw = json!({ "message": message, "locale": ctx.locale });
                PipelineError::stage_failed(
                    self.name(),
                    RenderFailure::Localization(CompileError::new(message).with_raw(raw)),
                )
            })?;

        let (restored, filled) = restore_styles(&translated, &styles);
        if filled != styles.len() {
            let message = format!(
                "{} of {} <mj-style> block(s) could not be restored after localization",
                styles.len() - filled,
                styles.len()
            );
            trace_event!(ctx, EventLevel::Warn, "{}", message);
            ctx.add_warning(message);
        }

        Ok(PipelineData::Localized(restored))
    }
}

/// Empty every `<mj-style>` block, returning the bodies in document order.
fn extract_styles(text: &str) -> (String, Vec<String>) {
    let mut bodies = Vec::new();
    let stripped = STYLE_BLOCK_RE.replace_all(text, |caps: &Captures| {
        bodies.push(caps[2].to_string());
        format!("{}{}", &caps[1], &caps[3])
    });
    (stripped.into_owned(), bodies)
}

/// Fill the empty `<mj-style>` blocks of `text` with `bodies`, in order.
/// Returns the new text and how many bodies were placed.
fn restore_styles(text: &str, bodies: &[String]) -> (String, usize) {
    if bodies.is_empty() {
        return (text.to_string(), 0);
    }
    let mut next = 0;
    let restored = EMPTY_STYLE_BLOCK_RE.replace_all(text, |caps: &Captures| {
        let Some(body) = bodies.get(next) else {
            return caps[0].to_string();
        };
        next += 1;
        format!("{}{}{}", &caps[1], body, &caps[3])
    });
    (restored.into_owned(), next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::localize::{CatalogLocalizer, Catalogs, LocalizeError};
    use crate::stage::stages::test_support::context;
    use pretty_assertions::assert_eq;
    use serde_json::{Map, Value};
    use std::collections::BTreeMap;

    const MAIL: &str = r#"<mjml>
<mj-head>
<mj-style inline="inline">
.title { color: red; }
</mj-style>
</mj-head>
<mj-body><mj-text>{name}</mj-text></mj-body>
</mjml>"#;

    struct Uppercase;

    impl Localizer for Uppercase {
        fn translate(&self, text: &str, _locale: &str, _data: &Map<String, Value>) -> crate::localize::Result<String> {
            Ok(text.to_uppercase())
        }
    }

    struct Broken;

    impl Localizer for Broken {
        fn translate(&self, _text: &str, _locale: &str, _data: &Map<String, Value>) -> crate::localize::Result<String> {
            Err(LocalizeError::UnknownIdentifier("user".to_string()))
        }
    }

    /// Drops every style block from its output.
    struct StyleEater;

    impl Localizer for StyleEater {
        fn translate(&self, text: &str, _locale: &str, _data: &Map<String, Value>) -> crate::localize::Result<String> {
            Ok(STYLE_BLOCK_RE.replace_all(text, "").into_owned())
        }
    }

    #[test]
    fn test_extract_and_restore() {
        let (stripped, bodies) = extract_styles(MAIL);
        assert_eq!(bodies, vec!["\n.title { color: red; }\n".to_string()]);
        assert!(stripped.contains(r#"<mj-style inline="inline"></mj-style>"#));
        assert!(!stripped.contains(".title"));

        let (restored, filled) = restore_styles(&stripped, &bodies);
        assert_eq!(filled, 1);
        assert_eq!(restored, MAIL);
    }

    #[test]
    fn test_multiple_style_blocks_keep_order() {
        let text = "<mj-style>a{}</mj-style><mj-style>b{}</mj-style>";
        let (stripped, bodies) = extract_styles(text);
        assert_eq!(stripped, "<mj-style></mj-style><mj-style></mj-style>");
        let (restored, filled) = restore_styles(&stripped, &bodies);
        assert_eq!(filled, 2);
        assert_eq!(restored, text);
    }

    #[tokio::test]
    async fn test_style_body_skips_localizer() {
        let stage = LocalizeStage::new(Arc::new(Uppercase));
        let mut ctx = context("/mail/a.mjml");

        let out = stage
            .run(PipelineData::Expanded(MAIL.to_string()), &mut ctx)
            .await
            .unwrap()
            .into_text();

        assert!(out.contains(".title { color: red; }"));
        assert!(out.contains("<MJ-TEXT>{NAME}</MJ-TEXT>"));
        assert!(ctx.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_catalog_localizer_with_styles() {
        let mut catalogs: Catalogs = BTreeMap::new();
        catalogs.insert(
            "de".to_string(),
            BTreeMap::from([("hello".to_string(), "Hallo {name}".to_string())]),
        );
        let stage = LocalizeStage::new(Arc::new(CatalogLocalizer::new(catalogs)));
        let mut ctx = context("/mail/a.mjml");
        ctx.context_data
            .insert("name".to_string(), Value::String("Ada".to_string()));

        let text = "<mj-style>.a { color: blue; }</mj-style><mj-text><Trans id=\"hello\">Hello {name}</Trans></mj-text>";
        let out = stage
            .run(PipelineData::Expanded(text.to_string()), &mut ctx)
            .await
            .unwrap()
            .into_text();

        assert_eq!(
            out,
            "<mj-style>.a { color: blue; }</mj-style><mj-text>Hallo Ada</mj-text>"
        );
    }

    #[tokio::test]
    async fn test_apostrophe_entities_unescaped() {
        let stage = LocalizeStage::new(Arc::new(Uppercase));
        let mut ctx = context("a.mjml");
        let out = stage
            .run(PipelineData::Expanded("it&#39;s &#x27;x&#x27;".to_string()), &mut ctx)
            .await
            .unwrap();
        assert_eq!(out.into_text(), "IT'S 'X'");
    }

    #[tokio::test]
    async fn test_failure_has_no_line() {
        let stage = LocalizeStage::new(Arc::new(Broken));
        let mut ctx = context("a.mjml");
        let err = stage
            .run(PipelineData::Expanded("{user}".to_string()), &mut ctx)
            .await
            .unwrap_err();

        let RenderFailure::Localization(error) = err.into_failure() else {
            panic!("expected a localization failure");
        };
        assert_eq!(error.line, None);
        assert_eq!(error.message, "user is not defined");
    }

    #[tokio::test]
    async fn test_lost_style_block_is_a_warning() {
        let stage = LocalizeStage::new(Arc::new(StyleEater));
        let mut ctx = context("a.mjml");
        let out = stage
            .run(PipelineData::Expanded("<mj-style>a{}</mj-style>x".to_string()), &mut ctx)
            .await
            .unwrap();
        assert_eq!(out.into_text(), "x");
        assert_eq!(ctx.warnings.len(), 1);
    }
}
