/*
 * stage/stages/expand_template.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Expand template syntax in the source document.
 */

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::render::{CompileError, RenderFailure};
use crate::stage::{
    EventLevel, PipelineData, PipelineDataKind, PipelineError, PipelineStage, StageContext,
};
use crate::template::{TemplateEngine, TemplateError};
use crate::trace_event;

/// Expand the source text with the render's context data.
///
/// Undefined variables fail the render. The failure's line refers to the
/// source text, which is the text the user edits.
pub struct ExpandTemplateStage {
    engine: Arc<dyn TemplateEngine>,
}

impl ExpandTemplateStage {
    pub fn new(engine: Arc<dyn TemplateEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl PipelineStage for ExpandTemplateStage {
    fn name(&self) -> &str {
        "expand-template"
    }

    fn input_kind(&self) -> PipelineDataKind {
        PipelineDataKind::Source
    }

    fn output_kind(&self) -> PipelineDataKind {
        PipelineDataKind::Expanded
    }

    async fn run(
        &self,
        input: PipelineData,
        ctx: &mut StageContext,
    ) -> Result<PipelineData, PipelineError> {
        let PipelineData::Source(text) = input else {
            return Err(PipelineError::unexpected_input(
                self.name(),
                self.input_kind(),
                input.kind(),
            ));
        };

        trace_event!(
            ctx,
            EventLevel::Debug,
            "expanding {} bytes with {} variables",
            text.len(),
            ctx.context_data.len()
        );

        match self.engine.expand(&text, &ctx.context_data, &ctx.source_path) {
            Ok(expanded) => Ok(PipelineData::Expanded(expanded)),
            Err(err) => Err(PipelineError::stage_failed(
                self.name(),
                RenderFailure::TemplateExpansion(to_compile_error(err)),
            )),
        }
    }
}

fn to_compile_error(err: TemplateError) -> CompileError {
    let raw = json!({
        "message": err.message,
        "line": err.line,
        "template": err.template,
    });
    let error = CompileError::new(err.message)
        .with_line(err.line)
        .with_raw(raw);
    match err.detail {
        Some(detail) => error.with_detail(detail),
        None => error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::stages::test_support::context;
    use crate::template::MiniJinjaEngine;
    use serde_json::json;

    #[tokio::test]
    async fn test_expands_source() {
        let stage = ExpandTemplateStage::new(Arc::new(MiniJinjaEngine::new()));
        let mut ctx = context("/mail/a.mjml");
        ctx.context_data.insert("name".to_string(), json!("Ada"));

        let out = stage
            .run(PipelineData::Source("Hi {{ name }}".to_string()), &mut ctx)
            .await
            .unwrap();
        assert_eq!(out, PipelineData::Expanded("Hi Ada".to_string()));
    }

    #[tokio::test]
    async fn test_undefined_variable_fails_at_line_one() {
        let stage = ExpandTemplateStage::new(Arc::new(MiniJinjaEngine::new()));
        let mut ctx = context("/mail/a.mjml");

        let err = stage
            .run(PipelineData::Source("{{ x }}".to_string()), &mut ctx)
            .await
            .unwrap_err();

        let RenderFailure::TemplateExpansion(error) = err.into_failure() else {
            panic!("expected a template expansion failure");
        };
        assert_eq!(error.line, Some(1));
        assert_eq!(error.raw["line"], 1);
    }

    #[tokio::test]
    async fn test_rejects_wrong_input() {
        let stage = ExpandTemplateStage::new(Arc::new(MiniJinjaEngine::new()));
        let mut ctx = context("a.mjml");
        let err = stage
            .run(PipelineData::Compiled(String::new()), &mut ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnexpectedInput { .. }));
    }
}
