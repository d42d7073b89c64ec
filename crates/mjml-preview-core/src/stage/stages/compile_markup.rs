/*
 * stage/stages/compile_markup.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Compile the localized MJML document to HTML.
 */

use std::sync::Arc;

use async_trait::async_trait;

use crate::compiler::{CompileOptions, MarkupCompiler};
use crate::render::{CompileError, RenderFailure};
use crate::stage::{
    EventLevel, PipelineData, PipelineDataKind, PipelineError, PipelineStage, StageContext,
};
use crate::trace_event;

/// Run the markup compiler on the localized text.
///
/// Compiler errors win over any HTML produced alongside them. The
/// resulting failure keeps the exact text the compiler saw, since that is
/// what its line numbers count.
pub struct CompileMarkupStage {
    compiler: Arc<dyn MarkupCompiler>,
}

impl CompileMarkupStage {
    pub fn new(compiler: Arc<dyn MarkupCompiler>) -> Self {
        Self { compiler }
    }

    fn options(ctx: &StageContext) -> CompileOptions {
        CompileOptions {
            level: ctx.validation_level,
            file_path: ctx.source_path.clone(),
            minify: ctx.minify,
            beautify: ctx.beautify,
            cwd: ctx.source_dir(),
        }
    }
}

#[async_trait]
impl PipelineStage for CompileMarkupStage {
    fn name(&self) -> &str {
        "compile-markup"
    }

    fn input_kind(&self) -> PipelineDataKind {
        PipelineDataKind::Localized
    }

    fn output_kind(&self) -> PipelineDataKind {
        PipelineDataKind::Compiled
    }

    async fn run(
        &self,
        input: PipelineData,
        ctx: &mut StageContext,
    ) -> Result<PipelineData, PipelineError> {
        let PipelineData::Localized(text) = input else {
            return Err(PipelineError::unexpected_input(
                self.name(),
                self.input_kind(),
                input.kind(),
            ));
        };

        let options = Self::options(ctx);
        let output = self
            .compiler
            .compile(&text, &options)
            .await
            .map_err(|err| {
                PipelineError::stage_failed(self.name(), RenderFailure::message(err.to_string()))
            })?;

        if !output.errors.is_empty() {
            trace_event!(
                ctx,
                EventLevel::Debug,
                "compiler reported {} error(s)",
                output.errors.len()
            );
            let errors = output.errors.into_iter().map(CompileError::from).collect();
            return Err(PipelineError::stage_failed(
                self.name(),
                RenderFailure::Compilation {
                    errors,
                    input: text,
                },
            ));
        }

        match output.html {
            Some(html) if !html.trim().is_empty() => Ok(PipelineData::Compiled(html)),
            _ => Err(PipelineError::stage_failed(
                self.name(),
                RenderFailure::EmptyOutput,
            )),
        }
    }
}
