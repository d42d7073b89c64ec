/*
 * pipeline.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * The standard MJML render pipeline.
 */

//! The standard render pipeline.
//!
//! ## Pipeline Stages
//!
//! 1. **Expand template**: source → expanded text (strict variables, HTML escaping)
//! 2. **Localize**: expanded → localized text (translations, expressions)
//! 3. **Compile markup**: localized MJML → HTML
//! 4. **Fix links**: relative resource links → `file://` URLs
//!
//! ## Usage
//!
//! ```ignore
//! use mjml_preview_core::pipeline::RenderPipeline;
//! use mjml_preview_core::render::{RenderContext, Renderer};
//!
//! let pipeline = RenderPipeline::from_config(&config);
//! let result = pipeline.render(&RenderContext::new(text, "mail/welcome.mjml")).await;
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::compiler::{MarkupCompiler, MjmlCliCompiler};
use crate::config::{PreviewConfig, ValidationLevel};
use crate::links::{FileUrlResolver, ResourceResolver};
use crate::localize::{CatalogLocalizer, Localizer};
use crate::render::{RenderContext, RenderFailure, RenderResult, Renderer};
use crate::stage::{
    CompileMarkupStage, ExpandTemplateStage, FixLinksStage, LocalizeStage, Pipeline, PipelineData,
    PipelineDataKind, PipelineObserver, PipelineStage, PipelineValidationError, StageContext,
    TracingObserver,
};
use crate::template::{MiniJinjaEngine, TemplateEngine};

/// Options that apply to every render of a pipeline, as opposed to the
/// per-render [`RenderContext`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub locale: String,
    pub validation_level: ValidationLevel,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            locale: "de".to_string(),
            validation_level: ValidationLevel::Skip,
        }
    }
}

impl RenderOptions {
    pub fn from_config(config: &PreviewConfig) -> Self {
        Self {
            locale: config.locale.clone(),
            validation_level: config.validation_level,
        }
    }
}

/// Build the standard render pipeline.
///
/// # Panics
///
/// Panics if the pipeline stages have incompatible types (should never happen
/// with the standard stages).
pub fn build_render_pipeline(
    engine: Arc<dyn TemplateEngine>,
    localizer: Arc<dyn Localizer>,
    compiler: Arc<dyn MarkupCompiler>,
    resolver: Arc<dyn ResourceResolver>,
) -> Pipeline {
    let stages: Vec<Box<dyn PipelineStage>> = vec![
        Box::new(ExpandTemplateStage::new(engine)),
        Box::new(LocalizeStage::new(localizer)),
        Box::new(CompileMarkupStage::new(compiler)),
        Box::new(FixLinksStage::new(resolver)),
    ];

    Pipeline::new(stages).expect("render pipeline stages should be compatible")
}

/// A [`Renderer`] that runs a validated stage pipeline.
///
/// Every error is converted into a [`RenderFailure`] here and nowhere else.
pub struct RenderPipeline {
    pipeline: Pipeline,
    options: RenderOptions,
    observer: Arc<dyn PipelineObserver>,
}

impl RenderPipeline {
    pub fn new(
        engine: Arc<dyn TemplateEngine>,
        localizer: Arc<dyn Localizer>,
        compiler: Arc<dyn MarkupCompiler>,
        resolver: Arc<dyn ResourceResolver>,
        options: RenderOptions,
    ) -> Self {
        Self {
            pipeline: build_render_pipeline(engine, localizer, compiler, resolver),
            options,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Use a custom stage sequence. It must take `Source` and produce `Linked`.
    pub fn from_stages(
        stages: Vec<Box<dyn PipelineStage>>,
        options: RenderOptions,
    ) -> Result<Self, PipelineValidationError> {
        let pipeline = Pipeline::new(stages)?;
        if pipeline.expected_input() != PipelineDataKind::Source
            || pipeline.expected_output() != PipelineDataKind::Linked
        {
            return Err(PipelineValidationError::Endpoints {
                input: pipeline.expected_input(),
                output: pipeline.expected_output(),
            });
        }
        Ok(Self {
            pipeline,
            options,
            observer: Arc::new(TracingObserver),
        })
    }

    /// The default engines, configured from `config`.
    pub fn from_config(config: &PreviewConfig) -> Self {
        Self::new(
            Arc::new(MiniJinjaEngine::new()),
            Arc::new(CatalogLocalizer::new(config.catalogs.clone())),
            Arc::new(MjmlCliCompiler::from_config(config)),
            Arc::new(FileUrlResolver),
            RenderOptions::from_config(config),
        )
    }

    /// Same stages with a different compiler. Used where the `mjml` binary
    /// is replaced, as in tests.
    pub fn from_config_with_compiler(
        config: &PreviewConfig,
        compiler: Arc<dyn MarkupCompiler>,
    ) -> Self {
        Self::new(
            Arc::new(MiniJinjaEngine::new()),
            Arc::new(CatalogLocalizer::new(config.catalogs.clone())),
            compiler,
            Arc::new(FileUrlResolver),
            RenderOptions::from_config(config),
        )
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.pipeline.stage_names()
    }
}

#[async_trait]
impl Renderer for RenderPipeline {
    async fn render(&self, ctx: &RenderContext) -> RenderResult {
        let mut stage_ctx = StageContext::new(ctx, &self.options).with_observer(self.observer.clone());
        let input = PipelineData::Source(ctx.source_text.clone());

        let result = self.pipeline.run(input, &mut stage_ctx).await;

        for warning in &stage_ctx.warnings {
            tracing::warn!(source = %ctx.source_path.display(), "{}", warning);
        }

        match result {
            Ok(PipelineData::Linked(markup)) => RenderResult::success(markup),
            Ok(other) => RenderResult::Failure(RenderFailure::message(format!(
                "Pipeline produced {} instead of {}",
                other.kind(),
                PipelineDataKind::Linked
            ))),
            Err(e) => RenderResult::Failure(e.into_failure()),
        }
    }
}
