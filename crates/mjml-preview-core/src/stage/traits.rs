/*
 * stage/traits.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * PipelineStage trait definition.
 */

//! Pipeline stage trait.
//!
//! The [`PipelineStage`] trait defines the interface for all pipeline stages.
//! Each stage is one transformation step of a render.

use async_trait::async_trait;

use super::context::StageContext;
use super::data::{PipelineData, PipelineDataKind};
use super::error::PipelineError;

/// A single stage in the render pipeline.
///
/// Stages transform [`PipelineData`] from one form to another.
/// Each stage declares its expected input and output types, enabling
/// runtime validation of pipeline composition.
///
/// Stages may hold their collaborators (a template engine, a compiler) but
/// no mutable state between runs: anything a render accumulates goes in
/// the [`StageContext`]. Renders of different documents run concurrently
/// on the same stage instances.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use mjml_preview_core::stage::{
///     PipelineStage, PipelineData, PipelineDataKind, PipelineError, StageContext,
/// };
///
/// pub struct Uppercase;
///
/// #[async_trait]
/// impl PipelineStage for Uppercase {
///     fn name(&self) -> &str { "uppercase" }
///     fn input_kind(&self) -> PipelineDataKind { PipelineDataKind::Compiled }
///     fn output_kind(&self) -> PipelineDataKind { PipelineDataKind::Compiled }
///
///     async fn run(
///         &self,
///         input: PipelineData,
///         _ctx: &mut StageContext,
///     ) -> Result<PipelineData, PipelineError> {
///         let PipelineData::Compiled(html) = input else {
///             return Err(PipelineError::unexpected_input(
///                 self.name(),
///                 self.input_kind(),
///                 input.kind(),
///             ));
///         };
///         Ok(PipelineData::Compiled(html.to_uppercase()))
///     }
/// }
/// ```
#[async_trait]
pub trait PipelineStage: Send + Sync {
    /// Human-readable name for logging and error messages.
    fn name(&self) -> &str;

    /// What input type this stage expects.
    fn input_kind(&self) -> PipelineDataKind;

    /// What output type this stage produces.
    fn output_kind(&self) -> PipelineDataKind;

    /// Run the stage.
    ///
    /// A stage that cannot produce its output returns
    /// [`PipelineError::StageFailed`] with the failure the user should see;
    /// the remaining stages are skipped. Non-fatal issues go in
    /// `ctx.warnings` instead.
    async fn run(
        &self,
        input: PipelineData,
        ctx: &mut StageContext,
    ) -> Result<PipelineData, PipelineError>;
}
