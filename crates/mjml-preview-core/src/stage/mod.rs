/*
 * stage/mod.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Render pipeline infrastructure.
 */

//! Render pipeline infrastructure.
//!
//! A render is a sequence of **stages**, each implementing
//! [`PipelineStage`]. Text flows between them as [`PipelineData`], whose
//! variant records how far along the document is:
//!
//! ```text
//! Source → Expanded → Localized → Compiled → Linked
//!        ↑          ↑           ↑          ↑
//!     template   localize    compile    fix links
//! ```
//!
//! # Key Types
//!
//! - [`PipelineData`] - All data types that flow through the pipeline
//! - [`PipelineDataKind`] - Type tags for runtime validation
//! - [`PipelineStage`] - Trait for pipeline stages
//! - [`Pipeline`] - Validated sequence of stages with execution logic
//! - [`StageContext`] - Owned context passed to stages (no lifetime params)
//! - [`PipelineObserver`] - Trait for tracing and instrumentation
//! - [`PipelineError`] - Stage plumbing errors and stage failures
//!
//! Callers normally go through [`RenderPipeline`](crate::pipeline::RenderPipeline),
//! which builds the standard stages and turns every error into a
//! [`RenderResult`](crate::render::RenderResult).

mod context;
mod data;
mod error;
mod observer;
mod pipeline;
pub mod stages;
mod traits;

pub use context::StageContext;
pub use data::{PipelineData, PipelineDataKind};
pub use error::{PipelineError, PipelineValidationError};
pub use observer::{EventLevel, NoopObserver, PipelineObserver, TracingObserver};
pub use pipeline::Pipeline;
pub use traits::PipelineStage;

pub use stages::{CompileMarkupStage, ExpandTemplateStage, FixLinksStage, LocalizeStage};
