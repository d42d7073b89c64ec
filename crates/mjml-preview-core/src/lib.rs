/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Render pipeline and live preview synchronization for MJML documents.
 */

//! Render pipeline and live preview synchronization for MJML documents.
//!
//! # Architecture
//!
//! - [`IdentityRegistry`] - Binds each source document to one preview artifact
//! - [`RenderPipeline`] - Template expansion, localization, compilation and link fixing
//! - [`RenderCache`] - Latest result per document, at most one render in flight
//! - [`diagnostics`] - Turns a [`RenderFailure`] into a displayable page
//! - [`PreviewSession`] - Drives all of the above from host events
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use mjml_preview_core::{
//!     Document, IdentityRegistry, PreviewConfig, PreviewSession, RenderPipeline,
//! };
//!
//! let config = PreviewConfig::discover(dir)?;
//! let session = PreviewSession::new(
//!     config.clone(),
//!     Arc::new(IdentityRegistry::new()),
//!     Arc::new(RenderPipeline::from_config(&config)),
//!     host,
//! );
//! session.preview(Document::infer(path, text)).await;
//! ```

pub mod cache;
pub mod compiler;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod identity;
pub mod links;
pub mod localize;
pub mod pipeline;
pub mod registry;
pub mod render;
pub mod session;
pub mod stage;
pub mod template;

// Re-export commonly used types
pub use cache::{RenderCache, RenderSlot};
pub use config::{CONFIG_FILE_NAME, PreviewConfig, ValidationLevel, parse_context_data};
pub use diagnostics::{Excerpt, format_failure};
pub use error::{HostError, PreviewError, Result};
pub use identity::{PreviewId, SourceId};
pub use pipeline::{RenderOptions, RenderPipeline, build_render_pipeline};
pub use registry::{IdentityRegistry, RegistryEntry};
pub use render::{CompileError, RenderContext, RenderFailure, RenderResult, Renderer};
pub use session::{
    BindingState, DisplayHints, Document, HostEvent, NOT_MJML_MESSAGE, PreviewHost, PreviewSession,
};
