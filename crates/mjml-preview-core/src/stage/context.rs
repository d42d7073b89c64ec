/*
 * stage/context.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Stage execution context (the "activation frame" pattern).
 */

//! Stage execution context.
//!
//! The [`StageContext`] is the owned context passed to all pipeline stages.
//! All data is owned rather than borrowed from the [`RenderContext`], so
//! stage futures carry no lifetimes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::observer::{NoopObserver, PipelineObserver};
use crate::config::ValidationLevel;
use crate::pipeline::RenderOptions;
use crate::render::RenderContext;

/// Owned context passed to all pipeline stages.
///
/// One context is built per render attempt and dropped when the render
/// returns. Nothing in it is shared between renders.
pub struct StageContext {
    // === Render inputs ===
    pub source_path: PathBuf,

    /// Variables for template expansion and localization.
    pub context_data: Map<String, Value>,

    pub minify: bool,
    pub beautify: bool,

    // === Pipeline options ===
    pub locale: String,
    pub validation_level: ValidationLevel,

    // === Mutable state ===
    /// Non-fatal issues collected during execution
    pub warnings: Vec<String>,

    // === Observation ===
    pub observer: Arc<dyn PipelineObserver>,
}

impl StageContext {
    pub fn new(render: &RenderContext, options: &RenderOptions) -> Self {
        Self {
            source_path: render.source_path.clone(),
            context_data: render.context_data.clone(),
            minify: render.minify,
            beautify: render.beautify,
            locale: options.locale.clone(),
            validation_level: options.validation_level,
            warnings: Vec::new(),
            observer: Arc::new(NoopObserver),
        }
    }

    /// Set a custom observer for tracing and progress.
    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Directory containing the source document.
    pub fn source_dir(&self) -> PathBuf {
        match self.source_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

impl std::fmt::Debug for StageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageContext")
            .field("source_path", &self.source_path)
            .field("locale", &self.locale)
            .field("validation_level", &self.validation_level)
            .field("warnings", &self.warnings)
            .finish_non_exhaustive()
    }
}
