/*
 * render.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Render inputs, results and the Renderer seam.
 */

//! Render inputs, results and the [`Renderer`] seam.
//!
//! A render never returns `Err`: every stage failure is captured as a
//! [`RenderFailure`] inside [`RenderResult::Failure`], which is cached and
//! displayed like any other outcome.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Message used when the compiler produced neither output nor errors.
pub const EMPTY_OUTPUT_MESSAGE: &str = "no renderable content";

/// Immutable input for one render attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderContext {
    pub source_text: String,
    pub context_data: Map<String, Value>,
    pub source_path: PathBuf,
    pub minify: bool,
    pub beautify: bool,
}

impl RenderContext {
    pub fn new(source_text: impl Into<String>, source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_text: source_text.into(),
            context_data: Map::new(),
            source_path: source_path.into(),
            minify: false,
            beautify: false,
        }
    }

    pub fn with_context_data(mut self, data: Map<String, Value>) -> Self {
        self.context_data = data;
        self
    }

    pub fn with_minify(mut self, minify: bool) -> Self {
        self.minify = minify;
        self
    }

    pub fn with_beautify(mut self, beautify: bool) -> Self {
        self.beautify = beautify;
        self
    }

    /// Directory containing the source document. Used as the compiler's
    /// working directory and as the base for relative links.
    pub fn source_dir(&self) -> &Path {
        match self.source_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }
}

/// A single diagnostic produced by one of the render stages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompileError {
    pub message: String,

    /// 1-based line, relative to the text the producing stage consumed.
    pub line: Option<usize>,

    /// Positional detail rendered verbatim by the diagnostics formatter.
    pub detail: Option<String>,

    /// The producing engine's own payload.
    pub raw: Value,
}

impl CompileError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
            detail: None,
            raw: Value::Null,
        }
    }

    pub fn with_line(mut self, line: Option<usize>) -> Self {
        self.line = line;
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw = raw;
        self
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {}: {}", line, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Every way a render can fail.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderFailure {
    /// Template expansion failed; the line refers to the source text.
    #[error("Template expansion failed: {0}")]
    TemplateExpansion(CompileError),

    /// Localization or evaluation failed; never positioned.
    #[error("Localization failed: {0}")]
    Localization(CompileError),

    /// The markup compiler reported errors against `input`, the exact text
    /// it was given.
    #[error("Markup compilation failed with {} error(s)", .errors.len())]
    Compilation {
        errors: Vec<CompileError>,
        input: String,
    },

    #[error("{}", EMPTY_OUTPUT_MESSAGE)]
    EmptyOutput,

    /// A bare message with no structure.
    #[error("{0}")]
    Message(String),
}

impl RenderFailure {
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// The text that this failure's line numbers index into, when the
    /// failure carries it.
    pub fn context_text(&self) -> Option<&str> {
        match self {
            RenderFailure::Compilation { input, .. } => Some(input),
            _ => None,
        }
    }
}

/// Outcome of a render attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderResult {
    Success { markup: String },
    Failure(RenderFailure),
}

impl RenderResult {
    pub fn success(markup: impl Into<String>) -> Self {
        Self::Success {
            markup: markup.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RenderResult::Success { .. })
    }

    pub fn failure(&self) -> Option<&RenderFailure> {
        match self {
            RenderResult::Failure(f) => Some(f),
            RenderResult::Success { .. } => None,
        }
    }
}

/// Anything that can turn a [`RenderContext`] into a [`RenderResult`].
///
/// The standard implementation is
/// [`RenderPipeline`](crate::pipeline::RenderPipeline); tests substitute
/// counting or blocking renderers.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, ctx: &RenderContext) -> RenderResult;
}
