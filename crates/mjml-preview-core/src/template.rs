/*
 * template.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Template expansion engine.
 */

//! Template expansion.
//!
//! [`MiniJinjaEngine`] renders the source with undefined variables treated
//! as errors and every interpolated value HTML-escaped. `{% include %}` and
//! `{% extends %}` resolve against the source document's directory.

use std::path::Path;

use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use serde_json::{Map, Value};
use thiserror::Error;

/// A positioned template failure.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct TemplateError {
    pub message: String,
    /// 1-based line in the expanded template.
    pub line: Option<usize>,
    /// Engine-provided rendering of the failing region.
    pub detail: Option<String>,
    /// Name of the template that failed; differs from the source for includes.
    pub template: Option<String>,
}

impl TemplateError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
            detail: None,
            template: None,
        }
    }
}

pub trait TemplateEngine: Send + Sync {
    fn expand(
        &self,
        text: &str,
        data: &Map<String, Value>,
        source_path: &Path,
    ) -> Result<String, TemplateError>;
}

/// Template engine backed by `minijinja`.
///
/// A new environment is built for each call, so nothing loaded for one
/// render (included files in particular) is reused by the next.
#[derive(Debug, Clone, Copy, Default)]
pub struct MiniJinjaEngine;

impl MiniJinjaEngine {
    pub fn new() -> Self {
        Self
    }

    fn environment<'source>(source_path: &Path) -> Environment<'source> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_auto_escape_callback(|_| AutoEscape::Html);
        env.set_keep_trailing_newline(true);
        if let Some(dir) = source_path.parent() {
            let dir = if dir.as_os_str().is_empty() {
                Path::new(".")
            } else {
                dir
            };
            env.set_loader(minijinja::path_loader(dir));
        }
        env
    }
}

impl TemplateEngine for MiniJinjaEngine {
    fn expand(
        &self,
        text: &str,
        data: &Map<String, Value>,
        source_path: &Path,
    ) -> Result<String, TemplateError> {
        let name = source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "template".to_string());
        let env = Self::environment(source_path);

        let template = env
            .template_from_named_str(name.as_str(), text)
            .map_err(from_minijinja)?;
        template.render(data).map_err(from_minijinja)
    }
}

fn from_minijinja(err: minijinja::Error) -> TemplateError {
    let message = match err.detail() {
        Some(detail) => format!("{}: {}", err.kind(), detail),
        None => err.kind().to_string(),
    };
    let detail = format!("{}", err.display_debug_info());
    TemplateError {
        message,
        line: err.line(),
        detail: (!detail.trim().is_empty()).then_some(detail),
        template: err.name().map(str::to_string),
    }
}
