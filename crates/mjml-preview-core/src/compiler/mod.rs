/*
 * compiler/mod.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Markup compiler seam.
 */

//! Markup compiler seam.
//!
//! The core does not compile MJML itself. A [`MarkupCompiler`] takes the
//! fully expanded and localized text and returns either HTML or a list of
//! positioned diagnostics. [`MjmlCliCompiler`] drives the `mjml` command-line
//! tool.

mod cli;
mod diagnostics;

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config::ValidationLevel;
use crate::render::CompileError;

pub use cli::{MjmlCliCompiler, find_mjml};
pub use diagnostics::parse_diagnostics;

/// Options handed to the compiler for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOptions {
    pub level: ValidationLevel,
    /// Path of the source document, used in compiler messages and for
    /// resolving `mj-include`.
    pub file_path: PathBuf,
    pub minify: bool,
    pub beautify: bool,
    pub cwd: PathBuf,
}

/// One diagnostic reported by the compiler.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerDiagnostic {
    /// 1-based line in the compiler's input.
    pub line: Option<usize>,
    pub message: String,
    pub tag_name: Option<String>,
    pub formatted_message: String,
}

impl From<CompilerDiagnostic> for CompileError {
    fn from(diagnostic: CompilerDiagnostic) -> Self {
        let raw = serde_json::to_value(&diagnostic).unwrap_or_default();
        CompileError::new(diagnostic.formatted_message)
            .with_line(diagnostic.line)
            .with_raw(raw)
    }
}

/// What the compiler produced. Both fields may be populated at once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompileOutput {
    pub html: Option<String>,
    pub errors: Vec<CompilerDiagnostic>,
}

/// The compiler could not be run at all.
#[derive(Error, Debug)]
pub enum CompilerError {
    #[error("mjml not found: set `mjmlPath`, set MJML_PATH, or install mjml on PATH")]
    NotFound,

    #[error("Failed to start {}: {source}", .binary.display())]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("mjml exited with status {}: {stderr}", .status.map_or_else(|| "unknown".to_string(), |c| c.to_string()))]
    Failed { status: Option<i32>, stderr: String },

    #[error("I/O error talking to mjml: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait MarkupCompiler: Send + Sync {
    async fn compile(
        &self,
        text: &str,
        options: &CompileOptions,
    ) -> Result<CompileOutput, CompilerError>;
}
