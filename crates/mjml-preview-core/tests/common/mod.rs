/*
 * tests/common/mod.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Shared fakes for integration tests.
 */

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use mjml_preview_core::compiler::{
    CompileOptions, CompileOutput, CompilerDiagnostic, CompilerError, MarkupCompiler,
};
use mjml_preview_core::stage::NoopObserver;
use mjml_preview_core::{PreviewConfig, RenderContext, RenderPipeline, RenderResult, Renderer};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

/// Wraps its input in `<html>` and remembers every input it saw.
#[derive(Default)]
pub struct RecordingCompiler {
    pub inputs: Mutex<Vec<String>>,
    /// Diagnostics to report as `(line, message)`.
    pub diagnostics: Vec<(usize, &'static str)>,
}

impl RecordingCompiler {
    pub fn failing(diagnostics: Vec<(usize, &'static str)>) -> Self {
        Self {
            inputs: Mutex::new(Vec::new()),
            diagnostics,
        }
    }
}

#[async_trait]
impl MarkupCompiler for RecordingCompiler {
    async fn compile(
        &self,
        text: &str,
        options: &CompileOptions,
    ) -> Result<CompileOutput, CompilerError> {
        self.inputs.lock().push(text.to_string());
        let file = options
            .file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let errors = self
            .diagnostics
            .iter()
            .map(|(line, message)| CompilerDiagnostic {
                line: Some(*line),
                message: message.to_string(),
                tag_name: Some("mj-text".to_string()),
                formatted_message: format!("Line {} of {} (mj-text) — {}", line, file, message),
            })
            .collect();
        Ok(CompileOutput {
            html: Some(format!("<html>{}</html>", text)),
            errors,
        })
    }
}

pub fn pipeline_with(compiler: Arc<RecordingCompiler>) -> RenderPipeline {
    RenderPipeline::from_config_with_compiler(&PreviewConfig::default(), compiler)
        .with_observer(Arc::new(NoopObserver))
}

/// Blocks every render until a permit is released, tracking how many
/// renders run at once.
pub struct GatedRenderer {
    pub gate: Semaphore,
    pub renders: AtomicUsize,
    pub active: AtomicUsize,
    pub max_active: AtomicUsize,
}

impl Default for GatedRenderer {
    fn default() -> Self {
        Self {
            gate: Semaphore::new(0),
            renders: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }
}

impl GatedRenderer {
    pub fn release(&self, permits: usize) {
        self.gate.add_permits(permits);
    }

    pub fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Renderer for GatedRenderer {
    async fn render(&self, ctx: &RenderContext) -> RenderResult {
        let n = self.renders.fetch_add(1, Ordering::SeqCst) + 1;
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        if let Ok(permit) = self.gate.acquire().await {
            permit.forget();
        }

        self.active.fetch_sub(1, Ordering::SeqCst);
        RenderResult::success(format!("render {} of {}", n, ctx.source_text))
    }
}

/// Twelve numbered MJML-ish lines.
pub fn twelve_lines() -> String {
    (1..=12)
        .map(|i| format!("<mj-text>line {}</mj-text>", i))
        .collect::<Vec<_>>()
        .join("\n")
}
