/*
 * stage/observer.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Pipeline observer for tracing and instrumentation.
 */

//! Observer abstraction for pipeline execution events.
//!
//! The pipeline reports stage progress through [`PipelineObserver`] so it
//! does not depend on any particular logging setup. [`TracingObserver`]
//! forwards to `tracing`; tests plug in recording observers.

use std::path::Path;
use std::time::Duration;

use super::error::PipelineError;

/// Event severity level for pipeline events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Trace,
    Debug,
    Info,
    Warn,
}

impl EventLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventLevel::Trace => "trace",
            EventLevel::Debug => "debug",
            EventLevel::Info => "info",
            EventLevel::Warn => "warn",
        }
    }
}

/// Observer for pipeline execution events.
///
/// All methods have empty default implementations.
pub trait PipelineObserver: Send + Sync {
    /// Called once per render, before the first stage.
    fn on_pipeline_start(&self, _source: &Path, _total_stages: usize) {}

    fn on_stage_start(&self, _name: &str, _index: usize, _total: usize) {}

    fn on_stage_complete(&self, _name: &str, _index: usize, _elapsed: Duration) {}

    fn on_stage_error(&self, _name: &str, _index: usize, _error: &PipelineError) {}

    /// Free-form events emitted by stages through [`trace_event!`](crate::trace_event).
    fn on_event(&self, _message: &str, _level: EventLevel) {}

    fn on_pipeline_complete(&self, _elapsed: Duration) {}

    fn on_pipeline_error(&self, _error: &PipelineError) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Observer that emits `tracing` events.
///
/// Renders run on every save (and possibly every keystroke), so stage
/// progress is logged at debug level; failures are logged as errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_pipeline_start(&self, source: &Path, total_stages: usize) {
        tracing::debug!(source = %source.display(), total_stages, "Starting render");
    }

    fn on_stage_start(&self, name: &str, index: usize, total: usize) {
        tracing::debug!(
            stage.name = name,
            stage.index = index,
            stage.total = total,
            "Starting stage"
        );
    }

    fn on_stage_complete(&self, name: &str, index: usize, elapsed: Duration) {
        tracing::debug!(
            stage.name = name,
            stage.index = index,
            elapsed_ms = elapsed.as_millis() as u64,
            "Completed stage"
        );
    }

    fn on_stage_error(&self, name: &str, index: usize, error: &PipelineError) {
        tracing::error!(
            stage.name = name,
            stage.index = index,
            error = %error,
            "Stage failed"
        );
    }

    fn on_event(&self, message: &str, level: EventLevel) {
        match level {
            EventLevel::Trace => tracing::trace!("{}", message),
            EventLevel::Debug => tracing::debug!("{}", message),
            EventLevel::Info => tracing::info!("{}", message),
            EventLevel::Warn => tracing::warn!("{}", message),
        }
    }

    fn on_pipeline_complete(&self, elapsed: Duration) {
        tracing::debug!(elapsed_ms = elapsed.as_millis() as u64, "Render completed");
    }
}

/// Emit an event through a stage context's observer.
///
/// ```ignore
/// trace_event!(ctx, EventLevel::Debug, "Extracted {} style blocks", styles.len());
/// ```
#[macro_export]
macro_rules! trace_event {
    ($ctx:expr, $level:expr, $($arg:tt)*) => {{
        $ctx.observer.on_event(&format!($($arg)*), $level);
    }};
}
