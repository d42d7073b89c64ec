/*
 * stage/error.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Pipeline error types.
 */

//! Error types for the render pipeline.
//!
//! [`PipelineError`] is what stages return; it never leaves the crate's
//! render boundary, where [`PipelineError::into_failure`] turns it into a
//! [`RenderFailure`]. [`PipelineValidationError`] reports stages that do not
//! compose.

use super::data::PipelineDataKind;
use crate::render::RenderFailure;

/// Error that occurs during pipeline validation (construction).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineValidationError {
    /// Pipeline has no stages
    Empty,

    /// Stage output type doesn't match next stage's input type
    TypeMismatch {
        stage_a: String,
        stage_b: String,
        output: PipelineDataKind,
        input: PipelineDataKind,
    },

    /// The pipeline does not go from `Source` to `Linked`.
    Endpoints {
        input: PipelineDataKind,
        output: PipelineDataKind,
    },
}

impl std::fmt::Display for PipelineValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineValidationError::Empty => write!(f, "Pipeline has no stages"),
            PipelineValidationError::TypeMismatch {
                stage_a,
                stage_b,
                output,
                input,
            } => write!(
                f,
                "Type mismatch: stage '{}' produces {} but stage '{}' expects {}",
                stage_a, output, stage_b, input
            ),
            PipelineValidationError::Endpoints { input, output } => write!(
                f,
                "A render pipeline must take {} and produce {}, this one takes {} and produces {}",
                PipelineDataKind::Source,
                PipelineDataKind::Linked,
                input,
                output
            ),
        }
    }
}

impl std::error::Error for PipelineValidationError {}

/// Error that occurs during pipeline execution.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Wrong input type for stage
    UnexpectedInput {
        stage: String,
        expected: PipelineDataKind,
        got: PipelineDataKind,
    },

    /// A stage failed; `failure` is what the user will see.
    StageFailed {
        stage: String,
        failure: RenderFailure,
    },
}

impl PipelineError {
    pub fn unexpected_input(
        stage: impl Into<String>,
        expected: PipelineDataKind,
        got: PipelineDataKind,
    ) -> Self {
        Self::UnexpectedInput {
            stage: stage.into(),
            expected,
            got,
        }
    }

    pub fn stage_failed(stage: impl Into<String>, failure: RenderFailure) -> Self {
        Self::StageFailed {
            stage: stage.into(),
            failure,
        }
    }

    /// Convert into the failure shown to the user.
    pub fn into_failure(self) -> RenderFailure {
        match self {
            PipelineError::StageFailed { failure, .. } => failure,
            other => RenderFailure::Message(other.to_string()),
        }
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::UnexpectedInput {
                stage,
                expected,
                got,
            } => write!(
                f,
                "Stage '{}' expected input type {} but got {}",
                stage, expected, got
            ),
            PipelineError::StageFailed { stage, failure } => {
                write!(f, "Stage '{}' failed: {}", stage, failure)
            }
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::StageFailed { failure, .. } => Some(failure),
            PipelineError::UnexpectedInput { .. } => None,
        }
    }
}
