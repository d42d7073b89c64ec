/*
 * stage/pipeline.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Pipeline struct for executing stage sequences.
 */

//! Pipeline execution.
//!
//! The [`Pipeline`] struct represents a validated sequence of stages
//! that can be executed together. It handles:
//!
//! - Stage composition validation
//! - Sequential execution with observer notifications
//! - Short-circuiting on the first failing stage

use std::time::Instant;

use super::context::StageContext;
use super::data::{PipelineData, PipelineDataKind};
use super::error::{PipelineError, PipelineValidationError};
use super::traits::PipelineStage;

/// A validated sequence of pipeline stages.
///
/// The pipeline validates that stages compose correctly at construction
/// time, ensuring that each stage's output type matches the next stage's
/// input type.
///
/// ```ignore
/// let pipeline = Pipeline::new(vec![
///     Box::new(ExpandTemplateStage::new(engine)),
///     Box::new(LocalizeStage::new(localizer)),
/// ])?;
/// let localized = pipeline.run(PipelineData::Source(text), &mut ctx).await?;
/// ```
pub struct Pipeline {
    stages: Vec<Box<dyn PipelineStage>>,
    expected_input: PipelineDataKind,
    expected_output: PipelineDataKind,
}

impl Pipeline {
    /// Create a new pipeline from stages.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineValidationError`] if:
    /// - The stages vector is empty
    /// - Adjacent stages have incompatible types
    pub fn new(stages: Vec<Box<dyn PipelineStage>>) -> Result<Self, PipelineValidationError> {
        let (Some(first), Some(last)) = (stages.first(), stages.last()) else {
            return Err(PipelineValidationError::Empty);
        };
        let expected_input = first.input_kind();
        let expected_output = last.output_kind();

        for window in stages.windows(2) {
            let output = window[0].output_kind();
            let input = window[1].input_kind();
            if output != input {
                return Err(PipelineValidationError::TypeMismatch {
                    stage_a: window[0].name().to_string(),
                    stage_b: window[1].name().to_string(),
                    output,
                    input,
                });
            }
        }

        Ok(Self {
            stages,
            expected_input,
            expected_output,
        })
    }

    /// What input type this pipeline expects.
    pub fn expected_input(&self) -> PipelineDataKind {
        self.expected_input
    }

    /// What output type this pipeline produces.
    pub fn expected_output(&self) -> PipelineDataKind {
        self.expected_output
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Always false after construction.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run the pipeline.
    ///
    /// Executes all stages in sequence, passing the output of each stage
    /// as input to the next. The first error stops the run; later stages
    /// never see partial output.
    pub async fn run(
        &self,
        input: PipelineData,
        ctx: &mut StageContext,
    ) -> Result<PipelineData, PipelineError> {
        if input.kind() != self.expected_input {
            return Err(PipelineError::unexpected_input(
                "pipeline",
                self.expected_input,
                input.kind(),
            ));
        }

        let total = self.stages.len();
        let started = Instant::now();
        ctx.observer.on_pipeline_start(&ctx.source_path, total);

        let mut data = input;

        for (idx, stage) in self.stages.iter().enumerate() {
            ctx.observer.on_stage_start(stage.name(), idx, total);
            let stage_started = Instant::now();

            match stage.run(data, ctx).await {
                Ok(output) => {
                    ctx.observer
                        .on_stage_complete(stage.name(), idx, stage_started.elapsed());
                    data = output;
                }
                Err(e) => {
                    ctx.observer.on_stage_error(stage.name(), idx, &e);
                    ctx.observer.on_pipeline_error(&e);
                    return Err(e);
                }
            }
        }

        ctx.observer.on_pipeline_complete(started.elapsed());
        Ok(data)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .field("expected_input", &self.expected_input)
            .field("expected_output", &self.expected_output)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use crate::pipeline::RenderOptions;
    use crate::render::{RenderContext, RenderFailure};
    use crate::stage::observer::PipelineObserver;

    /// Appends its name to the text.
    struct TagStage {
        name: &'static str,
        input: PipelineDataKind,
        output: PipelineDataKind,
    }

    #[async_trait]
    impl PipelineStage for TagStage {
        fn name(&self) -> &str {
            self.name
        }

        fn input_kind(&self) -> PipelineDataKind {
            self.input
        }

        fn output_kind(&self) -> PipelineDataKind {
            self.output
        }

        async fn run(
            &self,
            input: PipelineData,
            _ctx: &mut StageContext,
        ) -> Result<PipelineData, PipelineError> {
            let text = format!("{}>{}", input.into_text(), self.name);
            Ok(match self.output {
                PipelineDataKind::Source => PipelineData::Source(text),
                PipelineDataKind::Expanded => PipelineData::Expanded(text),
                PipelineDataKind::Localized => PipelineData::Localized(text),
                PipelineDataKind::Compiled => PipelineData::Compiled(text),
                PipelineDataKind::Linked => PipelineData::Linked(text),
            })
        }
    }

    struct FailingStage;

    #[async_trait]
    impl PipelineStage for FailingStage {
        fn name(&self) -> &str {
            "failing"
        }

        fn input_kind(&self) -> PipelineDataKind {
            PipelineDataKind::Expanded
        }

        fn output_kind(&self) -> PipelineDataKind {
            PipelineDataKind::Localized
        }

        async fn run(
            &self,
            _input: PipelineData,
            _ctx: &mut StageContext,
        ) -> Result<PipelineData, PipelineError> {
            Err(PipelineError::stage_failed(
                self.name(),
                RenderFailure::message("Test failure"),
            ))
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        log: Mutex<Vec<String>>,
    }

    impl PipelineObserver for RecordingObserver {
        fn on_stage_start(&self, name: &str, _index: usize, _total: usize) {
            self.log.lock().push(format!("start {}", name));
        }

        fn on_stage_complete(&self, name: &str, _index: usize, _elapsed: Duration) {
            self.log.lock().push(format!("complete {}", name));
        }

        fn on_stage_error(&self, name: &str, _index: usize, _error: &PipelineError) {
            self.log.lock().push(format!("error {}", name));
        }

        fn on_pipeline_complete(&self, _elapsed: Duration) {
            self.log.lock().push("done".to_string());
        }
    }

    fn stage(
        name: &'static str,
        input: PipelineDataKind,
        output: PipelineDataKind,
    ) -> Box<dyn PipelineStage> {
        Box::new(TagStage {
            name,
            input,
            output,
        })
    }

    fn context(observer: Arc<RecordingObserver>) -> StageContext {
        StageContext::new(
            &RenderContext::new("", "a.mjml"),
            &RenderOptions::default(),
        )
        .with_observer(observer)
    }

    // === Validation Tests ===

    #[test]
    fn test_empty_pipeline() {
        let stages: Vec<Box<dyn PipelineStage>> = vec![];
        let result = Pipeline::new(stages);
        assert!(matches!(result, Err(PipelineValidationError::Empty)));
    }

    #[test]
    fn test_multi_stage_pipeline_valid() {
        let pipeline = Pipeline::new(vec![
            stage("expand", PipelineDataKind::Source, PipelineDataKind::Expanded),
            stage("localize", PipelineDataKind::Expanded, PipelineDataKind::Localized),
        ])
        .unwrap();

        assert_eq!(pipeline.len(), 2);
        assert_eq!(pipeline.expected_input(), PipelineDataKind::Source);
        assert_eq!(pipeline.expected_output(), PipelineDataKind::Localized);
        assert_eq!(pipeline.stage_names(), vec!["expand", "localize"]);
    }

    #[test]
    fn test_multi_stage_pipeline_type_mismatch() {
        let result = Pipeline::new(vec![
            stage("expand", PipelineDataKind::Source, PipelineDataKind::Expanded),
            // Skips localization
            stage("compile", PipelineDataKind::Localized, PipelineDataKind::Compiled),
        ]);

        let Err(PipelineValidationError::TypeMismatch {
            stage_a,
            stage_b,
            output,
            input,
        }) = result
        else {
            panic!("expected a type mismatch");
        };
        assert_eq!(stage_a, "expand");
        assert_eq!(stage_b, "compile");
        assert_eq!(output, PipelineDataKind::Expanded);
        assert_eq!(input, PipelineDataKind::Localized);
    }

    #[test]
    fn test_pipeline_debug() {
        let pipeline = Pipeline::new(vec![stage(
            "test",
            PipelineDataKind::Source,
            PipelineDataKind::Source,
        )])
        .unwrap();
        let debug = format!("{:?}", pipeline);

        assert!(debug.contains("Pipeline"));
        assert!(debug.contains("test"));
        assert!(debug.contains("Source"));
    }

    // === Execution Tests ===

    #[tokio::test]
    async fn test_run_in_order() {
        let pipeline = Pipeline::new(vec![
            stage("a", PipelineDataKind::Source, PipelineDataKind::Expanded),
            stage("b", PipelineDataKind::Expanded, PipelineDataKind::Localized),
        ])
        .unwrap();
        let observer = Arc::new(RecordingObserver::default());
        let mut ctx = context(observer.clone());

        let out = pipeline
            .run(PipelineData::Source("src".to_string()), &mut ctx)
            .await
            .unwrap();

        assert_eq!(out, PipelineData::Localized("src>a>b".to_string()));
        assert_eq!(
            *observer.log.lock(),
            vec!["start a", "complete a", "start b", "complete b", "done"]
        );
    }

    #[tokio::test]
    async fn test_run_short_circuits() {
        let pipeline = Pipeline::new(vec![
            stage("a", PipelineDataKind::Source, PipelineDataKind::Expanded),
            Box::new(FailingStage),
            stage("c", PipelineDataKind::Localized, PipelineDataKind::Compiled),
        ])
        .unwrap();
        let observer = Arc::new(RecordingObserver::default());
        let mut ctx = context(observer.clone());

        let err = pipeline
            .run(PipelineData::Source(String::new()), &mut ctx)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::StageFailed { ref stage, .. } if stage == "failing"));
        assert_eq!(
            *observer.log.lock(),
            vec!["start a", "complete a", "start failing", "error failing"]
        );
    }

    #[tokio::test]
    async fn test_run_rejects_wrong_input() {
        let pipeline = Pipeline::new(vec![stage(
            "a",
            PipelineDataKind::Source,
            PipelineDataKind::Expanded,
        )])
        .unwrap();
        let mut ctx = context(Arc::new(RecordingObserver::default()));

        let err = pipeline
            .run(PipelineData::Compiled(String::new()), &mut ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnexpectedInput { .. }));
    }
}
