// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Apply Use Case
//!
//! The full convergence sequence: prepare, execute the plan level by level,
//! run post-execution validations (when the run is not a dry-run), and
//! publish the pipeline lifecycle events around it.
//!
//! The use case never throws work away: it always returns an
//! [`ApplyReport`] carrying the prepared pipeline, the raw step results, and
//! the validation summary (when validation ran), so a renderer can show
//! partial progress even when the run failed.

use converge_domain::context::ExecutionContext;
use converge_domain::entities::Pipeline;
use converge_domain::error::DomainError;
use converge_domain::events::PipelineEvent;
use converge_domain::services::{EventPublisher, Logger, PipelineExecutor, ValidationService};
use converge_domain::value_objects::{ExecutionPlan, StepResult, VerificationSummary};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use super::prepare_pipeline::PreparePipelineUseCase;

/// Command-line style overrides applied on top of the pipeline's settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOptions {
    dry_run: bool,
    continue_on_error: bool,
}

impl ApplyOptions {
    /// Creates options with no overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forces dry-run regardless of the pipeline settings
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Forces continue-on-error regardless of the pipeline settings
    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }
}

/// Everything one apply run produced.
#[derive(Debug, Clone, Default)]
pub struct ApplyReport {
    pipeline: Option<Pipeline>,
    plan: Option<ExecutionPlan>,
    results: Vec<StepResult>,
    summary: Option<VerificationSummary>,
    error: Option<DomainError>,
}

impl ApplyReport {
    fn failed_early(error: DomainError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    /// Gets the prepared pipeline (absent when preparation failed)
    pub fn pipeline(&self) -> Option<&Pipeline> {
        self.pipeline.as_ref()
    }

    /// Gets the executed plan (absent when preparation failed)
    pub fn plan(&self) -> Option<&ExecutionPlan> {
        self.plan.as_ref()
    }

    /// Gets the accumulated step results
    pub fn results(&self) -> &[StepResult] {
        &self.results
    }

    /// Gets the validation summary (absent for dry-runs, execution failures,
    /// and pipelines without validations)
    pub fn summary(&self) -> Option<&VerificationSummary> {
        self.summary.as_ref()
    }

    /// Gets the first error of the run
    pub fn error(&self) -> Option<&DomainError> {
        self.error.as_ref()
    }

    /// Whether the run converged without failure
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Use case: converge a machine onto a pipeline.
pub struct ApplyPipelineUseCase {
    prepare: PreparePipelineUseCase,
    executor: Arc<dyn PipelineExecutor>,
    validator: Arc<dyn ValidationService>,
    publisher: Arc<dyn EventPublisher>,
    logger: Arc<dyn Logger>,
}

impl ApplyPipelineUseCase {
    /// Creates the use case.
    pub fn new(
        prepare: PreparePipelineUseCase,
        executor: Arc<dyn PipelineExecutor>,
        validator: Arc<dyn ValidationService>,
        publisher: Arc<dyn EventPublisher>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            prepare,
            executor,
            validator,
            publisher,
            logger,
        }
    }

    /// Runs the full apply sequence.
    ///
    /// Always returns a report; inspect [`ApplyReport::error`] for the
    /// outcome.
    pub async fn execute(&self, ctx: &ExecutionContext, path: &Path, options: ApplyOptions) -> ApplyReport {
        let run_started = Instant::now();

        let prepared = match self.prepare.execute(ctx, path).await {
            Ok(prepared) => prepared,
            Err(error) => return ApplyReport::failed_early(error),
        };
        let (mut pipeline, plan) = prepared.into_parts();

        if options.dry_run || options.continue_on_error {
            let mut settings = pipeline.settings().clone();
            if options.dry_run {
                settings = settings.with_dry_run(true);
            }
            if options.continue_on_error {
                settings = settings.with_continue_on_error(true);
            }
            pipeline = pipeline.with_settings(settings);
        }
        let effective = pipeline.settings().apply_defaults();

        self.publisher.publish(
            ctx,
            PipelineEvent::pipeline_started(ctx, pipeline.name(), plan.step_count(), effective.dry_run()),
        );

        let outcome = match self.executor.execute(ctx, &plan, &pipeline).await {
            Ok(outcome) => outcome,
            Err(error) => {
                self.publisher.publish(
                    ctx,
                    PipelineEvent::pipeline_failed(ctx, pipeline.name(), "execute", &error.to_string()),
                );
                return ApplyReport {
                    pipeline: Some(pipeline),
                    plan: Some(plan),
                    error: Some(error),
                    ..ApplyReport::default()
                };
            }
        };

        let changed = outcome.changed_count();
        let (results, mut error) = outcome.into_parts();
        let mut phase = "execute";
        let mut summary = None;

        // Validations only make sense against a fully converged, real run.
        if error.is_none() && !effective.dry_run() && !pipeline.validations().is_empty() {
            self.publisher.publish(
                ctx,
                PipelineEvent::validation_started(ctx, pipeline.name(), pipeline.validations().len()),
            );

            let (validation_summary, validation_error) =
                self.validator.run_validations(ctx, pipeline.validations()).await;

            match &validation_error {
                None => self.publisher.publish(
                    ctx,
                    PipelineEvent::validation_completed(
                        ctx,
                        pipeline.name(),
                        validation_summary.total(),
                        validation_summary.passed(),
                        validation_summary.failed(),
                        validation_summary.unknown(),
                    ),
                ),
                Some(validation_error) => self.publisher.publish(
                    ctx,
                    PipelineEvent::validation_failed(
                        ctx,
                        pipeline.name(),
                        validation_summary.total(),
                        validation_summary.passed(),
                        validation_summary.failed(),
                        validation_summary.unknown(),
                        &validation_error.to_string(),
                    ),
                ),
            }

            if error.is_none() && validation_error.is_some() {
                error = validation_error;
                phase = "validate";
            }
            summary = Some(validation_summary);
        }

        match &error {
            None => {
                self.publisher.publish(
                    ctx,
                    PipelineEvent::pipeline_completed(
                        ctx,
                        pipeline.name(),
                        run_started.elapsed().as_millis() as u64,
                        changed,
                    ),
                );
                self.logger.info(
                    ctx,
                    "pipeline converged",
                    &[
                        ("pipeline", pipeline.name()),
                        ("changed_steps", &changed.to_string()),
                    ],
                );
            }
            Some(error) => {
                self.publisher.publish(
                    ctx,
                    PipelineEvent::pipeline_failed(ctx, pipeline.name(), phase, &error.to_string()),
                );
                self.logger.error(
                    ctx,
                    "pipeline failed",
                    &[("pipeline", pipeline.name()), ("phase", phase)],
                );
            }
        }

        ApplyReport {
            pipeline: Some(pipeline),
            plan: Some(plan),
            results,
            summary,
            error,
        }
    }
}
