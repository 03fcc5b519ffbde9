// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Step Executor Implementation
//!
//! Concrete level-parallel runtime behind the [`PipelineExecutor`] port.
//!
//! ## Overview
//!
//! The executor drives an [`ExecutionPlan`] strictly level by level. Within a
//! level it spawns one task per step and gates admission on a counting
//! semaphore sized to the effective `parallel` setting; between levels there
//! is a hard barrier, so a step's dependencies have fully settled before it
//! starts. Results land in pre-sized per-level slots - no two tasks ever
//! share an index - and the first failure in a level is recorded once,
//! first writer wins.
//!
//! ## Per-Step Discipline
//!
//! Each step follows the same sequence:
//!
//! 1. Cancellation short-circuit (a cancelled run never blocks on admission)
//! 2. Handler lookup by step type (missing handler is a `NOT_FOUND` failure)
//! 3. `step.started` event, metrics gauge, trace span
//! 4. `evaluate` - when no action is required the step settles as
//!    `already_satisfied`, `step.skipped` is published, and `apply` is never
//!    called; this is the engine's idempotence contract
//! 5. Dry-run synthesizes a result instead of applying
//! 6. `apply`, with duration stamped and `step.completed` / `step.failed`
//!    published from the producing task
//!
//! ## Cancellation
//!
//! The cancellation token is consulted before admission, at every level
//! boundary, and at each verify iteration. In-flight handlers finish on
//! their own; no new level starts after cancellation fires.

use async_trait::async_trait;
use converge_domain::context::ExecutionContext;
use converge_domain::entities::{Pipeline, Settings, Step};
use converge_domain::error::{DomainError, ErrorCode};
use converge_domain::events::PipelineEvent;
use converge_domain::services::{
    EventPublisher, ExecutionOutcome, Logger, MetricsPort, PipelineExecutor, SpanStatus, Tracer,
};
use converge_domain::value_objects::{
    ExecutionLevel, ExecutionPlan, StepResult, StepStatus, VerificationResult, VerificationStatus,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

use crate::infrastructure::registry::PluginRegistry;

/// Level-parallel executor over the plugin registry.
///
/// Cheap to clone per run; all members are shared handles.
pub struct StepExecutor {
    registry: Arc<PluginRegistry>,
    publisher: Arc<dyn EventPublisher>,
    metrics: Arc<dyn MetricsPort>,
    tracer: Arc<dyn Tracer>,
    logger: Arc<dyn Logger>,
    parallel_override: Option<usize>,
}

impl StepExecutor {
    /// Creates an executor over the given registry and observability ports.
    pub fn new(
        registry: Arc<PluginRegistry>,
        publisher: Arc<dyn EventPublisher>,
        metrics: Arc<dyn MetricsPort>,
        tracer: Arc<dyn Tracer>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            registry,
            publisher,
            metrics,
            tracer,
            logger,
            parallel_override: None,
        }
    }

    /// Sets an executor-wide parallelism override.
    ///
    /// When set, this bound wins over the pipeline's `settings.parallel` for
    /// every run driven by this executor.
    pub fn with_parallelism(mut self, parallel: usize) -> Self {
        if parallel > 0 {
            self.parallel_override = Some(parallel);
        }
        self
    }

    async fn run_level(
        &self,
        ctx: &ExecutionContext,
        level: &ExecutionLevel,
        pipeline: &Pipeline,
        settings: &Settings,
        parallel: usize,
    ) -> (Vec<StepResult>, Option<DomainError>) {
        let semaphore = Arc::new(Semaphore::new(parallel));
        let level_error: Arc<Mutex<Option<DomainError>>> = Arc::new(Mutex::new(None));
        let mut slots: Vec<Option<StepResult>> = vec![None; level.len()];
        let mut handles = Vec::with_capacity(level.len());

        for (slot, step_id) in level.step_ids().iter().enumerate() {
            match pipeline.step(step_id) {
                Some(step) => {
                    let run = StepRun {
                        ctx: ctx.clone(),
                        step: step.clone(),
                        pipeline_name: pipeline.name().to_string(),
                        settings: settings.clone(),
                        registry: Arc::clone(&self.registry),
                        publisher: Arc::clone(&self.publisher),
                        metrics: Arc::clone(&self.metrics),
                        tracer: Arc::clone(&self.tracer),
                        logger: Arc::clone(&self.logger),
                        semaphore: Arc::clone(&semaphore),
                        level_error: Arc::clone(&level_error),
                    };
                    handles.push((slot, tokio::spawn(run.run())));
                }
                None => {
                    // The plan was cross-validated, so this indicates a
                    // plan/pipeline mix-up at the call site.
                    let err = DomainError::internal(format!(
                        "plan schedules step '{}' which the pipeline does not define",
                        step_id
                    ))
                    .with_context("step_id", step_id);
                    record_first(&level_error, &err);
                    slots[slot] = Some(StepResult::failure(step_id, err));
                }
            }
        }

        // Level barrier: every spawned task settles before the level does.
        let joined = futures::future::join_all(
            handles
                .into_iter()
                .map(|(slot, handle)| async move { (slot, handle.await) }),
        )
        .await;
        for (slot, joined_result) in joined {
            let result = match joined_result {
                Ok(result) => result,
                Err(join_error) => {
                    let step_id = &level.step_ids()[slot];
                    let err = DomainError::internal(format!("step task for '{}' aborted", step_id))
                        .with_context("step_id", step_id.as_str())
                        .with_source(join_error);
                    record_first(&level_error, &err);
                    StepResult::failure(step_id, err)
                }
            };
            slots[slot] = Some(result);
        }

        let first_error = level_error.lock().take();
        (slots.into_iter().flatten().collect(), first_error)
    }

    /// Maps an evaluation failure onto the verify report vocabulary.
    fn failure_reason(error: &DomainError) -> &'static str {
        match error.code() {
            ErrorCode::NotFound | ErrorCode::MissingRequired => "missing",
            ErrorCode::Dependency => "blocked",
            ErrorCode::Validation => "unknown",
            _ => {
                let message = error.message().to_ascii_lowercase();
                if message.contains("no such file") || message.contains("not found") {
                    "missing"
                } else {
                    "unknown"
                }
            }
        }
    }
}

#[async_trait]
impl PipelineExecutor for StepExecutor {
    async fn execute(
        &self,
        ctx: &ExecutionContext,
        plan: &ExecutionPlan,
        pipeline: &Pipeline,
    ) -> Result<ExecutionOutcome, DomainError> {
        if plan.levels().is_empty() {
            return Err(DomainError::internal("cannot execute an empty plan"));
        }
        if ctx.is_cancelled() {
            return Err(DomainError::cancelled("execution cancelled before start"));
        }

        let settings = pipeline.settings().apply_defaults();
        let parallel = self.parallel_override.unwrap_or_else(|| settings.parallel());

        self.logger.info(
            ctx,
            "executing pipeline",
            &[
                ("pipeline", pipeline.name()),
                ("levels", &plan.levels().len().to_string()),
                ("steps", &plan.step_count().to_string()),
                ("parallel", &parallel.to_string()),
                ("dry_run", if settings.dry_run() { "true" } else { "false" }),
            ],
        );

        let run_started = Instant::now();
        let mut results: Vec<StepResult> = Vec::with_capacity(plan.step_count());
        let mut first_error: Option<DomainError> = None;

        for level in plan.levels() {
            if ctx.is_cancelled() {
                if first_error.is_none() {
                    first_error = Some(
                        DomainError::cancelled("execution cancelled at level boundary")
                            .with_context("level", level.index().to_string()),
                    );
                }
                break;
            }

            let (level_results, level_error) = self.run_level(ctx, level, pipeline, &settings, parallel).await;
            results.extend(level_results);

            if let Some(error) = level_error {
                if !settings.continue_on_error() {
                    self.metrics
                        .record_pipeline_run(pipeline.name(), false, run_started.elapsed());
                    return Ok(ExecutionOutcome::new(results, Some(error)));
                }
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
        }

        self.metrics
            .record_pipeline_run(pipeline.name(), first_error.is_none(), run_started.elapsed());
        Ok(ExecutionOutcome::new(results, first_error))
    }

    async fn verify(
        &self,
        ctx: &ExecutionContext,
        pipeline: &Pipeline,
    ) -> Result<Vec<VerificationResult>, DomainError> {
        // Declared order, sequentially: verification output stays stable for
        // diffing, so no parallelism here.
        let mut report = Vec::with_capacity(pipeline.enabled_step_count());

        for step in pipeline.steps().iter().filter(|step| step.enabled()) {
            if ctx.is_cancelled() {
                return Err(DomainError::cancelled("verification cancelled")
                    .with_context("step_id", step.id()));
            }

            let kind = step.step_type().as_str();
            let handler = match self.registry.get(step.step_type()) {
                Ok(handler) => handler,
                Err(error) => {
                    report.push(
                        VerificationResult::new(step.id(), kind, VerificationStatus::Failed, error.to_string())
                            .with_detail("reason", Self::failure_reason(&error)),
                    );
                    continue;
                }
            };

            let evaluation = if step.verify_timeout_secs() > 0 {
                let budget = Duration::from_secs(step.verify_timeout_secs());
                match tokio::time::timeout(budget, handler.evaluate(ctx, step)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(DomainError::timeout(format!(
                        "verification of step '{}' exceeded {}s",
                        step.id(),
                        step.verify_timeout_secs()
                    ))
                    .with_context("step_id", step.id())),
                }
            } else {
                handler.evaluate(ctx, step).await
            };

            let result = match evaluation {
                Ok(evaluation) if !evaluation.requires_action() => VerificationResult::new(
                    step.id(),
                    kind,
                    VerificationStatus::Satisfied,
                    "state matches desired state",
                ),
                Ok(evaluation) => VerificationResult::new(
                    step.id(),
                    kind,
                    VerificationStatus::Failed,
                    "state has drifted from desired state",
                )
                .with_detail("reason", "drifted")
                .with_detail("current_state", evaluation.current_state())
                .with_detail("desired_state", evaluation.desired_state())
                .with_detail("diff", evaluation.diff()),
                Err(error) => VerificationResult::new(step.id(), kind, VerificationStatus::Failed, error.to_string())
                    .with_detail("reason", Self::failure_reason(&error)),
            };
            report.push(result);
        }

        Ok(report)
    }
}

/// Everything one spawned step task needs, owned.
struct StepRun {
    ctx: ExecutionContext,
    step: Step,
    pipeline_name: String,
    settings: Settings,
    registry: Arc<PluginRegistry>,
    publisher: Arc<dyn EventPublisher>,
    metrics: Arc<dyn MetricsPort>,
    tracer: Arc<dyn Tracer>,
    logger: Arc<dyn Logger>,
    semaphore: Arc<Semaphore>,
    level_error: Arc<Mutex<Option<DomainError>>>,
}

impl StepRun {
    async fn run(self) -> StepResult {
        let step_id = self.step.id().to_string();
        let step_type = self.step.step_type();

        // Admission: a cancelled run must not block on the semaphore.
        let _permit = tokio::select! {
            biased;
            _ = self.ctx.cancelled() => {
                return self.settle_cancelled(&step_id);
            }
            permit = Arc::clone(&self.semaphore).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => {
                    let err = DomainError::internal("executor semaphore closed unexpectedly")
                        .with_context("step_id", &step_id);
                    record_first(&self.level_error, &err);
                    return StepResult::failure(&step_id, err);
                }
            }
        };

        let started = Instant::now();

        let handler = match self.registry.get(step_type) {
            Ok(handler) => handler,
            Err(error) => {
                let error = error.with_context("step_id", &step_id);
                record_first(&self.level_error, &error);
                self.publisher.publish(
                    &self.ctx,
                    PipelineEvent::step_failed(&self.ctx, &self.pipeline_name, &step_id, step_type, &error.to_string(), 0),
                );
                self.metrics
                    .record_step_execution(&step_id, StepStatus::Failure, started.elapsed());
                return StepResult::failure(&step_id, error);
            }
        };

        self.metrics.step_started();
        self.publisher.publish(
            &self.ctx,
            PipelineEvent::step_started(&self.ctx, &self.pipeline_name, &step_id, step_type, self.settings.dry_run()),
        );
        self.logger.debug(
            &self.ctx,
            "step started",
            &[("step_id", step_id.as_str()), ("step_type", step_type.as_str())],
        );
        let mut span = self.tracer.start_span(
            &self.ctx,
            "step.execute",
            &[
                ("pipeline", self.pipeline_name.as_str()),
                ("step_id", step_id.as_str()),
                ("step_type", step_type.as_str()),
            ],
        );

        let evaluation = match handler.evaluate(&self.ctx, &self.step).await {
            Ok(evaluation) => evaluation,
            Err(error) => {
                let error = error.with_context("step_id", &step_id);
                let result = StepResult::failure(&step_id, error.clone()).with_duration(started.elapsed());
                record_first(&self.level_error, &error);
                self.publisher.publish(
                    &self.ctx,
                    PipelineEvent::step_failed(
                        &self.ctx,
                        &self.pipeline_name,
                        &step_id,
                        step_type,
                        &error.to_string(),
                        result.duration_ms(),
                    ),
                );
                self.metrics
                    .record_step_execution(&step_id, StepStatus::Failure, started.elapsed());
                span.set_status(SpanStatus::Error, error.message());
                span.end();
                self.metrics.step_finished();
                return result;
            }
        };

        // Idempotence contract: a step whose state already matches is never
        // applied, in any mode.
        if !evaluation.requires_action() {
            let result = StepResult::already_satisfied(&step_id)
                .with_message("state already matches desired state")
                .with_duration(started.elapsed());
            self.publisher.publish(
                &self.ctx,
                PipelineEvent::step_skipped(
                    &self.ctx,
                    &self.pipeline_name,
                    &step_id,
                    step_type,
                    "state already matches desired state",
                ),
            );
            self.metrics
                .record_step_execution(&step_id, StepStatus::AlreadySatisfied, started.elapsed());
            span.set_attribute("status", StepStatus::AlreadySatisfied.as_str());
            span.set_status(SpanStatus::Ok, "already satisfied");
            span.end();
            self.metrics.step_finished();
            return result;
        }

        if self.settings.dry_run() {
            let result = StepResult::success(&step_id)
                .with_changed(true)
                .with_message("dry-run: drift detected, apply skipped")
                .with_diff(evaluation.diff())
                .with_duration(started.elapsed());
            self.publisher.publish(
                &self.ctx,
                PipelineEvent::step_completed(
                    &self.ctx,
                    &self.pipeline_name,
                    &step_id,
                    step_type,
                    true,
                    true,
                    result.duration_ms(),
                ),
            );
            self.metrics
                .record_step_execution(&step_id, StepStatus::Success, started.elapsed());
            span.set_attribute("dry_run", "true");
            span.set_status(SpanStatus::Ok, "dry-run");
            span.end();
            self.metrics.step_finished();
            return result;
        }

        let settled = match handler.apply(&self.ctx, &evaluation, &self.step).await {
            Ok(mut result) => {
                result.ensure_step_id(&step_id);
                result.set_duration(started.elapsed());
                if result.is_failure() {
                    // Handlers may settle a failure as a result instead of an
                    // Err; the level error cell must see it either way.
                    let error = result.error().cloned().unwrap_or_else(|| {
                        DomainError::execution(format!("step '{}' reported failure", step_id))
                            .with_context("step_id", &step_id)
                    });
                    record_first(&self.level_error, &error);
                    self.publisher.publish(
                        &self.ctx,
                        PipelineEvent::step_failed(
                            &self.ctx,
                            &self.pipeline_name,
                            &step_id,
                            step_type,
                            result.message(),
                            result.duration_ms(),
                        ),
                    );
                    span.set_status(SpanStatus::Error, result.message());
                } else {
                    self.publisher.publish(
                        &self.ctx,
                        PipelineEvent::step_completed(
                            &self.ctx,
                            &self.pipeline_name,
                            &step_id,
                            step_type,
                            result.changed(),
                            false,
                            result.duration_ms(),
                        ),
                    );
                    span.set_attribute("changed", if result.changed() { "true" } else { "false" });
                    span.set_status(SpanStatus::Ok, "applied");
                }
                result
            }
            Err(error) => {
                let error = error.with_context("step_id", &step_id);
                let result = StepResult::failure(&step_id, error.clone()).with_duration(started.elapsed());
                record_first(&self.level_error, &error);
                self.publisher.publish(
                    &self.ctx,
                    PipelineEvent::step_failed(
                        &self.ctx,
                        &self.pipeline_name,
                        &step_id,
                        step_type,
                        &error.to_string(),
                        result.duration_ms(),
                    ),
                );
                span.set_status(SpanStatus::Error, error.message());
                result
            }
        };

        self.metrics
            .record_step_execution(&step_id, settled.status(), started.elapsed());
        span.end();
        self.metrics.step_finished();
        settled
    }

    fn settle_cancelled(&self, step_id: &str) -> StepResult {
        let error = DomainError::cancelled(format!("step '{}' cancelled before admission", step_id))
            .with_context("step_id", step_id);
        record_first(&self.level_error, &error);
        StepResult::failure(step_id, error)
    }
}

/// Records the first error for a level; later writers lose.
fn record_first(cell: &Mutex<Option<DomainError>>, error: &DomainError) {
    let mut guard = cell.lock();
    if guard.is_none() {
        *guard = Some(error.clone());
    }
}
