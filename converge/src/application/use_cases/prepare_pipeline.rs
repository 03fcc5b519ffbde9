// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Prepare Use Case
//!
//! The first phase of every engine operation: load the configuration through
//! the loader port, levelize the enabled steps into an execution plan, and
//! cross-validate the plan against the pipeline. Failures publish a
//! `pipeline.failed` event with `phase=prepare` and bubble up unwrapped -
//! orchestration never re-wraps domain errors.

use converge_domain::context::ExecutionContext;
use converge_domain::entities::Pipeline;
use converge_domain::error::DomainError;
use converge_domain::events::PipelineEvent;
use converge_domain::services::{ConfigLoader, EventPublisher, ExecutionPlanner, Logger};
use converge_domain::value_objects::ExecutionPlan;
use std::path::Path;
use std::sync::Arc;

/// A validated pipeline together with its cross-checked plan.
#[derive(Debug, Clone)]
pub struct PreparedPipeline {
    pipeline: Pipeline,
    plan: ExecutionPlan,
}

impl PreparedPipeline {
    /// Gets the validated pipeline
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Gets the levelized plan
    pub fn plan(&self) -> &ExecutionPlan {
        &self.plan
    }

    /// Splits into pipeline and plan
    pub fn into_parts(self) -> (Pipeline, ExecutionPlan) {
        (self.pipeline, self.plan)
    }
}

/// Use case: configuration path to executable plan.
pub struct PreparePipelineUseCase {
    loader: Arc<dyn ConfigLoader>,
    planner: ExecutionPlanner,
    publisher: Arc<dyn EventPublisher>,
    logger: Arc<dyn Logger>,
}

impl PreparePipelineUseCase {
    /// Creates the use case.
    pub fn new(loader: Arc<dyn ConfigLoader>, publisher: Arc<dyn EventPublisher>, logger: Arc<dyn Logger>) -> Self {
        Self {
            loader,
            planner: ExecutionPlanner::new(),
            publisher,
            logger,
        }
    }

    /// Loads, plans, and cross-validates.
    ///
    /// # Errors
    ///
    /// Loader, planner, and plan-validation failures pass through with their
    /// original codes; each also publishes `pipeline.failed` with
    /// `phase=prepare`.
    pub async fn execute(&self, ctx: &ExecutionContext, path: &Path) -> Result<PreparedPipeline, DomainError> {
        let pipeline = match self.loader.load(ctx, path).await {
            Ok(pipeline) => pipeline,
            Err(error) => {
                self.publish_failure(ctx, &path.display().to_string(), &error);
                return Err(error);
            }
        };

        let plan = match self.planner.build(ctx, pipeline.steps()) {
            Ok(plan) => plan,
            Err(error) => {
                self.publish_failure(ctx, pipeline.name(), &error);
                return Err(error);
            }
        };

        if let Err(error) = plan.validate(&pipeline) {
            self.publish_failure(ctx, pipeline.name(), &error);
            return Err(error);
        }

        self.logger.info(
            ctx,
            "pipeline prepared",
            &[
                ("pipeline", pipeline.name()),
                ("levels", &plan.levels().len().to_string()),
                ("steps", &plan.step_count().to_string()),
            ],
        );

        Ok(PreparedPipeline { pipeline, plan })
    }

    fn publish_failure(&self, ctx: &ExecutionContext, pipeline: &str, error: &DomainError) {
        self.publisher.publish(
            ctx,
            PipelineEvent::pipeline_failed(ctx, pipeline, "prepare", &error.to_string()),
        );
    }
}
