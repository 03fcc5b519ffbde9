// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Verify Use Case
//!
//! Drift detection without side effects: prepare, then evaluate every
//! enabled step sequentially (declared order) through the executor's verify
//! path, and summarize into satisfied/failed/unknown counters. No handler
//! `apply` runs.

use converge_domain::context::ExecutionContext;
use converge_domain::error::DomainError;
use converge_domain::events::PipelineEvent;
use converge_domain::services::{EventPublisher, Logger, PipelineExecutor};
use converge_domain::value_objects::VerificationSummary;
use std::path::Path;
use std::sync::Arc;

use super::prepare_pipeline::PreparePipelineUseCase;

/// Use case: report drift between a pipeline and the live system.
pub struct VerifyPipelineUseCase {
    prepare: PreparePipelineUseCase,
    executor: Arc<dyn PipelineExecutor>,
    publisher: Arc<dyn EventPublisher>,
    logger: Arc<dyn Logger>,
}

impl VerifyPipelineUseCase {
    /// Creates the use case.
    pub fn new(
        prepare: PreparePipelineUseCase,
        executor: Arc<dyn PipelineExecutor>,
        publisher: Arc<dyn EventPublisher>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            prepare,
            executor,
            publisher,
            logger,
        }
    }

    /// Prepares the pipeline and probes every enabled step.
    ///
    /// Drift is reported through the summary, not as an error; the error
    /// path is reserved for preparation failures and cancellation.
    pub async fn execute(&self, ctx: &ExecutionContext, path: &Path) -> Result<VerificationSummary, DomainError> {
        let prepared = self.prepare.execute(ctx, path).await?;
        let pipeline = prepared.pipeline();

        let results = self.executor.verify(ctx, pipeline).await?;

        let mut summary = VerificationSummary::new();
        for result in results {
            summary.add(result);
        }

        if summary.failed() > 0 {
            self.publisher.publish(
                ctx,
                PipelineEvent::validation_failed(
                    ctx,
                    pipeline.name(),
                    summary.total(),
                    summary.passed(),
                    summary.failed(),
                    summary.unknown(),
                    &format!("{} of {} steps drifted or failed", summary.failed(), summary.total()),
                ),
            );
        } else {
            self.publisher.publish(
                ctx,
                PipelineEvent::validation_completed(
                    ctx,
                    pipeline.name(),
                    summary.total(),
                    summary.passed(),
                    summary.failed(),
                    summary.unknown(),
                ),
            );
        }

        self.logger.info(
            ctx,
            "verification finished",
            &[
                ("pipeline", pipeline.name()),
                ("satisfied", &summary.passed().to_string()),
                ("drifted", &summary.failed().to_string()),
                ("unknown", &summary.unknown().to_string()),
            ],
        );

        Ok(summary)
    }
}
