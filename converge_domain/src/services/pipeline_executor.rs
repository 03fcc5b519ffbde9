// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Executor Port
//!
//! The orchestration layer drives execution through this port; the concrete
//! level-parallel runtime lives in the infrastructure layer. Two operations:
//!
//! - [`execute`](PipelineExecutor::execute) - run a levelized plan with
//!   bounded parallelism, returning an [`ExecutionOutcome`] that always
//!   carries the accumulated step results plus the first recorded error, so
//!   callers can render partial progress even on failure
//! - [`verify`](PipelineExecutor::verify) - evaluate every step sequentially
//!   in declared order without applying anything, reporting drift

use crate::context::ExecutionContext;
use crate::entities::Pipeline;
use crate::error::DomainError;
use crate::value_objects::{ExecutionPlan, StepResult, VerificationResult};
use async_trait::async_trait;

/// What a plan execution produced.
///
/// `first_error` is set when any step failed (or was cancelled); with
/// `continue_on_error` the results still cover every scheduled step, without
/// it they stop at the failing level.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOutcome {
    results: Vec<StepResult>,
    first_error: Option<DomainError>,
}

impl ExecutionOutcome {
    /// Creates an outcome from accumulated results and the first error.
    pub fn new(results: Vec<StepResult>, first_error: Option<DomainError>) -> Self {
        Self { results, first_error }
    }

    /// Gets the accumulated step results, in level order
    pub fn results(&self) -> &[StepResult] {
        &self.results
    }

    /// Consumes the outcome, yielding the results
    pub fn into_results(self) -> Vec<StepResult> {
        self.results
    }

    /// Gets the first error recorded during execution
    pub fn first_error(&self) -> Option<&DomainError> {
        self.first_error.as_ref()
    }

    /// Whether the execution completed without any step failure
    pub fn is_success(&self) -> bool {
        self.first_error.is_none()
    }

    /// Number of steps that changed system state
    pub fn changed_count(&self) -> usize {
        self.results.iter().filter(|result| result.changed()).count()
    }

    /// Splits the outcome into its parts
    pub fn into_parts(self) -> (Vec<StepResult>, Option<DomainError>) {
        (self.results, self.first_error)
    }
}

/// Port driving plan execution and drift verification.
#[async_trait]
pub trait PipelineExecutor: Send + Sync {
    /// Executes a levelized plan against its pipeline.
    ///
    /// # Errors
    ///
    /// - `INTERNAL_ERROR` - structurally unusable input (empty plan)
    /// - `CANCELLED` - cancellation fired before any handler was invoked
    ///
    /// Step-level failures do not surface here; they are recorded in the
    /// returned [`ExecutionOutcome`].
    async fn execute(
        &self,
        ctx: &ExecutionContext,
        plan: &ExecutionPlan,
        pipeline: &Pipeline,
    ) -> Result<ExecutionOutcome, DomainError>;

    /// Evaluates every enabled step sequentially, in declared order, without
    /// applying anything.
    ///
    /// # Errors
    ///
    /// `CANCELLED` when cancellation fires between iterations; remaining
    /// steps are not probed.
    async fn verify(
        &self,
        ctx: &ExecutionContext,
        pipeline: &Pipeline,
    ) -> Result<Vec<VerificationResult>, DomainError>;
}
