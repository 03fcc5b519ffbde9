// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Metrics Port
//!
//! Instruments the executor records against. Implementations key counters
//! and histograms by step id and outcome status; the concrete Prometheus
//! adapter lives in the infrastructure layer. Implementations must be safe
//! for concurrent use from every step task.

use crate::value_objects::StepStatus;
use std::time::Duration;

/// Port over execution instrumentation.
pub trait MetricsPort: Send + Sync {
    /// Records one step execution with its outcome and measured duration
    fn record_step_execution(&self, step_id: &str, status: StepStatus, duration: Duration);

    /// Records one full pipeline run
    fn record_pipeline_run(&self, pipeline: &str, success: bool, duration: Duration);

    /// A step task became active
    fn step_started(&self);

    /// A step task settled
    fn step_finished(&self);
}

/// Metrics sink that records nothing. Useful for tests.
#[derive(Debug, Default)]
pub struct NoOpMetrics;

impl NoOpMetrics {
    /// Creates a no-op metrics sink.
    pub fn new() -> Self {
        Self
    }
}

impl MetricsPort for NoOpMetrics {
    fn record_step_execution(&self, _step_id: &str, _status: StepStatus, _duration: Duration) {}
    fn record_pipeline_run(&self, _pipeline: &str, _success: bool, _duration: Duration) {}
    fn step_started(&self) {}
    fn step_finished(&self) {}
}
