// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Execution Metrics
//!
//! Prometheus adapter behind the [`MetricsPort`]. Per-step counters and
//! duration histograms are labeled by step id and outcome status so
//! dashboards can slice failures and latency per step; pipeline-level
//! counters and an active-step gauge cover the run as a whole. The registry
//! is owned here and exposed in text exposition format for scraping.

use converge_domain::error::DomainError;
use converge_domain::services::MetricsPort;
use converge_domain::value_objects::StepStatus;
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

/// Prometheus-backed execution metrics.
#[derive(Clone)]
pub struct ExecutionMetrics {
    registry: Arc<Registry>,
    step_executions_total: IntCounterVec,
    step_duration_seconds: HistogramVec,
    pipeline_runs_total: IntCounterVec,
    pipeline_duration_seconds: Histogram,
    active_steps: IntGauge,
}

impl ExecutionMetrics {
    /// Creates the metric set and registers it on a fresh registry.
    pub fn new() -> Result<Self, DomainError> {
        let registry = Registry::new();

        let step_executions_total = IntCounterVec::new(
            Opts::new("step_executions_total", "Step executions by step id and status").namespace("converge"),
            &["step_id", "status"],
        )
        .map_err(|e| DomainError::internal(format!("failed to create step_executions_total metric: {}", e)))?;

        let step_duration_seconds = HistogramVec::new(
            HistogramOpts::new("step_duration_seconds", "Step execution duration by step id and status")
                .namespace("converge"),
            &["step_id", "status"],
        )
        .map_err(|e| DomainError::internal(format!("failed to create step_duration_seconds metric: {}", e)))?;

        let pipeline_runs_total = IntCounterVec::new(
            Opts::new("pipeline_runs_total", "Pipeline runs by pipeline and outcome").namespace("converge"),
            &["pipeline", "outcome"],
        )
        .map_err(|e| DomainError::internal(format!("failed to create pipeline_runs_total metric: {}", e)))?;

        let pipeline_duration_seconds = Histogram::with_opts(
            HistogramOpts::new("pipeline_duration_seconds", "Full pipeline run duration").namespace("converge"),
        )
        .map_err(|e| DomainError::internal(format!("failed to create pipeline_duration_seconds metric: {}", e)))?;

        let active_steps = IntGauge::with_opts(
            Opts::new("active_steps", "Step tasks currently executing").namespace("converge"),
        )
        .map_err(|e| DomainError::internal(format!("failed to create active_steps metric: {}", e)))?;

        registry
            .register(Box::new(step_executions_total.clone()))
            .map_err(|e| DomainError::internal(format!("failed to register step_executions_total: {}", e)))?;
        registry
            .register(Box::new(step_duration_seconds.clone()))
            .map_err(|e| DomainError::internal(format!("failed to register step_duration_seconds: {}", e)))?;
        registry
            .register(Box::new(pipeline_runs_total.clone()))
            .map_err(|e| DomainError::internal(format!("failed to register pipeline_runs_total: {}", e)))?;
        registry
            .register(Box::new(pipeline_duration_seconds.clone()))
            .map_err(|e| DomainError::internal(format!("failed to register pipeline_duration_seconds: {}", e)))?;
        registry
            .register(Box::new(active_steps.clone()))
            .map_err(|e| DomainError::internal(format!("failed to register active_steps: {}", e)))?;

        tracing::debug!("ExecutionMetrics initialized with Prometheus registry");

        Ok(Self {
            registry: Arc::new(registry),
            step_executions_total,
            step_duration_seconds,
            pipeline_runs_total,
            pipeline_duration_seconds,
            active_steps,
        })
    }

    /// Renders the registry in Prometheus text exposition format.
    pub fn gather(&self) -> Result<String, DomainError> {
        TextEncoder::new()
            .encode_to_string(&self.registry.gather())
            .map_err(|e| DomainError::internal(format!("failed to encode metrics: {}", e)))
    }

    /// The underlying registry, for embedders that scrape themselves.
    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }
}

impl MetricsPort for ExecutionMetrics {
    fn record_step_execution(&self, step_id: &str, status: StepStatus, duration: Duration) {
        self.step_executions_total
            .with_label_values(&[step_id, status.as_str()])
            .inc();
        self.step_duration_seconds
            .with_label_values(&[step_id, status.as_str()])
            .observe(duration.as_secs_f64());
    }

    fn record_pipeline_run(&self, pipeline: &str, success: bool, duration: Duration) {
        let outcome = if success { "success" } else { "failure" };
        self.pipeline_runs_total.with_label_values(&[pipeline, outcome]).inc();
        self.pipeline_duration_seconds.observe(duration.as_secs_f64());
    }

    fn step_started(&self) {
        self.active_steps.inc();
    }

    fn step_finished(&self) {
        self.active_steps.dec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_step_execution_labels() {
        let metrics = ExecutionMetrics::new().unwrap();
        metrics.record_step_execution("install", StepStatus::Success, Duration::from_millis(50));
        metrics.record_step_execution("install", StepStatus::Failure, Duration::from_millis(10));

        let rendered = metrics.gather().unwrap();
        assert!(rendered.contains("converge_step_executions_total"));
        assert!(rendered.contains("step_id=\"install\""));
        assert!(rendered.contains("status=\"failure\""));
    }

    #[test]
    fn test_active_steps_gauge_balances() {
        let metrics = ExecutionMetrics::new().unwrap();
        metrics.step_started();
        metrics.step_started();
        metrics.step_finished();
        metrics.step_finished();

        let rendered = metrics.gather().unwrap();
        assert!(rendered.contains("converge_active_steps 0"));
    }

    #[test]
    fn test_pipeline_run_outcomes() {
        let metrics = ExecutionMetrics::new().unwrap();
        metrics.record_pipeline_run("ws", true, Duration::from_secs(1));
        metrics.record_pipeline_run("ws", false, Duration::from_secs(2));

        let rendered = metrics.gather().unwrap();
        assert!(rendered.contains("outcome=\"success\""));
        assert!(rendered.contains("outcome=\"failure\""));
    }
}
