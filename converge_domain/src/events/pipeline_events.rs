// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Lifecycle Events
//!
//! Domain events emitted around pipeline execution. Every event carries the
//! correlation id of the run it belongs to and its occurrence timestamp;
//! step-scoped events additionally carry the pipeline name, step id, and step
//! type so a renderer can produce actionable output without extra lookups.
//!
//! The event-type vocabulary is a closed set ([`EventType`]); subscribers
//! register per type and receive events synchronously from the task that
//! produced them, so for a single step the order is always `step.started`
//! followed by exactly one of `step.completed`, `step.failed`, or
//! `step.skipped`.

use crate::context::ExecutionContext;
use crate::entities::StepType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Closed set of event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    PipelineStarted,
    PipelineCompleted,
    PipelineFailed,
    StepStarted,
    StepCompleted,
    StepFailed,
    StepSkipped,
    ValidationStarted,
    ValidationCompleted,
    ValidationFailed,
}

impl EventType {
    /// Stable dotted string form, e.g. `step.completed`.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::PipelineStarted => "pipeline.started",
            EventType::PipelineCompleted => "pipeline.completed",
            EventType::PipelineFailed => "pipeline.failed",
            EventType::StepStarted => "step.started",
            EventType::StepCompleted => "step.completed",
            EventType::StepFailed => "step.failed",
            EventType::StepSkipped => "step.skipped",
            EventType::ValidationStarted => "validation.started",
            EventType::ValidationCompleted => "validation.completed",
            EventType::ValidationFailed => "validation.failed",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline run started.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStartedEvent {
    pub correlation_id: Uuid,
    pub pipeline: String,
    pub step_count: usize,
    pub dry_run: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Pipeline run finished with no error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineCompletedEvent {
    pub correlation_id: Uuid,
    pub pipeline: String,
    pub duration_ms: u64,
    pub changed_steps: usize,
    pub occurred_at: DateTime<Utc>,
}

/// Pipeline run failed; `phase` names where (prepare, execute, validate).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineFailedEvent {
    pub correlation_id: Uuid,
    pub pipeline: String,
    pub phase: String,
    pub error: String,
    pub occurred_at: DateTime<Utc>,
}

/// Step dispatched to its handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepStartedEvent {
    pub correlation_id: Uuid,
    pub pipeline: String,
    pub step_id: String,
    pub step_type: StepType,
    pub dry_run: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Step finished successfully (including dry-run synthesis).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepCompletedEvent {
    pub correlation_id: Uuid,
    pub pipeline: String,
    pub step_id: String,
    pub step_type: StepType,
    pub changed: bool,
    pub dry_run: bool,
    pub duration_ms: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Step failed during evaluation or apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepFailedEvent {
    pub correlation_id: Uuid,
    pub pipeline: String,
    pub step_id: String,
    pub step_type: StepType,
    pub error: String,
    pub duration_ms: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Step skipped because its state already matched the desired state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSkippedEvent {
    pub correlation_id: Uuid,
    pub pipeline: String,
    pub step_id: String,
    pub step_type: StepType,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Post-execution validation began.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationStartedEvent {
    pub correlation_id: Uuid,
    pub pipeline: String,
    pub check_count: usize,
    pub occurred_at: DateTime<Utc>,
}

/// Post-execution validation finished with every check satisfied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationCompletedEvent {
    pub correlation_id: Uuid,
    pub pipeline: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub unknown: usize,
    pub occurred_at: DateTime<Utc>,
}

/// Post-execution validation finished with failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationFailedEvent {
    pub correlation_id: Uuid,
    pub pipeline: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub unknown: usize,
    pub error: String,
    pub occurred_at: DateTime<Utc>,
}

/// Domain events for pipeline execution.
///
/// Each variant wraps a typed payload; [`event_type`](PipelineEvent::event_type)
/// maps a value back into the closed [`EventType`] vocabulary subscribers
/// register under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    PipelineStarted(PipelineStartedEvent),
    PipelineCompleted(PipelineCompletedEvent),
    PipelineFailed(PipelineFailedEvent),
    StepStarted(StepStartedEvent),
    StepCompleted(StepCompletedEvent),
    StepFailed(StepFailedEvent),
    StepSkipped(StepSkippedEvent),
    ValidationStarted(ValidationStartedEvent),
    ValidationCompleted(ValidationCompletedEvent),
    ValidationFailed(ValidationFailedEvent),
}

impl PipelineEvent {
    /// Gets this event's type tag
    pub fn event_type(&self) -> EventType {
        match self {
            PipelineEvent::PipelineStarted(_) => EventType::PipelineStarted,
            PipelineEvent::PipelineCompleted(_) => EventType::PipelineCompleted,
            PipelineEvent::PipelineFailed(_) => EventType::PipelineFailed,
            PipelineEvent::StepStarted(_) => EventType::StepStarted,
            PipelineEvent::StepCompleted(_) => EventType::StepCompleted,
            PipelineEvent::StepFailed(_) => EventType::StepFailed,
            PipelineEvent::StepSkipped(_) => EventType::StepSkipped,
            PipelineEvent::ValidationStarted(_) => EventType::ValidationStarted,
            PipelineEvent::ValidationCompleted(_) => EventType::ValidationCompleted,
            PipelineEvent::ValidationFailed(_) => EventType::ValidationFailed,
        }
    }

    /// Gets the correlation id of the run this event belongs to
    pub fn correlation_id(&self) -> Uuid {
        match self {
            PipelineEvent::PipelineStarted(e) => e.correlation_id,
            PipelineEvent::PipelineCompleted(e) => e.correlation_id,
            PipelineEvent::PipelineFailed(e) => e.correlation_id,
            PipelineEvent::StepStarted(e) => e.correlation_id,
            PipelineEvent::StepCompleted(e) => e.correlation_id,
            PipelineEvent::StepFailed(e) => e.correlation_id,
            PipelineEvent::StepSkipped(e) => e.correlation_id,
            PipelineEvent::ValidationStarted(e) => e.correlation_id,
            PipelineEvent::ValidationCompleted(e) => e.correlation_id,
            PipelineEvent::ValidationFailed(e) => e.correlation_id,
        }
    }

    /// Gets the step id for step-scoped events
    pub fn step_id(&self) -> Option<&str> {
        match self {
            PipelineEvent::StepStarted(e) => Some(&e.step_id),
            PipelineEvent::StepCompleted(e) => Some(&e.step_id),
            PipelineEvent::StepFailed(e) => Some(&e.step_id),
            PipelineEvent::StepSkipped(e) => Some(&e.step_id),
            _ => None,
        }
    }

    /// Convenience constructor stamping correlation id and timestamp.
    pub fn step_started(ctx: &ExecutionContext, pipeline: &str, step_id: &str, step_type: StepType, dry_run: bool) -> Self {
        PipelineEvent::StepStarted(StepStartedEvent {
            correlation_id: ctx.correlation_id(),
            pipeline: pipeline.to_string(),
            step_id: step_id.to_string(),
            step_type,
            dry_run,
            occurred_at: Utc::now(),
        })
    }

    /// Convenience constructor stamping correlation id and timestamp.
    pub fn step_completed(
        ctx: &ExecutionContext,
        pipeline: &str,
        step_id: &str,
        step_type: StepType,
        changed: bool,
        dry_run: bool,
        duration_ms: u64,
    ) -> Self {
        PipelineEvent::StepCompleted(StepCompletedEvent {
            correlation_id: ctx.correlation_id(),
            pipeline: pipeline.to_string(),
            step_id: step_id.to_string(),
            step_type,
            changed,
            dry_run,
            duration_ms,
            occurred_at: Utc::now(),
        })
    }

    /// Convenience constructor stamping correlation id and timestamp.
    pub fn step_failed(
        ctx: &ExecutionContext,
        pipeline: &str,
        step_id: &str,
        step_type: StepType,
        error: &str,
        duration_ms: u64,
    ) -> Self {
        PipelineEvent::StepFailed(StepFailedEvent {
            correlation_id: ctx.correlation_id(),
            pipeline: pipeline.to_string(),
            step_id: step_id.to_string(),
            step_type,
            error: error.to_string(),
            duration_ms,
            occurred_at: Utc::now(),
        })
    }

    /// Convenience constructor stamping correlation id and timestamp.
    pub fn step_skipped(ctx: &ExecutionContext, pipeline: &str, step_id: &str, step_type: StepType, reason: &str) -> Self {
        PipelineEvent::StepSkipped(StepSkippedEvent {
            correlation_id: ctx.correlation_id(),
            pipeline: pipeline.to_string(),
            step_id: step_id.to_string(),
            step_type,
            reason: reason.to_string(),
            occurred_at: Utc::now(),
        })
    }

    /// Convenience constructor stamping correlation id and timestamp.
    pub fn pipeline_started(ctx: &ExecutionContext, pipeline: &str, step_count: usize, dry_run: bool) -> Self {
        PipelineEvent::PipelineStarted(PipelineStartedEvent {
            correlation_id: ctx.correlation_id(),
            pipeline: pipeline.to_string(),
            step_count,
            dry_run,
            occurred_at: Utc::now(),
        })
    }

    /// Convenience constructor stamping correlation id and timestamp.
    pub fn pipeline_completed(ctx: &ExecutionContext, pipeline: &str, duration_ms: u64, changed_steps: usize) -> Self {
        PipelineEvent::PipelineCompleted(PipelineCompletedEvent {
            correlation_id: ctx.correlation_id(),
            pipeline: pipeline.to_string(),
            duration_ms,
            changed_steps,
            occurred_at: Utc::now(),
        })
    }

    /// Convenience constructor stamping correlation id and timestamp.
    pub fn pipeline_failed(ctx: &ExecutionContext, pipeline: &str, phase: &str, error: &str) -> Self {
        PipelineEvent::PipelineFailed(PipelineFailedEvent {
            correlation_id: ctx.correlation_id(),
            pipeline: pipeline.to_string(),
            phase: phase.to_string(),
            error: error.to_string(),
            occurred_at: Utc::now(),
        })
    }

    /// Convenience constructor stamping correlation id and timestamp.
    pub fn validation_started(ctx: &ExecutionContext, pipeline: &str, check_count: usize) -> Self {
        PipelineEvent::ValidationStarted(ValidationStartedEvent {
            correlation_id: ctx.correlation_id(),
            pipeline: pipeline.to_string(),
            check_count,
            occurred_at: Utc::now(),
        })
    }

    /// Convenience constructor stamping correlation id and timestamp.
    pub fn validation_completed(
        ctx: &ExecutionContext,
        pipeline: &str,
        total: usize,
        passed: usize,
        failed: usize,
        unknown: usize,
    ) -> Self {
        PipelineEvent::ValidationCompleted(ValidationCompletedEvent {
            correlation_id: ctx.correlation_id(),
            pipeline: pipeline.to_string(),
            total,
            passed,
            failed,
            unknown,
            occurred_at: Utc::now(),
        })
    }

    /// Convenience constructor stamping correlation id and timestamp.
    #[allow(clippy::too_many_arguments)]
    pub fn validation_failed(
        ctx: &ExecutionContext,
        pipeline: &str,
        total: usize,
        passed: usize,
        failed: usize,
        unknown: usize,
        error: &str,
    ) -> Self {
        PipelineEvent::ValidationFailed(ValidationFailedEvent {
            correlation_id: ctx.correlation_id(),
            pipeline: pipeline.to_string(),
            total,
            passed,
            failed,
            unknown,
            error: error.to_string(),
            occurred_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_strings_are_the_closed_set() {
        let expected = [
            "pipeline.started",
            "pipeline.completed",
            "pipeline.failed",
            "step.started",
            "step.completed",
            "step.failed",
            "step.skipped",
            "validation.started",
            "validation.completed",
            "validation.failed",
        ];
        let actual = [
            EventType::PipelineStarted,
            EventType::PipelineCompleted,
            EventType::PipelineFailed,
            EventType::StepStarted,
            EventType::StepCompleted,
            EventType::StepFailed,
            EventType::StepSkipped,
            EventType::ValidationStarted,
            EventType::ValidationCompleted,
            EventType::ValidationFailed,
        ];
        for (tag, value) in expected.iter().zip(actual.iter()) {
            assert_eq!(value.as_str(), *tag);
        }
    }

    #[test]
    fn test_step_events_carry_identity_fields() {
        let ctx = ExecutionContext::new();
        let event = PipelineEvent::step_failed(&ctx, "workstation", "deploy", StepType::Command, "boom", 12);

        assert_eq!(event.event_type(), EventType::StepFailed);
        assert_eq!(event.correlation_id(), ctx.correlation_id());
        assert_eq!(event.step_id(), Some("deploy"));
        match event {
            PipelineEvent::StepFailed(payload) => {
                assert_eq!(payload.pipeline, "workstation");
                assert_eq!(payload.step_type, StepType::Command);
                assert_eq!(payload.error, "boom");
            }
            _ => panic!("expected step.failed"),
        }
    }

    #[test]
    fn test_events_serialize() {
        let ctx = ExecutionContext::new();
        let event = PipelineEvent::pipeline_started(&ctx, "p", 3, false);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"pipeline\":\"p\""));
    }
}
