// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Shared helpers for the integration tests: an instrumented mock handler,
//! an event recorder, and pipeline builders.

#![allow(dead_code)]

use async_trait::async_trait;
use converge_domain::context::ExecutionContext;
use converge_domain::entities::{Pipeline, Settings, Step, StepType};
use converge_domain::error::DomainError;
use converge_domain::events::{EventType, PipelineEvent};
use converge_domain::services::{EventPublisher, HandlerMetadata, StepHandler};
use converge_domain::value_objects::{EvaluationResult, StepResult};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Instrumented handler for executor tests.
///
/// Counts evaluate/apply invocations, tracks the maximum number of
/// simultaneously active applies, and can be told to report drift, fail, or
/// stall per step id.
pub struct MockHandler {
    metadata: HandlerMetadata,
    requires_action: bool,
    satisfied_steps: HashSet<String>,
    failing_steps: HashSet<String>,
    evaluate_failing_steps: HashSet<String>,
    apply_delay: Duration,
    evaluate_calls: AtomicUsize,
    apply_calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    applied_order: Mutex<Vec<String>>,
}

impl MockHandler {
    /// Creates a handler for `step_type` whose steps all report drift.
    pub fn drifted(step_type: StepType) -> Self {
        Self::new(step_type, true)
    }

    /// Creates a handler for `step_type` whose steps are all satisfied.
    pub fn satisfied(step_type: StepType) -> Self {
        Self::new(step_type, false)
    }

    fn new(step_type: StepType, requires_action: bool) -> Self {
        Self {
            metadata: HandlerMetadata::new(
                format!("mock.{}", step_type),
                format!("Mock {}", step_type),
                step_type,
                "1.0.0",
            ),
            requires_action,
            satisfied_steps: HashSet::new(),
            failing_steps: HashSet::new(),
            evaluate_failing_steps: HashSet::new(),
            apply_delay: Duration::ZERO,
            evaluate_calls: AtomicUsize::new(0),
            apply_calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            applied_order: Mutex::new(Vec::new()),
        }
    }

    /// Marks one step id as already satisfied
    pub fn with_satisfied_step(mut self, step_id: &str) -> Self {
        self.satisfied_steps.insert(step_id.to_string());
        self
    }

    /// Makes apply fail for one step id
    pub fn with_failing_step(mut self, step_id: &str) -> Self {
        self.failing_steps.insert(step_id.to_string());
        self
    }

    /// Makes evaluate fail for one step id
    pub fn with_evaluate_failing_step(mut self, step_id: &str) -> Self {
        self.evaluate_failing_steps.insert(step_id.to_string());
        self
    }

    /// Adds an artificial apply latency (for concurrency probes)
    pub fn with_apply_delay(mut self, delay: Duration) -> Self {
        self.apply_delay = delay;
        self
    }

    pub fn evaluate_calls(&self) -> usize {
        self.evaluate_calls.load(Ordering::SeqCst)
    }

    pub fn apply_calls(&self) -> usize {
        self.apply_calls.load(Ordering::SeqCst)
    }

    /// Highest number of applies observed in flight at once
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    /// Step ids in the order their applies completed
    pub fn applied_order(&self) -> Vec<String> {
        self.applied_order.lock().clone()
    }
}

#[async_trait]
impl StepHandler for MockHandler {
    fn metadata(&self) -> &HandlerMetadata {
        &self.metadata
    }

    async fn evaluate(&self, _ctx: &ExecutionContext, step: &Step) -> Result<EvaluationResult, DomainError> {
        self.evaluate_calls.fetch_add(1, Ordering::SeqCst);

        if self.evaluate_failing_steps.contains(step.id()) {
            return Err(DomainError::execution(format!("evaluate of '{}' failed", step.id())));
        }
        if self.satisfied_steps.contains(step.id()) || !self.requires_action {
            return Ok(EvaluationResult::satisfied("mock state"));
        }
        Ok(EvaluationResult::drifted("mock current", "mock desired", "~ mock"))
    }

    async fn apply(
        &self,
        _ctx: &ExecutionContext,
        _evaluation: &EvaluationResult,
        step: &Step,
    ) -> Result<StepResult, DomainError> {
        self.apply_calls.fetch_add(1, Ordering::SeqCst);

        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);
        if !self.apply_delay.is_zero() {
            tokio::time::sleep(self.apply_delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.failing_steps.contains(step.id()) {
            return Err(DomainError::execution(format!("apply of '{}' failed", step.id())));
        }

        self.applied_order.lock().push(step.id().to_string());
        Ok(StepResult::success(step.id()).with_message("mock applied"))
    }
}

/// Collects every published event for assertions.
pub struct EventRecorder {
    events: Arc<Mutex<Vec<PipelineEvent>>>,
}

impl EventRecorder {
    /// Subscribes to every event type on the publisher.
    pub fn attach(publisher: &dyn EventPublisher) -> Self {
        let events: Arc<Mutex<Vec<PipelineEvent>>> = Arc::new(Mutex::new(Vec::new()));
        for event_type in [
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
        ] {
            let sink = Arc::clone(&events);
            publisher.subscribe(
                event_type,
                Arc::new(move |event| {
                    sink.lock().push(event.clone());
                    Ok(())
                }),
            );
        }
        Self { events }
    }

    /// Snapshot of everything recorded so far
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().clone()
    }

    /// Event types, in publication order
    pub fn event_types(&self) -> Vec<EventType> {
        self.events.lock().iter().map(PipelineEvent::event_type).collect()
    }

    /// Number of events of one type
    pub fn count(&self, event_type: EventType) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| event.event_type() == event_type)
            .count()
    }

    /// Event types recorded for one step, in publication order
    pub fn step_event_types(&self, step_id: &str) -> Vec<EventType> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.step_id() == Some(step_id))
            .map(PipelineEvent::event_type)
            .collect()
    }
}

/// Builds a command-type step with a placeholder config.
pub fn step(id: &str, deps: &[&str]) -> Step {
    Step::new(id, StepType::Command)
        .with_config_entry("command", "true")
        .with_depends_on(deps.iter().map(|dep| dep.to_string()).collect())
}

/// Builds a validated pipeline from steps and settings.
pub fn pipeline(name: &str, steps: Vec<Step>, settings: Settings) -> Pipeline {
    Pipeline::new(name, steps)
        .expect("test pipeline must be valid")
        .with_settings(settings)
}

/// Builds a step config map literal.
pub fn config(entries: &[(&str, &str)]) -> HashMap<String, serde_json::Value> {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), serde_json::Value::String(value.to_string())))
        .collect()
}
