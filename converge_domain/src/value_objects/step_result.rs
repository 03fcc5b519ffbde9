// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Step Result
//!
//! The outcome of one step's execution: a status from the closed set, the
//! measured duration, captured output, an optional structured error, and the
//! `changed` flag renderers use to distinguish "did something" from "was
//! already right".

use crate::error::DomainError;
use std::fmt;
use std::time::Duration;

/// Closed set of step outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepStatus {
    Success,
    Failure,
    Skipped,
    AlreadySatisfied,
}

impl StepStatus {
    /// Stable string form used in events, metrics labels, and CLI output.
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Success => "success",
            StepStatus::Failure => "failure",
            StepStatus::Skipped => "skipped",
            StepStatus::AlreadySatisfied => "already_satisfied",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one step's execution.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    step_id: String,
    status: StepStatus,
    duration_ms: u64,
    message: String,
    output: String,
    error: Option<DomainError>,
    changed: bool,
    diff: String,
}

impl StepResult {
    /// Creates a successful result (the step applied a change).
    pub fn success(step_id: impl Into<String>) -> Self {
        Self::with_status(step_id, StepStatus::Success)
    }

    /// Creates a failure result carrying the structured error.
    pub fn failure(step_id: impl Into<String>, error: DomainError) -> Self {
        let mut result = Self::with_status(step_id, StepStatus::Failure);
        result.message = error.to_string();
        result.error = Some(error);
        result
    }

    /// Creates a skipped result (dry-run with no drift, or operator skip).
    pub fn skipped(step_id: impl Into<String>) -> Self {
        Self::with_status(step_id, StepStatus::Skipped)
    }

    /// Creates an already-satisfied result (evaluation found no drift).
    pub fn already_satisfied(step_id: impl Into<String>) -> Self {
        Self::with_status(step_id, StepStatus::AlreadySatisfied)
    }

    fn with_status(step_id: impl Into<String>, status: StepStatus) -> Self {
        Self {
            step_id: step_id.into(),
            status,
            duration_ms: 0,
            message: String::new(),
            output: String::new(),
            error: None,
            changed: status == StepStatus::Success,
            diff: String::new(),
        }
    }

    /// Sets the human-readable message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Sets the captured output (stdout/stderr or handler notes)
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }

    /// Sets the changed flag
    pub fn with_changed(mut self, changed: bool) -> Self {
        self.changed = changed;
        self
    }

    /// Sets the diff rendered by the handler
    pub fn with_diff(mut self, diff: impl Into<String>) -> Self {
        self.diff = diff.into();
        self
    }

    /// Sets the measured duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = duration.as_millis() as u64;
        self
    }

    /// Stamps the step id when the handler left it empty. Used by the
    /// executor to normalize handler output.
    pub fn ensure_step_id(&mut self, step_id: &str) {
        if self.step_id.is_empty() {
            self.step_id = step_id.to_string();
        }
    }

    /// Overwrites the measured duration. Used by the executor, which owns
    /// timing.
    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_ms = duration.as_millis() as u64;
    }

    /// Gets the step identifier
    pub fn step_id(&self) -> &str {
        &self.step_id
    }

    /// Gets the outcome status
    pub fn status(&self) -> StepStatus {
        self.status
    }

    /// Gets the measured duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// Gets the human-readable message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Gets the captured output
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Gets the structured error, when the step failed
    pub fn error(&self) -> Option<&DomainError> {
        self.error.as_ref()
    }

    /// Whether the step changed system state
    pub fn changed(&self) -> bool {
        self.changed
    }

    /// Gets the diff rendered by the handler
    pub fn diff(&self) -> &str {
        &self.diff
    }

    /// Whether the step ended in failure
    pub fn is_failure(&self) -> bool {
        self.status == StepStatus::Failure
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_defaults_to_changed() {
        let result = StepResult::success("install");
        assert_eq!(result.status(), StepStatus::Success);
        assert!(result.changed());
        assert!(!result.is_failure());
    }

    #[test]
    fn test_already_satisfied_is_unchanged() {
        let result = StepResult::already_satisfied("install");
        assert!(!result.changed());
        assert_eq!(result.status(), StepStatus::AlreadySatisfied);
    }

    #[test]
    fn test_failure_carries_error_and_message() {
        let err = DomainError::execution("exit status 1").with_context("step_id", "deploy");
        let result = StepResult::failure("deploy", err.clone());
        assert!(result.is_failure());
        assert_eq!(result.error(), Some(&err));
        assert!(result.message().contains("exit status 1"));
        assert!(!result.changed());
    }

    #[test]
    fn test_duration_is_stamped_in_millis() {
        let result = StepResult::success("x").with_duration(Duration::from_millis(1234));
        assert_eq!(result.duration_ms(), 1234);
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(StepStatus::AlreadySatisfied.as_str(), "already_satisfied");
        assert_eq!(StepStatus::Skipped.as_str(), "skipped");
    }
}
