// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Evaluation Result
//!
//! The outcome of a handler's side-effect-free pre-flight check. Evaluation
//! answers one question - does the current system state match the desired
//! state? - and is the basis of the engine's idempotence contract: when no
//! action is required, `apply` is never called.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of a handler's pre-flight inspection.
///
/// The optional payload lets a handler carry expensive intermediate state
/// (a parsed file, a resolved package index) from evaluation into apply
/// without recomputing it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationResult {
    requires_action: bool,
    current_state: String,
    desired_state: String,
    diff: String,
    payload: Option<Value>,
}

impl EvaluationResult {
    /// Creates a result reporting that state already matches.
    pub fn satisfied(current_state: impl Into<String>) -> Self {
        let current = current_state.into();
        Self {
            requires_action: false,
            desired_state: current.clone(),
            current_state: current,
            diff: String::new(),
            payload: None,
        }
    }

    /// Creates a result reporting drift between current and desired state.
    pub fn drifted(
        current_state: impl Into<String>,
        desired_state: impl Into<String>,
        diff: impl Into<String>,
    ) -> Self {
        Self {
            requires_action: true,
            current_state: current_state.into(),
            desired_state: desired_state.into(),
            diff: diff.into(),
            payload: None,
        }
    }

    /// Attaches an opaque payload reusable during apply
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Whether apply is required to reach the desired state
    pub fn requires_action(&self) -> bool {
        self.requires_action
    }

    /// Observed state description
    pub fn current_state(&self) -> &str {
        &self.current_state
    }

    /// Desired state description
    pub fn desired_state(&self) -> &str {
        &self.desired_state
    }

    /// Human-readable difference between the two states
    pub fn diff(&self) -> &str {
        &self.diff
    }

    /// Opaque payload the handler stashed for apply
    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_satisfied_requires_no_action() {
        let eval = EvaluationResult::satisfied("symlink -> /opt/tool");
        assert!(!eval.requires_action());
        assert_eq!(eval.current_state(), eval.desired_state());
        assert!(eval.diff().is_empty());
    }

    #[test]
    fn test_drifted_reports_states_and_diff() {
        let eval = EvaluationResult::drifted("absent", "present", "+ /usr/local/bin/tool");
        assert!(eval.requires_action());
        assert_eq!(eval.current_state(), "absent");
        assert_eq!(eval.desired_state(), "present");
        assert_eq!(eval.diff(), "+ /usr/local/bin/tool");
    }

    #[test]
    fn test_payload_round_trip() {
        let eval = EvaluationResult::drifted("a", "b", "")
            .with_payload(serde_json::json!({"resolved_version": "2.1.0"}));
        assert_eq!(
            eval.payload().and_then(|p| p["resolved_version"].as_str()),
            Some("2.1.0")
        );
    }
}
