// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Verification Results
//!
//! Verification has two producers with one vocabulary: the executor's verify
//! path (one probe per step, in declared order) and the post-execution
//! validation service (one probe per declared check). Both emit
//! [`VerificationResult`]s that a [`VerificationSummary`] aggregates with
//! counters maintained on insertion.

use std::collections::HashMap;
use std::fmt;

/// Closed set of verification outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerificationStatus {
    Satisfied,
    Failed,
    Unknown,
}

impl VerificationStatus {
    /// Stable string form used in reports and events.
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Satisfied => "satisfied",
            VerificationStatus::Failed => "failed",
            VerificationStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one verification probe.
///
/// `kind` carries the step type tag for verify probes and the validation
/// type tag for post-execution checks.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationResult {
    step_id: String,
    kind: String,
    status: VerificationStatus,
    message: String,
    details: HashMap<String, String>,
}

impl VerificationResult {
    /// Creates a probe result.
    pub fn new(
        step_id: impl Into<String>,
        kind: impl Into<String>,
        status: VerificationStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            step_id: step_id.into(),
            kind: kind.into(),
            status,
            message: message.into(),
            details: HashMap::new(),
        }
    }

    /// Attaches a detail entry
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Gets the probed step or check identifier
    pub fn step_id(&self) -> &str {
        &self.step_id
    }

    /// Gets the type tag of the probed subject
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Gets the probe status
    pub fn status(&self) -> VerificationStatus {
        self.status
    }

    /// Gets the human-readable message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Gets the detail map
    pub fn details(&self) -> &HashMap<String, String> {
        &self.details
    }

    /// Looks up a single detail entry
    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details.get(key).map(String::as_str)
    }
}

/// Aggregate over verification results.
///
/// Counters are maintained on insertion so they always agree with the
/// stored results: `total == passed + failed + unknown`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerificationSummary {
    total: usize,
    passed: usize,
    failed: usize,
    unknown: usize,
    results: Vec<VerificationResult>,
}

impl VerificationSummary {
    /// Creates an empty summary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a result, updating the counters.
    pub fn add(&mut self, result: VerificationResult) {
        self.total += 1;
        match result.status() {
            VerificationStatus::Satisfied => self.passed += 1,
            VerificationStatus::Failed => self.failed += 1,
            VerificationStatus::Unknown => self.unknown += 1,
        }
        self.results.push(result);
    }

    /// Merges another summary into this one.
    ///
    /// Counter accumulation is associative and commutative; result order
    /// follows merge order.
    pub fn merge(&mut self, other: VerificationSummary) {
        self.total += other.total;
        self.passed += other.passed;
        self.failed += other.failed;
        self.unknown += other.unknown;
        self.results.extend(other.results);
    }

    /// Total number of probes recorded
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of satisfied probes
    pub fn passed(&self) -> usize {
        self.passed
    }

    /// Number of failed probes
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Number of probes with unknown outcome
    pub fn unknown(&self) -> usize {
        self.unknown
    }

    /// The recorded results, in insertion order
    pub fn results(&self) -> &[VerificationResult] {
        &self.results
    }

    /// Whether every probe passed
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}
