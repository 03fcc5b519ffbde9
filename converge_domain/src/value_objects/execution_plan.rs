// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Execution Plan
//!
//! The levelized schedule of a pipeline. Level K contains the steps whose
//! longest dependency chain to a root has length K; every step in a level may
//! run concurrently, and every dependency of a step lies in a strictly lower
//! level. Plans are produced by the planner and cross-validated against the
//! pipeline before execution.

use crate::entities::Pipeline;
use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One level of the plan: steps that may run concurrently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionLevel {
    index: usize,
    step_ids: Vec<String>,
}

impl ExecutionLevel {
    /// Creates a level from its index and member step ids.
    pub fn new(index: usize, step_ids: Vec<String>) -> Self {
        Self { index, step_ids }
    }

    /// Gets the level index (0-based)
    pub fn index(&self) -> usize {
        self.index
    }

    /// Gets the member step ids, in planner order
    pub fn step_ids(&self) -> &[String] {
        &self.step_ids
    }

    /// Number of steps in this level
    pub fn len(&self) -> usize {
        self.step_ids.len()
    }

    /// Whether the level is empty (never true for planner output)
    pub fn is_empty(&self) -> bool {
        self.step_ids.is_empty()
    }
}

/// Levelized schedule produced by the planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    levels: Vec<ExecutionLevel>,
    step_count: usize,
}

impl ExecutionPlan {
    /// Creates a plan from its levels and total enabled-step count.
    pub fn new(levels: Vec<ExecutionLevel>, step_count: usize) -> Self {
        Self { levels, step_count }
    }

    /// Gets the ordered levels
    pub fn levels(&self) -> &[ExecutionLevel] {
        &self.levels
    }

    /// Total number of enabled steps scheduled by this plan
    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// Finds the level index a step was scheduled into
    pub fn level_of(&self, step_id: &str) -> Option<usize> {
        self.levels
            .iter()
            .find(|level| level.step_ids().iter().any(|id| id == step_id))
            .map(ExecutionLevel::index)
    }

    /// Cross-validates the plan against the pipeline it was built from.
    ///
    /// Enforces the plan invariants: at least one level, no empty level,
    /// every identifier in exactly one level, every enabled pipeline step
    /// scheduled, and every dependency edge crossing strictly upward
    /// (dependency level < dependent level).
    ///
    /// # Errors
    ///
    /// `VALIDATION_ERROR` with `step_id` / `dependency` context naming the
    /// offending entry.
    pub fn validate(&self, pipeline: &Pipeline) -> Result<(), DomainError> {
        if self.levels.is_empty() {
            return Err(DomainError::validation("execution plan has no levels"));
        }

        let mut level_by_id: HashMap<&str, usize> = HashMap::with_capacity(self.step_count);
        for level in &self.levels {
            if level.is_empty() {
                return Err(DomainError::validation(format!(
                    "execution plan level {} is empty",
                    level.index()
                )));
            }
            for id in level.step_ids() {
                if level_by_id.insert(id.as_str(), level.index()).is_some() {
                    return Err(DomainError::validation(format!(
                        "step '{}' appears in more than one plan level",
                        id
                    ))
                    .with_context("step_id", id));
                }
            }
        }

        let enabled: HashSet<&str> = pipeline
            .steps()
            .iter()
            .filter(|step| step.enabled())
            .map(|step| step.id())
            .collect();

        for id in level_by_id.keys() {
            if !enabled.contains(id) {
                return Err(DomainError::validation(format!(
                    "plan schedules '{}' which is not an enabled pipeline step",
                    id
                ))
                .with_context("step_id", *id));
            }
        }
        for id in &enabled {
            if !level_by_id.contains_key(id) {
                return Err(DomainError::validation(format!(
                    "enabled step '{}' is missing from the plan",
                    id
                ))
                .with_context("step_id", *id));
            }
        }

        for step in pipeline.steps().iter().filter(|step| step.enabled()) {
            let step_level = level_by_id[step.id()];
            for dep in step.depends_on() {
                if let Some(dep_level) = level_by_id.get(dep.as_str()) {
                    if *dep_level >= step_level {
                        return Err(DomainError::validation(format!(
                            "dependency '{}' of step '{}' is not scheduled in a lower level",
                            dep,
                            step.id()
                        ))
                        .with_context("step_id", step.id())
                        .with_context("dependency", dep));
                    }
                }
            }
        }

        Ok(())
    }
}
