// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Entity
//!
//! The `Pipeline` entity is the top-level aggregate of the engine: a named,
//! versioned collection of [`Step`]s with declared dependencies, execution
//! [`Settings`], and optional post-execution [`Validation`]s.
//!
//! ## Overview
//!
//! A pipeline is produced by the configuration loader, validated eagerly, and
//! treated as immutable afterwards. Validation enforces, in order:
//!
//! 1. The name is present
//! 2. Every step satisfies its own invariants
//! 3. Step identifiers are unique
//! 4. Every declared dependency refers to an existing step
//! 5. The step dependency graph is acyclic
//!
//! Cycle detection is a depth-first search with three-color marking
//! (unvisited, on-stack, done); a cycle report includes the full back-edge
//! path so the user can see exactly which chain of steps closes the loop.
//!
//! ## Defensive Cloning
//!
//! `Clone` performs a deep copy: steps, their configuration maps, and
//! validation configs are all owned data, so a cloned pipeline shares no
//! storage with the original. Callers that run two executors over the same
//! pipeline rely on this to keep a mutating handler from poisoning the
//! second run.

use crate::entities::{Settings, Step, Validation};
use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Depth-first search coloring used by cycle detection.
#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

fn default_version() -> String {
    "1.0".to_string()
}

/// Top-level aggregate: a named, versioned collection of steps with
/// dependencies and optional post-execution validations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    // Identity fields (always first)
    #[serde(default = "default_version")]
    version: String,
    name: String,

    // Core business fields
    #[serde(default)]
    description: String,
    #[serde(default)]
    settings: Settings,
    steps: Vec<Step>,
    #[serde(default)]
    validations: Vec<Validation>,
}

impl Pipeline {
    /// Creates a pipeline and validates it eagerly.
    ///
    /// # Errors
    ///
    /// Any invariant violation from [`validate`](Pipeline::validate).
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Result<Self, DomainError> {
        let pipeline = Self {
            version: default_version(),
            name: name.into(),
            description: String::new(),
            settings: Settings::default(),
            steps,
            validations: Vec::new(),
        };
        pipeline.validate()?;
        Ok(pipeline)
    }

    /// Sets the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Replaces the execution settings.
    ///
    /// Used by callers that override settings from the command line (for
    /// example `--dry-run`); the replacement happens on a clone, never on a
    /// pipeline another component is executing.
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Replaces the post-execution validations
    pub fn with_validations(mut self, validations: Vec<Validation>) -> Self {
        self.validations = validations;
        self
    }

    /// Gets the configuration format version
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Gets the pipeline name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the description (may be empty)
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Gets the execution settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Gets the ordered steps
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Gets the ordered post-execution validations
    pub fn validations(&self) -> &[Validation] {
        &self.validations
    }

    /// Looks up a step by identifier
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|step| step.id() == id)
    }

    /// Number of enabled steps
    pub fn enabled_step_count(&self) -> usize {
        self.steps.iter().filter(|step| step.enabled()).count()
    }

    /// Validates every pipeline invariant.
    ///
    /// Runs in a fixed order so the first reported failure is deterministic:
    /// name, per-step invariants, identifier uniqueness, dependency
    /// resolution, acyclicity.
    ///
    /// # Errors
    ///
    /// - `VALIDATION_ERROR` - missing name, no steps, or a step-level failure
    /// - `DUPLICATE_ID` - two steps share an identifier
    /// - `DEPENDENCY_ERROR` - a dependency names an unknown step
    /// - `CIRCULAR_DEPENDENCY` - the dependency graph has a cycle; the
    ///   `cycle` context entry carries the full back-edge path
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.is_empty() {
            return Err(DomainError::validation("pipeline name cannot be empty"));
        }
        if self.steps.is_empty() {
            return Err(DomainError::validation(format!(
                "pipeline '{}' must declare at least one step",
                self.name
            )));
        }

        for step in &self.steps {
            step.validate()?;
        }

        let mut seen: HashSet<&str> = HashSet::with_capacity(self.steps.len());
        for step in &self.steps {
            if !seen.insert(step.id()) {
                return Err(
                    DomainError::duplicate_id(format!("duplicate step id '{}'", step.id()))
                        .with_context("step_id", step.id()),
                );
            }
        }

        for step in &self.steps {
            for dep in step.depends_on() {
                if !seen.contains(dep.as_str()) {
                    return Err(DomainError::dependency(format!(
                        "step '{}' depends on unknown step '{}'",
                        step.id(),
                        dep
                    ))
                    .with_context("step_id", step.id())
                    .with_context("missing_dependency", dep));
                }
            }
        }

        self.detect_cycles()?;

        for validation in &self.validations {
            validation.validate()?;
        }

        Ok(())
    }

    /// Depth-first cycle detection over the full step graph.
    fn detect_cycles(&self) -> Result<(), DomainError> {
        let mut marks: HashMap<&str, Mark> = self
            .steps
            .iter()
            .map(|step| (step.id(), Mark::Unvisited))
            .collect();
        let mut stack: Vec<&str> = Vec::new();

        for step in &self.steps {
            if marks[step.id()] == Mark::Unvisited {
                self.visit(step.id(), &mut marks, &mut stack)?;
            }
        }
        Ok(())
    }

    fn visit<'a>(
        &'a self,
        id: &'a str,
        marks: &mut HashMap<&'a str, Mark>,
        stack: &mut Vec<&'a str>,
    ) -> Result<(), DomainError> {
        marks.insert(id, Mark::OnStack);
        stack.push(id);

        // Dependency resolution ran before cycle detection, so the lookup
        // cannot miss here.
        if let Some(step) = self.step(id) {
            for dep in step.depends_on() {
                match marks.get(dep.as_str()).copied().unwrap_or(Mark::Done) {
                    Mark::OnStack => {
                        let start = stack.iter().position(|s| *s == dep.as_str()).unwrap_or(0);
                        let mut path: Vec<&str> = stack[start..].to_vec();
                        path.push(dep.as_str());
                        let rendered = path.join(" -> ");
                        return Err(DomainError::circular_dependency(format!(
                            "dependency cycle detected: {}",
                            rendered
                        ))
                        .with_context("cycle", rendered));
                    }
                    Mark::Unvisited => self.visit(dep.as_str(), marks, stack)?,
                    Mark::Done => {}
                }
            }
        }

        stack.pop();
        marks.insert(id, Mark::Done);
        Ok(())
    }
}
