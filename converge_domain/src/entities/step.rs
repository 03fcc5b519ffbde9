// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Step Entity
//!
//! A `Step` is the unit of work in a converge pipeline: install a package,
//! clone a repository, create a symlink, copy a file, run a command, render a
//! template, or edit a line in a file. Steps declare dependencies on other
//! steps by identifier; the planner levelizes the resulting graph and the
//! executor dispatches each step to the handler registered for its type tag.
//!
//! ## Invariants
//!
//! - The identifier is required and must match `^[A-Za-z0-9_-]+$`
//! - Enabled steps must carry a non-empty configuration
//! - A step may not depend on itself
//! - The verify timeout is non-negative (enforced by the unsigned type)
//!
//! The configuration payload stays an opaque string-keyed map at the domain
//! boundary; converting it into a typed config is the handler's
//! responsibility, and handlers must treat it as read-only.

use crate::error::DomainError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Identifier grammar shared by every step.
static STEP_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("step id pattern is valid"));

/// Closed set of step type tags.
///
/// The tag selects the handler in the plugin registry. The wire form
/// (`as_str`) matches the YAML configuration vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    Package,
    Repo,
    Symlink,
    Copy,
    Command,
    Template,
    LineInFile,
}

impl StepType {
    /// Stable string form used in configuration files, events, and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::Package => "package",
            StepType::Repo => "repo",
            StepType::Symlink => "symlink",
            StepType::Copy => "copy",
            StepType::Command => "command",
            StepType::Template => "template",
            StepType::LineInFile => "line_in_file",
        }
    }

    /// All known type tags, in declaration order.
    pub fn all() -> &'static [StepType] {
        &[
            StepType::Package,
            StepType::Repo,
            StepType::Symlink,
            StepType::Copy,
            StepType::Command,
            StepType::Template,
            StepType::LineInFile,
        ]
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StepType::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                DomainError::invalid_type(format!("unknown step type '{}'", s)).with_context("step_type", s)
            })
    }
}

fn default_enabled() -> bool {
    true
}

/// Unit of work within a pipeline.
///
/// Steps are produced by the configuration loader and are immutable once the
/// owning pipeline has been validated. The builder-style `with_*` methods
/// exist for programmatic construction (wiring code and tests); they are not
/// mutation of a validated pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    // Identity fields (always first)
    id: String,
    #[serde(default)]
    name: String,

    // Core business fields
    #[serde(rename = "type")]
    step_type: StepType,
    #[serde(default)]
    depends_on: Vec<String>,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default, rename = "verify_timeout")]
    verify_timeout_secs: u64,
    #[serde(default)]
    config: HashMap<String, Value>,
}

impl Step {
    /// Creates a step with defaults: enabled, no dependencies, empty config.
    pub fn new(id: impl Into<String>, step_type: StepType) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            step_type,
            depends_on: Vec::new(),
            enabled: true,
            verify_timeout_secs: 0,
            config: HashMap::new(),
        }
    }

    /// Sets the human-readable name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the dependency list
    pub fn with_depends_on(mut self, depends_on: Vec<String>) -> Self {
        self.depends_on = depends_on;
        self
    }

    /// Sets the enabled flag
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the verify timeout in seconds
    pub fn with_verify_timeout_secs(mut self, secs: u64) -> Self {
        self.verify_timeout_secs = secs;
        self
    }

    /// Replaces the configuration map
    pub fn with_config(mut self, config: HashMap<String, Value>) -> Self {
        self.config = config;
        self
    }

    /// Inserts a single configuration entry
    pub fn with_config_entry(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Gets the step identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Gets the human-readable name (may be empty)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the type tag
    pub fn step_type(&self) -> StepType {
        self.step_type
    }

    /// Gets the declared dependencies (step identifiers)
    pub fn depends_on(&self) -> &[String] {
        &self.depends_on
    }

    /// Checks whether the step participates in execution
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Gets the verification timeout in seconds (0 means unbounded)
    pub fn verify_timeout_secs(&self) -> u64 {
        self.verify_timeout_secs
    }

    /// Gets the opaque handler configuration.
    ///
    /// Handlers must treat this map as read-only.
    pub fn config(&self) -> &HashMap<String, Value> {
        &self.config
    }

    /// Validates the step's own invariants.
    ///
    /// Cross-step invariants (identifier uniqueness, dependency resolution,
    /// acyclicity) are the pipeline's responsibility. A disabled step must
    /// still carry a valid identifier, but its configuration is not
    /// inspected.
    ///
    /// # Errors
    ///
    /// - `VALIDATION_ERROR` - empty or malformed identifier, or an enabled
    ///   step with an empty configuration
    /// - `DEPENDENCY_ERROR` - the step depends on itself
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.id.is_empty() {
            return Err(DomainError::validation("step id cannot be empty"));
        }
        if !STEP_ID_PATTERN.is_match(&self.id) {
            return Err(DomainError::validation(format!(
                "step id '{}' must match ^[A-Za-z0-9_-]+$",
                self.id
            ))
            .with_context("step_id", &self.id));
        }
        if self.depends_on.iter().any(|dep| dep == &self.id) {
            return Err(
                DomainError::dependency(format!("step '{}' cannot depend on itself", self.id))
                    .with_context("step_id", &self.id),
            );
        }
        if self.enabled && self.config.is_empty() {
            return Err(DomainError::validation(format!(
                "enabled step '{}' must carry a non-empty configuration",
                self.id
            ))
            .with_context("step_id", &self.id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn configured_step(id: &str) -> Step {
        Step::new(id, StepType::Command).with_config_entry("command", "true")
    }

    #[test]
    fn test_valid_step_passes() {
        assert!(configured_step("install_tools-01").validate().is_ok());
    }

    #[test]
    fn test_empty_id_rejected() {
        let err = configured_step("").validate().unwrap_err();
        assert_eq!(err.code(), ErrorCode::Validation);
    }

    #[test]
    fn test_malformed_id_rejected() {
        let err = configured_step("bad id!").validate().unwrap_err();
        assert_eq!(err.code(), ErrorCode::Validation);
        assert_eq!(err.context_value("step_id"), Some("bad id!"));
    }

    #[test]
    fn test_self_dependency_rejected() {
        let err = configured_step("loop")
            .with_depends_on(vec!["loop".to_string()])
            .validate()
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Dependency);
    }

    #[test]
    fn test_enabled_step_requires_config() {
        let err = Step::new("bare", StepType::Command).validate().unwrap_err();
        assert_eq!(err.code(), ErrorCode::Validation);
    }

    #[test]
    fn test_disabled_step_config_not_inspected() {
        let step = Step::new("later", StepType::Package).with_enabled(false);
        assert!(step.validate().is_ok());
    }

    #[test]
    fn test_step_type_round_trip() {
        for tag in StepType::all() {
            assert_eq!(tag.as_str().parse::<StepType>().unwrap(), *tag);
        }
        assert_eq!("line_in_file".parse::<StepType>().unwrap(), StepType::LineInFile);
        assert!("desktop_shortcut".parse::<StepType>().is_err());
    }

    #[test]
    fn test_deserializes_with_defaults() {
        let step: Step = serde_json::from_value(serde_json::json!({
            "id": "fetch",
            "type": "repo",
            "config": {"url": "https://example.com/repo.git"}
        }))
        .unwrap();

        assert!(step.enabled());
        assert!(step.depends_on().is_empty());
        assert_eq!(step.verify_timeout_secs(), 0);
        assert_eq!(step.step_type(), StepType::Repo);
    }
}
