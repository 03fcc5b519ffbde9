// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Step Handler Port
//!
//! The handler port binds a step type tag to an implementation that can
//! inspect and converge system state. Handlers obey a strict
//! evaluate-before-apply discipline:
//!
//! - [`evaluate`](StepHandler::evaluate) is a **side-effect-free** inspection
//!   of the current state against the step's desired state
//! - [`apply`](StepHandler::apply) mutates state and is called only when
//!   evaluation reported drift and the run is not a dry-run
//!
//! Handlers must tolerate re-entry from retries, respect cancellation at
//! their own suspension points, and treat `step.config()` as read-only.

use crate::context::ExecutionContext;
use crate::entities::{Step, StepType};
use crate::error::DomainError;
use crate::value_objects::{EvaluationResult, StepResult};
use async_trait::async_trait;

/// Immutable description a handler publishes about itself.
///
/// The step type is the unique registry key. Declared dependencies name
/// other handler types this handler is allowed to resolve through
/// the registry's dependent-access API; undeclared access is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerMetadata {
    id: String,
    name: String,
    step_type: StepType,
    version: String,
    dependencies: Vec<StepType>,
}

impl HandlerMetadata {
    /// Creates metadata for a handler.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        step_type: StepType,
        version: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            step_type,
            version: version.into(),
            dependencies: Vec::new(),
        }
    }

    /// Declares handler-to-handler dependencies (by type tag)
    pub fn with_dependencies(mut self, dependencies: Vec<StepType>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Gets the handler identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Gets the display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the step type this handler is bound to
    pub fn step_type(&self) -> StepType {
        self.step_type
    }

    /// Gets the handler version
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Gets the declared handler dependencies
    pub fn dependencies(&self) -> &[StepType] {
        &self.dependencies
    }

    /// Checks whether a dependency on `other` was declared
    pub fn declares_dependency_on(&self, other: StepType) -> bool {
        self.dependencies.contains(&other)
    }

    /// Validates the metadata fields.
    ///
    /// # Errors
    ///
    /// `VALIDATION_ERROR` when id, name, or version is empty.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.id.is_empty() {
            return Err(DomainError::validation("handler metadata id cannot be empty"));
        }
        if self.name.is_empty() {
            return Err(DomainError::validation(format!(
                "handler '{}' metadata name cannot be empty",
                self.id
            )));
        }
        if self.version.is_empty() {
            return Err(DomainError::validation(format!(
                "handler '{}' metadata version cannot be empty",
                self.id
            )));
        }
        Ok(())
    }
}

/// Port implemented by every step handler.
#[async_trait]
pub trait StepHandler: Send + Sync {
    /// Gets the handler's immutable metadata
    fn metadata(&self) -> &HandlerMetadata;

    /// Side-effect-free inspection of current state against desired state.
    ///
    /// Must not mutate the system. The returned payload, if any, is handed
    /// back verbatim to [`apply`](StepHandler::apply).
    async fn evaluate(&self, ctx: &ExecutionContext, step: &Step) -> Result<EvaluationResult, DomainError>;

    /// Mutates system state to reach the desired state.
    ///
    /// Called only when evaluation reported drift and the run is not a
    /// dry-run. The executor stamps the step id and duration onto the
    /// returned result.
    async fn apply(
        &self,
        ctx: &ExecutionContext,
        evaluation: &EvaluationResult,
        step: &Step,
    ) -> Result<StepResult, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_validation() {
        let good = HandlerMetadata::new("core.command", "Command Runner", StepType::Command, "1.0.0");
        assert!(good.validate().is_ok());

        let no_id = HandlerMetadata::new("", "Command Runner", StepType::Command, "1.0.0");
        assert!(no_id.validate().is_err());

        let no_version = HandlerMetadata::new("core.command", "Command Runner", StepType::Command, "");
        assert!(no_version.validate().is_err());
    }

    #[test]
    fn test_declared_dependencies() {
        let meta = HandlerMetadata::new("core.repo", "Repository", StepType::Repo, "1.0.0")
            .with_dependencies(vec![StepType::Command]);
        assert!(meta.declares_dependency_on(StepType::Command));
        assert!(!meta.declares_dependency_on(StepType::Copy));
    }
}
