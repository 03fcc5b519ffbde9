// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Copy Handler
//!
//! Keeps `destination` a byte-for-byte copy of `source`. Evaluation compares
//! content, so rerunning a converged pipeline touches nothing.

use async_trait::async_trait;
use converge_domain::context::ExecutionContext;
use converge_domain::entities::{Step, StepType};
use converge_domain::error::DomainError;
use converge_domain::services::{HandlerMetadata, StepHandler};
use converge_domain::value_objects::{EvaluationResult, StepResult};
use std::path::Path;

use super::required_str;

/// Handler for `copy` steps.
pub struct CopyHandler {
    metadata: HandlerMetadata,
}

impl CopyHandler {
    /// Creates the handler.
    pub fn new() -> Self {
        Self {
            metadata: HandlerMetadata::new("core.copy", "File Copy", StepType::Copy, "1.0.0"),
        }
    }

    async fn read_source(step: &Step, source: &str) -> Result<Vec<u8>, DomainError> {
        tokio::fs::read(source).await.map_err(|error| {
            if error.kind() == std::io::ErrorKind::NotFound {
                DomainError::not_found(format!("copy source '{}' not found", source))
                    .with_context("step_id", step.id())
                    .with_context("path", source)
                    .with_source(error)
            } else {
                DomainError::execution(format!("cannot read copy source '{}'", source))
                    .with_context("step_id", step.id())
                    .with_context("path", source)
                    .with_source(error)
            }
        })
    }
}

impl Default for CopyHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StepHandler for CopyHandler {
    fn metadata(&self) -> &HandlerMetadata {
        &self.metadata
    }

    async fn evaluate(&self, _ctx: &ExecutionContext, step: &Step) -> Result<EvaluationResult, DomainError> {
        let source = required_str(step, "source")?;
        let destination = required_str(step, "destination")?;

        let source_bytes = Self::read_source(step, source).await?;

        match tokio::fs::read(destination).await {
            Ok(destination_bytes) if destination_bytes == source_bytes => Ok(EvaluationResult::satisfied(
                format!("'{}' matches '{}'", destination, source),
            )),
            Ok(_) => Ok(EvaluationResult::drifted(
                format!("'{}' differs from '{}'", destination, source),
                format!("'{}' is a copy of '{}'", destination, source),
                format!("~ {}", destination),
            )),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(EvaluationResult::drifted(
                format!("'{}' absent", destination),
                format!("'{}' is a copy of '{}'", destination, source),
                format!("+ {}", destination),
            )),
            Err(error) => Err(DomainError::execution(format!("cannot read '{}'", destination))
                .with_context("step_id", step.id())
                .with_context("path", destination)
                .with_source(error)),
        }
    }

    async fn apply(
        &self,
        _ctx: &ExecutionContext,
        evaluation: &EvaluationResult,
        step: &Step,
    ) -> Result<StepResult, DomainError> {
        let source = required_str(step, "source")?;
        let destination = required_str(step, "destination")?;

        if let Some(parent) = Path::new(destination).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|error| {
                    DomainError::execution(format!("cannot create parent directory for '{}'", destination))
                        .with_context("step_id", step.id())
                        .with_context("path", destination)
                        .with_source(error)
                })?;
            }
        }

        let copied = tokio::fs::copy(source, destination).await.map_err(|error| {
            DomainError::execution(format!("failed to copy '{}' to '{}'", source, destination))
                .with_context("step_id", step.id())
                .with_context("path", destination)
                .with_source(error)
        })?;

        Ok(StepResult::success(step.id())
            .with_message(format!("copied '{}' to '{}' ({} bytes)", source, destination, copied))
            .with_diff(evaluation.diff()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn copy_step(source: &Path, destination: &Path) -> Step {
        let mut config = HashMap::new();
        config.insert("source".to_string(), json!(source.to_str().unwrap()));
        config.insert("destination".to_string(), json!(destination.to_str().unwrap()));
        Step::new("dotfiles", StepType::Copy).with_config(config)
    }

    #[tokio::test]
    async fn test_absent_destination_drifts_then_converges() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src.conf");
        let destination = dir.path().join("nested/dst.conf");
        tokio::fs::write(&source, b"key = value\n").await.unwrap();

        let handler = CopyHandler::new();
        let ctx = ExecutionContext::new();
        let step = copy_step(&source, &destination);

        let evaluation = handler.evaluate(&ctx, &step).await.unwrap();
        assert!(evaluation.requires_action());

        let result = handler.apply(&ctx, &evaluation, &step).await.unwrap();
        assert!(result.changed());

        // Second evaluation sees converged state.
        let evaluation = handler.evaluate(&ctx, &step).await.unwrap();
        assert!(!evaluation.requires_action());
    }

    #[tokio::test]
    async fn test_content_drift_detected() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src.conf");
        let destination = dir.path().join("dst.conf");
        tokio::fs::write(&source, b"new").await.unwrap();
        tokio::fs::write(&destination, b"old").await.unwrap();

        let handler = CopyHandler::new();
        let ctx = ExecutionContext::new();
        let evaluation = handler.evaluate(&ctx, &copy_step(&source, &destination)).await.unwrap();
        assert!(evaluation.requires_action());
        assert!(evaluation.current_state().contains("differs"));
    }

    #[tokio::test]
    async fn test_missing_source_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let handler = CopyHandler::new();
        let ctx = ExecutionContext::new();
        let step = copy_step(&dir.path().join("ghost"), &dir.path().join("dst"));

        let err = handler.evaluate(&ctx, &step).await.unwrap_err();
        assert_eq!(err.code(), converge_domain::error::ErrorCode::NotFound);
    }
}
