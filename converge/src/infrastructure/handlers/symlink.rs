// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Symlink Handler
//!
//! Maintains a symbolic link at `link` pointing to `source`. A wrong target
//! is replaced; a non-symlink in the way is a `CONFLICT`, never silently
//! overwritten.

use async_trait::async_trait;
use converge_domain::context::ExecutionContext;
use converge_domain::entities::{Step, StepType};
use converge_domain::error::DomainError;
use converge_domain::services::{HandlerMetadata, StepHandler};
use converge_domain::value_objects::{EvaluationResult, StepResult};
use std::path::Path;

use super::required_str;

/// Handler for `symlink` steps.
pub struct SymlinkHandler {
    metadata: HandlerMetadata,
}

impl SymlinkHandler {
    /// Creates the handler.
    pub fn new() -> Self {
        Self {
            metadata: HandlerMetadata::new("core.symlink", "Symbolic Link", StepType::Symlink, "1.0.0"),
        }
    }

    async fn create_link(source: &str, link: &str, step: &Step) -> Result<(), DomainError> {
        #[cfg(unix)]
        let created = tokio::fs::symlink(source, link).await;
        #[cfg(windows)]
        let created = tokio::fs::symlink_file(source, link).await;

        created.map_err(|error| {
            DomainError::execution(format!("failed to link '{}' -> '{}'", link, source))
                .with_context("step_id", step.id())
                .with_context("path", link)
                .with_source(error)
        })
    }
}

impl Default for SymlinkHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StepHandler for SymlinkHandler {
    fn metadata(&self) -> &HandlerMetadata {
        &self.metadata
    }

    async fn evaluate(&self, _ctx: &ExecutionContext, step: &Step) -> Result<EvaluationResult, DomainError> {
        let source = required_str(step, "source")?;
        let link = required_str(step, "link")?;

        match tokio::fs::symlink_metadata(link).await {
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(EvaluationResult::drifted(
                format!("'{}' absent", link),
                format!("'{}' -> '{}'", link, source),
                format!("+ {} -> {}", link, source),
            )),
            Err(error) => Err(DomainError::execution(format!("cannot inspect '{}'", link))
                .with_context("step_id", step.id())
                .with_context("path", link)
                .with_source(error)),
            Ok(metadata) if metadata.file_type().is_symlink() => {
                let target = tokio::fs::read_link(link).await.map_err(|error| {
                    DomainError::execution(format!("cannot read link target of '{}'", link))
                        .with_context("step_id", step.id())
                        .with_context("path", link)
                        .with_source(error)
                })?;
                if target == Path::new(source) {
                    Ok(EvaluationResult::satisfied(format!("'{}' -> '{}'", link, source)))
                } else {
                    Ok(EvaluationResult::drifted(
                        format!("'{}' -> '{}'", link, target.display()),
                        format!("'{}' -> '{}'", link, source),
                        format!("~ {} -> {}", link, source),
                    ))
                }
            }
            Ok(_) => Ok(EvaluationResult::drifted(
                format!("'{}' exists but is not a symlink", link),
                format!("'{}' -> '{}'", link, source),
                format!("! {}", link),
            )),
        }
    }

    async fn apply(
        &self,
        _ctx: &ExecutionContext,
        evaluation: &EvaluationResult,
        step: &Step,
    ) -> Result<StepResult, DomainError> {
        let source = required_str(step, "source")?;
        let link = required_str(step, "link")?;

        match tokio::fs::symlink_metadata(link).await {
            Ok(metadata) if metadata.file_type().is_symlink() => {
                tokio::fs::remove_file(link).await.map_err(|error| {
                    DomainError::execution(format!("failed to replace link '{}'", link))
                        .with_context("step_id", step.id())
                        .with_context("path", link)
                        .with_source(error)
                })?;
            }
            Ok(_) => {
                return Err(DomainError::conflict(format!(
                    "'{}' exists and is not a symlink; refusing to replace it",
                    link
                ))
                .with_context("step_id", step.id())
                .with_context("path", link));
            }
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => {
                return Err(DomainError::execution(format!("cannot inspect '{}'", link))
                    .with_context("step_id", step.id())
                    .with_context("path", link)
                    .with_source(error));
            }
        }

        if let Some(parent) = Path::new(link).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|error| {
                    DomainError::execution(format!("cannot create parent directory for '{}'", link))
                        .with_context("step_id", step.id())
                        .with_context("path", link)
                        .with_source(error)
                })?;
            }
        }

        Self::create_link(source, link, step).await?;

        Ok(StepResult::success(step.id())
            .with_message(format!("linked '{}' -> '{}'", link, source))
            .with_diff(evaluation.diff()))
    }
}
