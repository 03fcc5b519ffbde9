// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Line-In-File Handler
//!
//! Ensures `path` contains the exact line `line` (full-line match). A missing
//! file is created; an existing file gets the line appended. Lines are never
//! reordered or rewritten.

use async_trait::async_trait;
use converge_domain::context::ExecutionContext;
use converge_domain::entities::{Step, StepType};
use converge_domain::error::DomainError;
use converge_domain::services::{HandlerMetadata, StepHandler};
use converge_domain::value_objects::{EvaluationResult, StepResult};
use std::path::Path;

use super::required_str;

/// Handler for `line_in_file` steps.
pub struct LineInFileHandler {
    metadata: HandlerMetadata,
}

impl LineInFileHandler {
    /// Creates the handler.
    pub fn new() -> Self {
        Self {
            metadata: HandlerMetadata::new("core.line_in_file", "Line In File", StepType::LineInFile, "1.0.0"),
        }
    }
}

impl Default for LineInFileHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StepHandler for LineInFileHandler {
    fn metadata(&self) -> &HandlerMetadata {
        &self.metadata
    }

    async fn evaluate(&self, _ctx: &ExecutionContext, step: &Step) -> Result<EvaluationResult, DomainError> {
        let path = required_str(step, "path")?;
        let line = required_str(step, "line")?;

        match tokio::fs::read_to_string(path).await {
            Ok(contents) if contents.lines().any(|existing| existing == line) => {
                Ok(EvaluationResult::satisfied(format!("'{}' contains line", path)))
            }
            Ok(_) => Ok(EvaluationResult::drifted(
                format!("'{}' missing line", path),
                format!("'{}' contains line", path),
                format!("+ {}", line),
            )),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(EvaluationResult::drifted(
                format!("'{}' absent", path),
                format!("'{}' contains line", path),
                format!("+ {}", line),
            )),
            Err(error) => Err(DomainError::execution(format!("cannot read '{}'", path))
                .with_context("step_id", step.id())
                .with_context("path", path)
                .with_source(error)),
        }
    }

    async fn apply(
        &self,
        _ctx: &ExecutionContext,
        evaluation: &EvaluationResult,
        step: &Step,
    ) -> Result<StepResult, DomainError> {
        let path = required_str(step, "path")?;
        let line = required_str(step, "line")?;

        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|error| {
                    DomainError::execution(format!("cannot create parent directory for '{}'", path))
                        .with_context("step_id", step.id())
                        .with_context("path", path)
                        .with_source(error)
                })?;
            }
        }

        let existing = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(error) => {
                return Err(DomainError::execution(format!("cannot read '{}'", path))
                    .with_context("step_id", step.id())
                    .with_context("path", path)
                    .with_source(error));
            }
        };

        let mut updated = existing;
        if !updated.is_empty() && !updated.ends_with('\n') {
            updated.push('\n');
        }
        updated.push_str(line);
        updated.push('\n');

        tokio::fs::write(path, updated).await.map_err(|error| {
            DomainError::execution(format!("cannot write '{}'", path))
                .with_context("step_id", step.id())
                .with_context("path", path)
                .with_source(error)
        })?;

        Ok(StepResult::success(step.id())
            .with_message(format!("appended line to '{}'", path))
            .with_diff(evaluation.diff()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn line_step(path: &Path, line: &str) -> Step {
        let mut config = HashMap::new();
        config.insert("path".to_string(), json!(path.to_str().unwrap()));
        config.insert("line".to_string(), json!(line));
        Step::new("shell-alias", StepType::LineInFile).with_config(config)
    }

    #[tokio::test]
    async fn test_creates_file_with_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile");

        let handler = LineInFileHandler::new();
        let ctx = ExecutionContext::new();
        let step = line_step(&path, "export EDITOR=hx");

        let evaluation = handler.evaluate(&ctx, &step).await.unwrap();
        assert!(evaluation.requires_action());

        handler.apply(&ctx, &evaluation, &step).await.unwrap();
        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents, "export EDITOR=hx\n");

        assert!(!handler.evaluate(&ctx, &step).await.unwrap().requires_action());
    }

    #[tokio::test]
    async fn test_appends_preserving_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile");
        tokio::fs::write(&path, "export LANG=C").await.unwrap();

        let handler = LineInFileHandler::new();
        let ctx = ExecutionContext::new();
        let step = line_step(&path, "export EDITOR=hx");

        let evaluation = handler.evaluate(&ctx, &step).await.unwrap();
        handler.apply(&ctx, &evaluation, &step).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents, "export LANG=C\nexport EDITOR=hx\n");
    }

    #[tokio::test]
    async fn test_partial_match_is_not_a_match() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile");
        tokio::fs::write(&path, "export EDITOR=hx-extended\n").await.unwrap();

        let handler = LineInFileHandler::new();
        let ctx = ExecutionContext::new();
        let step = line_step(&path, "export EDITOR=hx");

        // Full-line matching: a superstring line does not satisfy the step.
        let evaluation = handler.evaluate(&ctx, &step).await.unwrap();
        assert!(evaluation.requires_action());
    }
}
