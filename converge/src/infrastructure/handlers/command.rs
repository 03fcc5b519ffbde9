// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command Handler
//!
//! Runs a shell command. A bare command is not idempotent, so the handler
//! supports two evaluation guards:
//!
//! - `creates`: a path; when it exists the step is already satisfied
//! - `check`: a command; when it exits 0 the step is already satisfied
//!
//! With neither guard configured the step always reports drift, which
//! matches "run this every time" semantics. The optional `timeout` (seconds)
//! bounds the applied command; the engine-level `settings.timeout` stays
//! advisory.

use async_trait::async_trait;
use converge_domain::context::ExecutionContext;
use converge_domain::entities::{Step, StepType};
use converge_domain::error::DomainError;
use converge_domain::services::{HandlerMetadata, StepHandler};
use converge_domain::value_objects::{EvaluationResult, StepResult};
use std::path::Path;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

use super::{optional_str, optional_u64, required_str};

/// Handler for `command` steps.
pub struct CommandHandler {
    metadata: HandlerMetadata,
}

impl CommandHandler {
    /// Creates the handler.
    pub fn new() -> Self {
        Self {
            metadata: HandlerMetadata::new("core.command", "Command Runner", StepType::Command, "1.0.0"),
        }
    }

    async fn run_shell(
        ctx: &ExecutionContext,
        step_id: &str,
        command: &str,
        timeout_secs: Option<u64>,
    ) -> Result<Output, DomainError> {
        let mut shell = Command::new("sh");
        shell.arg("-c").arg(command).kill_on_drop(true);
        let invocation = shell.output();

        let outcome = tokio::select! {
            biased;
            _ = ctx.cancelled() => {
                return Err(DomainError::cancelled(format!("command for step '{}' cancelled", step_id))
                    .with_context("step_id", step_id));
            }
            outcome = async {
                match timeout_secs {
                    Some(secs) if secs > 0 => {
                        match tokio::time::timeout(Duration::from_secs(secs), invocation).await {
                            Ok(result) => result.map(Some),
                            Err(_) => Ok(None),
                        }
                    }
                    _ => invocation.await.map(Some),
                }
            } => outcome,
        };

        match outcome {
            Ok(Some(output)) => Ok(output),
            Ok(None) => Err(DomainError::timeout(format!(
                "command for step '{}' exceeded {}s",
                step_id,
                timeout_secs.unwrap_or_default()
            ))
            .with_context("step_id", step_id)),
            Err(error) => Err(DomainError::execution(format!("failed to spawn command for step '{}'", step_id))
                .with_context("step_id", step_id)
                .with_source(error)),
        }
    }
}

impl Default for CommandHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StepHandler for CommandHandler {
    fn metadata(&self) -> &HandlerMetadata {
        &self.metadata
    }

    async fn evaluate(&self, ctx: &ExecutionContext, step: &Step) -> Result<EvaluationResult, DomainError> {
        let command = required_str(step, "command")?;

        if let Some(creates) = optional_str(step, "creates")? {
            if Path::new(creates).exists() {
                return Ok(EvaluationResult::satisfied(format!("'{}' exists", creates)));
            }
            return Ok(EvaluationResult::drifted(
                format!("'{}' absent", creates),
                format!("'{}' present", creates),
                command,
            ));
        }

        if let Some(check) = optional_str(step, "check")? {
            let output = Self::run_shell(ctx, step.id(), check, optional_u64(step, "timeout")?).await?;
            if output.status.success() {
                return Ok(EvaluationResult::satisfied(format!("check '{}' passed", check)));
            }
            return Ok(EvaluationResult::drifted(
                format!("check '{}' failed", check),
                format!("check '{}' passing", check),
                command,
            ));
        }

        // No guard: the command is applied on every run.
        Ok(EvaluationResult::drifted("not applied", "command applied", command))
    }

    async fn apply(
        &self,
        ctx: &ExecutionContext,
        _evaluation: &EvaluationResult,
        step: &Step,
    ) -> Result<StepResult, DomainError> {
        let command = required_str(step, "command")?;
        let output = Self::run_shell(ctx, step.id(), command, optional_u64(step, "timeout")?).await?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim_end().to_string();

        if !output.status.success() {
            let code = output
                .status
                .code()
                .map(|code| code.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(DomainError::execution(format!(
                "command for step '{}' exited with status {}",
                step.id(),
                code
            ))
            .with_context("step_id", step.id())
            .with_context("exit_code", code)
            .with_context("stderr", stderr));
        }

        Ok(StepResult::success(step.id())
            .with_message(format!("ran '{}'", command))
            .with_output(stdout))
    }
}
