// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # System Validation Service
//!
//! Adapter behind the [`ValidationService`] port that probes the live
//! system:
//!
//! - `command_exists` - scans `PATH` for an executable entry
//! - `file_exists` - checks the path resolves to an existing file or
//!   directory
//! - `path_contains` - reads a file and searches for a text fragment
//!
//! Every check contributes a result to the summary even when it fails; the
//! returned error aggregates the failure count so callers can both render
//! details and route on the outcome.

use async_trait::async_trait;
use converge_domain::context::ExecutionContext;
use converge_domain::entities::{Validation, ValidationType};
use converge_domain::error::DomainError;
use converge_domain::services::ValidationService;
use converge_domain::value_objects::{VerificationResult, VerificationStatus, VerificationSummary};
use std::path::Path;

/// Validation probes against the local system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemValidationService;

impl SystemValidationService {
    /// Creates the service.
    pub fn new() -> Self {
        Self
    }

    /// Locates `command` in the `PATH` entries, requiring an executable file.
    fn command_on_path(command: &str) -> bool {
        let Some(path) = std::env::var_os("PATH") else {
            return false;
        };
        for dir in std::env::split_paths(&path) {
            let candidate = dir.join(command);
            let Ok(metadata) = std::fs::metadata(&candidate) else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if metadata.permissions().mode() & 0o111 == 0 {
                    continue;
                }
            }
            return true;
        }
        false
    }

    async fn run_check(&self, check: &Validation) -> VerificationResult {
        let kind = check.validation_type().as_str();
        let label = check.label();

        // Config problems surface as failed probes with the structured error
        // as the message, keeping the summary complete.
        if let Err(error) = check.validate() {
            return VerificationResult::new(label, kind, VerificationStatus::Failed, error.to_string())
                .with_detail("reason", "invalid_check");
        }

        match check.validation_type() {
            ValidationType::CommandExists => {
                let command = match check.required_string("command") {
                    Ok(command) => command,
                    Err(error) => {
                        return VerificationResult::new(label, kind, VerificationStatus::Failed, error.to_string())
                    }
                };
                if Self::command_on_path(command) {
                    VerificationResult::new(label, kind, VerificationStatus::Satisfied, format!("'{}' found on PATH", command))
                } else {
                    VerificationResult::new(
                        label,
                        kind,
                        VerificationStatus::Failed,
                        format!("'{}' not found on PATH", command),
                    )
                    .with_detail("command", command)
                }
            }
            ValidationType::FileExists => {
                let path = match check.required_string("path") {
                    Ok(path) => path,
                    Err(error) => {
                        return VerificationResult::new(label, kind, VerificationStatus::Failed, error.to_string())
                    }
                };
                match tokio::fs::metadata(Path::new(path)).await {
                    Ok(_) => VerificationResult::new(label, kind, VerificationStatus::Satisfied, format!("'{}' exists", path)),
                    Err(_) => VerificationResult::new(
                        label,
                        kind,
                        VerificationStatus::Failed,
                        format!("'{}' does not exist", path),
                    )
                    .with_detail("path", path),
                }
            }
            ValidationType::PathContains => {
                let (file, text) = match (check.required_string("file"), check.required_string("text")) {
                    (Ok(file), Ok(text)) => (file, text),
                    (Err(error), _) | (_, Err(error)) => {
                        return VerificationResult::new(label, kind, VerificationStatus::Failed, error.to_string())
                    }
                };
                match tokio::fs::read_to_string(Path::new(file)).await {
                    Ok(contents) if contents.contains(text) => VerificationResult::new(
                        label,
                        kind,
                        VerificationStatus::Satisfied,
                        format!("'{}' contains expected text", file),
                    ),
                    Ok(_) => VerificationResult::new(
                        label,
                        kind,
                        VerificationStatus::Failed,
                        format!("'{}' does not contain expected text", file),
                    )
                    .with_detail("file", file)
                    .with_detail("text", text),
                    Err(error) => VerificationResult::new(
                        label,
                        kind,
                        VerificationStatus::Failed,
                        format!("cannot read '{}': {}", file, error),
                    )
                    .with_detail("file", file),
                }
            }
        }
    }
}

#[async_trait]
impl ValidationService for SystemValidationService {
    async fn run_validations(
        &self,
        ctx: &ExecutionContext,
        checks: &[Validation],
    ) -> (VerificationSummary, Option<DomainError>) {
        let mut summary = VerificationSummary::new();

        for check in checks {
            if ctx.is_cancelled() {
                return (
                    summary,
                    Some(DomainError::cancelled("validation cancelled before all checks ran")),
                );
            }
            summary.add(self.run_check(check).await);
        }

        let error = if summary.failed() > 0 {
            Some(
                DomainError::validation(format!(
                    "{} of {} validation checks failed",
                    summary.failed(),
                    summary.total()
                ))
                .with_context("failed_checks", summary.failed().to_string()),
            )
        } else {
            None
        };

        (summary, error)
    }
}
