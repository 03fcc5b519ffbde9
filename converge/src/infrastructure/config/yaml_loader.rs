// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # YAML Configuration Loader
//!
//! Adapter behind the [`ConfigLoader`] port. Translates every foreign
//! failure into the closed error taxonomy at the system edge:
//!
//! - unsupported extension (anything but `.yaml` / `.yml`) - `VALIDATION_ERROR`
//! - missing file - `NOT_FOUND`
//! - YAML syntax or schema problem - `VALIDATION_ERROR`, with a `line`
//!   context entry when the parser reports a location
//! - observed cancellation - `CANCELLED`
//!
//! A successfully parsed pipeline is fully validated before it is returned,
//! so downstream components never see an invariant-violating pipeline.

use async_trait::async_trait;
use converge_domain::context::ExecutionContext;
use converge_domain::entities::Pipeline;
use converge_domain::error::DomainError;
use converge_domain::services::ConfigLoader;
use std::path::Path;

/// Loader for `.yaml` / `.yml` pipeline definitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlConfigLoader;

impl YamlConfigLoader {
    /// Creates a loader.
    pub fn new() -> Self {
        Self
    }

    fn check_extension(path: &Path) -> Result<(), DomainError> {
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .unwrap_or_default();
        if extension.eq_ignore_ascii_case("yaml") || extension.eq_ignore_ascii_case("yml") {
            return Ok(());
        }
        Err(DomainError::validation(format!(
            "unsupported configuration extension '{}': expected .yaml or .yml",
            extension
        ))
        .with_context("path", path.display().to_string()))
    }

    fn parse(path: &Path, contents: &str) -> Result<Pipeline, DomainError> {
        let pipeline: Pipeline = serde_yaml::from_str(contents).map_err(|error| {
            let mut domain_error = DomainError::validation(format!("invalid pipeline configuration: {}", error))
                .with_context("path", path.display().to_string());
            if let Some(location) = error.location() {
                domain_error = domain_error.with_context("line", location.line().to_string());
            }
            domain_error.with_source(error)
        })?;
        pipeline.validate()?;
        Ok(pipeline)
    }
}

#[async_trait]
impl ConfigLoader for YamlConfigLoader {
    async fn load(&self, ctx: &ExecutionContext, path: &Path) -> Result<Pipeline, DomainError> {
        if ctx.is_cancelled() {
            return Err(DomainError::cancelled("configuration load cancelled"));
        }
        Self::check_extension(path)?;

        let contents = tokio::fs::read_to_string(path).await.map_err(|error| {
            if error.kind() == std::io::ErrorKind::NotFound {
                DomainError::not_found(format!("configuration file '{}' not found", path.display()))
                    .with_context("path", path.display().to_string())
                    .with_source(error)
            } else {
                DomainError::execution(format!("failed to read configuration '{}'", path.display()))
                    .with_context("path", path.display().to_string())
                    .with_source(error)
            }
        })?;

        if ctx.is_cancelled() {
            return Err(DomainError::cancelled("configuration load cancelled"));
        }
        Self::parse(path, &contents)
    }

    async fn validate(&self, ctx: &ExecutionContext, path: &Path) -> Result<(), DomainError> {
        self.load(ctx, path).await.map(|_| ())
    }
}
