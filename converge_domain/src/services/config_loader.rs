// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Configuration Loader Port
//!
//! Loads a pipeline definition from a filesystem path. Implementations must
//! translate foreign failures into the closed error taxonomy: a missing file
//! becomes `NOT_FOUND`, a syntax or schema problem becomes
//! `VALIDATION_ERROR` (with a `line` context entry when the parser reports a
//! location), and observed cancellation becomes `CANCELLED`. Only `.yaml` and
//! `.yml` extensions are accepted.

use crate::context::ExecutionContext;
use crate::entities::Pipeline;
use crate::error::DomainError;
use async_trait::async_trait;
use std::path::Path;

/// Port over the configuration file format.
#[async_trait]
pub trait ConfigLoader: Send + Sync {
    /// Loads and fully validates a pipeline from `path`.
    async fn load(&self, ctx: &ExecutionContext, path: &Path) -> Result<Pipeline, DomainError>;

    /// Checks a configuration without retaining the pipeline.
    async fn validate(&self, ctx: &ExecutionContext, path: &Path) -> Result<(), DomainError>;
}
