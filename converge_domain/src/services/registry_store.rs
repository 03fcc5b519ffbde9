// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Registry Store Port
//!
//! Persistence for named pipeline registrations, used by higher-level tools
//! that track many pipelines and their last-known convergence status. CRUD
//! keyed by a user-supplied id, with an embedded [`ExecutionStatus`].

use crate::context::ExecutionContext;
use crate::error::DomainError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// Last-known convergence status of a registered pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    Satisfied,
    Drifted,
    Failed,
    Unknown,
}

impl ExecutionStatus {
    /// Stable string form used in storage and CLI output.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Satisfied => "satisfied",
            ExecutionStatus::Drifted => "drifted",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "satisfied" => Ok(ExecutionStatus::Satisfied),
            "drifted" => Ok(ExecutionStatus::Drifted),
            "failed" => Ok(ExecutionStatus::Failed),
            "unknown" => Ok(ExecutionStatus::Unknown),
            other => Err(DomainError::invalid_type(format!(
                "unknown execution status '{}'",
                other
            ))),
        }
    }
}

/// One registered pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    id: String,
    name: String,
    config_path: String,
    status: ExecutionStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Registration {
    /// Creates a registration with status `Unknown` and current timestamps.
    pub fn new(id: impl Into<String>, name: impl Into<String>, config_path: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            config_path: config_path.into(),
            status: ExecutionStatus::Unknown,
            created_at: now,
            updated_at: now,
        }
    }

    /// Reconstitutes a registration from stored fields.
    pub fn from_storage(
        id: String,
        name: String,
        config_path: String,
        status: ExecutionStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            config_path,
            status,
            created_at,
            updated_at,
        }
    }

    /// Gets the user-supplied id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Gets the pipeline name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the configuration file path
    pub fn config_path(&self) -> &str {
        &self.config_path
    }

    /// Gets the last-known convergence status
    pub fn status(&self) -> ExecutionStatus {
        self.status
    }

    /// Gets the creation timestamp
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Gets the last-update timestamp
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Port over registration persistence.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Persists a new registration. Fails with `CONFLICT` when the id is
    /// already taken.
    async fn save(&self, ctx: &ExecutionContext, registration: &Registration) -> Result<(), DomainError>;

    /// Fetches one registration. Fails with `NOT_FOUND` for unknown ids.
    async fn get(&self, ctx: &ExecutionContext, id: &str) -> Result<Registration, DomainError>;

    /// Lists every registration, ordered by id.
    async fn list(&self, ctx: &ExecutionContext) -> Result<Vec<Registration>, DomainError>;

    /// Updates the stored status. Fails with `NOT_FOUND` for unknown ids.
    async fn update_status(
        &self,
        ctx: &ExecutionContext,
        id: &str,
        status: ExecutionStatus,
    ) -> Result<(), DomainError>;

    /// Deletes one registration. Fails with `NOT_FOUND` for unknown ids.
    async fn delete(&self, ctx: &ExecutionContext, id: &str) -> Result<(), DomainError>;
}
