// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # SQLite Registry Store
//!
//! Persistence adapter behind the [`RegistryStore`] port: CRUD over named
//! pipeline registrations with their last-known convergence status. The
//! schema is bootstrapped on connect, all queries use parameterized
//! statements, and timestamps travel as RFC 3339 text.
//!
//! Error translation at the edge: a unique-constraint violation on save
//! becomes `CONFLICT`, an absent row becomes `NOT_FOUND`, and any other
//! driver failure becomes `EXECUTION_ERROR` with the driver error preserved
//! as the cause.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use converge_domain::context::ExecutionContext;
use converge_domain::error::DomainError;
use converge_domain::services::{ExecutionStatus, Registration, RegistryStore};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// Table definition for pipeline registrations.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS registrations (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    config_path TEXT NOT NULL,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_registrations_status ON registrations(status);
"#;

/// SQLite-backed registration store.
pub struct SqliteRegistryStore {
    pool: SqlitePool,
}

impl SqliteRegistryStore {
    /// Creates a store over an existing pool, bootstrapping the schema.
    pub async fn new(pool: SqlitePool) -> Result<Self, DomainError> {
        for statement in SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(|error| {
                    DomainError::execution("failed to initialize registry schema").with_source(error)
                })?;
        }
        Ok(Self { pool })
    }

    /// Connects to a database file path (or `sqlite::memory:` for tests).
    pub async fn connect(database_url: &str) -> Result<Self, DomainError> {
        let pool = SqlitePool::connect(database_url).await.map_err(|error| {
            DomainError::execution(format!("failed to open registry database '{}'", database_url))
                .with_context("path", database_url)
                .with_source(error)
        })?;
        Self::new(pool).await
    }

    /// In-memory store for tests and ephemeral runs.
    ///
    /// Pinned to a single connection: every pooled connection to
    /// `sqlite::memory:` would otherwise see its own empty database.
    pub async fn in_memory() -> Result<Self, DomainError> {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|error| DomainError::execution("failed to open in-memory registry").with_source(error))?;
        Self::new(pool).await
    }

    fn row_to_registration(row: &SqliteRow) -> Result<Registration, DomainError> {
        let id: String = row
            .try_get("id")
            .map_err(|error| DomainError::execution("registry row missing id").with_source(error))?;
        let name: String = row
            .try_get("name")
            .map_err(|error| DomainError::execution("registry row missing name").with_source(error))?;
        let config_path: String = row
            .try_get("config_path")
            .map_err(|error| DomainError::execution("registry row missing config_path").with_source(error))?;
        let status_text: String = row
            .try_get("status")
            .map_err(|error| DomainError::execution("registry row missing status").with_source(error))?;
        let created_at: String = row
            .try_get("created_at")
            .map_err(|error| DomainError::execution("registry row missing created_at").with_source(error))?;
        let updated_at: String = row
            .try_get("updated_at")
            .map_err(|error| DomainError::execution("registry row missing updated_at").with_source(error))?;

        let status: ExecutionStatus = status_text.parse()?;
        let created_at = Self::parse_timestamp(&created_at)?;
        let updated_at = Self::parse_timestamp(&updated_at)?;

        Ok(Registration::from_storage(
            id,
            name,
            config_path,
            status,
            created_at,
            updated_at,
        ))
    }

    fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, DomainError> {
        DateTime::parse_from_rfc3339(text)
            .map(|stamp| stamp.with_timezone(&Utc))
            .map_err(|error| {
                DomainError::execution(format!("corrupt timestamp '{}' in registry", text)).with_source(error)
            })
    }

    fn is_unique_violation(error: &sqlx::Error) -> bool {
        match error {
            sqlx::Error::Database(db_error) => db_error.message().contains("UNIQUE constraint failed"),
            _ => false,
        }
    }
}

#[async_trait]
impl RegistryStore for SqliteRegistryStore {
    async fn save(&self, ctx: &ExecutionContext, registration: &Registration) -> Result<(), DomainError> {
        if ctx.is_cancelled() {
            return Err(DomainError::cancelled("registry save cancelled"));
        }

        sqlx::query(
            "INSERT INTO registrations (id, name, config_path, status, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(registration.id())
        .bind(registration.name())
        .bind(registration.config_path())
        .bind(registration.status().as_str())
        .bind(registration.created_at().to_rfc3339())
        .bind(registration.updated_at().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            if Self::is_unique_violation(&error) {
                DomainError::conflict(format!("registration '{}' already exists", registration.id()))
                    .with_context("id", registration.id())
            } else {
                DomainError::execution(format!("failed to save registration '{}'", registration.id()))
                    .with_context("id", registration.id())
                    .with_source(error)
            }
        })?;
        Ok(())
    }

    async fn get(&self, ctx: &ExecutionContext, id: &str) -> Result<Registration, DomainError> {
        if ctx.is_cancelled() {
            return Err(DomainError::cancelled("registry lookup cancelled"));
        }

        let row = sqlx::query("SELECT * FROM registrations WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| {
                DomainError::execution(format!("failed to load registration '{}'", id)).with_source(error)
            })?;

        match row {
            Some(row) => Self::row_to_registration(&row),
            None => Err(DomainError::not_found(format!("registration '{}' not found", id)).with_context("id", id)),
        }
    }

    async fn list(&self, ctx: &ExecutionContext) -> Result<Vec<Registration>, DomainError> {
        if ctx.is_cancelled() {
            return Err(DomainError::cancelled("registry list cancelled"));
        }

        let rows = sqlx::query("SELECT * FROM registrations ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|error| DomainError::execution("failed to list registrations").with_source(error))?;

        rows.iter().map(Self::row_to_registration).collect()
    }

    async fn update_status(
        &self,
        ctx: &ExecutionContext,
        id: &str,
        status: ExecutionStatus,
    ) -> Result<(), DomainError> {
        if ctx.is_cancelled() {
            return Err(DomainError::cancelled("registry update cancelled"));
        }

        let result = sqlx::query("UPDATE registrations SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|error| {
                DomainError::execution(format!("failed to update registration '{}'", id)).with_source(error)
            })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("registration '{}' not found", id)).with_context("id", id));
        }
        Ok(())
    }

    async fn delete(&self, ctx: &ExecutionContext, id: &str) -> Result<(), DomainError> {
        if ctx.is_cancelled() {
            return Err(DomainError::cancelled("registry delete cancelled"));
        }

        let result = sqlx::query("DELETE FROM registrations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|error| {
                DomainError::execution(format!("failed to delete registration '{}'", id)).with_source(error)
            })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("registration '{}' not found", id)).with_context("id", id));
        }
        Ok(())
    }
}
