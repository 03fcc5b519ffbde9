// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! This module provides the structured error system for the converge domain.
//! Every failure in the engine is expressed as a [`DomainError`]: a code drawn
//! from a closed taxonomy, a human-readable message, an optional wrapped
//! cause, and a free-form context map for diagnostics.
//!
//! ## Overview
//!
//! The error system is designed around a few principles:
//!
//! - **Closed taxonomy**: every error carries exactly one [`ErrorCode`] so
//!   callers can route on codes instead of string matching
//! - **Actionable context**: errors accumulate structured context entries
//!   (`step_id`, `path`, `cycle`, ...) that renderers surface verbatim
//! - **Chain preservation**: foreign errors are wrapped, never discarded; the
//!   `std::error::Error` chain walks down to the original cause
//! - **Cheap equality**: two errors are equal when their code and message
//!   match, which keeps assertions in tests and deduplication simple
//!
//! ## Propagation Policy
//!
//! Adapters at the system edge translate foreign failures into codes (the
//! configuration loader maps a missing file to `NOT_FOUND`, a syntax problem
//! to `VALIDATION_ERROR`). Orchestration use cases pass domain errors through
//! untouched. The executor wraps any foreign handler failure into
//! `EXECUTION_ERROR` with the original error as the cause.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Convenience alias for fallible domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

/// Closed set of error codes recognized across the engine.
///
/// The wire representation (`as_str`) is stable and is what appears in logs,
/// events, and CLI output. New codes are a breaking change for consumers that
/// route on them, which is why the set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Validation,
    DuplicateId,
    Dependency,
    CircularDependency,
    InvalidType,
    NotFound,
    MissingRequired,
    InvalidState,
    Conflict,
    Execution,
    Plugin,
    Timeout,
    Cancelled,
    Internal,
}

impl ErrorCode {
    /// Stable string form used in logs, events, and exit-code mapping.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Validation => "VALIDATION_ERROR",
            ErrorCode::DuplicateId => "DUPLICATE_ID",
            ErrorCode::Dependency => "DEPENDENCY_ERROR",
            ErrorCode::CircularDependency => "CIRCULAR_DEPENDENCY",
            ErrorCode::InvalidType => "INVALID_TYPE",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::MissingRequired => "MISSING_REQUIRED",
            ErrorCode::InvalidState => "INVALID_STATE",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::Execution => "EXECUTION_ERROR",
            ErrorCode::Plugin => "PLUGIN_ERROR",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::Cancelled => "CANCELLED",
            ErrorCode::Internal => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured domain failure.
///
/// Carries a code from the closed taxonomy, a human message, an optional
/// wrapped cause, and a context map. Constructed through the named
/// constructors (one per code) and enriched with the builder-style
/// [`with_context`](DomainError::with_context) and
/// [`with_source`](DomainError::with_source) methods:
///
/// ```
/// use converge_domain::error::DomainError;
///
/// let err = DomainError::dependency("step depends on unknown step")
///     .with_context("step_id", "deploy")
///     .with_context("missing_dependency", "ghost");
///
/// assert_eq!(err.context_value("missing_dependency"), Some("ghost"));
/// ```
///
/// ## Equality
///
/// `PartialEq` compares code and message only. Context and cause are
/// diagnostic payload, not identity.
#[derive(Error, Debug, Clone)]
#[error("{code}: {message}")]
pub struct DomainError {
    code: ErrorCode,
    message: String,
    context: HashMap<String, String>,
    // Arc keeps the error cloneable; thiserror picks the field up as the
    // cause by name.
    source: Option<Arc<dyn std::error::Error + Send + Sync + 'static>>,
}

impl DomainError {
    /// Creates an error with an explicit code.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: HashMap::new(),
            source: None,
        }
    }

    /// Creates a new validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Validation, msg)
    }

    /// Creates a new duplicate-identifier error
    pub fn duplicate_id(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::DuplicateId, msg)
    }

    /// Creates a new dependency error
    pub fn dependency(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Dependency, msg)
    }

    /// Creates a new circular-dependency error
    pub fn circular_dependency(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::CircularDependency, msg)
    }

    /// Creates a new invalid-type error
    pub fn invalid_type(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidType, msg)
    }

    /// Creates a new not-found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, msg)
    }

    /// Creates a new missing-required error
    pub fn missing_required(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::MissingRequired, msg)
    }

    /// Creates a new invalid-state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidState, msg)
    }

    /// Creates a new conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, msg)
    }

    /// Creates a new execution error
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Execution, msg)
    }

    /// Creates a new plugin error
    pub fn plugin(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Plugin, msg)
    }

    /// Creates a new timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Timeout, msg)
    }

    /// Creates a new cancellation error
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Cancelled, msg)
    }

    /// Creates a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, msg)
    }

    /// Attaches a context entry, returning the enriched error.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Attaches the underlying cause, returning the enriched error.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Gets the error code
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Gets the human-readable message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Gets the full context map
    pub fn context(&self) -> &HashMap<String, String> {
        &self.context
    }

    /// Looks up a single context entry
    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context.get(key).map(String::as_str)
    }

    /// Checks whether this error represents cancellation
    pub fn is_cancelled(&self) -> bool {
        self.code == ErrorCode::Cancelled
    }

    /// Checks if the error is recoverable by retrying
    pub fn is_recoverable(&self) -> bool {
        matches!(self.code, ErrorCode::Timeout | ErrorCode::Execution)
    }
}

impl PartialEq for DomainError {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code && self.message == other.message
    }
}

impl Eq for DomainError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_display_includes_code_and_message() {
        let err = DomainError::validation("pipeline name cannot be empty");
        assert_eq!(err.to_string(), "VALIDATION_ERROR: pipeline name cannot be empty");
    }

    #[test]
    fn test_equality_ignores_context_and_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let a = DomainError::not_found("missing file")
            .with_context("path", "/etc/converge.yaml")
            .with_source(io);
        let b = DomainError::not_found("missing file");

        assert_eq!(a, b);
        assert_ne!(a, DomainError::not_found("different message"));
        assert_ne!(a, DomainError::validation("missing file"));
    }

    #[test]
    fn test_context_accumulates() {
        let err = DomainError::dependency("unknown dependency")
            .with_context("step_id", "deploy")
            .with_context("missing_dependency", "ghost");

        assert_eq!(err.context_value("step_id"), Some("deploy"));
        assert_eq!(err.context_value("missing_dependency"), Some("ghost"));
        assert_eq!(err.context_value("absent"), None);
    }

    #[test]
    fn test_error_chain_walks_to_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = DomainError::execution("apply failed").with_source(io);

        let cause = err.source().expect("cause should be preserved");
        assert!(cause.to_string().contains("denied"));
    }

    #[test]
    fn test_cancellation_predicate() {
        assert!(DomainError::cancelled("shutdown requested").is_cancelled());
        assert!(!DomainError::execution("boom").is_cancelled());
    }

    #[test]
    fn test_codes_render_stable_strings() {
        assert_eq!(ErrorCode::CircularDependency.as_str(), "CIRCULAR_DEPENDENCY");
        assert_eq!(ErrorCode::MissingRequired.as_str(), "MISSING_REQUIRED");
        assert_eq!(ErrorCode::Cancelled.as_str(), "CANCELLED");
    }
}
