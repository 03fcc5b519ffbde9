// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Exit Codes
//!
//! Stable process exit codes keyed by the engine's error-code vocabulary.
//! The bootstrap crate does not depend on the domain, so the mapping takes
//! the error code's stable string form. Scripts route on these numbers, so
//! the mapping is append-only.

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    ValidationFailure,
    DependencyFailure,
    NotFound,
    ExecutionFailure,
    Cancelled,
    InternalError,
}

impl ExitCode {
    /// Maps a domain error-code string to an exit code.
    ///
    /// Unknown strings map to [`ExitCode::InternalError`].
    pub fn from_error_code(code: &str) -> Self {
        match code {
            "VALIDATION_ERROR" | "DUPLICATE_ID" | "INVALID_TYPE" | "MISSING_REQUIRED" => {
                ExitCode::ValidationFailure
            }
            "DEPENDENCY_ERROR" | "CIRCULAR_DEPENDENCY" => ExitCode::DependencyFailure,
            "NOT_FOUND" => ExitCode::NotFound,
            "EXECUTION_ERROR" | "PLUGIN_ERROR" | "TIMEOUT" | "CONFLICT" | "INVALID_STATE" => {
                ExitCode::ExecutionFailure
            }
            "CANCELLED" => ExitCode::Cancelled,
            _ => ExitCode::InternalError,
        }
    }

    /// Gets the numeric process exit code
    pub fn code(&self) -> i32 {
        match self {
            ExitCode::Success => 0,
            ExitCode::ValidationFailure => 2,
            ExitCode::DependencyFailure => 3,
            ExitCode::NotFound => 4,
            ExitCode::ExecutionFailure => 5,
            // Conventional "terminated by SIGINT" code.
            ExitCode::Cancelled => 130,
            ExitCode::InternalError => 70,
        }
    }
}
