// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Validation Service Port
//!
//! Runs a pipeline's post-execution checks. The contract deliberately
//! returns the summary *and* an optional error (mirroring a tuple return):
//! the summary is populated with per-check results even when checks fail, so
//! callers can always render what happened.

use crate::context::ExecutionContext;
use crate::entities::Validation;
use crate::error::DomainError;
use crate::value_objects::VerificationSummary;
use async_trait::async_trait;

/// Port over the post-execution validation probes.
#[async_trait]
pub trait ValidationService: Send + Sync {
    /// Runs every check, accumulating per-check results into the summary.
    ///
    /// The error is `Some` when any check failed (`VALIDATION_ERROR` with a
    /// `failed_checks` context entry) or when cancellation fired
    /// (`CANCELLED`; remaining checks are not processed). The summary is
    /// valid in every case.
    async fn run_validations(
        &self,
        ctx: &ExecutionContext,
        checks: &[Validation],
    ) -> (VerificationSummary, Option<DomainError>);
}
