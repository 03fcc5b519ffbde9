// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Error module for the converge domain.
//!
//! Exposes the structured [`DomainError`] and its closed [`ErrorCode`]
//! taxonomy. See [`domain_error`] for the full design discussion.

pub mod domain_error;

pub use domain_error::{DomainError, DomainResult, ErrorCode};
