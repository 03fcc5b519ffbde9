// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Built-in Step Handlers
//!
//! Reference handlers for the step types the engine ships with:
//!
//! - [`CommandHandler`] - run a shell command, with `creates`/`check` guards
//!   for idempotence
//! - [`CopyHandler`] - copy a file when content differs
//! - [`SymlinkHandler`] - maintain a symbolic link
//! - [`LineInFileHandler`] - ensure a file contains an exact line
//!
//! `package`, `repo`, and `template` are modeled type tags whose handlers
//! are expected from embedders; dispatching them without a registration
//! yields the registry's `NOT_FOUND` failure path.
//!
//! All handlers treat `step.config()` as read-only and keep `evaluate`
//! side-effect-free.

pub mod command;
pub mod copy;
pub mod line_in_file;
pub mod symlink;

pub use command::CommandHandler;
pub use copy::CopyHandler;
pub use line_in_file::LineInFileHandler;
pub use symlink::SymlinkHandler;

use converge_domain::entities::Step;
use converge_domain::error::DomainError;

/// Resolves a required string entry from a step's configuration.
pub(crate) fn required_str<'a>(step: &'a Step, key: &str) -> Result<&'a str, DomainError> {
    let value = step.config().get(key).ok_or_else(|| {
        DomainError::missing_required(format!("step '{}' requires config key '{}'", step.id(), key))
            .with_context("step_id", step.id())
            .with_context("field", key)
    })?;
    value.as_str().ok_or_else(|| {
        DomainError::validation(format!("step '{}' config key '{}' must be a string", step.id(), key))
            .with_context("step_id", step.id())
            .with_context("field", key)
    })
}

/// Resolves an optional string entry from a step's configuration.
pub(crate) fn optional_str<'a>(step: &'a Step, key: &str) -> Result<Option<&'a str>, DomainError> {
    match step.config().get(key) {
        None => Ok(None),
        Some(value) => value.as_str().map(Some).ok_or_else(|| {
            DomainError::validation(format!("step '{}' config key '{}' must be a string", step.id(), key))
                .with_context("step_id", step.id())
                .with_context("field", key)
        }),
    }
}

/// Resolves an optional non-negative integer entry.
pub(crate) fn optional_u64(step: &Step, key: &str) -> Result<Option<u64>, DomainError> {
    match step.config().get(key) {
        None => Ok(None),
        Some(value) => value.as_u64().map(Some).ok_or_else(|| {
            DomainError::validation(format!(
                "step '{}' config key '{}' must be a non-negative integer",
                step.id(),
                key
            ))
            .with_context("step_id", step.id())
            .with_context("field", key)
        }),
    }
}
