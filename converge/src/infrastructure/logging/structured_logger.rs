// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Structured Logger Adapter
//!
//! Routes the domain's [`Logger`] port onto the `tracing` ecosystem. Every
//! entry carries the run's correlation id extracted from the execution
//! context, plus the caller-supplied key/value fields rendered as a flat
//! `key=value` sequence (tracing requires field names to be static, so
//! dynamic fields travel in one rendered field).

use converge_domain::context::ExecutionContext;
use converge_domain::services::{LogLevel, Logger};

/// Logger adapter over `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl TracingLogger {
    /// Creates the adapter.
    pub fn new() -> Self {
        Self
    }

    fn render_fields(fields: &[(&str, &str)]) -> String {
        fields
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Logger for TracingLogger {
    fn log(&self, ctx: &ExecutionContext, level: LogLevel, message: &str, fields: &[(&str, &str)]) {
        let rendered = Self::render_fields(fields);
        match level {
            LogLevel::Debug => tracing::debug!(
                correlation_id = %ctx.correlation_id(),
                fields = %rendered,
                "{}",
                message
            ),
            LogLevel::Info => tracing::info!(
                correlation_id = %ctx.correlation_id(),
                fields = %rendered,
                "{}",
                message
            ),
            LogLevel::Warn => tracing::warn!(
                correlation_id = %ctx.correlation_id(),
                fields = %rendered,
                "{}",
                message
            ),
            LogLevel::Error => tracing::error!(
                correlation_id = %ctx.correlation_id(),
                fields = %rendered,
                "{}",
                message
            ),
        }
    }
}
