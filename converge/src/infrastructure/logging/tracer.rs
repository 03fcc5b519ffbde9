// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Tracer Adapter
//!
//! Implements the domain's [`Tracer`] / [`Span`] ports on `tracing` spans.
//! `tracing` requires span fields to be declared up front, so the adapter
//! pre-declares the attribute keys the engine uses (plus `status` and
//! `error`); attributes outside that set are recorded into the catch-all
//! `extra` field.

use converge_domain::context::ExecutionContext;
use converge_domain::services::{Span, SpanStatus, Tracer};
use tracing::field::Empty;

/// Attribute keys pre-declared on every span.
const KNOWN_FIELDS: &[&str] = &[
    "pipeline", "step_id", "step_type", "status", "error", "changed", "dry_run",
];

/// Tracer adapter over `tracing` spans.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTracer;

impl TracingTracer {
    /// Creates the adapter.
    pub fn new() -> Self {
        Self
    }
}

impl Tracer for TracingTracer {
    fn start_span(&self, ctx: &ExecutionContext, name: &str, attributes: &[(&str, &str)]) -> Box<dyn Span> {
        let span = tracing::info_span!(
            "converge",
            operation = name,
            correlation_id = %ctx.correlation_id(),
            pipeline = Empty,
            step_id = Empty,
            step_type = Empty,
            status = Empty,
            error = Empty,
            changed = Empty,
            dry_run = Empty,
            extra = Empty,
        );
        let mut execution_span = ExecutionSpan { span };
        for (key, value) in attributes {
            execution_span.set_attribute(key, value);
        }
        Box::new(execution_span)
    }
}

/// One in-flight `tracing` span.
pub struct ExecutionSpan {
    span: tracing::Span,
}

impl Span for ExecutionSpan {
    fn set_attribute(&mut self, key: &str, value: &str) {
        if KNOWN_FIELDS.contains(&key) {
            self.span.record(key, value);
        } else {
            self.span.record("extra", format!("{}={}", key, value).as_str());
        }
    }

    fn set_status(&mut self, status: SpanStatus, message: &str) {
        match status {
            SpanStatus::Ok => {
                self.span.record("status", "ok");
            }
            SpanStatus::Error => {
                self.span.record("status", "error");
                self.span.record("error", message);
            }
        }
    }

    fn end(self: Box<Self>) {
        // Dropping the span closes it.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_lifecycle_does_not_panic() {
        let tracer = TracingTracer::new();
        let ctx = ExecutionContext::new();

        let mut span = tracer.start_span(&ctx, "step.execute", &[("step_id", "install")]);
        span.set_attribute("step_type", "command");
        span.set_attribute("nonstandard", "value");
        span.set_status(SpanStatus::Error, "boom");
        span.end();
    }
}
