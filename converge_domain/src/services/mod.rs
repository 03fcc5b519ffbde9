// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Domain services and ports.
//!
//! The [`ExecutionPlanner`] is a pure domain service; everything else here is
//! a port trait implemented by infrastructure adapters:
//!
//! - [`ConfigLoader`] - pipeline definitions from the filesystem
//! - [`StepHandler`] - typed step implementations (evaluate/apply)
//! - [`PipelineExecutor`] - level-parallel execution and verify
//! - [`ValidationService`] - post-execution probes
//! - [`EventPublisher`] - synchronous lifecycle event fan-out
//! - [`Logger`] / [`MetricsPort`] / [`Tracer`] - observability surface
//! - [`RegistryStore`] - named-pipeline persistence

pub mod config_loader;
pub mod event_publisher;
pub mod execution_planner;
pub mod logger;
pub mod metrics;
pub mod pipeline_executor;
pub mod registry_store;
pub mod step_handler;
pub mod tracer;
pub mod validation_service;

pub use config_loader::ConfigLoader;
pub use event_publisher::{EventHandler, EventPublisher, NoOpEventPublisher, Subscription};
pub use execution_planner::ExecutionPlanner;
pub use logger::{LogLevel, Logger, NoOpLogger};
pub use metrics::{MetricsPort, NoOpMetrics};
pub use pipeline_executor::{ExecutionOutcome, PipelineExecutor};
pub use registry_store::{ExecutionStatus, Registration, RegistryStore};
pub use step_handler::{HandlerMetadata, StepHandler};
pub use tracer::{NoOpSpan, NoOpTracer, Span, SpanStatus, Tracer};
pub use validation_service::ValidationService;
