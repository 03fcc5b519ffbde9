// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Converge Domain Layer
//!
//! Pure business logic for the converge automation engine: a declarative
//! pipeline of interdependent steps is validated, levelized into a DAG
//! execution plan, and executed with bounded parallelism under an
//! evaluate-before-apply discipline.
//!
//! ## Layering
//!
//! This crate is the innermost layer and depends on nothing above it:
//!
//! - **Entities** ([`entities`]) - `Pipeline`, `Step`, `Settings`,
//!   `Validation`, with eager self-validation
//! - **Value objects** ([`value_objects`]) - `ExecutionPlan`,
//!   `EvaluationResult`, `StepResult`, verification types
//! - **Domain services and ports** ([`services`]) - the pure
//!   `ExecutionPlanner` plus the port traits infrastructure adapters
//!   implement
//! - **Events** ([`events`]) - the closed lifecycle event vocabulary
//! - **Errors** ([`error`]) - the structured `DomainError` taxonomy
//! - **Context** ([`context`]) - the cancellation/correlation scope threaded
//!   through every port call

pub mod context;
pub mod entities;
pub mod error;
pub mod events;
pub mod services;
pub mod value_objects;

pub use context::{CancellationToken, ExecutionContext};
pub use entities::{Pipeline, Settings, Step, StepType, Validation, ValidationType};
pub use error::{DomainError, DomainResult, ErrorCode};
pub use events::{EventType, PipelineEvent};
pub use services::{
    ConfigLoader, EventPublisher, ExecutionOutcome, ExecutionPlanner, HandlerMetadata, Logger,
    MetricsPort, PipelineExecutor, RegistryStore, StepHandler, Tracer, ValidationService,
};
pub use value_objects::{
    EvaluationResult, ExecutionLevel, ExecutionPlan, StepResult, StepStatus, VerificationResult,
    VerificationStatus, VerificationSummary,
};
