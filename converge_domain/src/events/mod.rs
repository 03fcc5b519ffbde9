// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Domain events emitted around pipeline execution.

pub mod pipeline_events;

pub use pipeline_events::{
    EventType, PipelineCompletedEvent, PipelineEvent, PipelineFailedEvent, PipelineStartedEvent,
    StepCompletedEvent, StepFailedEvent, StepSkippedEvent, StepStartedEvent,
    ValidationCompletedEvent, ValidationFailedEvent, ValidationStartedEvent,
};
