// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Orchestration use cases: Prepare, Apply, Verify.

pub mod apply_pipeline;
pub mod prepare_pipeline;
pub mod verify_pipeline;

pub use apply_pipeline::{ApplyOptions, ApplyPipelineUseCase, ApplyReport};
pub use prepare_pipeline::{PreparePipelineUseCase, PreparedPipeline};
pub use verify_pipeline::VerifyPipelineUseCase;
