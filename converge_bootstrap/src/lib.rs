// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Converge Bootstrap Layer
//!
//! Process-entry concerns for the converge binary, kept apart from both the
//! domain and the engine so they stay testable and reusable:
//!
//! - [`cli`] - clap argument surface
//! - [`logger`] - global tracing subscriber installation
//! - [`shutdown`] - OS signal to cooperative-cancellation bridging
//! - [`exit_code`] - stable process exit codes keyed by error code

pub mod cli;
pub mod exit_code;
pub mod logger;
pub mod shutdown;

pub use cli::{parse_cli, Cli, Commands};
pub use exit_code::ExitCode;
pub use logger::init_tracing;
pub use shutdown::wait_for_shutdown_signal;
