// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Logging Initialization
//!
//! Installs the global `tracing` subscriber for the process. Level selection
//! honors `RUST_LOG` when set; otherwise `--verbose` switches between `info`
//! and `debug`. Initialization is idempotent so tests and embedders can call
//! it repeatedly.

use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global tracing subscriber.
///
/// Honors `RUST_LOG` when present; falls back to `info` (or `debug` with
/// `verbose`). Subsequent calls are no-ops.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    // try_init so a second initialization (tests, embedding) is harmless.
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_tracing(false);
        init_tracing(true);
        tracing::debug!("still alive after double init");
    }
}
