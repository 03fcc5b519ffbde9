// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Execution Settings
//!
//! The knobs a pipeline exposes to the executor: bounded parallelism, an
//! advisory handler timeout, error tolerance, dry-run, and verbosity.
//! Zero/unset values are substituted with defaults through
//! [`Settings::apply_defaults`], which the executor always calls before
//! dispatching a plan.

use serde::{Deserialize, Serialize};

/// Default number of steps admitted concurrently within a level.
pub const DEFAULT_PARALLEL: usize = 4;

/// Default advisory timeout for handler operations, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Execution knobs recognized by the executor.
///
/// `timeout` is advisory: the executor hands it to handlers but does not
/// abort a handler that ignores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    parallel: usize,
    #[serde(default, rename = "timeout")]
    timeout_secs: u64,
    #[serde(default)]
    continue_on_error: bool,
    #[serde(default)]
    dry_run: bool,
    #[serde(default)]
    verbose: bool,
}

impl Settings {
    /// Creates settings with every field defaulted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the parallelism bound
    pub fn with_parallel(mut self, parallel: usize) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sets the advisory handler timeout in seconds
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Sets whether later levels run after an earlier level failed
    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    /// Sets dry-run mode (evaluate only, never apply)
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Sets verbose output
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Gets the parallelism bound (may be 0 before defaults are applied)
    pub fn parallel(&self) -> usize {
        self.parallel
    }

    /// Gets the advisory timeout in seconds
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// Gets the continue-on-error flag
    pub fn continue_on_error(&self) -> bool {
        self.continue_on_error
    }

    /// Gets the dry-run flag
    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Gets the verbose flag
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Returns a copy with defaults substituted for zero/unset values.
    ///
    /// `parallel == 0` becomes [`DEFAULT_PARALLEL`]; `timeout == 0` becomes
    /// [`DEFAULT_TIMEOUT_SECS`]. Boolean flags are kept as-is.
    pub fn apply_defaults(&self) -> Settings {
        Settings {
            parallel: if self.parallel == 0 { DEFAULT_PARALLEL } else { self.parallel },
            timeout_secs: if self.timeout_secs == 0 {
                DEFAULT_TIMEOUT_SECS
            } else {
                self.timeout_secs
            },
            continue_on_error: self.continue_on_error,
            dry_run: self.dry_run,
            verbose: self.verbose,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            parallel: DEFAULT_PARALLEL,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            continue_on_error: false,
            dry_run: false,
            verbose: false,
        }
    }
}
