// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Interface
//!
//! Bootstrap-layer CLI surface. Parsing stays here so the engine crate never
//! touches `std::env`; the binary receives a fully parsed [`Cli`] value and
//! maps it onto use cases.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Declarative infrastructure automation: converge a machine onto a pipeline
/// of steps with dependencies, bounded parallelism, and idempotent handlers.
#[derive(Debug, Parser)]
#[command(name = "converge", version, about)]
pub struct Cli {
    /// Enable verbose (debug-level) logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Execute a pipeline: plan it, run every level, then validate
    Apply {
        /// Path to the pipeline configuration (.yaml/.yml)
        config: PathBuf,

        /// Evaluate steps but never apply changes
        #[arg(long)]
        dry_run: bool,

        /// Keep executing later levels after a step fails
        #[arg(long)]
        continue_on_error: bool,

        /// Override the per-level parallelism bound
        #[arg(long)]
        parallel: Option<usize>,
    },

    /// Build and print the levelized execution plan without running it
    Plan {
        /// Path to the pipeline configuration (.yaml/.yml)
        config: PathBuf,
    },

    /// Evaluate every step and report drift without applying anything
    Verify {
        /// Path to the pipeline configuration (.yaml/.yml)
        config: PathBuf,
    },

    /// Check that a configuration file parses and satisfies all invariants
    Validate {
        /// Path to the pipeline configuration (.yaml/.yml)
        config: PathBuf,
    },
}

/// Parses the process arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_flags() {
        let cli = Cli::try_parse_from([
            "converge",
            "apply",
            "pipeline.yaml",
            "--dry-run",
            "--parallel",
            "2",
        ])
        .unwrap();

        match cli.command {
            Commands::Apply {
                config,
                dry_run,
                continue_on_error,
                parallel,
            } => {
                assert_eq!(config, PathBuf::from("pipeline.yaml"));
                assert!(dry_run);
                assert!(!continue_on_error);
                assert_eq!(parallel, Some(2));
            }
            _ => panic!("expected apply"),
        }
    }

    #[test]
    fn test_verbose_is_global() {
        let cli = Cli::try_parse_from(["converge", "verify", "p.yaml", "--verbose"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Verify { .. }));
    }

    #[test]
    fn test_missing_subcommand_fails() {
        assert!(Cli::try_parse_from(["converge"]).is_err());
    }
}
