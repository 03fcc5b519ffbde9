// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Converge Engine
//!
//! Application use cases and infrastructure adapters for the converge
//! automation engine. The pure model lives in `converge-domain`; this crate
//! supplies:
//!
//! - **Application** ([`application`]) - the Prepare / Apply / Verify
//!   orchestration use cases
//! - **Infrastructure** ([`infrastructure`]) - the plugin registry, the
//!   level-parallel step executor, the YAML loader, the system validation
//!   service, the synchronous event publisher, Prometheus metrics, tracing
//!   logger/tracer adapters, the SQLite registry store, and the built-in
//!   step handlers
//! - **Presentation** ([`presentation`]) - console rendering over the event
//!   stream

pub mod application;
pub mod infrastructure;
pub mod presentation;
