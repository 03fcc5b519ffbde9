// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Execution Context
//!
//! The execution context is the scope object threaded as the first parameter
//! of every port method in the engine. It bundles the two pieces of
//! per-invocation state the whole system agrees on:
//!
//! - a **cancellation token** consulted before step admission, inside handler
//!   implementations, at every verify iteration, and at level boundaries
//! - a **correlation identifier** (UUIDv4, generated once at process entry)
//!   stamped into every log line, event payload, and trace span so a single
//!   run's observability signals can be stitched together
//!
//! ## Usage
//!
//! ```
//! use converge_domain::context::ExecutionContext;
//!
//! # async fn example() {
//! let ctx = ExecutionContext::new();
//!
//! // Clone for a worker task; cancellation is shared, not copied.
//! let worker_ctx = ctx.clone();
//! tokio::spawn(async move {
//!     worker_ctx.cancelled().await;
//!     println!("worker observed shutdown");
//! });
//!
//! ctx.cancel();
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use uuid::Uuid;

/// Cancellation token for signaling that a run should stop.
///
/// Lightweight clone-able token; all clones observe the same flag. Once
/// cancelled a token stays cancelled, there is no reset.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    /// Shared cancellation flag
    cancelled: Arc<AtomicBool>,
    /// Notification for waiters
    notify: Arc<Notify>,
}

impl CancellationToken {
    /// Create a new, un-cancelled token
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Cancel this token and wake all waiters
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Check if cancelled (non-blocking)
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Wait for cancellation (async)
    ///
    /// Returns immediately when the token is already cancelled. Safe to call
    /// from any number of tasks concurrently.
    pub async fn cancelled(&self) {
        while !self.is_cancelled() {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register interest before the final flag check; notify_waiters
            // only wakes already-registered waiters.
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-invocation scope threaded through every port call.
///
/// Carries the correlation identifier and the cancellation token for one
/// engine run. Cloning is cheap and shares cancellation state; the
/// correlation id is copied so child scopes report under the same run.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    correlation_id: Uuid,
    token: CancellationToken,
}

impl ExecutionContext {
    /// Creates a context with a fresh UUIDv4 correlation id.
    pub fn new() -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            token: CancellationToken::new(),
        }
    }

    /// Creates a context with a caller-supplied correlation id.
    ///
    /// Used by embedders that already minted a correlation id at their own
    /// process entry and want engine signals to line up with theirs.
    pub fn with_correlation_id(correlation_id: Uuid) -> Self {
        Self {
            correlation_id,
            token: CancellationToken::new(),
        }
    }

    /// Gets the correlation id for this run
    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    /// Gets a clone of the underlying cancellation token
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Cancel the run
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Check if the run has been cancelled (non-blocking)
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait for cancellation (async)
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}
