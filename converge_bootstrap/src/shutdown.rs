// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Shutdown Signals
//!
//! Bridges operating-system signals into the engine's cooperative
//! cancellation. The binary spawns [`wait_for_shutdown_signal`] and cancels
//! the execution context when it resolves; in-flight steps then drain and no
//! new level starts.
//!
//! On Unix both `SIGINT` (ctrl-c) and `SIGTERM` are honored; elsewhere only
//! ctrl-c is available.

/// Resolves when the process receives a shutdown signal.
///
/// Never resolves if signal registration fails; registration failures are
/// logged and treated as "no signal will arrive", which leaves the run
/// interruptible only by the platform's hard kill.
pub async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut term = match signal(SignalKind::terminate()) {
            Ok(stream) => Some(stream),
            Err(error) => {
                tracing::warn!("failed to register SIGTERM handler: {}", error);
                None
            }
        };

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(error) = result {
                    tracing::warn!("failed to listen for ctrl-c: {}", error);
                    std::future::pending::<()>().await;
                }
                tracing::info!("received SIGINT, shutting down");
            }
            _ = async {
                match term.as_mut() {
                    Some(stream) => { stream.recv().await; }
                    None => std::future::pending::<()>().await,
                }
            } => {
                tracing::info!("received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for ctrl-c: {}", error);
            std::future::pending::<()>().await;
        }
        tracing::info!("received ctrl-c, shutting down");
    }
}
