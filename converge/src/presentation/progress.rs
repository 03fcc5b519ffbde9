// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Progress Renderer
//!
//! Console renderer fed by the event publisher: it subscribes to the step
//! and validation lifecycle events and prints one line per transition as the
//! run unfolds. Because events are delivered synchronously from the
//! producing task, output interleaving mirrors actual concurrency.

use converge_domain::events::{EventType, PipelineEvent};
use converge_domain::services::{EventPublisher, Subscription};
use std::sync::Arc;

/// Live console progress over the event stream.
pub struct ProgressRenderer {
    publisher: Arc<dyn EventPublisher>,
    subscriptions: Vec<Subscription>,
}

impl ProgressRenderer {
    /// Subscribes the renderer to the step and validation events.
    pub fn attach(publisher: Arc<dyn EventPublisher>) -> Self {
        let mut subscriptions = Vec::new();

        subscriptions.push(publisher.subscribe(
            EventType::StepStarted,
            Arc::new(|event| {
                if let PipelineEvent::StepStarted(payload) = event {
                    if payload.dry_run {
                        println!("  > {} ({}) [dry-run]", payload.step_id, payload.step_type);
                    } else {
                        println!("  > {} ({})", payload.step_id, payload.step_type);
                    }
                }
                Ok(())
            }),
        ));

        subscriptions.push(publisher.subscribe(
            EventType::StepCompleted,
            Arc::new(|event| {
                if let PipelineEvent::StepCompleted(payload) = event {
                    let change = if payload.changed { "changed" } else { "unchanged" };
                    println!("  + {} ({}, {} ms)", payload.step_id, change, payload.duration_ms);
                }
                Ok(())
            }),
        ));

        subscriptions.push(publisher.subscribe(
            EventType::StepSkipped,
            Arc::new(|event| {
                if let PipelineEvent::StepSkipped(payload) = event {
                    println!("  = {} ({})", payload.step_id, payload.reason);
                }
                Ok(())
            }),
        ));

        subscriptions.push(publisher.subscribe(
            EventType::StepFailed,
            Arc::new(|event| {
                if let PipelineEvent::StepFailed(payload) = event {
                    println!("  ! {} failed: {}", payload.step_id, payload.error);
                }
                Ok(())
            }),
        ));

        subscriptions.push(publisher.subscribe(
            EventType::ValidationCompleted,
            Arc::new(|event| {
                if let PipelineEvent::ValidationCompleted(payload) = event {
                    println!(
                        "  validations: {} passed, {} failed, {} unknown",
                        payload.passed, payload.failed, payload.unknown
                    );
                }
                Ok(())
            }),
        ));

        subscriptions.push(publisher.subscribe(
            EventType::ValidationFailed,
            Arc::new(|event| {
                if let PipelineEvent::ValidationFailed(payload) = event {
                    println!(
                        "  validations: {} passed, {} failed, {} unknown",
                        payload.passed, payload.failed, payload.unknown
                    );
                }
                Ok(())
            }),
        ));

        Self {
            publisher,
            subscriptions,
        }
    }

    /// Removes every subscription.
    pub fn detach(self) {
        for subscription in &self.subscriptions {
            self.publisher.unsubscribe(subscription);
        }
    }
}
