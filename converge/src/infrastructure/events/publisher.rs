// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # In-Process Event Publisher
//!
//! Synchronous fan-out implementation of the [`EventPublisher`] port.
//! Subscribers register per event type; publishing delivers on the calling
//! task, in subscription order. A failing subscriber is logged with the
//! run's correlation id and delivery continues - observability consumers
//! must never be able to fail a pipeline.
//!
//! Handlers are snapshotted out of the lock before delivery, so a
//! subscriber may itself subscribe or unsubscribe without deadlocking.

use converge_domain::context::ExecutionContext;
use converge_domain::events::{EventType, PipelineEvent};
use converge_domain::services::{EventHandler, EventPublisher, Subscription};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Synchronous, in-process event fan-out.
#[derive(Default)]
pub struct InProcessEventPublisher {
    subscribers: RwLock<HashMap<EventType, Vec<(u64, EventHandler)>>>,
    next_id: AtomicU64,
}

impl InProcessEventPublisher {
    /// Creates a publisher with no subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Number of live subscriptions for an event type.
    pub fn subscriber_count(&self, event_type: EventType) -> usize {
        self.subscribers
            .read()
            .get(&event_type)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl EventPublisher for InProcessEventPublisher {
    fn publish(&self, ctx: &ExecutionContext, event: PipelineEvent) {
        let handlers: Vec<EventHandler> = {
            let subscribers = self.subscribers.read();
            match subscribers.get(&event.event_type()) {
                Some(list) => list.iter().map(|(_, handler)| handler.clone()).collect(),
                None => return,
            }
        };

        for handler in handlers {
            if let Err(error) = handler(&event) {
                tracing::warn!(
                    correlation_id = %ctx.correlation_id(),
                    event_type = event.event_type().as_str(),
                    "event subscriber failed: {}",
                    error
                );
            }
        }
    }

    fn subscribe(&self, event_type: EventType, handler: EventHandler) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.subscribers
            .write()
            .entry(event_type)
            .or_default()
            .push((id, handler));
        Subscription::new(id, event_type)
    }

    fn unsubscribe(&self, subscription: &Subscription) {
        let mut subscribers = self.subscribers.write();
        if let Some(list) = subscribers.get_mut(&subscription.event_type()) {
            list.retain(|(id, _)| *id != subscription.id());
        }
    }
}
