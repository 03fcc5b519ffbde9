// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Event Publisher Port
//!
//! Synchronous fan-out of domain events to per-type subscribers. Delivery
//! happens on the publishing task; a subscriber error is logged but neither
//! aborts delivery to the remaining subscribers nor fails the publisher.
//! Implementations must be safe for concurrent publish and (un)subscribe.

use crate::context::ExecutionContext;
use crate::error::DomainError;
use crate::events::{EventType, PipelineEvent};
use std::sync::Arc;

/// Callback invoked synchronously for each matching event.
pub type EventHandler = Arc<dyn Fn(&PipelineEvent) -> Result<(), DomainError> + Send + Sync>;

/// Handle returned by [`EventPublisher::subscribe`].
///
/// Opaque to subscribers; hand it back to
/// [`EventPublisher::unsubscribe`] to remove the handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    id: u64,
    event_type: EventType,
}

impl Subscription {
    /// Creates a subscription handle (publisher implementations only).
    pub fn new(id: u64, event_type: EventType) -> Self {
        Self { id, event_type }
    }

    /// Gets the publisher-assigned subscription id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Gets the event type this subscription listens to
    pub fn event_type(&self) -> EventType {
        self.event_type
    }
}

/// Port over lifecycle event delivery.
pub trait EventPublisher: Send + Sync {
    /// Delivers the event synchronously to every subscriber registered for
    /// its type.
    fn publish(&self, ctx: &ExecutionContext, event: PipelineEvent);

    /// Registers a handler for one event type.
    fn subscribe(&self, event_type: EventType, handler: EventHandler) -> Subscription;

    /// Removes a previously registered handler. Unknown subscriptions are
    /// ignored.
    fn unsubscribe(&self, subscription: &Subscription);
}

/// Publisher that drops every event. Useful for tests and embedders that do
/// not care about lifecycle events.
#[derive(Debug, Default)]
pub struct NoOpEventPublisher;

impl NoOpEventPublisher {
    /// Creates a no-op publisher.
    pub fn new() -> Self {
        Self
    }
}

impl EventPublisher for NoOpEventPublisher {
    fn publish(&self, _ctx: &ExecutionContext, _event: PipelineEvent) {}

    fn subscribe(&self, event_type: EventType, _handler: EventHandler) -> Subscription {
        Subscription::new(0, event_type)
    }

    fn unsubscribe(&self, _subscription: &Subscription) {}
}
