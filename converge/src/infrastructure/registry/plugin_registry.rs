// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Plugin Registry
//!
//! Process-wide, concurrent-safe container of step handlers keyed by step
//! type tag. The registry is read-mostly (one lookup per executed step) and
//! guarded by a readers-writer lock; registration happens once during
//! process wiring.
//!
//! ## Overview
//!
//! Two registration forms are supported:
//!
//! - [`register`](PluginRegistry::register) binds a constructed handler
//! - [`register_factory`](PluginRegistry::register_factory) binds a closure
//!   that constructs the handler lazily on first lookup; the produced
//!   metadata type must match the registration type
//!
//! Beyond dispatch, the registry validates the handler-to-handler dependency
//! graph at startup ([`validate_dependencies`](PluginRegistry::validate_dependencies))
//! and enforces interface discipline at runtime:
//! [`get_for_dependent`](PluginRegistry::get_for_dependent) hands out a
//! dependency handler only when the consumer's metadata declared that
//! dependency, which keeps hidden coupling out of the handler ecosystem.

use converge_domain::entities::StepType;
use converge_domain::error::DomainError;
use converge_domain::services::StepHandler;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Closure that constructs a handler on first use.
pub type HandlerFactory = Box<dyn Fn() -> Arc<dyn StepHandler> + Send + Sync>;

enum RegistryEntry {
    Ready(Arc<dyn StepHandler>),
    Factory(HandlerFactory),
}

/// Type-keyed step handler registry.
#[derive(Default)]
pub struct PluginRegistry {
    entries: RwLock<HashMap<StepType, RegistryEntry>>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Binds a constructed handler to its metadata type.
    ///
    /// # Errors
    ///
    /// - `VALIDATION_ERROR` - metadata has an empty id, name, or version
    /// - `DUPLICATE_ID` - the type tag is already bound
    pub fn register(&self, handler: Arc<dyn StepHandler>) -> Result<(), DomainError> {
        let metadata = handler.metadata();
        metadata.validate()?;
        let step_type = metadata.step_type();

        let mut entries = self.entries.write();
        if entries.contains_key(&step_type) {
            return Err(DomainError::duplicate_id(format!(
                "handler type '{}' is already registered",
                step_type
            ))
            .with_context("step_type", step_type.as_str()));
        }
        entries.insert(step_type, RegistryEntry::Ready(handler));
        Ok(())
    }

    /// Binds a factory that constructs the handler lazily.
    ///
    /// The factory runs on first lookup; if the produced metadata type does
    /// not match `step_type`, the lookup fails with `INVALID_TYPE`.
    ///
    /// # Errors
    ///
    /// `DUPLICATE_ID` - the type tag is already bound.
    pub fn register_factory(&self, step_type: StepType, factory: HandlerFactory) -> Result<(), DomainError> {
        let mut entries = self.entries.write();
        if entries.contains_key(&step_type) {
            return Err(DomainError::duplicate_id(format!(
                "handler type '{}' is already registered",
                step_type
            ))
            .with_context("step_type", step_type.as_str()));
        }
        entries.insert(step_type, RegistryEntry::Factory(factory));
        Ok(())
    }

    /// Resolves the handler bound to a type tag, constructing it if the
    /// binding was a factory.
    ///
    /// # Errors
    ///
    /// - `NOT_FOUND` - no handler bound to the type
    /// - `INVALID_TYPE` - a factory produced metadata for a different type
    /// - `VALIDATION_ERROR` - a factory produced invalid metadata
    pub fn get(&self, step_type: StepType) -> Result<Arc<dyn StepHandler>, DomainError> {
        {
            let entries = self.entries.read();
            match entries.get(&step_type) {
                Some(RegistryEntry::Ready(handler)) => return Ok(Arc::clone(handler)),
                Some(RegistryEntry::Factory(_)) => {}
                None => return Err(Self::missing(step_type)),
            }
        }

        // First lookup of a factory binding: swap in the constructed handler
        // under the write lock, re-checking in case another task won.
        let mut entries = self.entries.write();
        match entries.get(&step_type) {
            Some(RegistryEntry::Ready(handler)) => Ok(Arc::clone(handler)),
            Some(RegistryEntry::Factory(factory)) => {
                let handler = factory();
                handler.metadata().validate()?;
                let produced = handler.metadata().step_type();
                if produced != step_type {
                    return Err(DomainError::invalid_type(format!(
                        "factory registered for '{}' produced a handler for '{}'",
                        step_type, produced
                    ))
                    .with_context("step_type", step_type.as_str()));
                }
                entries.insert(step_type, RegistryEntry::Ready(Arc::clone(&handler)));
                Ok(handler)
            }
            None => Err(Self::missing(step_type)),
        }
    }

    /// All registered handlers, sorted by type tag for deterministic output.
    ///
    /// Materializes any pending factories.
    pub fn list(&self) -> Result<Vec<Arc<dyn StepHandler>>, DomainError> {
        let mut types = self.registered_types();
        types.sort_by_key(|step_type| step_type.as_str());
        types.into_iter().map(|step_type| self.get(step_type)).collect()
    }

    /// The currently bound type tags, in arbitrary order.
    pub fn registered_types(&self) -> Vec<StepType> {
        self.entries.read().keys().copied().collect()
    }

    /// Validates the handler-to-handler dependency graph.
    ///
    /// # Errors
    ///
    /// - `DEPENDENCY_ERROR` - a declared dependency is not registered
    ///   (`plugin` / `dependency` context)
    /// - `CIRCULAR_DEPENDENCY` - the declared graph has a cycle (`cycle`
    ///   context carries the closing path)
    pub fn validate_dependencies(&self) -> Result<(), DomainError> {
        let graph = self.dependency_graph()?;

        for (step_type, dependencies) in &graph {
            for dependency in dependencies {
                if !graph.contains_key(dependency) {
                    return Err(DomainError::dependency(format!(
                        "handler '{}' declares a dependency on unregistered handler '{}'",
                        step_type, dependency
                    ))
                    .with_context("plugin", step_type.as_str())
                    .with_context("dependency", dependency.as_str()));
                }
            }
        }

        // Three-color DFS over the declared graph.
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            OnStack,
            Done,
        }

        fn visit(
            node: StepType,
            graph: &HashMap<StepType, Vec<StepType>>,
            marks: &mut HashMap<StepType, Mark>,
            stack: &mut Vec<StepType>,
        ) -> Result<(), DomainError> {
            marks.insert(node, Mark::OnStack);
            stack.push(node);
            for dep in graph.get(&node).map(Vec::as_slice).unwrap_or(&[]) {
                match marks.get(dep).copied().unwrap_or(Mark::Unvisited) {
                    Mark::OnStack => {
                        let start = stack.iter().position(|n| n == dep).unwrap_or(0);
                        let mut path: Vec<&str> = stack[start..].iter().map(|n| n.as_str()).collect();
                        path.push(dep.as_str());
                        let rendered = path.join(" -> ");
                        return Err(DomainError::circular_dependency(format!(
                            "handler dependency cycle detected: {}",
                            rendered
                        ))
                        .with_context("cycle", rendered));
                    }
                    Mark::Unvisited => visit(*dep, graph, marks, stack)?,
                    Mark::Done => {}
                }
            }
            stack.pop();
            marks.insert(node, Mark::Done);
            Ok(())
        }

        let mut marks: HashMap<StepType, Mark> =
            graph.keys().map(|step_type| (*step_type, Mark::Unvisited)).collect();
        let mut stack = Vec::new();
        let mut roots: Vec<StepType> = graph.keys().copied().collect();
        roots.sort_by_key(|step_type| step_type.as_str());
        for root in roots {
            if marks.get(&root).copied() == Some(Mark::Unvisited) {
                visit(root, &graph, &mut marks, &mut stack)?;
            }
        }
        Ok(())
    }

    /// Produces a topological initialization order over the handlers.
    ///
    /// Dependencies come before their dependents; ties break
    /// lexicographically by type tag. This is the extension point for future
    /// lifecycle hooks - today it only fixes the order.
    ///
    /// # Errors
    ///
    /// Same failures as [`validate_dependencies`](PluginRegistry::validate_dependencies).
    pub fn initialize_plugins(&self) -> Result<Vec<StepType>, DomainError> {
        self.validate_dependencies()?;
        let graph = self.dependency_graph()?;

        let mut in_degree: HashMap<StepType, usize> =
            graph.keys().map(|step_type| (*step_type, 0)).collect();
        let mut dependents: HashMap<StepType, Vec<StepType>> = HashMap::new();
        for (step_type, dependencies) in &graph {
            for dependency in dependencies {
                *in_degree.entry(*step_type).or_insert(0) += 1;
                dependents.entry(*dependency).or_default().push(*step_type);
            }
        }

        let mut frontier: Vec<StepType> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(step_type, _)| *step_type)
            .collect();
        frontier.sort_by_key(|step_type| step_type.as_str());

        let mut order = Vec::with_capacity(graph.len());
        while let Some(step_type) = frontier.first().copied() {
            frontier.remove(0);
            order.push(step_type);
            for dependent in dependents.get(&step_type).map(Vec::as_slice).unwrap_or(&[]) {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        frontier.push(*dependent);
                    }
                }
            }
            frontier.sort_by_key(|step_type| step_type.as_str());
        }
        Ok(order)
    }

    /// Resolves a dependency handler on behalf of a consumer.
    ///
    /// Enforces interface discipline: the consumer's metadata must have
    /// declared the dependency, otherwise the access fails even when the
    /// dependency is registered.
    ///
    /// # Errors
    ///
    /// - `DEPENDENCY_ERROR` - the consumer did not declare this dependency
    /// - `NOT_FOUND` - consumer or dependency not registered
    pub fn get_for_dependent(
        &self,
        consumer_type: StepType,
        dependency_type: StepType,
    ) -> Result<Arc<dyn StepHandler>, DomainError> {
        let consumer = self.get(consumer_type)?;
        if !consumer.metadata().declares_dependency_on(dependency_type) {
            return Err(DomainError::dependency(format!(
                "handler '{}' did not declare a dependency on '{}'",
                consumer_type, dependency_type
            ))
            .with_context("plugin", consumer_type.as_str())
            .with_context("dependency", dependency_type.as_str()));
        }
        self.get(dependency_type)
    }

    fn dependency_graph(&self) -> Result<HashMap<StepType, Vec<StepType>>, DomainError> {
        Ok(self
            .list()?
            .iter()
            .map(|handler| {
                (
                    handler.metadata().step_type(),
                    handler.metadata().dependencies().to_vec(),
                )
            })
            .collect())
    }

    fn missing(step_type: StepType) -> DomainError {
        DomainError::not_found(format!("no handler registered for step type '{}'", step_type))
            .with_context("step_type", step_type.as_str())
    }
}
