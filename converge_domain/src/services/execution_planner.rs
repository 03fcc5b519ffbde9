// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Execution Planner
//!
//! Turns a step list into a levelized [`ExecutionPlan`]: each level is a set
//! of steps that may run concurrently, and every dependency of a step lies in
//! a strictly lower level.
//!
//! ## Algorithm
//!
//! Kahn's topological sort with deterministic ordering:
//!
//! 1. Collect the subgraph of enabled steps; disabled steps are dropped
//!    entirely, and a dependency pointing at a disabled step is reported as
//!    missing
//! 2. Compute the in-degree of every node
//! 3. Seed the frontier with all zero-in-degree nodes, sorted
//!    lexicographically
//! 4. Emit the frontier as the next level, decrement successor in-degrees,
//!    and sort each newly-formed frontier so plans are byte-identical across
//!    runs
//! 5. If fewer nodes were emitted than exist, the remainder forms a cycle
//!
//! The planner cannot emit an empty level: a frontier is only emitted when it
//! is non-empty, so an empty level in a plan always indicates a bug, and
//! [`ExecutionPlan::validate`] rejects it.

use crate::context::ExecutionContext;
use crate::entities::Step;
use crate::error::DomainError;
use crate::value_objects::{ExecutionLevel, ExecutionPlan};
use std::collections::{BTreeMap, HashMap};

/// Pure domain service that levelizes step graphs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionPlanner;

impl ExecutionPlanner {
    /// Creates a planner.
    pub fn new() -> Self {
        Self
    }

    /// Builds a levelized plan over the enabled steps.
    ///
    /// # Errors
    ///
    /// - `DEPENDENCY_ERROR` - a dependency names a missing or disabled step,
    ///   or a step depends on itself (`missing_dependency` / `step_id`
    ///   context)
    /// - `CIRCULAR_DEPENDENCY` - the enabled subgraph contains a cycle
    ///   (`cycle` context carries a closing path)
    /// - `CANCELLED` - the caller's cancellation signal fired during
    ///   construction
    pub fn build(&self, ctx: &ExecutionContext, steps: &[Step]) -> Result<ExecutionPlan, DomainError> {
        // BTreeMap keeps iteration deterministic while we wire up the graph.
        let enabled: BTreeMap<&str, &Step> = steps
            .iter()
            .filter(|step| step.enabled())
            .map(|step| (step.id(), step))
            .collect();

        let mut in_degree: BTreeMap<&str, usize> = enabled.keys().map(|id| (*id, 0)).collect();
        let mut successors: HashMap<&str, Vec<&str>> = HashMap::with_capacity(enabled.len());

        for step in enabled.values() {
            for dep in step.depends_on() {
                if dep == step.id() {
                    return Err(DomainError::dependency(format!(
                        "step '{}' cannot depend on itself",
                        step.id()
                    ))
                    .with_context("step_id", step.id()));
                }
                if !enabled.contains_key(dep.as_str()) {
                    return Err(DomainError::dependency(format!(
                        "step '{}' depends on '{}', which is missing or disabled",
                        step.id(),
                        dep
                    ))
                    .with_context("step_id", step.id())
                    .with_context("missing_dependency", dep));
                }
                *in_degree.entry(step.id()).or_insert(0) += 1;
                successors.entry(dep.as_str()).or_default().push(step.id());
            }
        }

        let mut frontier: Vec<&str> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| *id)
            .collect();
        frontier.sort_unstable();

        let mut levels: Vec<ExecutionLevel> = Vec::new();
        let mut emitted = 0usize;

        while !frontier.is_empty() {
            if ctx.is_cancelled() {
                return Err(DomainError::cancelled("plan construction cancelled"));
            }

            emitted += frontier.len();
            let mut next: Vec<&str> = Vec::new();
            for id in &frontier {
                for succ in successors.get(id).map(Vec::as_slice).unwrap_or(&[]) {
                    if let Some(degree) = in_degree.get_mut(succ) {
                        *degree -= 1;
                        if *degree == 0 {
                            next.push(succ);
                        }
                    }
                }
            }
            next.sort_unstable();

            levels.push(ExecutionLevel::new(
                levels.len(),
                frontier.iter().map(|id| id.to_string()).collect(),
            ));
            frontier = next;
        }

        if emitted < enabled.len() {
            let cycle = Self::find_cycle(&enabled, &in_degree);
            return Err(DomainError::circular_dependency(format!(
                "dependency cycle detected: {}",
                cycle
            ))
            .with_context("cycle", cycle));
        }

        Ok(ExecutionPlan::new(levels, enabled.len()))
    }

    /// Extracts one closing path from the nodes Kahn's sort could not emit.
    fn find_cycle(enabled: &BTreeMap<&str, &Step>, in_degree: &BTreeMap<&str, usize>) -> String {
        // Every remaining node has in-degree > 0 and all its remaining
        // predecessors are also stuck, so walking dependencies from any stuck
        // node must revisit one.
        let remaining: Vec<&str> = in_degree
            .iter()
            .filter(|(_, degree)| **degree > 0)
            .map(|(id, _)| *id)
            .collect();

        let start = match remaining.first() {
            Some(id) => *id,
            None => return String::from("<unknown>"),
        };

        let mut path: Vec<&str> = vec![start];
        let mut current = start;
        loop {
            let step = match enabled.get(current) {
                Some(step) => *step,
                None => return path.join(" -> "),
            };
            let next = step
                .depends_on()
                .iter()
                .map(String::as_str)
                .find(|dep| remaining.contains(dep));
            match next {
                Some(dep) => {
                    if let Some(pos) = path.iter().position(|id| *id == dep) {
                        let mut cycle: Vec<&str> = path[pos..].to_vec();
                        cycle.reverse();
                        cycle.push(cycle[0]);
                        return cycle.join(" -> ");
                    }
                    path.push(dep);
                    current = dep;
                }
                // Unreachable for a genuine cycle; bail out with what we have.
                None => return path.join(" -> "),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::StepType;
    use crate::error::ErrorCode;

    fn step(id: &str, deps: &[&str]) -> Step {
        Step::new(id, StepType::Command)
            .with_config_entry("command", "true")
            .with_depends_on(deps.iter().map(|d| d.to_string()).collect())
    }

    fn level_ids(plan: &ExecutionPlan, index: usize) -> Vec<&str> {
        plan.levels()[index].step_ids().iter().map(String::as_str).collect()
    }

    #[test]
    fn test_linear_chain() {
        let ctx = ExecutionContext::new();
        let steps = vec![step("a", &[]), step("b", &["a"]), step("c", &["b"])];
        let plan = ExecutionPlanner::new().build(&ctx, &steps).unwrap();

        assert_eq!(plan.levels().len(), 3);
        assert_eq!(level_ids(&plan, 0), vec!["a"]);
        assert_eq!(level_ids(&plan, 1), vec!["b"]);
        assert_eq!(level_ids(&plan, 2), vec!["c"]);
        assert_eq!(plan.step_count(), 3);
    }

    #[test]
    fn test_diamond_sorts_inner_level() {
        let ctx = ExecutionContext::new();
        // Declared out of lexicographic order on purpose.
        let steps = vec![
            step("a", &[]),
            step("c", &["a"]),
            step("b", &["a"]),
            step("d", &["b", "c"]),
        ];
        let plan = ExecutionPlanner::new().build(&ctx, &steps).unwrap();

        assert_eq!(level_ids(&plan, 0), vec!["a"]);
        assert_eq!(level_ids(&plan, 1), vec!["b", "c"]);
        assert_eq!(level_ids(&plan, 2), vec!["d"]);
    }

    #[test]
    fn test_cycle_reports_closing_path() {
        let ctx = ExecutionContext::new();
        let steps = vec![step("a", &["b"]), step("b", &["a"])];
        let err = ExecutionPlanner::new().build(&ctx, &steps).unwrap_err();

        assert_eq!(err.code(), ErrorCode::CircularDependency);
        let cycle = err.context_value("cycle").expect("cycle path");
        assert!(cycle.contains('a') && cycle.contains('b'));
    }

    #[test]
    fn test_missing_dependency() {
        let ctx = ExecutionContext::new();
        let steps = vec![step("a", &["ghost"])];
        let err = ExecutionPlanner::new().build(&ctx, &steps).unwrap_err();

        assert_eq!(err.code(), ErrorCode::Dependency);
        assert_eq!(err.context_value("missing_dependency"), Some("ghost"));
    }

    #[test]
    fn test_dependency_on_disabled_step_is_missing() {
        let ctx = ExecutionContext::new();
        let steps = vec![step("a", &[]).with_enabled(false), step("b", &["a"])];
        let err = ExecutionPlanner::new().build(&ctx, &steps).unwrap_err();

        assert_eq!(err.code(), ErrorCode::Dependency);
        assert_eq!(err.context_value("missing_dependency"), Some("a"));
    }

    #[test]
    fn test_disabled_steps_dropped() {
        let ctx = ExecutionContext::new();
        let steps = vec![step("a", &[]), step("b", &[]).with_enabled(false)];
        let plan = ExecutionPlanner::new().build(&ctx, &steps).unwrap();

        assert_eq!(plan.step_count(), 1);
        assert_eq!(plan.level_of("b"), None);
    }

    #[test]
    fn test_self_dependency() {
        let ctx = ExecutionContext::new();
        let steps = vec![step("a", &["a"])];
        let err = ExecutionPlanner::new().build(&ctx, &steps).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Dependency);
    }

    #[test]
    fn test_planning_is_deterministic() {
        let ctx = ExecutionContext::new();
        let steps = vec![
            step("z", &[]),
            step("m", &["z"]),
            step("a", &["z"]),
            step("q", &["m", "a"]),
        ];
        let planner = ExecutionPlanner::new();
        let first = planner.build(&ctx, &steps).unwrap();
        let second = planner.build(&ctx, &steps).unwrap();
        assert_eq!(first, second);
        assert_eq!(level_ids(&first, 1), vec!["a", "m"]);
    }

    #[test]
    fn test_cancelled_context_aborts_build() {
        let ctx = ExecutionContext::new();
        ctx.cancel();
        let steps = vec![step("a", &[])];
        let err = ExecutionPlanner::new().build(&ctx, &steps).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Cancelled);
    }

    #[test]
    fn test_plan_validates_against_pipeline() {
        use crate::entities::Pipeline;

        let steps = vec![step("a", &[]), step("b", &["a"]), step("c", &["a"])];
        let pipeline = Pipeline::new("check", steps).unwrap();
        let ctx = ExecutionContext::new();
        let plan = ExecutionPlanner::new().build(&ctx, pipeline.steps()).unwrap();
        assert!(plan.validate(&pipeline).is_ok());
    }
}
