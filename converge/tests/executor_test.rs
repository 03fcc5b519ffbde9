// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Executor integration tests: level ordering, bounded parallelism,
//! idempotence, dry-run, fail-fast vs continue-on-error, cancellation, and
//! the per-step event stream.

mod common;

use common::{pipeline, step, EventRecorder, MockHandler};
use converge::infrastructure::events::InProcessEventPublisher;
use converge::infrastructure::registry::PluginRegistry;
use converge::infrastructure::runtime::StepExecutor;
use converge_domain::context::ExecutionContext;
use converge_domain::entities::{Settings, StepType};
use converge_domain::error::ErrorCode;
use converge_domain::services::{
    EventPublisher, ExecutionPlanner, NoOpLogger, NoOpMetrics, NoOpTracer, PipelineExecutor,
};
use converge_domain::value_objects::{StepStatus, VerificationStatus};
use converge_domain::EventType;
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    handler: Arc<MockHandler>,
    recorder: EventRecorder,
    executor: StepExecutor,
}

fn harness(handler: MockHandler) -> Harness {
    let handler = Arc::new(handler);
    let registry = Arc::new(PluginRegistry::new());
    registry
        .register(Arc::clone(&handler) as Arc<dyn converge_domain::services::StepHandler>)
        .expect("register mock handler");

    let publisher = Arc::new(InProcessEventPublisher::new());
    let recorder = EventRecorder::attach(publisher.as_ref());

    let executor = StepExecutor::new(
        registry,
        Arc::clone(&publisher) as Arc<dyn EventPublisher>,
        Arc::new(NoOpMetrics::new()),
        Arc::new(NoOpTracer::new()),
        Arc::new(NoOpLogger::new()),
    );

    Harness {
        handler,
        recorder,
        executor,
    }
}

fn plan_for(pipeline: &converge_domain::entities::Pipeline) -> converge_domain::value_objects::ExecutionPlan {
    let ctx = ExecutionContext::new();
    let plan = ExecutionPlanner::new()
        .build(&ctx, pipeline.steps())
        .expect("plan must build");
    plan.validate(pipeline).expect("plan must validate");
    plan
}

#[tokio::test]
async fn test_linear_chain_runs_in_dependency_order() {
    let h = harness(MockHandler::drifted(StepType::Command));
    let p = pipeline(
        "chain",
        vec![step("a", &[]), step("b", &["a"]), step("c", &["b"])],
        Settings::default(),
    );
    let plan = plan_for(&p);
    let ctx = ExecutionContext::new();

    let outcome = h.executor.execute(&ctx, &plan, &p).await.unwrap();
    assert!(outcome.is_success());

    let results = outcome.results();
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.status() == StepStatus::Success && r.changed()));

    // Dependency order is observable in apply completion order.
    assert_eq!(h.handler.applied_order(), vec!["a", "b", "c"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallelism_is_bounded_by_settings() {
    let h = harness(MockHandler::drifted(StepType::Command).with_apply_delay(Duration::from_millis(40)));
    let p = pipeline(
        "wide",
        vec![
            step("w1", &[]),
            step("w2", &[]),
            step("w3", &[]),
            step("w4", &[]),
            step("w5", &[]),
            step("w6", &[]),
        ],
        Settings::new().with_parallel(2),
    );
    let plan = plan_for(&p);
    let ctx = ExecutionContext::new();

    let outcome = h.executor.execute(&ctx, &plan, &p).await.unwrap();
    assert!(outcome.is_success());
    assert_eq!(outcome.results().len(), 6);
    assert!(
        h.handler.max_active() <= 2,
        "at most 2 concurrent applies allowed, saw {}",
        h.handler.max_active()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_executor_override_wins_over_settings() {
    let handler = MockHandler::drifted(StepType::Command).with_apply_delay(Duration::from_millis(40));
    let h = harness(handler);
    let p = pipeline(
        "override",
        vec![step("w1", &[]), step("w2", &[]), step("w3", &[]), step("w4", &[])],
        Settings::new().with_parallel(4),
    );
    let plan = plan_for(&p);
    let ctx = ExecutionContext::new();

    let executor = h.executor.with_parallelism(1);
    let outcome = executor.execute(&ctx, &plan, &p).await.unwrap();
    assert!(outcome.is_success());
    assert_eq!(h.handler.max_active(), 1);
}

#[tokio::test]
async fn test_diamond_with_bounded_parallelism() {
    let h = harness(MockHandler::drifted(StepType::Command).with_apply_delay(Duration::from_millis(20)));
    let p = pipeline(
        "diamond",
        vec![
            step("a", &[]),
            step("b", &["a"]),
            step("c", &["a"]),
            step("d", &["b", "c"]),
        ],
        Settings::new().with_parallel(2),
    );
    let plan = plan_for(&p);
    let ctx = ExecutionContext::new();

    let outcome = h.executor.execute(&ctx, &plan, &p).await.unwrap();
    assert!(outcome.is_success());
    assert!(h.handler.max_active() <= 2);

    // d settles last, a settles first; b and c are unordered between them.
    let order = h.handler.applied_order();
    assert_eq!(order.first().map(String::as_str), Some("a"));
    assert_eq!(order.last().map(String::as_str), Some("d"));
}

#[tokio::test]
async fn test_idempotent_rerun_skips_every_step() {
    let h = harness(MockHandler::satisfied(StepType::Command));
    let p = pipeline(
        "steady",
        vec![step("a", &[]), step("b", &["a"])],
        Settings::default(),
    );
    let plan = plan_for(&p);
    let ctx = ExecutionContext::new();

    let outcome = h.executor.execute(&ctx, &plan, &p).await.unwrap();
    assert!(outcome.is_success());
    assert!(outcome
        .results()
        .iter()
        .all(|r| r.status() == StepStatus::AlreadySatisfied && !r.changed()));
    assert_eq!(outcome.changed_count(), 0);

    // Apply is never called when evaluation reports no drift.
    assert_eq!(h.handler.apply_calls(), 0);
    assert_eq!(h.handler.evaluate_calls(), 2);
    assert_eq!(h.recorder.count(EventType::StepSkipped), 2);
    assert_eq!(h.recorder.count(EventType::StepCompleted), 0);
}

#[tokio::test]
async fn test_dry_run_never_applies() {
    let h = harness(MockHandler::drifted(StepType::Command).with_satisfied_step("b"));
    let p = pipeline(
        "rehearsal",
        vec![step("a", &[]), step("b", &["a"])],
        Settings::new().with_dry_run(true),
    );
    let plan = plan_for(&p);
    let ctx = ExecutionContext::new();

    let outcome = h.executor.execute(&ctx, &plan, &p).await.unwrap();
    assert!(outcome.is_success());
    assert_eq!(h.handler.apply_calls(), 0);

    // Drifted step synthesizes success/changed; satisfied step stays
    // already_satisfied.
    let results = outcome.results();
    assert_eq!(results[0].status(), StepStatus::Success);
    assert!(results[0].changed());
    assert_eq!(results[1].status(), StepStatus::AlreadySatisfied);

    // Drift is announced as a completion carrying the dry-run flag.
    let completed = h
        .recorder
        .events()
        .into_iter()
        .find_map(|event| match event {
            converge_domain::PipelineEvent::StepCompleted(payload) => Some(payload),
            _ => None,
        })
        .expect("one step.completed expected");
    assert!(completed.dry_run);
    assert_eq!(completed.step_id, "a");
}

#[tokio::test]
async fn test_fail_fast_stops_before_next_level() {
    let h = harness(MockHandler::drifted(StepType::Command).with_failing_step("b"));
    let p = pipeline(
        "failfast",
        vec![
            step("a", &[]),
            step("b", &["a"]),
            step("c", &["a"]),
            step("d", &["b", "c"]),
        ],
        Settings::default(),
    );
    let plan = plan_for(&p);
    let ctx = ExecutionContext::new();

    let outcome = h.executor.execute(&ctx, &plan, &p).await.unwrap();
    assert!(!outcome.is_success());

    let error = outcome.first_error().expect("b's failure is returned");
    assert_eq!(error.code(), ErrorCode::Execution);
    assert!(error.message().contains('b'));

    // The failing level still settles fully, but level 2 never starts.
    let ids: Vec<&str> = outcome.results().iter().map(|r| r.step_id()).collect();
    assert!(ids.contains(&"a") && ids.contains(&"b"));
    assert!(!ids.contains(&"d"), "no level-2 step may run after a failure");

    let b_result = outcome.results().iter().find(|r| r.step_id() == "b").unwrap();
    assert_eq!(b_result.status(), StepStatus::Failure);
    assert!(b_result.error().is_some());
}

#[tokio::test]
async fn test_continue_on_error_finishes_all_levels() {
    let h = harness(MockHandler::drifted(StepType::Command).with_failing_step("b"));
    let p = pipeline(
        "keepgoing",
        vec![
            step("a", &[]),
            step("b", &["a"]),
            step("c", &["a"]),
            step("d", &["c"]),
        ],
        Settings::new().with_continue_on_error(true),
    );
    let plan = plan_for(&p);
    let ctx = ExecutionContext::new();

    let outcome = h.executor.execute(&ctx, &plan, &p).await.unwrap();

    // Every scheduled step has a result, and the first error is still b's.
    assert_eq!(outcome.results().len(), 4);
    let error = outcome.first_error().expect("first error is preserved");
    assert!(error.message().contains('b'));

    let d_result = outcome.results().iter().find(|r| r.step_id() == "d").unwrap();
    assert_eq!(d_result.status(), StepStatus::Success);
}

#[tokio::test]
async fn test_evaluate_failure_is_a_step_failure() {
    let h = harness(MockHandler::drifted(StepType::Command).with_evaluate_failing_step("a"));
    let p = pipeline("evalfail", vec![step("a", &[])], Settings::default());
    let plan = plan_for(&p);
    let ctx = ExecutionContext::new();

    let outcome = h.executor.execute(&ctx, &plan, &p).await.unwrap();
    assert!(!outcome.is_success());
    assert_eq!(outcome.results()[0].status(), StepStatus::Failure);
    assert_eq!(h.handler.apply_calls(), 0);
    assert_eq!(h.recorder.count(EventType::StepFailed), 1);
}

#[tokio::test]
async fn test_missing_handler_is_not_found_failure() {
    let h = harness(MockHandler::drifted(StepType::Command));
    // The template type has no registered handler in this harness.
    let template_step = converge_domain::entities::Step::new("render", StepType::Template)
        .with_config_entry("template", "x");
    let p = pipeline("nohandler", vec![template_step], Settings::default());
    let plan = plan_for(&p);
    let ctx = ExecutionContext::new();

    let outcome = h.executor.execute(&ctx, &plan, &p).await.unwrap();
    assert!(!outcome.is_success());
    let result = &outcome.results()[0];
    assert_eq!(result.status(), StepStatus::Failure);
    assert_eq!(result.error().unwrap().code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn test_cancelled_before_execute_invokes_no_handler() {
    let h = harness(MockHandler::drifted(StepType::Command));
    let p = pipeline("cancelled", vec![step("a", &[])], Settings::default());
    let plan = plan_for(&p);
    let ctx = ExecutionContext::new();
    ctx.cancel();

    let err = h.executor.execute(&ctx, &plan, &p).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Cancelled);
    assert_eq!(h.handler.evaluate_calls(), 0);
    assert_eq!(h.handler.apply_calls(), 0);
}

#[tokio::test]
async fn test_step_event_sequence() {
    let h = harness(MockHandler::drifted(StepType::Command));
    let p = pipeline("events", vec![step("a", &[])], Settings::default());
    let plan = plan_for(&p);
    let ctx = ExecutionContext::new();

    h.executor.execute(&ctx, &plan, &p).await.unwrap();

    assert_eq!(
        h.recorder.step_event_types("a"),
        vec![EventType::StepStarted, EventType::StepCompleted]
    );

    // Payload identity fields ride along on every step event.
    for event in h.recorder.events() {
        if let converge_domain::PipelineEvent::StepStarted(payload) = event {
            assert_eq!(payload.pipeline, "events");
            assert_eq!(payload.step_type, StepType::Command);
            assert_eq!(payload.correlation_id, ctx.correlation_id());
        }
    }
}

#[tokio::test]
async fn test_failed_step_event_sequence() {
    let h = harness(MockHandler::drifted(StepType::Command).with_failing_step("a"));
    let p = pipeline("events", vec![step("a", &[])], Settings::default());
    let plan = plan_for(&p);
    let ctx = ExecutionContext::new();

    h.executor.execute(&ctx, &plan, &p).await.unwrap();

    assert_eq!(
        h.recorder.step_event_types("a"),
        vec![EventType::StepStarted, EventType::StepFailed]
    );
}

#[tokio::test]
async fn test_verify_reports_drift_in_declared_order() {
    let h = harness(
        MockHandler::drifted(StepType::Command)
            .with_satisfied_step("b")
            .with_evaluate_failing_step("c"),
    );
    let p = pipeline(
        "verify",
        vec![step("a", &[]), step("b", &["a"]), step("c", &["b"])],
        Settings::default(),
    );
    let ctx = ExecutionContext::new();

    let report = h.executor.verify(&ctx, &p).await.unwrap();

    assert_eq!(report.len(), 3);
    assert_eq!(report[0].step_id(), "a");
    assert_eq!(report[0].status(), VerificationStatus::Failed);
    assert_eq!(report[0].detail("reason"), Some("drifted"));
    assert_eq!(report[0].detail("current_state"), Some("mock current"));

    assert_eq!(report[1].step_id(), "b");
    assert_eq!(report[1].status(), VerificationStatus::Satisfied);

    assert_eq!(report[2].step_id(), "c");
    assert_eq!(report[2].status(), VerificationStatus::Failed);
    assert_eq!(report[2].detail("reason"), Some("unknown"));

    // Verify never applies.
    assert_eq!(h.handler.apply_calls(), 0);
}

#[tokio::test]
async fn test_verify_honors_cancellation() {
    let h = harness(MockHandler::drifted(StepType::Command));
    let p = pipeline("verify", vec![step("a", &[])], Settings::default());
    let ctx = ExecutionContext::new();
    ctx.cancel();

    let err = h.executor.verify(&ctx, &p).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Cancelled);
    assert_eq!(h.handler.evaluate_calls(), 0);
}
