// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! End-to-end use case tests: YAML on disk through prepare, execute,
//! validate, and the pipeline lifecycle event stream, with instrumented
//! handlers behind the registry.

mod common;

use common::{EventRecorder, MockHandler};
use converge::application::use_cases::{
    ApplyOptions, ApplyPipelineUseCase, PreparePipelineUseCase, VerifyPipelineUseCase,
};
use converge::infrastructure::config::YamlConfigLoader;
use converge::infrastructure::events::InProcessEventPublisher;
use converge::infrastructure::registry::PluginRegistry;
use converge::infrastructure::runtime::StepExecutor;
use converge::infrastructure::validation::SystemValidationService;
use converge_domain::context::ExecutionContext;
use converge_domain::entities::StepType;
use converge_domain::error::ErrorCode;
use converge_domain::events::EventType;
use converge_domain::services::{
    ConfigLoader, EventPublisher, Logger, NoOpLogger, NoOpMetrics, NoOpTracer, PipelineExecutor,
    StepHandler, ValidationService,
};
use std::io::Write;
use std::sync::Arc;

struct Stack {
    handler: Arc<MockHandler>,
    recorder: EventRecorder,
    prepare: PreparePipelineUseCase,
    apply: ApplyPipelineUseCase,
    verify: VerifyPipelineUseCase,
}

fn stack(handler: MockHandler) -> Stack {
    let handler = Arc::new(handler);
    let registry = Arc::new(PluginRegistry::new());
    registry
        .register(Arc::clone(&handler) as Arc<dyn StepHandler>)
        .expect("register mock handler");

    let publisher: Arc<dyn EventPublisher> = Arc::new(InProcessEventPublisher::new());
    let recorder = EventRecorder::attach(publisher.as_ref());
    let logger: Arc<dyn Logger> = Arc::new(NoOpLogger::new());
    let loader: Arc<dyn ConfigLoader> = Arc::new(YamlConfigLoader::new());
    let validator: Arc<dyn ValidationService> = Arc::new(SystemValidationService::new());

    let executor: Arc<dyn PipelineExecutor> = Arc::new(StepExecutor::new(
        registry,
        Arc::clone(&publisher),
        Arc::new(NoOpMetrics::new()),
        Arc::new(NoOpTracer::new()),
        Arc::clone(&logger),
    ));

    let prepare = PreparePipelineUseCase::new(Arc::clone(&loader), Arc::clone(&publisher), Arc::clone(&logger));
    let apply = ApplyPipelineUseCase::new(
        PreparePipelineUseCase::new(Arc::clone(&loader), Arc::clone(&publisher), Arc::clone(&logger)),
        Arc::clone(&executor),
        Arc::clone(&validator),
        Arc::clone(&publisher),
        Arc::clone(&logger),
    );
    let verify = VerifyPipelineUseCase::new(
        PreparePipelineUseCase::new(Arc::clone(&loader), Arc::clone(&publisher), Arc::clone(&logger)),
        Arc::clone(&executor),
        Arc::clone(&publisher),
        Arc::clone(&logger),
    );

    Stack {
        handler,
        recorder,
        prepare,
        apply,
        verify,
    }
}

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .expect("create temp config");
    file.write_all(contents.as_bytes()).expect("write temp config");
    file
}

#[tokio::test]
async fn test_prepare_produces_cross_validated_plan() {
    let stack = stack(MockHandler::drifted(StepType::Command));
    let file = write_config(
        r#"
name: workstation
steps:
  - id: tools
    type: command
    config: {command: "true"}
  - id: shell
    type: command
    depends_on: [tools]
    config: {command: "true"}
"#,
    );
    let ctx = ExecutionContext::new();

    let prepared = stack.prepare.execute(&ctx, file.path()).await.unwrap();
    assert_eq!(prepared.pipeline().name(), "workstation");
    assert_eq!(prepared.plan().levels().len(), 2);
    assert_eq!(prepared.plan().level_of("shell"), Some(1));
}

#[tokio::test]
async fn test_prepare_failure_publishes_prepare_phase_event() {
    let stack = stack(MockHandler::drifted(StepType::Command));
    let file = write_config(
        r#"
name: broken
steps:
  - id: a
    type: command
    depends_on: [ghost]
    config: {command: "true"}
"#,
    );
    let ctx = ExecutionContext::new();

    let err = stack.prepare.execute(&ctx, file.path()).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Dependency);

    let failed = stack
        .recorder
        .events()
        .into_iter()
        .find_map(|event| match event {
            converge_domain::PipelineEvent::PipelineFailed(payload) => Some(payload),
            _ => None,
        })
        .expect("pipeline.failed published");
    assert_eq!(failed.phase, "prepare");
}

#[tokio::test]
async fn test_apply_full_lifecycle_with_validations() {
    let stack = stack(MockHandler::drifted(StepType::Command));
    let marker = tempfile::NamedTempFile::new().unwrap();
    let file = write_config(&format!(
        r#"
name: lifecycle
steps:
  - id: a
    type: command
    config: {{command: "true"}}
  - id: b
    type: command
    depends_on: [a]
    config: {{command: "true"}}
validations:
  - type: file_exists
    config: {{path: "{}"}}
"#,
        marker.path().display()
    ));
    let ctx = ExecutionContext::new();

    let report = stack.apply.execute(&ctx, file.path(), ApplyOptions::new()).await;
    assert!(report.is_success(), "unexpected failure: {:?}", report.error());
    assert_eq!(report.results().len(), 2);
    assert_eq!(stack.handler.apply_calls(), 2);

    let summary = report.summary().expect("validations ran");
    assert_eq!(summary.passed(), 1);
    assert_eq!(summary.failed(), 0);

    let types = stack.recorder.event_types();
    assert_eq!(types.first(), Some(&EventType::PipelineStarted));
    assert_eq!(types.last(), Some(&EventType::PipelineCompleted));
    assert_eq!(stack.recorder.count(EventType::StepCompleted), 2);
    assert_eq!(stack.recorder.count(EventType::ValidationStarted), 1);
    assert_eq!(stack.recorder.count(EventType::ValidationCompleted), 1);

    // Correlation id stitches the whole run together.
    for event in stack.recorder.events() {
        assert_eq!(event.correlation_id(), ctx.correlation_id());
    }
}

#[tokio::test]
async fn test_apply_with_failing_validation_reports_failed_checks() {
    let stack = stack(MockHandler::drifted(StepType::Command));
    let file = write_config(
        r#"
name: validated
steps:
  - id: a
    type: command
    config: {command: "true"}
validations:
  - type: file_exists
    config: {path: "/definitely/not/present"}
"#,
    );
    let ctx = ExecutionContext::new();

    let report = stack.apply.execute(&ctx, file.path(), ApplyOptions::new()).await;
    assert!(!report.is_success());

    let error = report.error().unwrap();
    assert_eq!(error.code(), ErrorCode::Validation);
    assert_eq!(error.context_value("failed_checks"), Some("1"));

    let summary = report.summary().expect("summary present even on failure");
    assert_eq!(summary.failed(), 1);

    assert_eq!(stack.recorder.count(EventType::ValidationFailed), 1);
    let failed = stack
        .recorder
        .events()
        .into_iter()
        .find_map(|event| match event {
            converge_domain::PipelineEvent::PipelineFailed(payload) => Some(payload),
            _ => None,
        })
        .expect("pipeline.failed published");
    assert_eq!(failed.phase, "validate");
}

#[tokio::test]
async fn test_apply_dry_run_skips_validations_and_applies() {
    let stack = stack(MockHandler::drifted(StepType::Command));
    let file = write_config(
        r#"
name: rehearsal
steps:
  - id: a
    type: command
    config: {command: "true"}
validations:
  - type: file_exists
    config: {path: "/definitely/not/present"}
"#,
    );
    let ctx = ExecutionContext::new();

    let options = ApplyOptions::new().with_dry_run(true);
    let report = stack.apply.execute(&ctx, file.path(), options).await;

    assert!(report.is_success());
    assert_eq!(stack.handler.apply_calls(), 0);
    assert!(report.summary().is_none(), "dry-run must not run validations");
    assert_eq!(stack.recorder.count(EventType::ValidationStarted), 0);
}

#[tokio::test]
async fn test_apply_failure_still_returns_partial_results() {
    let stack = stack(MockHandler::drifted(StepType::Command).with_failing_step("b"));
    let file = write_config(
        r#"
name: partial
steps:
  - id: a
    type: command
    config: {command: "true"}
  - id: b
    type: command
    depends_on: [a]
    config: {command: "true"}
  - id: c
    type: command
    depends_on: [b]
    config: {command: "true"}
"#,
    );
    let ctx = ExecutionContext::new();

    let report = stack.apply.execute(&ctx, file.path(), ApplyOptions::new()).await;
    assert!(!report.is_success());
    assert!(report.pipeline().is_some());

    let ids: Vec<&str> = report.results().iter().map(|result| result.step_id()).collect();
    assert!(ids.contains(&"a") && ids.contains(&"b"));
    assert!(!ids.contains(&"c"));

    let failed = stack
        .recorder
        .events()
        .into_iter()
        .find_map(|event| match event {
            converge_domain::PipelineEvent::PipelineFailed(payload) => Some(payload),
            _ => None,
        })
        .expect("pipeline.failed published");
    assert_eq!(failed.phase, "execute");
    assert!(failed.error.contains('b'));
}

#[tokio::test]
async fn test_verify_use_case_summarizes_drift() {
    let stack = stack(MockHandler::drifted(StepType::Command).with_satisfied_step("b"));
    let file = write_config(
        r#"
name: driftcheck
steps:
  - id: a
    type: command
    config: {command: "true"}
  - id: b
    type: command
    config: {command: "true"}
"#,
    );
    let ctx = ExecutionContext::new();

    let summary = stack.verify.execute(&ctx, file.path()).await.unwrap();
    assert_eq!(summary.total(), 2);
    assert_eq!(summary.passed(), 1);
    assert_eq!(summary.failed(), 1);

    // Verification never applies, and the outcome is announced.
    assert_eq!(stack.handler.apply_calls(), 0);
    assert_eq!(stack.recorder.count(EventType::ValidationFailed), 1);
}
