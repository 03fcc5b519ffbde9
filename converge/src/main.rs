// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Binary entry point: parse the CLI, install observability, assemble the
//! registry and executor, bridge OS signals into cooperative cancellation,
//! and dispatch onto the use cases. Exit codes map from the engine's error
//! taxonomy so scripts can route on outcomes.

use converge::application::use_cases::{
    ApplyOptions, ApplyPipelineUseCase, PreparePipelineUseCase, VerifyPipelineUseCase,
};
use converge::infrastructure::config::YamlConfigLoader;
use converge::infrastructure::events::InProcessEventPublisher;
use converge::infrastructure::handlers::{CommandHandler, CopyHandler, LineInFileHandler, SymlinkHandler};
use converge::infrastructure::logging::{TracingLogger, TracingTracer};
use converge::infrastructure::metrics::ExecutionMetrics;
use converge::infrastructure::registry::PluginRegistry;
use converge::infrastructure::runtime::StepExecutor;
use converge::infrastructure::validation::SystemValidationService;
use converge::presentation::ProgressRenderer;
use converge_bootstrap::{init_tracing, parse_cli, wait_for_shutdown_signal, Commands, ExitCode};
use converge_domain::context::ExecutionContext;
use converge_domain::error::DomainError;
use converge_domain::services::{
    ConfigLoader, EventPublisher, Logger, MetricsPort, PipelineExecutor, Tracer, ValidationService,
};
use std::path::Path;
use std::sync::Arc;

fn build_registry() -> Result<Arc<PluginRegistry>, DomainError> {
    let registry = Arc::new(PluginRegistry::new());
    registry.register(Arc::new(CommandHandler::new()))?;
    registry.register(Arc::new(CopyHandler::new()))?;
    registry.register(Arc::new(SymlinkHandler::new()))?;
    registry.register(Arc::new(LineInFileHandler::new()))?;
    registry.validate_dependencies()?;
    registry.initialize_plugins()?;
    Ok(registry)
}

async fn run(ctx: &ExecutionContext, command: Commands) -> Result<(), DomainError> {
    let registry = build_registry()?;
    let publisher: Arc<dyn EventPublisher> = Arc::new(InProcessEventPublisher::new());
    let metrics: Arc<dyn MetricsPort> = Arc::new(ExecutionMetrics::new()?);
    let tracer: Arc<dyn Tracer> = Arc::new(TracingTracer::new());
    let logger: Arc<dyn Logger> = Arc::new(TracingLogger::new());
    let loader: Arc<dyn ConfigLoader> = Arc::new(YamlConfigLoader::new());
    let validator: Arc<dyn ValidationService> = Arc::new(SystemValidationService::new());

    match command {
        Commands::Apply {
            config,
            dry_run,
            continue_on_error,
            parallel,
        } => {
            let mut executor = StepExecutor::new(
                Arc::clone(&registry),
                Arc::clone(&publisher),
                Arc::clone(&metrics),
                Arc::clone(&tracer),
                Arc::clone(&logger),
            );
            if let Some(parallel) = parallel {
                executor = executor.with_parallelism(parallel);
            }
            let executor: Arc<dyn PipelineExecutor> = Arc::new(executor);

            let prepare = PreparePipelineUseCase::new(
                Arc::clone(&loader),
                Arc::clone(&publisher),
                Arc::clone(&logger),
            );
            let apply = ApplyPipelineUseCase::new(
                prepare,
                executor,
                Arc::clone(&validator),
                Arc::clone(&publisher),
                Arc::clone(&logger),
            );

            let renderer = ProgressRenderer::attach(Arc::clone(&publisher));
            let options = ApplyOptions::new()
                .with_dry_run(dry_run)
                .with_continue_on_error(continue_on_error);
            let report = apply.execute(ctx, &config, options).await;
            renderer.detach();

            render_apply_report(&config, &report);
            match report.error() {
                None => Ok(()),
                Some(error) => Err(error.clone()),
            }
        }

        Commands::Plan { config } => {
            let prepare = PreparePipelineUseCase::new(
                Arc::clone(&loader),
                Arc::clone(&publisher),
                Arc::clone(&logger),
            );
            let prepared = prepare.execute(ctx, &config).await?;

            println!(
                "{}: {} steps in {} levels",
                prepared.pipeline().name(),
                prepared.plan().step_count(),
                prepared.plan().levels().len()
            );
            for level in prepared.plan().levels() {
                println!("  level {}: {}", level.index(), level.step_ids().join(", "));
            }
            Ok(())
        }

        Commands::Verify { config } => {
            let executor: Arc<dyn PipelineExecutor> = Arc::new(StepExecutor::new(
                Arc::clone(&registry),
                Arc::clone(&publisher),
                Arc::clone(&metrics),
                Arc::clone(&tracer),
                Arc::clone(&logger),
            ));
            let prepare = PreparePipelineUseCase::new(
                Arc::clone(&loader),
                Arc::clone(&publisher),
                Arc::clone(&logger),
            );
            let verify = VerifyPipelineUseCase::new(prepare, executor, Arc::clone(&publisher), Arc::clone(&logger));

            let summary = verify.execute(ctx, &config).await?;
            for result in summary.results() {
                println!("  [{}] {} - {}", result.status(), result.step_id(), result.message());
            }
            println!(
                "{} satisfied, {} drifted/failed, {} unknown",
                summary.passed(),
                summary.failed(),
                summary.unknown()
            );
            if summary.failed() > 0 {
                return Err(DomainError::validation(format!(
                    "{} of {} steps drifted or failed verification",
                    summary.failed(),
                    summary.total()
                ))
                .with_context("failed_checks", summary.failed().to_string()));
            }
            Ok(())
        }

        Commands::Validate { config } => {
            loader.validate(ctx, &config).await?;
            println!("{}: configuration is valid", config.display());
            Ok(())
        }
    }
}

fn render_apply_report(config: &Path, report: &converge::application::use_cases::ApplyReport) {
    let name = report
        .pipeline()
        .map(|pipeline| pipeline.name().to_string())
        .unwrap_or_else(|| config.display().to_string());

    println!();
    for result in report.results() {
        println!(
            "  [{}] {} ({} ms){}",
            result.status(),
            result.step_id(),
            result.duration_ms(),
            if result.message().is_empty() {
                String::new()
            } else {
                format!(" - {}", result.message())
            }
        );
    }
    if let Some(summary) = report.summary() {
        println!(
            "  validations: {} of {} passed",
            summary.passed(),
            summary.total()
        );
    }
    match report.error() {
        None => println!("{}: converged", name),
        Some(error) => println!("{}: failed - {}", name, error),
    }
}

#[tokio::main]
async fn main() {
    let cli = parse_cli();
    init_tracing(cli.verbose);

    // One correlation id per process invocation; every log line, event, and
    // span of this run carries it.
    let ctx = ExecutionContext::new();

    let signal_ctx = ctx.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        signal_ctx.cancel();
    });

    let exit = match run(&ctx, cli.command).await {
        Ok(()) => ExitCode::Success,
        Err(error) => {
            tracing::error!(correlation_id = %ctx.correlation_id(), "{}", error);
            ExitCode::from_error_code(error.code().as_str())
        }
    };

    std::process::exit(exit.code());
}
