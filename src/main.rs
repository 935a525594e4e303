use std::process::ExitCode;
use std::sync::Arc;

use osp_harness::config::HarnessConfig;
use osp_harness::context::RunContext;
use osp_harness::fixture::discover_sources;
use osp_harness::orchestrator::Orchestrator;
use osp_harness::progress::ConsoleProgress;
use osp_harness::verifier::HttpVerifier;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "osp_harness=info".into()),
        )
        .init();

    let config = match HarnessConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let sources = match discover_sources(&config.fixtures_dir) {
        Ok(sources) => sources,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let verifier = match HttpVerifier::new(config.prover_url.as_str(), config.prover_timeout) {
        Ok(verifier) => verifier,
        Err(e) => {
            tracing::error!("Failed to create prover client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        "Verifying {} fixture sets from {} against {} (parallel={})",
        sources.len(),
        config.fixtures_dir.display(),
        verifier.base_url(),
        config.parallel
    );

    // Message injection happens outside this process, so the gate starts open.
    let mut ctx = RunContext::new(Arc::new(verifier), config.parallel);
    if config.progress {
        ctx = ctx.with_progress(Arc::new(ConsoleProgress));
    }

    let summary = Orchestrator::new(ctx).run_all(&sources).await;
    summary.log();

    if summary.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
