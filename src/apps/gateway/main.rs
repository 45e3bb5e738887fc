//! LLM gateway main entry point
//! LLM网关主入口点

use clap::Parser;
use llm_gateway::adapter::load_adapter;
use llm_gateway::config::{init_tracing, shutdown_tracing};
use llm_gateway::gateway::config::{AppConfig, CliArgs, PORT_ENV};
use llm_gateway::gateway::{GatewayError, HttpGateway};

use std::process::ExitCode;
use std::sync::Arc;

fn main() -> Result<ExitCode, Box<dyn std::error::Error + Send + Sync>> {
    let args = CliArgs::parse();
    let log_args = format!("{:?}", args);

    let app_cfg = AppConfig::load_with_cli(&args)?;

    init_tracing(&app_cfg.logging.to_logging_config())?;

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(n) = app_cfg.runtime.worker_threads {
        builder.worker_threads(n);
    }
    let runtime = builder.build()?;

    let result = runtime.block_on(run(log_args, app_cfg));
    drop(runtime);
    shutdown_tracing();
    result
}

async fn run(
    log_args: String,
    app_cfg: AppConfig,
) -> Result<ExitCode, Box<dyn std::error::Error + Send + Sync>> {
    let config = Arc::new(app_cfg);

    tracing::info!("Starting LLM gateway with args: {}", log_args);
    tracing::info!("LLM gateway starting with:");
    tracing::info!("  - HTTP gateway on: {}", config.http.server.display_addr());
    tracing::info!("  - Port attempts: {}", config.http.max_port_attempts);
    tracing::info!("  - Backend module: {}", config.backend.module_path.display());
    tracing::info!("  - Fail soft: {}", config.backend.fail_soft);

    let adapter = load_adapter(&config.backend, config.config_dir.as_deref());
    let http_gateway = HttpGateway::new(config.clone(), adapter);

    let result = http_gateway
        .start_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            tracing::info!("LLM gateway shutting down");
        })
        .await;

    match result {
        Ok(()) => {
            tracing::info!("LLM gateway shutdown complete");
            Ok(ExitCode::SUCCESS)
        }
        Err(e @ GatewayError::PortsExhausted { .. }) => {
            tracing::error!("{}", e);
            tracing::error!(
                "Please specify an available port by setting the {} environment variable.",
                PORT_ENV
            );
            Ok(ExitCode::from(1))
        }
        Err(e) => {
            tracing::error!("HTTP gateway error: {}", e);
            Err(e.into())
        }
    }
}
