use clap::Parser;
use gpm_bridge::utils::error::ErrorCategory;
use gpm_bridge::utils::{logger, validation::Validate};
use gpm_bridge::{run_http, CliConfig, GatewayError, GpmClient, GpmSettings, LogFormat};
use std::sync::Arc;

fn exit_with(e: &GatewayError) -> ! {
    tracing::error!("❌ Startup failed: {} (Category: {:?})", e, e.category());
    tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e);

    let exit_code = match e.category() {
        ErrorCategory::Configuration => 2,
        ErrorCategory::Upstream => 3,
        ErrorCategory::Validation | ErrorCategory::Internal => 1,
    };
    std::process::exit(exit_code);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    match config.log_format {
        LogFormat::Compact => logger::init_cli_logger(config.verbose),
        LogFormat::Json => logger::init_json_logger(config.verbose),
    }

    tracing::info!("Starting gpm-bridge {}", env!("CARGO_PKG_VERSION"));
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // Credentials must be present before anything is served.
    let settings = match GpmSettings::from_env().and_then(|s| s.validate().map(|_| s)) {
        Ok(settings) => settings,
        Err(e) => exit_with(&e),
    };
    tracing::info!(
        "Using GPM+ server '{}' with credentials from {:?}",
        settings.server_name,
        settings.credential_source
    );

    let client = match GpmClient::connect(&settings).await {
        Ok(client) => client,
        Err(e) => exit_with(&e),
    };

    run_http(Arc::new(client), &config.bind_addr()).await
}
