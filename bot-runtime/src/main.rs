use anyhow::Result;
use bot_runtime::{run_bot, shutdown_signal, Cli, Config};
use clap::Parser;
use notifier_core::init_tracing;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_level(), cli.log_file.as_deref())?;

    let path = Config::resolve_path(cli.conf.as_deref());
    let config = match Config::load(&path, &cli.overrides()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            return Err(e.into());
        }
    };
    info!(config = ?config, "Configuration loaded");

    match run_bot(config, shutdown_signal()).await {
        Ok(summary) => {
            info!(
                handled = summary.handled,
                failed = summary.failed,
                timed_out = summary.timed_out,
                "Notifier stopped"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Notifier failed");
            Err(e.into())
        }
    }
}
