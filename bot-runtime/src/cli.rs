//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

use crate::config::CliOverrides;

#[derive(Parser, Debug)]
#[command(name = "ow-notifier")]
#[command(about = "Forwards Overwatch alerts to a Telegram chat", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, value_name = "FILE", env = "CONF_FILE")]
    pub conf: Option<PathBuf>,

    /// Bind host for the webhook server.
    #[arg(long)]
    pub host: Option<String>,

    /// Bind port for the webhook server.
    #[arg(long)]
    pub port: Option<u16>,

    /// Enable development mode (exposes /current-alerts).
    #[arg(long)]
    pub dev: bool,

    /// Log at debug level unless RUST_LOG is set.
    #[arg(short, long)]
    pub verbose: bool,

    /// Also append logs to this file.
    #[arg(long, value_name = "FILE", env = "LOG_FILE")]
    pub log_file: Option<String>,
}

impl Cli {
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            host: self.host.clone(),
            port: self.port,
            development_mode: self.dev,
        }
    }

    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}
