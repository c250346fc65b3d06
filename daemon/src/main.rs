//! verigate daemon: entry point for replaying verification scenarios.

mod replay;
mod script;

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use verigate_installer::{InstallerConfig, VerificationService};
use verigate_types::ResponseCode;
use verigate_utils::LogFormat;

#[derive(Parser)]
#[command(name = "verigate-daemon", about = "Package verification consensus daemon")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "VERIGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "VERIGATE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "VERIGATE_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Verification timeout in milliseconds.
    #[arg(long, env = "VERIGATE_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// Response recorded for silent required verifiers on timeout:
    /// "allow", "reject", or a raw code.
    #[arg(long, env = "VERIGATE_DEFAULT_RESPONSE", allow_hyphen_values = true)]
    default_response: Option<ResponseCode>,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Replay a scripted verification scenario and print each session's verdict.
    Replay {
        /// TOML script describing sessions, verifiers and timed responses.
        script: PathBuf,

        /// How often overdue sessions are expired, in milliseconds.
        #[arg(long, default_value_t = 25)]
        tick_ms: u64,

        /// Also print every verification event as a JSON line.
        #[arg(long)]
        events: bool,
    },
    /// Print the effective configuration as TOML.
    PrintConfig,
}

fn load_config(cli: &Cli) -> anyhow::Result<InstallerConfig> {
    let base = match cli.config {
        Some(ref path) => InstallerConfig::from_toml_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => InstallerConfig::default(),
    };

    let config = InstallerConfig {
        verification_timeout_ms: cli.timeout_ms.unwrap_or(base.verification_timeout_ms),
        default_timeout_response: cli.default_response.unwrap_or(base.default_timeout_response),
        log_format: cli.log_format.unwrap_or(base.log_format),
        log_level: cli.log_level.clone().unwrap_or_else(|| base.log_level.clone()),
        ..base
    };
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    if !verigate_utils::init_logging(config.log_format, &config.log_level) {
        tracing::warn!(
            format = %config.log_format,
            level = %config.log_level,
            "logging already initialised; keeping existing subscriber"
        );
    }
    if let Some(ref path) = cli.config {
        tracing::info!("Loaded config from {}", path.display());
    }

    match cli.command {
        Command::PrintConfig => {
            print!("{}", config.to_toml_string()?);
        }
        Command::Replay {
            script,
            tick_ms,
            events,
        } => {
            let script = script::Script::from_file(&script)?;
            tracing::info!(
                sessions = script.sessions.len(),
                timeout_ms = config.verification_timeout_ms,
                "replaying verification script"
            );

            let service = Arc::new(VerificationService::new(config));
            let options = replay::ReplayOptions {
                tick: Duration::from_millis(tick_ms.max(1)),
                print_events: events,
            };
            let summaries = replay::run(Arc::clone(&service), script, options).await?;
            for summary in &summaries {
                println!("{}", serde_json::to_string(summary)?);
            }

            tracing::info!(stats = ?service.stats(), "replay finished");
        }
    }

    Ok(())
}
