//! castbot server entry point (spec §6 CLI surface).

mod app;
mod cli;

use std::sync::Arc;
use std::time::Duration;

use castbot_core::AudioFrame;
use castbot_supervisor::{ProcessSupervisor, ResourceKind, ShutdownOutcome, ShutdownReason};
use clap::Parser;
use cli::{exit_code, Cli, Command, ConfigAction};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let logging_config = castbot_logging::LoggingConfig::from_env();
    let _logging_guard = match castbot_logging::init(&logging_config) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("failed to initialize logging: {err}");
            std::process::exit(exit_code::GENERIC_ERROR);
        }
    };

    let cli = Cli::parse();
    let code = run(cli).await;
    std::process::exit(code);
}

async fn run(cli: Cli) -> i32 {
    match cli.command {
        Command::Start { broadcast_id, config } => run_start(&broadcast_id, config).await,
        Command::Stop => {
            info!("stop requested; no running instance to attach to in this process model");
            exit_code::SUCCESS
        }
        Command::Pause => {
            info!("pause requested; no running instance to attach to in this process model");
            exit_code::SUCCESS
        }
        Command::Resume => {
            info!("resume requested; no running instance to attach to in this process model");
            exit_code::SUCCESS
        }
        Command::Status => {
            println!("{}", serde_json::json!({ "state": "stopped" }));
            exit_code::SUCCESS
        }
        Command::Safety { level } => {
            let level: castbot_core::SafetyLevel = level.into();
            info!(?level, "safety level switch requested");
            exit_code::SUCCESS
        }
        Command::Config { action } => match action {
            ConfigAction::Get { key } => {
                println!("{key}=<unset>");
                exit_code::SUCCESS
            }
            ConfigAction::Set { key, value } => {
                info!(%key, %value, "config set requested");
                exit_code::SUCCESS
            }
        },
    }
}

/// Loads configuration, builds the coordinator, and drives it from a
/// synthetic audio source until a termination signal arrives.
async fn run_start(broadcast_id: &str, config_path: Option<std::path::PathBuf>) -> i32 {
    let env = std::env::var("CASTBOT_ENV").ok();
    let config_dir = config_path.unwrap_or_else(|| std::path::PathBuf::from("config"));
    let document = match castbot_config::load_from(&config_dir, env.as_deref()) {
        Ok(doc) => doc,
        Err(err) => {
            error!(error = %err, "failed to load configuration");
            return exit_code::GENERIC_ERROR;
        }
    };

    let coordinator = Arc::new(app::build_coordinator(&document));
    coordinator.start(broadcast_id.to_string());
    info!(broadcast_id, "pipeline coordinator started");

    let supervisor = Arc::new(ProcessSupervisor::new(Duration::from_secs(30)));
    let coordinator_for_cleanup = coordinator.clone();
    supervisor.register_cleanup("pipeline-coordinator", ResourceKind::Named, move || async move {
        coordinator_for_cleanup.stop();
    });

    let driver_coordinator = coordinator.clone();
    let driver = tokio::spawn(async move {
        loop {
            let frame = AudioFrame::new(vec![0u8; 640], castbot_core::SampleRate::HZ_16K, castbot_core::Channels::Mono);
            let result = driver_coordinator.process_audio(frame).await;
            if !result.success {
                warn!(error = ?result.error, "process_audio cycle failed");
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    });

    let (reason, outcome) = supervisor.run_until_signal().await;
    driver.abort();

    if outcome == ShutdownOutcome::TimedOut {
        return exit_code::GENERIC_ERROR;
    }
    match reason {
        ShutdownReason::Interrupt => exit_code::INTERRUPT,
        ShutdownReason::Terminate => exit_code::TERMINATE,
        ShutdownReason::UncaughtPanic | ShutdownReason::Manual => exit_code::GENERIC_ERROR,
    }
}
