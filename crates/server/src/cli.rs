//! CLI surface (spec §6): `start/stop/pause/resume/status/safety/config`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "castbot", version, about = "Broadcast chat copilot engine", disable_version_flag = true)]
pub struct Cli {
    /// Prints version information and exits (spec §6: `--version|-v`).
    /// clap's derive `version` only wires up `-V`/`--version`; the spec
    /// requires lowercase `-v` too, so the automatic flag is disabled
    /// and this one is added explicitly with both spellings.
    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    version: (),

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Starts the pipeline for a broadcast and blocks until shutdown.
    Start {
        broadcast_id: String,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Requests the running pipeline to stop.
    Stop,
    /// Requests the running pipeline to pause dispatch.
    Pause,
    /// Requests the running pipeline to resume dispatch.
    Resume,
    /// Reports current lifecycle state and queue depth.
    Status,
    /// Switches the safety level.
    Safety {
        #[arg(value_enum)]
        level: SafetyLevelArg,
    },
    /// Reads or writes a configuration value.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    Get { key: String },
    Set { key: String, value: String },
}

#[derive(clap::ValueEnum, Debug, Clone, Copy)]
pub enum SafetyLevelArg {
    Strict,
    Standard,
    Relaxed,
}

impl From<SafetyLevelArg> for castbot_core::SafetyLevel {
    fn from(level: SafetyLevelArg) -> Self {
        match level {
            SafetyLevelArg::Strict => castbot_core::SafetyLevel::Strict,
            SafetyLevelArg::Standard => castbot_core::SafetyLevel::Standard,
            SafetyLevelArg::Relaxed => castbot_core::SafetyLevel::Relaxed,
        }
    }
}

/// Exit codes per spec §6.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERIC_ERROR: i32 = 1;
    pub const INTERRUPT: i32 = 130;
    pub const TERMINATE: i32 = 143;
}
