//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use nezha_core::{
    DistanceUnit, LinearDirection, MotorConnector, MovementMode, ServoMovementMode,
    TurnDirection,
};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "nezha", version, about = "NeZha V2 motor board CLI")]
pub struct Cli {
    /// Path to config TOML; built-in defaults when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print results and errors as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging].level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Simulator only: fail the next N bus writes
    #[arg(long, value_name = "N", hide = true)]
    pub sim_fail_writes: Option<usize>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a motor continuously
    Run {
        motor: MotorConnector,
        /// -100..=100; negative runs counter-clockwise
        #[arg(long, allow_negative_numbers = true)]
        speed: i32,
    },
    /// Run a motor for a number of turns, degrees or seconds
    RunFor {
        motor: MotorConnector,
        #[arg(long, allow_negative_numbers = true)]
        speed: i32,
        #[arg(long)]
        value: f32,
        /// turns | degrees | seconds
        #[arg(long, default_value = "degrees")]
        mode: MovementMode,
        /// Return right after sending instead of waiting for the move
        #[arg(long, action = ArgAction::SetTrue)]
        no_wait: bool,
    },
    /// Stop one motor
    Stop { motor: MotorConnector },
    /// Stop M1..M4
    StopAll,
    /// Rotate to an absolute angle with a relative move
    Seek {
        motor: MotorConnector,
        #[arg(allow_negative_numbers = true)]
        angle: i32,
        #[arg(long, default_value_t = 50, allow_negative_numbers = true)]
        speed: i32,
        /// shortest | cw | ccw
        #[arg(long, default_value = "shortest")]
        mode: ServoMovementMode,
    },
    /// Let the firmware seek an absolute angle
    Goto {
        motor: MotorConnector,
        #[arg(allow_negative_numbers = true)]
        angle: i32,
        #[arg(long, default_value = "shortest")]
        mode: ServoMovementMode,
    },
    /// Read the current speed
    Speed { motor: MotorConnector },
    /// Read the aggregate angle (or 0..360 with --absolute)
    Angle {
        motor: MotorConnector,
        #[arg(long, action = ArgAction::SetTrue)]
        absolute: bool,
    },
    /// Read the firmware version
    Version,
    /// Tank: drive both sides continuously
    Drive {
        /// forward | backward
        direction: LinearDirection,
        /// Defaults to [drive].default_speed
        #[arg(long)]
        speed: Option<i32>,
    },
    /// Tank: drive both sides for turns, degrees or seconds
    DriveFor {
        direction: LinearDirection,
        #[arg(long)]
        value: f32,
        #[arg(long, default_value = "seconds")]
        mode: MovementMode,
        #[arg(long)]
        speed: Option<i32>,
        #[arg(long, action = ArgAction::SetTrue)]
        no_wait: bool,
    },
    /// Tank: drive a distance
    DriveDistance {
        direction: LinearDirection,
        distance: f32,
        /// cm | inch; defaults to [drive].unit
        #[arg(long)]
        unit: Option<DistanceUnit>,
        #[arg(long)]
        speed: Option<i32>,
    },
    /// Tank: turn in place
    Turn {
        /// left | right
        direction: TurnDirection,
        degrees: f32,
        #[arg(long)]
        speed: Option<i32>,
    },
    /// Tank: independent speeds per side
    Dual {
        #[arg(allow_negative_numbers = true)]
        left: i32,
        #[arg(allow_negative_numbers = true)]
        right: i32,
        /// Stop both sides after this many seconds
        #[arg(long)]
        seconds: Option<f32>,
    },
    /// Tank: stop both sides
    TankStop,
    /// Quick health check (board answers a version read)
    SelfCheck,
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Run { .. } => "run",
            Self::RunFor { .. } => "run-for",
            Self::Stop { .. } => "stop",
            Self::StopAll => "stop-all",
            Self::Seek { .. } => "seek",
            Self::Goto { .. } => "goto",
            Self::Speed { .. } => "speed",
            Self::Angle { .. } => "angle",
            Self::Version => "version",
            Self::Drive { .. } => "drive",
            Self::DriveFor { .. } => "drive-for",
            Self::DriveDistance { .. } => "drive-distance",
            Self::Turn { .. } => "turn",
            Self::Dual { .. } => "dual",
            Self::TankStop => "tank-stop",
            Self::SelfCheck => "self-check",
        }
    }
}
