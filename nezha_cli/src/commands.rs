//! Board session assembly and command execution.

use std::sync::Arc;

use eyre::WrapErr;
use nezha_core::error::{NezhaError, Result};
use nezha_core::{DistanceUnit, DriveConfig, MotorHub, SeekOutcome, TankDrive};
use nezha_hardware::SimulatedBoard;
use nezha_traits::Bus;
use serde_json::{Value, json};

use crate::cli::Commands;

pub type BoxedBus = Box<dyn Bus + Send>;

/// Result of one command: a line for humans and a JSON payload.
pub struct Outcome {
    pub message: String,
    pub data: Value,
}

impl Outcome {
    fn new(message: impl Into<String>, data: Value) -> Self {
        Self {
            message: message.into(),
            data,
        }
    }
}

pub struct Session {
    pub hub: Arc<MotorHub<BoxedBus>>,
    pub drive: TankDrive<BoxedBus>,
    default_unit: DistanceUnit,
    /// Handle on the simulated board, to report the frames a command sent.
    sim: Option<SimulatedBoard>,
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
fn open_bus(cfg: &nezha_config::Config) -> Result<(BoxedBus, Option<SimulatedBoard>)> {
    let bus = nezha_hardware::i2c::I2cBus::open(cfg.bus.i2c_bus)
        .map_err(|e| eyre::Report::new(NezhaError::Transport(e.to_string())))
        .wrap_err_with(|| format!("open /dev/i2c-{}", cfg.bus.i2c_bus))?;
    tracing::info!(bus = cfg.bus.i2c_bus, address = cfg.bus.address, "i2c bus opened");
    let bus: BoxedBus = Box::new(bus);
    Ok((bus, None))
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn open_bus(_cfg: &nezha_config::Config) -> Result<(BoxedBus, Option<SimulatedBoard>)> {
    let board = SimulatedBoard::new();
    tracing::info!("using simulated board");
    let bus: BoxedBus = Box::new(board.clone());
    Ok((bus, Some(board)))
}

impl Session {
    pub fn open(cfg: &nezha_config::Config) -> Result<Self> {
        let (bus, sim) = open_bus(cfg)?;
        let hub = MotorHub::<BoxedBus>::builder()
            .with_bus(bus)
            .apply_config(cfg)?
            .build()
            .wrap_err("build motor hub")?;
        let hub = Arc::new(hub);
        let drive_cfg = DriveConfig::try_from(&cfg.drive)
            .map_err(|e| eyre::Report::new(NezhaError::Config(e.to_string())))?;
        let drive = TankDrive::with_config(Arc::clone(&hub), drive_cfg);
        Ok(Self {
            hub,
            drive,
            default_unit: cfg.drive.unit.into(),
            sim,
        })
    }

    pub fn simulator(&self) -> Option<&SimulatedBoard> {
        self.sim.as_ref()
    }

    /// Stop every motor on Ctrl-C, then exit with 130.
    pub fn install_ctrlc(&self) {
        let hub = Arc::clone(&self.hub);
        if let Err(e) = ctrlc::set_handler(move || {
            tracing::warn!("interrupt: stopping all motors");
            if let Err(e) = hub.stop_all() {
                tracing::error!(error = %e, "stop-all on interrupt failed");
            }
            std::process::exit(130);
        }) {
            tracing::warn!(error = %e, "failed to install Ctrl-C handler");
        }
    }

    /// Frames written so far, as hex strings (simulator only).
    pub fn frames_hex(&self) -> Vec<String> {
        self.sim
            .as_ref()
            .map(|b| b.frames().iter().map(|f| hex(f)).collect())
            .unwrap_or_default()
    }
}

pub fn hex(frame: &[u8]) -> String {
    frame
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn execute(session: &Session, cmd: &Commands) -> Result<Outcome> {
    let hub = &session.hub;
    let drive = &session.drive;
    let tank_speed = |s: &Option<i32>| s.unwrap_or_else(|| drive.default_speed());

    let outcome = match cmd {
        Commands::Run { motor, speed } => {
            hub.run_continuous(*motor, *speed)?;
            Outcome::new(
                format!("{motor} running at {speed}"),
                json!({ "motor": motor.to_string(), "speed": speed }),
            )
        }
        Commands::RunFor {
            motor,
            speed,
            value,
            mode,
            no_wait,
        } => {
            hub.run_for(*motor, *speed, *value, *mode, !no_wait)?;
            Outcome::new(
                format!("{motor} ran {value} {mode:?} at {speed}"),
                json!({
                    "motor": motor.to_string(),
                    "speed": speed,
                    "value": value,
                    "mode": format!("{mode:?}"),
                    "waited": !no_wait,
                }),
            )
        }
        Commands::Stop { motor } => {
            hub.stop(*motor)?;
            Outcome::new(format!("{motor} stopped"), json!({ "motor": motor.to_string() }))
        }
        Commands::StopAll => {
            hub.stop_all()?;
            Outcome::new("all motors stopped", json!({}))
        }
        Commands::Seek {
            motor,
            angle,
            speed,
            mode,
        } => match hub.seek_absolute_angle(*motor, *speed, *angle, *mode)? {
            SeekOutcome::NoOp => Outcome::new(
                format!("{motor} already at {angle}°"),
                json!({ "motor": motor.to_string(), "moved": false }),
            ),
            SeekOutcome::Moved { direction, degrees } => Outcome::new(
                format!("{motor} moved {direction:?} {degrees}°"),
                json!({
                    "motor": motor.to_string(),
                    "moved": true,
                    "direction": format!("{direction:?}"),
                    "degrees": degrees,
                }),
            ),
        },
        Commands::Goto { motor, angle, mode } => {
            hub.go_to_absolute_position(*motor, *angle, *mode)?;
            Outcome::new(
                format!("{motor} seeking {}° ({mode:?})", angle.rem_euclid(360)),
                json!({ "motor": motor.to_string(), "angle": angle.rem_euclid(360) }),
            )
        }
        Commands::Speed { motor } => {
            let speed = hub.read_speed(*motor);
            Outcome::new(
                format!("{motor} speed {speed}"),
                json!({ "motor": motor.to_string(), "speed": speed }),
            )
        }
        Commands::Angle { motor, absolute } => {
            let angle = if *absolute {
                hub.read_absolute_angle(*motor)
            } else {
                hub.read_aggregate_angle(*motor)
            };
            Outcome::new(
                format!("{motor} angle {angle}°"),
                json!({ "motor": motor.to_string(), "angle": angle, "absolute": absolute }),
            )
        }
        Commands::Version => {
            let v = hub.read_firmware_version()?;
            Outcome::new(format!("firmware {v}"), json!({ "firmware": v.to_string() }))
        }
        Commands::Drive { direction, speed } => {
            let speed = tank_speed(speed);
            drive.drive(*direction, speed)?;
            Outcome::new(
                format!("driving {direction:?} at {speed}"),
                json!({ "direction": format!("{direction:?}"), "speed": speed }),
            )
        }
        Commands::DriveFor {
            direction,
            value,
            mode,
            speed,
            no_wait,
        } => {
            let speed = tank_speed(speed);
            drive.drive_for(*direction, speed, *value, *mode, !no_wait)?;
            Outcome::new(
                format!("drove {direction:?} {value} {mode:?} at {speed}"),
                json!({
                    "direction": format!("{direction:?}"),
                    "speed": speed,
                    "value": value,
                    "mode": format!("{mode:?}"),
                }),
            )
        }
        Commands::DriveDistance {
            direction,
            distance,
            unit,
            speed,
        } => {
            let speed = tank_speed(speed);
            let unit = unit.unwrap_or(session.default_unit);
            drive.drive_for_distance(*direction, speed, *distance, unit)?;
            Outcome::new(
                format!("drove {direction:?} {distance} {unit:?}"),
                json!({
                    "direction": format!("{direction:?}"),
                    "distance": distance,
                    "unit": format!("{unit:?}"),
                }),
            )
        }
        Commands::Turn {
            direction,
            degrees,
            speed,
        } => {
            let speed = tank_speed(speed);
            drive.spot_turn(*direction, speed, *degrees)?;
            Outcome::new(
                format!("turned {direction:?} {degrees}°"),
                json!({
                    "direction": format!("{direction:?}"),
                    "degrees": degrees,
                    "speed": speed,
                }),
            )
        }
        Commands::Dual {
            left,
            right,
            seconds,
        } => {
            drive.drive_dual_speed(*left, *right, *seconds)?;
            Outcome::new(
                format!("left {left}, right {right}"),
                json!({ "left": left, "right": right, "seconds": seconds }),
            )
        }
        Commands::TankStop => {
            drive.stop()?;
            Outcome::new("tank stopped", json!({}))
        }
        Commands::SelfCheck => {
            let v = hub
                .read_firmware_version()
                .wrap_err("board did not answer a version read")?;
            Outcome::new(
                format!("ok: firmware {v}"),
                json!({ "ok": true, "firmware": v.to_string() }),
            )
        }
    };
    Ok(outcome)
}
