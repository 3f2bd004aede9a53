#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Protocol layer for the NeZha V2 motor/servo board.
//!
//! Everything here is hardware-agnostic: frames leave through
//! `nezha_traits::Bus` and blocking waits go through `nezha_traits::Clock`.
//!
//! ## Layout
//!
//! - **Codec**: 8-byte command frames and response decoding (`frame`)
//! - **Speed mapping**: user speed to the motor's usable band (`speed`)
//! - **Timing**: duration estimate for blocking moves (`timing`)
//! - **Telemetry**: staleness cache with in-flight de-duplication (`telemetry`)
//! - **Motors**: per-connector commands and reads (`hub::MotorHub`)
//! - **Tank drive**: two-motor kinematics (`drive::TankDrive`)
//!
//! ```no_run
//! use nezha_core::{MotorHub, MotorConnector, MovementMode};
//! # fn demo(bus: impl nezha_traits::Bus) -> nezha_core::Result<()> {
//! let hub = MotorHub::builder().with_bus(bus).build()?;
//! hub.run_for(MotorConnector::M1, 50, 1.0, MovementMode::Turns, true)?;
//! # Ok(()) }
//! ```

pub mod builder;
pub mod config;
pub mod conversions;
pub mod drive;
pub mod error;
pub mod frame;
pub mod hub;
pub mod hw_error;
pub mod speed;
pub mod telemetry;
pub mod timing;
pub mod types;

pub use builder::MotorHubBuilder;
pub use config::{DeviceProfile, DriveConfig, TelemetryCfg};
pub use drive::TankDrive;
pub use error::{BuildError, NezhaError, Report, Result};
pub use frame::{FirmwareVersion, RunFrameLayout};
pub use hub::{MotorHub, SeekOutcome};
pub use speed::SpeedLimits;
pub use timing::estimate_duration_ms;
pub use types::{
    DistanceUnit, LinearDirection, MotorConnector, MovementMode, RotationDirection,
    ServoMovementMode, TurnDirection,
};
