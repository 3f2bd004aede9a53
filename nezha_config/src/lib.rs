#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the NeZha V2 driver.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Every section is optional; omitted values fall back to the board's
//!   reference defaults (M4 left reversed, M1 right, 3.6 cm wheels).
use serde::Deserialize;
use std::path::Path;

/// Motor port as written in TOML (`"M1"`..`"M4"`).
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Port {
    M1,
    M2,
    M3,
    M4,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Cm,
    Inch,
}

/// Payload layout of run-continuous frames.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunLayout {
    /// Speed in the last payload byte.
    #[default]
    Standard,
    /// Speed first, then the 0xF5 filler (vendor firmware extension).
    Firmware,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BusCfg {
    /// Linux I2C bus number (`/dev/i2c-N`), used by the hardware backend only.
    pub i2c_bus: u8,
    /// 7-bit device address of the board.
    pub address: u8,
}

impl Default for BusCfg {
    fn default() -> Self {
        Self {
            i2c_bus: 1,
            address: 0x10,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SpeedCfg {
    /// Smallest non-zero magnitude ever commanded (static friction floor)
    pub min: u8,
    /// Ceiling that a request of 100 maps to
    pub max: u8,
}

impl Default for SpeedCfg {
    fn default() -> Self {
        Self { min: 5, max: 100 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DeviceCfg {
    /// Multiplier applied to the servo speed profile frame (9 or 15 by board revision).
    pub servo_speed_gain: u16,
    /// Reported speed per raw telemetry unit.
    pub rpm_per_raw_unit: f32,
    /// "standard" | "firmware"
    pub run_frame_layout: RunLayout,
}

impl Default for DeviceCfg {
    fn default() -> Self {
        Self {
            servo_speed_gain: 9,
            rpm_per_raw_unit: 0.17,
            run_frame_layout: RunLayout::Standard,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TelemetryCfg {
    /// Cached speed/angle readings younger than this are reused.
    pub staleness_ms: u64,
    /// Interval between speed polls while waiting for a move to finish.
    pub poll_interval_ms: u64,
    /// Pause before the first completion poll.
    pub settle_ms: u64,
    /// Extra time added to the estimated duration of a blocking move.
    pub grace_ms: u64,
}

impl Default for TelemetryCfg {
    fn default() -> Self {
        Self {
            staleness_ms: 10,
            poll_interval_ms: 100,
            settle_ms: 100,
            grace_ms: 100,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DriveCfg {
    pub left_motor: Port,
    pub left_reversed: bool,
    pub right_motor: Port,
    pub right_reversed: bool,
    pub wheel_diameter: f32,
    /// Distance between the wheel contact points.
    pub wheelbase: f32,
    /// Unit of `wheel_diameter` and `wheelbase`
    pub unit: Unit,
    /// Speed used by tank commands that do not specify one.
    pub default_speed: u8,
}

impl Default for DriveCfg {
    fn default() -> Self {
        Self {
            left_motor: Port::M4,
            left_reversed: true,
            right_motor: Port::M1,
            right_reversed: false,
            wheel_diameter: 3.6,
            wheelbase: 10.0,
            unit: Unit::Cm,
            default_speed: 30,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub bus: BusCfg,
    pub speed: SpeedCfg,
    pub device: DeviceCfg,
    pub telemetry: TelemetryCfg,
    pub drive: DriveCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read and parse a config file; does not validate.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    load_toml(&text).map_err(|e| eyre::eyre!("parse config {:?}: {}", path, e))
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Bus
        if !(0x08..=0x77).contains(&self.bus.address) {
            eyre::bail!("bus.address must be a 7-bit address in 0x08..=0x77");
        }

        // Speed
        if self.speed.min >= 100 {
            eyre::bail!("speed.min must be < 100");
        }
        if self.speed.max > 100 {
            eyre::bail!("speed.max must be <= 100");
        }
        if self.speed.max < self.speed.min {
            eyre::bail!("speed.max must be >= speed.min");
        }

        // Device
        if self.device.servo_speed_gain == 0 {
            eyre::bail!("device.servo_speed_gain must be > 0");
        }
        // 100 * gain must fit the 16-bit payload
        if u32::from(self.device.servo_speed_gain) * 100 > u32::from(u16::MAX) {
            eyre::bail!("device.servo_speed_gain is too large for a 16-bit payload");
        }
        if !(self.device.rpm_per_raw_unit.is_finite() && self.device.rpm_per_raw_unit > 0.0) {
            eyre::bail!("device.rpm_per_raw_unit must be > 0");
        }

        // Telemetry
        if self.telemetry.staleness_ms > 1000 {
            eyre::bail!("telemetry.staleness_ms is unreasonably large (>1s)");
        }
        if self.telemetry.poll_interval_ms == 0 {
            eyre::bail!("telemetry.poll_interval_ms must be >= 1");
        }

        // Drive
        if !(self.drive.wheel_diameter.is_finite() && self.drive.wheel_diameter > 0.0) {
            eyre::bail!("drive.wheel_diameter must be > 0");
        }
        if !(self.drive.wheelbase.is_finite() && self.drive.wheelbase > 0.0) {
            eyre::bail!("drive.wheelbase must be > 0");
        }
        if self.drive.left_motor == self.drive.right_motor {
            eyre::bail!("drive.left_motor and drive.right_motor must differ");
        }
        if !(1..=100).contains(&self.drive.default_speed) {
            eyre::bail!("drive.default_speed must be in 1..=100");
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never, daily, hourly");
        }

        Ok(())
    }
}
