//! Conversions from the TOML schema in `nezha_config` to runtime types.

use std::time::Duration;

use crate::config::{DeviceProfile, DriveConfig, TelemetryCfg};
use crate::frame::RunFrameLayout;
use crate::speed::SpeedLimits;
use crate::types::{DistanceUnit, MotorConnector};

impl From<nezha_config::Port> for MotorConnector {
    fn from(p: nezha_config::Port) -> Self {
        match p {
            nezha_config::Port::M1 => Self::M1,
            nezha_config::Port::M2 => Self::M2,
            nezha_config::Port::M3 => Self::M3,
            nezha_config::Port::M4 => Self::M4,
        }
    }
}

impl From<nezha_config::Unit> for DistanceUnit {
    fn from(u: nezha_config::Unit) -> Self {
        match u {
            nezha_config::Unit::Cm => Self::Cm,
            nezha_config::Unit::Inch => Self::Inch,
        }
    }
}

// ── SpeedLimits ──────────────────────────────────────────────────────────────

impl TryFrom<&nezha_config::SpeedCfg> for SpeedLimits {
    type Error = eyre::Report;

    fn try_from(c: &nezha_config::SpeedCfg) -> Result<Self, Self::Error> {
        Self::new(c.min, c.max)
    }
}

// ── DeviceProfile ────────────────────────────────────────────────────────────

impl From<nezha_config::RunLayout> for RunFrameLayout {
    fn from(l: nezha_config::RunLayout) -> Self {
        match l {
            nezha_config::RunLayout::Standard => Self::Standard,
            nezha_config::RunLayout::Firmware => Self::Firmware,
        }
    }
}

/// The board address lives under `[bus]`, so this reads the whole config.
impl From<&nezha_config::Config> for DeviceProfile {
    fn from(c: &nezha_config::Config) -> Self {
        Self {
            servo_speed_gain: c.device.servo_speed_gain,
            rpm_per_raw_unit: c.device.rpm_per_raw_unit,
            address: c.bus.address,
            run_layout: c.device.run_frame_layout.into(),
        }
    }
}

// ── TelemetryCfg ─────────────────────────────────────────────────────────────

impl From<&nezha_config::TelemetryCfg> for TelemetryCfg {
    fn from(c: &nezha_config::TelemetryCfg) -> Self {
        Self {
            staleness: Duration::from_millis(c.staleness_ms),
            poll_interval: Duration::from_millis(c.poll_interval_ms),
            settle: Duration::from_millis(c.settle_ms),
            grace: Duration::from_millis(c.grace_ms),
        }
    }
}

// ── DriveConfig ──────────────────────────────────────────────────────────────

impl TryFrom<&nezha_config::DriveCfg> for DriveConfig {
    type Error = eyre::Report;

    fn try_from(c: &nezha_config::DriveCfg) -> Result<Self, Self::Error> {
        let base = Self {
            left: c.left_motor.into(),
            left_reversed: c.left_reversed,
            right: c.right_motor.into(),
            right_reversed: c.right_reversed,
            default_speed: i32::from(c.default_speed),
            ..Self::default()
        };
        base.with_geometry(c.wheel_diameter, c.wheelbase, c.unit.into())
    }
}
