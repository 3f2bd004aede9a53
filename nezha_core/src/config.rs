//! Runtime configuration for the motor hub and the tank drive.
//!
//! Separate from the TOML schema in `nezha_config`; see `conversions` for the
//! bridge.

use std::f32::consts::PI;
use std::time::Duration;

use crate::error::{NezhaError, Result};
use crate::frame::RunFrameLayout;
use crate::types::{DistanceUnit, MotorConnector};

/// Per-board-revision constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceProfile {
    /// Multiplier for the servo speed profile frame (9 or 15 depending on board).
    pub servo_speed_gain: u16,
    /// Reported speed per raw telemetry unit.
    pub rpm_per_raw_unit: f32,
    /// 7-bit I2C address of the board.
    pub address: u8,
    /// Payload layout of run-continuous frames.
    pub run_layout: RunFrameLayout,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            servo_speed_gain: 9,
            rpm_per_raw_unit: 0.17,
            address: 0x10,
            run_layout: RunFrameLayout::Standard,
        }
    }
}

impl DeviceProfile {
    /// Payload of the servo speed frame for an unmapped speed request.
    pub fn servo_speed_payload(&self, speed: i32) -> u16 {
        let mag = speed.clamp(-100, 100).unsigned_abs();
        u16::try_from(mag * u32::from(self.servo_speed_gain)).unwrap_or(u16::MAX)
    }
}

/// Cache window and completion-poll timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryCfg {
    /// Readings younger than this are served from the cache.
    pub staleness: Duration,
    /// Speed poll interval while waiting for a move to finish.
    pub poll_interval: Duration,
    /// Pause before the first completion poll.
    pub settle: Duration,
    /// Added to the estimated duration to bound a blocking wait.
    pub grace: Duration,
}

impl Default for TelemetryCfg {
    fn default() -> Self {
        Self {
            staleness: Duration::from_millis(10),
            poll_interval: Duration::from_millis(100),
            settle: Duration::from_millis(100),
            grace: Duration::from_millis(100),
        }
    }
}

/// Tank drive wiring and wheel geometry, stored in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveConfig {
    pub left: MotorConnector,
    pub left_reversed: bool,
    pub right: MotorConnector,
    pub right_reversed: bool,
    pub wheel_circumference_mm: f32,
    /// Distance between the two wheel contact points.
    pub wheelbase_mm: f32,
    /// Speed for tank commands issued without one (1..=100).
    pub default_speed: i32,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            left: MotorConnector::M4,
            left_reversed: true,
            right: MotorConnector::M1,
            right_reversed: false,
            wheel_circumference_mm: 36.0 * PI,
            wheelbase_mm: 100.0,
            default_speed: 30,
        }
    }
}

fn positive_mm(value: f32, unit: DistanceUnit, what: &str) -> Result<f32> {
    if !(value.is_finite() && value > 0.0) {
        return Err(eyre::Report::new(NezhaError::Config(format!(
            "{what} must be a positive length, got {value}"
        ))));
    }
    Ok(unit.to_mm(value))
}

impl DriveConfig {
    /// Replace wheel diameter and wheelbase; both must be finite and positive.
    pub fn with_geometry(
        mut self,
        wheel_diameter: f32,
        wheelbase: f32,
        unit: DistanceUnit,
    ) -> Result<Self> {
        let diameter_mm = positive_mm(wheel_diameter, unit, "wheel diameter")?;
        self.wheelbase_mm = positive_mm(wheelbase, unit, "wheelbase")?;
        self.wheel_circumference_mm = diameter_mm * PI;
        Ok(self)
    }

    pub fn with_wheel_diameter(mut self, wheel_diameter: f32, unit: DistanceUnit) -> Result<Self> {
        self.wheel_circumference_mm = positive_mm(wheel_diameter, unit, "wheel diameter")? * PI;
        Ok(self)
    }

    /// Arc length (mm) each wheel travels per degree of spot turn.
    #[inline]
    pub fn wheelbase_constant(&self) -> f32 {
        self.wheelbase_mm * PI / 360.0
    }

    /// Apply the reversal flags to logical left/right speeds.
    #[inline]
    pub fn side_speeds(&self, left: i32, right: i32) -> (i32, i32) {
        let l = if self.left_reversed { -left } else { left };
        let r = if self.right_reversed { -right } else { right };
        (l, r)
    }
}
