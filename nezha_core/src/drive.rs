//! Differential (tank) drive on two motors of a [`MotorHub`].
//!
//! Logical speeds are "positive = forward" for both sides; the per-side
//! reversal flags in [`DriveConfig`] turn that into motor rotation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use nezha_traits::Bus;

use crate::config::DriveConfig;
use crate::error::Result;
use crate::hub::MotorHub;
use crate::types::{DistanceUnit, LinearDirection, MotorConnector, MovementMode, TurnDirection};

/// Step used while holding a dual-speed command for a fixed time.
const DUAL_SPEED_STEP: Duration = Duration::from_millis(100);

/// Wheel rotation in degrees needed to roll `distance_mm`.
#[inline]
pub fn distance_to_degrees(distance_mm: f32, circumference_mm: f32) -> f32 {
    distance_mm * 360.0 / circumference_mm
}

/// Wheel rotation in degrees for an in-place turn of `turn_degrees`.
#[inline]
pub fn turn_to_wheel_degrees(cfg: &DriveConfig, turn_degrees: f32) -> f32 {
    distance_to_degrees(
        cfg.wheelbase_constant() * turn_degrees,
        cfg.wheel_circumference_mm,
    )
}

/// Logical (left, right) speeds for a spot turn.
#[inline]
pub fn spot_turn_speeds(direction: TurnDirection, speed: i32) -> (i32, i32) {
    match direction {
        TurnDirection::Left => (-speed, speed),
        TurnDirection::Right => (speed, -speed),
    }
}

pub struct TankDrive<B> {
    hub: Arc<MotorHub<B>>,
    config: RwLock<DriveConfig>,
    movement_changed: AtomicBool,
}

impl<B> core::fmt::Debug for TankDrive<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TankDrive")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<B: Bus> TankDrive<B> {
    /// Drive with the reference wiring (M4 reversed left, M1 right).
    pub fn new(hub: Arc<MotorHub<B>>) -> Self {
        Self::with_config(hub, DriveConfig::default())
    }

    pub fn with_config(hub: Arc<MotorHub<B>>, config: DriveConfig) -> Self {
        Self {
            hub,
            config: RwLock::new(config),
            movement_changed: AtomicBool::new(false),
        }
    }

    pub fn hub(&self) -> &Arc<MotorHub<B>> {
        &self.hub
    }

    /// Snapshot of the current wiring and geometry.
    pub fn config(&self) -> DriveConfig {
        *self.config.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, f: impl FnOnce(&mut DriveConfig)) {
        f(&mut self.config.write().unwrap_or_else(PoisonError::into_inner));
    }

    pub fn set_left_motor(&self, motor: MotorConnector, reversed: bool) {
        self.update(|c| {
            c.left = motor;
            c.left_reversed = reversed;
        });
    }

    pub fn set_right_motor(&self, motor: MotorConnector, reversed: bool) {
        self.update(|c| {
            c.right = motor;
            c.right_reversed = reversed;
        });
    }

    /// Clamped into 1..=100.
    pub fn set_default_speed(&self, speed: i32) {
        self.update(|c| c.default_speed = speed.clamp(1, 100));
    }

    pub fn default_speed(&self) -> i32 {
        self.config().default_speed
    }

    /// Set wheel diameter and wheelbase. Non-positive or non-finite lengths
    /// are rejected and the previous geometry is kept.
    pub fn setup_geometry(
        &self,
        wheel_diameter: f32,
        wheelbase: f32,
        unit: DistanceUnit,
    ) -> Result<()> {
        let next = self.config().with_geometry(wheel_diameter, wheelbase, unit)?;
        self.update(|c| {
            c.wheel_circumference_mm = next.wheel_circumference_mm;
            c.wheelbase_mm = next.wheelbase_mm;
        });
        tracing::debug!(
            circumference_mm = next.wheel_circumference_mm,
            wheelbase_mm = next.wheelbase_mm,
            "drive geometry"
        );
        Ok(())
    }

    pub fn set_wheel_diameter(&self, wheel_diameter: f32, unit: DistanceUnit) -> Result<()> {
        let next = self.config().with_wheel_diameter(wheel_diameter, unit)?;
        self.update(|c| c.wheel_circumference_mm = next.wheel_circumference_mm);
        Ok(())
    }

    /// Millimetres of wheel travel per degree of spot turn.
    pub fn wheelbase_constant(&self) -> f32 {
        self.config().wheelbase_constant()
    }

    /// Returns and clears the flag set by every motion command.
    pub fn take_movement_changed(&self) -> bool {
        self.movement_changed.swap(false, Ordering::AcqRel)
    }

    fn mark_changed(&self) {
        self.movement_changed.store(true, Ordering::Release);
    }

    fn run_pair(
        &self,
        left: i32,
        right: i32,
        value: f32,
        mode: MovementMode,
        wait: bool,
    ) -> Result<()> {
        let cfg = self.config();
        let (l, r) = cfg.side_speeds(left, right);
        self.mark_changed();
        self.hub.run_for(cfg.left, l, value, mode, wait)?;
        self.hub.run_for(cfg.right, r, value, mode, wait)
    }

    /// Both sides continuously at `speed` in `direction`.
    pub fn drive(&self, direction: LinearDirection, speed: i32) -> Result<()> {
        let logical = direction.apply(speed);
        let cfg = self.config();
        let (l, r) = cfg.side_speeds(logical, logical);
        self.mark_changed();
        tracing::info!(?direction, speed, "drive");
        self.hub.run_continuous(cfg.left, l)?;
        self.hub.run_continuous(cfg.right, r)
    }

    /// Both sides for `value` in `mode`; left is commanded (and waited on)
    /// before right.
    pub fn drive_for(
        &self,
        direction: LinearDirection,
        speed: i32,
        value: f32,
        mode: MovementMode,
        wait: bool,
    ) -> Result<()> {
        let logical = direction.apply(speed);
        tracing::info!(?direction, speed, value, ?mode, wait, "drive for");
        self.run_pair(logical, logical, value, mode, wait)
    }

    /// Roll `distance` and block until done.
    pub fn drive_for_distance(
        &self,
        direction: LinearDirection,
        speed: i32,
        distance: f32,
        unit: DistanceUnit,
    ) -> Result<()> {
        let cfg = self.config();
        let degrees = distance_to_degrees(unit.to_mm(distance), cfg.wheel_circumference_mm);
        tracing::info!(?direction, speed, distance, ?unit, degrees, "drive distance");
        let logical = direction.apply(speed);
        self.run_pair(logical, logical, degrees, MovementMode::Degrees, true)
    }

    /// Turn in place by `degrees` and block until done.
    pub fn spot_turn(&self, direction: TurnDirection, speed: i32, degrees: f32) -> Result<()> {
        let cfg = self.config();
        let wheel_degrees = turn_to_wheel_degrees(&cfg, degrees);
        let (left, right) = spot_turn_speeds(direction, speed);
        tracing::info!(?direction, speed, degrees, wheel_degrees, "spot turn");
        self.run_pair(left, right, wheel_degrees, MovementMode::Degrees, true)
    }

    /// Independent logical speeds per side. With `seconds`, holds them for
    /// that long in 100 ms steps and then stops both.
    pub fn drive_dual_speed(&self, left: i32, right: i32, seconds: Option<f32>) -> Result<()> {
        let cfg = self.config();
        let (l, r) = cfg.side_speeds(left, right);
        self.mark_changed();
        tracing::info!(left, right, ?seconds, "dual speed");
        self.hub.run_continuous(cfg.left, l)?;
        self.hub.run_continuous(cfg.right, r)?;

        let Some(seconds) = seconds else {
            return Ok(());
        };
        let total = Duration::try_from_secs_f32(seconds).unwrap_or(Duration::ZERO);
        let clock = self.hub.clock();
        let start = clock.now();
        while clock.now().saturating_duration_since(start) < total {
            clock.sleep(DUAL_SPEED_STEP);
        }
        self.stop()
    }

    /// Stop left then right; both are attempted and the first error returned.
    pub fn stop(&self) -> Result<()> {
        let cfg = self.config();
        self.mark_changed();
        let left = self.hub.stop(cfg.left);
        if let Err(e) = &left {
            tracing::warn!(motor = %cfg.left, error = %e, "left stop failed; stopping right");
        }
        let right = self.hub.stop(cfg.right);
        left.and(right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_cm_on_reference_wheel_is_about_318_degrees() {
        let cfg = DriveConfig::default();
        let deg = distance_to_degrees(DistanceUnit::Cm.to_mm(10.0), cfg.wheel_circumference_mm);
        assert!((deg - 318.31).abs() < 0.01, "got {deg}");
    }

    #[test]
    fn quarter_turn_uses_wheelbase_arc() {
        let cfg = DriveConfig::default();
        // arc = 100π/4 mm = 78.54 mm; / 36π mm * 360
        let deg = turn_to_wheel_degrees(&cfg, 90.0);
        assert!((deg - 250.0).abs() < 0.01, "got {deg}");
    }

    #[test]
    fn spot_turn_sides_oppose() {
        assert_eq!(spot_turn_speeds(TurnDirection::Left, 40), (-40, 40));
        assert_eq!(spot_turn_speeds(TurnDirection::Right, 40), (40, -40));
        let cfg = DriveConfig::default();
        // left reversed: both motors end up turning the same way
        assert_eq!(cfg.side_speeds(-40, 40), (40, 40));
    }
}
