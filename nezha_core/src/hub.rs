//! Motor/servo controller for the four connectors of one board.
//!
//! All frames go through a single `Mutex<B>`: a telemetry exchange holds the
//! lock across request, settle pause and response so frames never interleave.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use eyre::WrapErr;
use nezha_traits::{Bus, Clock, wait_until};

use crate::builder::{Missing, MotorHubBuilder};
use crate::config::{DeviceProfile, TelemetryCfg};
use crate::error::Result;
use crate::frame::{self, FirmwareVersion, Frame};
use crate::hw_error::map_hw_error;
use crate::speed::SpeedLimits;
use crate::telemetry::{TelemetryCache, TelemetryKind};
use crate::timing::estimate_duration_ms;
use crate::types::{MotorConnector, MovementMode, RotationDirection, ServoMovementMode};

/// Seeks closer than this (in degrees) to the target are skipped.
pub const SEEK_DEADBAND_DEG: i32 = 2;
const VERSION_PAUSE: Duration = Duration::from_millis(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOutcome {
    Moved {
        direction: RotationDirection,
        degrees: i32,
    },
    /// Already within the dead-band; nothing was sent.
    NoOp,
}

/// Choose direction and distance for a relative seek from `current` to
/// `target` (both already in 0..360).
///
/// Ties on the shortest path resolve clockwise. Clockwise is the direction of
/// increasing angle.
pub fn plan_seek(current: i32, target: i32, mode: ServoMovementMode) -> SeekOutcome {
    let cw = (target - current).rem_euclid(360);
    let ccw = (current - target).rem_euclid(360);
    if cw.min(ccw) <= SEEK_DEADBAND_DEG {
        return SeekOutcome::NoOp;
    }
    let (direction, degrees) = match mode {
        ServoMovementMode::Cw => (RotationDirection::Cw, cw),
        ServoMovementMode::Ccw => (RotationDirection::Ccw, ccw),
        ServoMovementMode::ShortestPath if cw <= ccw => (RotationDirection::Cw, cw),
        ServoMovementMode::ShortestPath => (RotationDirection::Ccw, ccw),
    };
    SeekOutcome::Moved { direction, degrees }
}

/// Wire value of a run-for amount: magnitude rounded, saturated to u16.
#[inline]
fn encode_value(value: f32) -> u16 {
    // NaN casts to 0, out-of-range saturates
    value.abs().round() as u16
}

pub struct MotorHub<B> {
    bus: Mutex<B>,
    clock: Arc<dyn Clock + Send + Sync>,
    limits: SpeedLimits,
    device: DeviceProfile,
    timing: TelemetryCfg,
    telemetry: TelemetryCache,
}

impl<B> core::fmt::Debug for MotorHub<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MotorHub")
            .field("limits", &self.limits)
            .field("device", &self.device)
            .field("timing", &self.timing)
            .finish_non_exhaustive()
    }
}

impl<B: Bus> MotorHub<B> {
    /// Start building a hub.
    pub fn builder() -> MotorHubBuilder<B, Missing> {
        MotorHubBuilder::default()
    }

    pub(crate) fn from_parts(
        bus: B,
        clock: Arc<dyn Clock + Send + Sync>,
        limits: SpeedLimits,
        device: DeviceProfile,
        timing: TelemetryCfg,
    ) -> Self {
        Self {
            bus: Mutex::new(bus),
            clock,
            limits,
            device,
            timing,
            telemetry: TelemetryCache::new(timing.staleness),
        }
    }

    pub fn speed_limits(&self) -> SpeedLimits {
        self.limits
    }

    pub fn device(&self) -> &DeviceProfile {
        &self.device
    }

    pub fn timing(&self) -> &TelemetryCfg {
        &self.timing
    }

    pub fn clock(&self) -> &Arc<dyn Clock + Send + Sync> {
        &self.clock
    }

    pub fn telemetry(&self) -> &TelemetryCache {
        &self.telemetry
    }

    /// Run `f` with exclusive access to the bus (e.g. to inspect a simulator).
    pub fn with_bus<R>(&self, f: impl FnOnce(&mut B) -> R) -> R {
        f(&mut self.lock_bus())
    }

    fn lock_bus(&self) -> MutexGuard<'_, B> {
        self.bus.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn send(&self, frame: &Frame) -> Result<()> {
        tracing::debug!(frame = format_args!("{frame:02X?}"), "write frame");
        self.lock_bus()
            .write(self.device.address, frame)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
    }

    /// Write `request`, pause, then read an `N`-byte response under one lock.
    fn transact<const N: usize>(&self, request: &Frame, pause: Duration) -> Result<[u8; N]> {
        let addr = self.device.address;
        let mut bus = self.lock_bus();
        tracing::debug!(frame = format_args!("{request:02X?}"), "write request");
        bus.write(addr, request)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("write request frame")?;
        self.clock.sleep(pause);
        let mut buf = [0u8; N];
        bus.read(addr, &mut buf)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("read response")?;
        Ok(buf)
    }

    fn read_cached(
        &self,
        motor: MotorConnector,
        kind: TelemetryKind,
        fetch: impl FnOnce() -> Result<i32>,
    ) -> i32 {
        if let Some(v) = self.telemetry.fresh(motor, kind, self.clock.now()) {
            tracing::trace!(%motor, ?kind, value = v, "telemetry cache hit");
            return v;
        }
        let Some(_guard) = self.telemetry.begin_read(motor, kind) else {
            tracing::trace!(%motor, ?kind, "read in flight; serving cached value");
            return self.telemetry.cached(motor, kind);
        };
        match fetch() {
            Ok(v) => {
                self.telemetry.store(motor, kind, v, self.clock.now());
                v
            }
            Err(e) => {
                tracing::warn!(
                    %motor,
                    ?kind,
                    error = format_args!("{e:#}"),
                    "telemetry read failed; using cached value"
                );
                self.telemetry.cached(motor, kind)
            }
        }
    }

    // ── Commands ─────────────────────────────────────────────────────────────

    /// Spin `motor` indefinitely at `speed` (-100..=100, mapped into the limits).
    pub fn run_continuous(&self, motor: MotorConnector, speed: i32) -> Result<()> {
        let mapped = self.limits.restrict(speed);
        let direction = RotationDirection::from_speed(mapped);
        // |mapped| <= 100
        let magnitude = u8::try_from(mapped.unsigned_abs()).unwrap_or(u8::MAX);
        self.send(&frame::run_continuous(
            motor,
            direction,
            magnitude,
            self.device.run_layout,
        ))
            .wrap_err_with(|| format!("run {motor}"))?;
        tracing::debug!(%motor, speed = mapped, "run continuous");
        Ok(())
    }

    /// Move `motor` by `value` in `mode` units. With `wait`, blocks until the
    /// motor reports zero speed or the estimated duration plus grace elapses.
    pub fn run_for(
        &self,
        motor: MotorConnector,
        speed: i32,
        value: f32,
        mode: MovementMode,
        wait: bool,
    ) -> Result<()> {
        let mapped = self.limits.restrict(speed);
        let direction = RotationDirection::from_speed(mapped);
        let wire = encode_value(value);
        self.send(&frame::set_servo_speed(
            motor,
            self.device.servo_speed_payload(speed),
        ))
        .wrap_err_with(|| format!("set servo speed on {motor}"))?;
        self.send(&frame::run_for(motor, direction, wire, mode))
            .wrap_err_with(|| format!("run {motor} for {value} {mode:?}"))?;
        tracing::info!(%motor, speed = mapped, value, ?mode, wait, "run for");

        if wait {
            // estimate what the board was actually told to do
            let estimate = estimate_duration_ms(speed, f32::from(wire), mode);
            let bound = Duration::from_millis(estimate) + self.timing.grace;
            if !self.wait_for_movement_complete(motor, bound) {
                tracing::warn!(
                    %motor,
                    bound_ms = bound.as_millis() as u64,
                    "motor still moving after wait bound"
                );
            }
        }
        Ok(())
    }

    pub fn stop(&self, motor: MotorConnector) -> Result<()> {
        self.run_continuous(motor, 0)
            .wrap_err_with(|| format!("stop {motor}"))
    }

    /// Stop M1..M4 in order. Every connector is attempted; the first failure
    /// is returned after the loop.
    pub fn stop_all(&self) -> Result<()> {
        let mut first_err = None;
        for motor in MotorConnector::ALL {
            if let Err(e) = self.stop(motor) {
                tracing::warn!(%motor, error = %e, "stop failed; continuing with remaining motors");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Rotate `motor` to `target` degrees (wrapped into 0..360) using a
    /// relative move computed from the current absolute angle.
    pub fn seek_absolute_angle(
        &self,
        motor: MotorConnector,
        speed: i32,
        target: i32,
        mode: ServoMovementMode,
    ) -> Result<SeekOutcome> {
        let target = target.rem_euclid(360);
        let current = self.read_absolute_angle(motor);
        let outcome = plan_seek(current, target, mode);
        match outcome {
            SeekOutcome::NoOp => {
                tracing::debug!(%motor, current, target, "seek within dead-band");
            }
            SeekOutcome::Moved { direction, degrees } => {
                let magnitude = speed.clamp(-100, 100).abs();
                let signed = match direction {
                    RotationDirection::Cw => magnitude,
                    RotationDirection::Ccw => -magnitude,
                };
                tracing::info!(%motor, current, target, ?direction, degrees, "seek");
                // degrees < 360 so the cast is exact
                self.run_for(motor, signed, degrees as f32, MovementMode::Degrees, true)?;
            }
        }
        Ok(outcome)
    }

    /// Ask the firmware to seek `target` degrees itself (opcode 0x5D), then
    /// wait up to one full turn at top speed.
    pub fn go_to_absolute_position(
        &self,
        motor: MotorConnector,
        target: i32,
        mode: ServoMovementMode,
    ) -> Result<()> {
        // rem_euclid keeps it in 0..360
        let angle = u16::try_from(target.rem_euclid(360)).unwrap_or(0);
        self.send(&frame::seek_absolute(motor, angle, mode))
            .wrap_err_with(|| format!("seek {motor} to {angle}"))?;
        tracing::info!(%motor, angle, ?mode, "firmware seek");
        let bound = Duration::from_millis(estimate_duration_ms(100, 1.0, MovementMode::Turns));
        self.wait_for_movement_complete(motor, bound);
        Ok(())
    }

    // ── Telemetry ────────────────────────────────────────────────────────────

    /// Current speed of `motor`; served from cache inside the staleness window.
    /// On a bus failure the last cached value is returned.
    pub fn read_speed(&self, motor: MotorConnector) -> i32 {
        self.read_cached(motor, TelemetryKind::Speed, || {
            let raw = self.transact::<{ frame::SPEED_RESPONSE_LEN }>(
                &frame::read_speed(motor),
                TelemetryKind::Speed.settle_pause(),
            )?;
            Ok(frame::decode_speed(raw, self.device.rpm_per_raw_unit))
        })
    }

    /// Cumulative angle in degrees since power-up (unbounded, signed).
    pub fn read_aggregate_angle(&self, motor: MotorConnector) -> i32 {
        self.read_cached(motor, TelemetryKind::Angle, || {
            let raw = self.transact::<{ frame::ANGLE_RESPONSE_LEN }>(
                &frame::read_aggregate_angle(motor),
                TelemetryKind::Angle.settle_pause(),
            )?;
            Ok(frame::decode_aggregate_angle(raw))
        })
    }

    /// Aggregate angle folded into 0..360.
    pub fn read_absolute_angle(&self, motor: MotorConnector) -> i32 {
        self.read_aggregate_angle(motor).rem_euclid(360)
    }

    /// Sleep the settle time, then poll speed until it reads zero or `max`
    /// elapses. Returns whether the motor was seen stopped.
    pub fn wait_for_movement_complete(&self, motor: MotorConnector, max: Duration) -> bool {
        self.clock.sleep(self.timing.settle);
        wait_until(self.clock.as_ref(), max, self.timing.poll_interval, || {
            self.read_speed(motor) == 0
        })
    }

    pub fn read_firmware_version(&self) -> Result<FirmwareVersion> {
        let raw = self
            .transact::<{ frame::VERSION_RESPONSE_LEN }>(&frame::read_version(), VERSION_PAUSE)
            .wrap_err("read firmware version")?;
        Ok(frame::decode_version(raw))
    }
}
