//! Type-state builder for [`MotorHub`].
//!
//! `build()` is only available once a bus is set; `try_build()` works in any
//! state and reports what is missing.

use std::marker::PhantomData;
use std::sync::Arc;

use nezha_traits::{Bus, Clock, MonotonicClock};

use crate::config::{DeviceProfile, TelemetryCfg};
use crate::error::{BuildError, NezhaError, Result};
use crate::hub::MotorHub;
use crate::speed::SpeedLimits;

pub struct Missing;
pub struct Set;

pub struct MotorHubBuilder<B, S> {
    bus: Option<B>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    limits: SpeedLimits,
    device: DeviceProfile,
    telemetry: TelemetryCfg,
    _s: PhantomData<S>,
}

impl<B> Default for MotorHubBuilder<B, Missing> {
    fn default() -> Self {
        Self {
            bus: None,
            clock: None,
            limits: SpeedLimits::default(),
            device: DeviceProfile::default(),
            telemetry: TelemetryCfg::default(),
            _s: PhantomData,
        }
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

fn validate_and_build<B: Bus>(
    bus: B,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    limits: SpeedLimits,
    device: DeviceProfile,
    telemetry: TelemetryCfg,
) -> Result<MotorHub<B>> {
    if device.servo_speed_gain == 0 {
        return Err(invalid("servo_speed_gain must be > 0"));
    }
    if u32::from(device.servo_speed_gain) * 100 > u32::from(u16::MAX) {
        return Err(invalid("servo_speed_gain overflows the 16-bit speed payload"));
    }
    if !(device.rpm_per_raw_unit.is_finite() && device.rpm_per_raw_unit > 0.0) {
        return Err(invalid("rpm_per_raw_unit must be > 0"));
    }
    if !(0x08..=0x77).contains(&device.address) {
        return Err(invalid("address must be a 7-bit address in 0x08..=0x77"));
    }
    if telemetry.poll_interval.is_zero() {
        return Err(invalid("poll_interval must be > 0"));
    }

    let clock: Arc<dyn Clock + Send + Sync> = match clock {
        Some(b) => Arc::from(b),
        None => Arc::new(MonotonicClock::new()),
    };
    Ok(MotorHub::from_parts(bus, clock, limits, device, telemetry))
}

impl<B: Bus, S> MotorHubBuilder<B, S> {
    /// Build without the type-state guarantee; fails if no bus was provided.
    pub fn try_build(self) -> Result<MotorHub<B>> {
        let Some(bus) = self.bus else {
            return Err(eyre::Report::new(BuildError::MissingBus));
        };
        validate_and_build(bus, self.clock, self.limits, self.device, self.telemetry)
    }
}

impl<B, S> MotorHubBuilder<B, S> {
    pub fn with_speed_limits(mut self, limits: SpeedLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_device(mut self, device: DeviceProfile) -> Self {
        self.device = device;
        self
    }

    pub fn with_telemetry(mut self, telemetry: TelemetryCfg) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Apply the `[speed]`, `[device]`, `[bus]` and `[telemetry]` sections of a TOML config.
    pub fn apply_config(self, cfg: &nezha_config::Config) -> Result<Self> {
        let limits = SpeedLimits::try_from(&cfg.speed)
            .map_err(|e| eyre::Report::new(NezhaError::Config(format!("{e}"))))?;
        Ok(self
            .with_speed_limits(limits)
            .with_device(DeviceProfile::from(cfg))
            .with_telemetry(TelemetryCfg::from(&cfg.telemetry)))
    }
}

impl<B: Bus> MotorHubBuilder<B, Missing> {
    pub fn with_bus(self, bus: B) -> MotorHubBuilder<B, Set> {
        MotorHubBuilder {
            bus: Some(bus),
            clock: self.clock,
            limits: self.limits,
            device: self.device,
            telemetry: self.telemetry,
            _s: PhantomData,
        }
    }
}

impl<B: Bus> MotorHubBuilder<B, Set> {
    /// Validate and build the hub.
    pub fn build(self) -> Result<MotorHub<B>> {
        self.try_build()
    }
}
