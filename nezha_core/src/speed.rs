//! Maps user-facing speeds (-100..=100) onto the motor's usable band.

use crate::error::{BuildError, Result};

/// Magnitude bounds applied to every commanded speed.
///
/// A non-zero request never drops below `min` (static friction floor) and a
/// request of 100 lands exactly on `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedLimits {
    min: u8,
    max: u8,
}

impl Default for SpeedLimits {
    fn default() -> Self {
        Self { min: 5, max: 100 }
    }
}

impl SpeedLimits {
    pub fn new(min: u8, max: u8) -> Result<Self> {
        if min >= 100 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "speed min must be < 100",
            )));
        }
        if max > 100 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "speed max must be <= 100",
            )));
        }
        if min > max {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "speed max must be >= min",
            )));
        }
        Ok(Self { min, max })
    }

    #[inline]
    pub fn min(&self) -> u8 {
        self.min
    }

    #[inline]
    pub fn max(&self) -> u8 {
        self.max
    }

    /// Clamp to [-100, 100] then rescale the magnitude into `[min, max]`.
    /// Zero stays zero; the sign is preserved.
    pub fn restrict(&self, requested: i32) -> i32 {
        let s = requested.clamp(-100, 100);
        if s == 0 {
            return 0;
        }
        let min = i32::from(self.min);
        let max = i32::from(self.max);
        let mag = s.abs();
        let out = if mag < min {
            min
        } else {
            min + (mag - min) * (max - min) / (100 - min)
        };
        out * s.signum()
    }
}
