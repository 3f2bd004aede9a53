//! Duration estimate for timed and positional moves.
//!
//! Servo moves run at `|speed| * 9` deg/s on the firmware side plus a fixed
//! 500 ms ramp allowance. The result bounds how long a blocking call polls.

use crate::types::MovementMode;

/// Firmware speed scale used by the estimate, independent of the device gain.
pub const ESTIMATE_SPEED_SCALE: f64 = 9.0;
/// Acceleration/deceleration allowance added to rotational moves.
pub const RAMP_ALLOWANCE_MS: f64 = 500.0;

/// Expected wall time in ms for a move; 0 when `value` or `speed` is 0.
pub fn estimate_duration_ms(speed: i32, value: f32, mode: MovementMode) -> u64 {
    let value = f64::from(value).abs();
    if value == 0.0 || speed == 0 || !value.is_finite() {
        return 0;
    }
    let scaled = f64::from(speed.unsigned_abs()) * ESTIMATE_SPEED_SCALE;
    let ms = match mode {
        MovementMode::Turns => value * 360_000.0 / scaled + RAMP_ALLOWANCE_MS,
        MovementMode::Seconds => value * 1000.0,
        MovementMode::Degrees => value * 1000.0 / scaled + RAMP_ALLOWANCE_MS,
    };
    // `as` saturates for out-of-range floats
    ms.ceil() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(50, 1.0, MovementMode::Turns, 1300)]
    #[case(100, 360.0, MovementMode::Degrees, 900)]
    #[case(-100, 360.0, MovementMode::Degrees, 900)]
    #[case(30, 2.5, MovementMode::Seconds, 2500)]
    #[case(7, 10.0, MovementMode::Degrees, 659)]
    #[case(0, 10.0, MovementMode::Turns, 0)]
    #[case(40, 0.0, MovementMode::Seconds, 0)]
    fn estimates(
        #[case] speed: i32,
        #[case] value: f32,
        #[case] mode: MovementMode,
        #[case] expected: u64,
    ) {
        assert_eq!(estimate_duration_ms(speed, value, mode), expected);
    }

    #[test]
    fn negative_values_use_magnitude() {
        assert_eq!(
            estimate_duration_ms(50, -1.0, MovementMode::Turns),
            estimate_duration_ms(50, 1.0, MovementMode::Turns)
        );
    }
}
