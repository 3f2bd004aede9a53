//! Fixed 8-byte command frames exchanged with the board.
//!
//! Layout: `[0xFF, 0xF9, connector, direction, opcode, b5, b6, b7]`.
//! 16-bit payloads are split big-endian across bytes 5 and 7 with byte 6
//! carrying the mode (run-for, seek) or a constant filler. Telemetry
//! responses are little-endian.

use std::fmt;

use crate::types::{MotorConnector, MovementMode, RotationDirection, ServoMovementMode};

pub const FRAME_LEN: usize = 8;
/// Frame sync marker carried in bytes 0 and 1.
pub const SYNC: [u8; 2] = [0xFF, 0xF9];
/// Filler byte used by run-continuous and telemetry requests.
const FILL: u8 = 0xF5;

pub const SPEED_RESPONSE_LEN: usize = 2;
pub const ANGLE_RESPONSE_LEN: usize = 4;
pub const VERSION_RESPONSE_LEN: usize = 3;

pub type Frame = [u8; FRAME_LEN];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    RunContinuous = 0x60,
    RunFor = 0x70,
    ServoSpeed = 0x77,
    SeekAbsolute = 0x5D,
    ReadSpeed = 0x47,
    ReadAggregateAngle = 0x46,
    ReadVersion = 0x88,
}

impl Opcode {
    pub fn from_byte(b: u8) -> Option<Self> {
        Some(match b {
            0x60 => Self::RunContinuous,
            0x70 => Self::RunFor,
            0x77 => Self::ServoSpeed,
            0x5D => Self::SeekAbsolute,
            0x47 => Self::ReadSpeed,
            0x46 => Self::ReadAggregateAngle,
            0x88 => Self::ReadVersion,
            _ => return None,
        })
    }

    /// Length of the response the board returns after this request, if any.
    pub fn response_len(self) -> Option<usize> {
        match self {
            Self::ReadSpeed => Some(SPEED_RESPONSE_LEN),
            Self::ReadAggregateAngle => Some(ANGLE_RESPONSE_LEN),
            Self::ReadVersion => Some(VERSION_RESPONSE_LEN),
            _ => None,
        }
    }
}

#[inline]
fn build(connector: u8, direction: u8, opcode: Opcode, b5: u8, b6: u8, b7: u8) -> Frame {
    [SYNC[0], SYNC[1], connector, direction, opcode as u8, b5, b6, b7]
}

/// Opcode carried by a frame, if the sync marker and opcode are valid.
pub fn opcode_of(frame: &Frame) -> Option<Opcode> {
    if frame[..2] != SYNC {
        return None;
    }
    Opcode::from_byte(frame[4])
}

/// Byte layout of the run-continuous payload (bytes 5..7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunFrameLayout {
    /// `[0x00, 0x00, speed]`
    #[default]
    Standard,
    /// `[speed, 0xF5, 0x00]`, as sent by the vendor firmware extension.
    Firmware,
}

pub fn run_continuous(
    motor: MotorConnector,
    direction: RotationDirection,
    speed: u8,
    layout: RunFrameLayout,
) -> Frame {
    let (b5, b6, b7) = match layout {
        RunFrameLayout::Standard => (0x00, 0x00, speed),
        RunFrameLayout::Firmware => (speed, FILL, 0x00),
    };
    build(
        motor.wire(),
        direction.wire(),
        Opcode::RunContinuous,
        b5,
        b6,
        b7,
    )
}

pub fn run_for(
    motor: MotorConnector,
    direction: RotationDirection,
    value: u16,
    mode: MovementMode,
) -> Frame {
    let [hi, lo] = value.to_be_bytes();
    build(
        motor.wire(),
        direction.wire(),
        Opcode::RunFor,
        hi,
        mode.wire(),
        lo,
    )
}

/// Servo speed profile for the next positional move; `scaled` is already
/// multiplied by the device gain.
pub fn set_servo_speed(motor: MotorConnector, scaled: u16) -> Frame {
    let [hi, lo] = scaled.to_be_bytes();
    build(motor.wire(), 0x00, Opcode::ServoSpeed, hi, 0x00, lo)
}

/// Firmware-side seek to `angle` degrees (0..360).
pub fn seek_absolute(motor: MotorConnector, angle: u16, mode: ServoMovementMode) -> Frame {
    let [hi, lo] = angle.to_be_bytes();
    build(
        motor.wire(),
        0x00,
        Opcode::SeekAbsolute,
        hi,
        mode.wire(),
        lo,
    )
}

pub fn read_speed(motor: MotorConnector) -> Frame {
    build(motor.wire(), 0x00, Opcode::ReadSpeed, 0x00, FILL, 0x00)
}

pub fn read_aggregate_angle(motor: MotorConnector) -> Frame {
    build(
        motor.wire(),
        0x00,
        Opcode::ReadAggregateAngle,
        0x00,
        FILL,
        0x00,
    )
}

pub fn read_version() -> Frame {
    build(0x00, 0x00, Opcode::ReadVersion, 0x00, 0x00, 0x00)
}

/// Speed response: unsigned little-endian raw units scaled then floored.
#[inline]
pub fn decode_speed(raw: [u8; SPEED_RESPONSE_LEN], rpm_per_raw_unit: f32) -> i32 {
    let units = f64::from(u16::from_le_bytes(raw));
    (units * f64::from(rpm_per_raw_unit)).floor() as i32
}

/// Aggregate angle response: signed little-endian tenths of a degree,
/// rounded to whole degrees.
#[inline]
pub fn decode_aggregate_angle(raw: [u8; ANGLE_RESPONSE_LEN]) -> i32 {
    (f64::from(i32::from_le_bytes(raw)) * 0.1).round() as i32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[inline]
pub fn decode_version(raw: [u8; VERSION_RESPONSE_LEN]) -> FirmwareVersion {
    FirmwareVersion {
        major: raw[0],
        minor: raw[1],
        patch: raw[2],
    }
}

/// Fields of a decoded run-for frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunForFrame {
    pub motor: MotorConnector,
    pub direction: RotationDirection,
    pub value: u16,
    pub mode: MovementMode,
}

pub fn parse_run_for(frame: &Frame) -> Option<RunForFrame> {
    if opcode_of(frame)? != Opcode::RunFor {
        return None;
    }
    Some(RunForFrame {
        motor: MotorConnector::from_wire(frame[2])?,
        direction: RotationDirection::from_wire(frame[3])?,
        value: u16::from_be_bytes([frame[5], frame[7]]),
        mode: MovementMode::from_wire(frame[6])?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_continuous_puts_speed_in_low_byte() {
        let f = run_continuous(
            MotorConnector::M3,
            RotationDirection::Cw,
            42,
            RunFrameLayout::Standard,
        );
        assert_eq!(f, [0xFF, 0xF9, 0x03, 0x01, 0x60, 0x00, 0x00, 42]);
    }

    #[test]
    fn run_continuous_firmware_layout() {
        let f = run_continuous(
            MotorConnector::M1,
            RotationDirection::Ccw,
            50,
            RunFrameLayout::Firmware,
        );
        assert_eq!(f, [0xFF, 0xF9, 0x01, 0x02, 0x60, 50, 0xF5, 0x00]);
        assert_eq!(RunFrameLayout::default(), RunFrameLayout::Standard);
    }

    #[test]
    fn run_for_splits_value_around_mode() {
        let f = run_for(
            MotorConnector::M1,
            RotationDirection::Ccw,
            0x0102,
            MovementMode::Seconds,
        );
        assert_eq!(f, [0xFF, 0xF9, 0x01, 0x02, 0x70, 0x01, 0x03, 0x02]);
    }

    #[test]
    fn run_for_round_trip_recovers_fields() {
        let f = run_for(
            MotorConnector::M2,
            RotationDirection::Cw,
            180,
            MovementMode::Degrees,
        );
        let parsed = parse_run_for(&f).expect("run-for frame");
        assert_eq!(
            parsed,
            RunForFrame {
                motor: MotorConnector::M2,
                direction: RotationDirection::Cw,
                value: 180,
                mode: MovementMode::Degrees,
            }
        );
    }

    #[test]
    fn servo_speed_and_seek_layouts() {
        assert_eq!(
            set_servo_speed(MotorConnector::M4, 900),
            [0xFF, 0xF9, 0x04, 0x00, 0x77, 0x03, 0x00, 0x84]
        );
        assert_eq!(
            seek_absolute(MotorConnector::M1, 270, ServoMovementMode::Ccw),
            [0xFF, 0xF9, 0x01, 0x00, 0x5D, 0x01, 0x03, 0x0E]
        );
    }

    #[test]
    fn telemetry_requests() {
        assert_eq!(
            read_speed(MotorConnector::M2),
            [0xFF, 0xF9, 0x02, 0x00, 0x47, 0x00, 0xF5, 0x00]
        );
        assert_eq!(
            read_aggregate_angle(MotorConnector::M2),
            [0xFF, 0xF9, 0x02, 0x00, 0x46, 0x00, 0xF5, 0x00]
        );
        assert_eq!(read_version(), [0xFF, 0xF9, 0, 0, 0x88, 0, 0, 0]);
        assert_eq!(Opcode::ReadVersion.response_len(), Some(3));
        assert_eq!(Opcode::RunFor.response_len(), None);
    }

    #[test]
    fn decodes_responses() {
        // 1000 raw units at 0.17 -> 170
        assert_eq!(decode_speed(1000u16.to_le_bytes(), 0.17), 170);
        // floor, not round
        assert_eq!(decode_speed(11u16.to_le_bytes(), 0.17), 1);
        assert_eq!(decode_aggregate_angle((-4500i32).to_le_bytes()), -450);
        assert_eq!(decode_aggregate_angle(3596i32.to_le_bytes()), 360);
        assert_eq!(decode_version([1, 2, 3]).to_string(), "1.2.3");
    }

    #[test]
    fn parse_rejects_other_frames() {
        assert!(parse_run_for(&read_speed(MotorConnector::M1)).is_none());
        let mut bad = run_for(
            MotorConnector::M1,
            RotationDirection::Cw,
            1,
            MovementMode::Turns,
        );
        bad[0] = 0x00;
        assert!(parse_run_for(&bad).is_none());
        assert_eq!(opcode_of(&bad), None);
    }
}
