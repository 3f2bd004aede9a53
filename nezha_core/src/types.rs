//! Connector, direction, and mode enums shared by the codec and the drivers.
//!
//! Wire values match the board firmware: connectors are 1-based, every
//! mode/direction enum starts at 1.

use std::fmt;
use std::str::FromStr;

/// One of the four motor ports of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum MotorConnector {
    M1 = 1,
    M2 = 2,
    M3 = 3,
    M4 = 4,
}

impl MotorConnector {
    /// All connectors in the fixed M1..M4 order used by stop-all.
    pub const ALL: [Self; 4] = [Self::M1, Self::M2, Self::M3, Self::M4];

    /// Zero-based index into per-motor state.
    #[inline]
    pub fn index(self) -> usize {
        usize::from(self as u8) - 1
    }

    #[inline]
    pub fn wire(self) -> u8 {
        self as u8
    }

    pub fn from_wire(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::M1),
            2 => Some(Self::M2),
            3 => Some(Self::M3),
            4 => Some(Self::M4),
            _ => None,
        }
    }
}

impl fmt::Display for MotorConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M{}", self.wire())
    }
}

impl FromStr for MotorConnector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().trim_start_matches(['M', 'm']);
        digits
            .parse::<u8>()
            .ok()
            .and_then(Self::from_wire)
            .ok_or_else(|| format!("unknown motor connector `{s}` (expected M1..M4)"))
    }
}

/// Unit of the `value` argument of timed/positional commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MovementMode {
    Turns = 1,
    Degrees = 2,
    Seconds = 3,
}

impl MovementMode {
    #[inline]
    pub fn wire(self) -> u8 {
        self as u8
    }

    pub fn from_wire(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Turns),
            2 => Some(Self::Degrees),
            3 => Some(Self::Seconds),
            _ => None,
        }
    }
}

impl FromStr for MovementMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "turns" | "turn" => Ok(Self::Turns),
            "degrees" | "deg" => Ok(Self::Degrees),
            "seconds" | "sec" | "s" => Ok(Self::Seconds),
            other => Err(format!(
                "unknown movement mode `{other}` (expected turns, degrees, seconds)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RotationDirection {
    Cw = 1,
    Ccw = 2,
}

impl RotationDirection {
    /// Positive speeds turn clockwise; zero and negative speeds encode as CCW.
    #[inline]
    pub fn from_speed(speed: i32) -> Self {
        if speed > 0 { Self::Cw } else { Self::Ccw }
    }

    #[inline]
    pub fn wire(self) -> u8 {
        self as u8
    }

    pub fn from_wire(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Cw),
            2 => Some(Self::Ccw),
            _ => None,
        }
    }
}

/// Direction policy for absolute-angle seeks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServoMovementMode {
    ShortestPath = 1,
    Cw = 2,
    Ccw = 3,
}

impl ServoMovementMode {
    #[inline]
    pub fn wire(self) -> u8 {
        self as u8
    }
}

impl FromStr for ServoMovementMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shortest" | "shortest-path" => Ok(Self::ShortestPath),
            "cw" => Ok(Self::Cw),
            "ccw" => Ok(Self::Ccw),
            other => Err(format!(
                "unknown seek mode `{other}` (expected shortest, cw, ccw)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinearDirection {
    Forward,
    Backward,
}

impl LinearDirection {
    #[inline]
    pub fn apply(self, speed: i32) -> i32 {
        match self {
            Self::Forward => speed,
            Self::Backward => -speed,
        }
    }
}

impl FromStr for LinearDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forward" | "fwd" => Ok(Self::Forward),
            "backward" | "back" => Ok(Self::Backward),
            other => Err(format!(
                "unknown direction `{other}` (expected forward, backward)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnDirection {
    Left,
    Right,
}

impl FromStr for TurnDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            other => Err(format!("unknown turn direction `{other}` (expected left, right)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceUnit {
    #[default]
    Cm,
    Inch,
}

impl DistanceUnit {
    /// Convert a length in this unit to millimetres.
    #[inline]
    pub fn to_mm(self, value: f32) -> f32 {
        match self {
            Self::Cm => value * 10.0,
            Self::Inch => value * 2.54 * 10.0,
        }
    }
}

impl FromStr for DistanceUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cm" => Ok(Self::Cm),
            "inch" | "in" => Ok(Self::Inch),
            other => Err(format!("unknown unit `{other}` (expected cm, inch)")),
        }
    }
}
