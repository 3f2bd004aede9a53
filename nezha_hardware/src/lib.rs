#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod i2c;

pub mod error;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use nezha_traits::Bus;
use tracing::trace;

use crate::error::HwError;

/// Default 7-bit address of the NeZha V2 board.
pub const DEFAULT_ADDRESS: u8 = 0x10;

const SYNC: [u8; 2] = [0xFF, 0xF9];

/// Per-connector state of the simulated board.
#[derive(Debug, Default, Clone)]
struct SimMotor {
    /// Aggregate angle in tenths of a degree.
    aggregate_tenths: i32,
    /// Scripted raw speed responses; once drained the motor reports idle.
    speed_script: VecDeque<u16>,
}

#[derive(Debug)]
struct BoardState {
    motors: [SimMotor; 4],
    frames: Vec<[u8; 8]>,
    // (opcode, connector) of the last read request
    pending: Option<(u8, u8)>,
    version: [u8; 3],
    fail_writes: usize,
    fail_reads: usize,
    writes_attempted: usize,
}

impl Default for BoardState {
    fn default() -> Self {
        Self {
            motors: Default::default(),
            frames: Vec::new(),
            pending: None,
            version: [1, 0, 0],
            fail_writes: 0,
            fail_reads: 0,
            writes_attempted: 0,
        }
    }
}

impl BoardState {
    fn motor_mut(&mut self, connector: u8) -> Option<&mut SimMotor> {
        let idx = usize::from(connector).checked_sub(1)?;
        self.motors.get_mut(idx)
    }

    /// Apply the side effects a real board would perform for a command frame.
    fn apply(&mut self, f: &[u8; 8]) {
        let (connector, direction, opcode) = (f[2], f[3], f[4]);
        let value = i32::from(u16::from_be_bytes([f[5], f[7]]));
        let sign = if direction == 2 { -1 } else { 1 };
        match opcode {
            0x47 | 0x46 => self.pending = Some((opcode, connector)),
            0x88 => self.pending = Some((opcode, 0)),
            // run-for in degrees or turns moves the shaft instantly
            0x70 => {
                let tenths = match f[6] {
                    1 => value * 3600,
                    2 => value * 10,
                    _ => 0,
                };
                if let Some(m) = self.motor_mut(connector) {
                    m.aggregate_tenths += sign * tenths;
                }
            }
            0x5D => {
                if let Some(m) = self.motor_mut(connector) {
                    let turns = m.aggregate_tenths.div_euclid(3600);
                    m.aggregate_tenths = turns * 3600 + value * 10;
                }
            }
            _ => {}
        }
    }

    fn respond(&mut self, buf: &mut [u8]) -> Result<(), HwError> {
        let (opcode, connector) = self.pending.take().ok_or(HwError::NoPendingRequest)?;
        let response: Vec<u8> = match opcode {
            0x47 => {
                let raw = self
                    .motor_mut(connector)
                    .and_then(|m| m.speed_script.pop_front())
                    .unwrap_or(0);
                raw.to_le_bytes().to_vec()
            }
            0x46 => {
                let tenths = self
                    .motor_mut(connector)
                    .map(|m| m.aggregate_tenths)
                    .unwrap_or(0);
                tenths.to_le_bytes().to_vec()
            }
            _ => self.version.to_vec(),
        };
        if response.len() < buf.len() {
            return Err(HwError::ShortRead {
                expected: buf.len(),
                got: response.len(),
            });
        }
        buf.copy_from_slice(&response[..buf.len()]);
        Ok(())
    }
}

/// Simulated NeZha V2 board.
///
/// Records every frame written, answers telemetry requests from scripted
/// state, and moves the simulated shafts instantly on positional commands.
/// Clones share the same board, so a test can keep a handle after moving
/// the bus into the driver.
#[derive(Debug, Clone, Default)]
pub struct SimulatedBoard {
    state: Arc<Mutex<BoardState>>,
}

impl SimulatedBoard {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Every well-formed frame written so far, in order.
    pub fn frames(&self) -> Vec<[u8; 8]> {
        self.lock().frames.clone()
    }

    /// Frames written so far carrying `opcode`.
    pub fn frames_with_opcode(&self, opcode: u8) -> Vec<[u8; 8]> {
        self.lock()
            .frames
            .iter()
            .filter(|f| f[4] == opcode)
            .copied()
            .collect()
    }

    pub fn clear_frames(&self) {
        self.lock().frames.clear();
    }

    /// Number of write transactions attempted, including failed ones.
    pub fn writes_attempted(&self) -> usize {
        self.lock().writes_attempted
    }

    /// Set the aggregate angle of `connector` (1..=4) in tenths of a degree.
    pub fn set_aggregate_tenths(&self, connector: u8, tenths: i32) {
        if let Some(m) = self.lock().motor_mut(connector) {
            m.aggregate_tenths = tenths;
        }
    }

    pub fn aggregate_tenths(&self, connector: u8) -> i32 {
        self.lock()
            .motor_mut(connector)
            .map(|m| m.aggregate_tenths)
            .unwrap_or(0)
    }

    /// Queue raw speed responses for `connector`; each read consumes one.
    pub fn script_speed(&self, connector: u8, raw: impl IntoIterator<Item = u16>) {
        if let Some(m) = self.lock().motor_mut(connector) {
            m.speed_script.extend(raw);
        }
    }

    pub fn set_version(&self, version: [u8; 3]) {
        self.lock().version = version;
    }

    /// Fail the next `n` write transactions.
    pub fn fail_next_writes(&self, n: usize) {
        self.lock().fail_writes = n;
    }

    /// Fail the next `n` read transactions.
    pub fn fail_next_reads(&self, n: usize) {
        self.lock().fail_reads = n;
    }
}

impl Bus for SimulatedBoard {
    fn write(
        &mut self,
        addr: u8,
        bytes: &[u8],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut st = self.lock();
        st.writes_attempted += 1;
        if st.fail_writes > 0 {
            st.fail_writes -= 1;
            return Err(Box::new(HwError::Injected));
        }
        let frame: [u8; 8] = bytes
            .try_into()
            .map_err(|_| HwError::BadFrame(bytes.len()))?;
        if frame[..2] != SYNC {
            return Err(Box::new(HwError::BadFrame(bytes.len())));
        }
        trace!(addr, ?frame, "sim frame");
        st.apply(&frame);
        st.frames.push(frame);
        Ok(())
    }

    fn read(
        &mut self,
        _addr: u8,
        buf: &mut [u8],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut st = self.lock();
        if st.fail_reads > 0 {
            st.fail_reads -= 1;
            st.pending = None;
            return Err(Box::new(HwError::Injected));
        }
        st.respond(buf).map_err(Into::into)
    }
}
