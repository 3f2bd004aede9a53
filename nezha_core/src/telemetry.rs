//! Per-motor cache of the last speed and aggregate-angle readings.
//!
//! A reading younger than the staleness window is served without touching the
//! bus. Each (motor, kind) pair has an in-flight flag: a caller that finds a
//! read already running gets the cached value instead of queueing a second
//! transaction.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::types::MotorConnector;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryKind {
    Speed,
    Angle,
}

impl TelemetryKind {
    #[inline]
    fn slot(self) -> usize {
        match self {
            Self::Speed => 0,
            Self::Angle => 1,
        }
    }

    /// Pause between the request frame and the response read.
    pub fn settle_pause(self) -> Duration {
        match self {
            Self::Speed => Duration::from_millis(3),
            Self::Angle => Duration::from_millis(4),
        }
    }
}

/// Last completed readings for one motor; `None` timestamps mean never read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TelemetryEntry {
    pub speed: i32,
    pub speed_at: Option<Instant>,
    pub angle: i32,
    pub angle_at: Option<Instant>,
}

impl TelemetryEntry {
    fn get(&self, kind: TelemetryKind) -> (i32, Option<Instant>) {
        match kind {
            TelemetryKind::Speed => (self.speed, self.speed_at),
            TelemetryKind::Angle => (self.angle, self.angle_at),
        }
    }
}

/// Clears the in-flight flag when dropped.
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[derive(Debug)]
pub struct TelemetryCache {
    staleness: Duration,
    entries: Mutex<[TelemetryEntry; 4]>,
    in_flight: [[AtomicBool; 2]; 4],
}

impl TelemetryCache {
    pub fn new(staleness: Duration) -> Self {
        Self {
            staleness,
            entries: Mutex::new([TelemetryEntry::default(); 4]),
            in_flight: std::array::from_fn(|_| [AtomicBool::new(false), AtomicBool::new(false)]),
        }
    }

    #[inline]
    pub fn staleness(&self) -> Duration {
        self.staleness
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, [TelemetryEntry; 4]> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn entry(&self, motor: MotorConnector) -> TelemetryEntry {
        self.entries()[motor.index()]
    }

    /// Cached value if it was read less than the staleness window before `now`.
    pub fn fresh(&self, motor: MotorConnector, kind: TelemetryKind, now: Instant) -> Option<i32> {
        let (value, at) = self.entry(motor).get(kind);
        let at = at?;
        (now.saturating_duration_since(at) < self.staleness).then_some(value)
    }

    /// Last stored value regardless of age (0 before the first read).
    pub fn cached(&self, motor: MotorConnector, kind: TelemetryKind) -> i32 {
        self.entry(motor).get(kind).0
    }

    /// Claim the in-flight slot; `None` if another read of the same kind is running.
    pub fn begin_read(
        &self,
        motor: MotorConnector,
        kind: TelemetryKind,
    ) -> Option<InFlightGuard<'_>> {
        let flag = &self.in_flight[motor.index()][kind.slot()];
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard { flag })
    }

    pub fn store(&self, motor: MotorConnector, kind: TelemetryKind, value: i32, at: Instant) {
        let mut entries = self.entries();
        let e = &mut entries[motor.index()];
        match kind {
            TelemetryKind::Speed => {
                e.speed = value;
                e.speed_at = Some(at);
            }
            TelemetryKind::Angle => {
                e.angle = value;
                e.angle_at = Some(at);
            }
        }
    }
}
