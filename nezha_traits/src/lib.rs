pub mod clock;

pub use clock::{Clock, MonotonicClock, wait_until};

/// Two-wire bus carrying command frames to the motor board and telemetry back.
///
/// Only one exchange may be in flight at a time; callers serialize access.
pub trait Bus {
    /// Write `bytes` to the device at `addr` in a single transaction.
    fn write(
        &mut self,
        addr: u8,
        bytes: &[u8],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Fill `buf` from the device at `addr`. A short read is an error.
    fn read(
        &mut self,
        addr: u8,
        buf: &mut [u8],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<B: Bus + ?Sized> Bus for Box<B> {
    fn write(
        &mut self,
        addr: u8,
        bytes: &[u8],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).write(addr, bytes)
    }

    fn read(
        &mut self,
        addr: u8,
        buf: &mut [u8],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).read(addr, buf)
    }
}
