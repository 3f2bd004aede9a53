use rppal::i2c::I2c;
use tracing::trace;

use crate::error::{HwError, Result};

/// Linux I2C bus (`/dev/i2c-N`) driving the board through rppal.
pub struct I2cBus {
    i2c: I2c,
    // Avoid an ioctl per frame when the address does not change.
    selected: Option<u8>,
}

impl I2cBus {
    pub fn open(bus: u8) -> Result<Self> {
        let i2c = I2c::with_bus(bus).map_err(|e| HwError::I2c(e.to_string()))?;
        Ok(Self { i2c, selected: None })
    }

    fn select(&mut self, addr: u8) -> Result<()> {
        if self.selected != Some(addr) {
            self.i2c
                .set_slave_address(u16::from(addr))
                .map_err(|e| HwError::I2c(e.to_string()))?;
            self.selected = Some(addr);
        }
        Ok(())
    }
}

impl nezha_traits::Bus for I2cBus {
    fn write(
        &mut self,
        addr: u8,
        bytes: &[u8],
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.select(addr)?;
        let wrote = self
            .i2c
            .write(bytes)
            .map_err(|e| HwError::I2c(e.to_string()))?;
        if wrote != bytes.len() {
            return Err(Box::new(HwError::ShortWrite {
                expected: bytes.len(),
                wrote,
            }));
        }
        trace!(addr, ?bytes, "i2c write");
        Ok(())
    }

    fn read(
        &mut self,
        addr: u8,
        buf: &mut [u8],
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.select(addr)?;
        let got = self
            .i2c
            .read(buf)
            .map_err(|e| HwError::I2c(e.to_string()))?;
        if got != buf.len() {
            return Err(Box::new(HwError::ShortRead {
                expected: buf.len(),
                got,
            }));
        }
        trace!(addr, ?buf, "i2c read");
        Ok(())
    }
}
