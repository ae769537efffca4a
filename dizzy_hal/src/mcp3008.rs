//! MCP3008 10-bit, 8-channel converter over SPI.
//!
//! A single-ended conversion is one 3-byte full-duplex transfer:
//!
//! ```text
//! tx: 0000_0001  1ccc_0000  0000_0000     (start bit, single-ended, channel)
//! rx: xxxx_xxxx  xxxx_x0vv  vvvv_vvvv     (null bit, 10-bit value)
//! ```

use dizzy_common::consts::{ADC_MAX, MAX_ADC_CHANNELS};
use dizzy_common::hal::driver::{AnalogBus, HalError};

/// Full-duplex 3-byte SPI transfer.
pub trait SpiTransfer: Send {
    /// Clock out `tx` and return the bytes clocked in.
    fn transfer(&mut self, tx: [u8; 3]) -> Result<[u8; 3], HalError>;

    /// Close the device.
    fn close(&mut self) -> Result<(), HalError> {
        Ok(())
    }
}

/// Request frame for a single-ended read of `channel`.
pub fn request_frame(channel: u8) -> Result<[u8; 3], HalError> {
    if channel as usize >= MAX_ADC_CHANNELS {
        return Err(HalError::invalid_channel(
            channel,
            "MCP3008 has channels 0..=7",
        ));
    }
    Ok([0x01, (0x08 | channel) << 4, 0x00])
}

/// Channel addressed by a request frame, if it is a single-ended read.
pub fn decode_request(tx: [u8; 3]) -> Option<u8> {
    if tx[0] != 0x01 || tx[1] & 0x80 == 0 {
        return None;
    }
    Some((tx[1] >> 4) & 0x07)
}

/// 10-bit value of a response frame.
#[inline]
pub fn decode_response(rx: [u8; 3]) -> u16 {
    (u16::from(rx[1] & 0x03) << 8) | u16::from(rx[2])
}

/// Response frame carrying `value` (saturated to 10 bits).
#[inline]
pub fn encode_response(value: u16) -> [u8; 3] {
    let value = value.min(ADC_MAX);
    [0x00, ((value >> 8) & 0x03) as u8, (value & 0xFF) as u8]
}

/// MCP3008 on an SPI transfer.
#[derive(Debug)]
pub struct Mcp3008<S> {
    spi: S,
}

impl<S: SpiTransfer> Mcp3008<S> {
    /// Wrap an open SPI device.
    pub fn new(spi: S) -> Self {
        Self { spi }
    }

    /// The underlying transfer.
    pub fn spi(&self) -> &S {
        &self.spi
    }
}

impl<S: SpiTransfer> AnalogBus for Mcp3008<S> {
    fn read_channel(&mut self, channel: u8) -> Result<u16, HalError> {
        let tx = request_frame(channel)?;
        let rx = self.spi.transfer(tx)?;
        Ok(decode_response(rx))
    }

    fn release(&mut self) -> Result<(), HalError> {
        self.spi.close()
    }
}
