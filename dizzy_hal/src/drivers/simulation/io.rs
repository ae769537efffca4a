//! Simulation buses.
//!
//! Each bus is a thin handle on the shared [`SimWorld`]: the converter is
//! reached through the real MCP3008 frame codec, servo pulses feed the
//! linked-impact model, and controller lines come from the world's input
//! mode.

use super::world::SharedWorld;
use crate::mcp3008::{SpiTransfer, decode_request, encode_response};
use dizzy_common::hal::driver::{DigitalInputs, HalError, PwmBus};
use std::time::Instant;

/// SPI device answering MCP3008 requests from the world's sensors.
#[derive(Debug, Clone)]
pub struct SimSpi {
    world: SharedWorld,
}

impl SimSpi {
    /// Handle on `world`.
    pub fn new(world: SharedWorld) -> Self {
        Self { world }
    }
}

impl SpiTransfer for SimSpi {
    fn transfer(&mut self, tx: [u8; 3]) -> Result<[u8; 3], HalError> {
        let channel = decode_request(tx).ok_or_else(|| {
            HalError::CommunicationError(format!("malformed MCP3008 request {tx:02x?}"))
        })?;
        let value = self.world.lock().read_sensor(channel, Instant::now())?;
        Ok(encode_response(value))
    }
}

/// Servo outputs feeding the world.
#[derive(Debug, Clone)]
pub struct SimPwmBus {
    world: SharedWorld,
}

impl SimPwmBus {
    /// Handle on `world`.
    pub fn new(world: SharedWorld) -> Self {
        Self { world }
    }
}

impl PwmBus for SimPwmBus {
    fn set_pulse_ms(&mut self, channel: u8, pulse_ms: f64) -> Result<(), HalError> {
        self.world.lock().set_pulse(channel, pulse_ms, Instant::now())
    }

    fn disable(&mut self, channel: u8) -> Result<(), HalError> {
        self.world.lock().disable(channel)
    }
}

/// Controller lines read from the world.
#[derive(Debug, Clone)]
pub struct SimInputs {
    world: SharedWorld,
}

impl SimInputs {
    /// Handle on `world`.
    pub fn new(world: SharedWorld) -> Self {
        Self { world }
    }
}

impl DigitalInputs for SimInputs {
    fn is_pressed(&mut self, line: u8) -> bool {
        self.world.lock().is_pressed(line, Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::simulation::SimWorld;
    use crate::mcp3008::Mcp3008;
    use dizzy_common::config::ArenaConfig;
    use dizzy_common::hal::driver::AnalogBus;

    fn shared() -> SharedWorld {
        let mut config = ArenaConfig::prototype();
        config.simulation.autoplay = false;
        SimWorld::new(&config).unwrap().into_shared()
    }

    #[test]
    fn converter_reads_through_codec() {
        let world = shared();
        let mut adc = Mcp3008::new(SimSpi::new(world.clone()));
        let v = adc.read_channel(0).unwrap();
        assert!((40..=44).contains(&v));

        world.lock().inject_fault(0, true);
        assert!(adc.read_channel(0).is_err());
    }

    #[test]
    fn malformed_frame_rejected() {
        let mut spi = SimSpi::new(shared());
        assert!(matches!(
            spi.transfer([0x00, 0x80, 0x00]),
            Err(HalError::CommunicationError(_))
        ));
    }

    #[test]
    fn pwm_and_inputs_share_world() {
        let world = shared();
        let mut pwm = SimPwmBus::new(world.clone());
        let mut inputs = SimInputs::new(world.clone());

        pwm.set_pulse_ms(4, 1.9).unwrap();
        assert_eq!(world.lock().pulse(4), Some(1.9));
        pwm.disable(4).unwrap();
        assert_eq!(world.lock().pulse(4), None);

        assert!(!inputs.is_pressed(17));
        world.lock().press(17, true);
        assert!(inputs.is_pressed(17));
    }
}
