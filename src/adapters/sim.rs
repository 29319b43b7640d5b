//! Simulated collaborators for running the node without a radio.
//!
//! The routing stack always reports a route, the radio returns fixed link
//! figures and the sensor shield returns dump values.  Lamp and forwarded
//! frames are only logged.  Indicators go through the real
//! [`IndicatorBank`] driver over in-memory pins.

use core::convert::Infallible;
use std::net::Ipv6Addr;

use embedded_hal::digital::{ErrorType, OutputPin, StatefulOutputPin};
use log::{debug, info, warn};

use crate::app::ports::{
    ActuatorPort, IndicatorPort, RadioPort, RoutingPort, SensorPort, SystemPort,
};
use crate::drivers::indicator::IndicatorBank;
use crate::fsm::context::{
    EnvironmentSnapshot, Indicator, IndicatorAction, LampStatus, RadioParameters,
};
use crate::protocol::frame::{CommandFrame, FrameImage};

/// Dump sensor values reported when no shield is fitted.
pub const DUMP_ENVIRONMENT: EnvironmentSnapshot = EnvironmentSnapshot {
    temperature: 375,
    light: 405,
    pressure: 750,
    humidity: 9700,
};

const SIM_RADIO: RadioParameters = RadioParameters {
    channel: 26,
    rssi: -45,
    lqi: 107,
    tx_power: 0,
};

const SIM_NEXT_HOP: Ipv6Addr = Ipv6Addr::new(0xfe80, 0, 0, 0, 0x0212, 0x4b00, 0x0615, 0xa4c1);

// ── In-memory output pin ──────────────────────────────────────

#[derive(Debug, Default)]
pub struct SimPin {
    high: bool,
}

impl SimPin {
    pub fn is_lit(&self) -> bool {
        self.high
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.high = true;
        Ok(())
    }
}

impl StatefulOutputPin for SimPin {
    fn is_set_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.high)
    }

    fn is_set_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.high)
    }
}

// ── SimulatedHardware ─────────────────────────────────────────

pub struct SimulatedHardware {
    indicators: IndicatorBank<SimPin, SimPin>,
    link_up: bool,
    lamp: (LampStatus, u8),
    actuator_rx: std::vec::Vec<u8>,
    restarts: u32,
}

impl SimulatedHardware {
    pub fn new() -> Self {
        Self {
            indicators: IndicatorBank::new(SimPin::default(), SimPin::default()),
            link_up: true,
            lamp: (LampStatus::On, 80),
            actuator_rx: std::vec::Vec::new(),
            restarts: 0,
        }
    }

    /// Simulate losing or regaining the route to the gateway.
    pub fn set_link_up(&mut self, up: bool) {
        self.link_up = up;
    }

    /// Queue bytes as if the actuator driver had sent them.
    pub fn inject_actuator_bytes(&mut self, data: &[u8]) {
        self.actuator_rx.extend_from_slice(data);
    }

    pub fn lamp(&self) -> (LampStatus, u8) {
        self.lamp
    }

    pub fn restarts(&self) -> u32 {
        self.restarts
    }
}

impl Default for SimulatedHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl RoutingPort for SimulatedHardware {
    fn is_link_up(&self) -> bool {
        self.link_up
    }

    fn next_hop(&self) -> Option<Ipv6Addr> {
        self.link_up.then_some(SIM_NEXT_HOP)
    }

    fn trigger_route_repair(&mut self) {
        warn!("sim: global route repair requested");
    }
}

impl RadioPort for SimulatedHardware {
    fn read_radio_parameters(&mut self) -> RadioParameters {
        SIM_RADIO
    }
}

impl SensorPort for SimulatedHardware {
    fn read_environment(&mut self) -> EnvironmentSnapshot {
        DUMP_ENVIRONMENT
    }
}

impl ActuatorPort for SimulatedHardware {
    fn set_lamp(&mut self, status: LampStatus, dim: u8) {
        info!("sim: lamp {:?}, dim {}", status, dim);
        self.lamp = (status, dim);
    }

    fn forward_frame(&mut self, image: &FrameImage) {
        let frame = CommandFrame::from_image(image);
        info!(
            "sim: forward {:?} [{}] to actuator driver",
            frame.command, frame.sequence
        );
    }

    fn read_from_actuator(&mut self, buf: &mut [u8]) -> usize {
        let n = self.actuator_rx.len().min(buf.len());
        buf[..n].copy_from_slice(&self.actuator_rx[..n]);
        self.actuator_rx.drain(..n);
        n
    }
}

impl IndicatorPort for SimulatedHardware {
    fn set_indicator(&mut self, indicator: Indicator, action: IndicatorAction) {
        debug!("sim: {:?} indicator {:?}", indicator, action);
        self.indicators.set_indicator(indicator, action);
    }
}

impl SystemPort for SimulatedHardware {
    fn restart(&mut self) {
        self.restarts += 1;
        self.indicators.clear();
        self.actuator_rx.clear();
        self.lamp = (LampStatus::On, 80);
        warn!("sim: restart #{}", self.restarts);
    }
}
