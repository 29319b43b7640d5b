//! Port traits — the hexagonal boundary between the session engine and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ NodeService (domain)
//! ```
//!
//! The routing stack, the radio, the sensor shield, the actuator driver and
//! the indicator LEDs are all collaborators the node consumes but does not
//! implement.  Adapters implement these traits; the
//! [`NodeService`](super::service::NodeService) consumes them via generics,
//! so the protocol core never touches hardware directly and can be driven
//! entirely by mocks.

use std::net::Ipv6Addr;

use crate::error::TransportError;
use crate::fsm::context::{
    EnvironmentSnapshot, Indicator, IndicatorAction, LampStatus, RadioParameters,
};
use crate::protocol::frame::FrameImage;

use super::alerts::OutboundAlert;

// ───────────────────────────────────────────────────────────────
// Routing collaborator
// ───────────────────────────────────────────────────────────────

pub trait RoutingPort {
    /// A default route towards the gateway exists.
    fn is_link_up(&self) -> bool;

    /// Current preferred parent, if any.
    fn next_hop(&self) -> Option<Ipv6Addr>;

    /// Ask the routing layer to repair the DAG.
    fn trigger_route_repair(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Radio parameters (read-only)
// ───────────────────────────────────────────────────────────────

pub trait RadioPort {
    fn read_radio_parameters(&mut self) -> RadioParameters;
}

// ───────────────────────────────────────────────────────────────
// Sensor source
// ───────────────────────────────────────────────────────────────

pub trait SensorPort {
    /// Read every sensor and return a unified snapshot.
    fn read_environment(&mut self) -> EnvironmentSnapshot;
}

// ───────────────────────────────────────────────────────────────
// Actuator transport (serial link to the lamp driver)
// ───────────────────────────────────────────────────────────────

pub trait ActuatorPort {
    /// Drive the lamp output directly.
    fn set_lamp(&mut self, status: LampStatus, dim: u8);

    /// Forward a decrypted command frame to the actuator driver.
    fn forward_frame(&mut self, image: &FrameImage);

    /// Drain pending bytes from the driver.  Returns the count written.
    fn read_from_actuator(&mut self, buf: &mut [u8]) -> usize;
}

// ───────────────────────────────────────────────────────────────
// Indicators
// ───────────────────────────────────────────────────────────────

pub trait IndicatorPort {
    fn set_indicator(&mut self, indicator: Indicator, action: IndicatorAction);
}

// ───────────────────────────────────────────────────────────────
// System control
// ───────────────────────────────────────────────────────────────

pub trait SystemPort {
    /// Restart the device.  On hardware this does not return.
    fn restart(&mut self);
}

/// Every hardware-facing port the node service needs.
pub trait NodeHardware:
    RoutingPort + RadioPort + SensorPort + ActuatorPort + IndicatorPort + SystemPort
{
}

impl<T> NodeHardware for T where
    T: RoutingPort + RadioPort + SensorPort + ActuatorPort + IndicatorPort + SystemPort
{
}

// ───────────────────────────────────────────────────────────────
// Network (outbound datagrams)
// ───────────────────────────────────────────────────────────────

pub trait NetworkPort {
    /// Answer the peer whose frame is being handled.
    fn send_reply(&mut self, image: &FrameImage) -> Result<(), TransportError>;

    /// Send an unsolicited frame to the gateway's alert port once its
    /// jitter delay has elapsed.
    fn send_alert(&mut self, alert: OutboundAlert) -> Result<(), TransportError>;
}
