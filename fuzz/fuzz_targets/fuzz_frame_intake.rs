//! Fuzz target: `NodeService::handle_frame`
//!
//! Feeds arbitrary datagrams to a node, first unkeyed, then keyed, and
//! checks that intake never panics and that every reply is one frame.
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - Non-frame-sized datagrams are rejected with an error, never answered
//! - Replies are always exactly 64 bytes
//!
//! cargo fuzz run fuzz_frame_intake

#![no_main]

use std::net::Ipv6Addr;

use libfuzzer_sys::fuzz_target;
use sls_node::app::alerts::OutboundAlert;
use sls_node::app::ports::{
    ActuatorPort, IndicatorPort, NetworkPort, RadioPort, RoutingPort, SensorPort, SystemPort,
};
use sls_node::app::service::NodeService;
use sls_node::config::NodeConfig;
use sls_node::error::TransportError;
use sls_node::fsm::context::{
    EnvironmentSnapshot, Indicator, IndicatorAction, LampStatus, RadioParameters,
};
use sls_node::protocol::frame::{CommandCode, CommandFrame, FRAME_LEN, FrameImage, MsgKind};

struct NullHw;

impl RoutingPort for NullHw {
    fn is_link_up(&self) -> bool {
        true
    }
    fn next_hop(&self) -> Option<Ipv6Addr> {
        None
    }
    fn trigger_route_repair(&mut self) {}
}
impl RadioPort for NullHw {
    fn read_radio_parameters(&mut self) -> RadioParameters {
        RadioParameters::default()
    }
}
impl SensorPort for NullHw {
    fn read_environment(&mut self) -> EnvironmentSnapshot {
        EnvironmentSnapshot::default()
    }
}
impl ActuatorPort for NullHw {
    fn set_lamp(&mut self, _status: LampStatus, _dim: u8) {}
    fn forward_frame(&mut self, _image: &FrameImage) {}
    fn read_from_actuator(&mut self, _buf: &mut [u8]) -> usize {
        0
    }
}
impl IndicatorPort for NullHw {
    fn set_indicator(&mut self, _indicator: Indicator, _action: IndicatorAction) {}
}
impl SystemPort for NullHw {
    fn restart(&mut self) {}
}

#[derive(Default)]
struct CountingNet {
    replies: usize,
}

impl NetworkPort for CountingNet {
    fn send_reply(&mut self, image: &FrameImage) -> Result<(), TransportError> {
        assert_eq!(image.len(), FRAME_LEN);
        self.replies += 1;
        Ok(())
    }
    fn send_alert(&mut self, _alert: OutboundAlert) -> Result<(), TransportError> {
        Ok(())
    }
}

fuzz_target!(|data: &[u8]| {
    let mut hw = NullHw;
    let mut net = CountingNet::default();
    let mut svc = NodeService::with_seed(NodeConfig::default(), 0);

    for chunk in data.chunks(FRAME_LEN + 3) {
        let result = svc.handle_frame(&mut hw, &mut net, chunk);
        if chunk.len() != FRAME_LEN {
            assert!(result.is_err());
        }
    }

    let mut key = CommandFrame::new(MsgKind::Hello, CommandCode::SetAppKey);
    key.args[16] = data.first().copied().unwrap_or(1);
    let _ = svc.handle_frame(&mut hw, &mut net, &key.to_image());

    for chunk in data.chunks(FRAME_LEN) {
        let before = net.replies;
        let result = svc.handle_frame(&mut hw, &mut net, chunk);
        if chunk.len() != FRAME_LEN {
            assert!(result.is_err());
            assert_eq!(net.replies, before);
        }
    }
});
