//! Mock collaborators for integration tests.
//!
//! Records every hardware call and every outbound datagram so tests can
//! assert on the full history.  [`Gateway`] plays the border router: it
//! builds frames, seals them under the session key and opens replies.

use std::cell::RefCell;
use std::net::Ipv6Addr;
use std::rc::Rc;

use sls_node::app::alerts::OutboundAlert;
use sls_node::app::ports::{
    ActuatorPort, IndicatorPort, NetworkPort, RadioPort, RoutingPort, SensorPort, SystemPort,
};
use sls_node::error::TransportError;
use sls_node::fsm::context::{
    EnvironmentSnapshot, Indicator, IndicatorAction, LampStatus, RadioParameters,
};
use sls_node::protocol::crc;
use sls_node::protocol::frame::{CommandCode, CommandFrame, FrameImage, MsgKind};
use sls_node::protocol::security::{self, AppKey, EncryptionMode};

// ── Hardware call record ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum HwCall {
    Lamp(LampStatus, u8),
    Indicator(Indicator, IndicatorAction),
    Forward(FrameImage),
    RouteRepair,
    Restart,
    /// Only recorded in a shared [`Journal`].
    Reply(FrameImage),
}

/// Call history shared between the hardware and network mocks, so tests
/// can assert on the relative order of replies and hardware effects.
#[derive(Clone, Default)]
pub struct Journal(Rc<RefCell<Vec<HwCall>>>);

#[allow(dead_code)]
impl Journal {
    fn record(&self, call: HwCall) {
        self.0.borrow_mut().push(call);
    }

    pub fn entries(&self) -> Vec<HwCall> {
        self.0.borrow().clone()
    }
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub link_up: bool,
    pub calls: Vec<HwCall>,
    pub actuator_rx: Vec<u8>,
    pub journal: Option<Journal>,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            link_up: true,
            calls: Vec::new(),
            actuator_rx: Vec::new(),
            journal: None,
        }
    }

    fn push(&mut self, call: HwCall) {
        if let Some(journal) = &self.journal {
            journal.record(call.clone());
        }
        self.calls.push(call);
    }

    pub fn count(&self, call: &HwCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    pub fn forwarded(&self) -> Vec<FrameImage> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                HwCall::Forward(image) => Some(*image),
                _ => None,
            })
            .collect()
    }

    pub fn last_lamp(&self) -> Option<(LampStatus, u8)> {
        self.calls.iter().rev().find_map(|c| match c {
            HwCall::Lamp(status, dim) => Some((*status, *dim)),
            _ => None,
        })
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl RoutingPort for MockHardware {
    fn is_link_up(&self) -> bool {
        self.link_up
    }

    fn next_hop(&self) -> Option<Ipv6Addr> {
        self.link_up
            .then_some(Ipv6Addr::new(0xfe80, 0, 0, 0, 0x1122, 0x3344, 0x5566, 0x7788))
    }

    fn trigger_route_repair(&mut self) {
        self.push(HwCall::RouteRepair);
    }
}

impl RadioPort for MockHardware {
    fn read_radio_parameters(&mut self) -> RadioParameters {
        RadioParameters {
            channel: 15,
            rssi: -70,
            lqi: 90,
            tx_power: -3,
        }
    }
}

impl SensorPort for MockHardware {
    fn read_environment(&mut self) -> EnvironmentSnapshot {
        EnvironmentSnapshot {
            temperature: -125,
            light: 300,
            pressure: 1013,
            humidity: 4500,
        }
    }
}

impl ActuatorPort for MockHardware {
    fn set_lamp(&mut self, status: LampStatus, dim: u8) {
        self.push(HwCall::Lamp(status, dim));
    }

    fn forward_frame(&mut self, image: &FrameImage) {
        self.push(HwCall::Forward(*image));
    }

    fn read_from_actuator(&mut self, buf: &mut [u8]) -> usize {
        let n = self.actuator_rx.len().min(buf.len());
        buf[..n].copy_from_slice(&self.actuator_rx[..n]);
        self.actuator_rx.drain(..n);
        n
    }
}

impl IndicatorPort for MockHardware {
    fn set_indicator(&mut self, indicator: Indicator, action: IndicatorAction) {
        self.push(HwCall::Indicator(indicator, action));
    }
}

impl SystemPort for MockHardware {
    fn restart(&mut self) {
        self.push(HwCall::Restart);
    }
}

// ── MockNetwork ───────────────────────────────────────────────

#[derive(Default)]
pub struct MockNetwork {
    pub replies: Vec<FrameImage>,
    pub alerts: Vec<OutboundAlert>,
    pub alert_queue_full: bool,
    /// Alerts still to be refused with `QueueFull` before the queue drains.
    pub reject_next_alerts: usize,
    pub journal: Option<Journal>,
}

impl NetworkPort for MockNetwork {
    fn send_reply(&mut self, image: &FrameImage) -> Result<(), TransportError> {
        if let Some(journal) = &self.journal {
            journal.record(HwCall::Reply(*image));
        }
        self.replies.push(*image);
        Ok(())
    }

    fn send_alert(&mut self, alert: OutboundAlert) -> Result<(), TransportError> {
        if self.alert_queue_full {
            return Err(TransportError::QueueFull);
        }
        if self.reject_next_alerts > 0 {
            self.reject_next_alerts -= 1;
            return Err(TransportError::QueueFull);
        }
        self.alerts.push(alert);
        Ok(())
    }
}

// ── Gateway ───────────────────────────────────────────────────

/// The peer side of the session.
pub struct Gateway {
    pub mode: EncryptionMode,
    pub key: AppKey,
    pub app_id: u8,
    pub keyed: bool,
    next_seq: u16,
}

#[allow(dead_code)]
impl Gateway {
    pub fn new(mode: EncryptionMode) -> Self {
        Self {
            mode,
            key: *b"sls-test-app-key",
            app_id: 9,
            keyed: false,
            next_seq: 1,
        }
    }

    pub fn authenticate(&self, challenge: u16) -> FrameImage {
        let mut f = CommandFrame::new(MsgKind::Hello, CommandCode::Authenticate);
        f.args[..2].copy_from_slice(&challenge.to_be_bytes());
        crc::stamp(&mut f);
        f.to_image()
    }

    pub fn set_app_key(&mut self) -> FrameImage {
        let mut f = CommandFrame::new(MsgKind::Hello, CommandCode::SetAppKey);
        f.args[..16].copy_from_slice(&self.key);
        f.args[16] = self.app_id;
        crc::stamp(&mut f);
        self.keyed = true;
        self.next_seq = 1;
        f.to_image()
    }

    /// Next request with a fresh sequence number.
    pub fn request(&mut self, cmd: CommandCode) -> FrameImage {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.request_with_seq(cmd, seq, |_| {})
    }

    pub fn request_with_seq(
        &self,
        cmd: CommandCode,
        seq: u16,
        fill: impl FnOnce(&mut CommandFrame),
    ) -> FrameImage {
        let mut f = CommandFrame::new(MsgKind::Request, cmd);
        f.sequence = seq;
        fill(&mut f);
        crc::stamp(&mut f);
        self.seal(f.to_image())
    }

    pub fn seal(&self, mut image: FrameImage) -> FrameImage {
        if self.keyed {
            security::encrypt(self.mode, &mut image, &self.key).unwrap();
        }
        image
    }

    /// Decrypt (when keyed) and decode a frame sent by the node.
    pub fn open(&self, image: &FrameImage) -> CommandFrame {
        let mut image = *image;
        if self.keyed {
            security::decrypt(self.mode, &mut image, &self.key).unwrap();
        }
        CommandFrame::from_image(&image)
    }
}
