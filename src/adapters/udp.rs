//! UDP network adapter.
//!
//! Replies go straight back to the sender of the frame being handled, from
//! the query socket.  Alerts are handed to [`ALERT_CHANNEL`]; the alert
//! sender task waits out each jitter delay before transmitting, so the
//! dispatcher never blocks on jitter.

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};

use log::{debug, warn};

use crate::app::alerts::OutboundAlert;
use crate::app::ports::NetworkPort;
use crate::error::TransportError;
use crate::events::ALERT_CHANNEL;
use crate::protocol::frame::FrameImage;

/// Network port bound to one inbound exchange.
pub struct UdpNetwork<'a> {
    socket: &'a UdpSocket,
    peer: Option<SocketAddr>,
}

impl<'a> UdpNetwork<'a> {
    /// Replies go to `peer`.
    pub fn for_peer(socket: &'a UdpSocket, peer: SocketAddr) -> Self {
        Self {
            socket,
            peer: Some(peer),
        }
    }

    /// No exchange in progress: replies are refused, alerts still flow.
    pub fn unsolicited(socket: &'a UdpSocket) -> Self {
        Self { socket, peer: None }
    }
}

impl NetworkPort for UdpNetwork<'_> {
    fn send_reply(&mut self, image: &FrameImage) -> Result<(), TransportError> {
        let peer = self.peer.ok_or(TransportError::NoPeer)?;
        match self.socket.send_to(image, peer) {
            Ok(_) => {
                debug!("udp: reply to {}", peer);
                Ok(())
            }
            Err(e) => {
                warn!("udp: reply to {} failed: {}", peer, e);
                Err(TransportError::SendFailed)
            }
        }
    }

    fn send_alert(&mut self, alert: OutboundAlert) -> Result<(), TransportError> {
        ALERT_CHANNEL
            .try_send(alert)
            .map_err(|_| TransportError::QueueFull)
    }
}

/// Put one alert on the wire.  `WouldBlock` on a non-blocking socket counts
/// as a failed send; alerts are never retried here.
pub fn transmit_alert(
    socket: &UdpSocket,
    gateway: SocketAddr,
    alert: &OutboundAlert,
) -> Result<(), TransportError> {
    match socket.send_to(&alert.image, gateway) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == ErrorKind::WouldBlock => {
            warn!("udp: alert [{}] dropped, socket busy", alert.sequence);
            Err(TransportError::SendFailed)
        }
        Err(e) => {
            warn!("udp: alert [{}] to {} failed: {}", alert.sequence, gateway, e);
            Err(TransportError::SendFailed)
        }
    }
}
