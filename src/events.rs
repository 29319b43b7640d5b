//! Event queues between the I/O tasks and the dispatcher.
//!
//! Datagrams and ticks are produced by independent tasks and consumed one at
//! a time by the dispatcher, which owns the node service.  Alerts flow the
//! other way: the service builds them, the alert sender waits out each
//! jitter delay and puts them on the wire.
//!
//! ```text
//! ┌─────────────┐  NodeEvent    ┌──────────────┐  OutboundAlert  ┌──────────────┐
//! │ RX poller   │──────────────▶│              │────────────────▶│ Alert sender │
//! │ Ticker      │──────────────▶│  Dispatcher  │                 │ (jitter ⏱)   │
//! └─────────────┘               └──────────────┘                 └──────────────┘
//! ```
//!
//! Both channels are `embassy-sync` statics, so producers need no handle.

use std::net::SocketAddr;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;
use log::warn;

use crate::app::alerts::OutboundAlert;
use crate::protocol::frame::FRAME_LEN;

/// Room for one frame plus one byte.
pub const DATAGRAM_CAP: usize = FRAME_LEN + 1;

/// One unit of work for the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEvent {
    /// A datagram arrived on the query port.  Oversized datagrams are cut at
    /// one frame plus one byte so the length check still rejects them.
    FrameArrived {
        source: SocketAddr,
        datagram: Vec<u8, DATAGRAM_CAP>,
    },
    /// The 1 Hz supervision tick.
    TickElapsed,
}

const EVENT_DEPTH: usize = 16;

/// Alert bursts queue two copies at a time; relayed records may add more.
const ALERT_DEPTH: usize = 8;

/// Inbound events: RX poller and ticker → dispatcher.
pub static EVENT_CHANNEL: Channel<CriticalSectionRawMutex, NodeEvent, EVENT_DEPTH> =
    Channel::new();

/// Outbound alerts: dispatcher → alert sender.
pub static ALERT_CHANNEL: Channel<CriticalSectionRawMutex, OutboundAlert, ALERT_DEPTH> =
    Channel::new();

/// Queue an event.  Returns `false` if the queue is full (event dropped).
pub fn push_event(event: NodeEvent) -> bool {
    match EVENT_CHANNEL.try_send(event) {
        Ok(()) => true,
        Err(_) => {
            warn!("events: queue full, dropping event");
            false
        }
    }
}

/// Pop the next event, if any.
#[cfg(test)]
fn try_pop_event() -> Option<NodeEvent> {
    EVENT_CHANNEL.try_receive().ok()
}

/// Copy a received datagram into an event.
pub fn frame_event(source: SocketAddr, data: &[u8]) -> NodeEvent {
    let keep = data.len().min(DATAGRAM_CAP);
    let mut datagram = Vec::new();
    // Cannot fail: `keep` never exceeds the capacity.
    let _ = datagram.extend_from_slice(&data[..keep]);
    NodeEvent::FrameArrived { source, datagram }
}
