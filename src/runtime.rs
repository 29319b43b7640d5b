//! Cooperative node runtime — reactor-driven event loop.
//!
//! Runs on one thread using `edge-executor` for cooperative multi-task
//! scheduling and `async-io-mini` for reactor-driven timers.  Four tasks:
//!
//! 1. **Receive** — drains the non-blocking query socket every 1ms
//! 2. **Ticker** — pushes the supervision tick once per tick period
//! 3. **Alert sender** — wakes on `ALERT_CHANNEL`, waits out the jitter,
//!    transmits to the gateway's alert port
//! 4. **Dispatcher** — sole owner of the [`NodeService`]; runs one event to
//!    completion at a time
//!
//! ```text
//!  ┌────────────────────────────────────────────────────────────┐
//!  │  futures_lite::block_on                                    │
//!  │  ┌──────────────────────────────────────────────────────┐  │
//!  │  │  edge_executor::LocalExecutor                        │  │
//!  │  │                                                      │  │
//!  │  │  ┌─────────┐ ┌────────┐ ┌────────────┐ ┌──────────┐  │  │
//!  │  │  │ Receive │ │ Ticker │ │ Dispatcher │ │  Alerts  │  │  │
//!  │  │  │ 1ms ⏱   │ │ 1s ⏱   │ │ wake-on-rx │ │ jitter ⏱ │  │  │
//!  │  │  └─────────┘ └────────┘ └────────────┘ └──────────┘  │  │
//!  │  └──────────────────────────────────────────────────────┘  │
//!  └────────────────────────────────────────────────────────────┘
//! ```

use core::time::Duration;
use std::io::{self, ErrorKind};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::rc::Rc;

use log::{info, warn};

use crate::adapters::udp::{UdpNetwork, transmit_alert};
use crate::app::ports::NodeHardware;
use crate::app::service::{FrameDisposition, NodeService};
use crate::config::NodeConfig;
use crate::events::{ALERT_CHANNEL, EVENT_CHANNEL, NodeEvent, frame_event, push_event};

const RX_POLL: Duration = Duration::from_millis(1);

/// Large enough to notice oversized datagrams.
const RX_BUF_SIZE: usize = 128;

// ── Dispatcher ───────────────────────────────────────────────

/// Owns the service and the hardware; turns events into service calls.
pub struct Dispatcher<H> {
    config: NodeConfig,
    service: NodeService,
    hw: H,
    socket: Rc<UdpSocket>,
    restarts: u32,
}

impl<H: NodeHardware> Dispatcher<H> {
    pub fn new(config: NodeConfig, hw: H, socket: Rc<UdpSocket>) -> Self {
        Self {
            service: NodeService::new(config.clone()),
            config,
            hw,
            socket,
            restarts: 0,
        }
    }

    /// Handle one event, then drain the actuator link.
    pub fn handle(&mut self, event: NodeEvent) {
        match event {
            NodeEvent::FrameArrived { source, datagram } => {
                let mut net = UdpNetwork::for_peer(&self.socket, source);
                match self.service.handle_frame(&mut self.hw, &mut net, &datagram) {
                    Ok(FrameDisposition::Dropped(reason)) => {
                        info!("rx: frame from {} dropped ({:?})", source, reason);
                    }
                    Ok(_) => {}
                    Err(e) => warn!("rx: frame from {} rejected: {}", source, e),
                }
            }
            NodeEvent::TickElapsed => {
                let mut net = UdpNetwork::unsolicited(&self.socket);
                self.service.tick(&mut self.hw, &mut net);
            }
        }

        let mut net = UdpNetwork::unsolicited(&self.socket);
        self.service.poll_actuator_link(&mut self.hw, &mut net);

        if self.service.restart_requested() {
            self.restarts += 1;
            info!("system: volatile state reset (restart #{})", self.restarts);
            self.service = NodeService::new(self.config.clone());
        }
    }

    pub fn service(&self) -> &NodeService {
        &self.service
    }

    pub fn hardware(&mut self) -> &mut H {
        &mut self.hw
    }

    /// Times the service has been rebuilt after a restart request.
    pub fn restarts(&self) -> u32 {
        self.restarts
    }
}

// ── Tasks ────────────────────────────────────────────────────

/// Receive task — drains every pending datagram, then sleeps 1ms on the
/// reactor so the other tasks run between polls.
async fn rx_loop(socket: Rc<UdpSocket>) {
    let mut buf = [0u8; RX_BUF_SIZE];
    loop {
        loop {
            match socket.recv_from(&mut buf) {
                Ok((n, source)) => {
                    push_event(frame_event(source, &buf[..n]));
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!("rx: socket error: {}", e);
                    break;
                }
            }
        }
        async_io_mini::Timer::after(RX_POLL).await;
    }
}

async fn tick_loop(period: Duration) {
    loop {
        async_io_mini::Timer::after(period).await;
        push_event(NodeEvent::TickElapsed);
    }
}

/// Alert sender — wakes as soon as the dispatcher queues an alert.
async fn alert_loop(socket: UdpSocket, gateway: SocketAddr) {
    loop {
        let alert = ALERT_CHANNEL.receive().await;
        if !alert.delay.is_zero() {
            async_io_mini::Timer::after(alert.delay).await;
        }
        if transmit_alert(&socket, gateway, &alert).is_ok() {
            info!(
                "alert: {:?} [{}] sent to {}",
                alert.command, alert.sequence, gateway
            );
        }
    }
}

async fn dispatch_loop<H: NodeHardware>(mut dispatcher: Dispatcher<H>) {
    loop {
        let event = EVENT_CHANNEL.receive().await;
        dispatcher.handle(event);
    }
}

// ── Entry point ──────────────────────────────────────────────

/// Bind the sockets and run the node forever.  Returns only if a socket
/// cannot be set up.
pub fn run<H: NodeHardware + 'static>(config: NodeConfig, hw: H) -> io::Result<()> {
    let query_addr = SocketAddr::new(config.bind_addr, config.query_port);
    let socket = UdpSocket::bind(query_addr)?;
    socket.set_nonblocking(true)?;

    let ephemeral = match config.bind_addr {
        IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
    };
    let alert_socket = UdpSocket::bind(SocketAddr::new(ephemeral, 0))?;
    alert_socket.set_nonblocking(true)?;

    let gateway = SocketAddr::new(IpAddr::V6(config.gateway_addr), config.alert_port);
    let period = Duration::from_millis(u64::from(config.tick_period_ms));

    let socket = Rc::new(socket);
    let dispatcher = Dispatcher::new(config, hw, socket.clone());

    let executor: edge_executor::LocalExecutor<'_, 8> = edge_executor::LocalExecutor::new();
    executor.spawn(rx_loop(socket.clone())).detach();
    executor.spawn(tick_loop(period)).detach();
    executor.spawn(alert_loop(alert_socket, gateway)).detach();
    executor.spawn(dispatch_loop(dispatcher)).detach();

    info!(
        "node listening on {} (alerts to {}, tick {:?})",
        query_addr, gateway, period
    );

    futures_lite::future::block_on(executor.run(core::future::pending::<()>()));
    Ok(())
}
