//! Node service — the hexagonal core.
//!
//! [`NodeService`] owns the session state machine, its context, the alert
//! dispatcher, the connectivity supervisor and the actuator-link decoder.
//! It is the single writer of all session state: the runtime hands it one
//! event at a time (an inbound datagram or a tick) and it runs each to
//! completion.  All I/O flows through port traits injected at call sites.
//!
//! ```text
//!  NodeHardware ──▶ ┌──────────────────────────────┐ ──▶ NetworkPort
//!                   │          NodeService          │
//!                   │  FSM · Sequence · Supervisor  │
//!                   └──────────────────────────────┘
//! ```

use heapless::Vec;
use log::{debug, info, warn};

use crate::config::NodeConfig;
use crate::error::Result;
use crate::fsm::context::{Effect, Indicator, IndicatorAction, SessionContext};
use crate::fsm::{Fsm, StateId};
use crate::protocol::codec::{ActuatorLinkDecoder, ActuatorRecord};
use crate::protocol::crc;
use crate::protocol::frame::{CommandCode, CommandFrame, FRAME_LEN};
use crate::protocol::security;
use crate::supervisor::{ConnectivitySupervisor, SupervisorAction};

use super::alerts::{AlertDispatcher, AlertOutcome};
use super::ports::{NetworkPort, NodeHardware};

/// Most actuator-link records handled per poll.
const MAX_RECORDS_PER_POLL: usize = 8;

/// Why a frame was discarded without a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Request sequence number not above the last accepted one.
    Replay,
    /// Checksum mismatch while CRC enforcement is on.
    BadCrc,
}

/// What happened to one inbound datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDisposition {
    /// Network-class command answered.
    Replied,
    /// Actuator-class command handed to the driver; `echoed` if it was also
    /// answered over the network.
    Forwarded { echoed: bool },
    /// Actuator-class command received before keying.
    Ignored,
    Dropped(DropReason),
}

// ───────────────────────────────────────────────────────────────
// NodeService
// ───────────────────────────────────────────────────────────────

pub struct NodeService {
    config: NodeConfig,
    fsm: Fsm,
    ctx: SessionContext,
    alerts: AlertDispatcher,
    supervisor: ConnectivitySupervisor,
    actuator_link: ActuatorLinkDecoder,
    restart_requested: bool,
}

impl NodeService {
    /// Build the service with an entropy-seeded jitter source.
    pub fn new(config: NodeConfig) -> Self {
        Self::with_seed(config, rand::random())
    }

    /// Build the service with a fixed jitter seed (reproducible runs).
    pub fn with_seed(config: NodeConfig, seed: u64) -> Self {
        let mut ctx = SessionContext::new(&config);
        let mut fsm = Fsm::boot();
        fsm.start(&mut ctx);
        Self {
            supervisor: ConnectivitySupervisor::new(&config),
            alerts: AlertDispatcher::new(seed),
            actuator_link: ActuatorLinkDecoder::new(),
            fsm,
            ctx,
            config,
            restart_requested: false,
        }
    }

    // ── Inbound frames ────────────────────────────────────────

    /// Process one datagram from the query port.
    ///
    /// Radio and next-hop data are refreshed first, then the frame is
    /// parsed, decrypted when it lacks the plaintext marker and the session
    /// is keyed, checked, and dispatched.
    pub fn handle_frame(
        &mut self,
        hw: &mut impl NodeHardware,
        net: &mut impl NetworkPort,
        datagram: &[u8],
    ) -> Result<FrameDisposition> {
        self.refresh_link(hw);

        let mut frame = CommandFrame::parse(datagram)?;
        if !frame.has_plain_marker() && self.ctx.encryption_enabled {
            debug!("rx: marker 0x{:02X}, decrypting", frame.start_marker);
            let mut image = frame.to_image();
            security::decrypt(
                self.ctx.profile.encryption_mode,
                &mut image,
                &self.ctx.net.application_key,
            )?;
            frame = CommandFrame::from_image(&image);
        }

        debug!(
            "rx: state={:?} seq={} kind={:?} cmd={:?}",
            self.fsm.current_state(),
            frame.sequence,
            frame.kind,
            frame.command
        );

        if !crc::verify(&frame) {
            warn!(
                "rx: CRC mismatch on {:?} (carried 0x{:04X})",
                frame.command, frame.checksum
            );
            if self.config.enforce_crc {
                return Ok(FrameDisposition::Dropped(DropReason::BadCrc));
            }
        }

        if frame.command.is_network_command() {
            if !self.admit(&frame) {
                return Ok(FrameDisposition::Dropped(DropReason::Replay));
            }
            let reply = self.fsm.dispatch(&mut self.ctx, &frame);
            debug!(
                "fsm: {} frames handled, state {:?}",
                self.fsm.frames_handled(),
                self.fsm.current_state()
            );
            let sent = self.send_reply(net, reply);
            self.apply_effects(hw);
            sent?;
            return Ok(FrameDisposition::Replied);
        }

        if self.fsm.current_state() != StateId::Normal {
            debug!("rx: actuator command {:?} ignored before keying", frame.command);
            return Ok(FrameDisposition::Ignored);
        }
        if !self.admit(&frame) {
            return Ok(FrameDisposition::Dropped(DropReason::Replay));
        }

        let echoed = self.config.echo_actuator_commands;
        if echoed {
            self.send_reply(net, frame)?;
        }
        hw.forward_frame(&frame.to_image());
        Ok(FrameDisposition::Forwarded { echoed })
    }

    // ── Periodic supervision ──────────────────────────────────

    /// Run one supervisor tick and carry out what it asks for.
    pub fn tick(&mut self, hw: &mut impl NodeHardware, net: &mut impl NetworkPort) {
        let link_up = hw.is_link_up();
        let actions = self
            .supervisor
            .tick(&mut self.ctx, self.fsm.current_state(), link_up);

        for action in actions {
            match action {
                SupervisorAction::Heartbeat { connected } => {
                    let act = if connected {
                        IndicatorAction::Toggle
                    } else {
                        IndicatorAction::On
                    };
                    hw.set_indicator(Indicator::Link, act);
                }
                SupervisorAction::ReadSensors => {
                    self.ctx.environment = hw.read_environment();
                }
                SupervisorAction::Restart => self.restart(hw),
                SupervisorAction::AlertBurst => {
                    self.ctx.environment = hw.read_environment();
                    match self.alerts.send_burst(
                        &mut self.ctx,
                        link_up,
                        CommandCode::AsyncAlert,
                        self.config.alert_retransmissions,
                        net,
                    ) {
                        Ok(sent) => info!("alert: periodic burst, {} copies", sent),
                        Err(e) => warn!("alert: periodic burst failed: {}", e),
                    }
                    self.ctx.emergency_armed = self.config.continuous_alerts;
                }
                SupervisorAction::RefreshNextHop => {
                    if let Some(hop) = hw.next_hop() {
                        self.ctx.net.next_hop = hop;
                    }
                }
                SupervisorAction::AnnounceJoin => {
                    self.ctx.seq.reset();
                    if let Err(e) = self.alerts.send_alert(
                        &mut self.ctx,
                        link_up,
                        CommandCode::AsyncJoined,
                        None,
                        net,
                    ) {
                        warn!("alert: join announcement failed: {}", e);
                    }
                    hw.set_indicator(Indicator::Session, IndicatorAction::Off);
                }
                SupervisorAction::RepairRoute => hw.trigger_route_repair(),
            }
        }
    }

    fn admit(&mut self, frame: &CommandFrame) -> bool {
        let seq = &mut self.ctx.seq;
        if seq.admit(frame.kind, frame.command, frame.sequence) {
            return true;
        }
        warn!(
            "seq: stale request dropped (got {}, last {})",
            seq.newly_received(),
            seq.current()
        );
        false
    }

    // ── Actuator-driver notifications ─────────────────────────

    /// Drain the actuator link and relay each complete record as an alert.
    /// Returns the number of alerts handed to the network.  A record the
    /// network refuses is logged and skipped; later records are still sent.
    pub fn poll_actuator_link(
        &mut self,
        hw: &mut impl NodeHardware,
        net: &mut impl NetworkPort,
    ) -> usize {
        let mut buf = [0u8; FRAME_LEN];
        let n = hw.read_from_actuator(&mut buf);
        if n == 0 {
            return 0;
        }

        let mut records: Vec<ActuatorRecord, MAX_RECORDS_PER_POLL> = Vec::new();
        self.actuator_link.feed(&buf[..n], |record| {
            if records.push(record).is_err() {
                warn!("actuator: too many records in one read, dropping");
            }
        });

        let link_up = hw.is_link_up();
        let mut sent = 0;
        let mut dropped = 0;
        for record in &records {
            match self.alerts.send_alert(
                &mut self.ctx,
                link_up,
                CommandCode::AsyncAlert,
                Some(record),
                net,
            ) {
                Ok(AlertOutcome::Sent { .. }) => sent += 1,
                Ok(_) => {}
                Err(e) => {
                    warn!("actuator: relay failed: {}", e);
                    dropped += 1;
                }
            }
        }
        if dropped > 0 {
            warn!(
                "actuator: {} of {} records not relayed",
                dropped,
                records.len()
            );
        }
        sent
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Set once the service has asked the hardware to restart.
    pub fn restart_requested(&self) -> bool {
        self.restart_requested
    }

    // ── Internal ──────────────────────────────────────────────

    fn refresh_link(&mut self, hw: &mut impl NodeHardware) {
        self.ctx.net.radio = hw.read_radio_parameters();
        if let Some(hop) = hw.next_hop() {
            self.ctx.net.next_hop = hop;
        }
    }

    /// Stamp, encrypt under the current flag, and send.
    fn send_reply(&mut self, net: &mut impl NetworkPort, mut reply: CommandFrame) -> Result<()> {
        crc::stamp(&mut reply);
        let mut image = reply.to_image();
        if self.ctx.encryption_enabled {
            security::encrypt(
                self.ctx.profile.encryption_mode,
                &mut image,
                &self.ctx.net.application_key,
            )?;
        }
        net.send_reply(&image)?;
        Ok(())
    }

    /// Apply queued effects.  Called after the reply went out, so a restart
    /// never precedes its acknowledgement.
    fn apply_effects(&mut self, hw: &mut impl NodeHardware) {
        for effect in self.ctx.take_effects() {
            match effect {
                Effect::Lamp(status, dim) => hw.set_lamp(status, dim),
                Effect::Indicator(which, action) => hw.set_indicator(which, action),
                Effect::RepairRoute => {
                    info!("routing: repair requested by gateway");
                    hw.trigger_route_repair();
                }
                Effect::Restart => self.restart(hw),
            }
        }
    }

    fn restart(&mut self, hw: &mut impl NodeHardware) {
        warn!("system: restarting");
        self.restart_requested = true;
        hw.restart();
    }
}
