//! Async alert dispatcher.
//!
//! Builds unsolicited frames toward the gateway: the join announcement, the
//! periodic telemetry burst and relayed actuator-driver notifications.
//! Each alert carries a jitter delay derived from the node's application
//! identifier so that nodes sharing a trigger (e.g. a gateway reboot) do not
//! transmit in lockstep.  The delay travels with the frame; the transport
//! waits it out, the dispatcher never blocks.

use core::time::Duration;

use log::{debug, info};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::error::{Error, Result};
use crate::fsm::context::{EnvironmentSnapshot, SessionContext};
use crate::protocol::codec::ActuatorRecord;
use crate::protocol::crc;
use crate::protocol::frame::{CommandCode, CommandFrame, FrameImage, MsgKind};
use crate::protocol::security;

use super::ports::NetworkPort;

/// Wall-clock length of one raw jitter unit.
pub const JITTER_UNIT: Duration = Duration::from_nanos(2830);

/// Upper bound of the raw random source.
const RANDOM_MAX: u16 = u16::MAX;

/// Argument offset of a relayed actuator-driver record.
const RELAY_OFFSET: usize = EnvironmentSnapshot::ENCODED_LEN;

/// Identifier-dependent jitter, in raw units.
///
/// `((r1 / id) + (r2 % id) * 100) * id`.  An identifier of zero (not yet
/// provisioned) yields no jitter.
pub fn jitter_units(r1: u16, r2: u16, app_id: u16) -> u32 {
    if app_id == 0 {
        return 0;
    }
    let id = u32::from(app_id);
    (u32::from(r1) / id + (u32::from(r2) % id) * 100).wrapping_mul(id)
}

/// A ready-to-send alert image and the delay to wait before sending it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutboundAlert {
    pub delay: Duration,
    pub sequence: u16,
    pub command: CommandCode,
    pub image: FrameImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertOutcome {
    Sent { sequence: u16 },
    /// No route to the gateway; nothing sent, nothing retried.
    NoRoute,
    /// Connected but not keyed, and not a join announcement.
    Unauthenticated,
}

pub struct AlertDispatcher {
    rng: SmallRng,
}

impl AlertDispatcher {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Draw a jitter delay for this node.
    pub fn jitter(&mut self, app_id: u16) -> Duration {
        let r1 = self.rng.gen_range(0..=RANDOM_MAX);
        let r2 = self.rng.gen_range(0..=RANDOM_MAX);
        JITTER_UNIT * jitter_units(r1, r2, app_id)
    }

    /// Build and hand one alert to the network.
    ///
    /// Consumes one async sequence number when sent.  `relay` carries an
    /// actuator-driver record appended after the environment snapshot.
    pub fn send_alert(
        &mut self,
        ctx: &mut SessionContext,
        link_up: bool,
        command: CommandCode,
        relay: Option<&ActuatorRecord>,
        net: &mut impl NetworkPort,
    ) -> Result<AlertOutcome> {
        if !link_up {
            info!("alert: no route to gateway, {:?} not sent", command);
            return Ok(AlertOutcome::NoRoute);
        }
        if !ctx.net.authenticated && command != CommandCode::AsyncJoined {
            info!(
                "alert: route found but unauthenticated, {:?} [{}] not sent",
                command,
                ctx.seq.async_seq()
            );
            return Ok(AlertOutcome::Unauthenticated);
        }

        let sequence = ctx.seq.next_async();
        let mut frame = CommandFrame::new(MsgKind::Async, command);
        frame.sequence = sequence;
        frame.args[..RELAY_OFFSET].copy_from_slice(&ctx.environment.encode(ctx.net.app_id));
        if let Some(record) = relay {
            frame.args[RELAY_OFFSET..RELAY_OFFSET + record.len()].copy_from_slice(record);
        }
        crc::stamp(&mut frame);

        let mut image = frame.to_image();
        if ctx.encryption_enabled {
            security::encrypt(
                ctx.profile.encryption_mode,
                &mut image,
                &ctx.net.application_key,
            )?;
        }

        let delay = self.jitter(ctx.net.app_id);
        debug!(
            "alert: {:?} [{}] queued with {} us jitter",
            command,
            sequence,
            delay.as_micros()
        );
        net.send_alert(OutboundAlert {
            delay,
            sequence,
            command,
            image,
        })
        .map_err(Error::from)?;
        Ok(AlertOutcome::Sent { sequence })
    }

    /// Send `copies` transmissions of one logical alert under a single
    /// sequence number.  Returns how many were handed to the network.
    ///
    /// The counter is rewound after each copy actually sent and advanced
    /// once at the end, so a burst consumes exactly one number and a burst
    /// that sent nothing consumes none.
    pub fn send_burst(
        &mut self,
        ctx: &mut SessionContext,
        link_up: bool,
        command: CommandCode,
        copies: u8,
        net: &mut impl NetworkPort,
    ) -> Result<u8> {
        let mut sent = 0u8;
        for _ in 0..copies {
            if let AlertOutcome::Sent { .. } = self.send_alert(ctx, link_up, command, None, net)? {
                ctx.seq.rewind_async();
                sent += 1;
            }
        }
        if sent > 0 {
            ctx.seq.next_async();
        }
        Ok(sent)
    }
}
