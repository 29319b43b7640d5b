//! Concrete state handlers and table builder.
//!
//! ```text
//!  HELLO ──[SetAppKey]──▶ NORMAL ──┐
//!    │                     ▲       │ Authenticate (re-key, stays Normal)
//!    │ Authenticate        └───────┘
//!    ▼
//!  (challenge answered, counters reset, key pending)
//! ```
//!
//! Handlers never touch hardware.  They shape the reply, update the
//! session context and queue [`Effect`]s.

use log::{info, warn};

use super::context::{Effect, Indicator, IndicatorAction, LampStatus, SessionContext};
use super::{Handled, StateDescriptor, StateId};
use crate::protocol::auth::{challenge_hash, read_challenge, write_response};
use crate::protocol::frame::{CommandCode, CommandFrame, ErrorCode, MsgKind};
use crate::protocol::security::KEY_LEN;

/// Argument slot carrying the application identifier in `SetAppKey`.
const APP_ID_SLOT: usize = 16;

/// Added to RSSI before it is reported as an unsigned byte.
const RSSI_OFFSET: i16 = 150;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0 — Hello
        StateDescriptor {
            id: StateId::Hello,
            name: "Hello",
            on_enter: None,
            on_hello: hello_on_hello,
            on_request: hello_on_request,
        },
        // Index 1 — Normal
        StateDescriptor {
            id: StateId::Normal,
            name: "Normal",
            on_enter: Some(normal_enter),
            on_hello: normal_on_hello,
            on_request: normal_on_request,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  Shared handshake steps
// ═══════════════════════════════════════════════════════════════════════════

/// Fill the link report block used by Authenticate and GetNwStatus replies.
fn write_link_report(ctx: &SessionContext, args: &mut [u8]) {
    let radio = ctx.net.radio;
    args[2] = radio.channel;
    args[3] = ((i16::from(radio.rssi) + RSSI_OFFSET) & 0xFF) as u8;
    args[4] = radio.lqi;
    args[5] = radio.tx_power as u8;
    args[6..8].copy_from_slice(&ctx.profile.pan_id.to_be_bytes());
    args[8] = (u8::from(ctx.profile.security_enabled) << 4) | ctx.profile.link_security_level;
    args[9] = ctx.profile.encryption_mode.wire_id();
    // First half of the next hop is the fe80:: prefix.
    args[10..18].copy_from_slice(&ctx.net.next_hop.octets()[8..]);
}

/// Answer a challenge and restart the session.
fn answer_challenge(ctx: &mut SessionContext, frame: &CommandFrame, reply: &mut CommandFrame) {
    let challenge = read_challenge(&frame.args);
    let response = challenge_hash(challenge);
    ctx.net.challenge_code = challenge;
    ctx.net.challenge_response = response;
    info!("auth: challenge 0x{:04X} -> 0x{:04X}", challenge, response);

    write_response(&mut reply.args, response);
    write_link_report(ctx, &mut reply.args);

    ctx.handshake_in_flight = true;
    ctx.seq.reset();
    ctx.net.authenticated = false;
    ctx.encryption_enabled = false;
}

/// Install the application key carried by the frame.
fn install_key(ctx: &mut SessionContext, frame: &CommandFrame) {
    ctx.net.application_key.copy_from_slice(&frame.args[..KEY_LEN]);
    ctx.net.app_id = u16::from(frame.args[APP_ID_SLOT]);
    ctx.net.authenticated = true;
    ctx.encryption_enabled = true;
    info!("auth: application key installed, app id {}", ctx.net.app_id);
    ctx.emit(Effect::Indicator(Indicator::Session, IndicatorAction::On));
}

// ═══════════════════════════════════════════════════════════════════════════
//  HELLO state — only the handshake is meaningful
// ═══════════════════════════════════════════════════════════════════════════

fn hello_on_hello(ctx: &mut SessionContext, frame: &CommandFrame) -> Handled {
    let mut reply = frame.reply_as(MsgKind::Hello);
    match frame.command {
        CommandCode::HelloPing => {
            ctx.emit(Effect::Indicator(Indicator::Link, IndicatorAction::Off));
        }
        CommandCode::Authenticate => {
            answer_challenge(ctx, frame, &mut reply);
            ctx.emit(Effect::Indicator(Indicator::Session, IndicatorAction::Off));
        }
        CommandCode::SetAppKey => {
            install_key(ctx, frame);
            return Handled::goto(reply, StateId::Normal);
        }
        other => {
            warn!("HELLO: {:?} not allowed before keying", other);
            reply.error = ErrorCode::WrongStateForHello;
        }
    }
    Handled::stay(reply)
}

fn hello_on_request(_ctx: &mut SessionContext, frame: &CommandFrame) -> Handled {
    // Echo of the input, nothing executed.
    let mut reply = *frame;
    reply.error = ErrorCode::WrongStateForHello;
    Handled::stay(reply)
}

// ═══════════════════════════════════════════════════════════════════════════
//  NORMAL state — keyed session, full command set
// ═══════════════════════════════════════════════════════════════════════════

fn normal_enter(ctx: &mut SessionContext) {
    info!(
        "NORMAL: session keyed ({:?}), app id {}",
        ctx.profile.encryption_mode, ctx.net.app_id
    );
}

fn normal_on_hello(ctx: &mut SessionContext, frame: &CommandFrame) -> Handled {
    let mut reply = frame.reply_as(MsgKind::Hello);
    match frame.command {
        CommandCode::Authenticate => {
            answer_challenge(ctx, frame, &mut reply);
            ctx.emit(Effect::Indicator(Indicator::Session, IndicatorAction::Off));
            ctx.emit(Effect::Indicator(Indicator::Session, IndicatorAction::On));
        }
        CommandCode::SetAppKey => install_key(ctx, frame),
        _ => {}
    }
    Handled::stay(reply)
}

fn normal_on_request(ctx: &mut SessionContext, frame: &CommandFrame) -> Handled {
    let mut reply = frame.reply_as(MsgKind::Reply);
    let dim = ctx.lamp.dim;
    match frame.command {
        CommandCode::HelloPing | CommandCode::Authenticate | CommandCode::GetGwStatus => {}

        CommandCode::LedOn => set_lamp(ctx, LampStatus::On, dim),
        CommandCode::LedOff => set_lamp(ctx, LampStatus::Off, dim),
        CommandCode::LedDim => set_lamp(ctx, LampStatus::Dim, frame.args[0]),

        CommandCode::GetRfStatus => {
            let lamp = ctx.lamp;
            reply.args[..5].copy_from_slice(&[
                lamp.id,
                lamp.power,
                lamp.temperature,
                lamp.dim,
                lamp.status as u8,
            ]);
        }

        CommandCode::GetNwStatus => {
            reply.args[0] = 0;
            reply.args[1] = ctx.profile.channel_check_rate;
            write_link_report(ctx, &mut reply.args);
        }

        CommandCode::GetAppKey => {
            reply.args[..KEY_LEN].copy_from_slice(&ctx.net.application_key);
        }

        CommandCode::RepairRoute => ctx.emit(Effect::RepairRoute),

        CommandCode::Reboot => {
            info!("NORMAL: reboot requested");
            ctx.emit(Effect::Restart);
        }

        other => {
            warn!("NORMAL: unknown request {:?}", other);
            reply.error = ErrorCode::UnknownCommand;
        }
    }
    Handled::stay(reply)
}

fn set_lamp(ctx: &mut SessionContext, status: LampStatus, dim: u8) {
    ctx.lamp.status = status;
    ctx.lamp.dim = dim;
    info!("NORMAL: lamp {:?} (dim {})", status, dim);
    ctx.emit(Effect::Lamp(status, dim));
}
