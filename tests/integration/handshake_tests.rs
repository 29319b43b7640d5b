//! Session handshake and keyed request handling, end to end through the
//! node service.

use sls_node::app::service::{DropReason, FrameDisposition, NodeService};
use sls_node::config::NodeConfig;
use sls_node::fsm::StateId;
use sls_node::fsm::context::{Indicator, IndicatorAction, LampStatus};
use sls_node::protocol::crc;
use sls_node::protocol::frame::{CommandCode, CommandFrame, ErrorCode, MsgKind, SFD};
use sls_node::protocol::security::EncryptionMode;

use crate::mock_hw::{Gateway, HwCall, Journal, MockHardware, MockNetwork};

struct Bench {
    svc: NodeService,
    hw: MockHardware,
    net: MockNetwork,
    gw: Gateway,
}

impl Bench {
    fn with_mode(mode: EncryptionMode) -> Self {
        let config = NodeConfig {
            encryption_mode: mode,
            ..NodeConfig::default()
        };
        Self {
            svc: NodeService::with_seed(config, 0x5eed),
            hw: MockHardware::new(),
            net: MockNetwork::default(),
            gw: Gateway::new(mode),
        }
    }

    fn send(&mut self, image: &[u8]) -> FrameDisposition {
        self.svc
            .handle_frame(&mut self.hw, &mut self.net, image)
            .unwrap()
    }

    fn last_reply(&self) -> CommandFrame {
        self.gw.open(self.net.replies.last().unwrap())
    }

    fn handshake(&mut self) {
        let auth = self.gw.authenticate(0x1234);
        self.send(&auth);
        let key = self.gw.set_app_key();
        self.send(&key);
    }
}

#[test]
fn authenticate_reply_is_plaintext_with_link_report() {
    let mut b = Bench::with_mode(EncryptionMode::Scramble);
    let auth = b.gw.authenticate(0x1234);
    assert_eq!(b.send(&auth), FrameDisposition::Replied);

    let reply = CommandFrame::from_image(&b.net.replies[0]);
    assert_eq!(reply.start_marker, SFD);
    assert_eq!(reply.kind, MsgKind::Hello);
    assert_eq!(reply.error, ErrorCode::Normal);
    assert_eq!(&reply.args[..2], &[0xe5, 0x2d]);
    assert_eq!(reply.args[2], 15);
    assert_eq!(reply.args[3], 80);
    assert_eq!(&reply.args[6..8], &[0xCA, 0xFE]);
    assert_eq!(reply.args[8], 0x11);
    assert_eq!(reply.args[9], 1);
    assert_eq!(&reply.args[10..18], &[0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88]);
    assert!(crc::verify(&reply));

    assert_eq!(b.svc.state(), StateId::Hello);
    assert!(b.svc.context().handshake_in_flight);
    assert_eq!(
        b.hw.count(&HwCall::Indicator(Indicator::Session, IndicatorAction::Off)),
        1
    );
}

#[test]
fn full_handshake_in_both_modes() {
    for mode in [EncryptionMode::Scramble, EncryptionMode::Cipher] {
        let mut b = Bench::with_mode(mode);
        b.handshake();

        assert_eq!(b.svc.state(), StateId::Normal);
        assert!(b.svc.context().net.authenticated);
        assert_eq!(b.svc.context().net.app_id, 9);

        let ack = b.last_reply();
        assert_eq!(ack.command, CommandCode::SetAppKey);
        assert_eq!(ack.kind, MsgKind::Hello);
        assert!(crc::verify(&ack), "{:?}: ack CRC", mode);

        let get_key = b.gw.request(CommandCode::GetAppKey);
        assert_eq!(b.send(&get_key), FrameDisposition::Replied);
        let reply = b.last_reply();
        assert_eq!(reply.kind, MsgKind::Reply);
        assert_eq!(&reply.args[..16], b"sls-test-app-key");
    }
}

#[test]
fn requests_before_keying_are_refused() {
    let mut b = Bench::with_mode(EncryptionMode::Scramble);
    let mut f = CommandFrame::new(MsgKind::Request, CommandCode::GetRfStatus);
    f.sequence = 1;
    crc::stamp(&mut f);
    assert_eq!(b.send(&f.to_image()), FrameDisposition::Replied);

    let reply = b.last_reply();
    assert_eq!(reply.error, ErrorCode::WrongStateForHello);
    assert_eq!(reply.kind, MsgKind::Request);
}

#[test]
fn lamp_commands_reach_the_actuator() {
    let mut b = Bench::with_mode(EncryptionMode::Scramble);
    b.handshake();

    let off = b.gw.request(CommandCode::LedOff);
    b.send(&off);
    assert_eq!(b.hw.last_lamp(), Some((LampStatus::Off, 80)));

    let dim = b.gw.request_with_seq(CommandCode::LedDim, 10, |f| f.args[0] = 25);
    b.send(&dim);
    assert_eq!(b.hw.last_lamp(), Some((LampStatus::Dim, 25)));

    let status = b.gw.request_with_seq(CommandCode::GetRfStatus, 11, |_| {});
    b.send(&status);
    assert_eq!(&b.last_reply().args[..5], &[0x20, 120, 37, 25, 2]);
}

#[test]
fn replay_and_stale_requests_are_dropped() {
    let mut b = Bench::with_mode(EncryptionMode::Cipher);
    b.handshake();

    let first = b.gw.request_with_seq(CommandCode::GetNwStatus, 7, |_| {});
    assert_eq!(b.send(&first), FrameDisposition::Replied);
    let replies = b.net.replies.len();

    assert_eq!(b.send(&first), FrameDisposition::Dropped(DropReason::Replay));
    let older = b.gw.request_with_seq(CommandCode::GetNwStatus, 3, |_| {});
    assert_eq!(b.send(&older), FrameDisposition::Dropped(DropReason::Replay));
    assert_eq!(b.net.replies.len(), replies);

    let newer = b.gw.request_with_seq(CommandCode::GetNwStatus, 8, |_| {});
    assert_eq!(b.send(&newer), FrameDisposition::Replied);
    assert_eq!(b.svc.context().seq.current(), 8);
}

#[test]
fn reauthentication_resets_sequence_and_encryption() {
    let mut b = Bench::with_mode(EncryptionMode::Scramble);
    b.handshake();
    let req = b.gw.request_with_seq(CommandCode::GetRfStatus, 500, |_| {});
    b.send(&req);
    assert_eq!(b.svc.context().seq.current(), 500);

    // The gateway starts over in plaintext.
    b.gw.keyed = false;
    let auth = b.gw.authenticate(0x0001);
    b.send(&auth);
    let reply = b.last_reply();
    assert_eq!(&reply.args[..2], &[0xd3, 0xc2]);
    assert_eq!(b.svc.state(), StateId::Normal);
    assert_eq!(b.svc.context().seq.current(), 0);
    assert!(!b.svc.context().encryption_enabled);
    assert!(!b.svc.context().net.authenticated);

    let key = b.gw.set_app_key();
    b.send(&key);
    let req = b.gw.request_with_seq(CommandCode::GetRfStatus, 1, |_| {});
    assert_eq!(b.send(&req), FrameDisposition::Replied);
}

#[test]
fn unknown_request_answers_unknown_command() {
    let mut b = Bench::with_mode(EncryptionMode::Scramble);
    b.handshake();
    let timer = b.gw.request(CommandCode::TimerOn);
    b.send(&timer);
    assert_eq!(b.last_reply().error, ErrorCode::UnknownCommand);
}

#[test]
fn actuator_command_is_forwarded_in_the_clear() {
    let mut b = Bench::with_mode(EncryptionMode::Cipher);
    b.handshake();
    let replies = b.net.replies.len();

    let cmd = b.gw.request(CommandCode::Other(0x42));
    let out = b.send(&cmd);
    assert!(matches!(out, FrameDisposition::Forwarded { .. }));

    let forwarded = b.hw.forwarded();
    assert_eq!(forwarded.len(), 1);
    let f = CommandFrame::from_image(&forwarded[0]);
    assert_eq!(f.start_marker, SFD);
    assert_eq!(f.command, CommandCode::Other(0x42));
    assert!(crc::verify(&f));

    let echoed = usize::from(b.svc.config().echo_actuator_commands);
    assert_eq!(b.net.replies.len(), replies + echoed);
}

#[test]
fn echo_actuator_commands_when_configured() {
    let config = NodeConfig {
        echo_actuator_commands: true,
        encryption_mode: EncryptionMode::Scramble,
        ..NodeConfig::default()
    };
    let mut b = Bench::with_mode(EncryptionMode::Scramble);
    b.svc = NodeService::with_seed(config, 1);
    b.handshake();
    let replies = b.net.replies.len();
    let cmd = b.gw.request(CommandCode::Other(0x42));
    assert_eq!(b.send(&cmd), FrameDisposition::Forwarded { echoed: true });
    assert_eq!(b.net.replies.len(), replies + 1);
}

#[test]
fn reboot_is_acknowledged_then_restarts() {
    let mut b = Bench::with_mode(EncryptionMode::Scramble);
    b.handshake();
    let journal = Journal::default();
    b.hw.journal = Some(journal.clone());
    b.net.journal = Some(journal.clone());

    let reboot = b.gw.request(CommandCode::Reboot);
    b.send(&reboot);

    assert_eq!(b.last_reply().command, CommandCode::Reboot);
    assert!(b.svc.restart_requested());
    let entries = journal.entries();
    let reply_at = entries
        .iter()
        .position(|c| matches!(c, HwCall::Reply(_)))
        .expect("reboot acknowledged");
    let restart_at = entries
        .iter()
        .position(|c| *c == HwCall::Restart)
        .expect("restart performed");
    assert!(reply_at < restart_at, "restart before reply: {:?}", entries);
    assert_eq!(entries.last(), Some(&HwCall::Restart));
}

#[test]
fn repair_route_command_triggers_repair() {
    let mut b = Bench::with_mode(EncryptionMode::Scramble);
    b.handshake();
    let repair = b.gw.request(CommandCode::RepairRoute);
    b.send(&repair);
    assert_eq!(b.hw.count(&HwCall::RouteRepair), 1);
}
