//! Periodic alert bursts and relayed actuator-driver notifications.

use core::time::Duration;

use sls_node::app::alerts::JITTER_UNIT;
use sls_node::app::service::NodeService;
use sls_node::config::NodeConfig;
use sls_node::protocol::crc;
use sls_node::protocol::frame::{CommandCode, MsgKind, SFD};
use sls_node::protocol::security::EncryptionMode;

use crate::mock_hw::{Gateway, MockHardware, MockNetwork};

fn keyed_node(config: NodeConfig) -> (NodeService, MockHardware, MockNetwork, Gateway) {
    let config = NodeConfig {
        encryption_mode: EncryptionMode::Cipher,
        ..config
    };
    let mut svc = NodeService::with_seed(config, 1234);
    let mut hw = MockHardware::new();
    let mut net = MockNetwork::default();
    let mut gw = Gateway::new(EncryptionMode::Cipher);
    svc.handle_frame(&mut hw, &mut net, &gw.authenticate(7)).unwrap();
    svc.handle_frame(&mut hw, &mut net, &gw.set_app_key()).unwrap();
    (svc, hw, net, gw)
}

fn ticks(svc: &mut NodeService, hw: &mut MockHardware, net: &mut MockNetwork, n: u32) {
    for _ in 0..n {
        svc.tick(hw, net);
    }
}

#[test]
fn burst_every_minute_shares_one_sequence() {
    let (mut svc, mut hw, mut net, gw) = keyed_node(NodeConfig::default());
    ticks(&mut svc, &mut hw, &mut net, 60);
    assert_eq!(net.alerts.len(), 2);

    let a = gw.open(&net.alerts[0].image);
    let b = gw.open(&net.alerts[1].image);
    assert_eq!(a.kind, MsgKind::Async);
    assert_eq!(a.command, CommandCode::AsyncAlert);
    assert_eq!(a.sequence, 1);
    assert_eq!(b.sequence, 1);
    assert!(crc::verify(&a));

    ticks(&mut svc, &mut hw, &mut net, 60);
    assert_eq!(net.alerts.len(), 4);
    assert_eq!(gw.open(&net.alerts[2].image).sequence, 2);
}

#[test]
fn burst_payload_carries_identity_and_environment() {
    let (mut svc, mut hw, mut net, gw) = keyed_node(NodeConfig::default());
    ticks(&mut svc, &mut hw, &mut net, 60);
    let f = gw.open(&net.alerts[0].image);
    assert_eq!(&f.args[..2], &[9, 0]);
    assert_eq!(i16::from_le_bytes([f.args[2], f.args[3]]), -125);
    assert_eq!(u16::from_le_bytes([f.args[4], f.args[5]]), 300);
    assert_eq!(u16::from_le_bytes([f.args[6], f.args[7]]), 1013);
    assert_eq!(u16::from_le_bytes([f.args[8], f.args[9]]), 4500);
}

#[test]
fn one_shot_alerts_disarm_after_first_burst() {
    let config = NodeConfig {
        continuous_alerts: false,
        ..NodeConfig::default()
    };
    let (mut svc, mut hw, mut net, _) = keyed_node(config);
    ticks(&mut svc, &mut hw, &mut net, 180);
    assert_eq!(net.alerts.len(), 2);
    assert!(!svc.context().emergency_armed);
}

#[test]
fn jitter_scales_with_application_id() {
    let (mut svc, mut hw, mut net, _) = keyed_node(NodeConfig::default());
    ticks(&mut svc, &mut hw, &mut net, 60);
    let bound = JITTER_UNIT * ((u32::from(u16::MAX) / 9 + 8 * 100) * 9);
    for alert in &net.alerts {
        assert!(alert.delay <= bound);
    }
    assert!(net.alerts.iter().any(|a| a.delay > Duration::ZERO));
}

#[test]
fn no_alerts_without_route() {
    let (mut svc, mut hw, mut net, _) = keyed_node(NodeConfig::default());
    hw.link_up = false;
    ticks(&mut svc, &mut hw, &mut net, 60);
    assert!(net.alerts.is_empty());
    assert_eq!(svc.context().seq.async_seq(), 0);
}

#[test]
fn full_alert_queue_does_not_stall_the_node() {
    let (mut svc, mut hw, mut net, _) = keyed_node(NodeConfig::default());
    net.alert_queue_full = true;
    ticks(&mut svc, &mut hw, &mut net, 60);
    assert!(net.alerts.is_empty());
    assert_eq!(svc.context().seq.async_seq(), 1);
}

#[test]
fn actuator_records_are_relayed_as_alerts() {
    let (mut svc, mut hw, mut net, gw) = keyed_node(NodeConfig::default());
    hw.actuator_rx = vec![0xEE, SFD, 10, 11, 12];
    assert_eq!(svc.poll_actuator_link(&mut hw, &mut net), 0);
    hw.actuator_rx = vec![13, 14, 15, 16, 17, 18, SFD, 1, 2, 3, 4, 5, 6, 7, 8, 9];
    assert_eq!(svc.poll_actuator_link(&mut hw, &mut net), 2);

    let first = gw.open(&net.alerts[0].image);
    let second = gw.open(&net.alerts[1].image);
    assert_eq!(&first.args[10..19], &[10, 11, 12, 13, 14, 15, 16, 17, 18]);
    assert_eq!(&second.args[10..19], &[1, 2, 3, 4, 5, 6, 7, 8, 9]);
    assert_eq!(first.sequence + 1, second.sequence);
}

#[test]
fn refused_relay_does_not_lose_later_records() {
    let (mut svc, mut hw, mut net, gw) = keyed_node(NodeConfig::default());
    net.reject_next_alerts = 1;
    hw.actuator_rx = vec![SFD, 1, 2, 3, 4, 5, 6, 7, 8, 9];
    hw.actuator_rx.extend([SFD, 21, 22, 23, 24, 25, 26, 27, 28, 29]);
    assert_eq!(svc.poll_actuator_link(&mut hw, &mut net), 1);

    assert_eq!(net.alerts.len(), 1);
    let relayed = gw.open(&net.alerts[0].image);
    assert_eq!(&relayed.args[10..19], &[21, 22, 23, 24, 25, 26, 27, 28, 29]);
}

#[test]
fn actuator_records_need_a_session() {
    let mut svc = NodeService::with_seed(NodeConfig::default(), 5);
    let mut hw = MockHardware::new();
    let mut net = MockNetwork::default();
    hw.actuator_rx = vec![SFD, 1, 2, 3, 4, 5, 6, 7, 8, 9];
    assert_eq!(svc.poll_actuator_link(&mut hw, &mut net), 0);
    assert!(net.alerts.is_empty());
}
