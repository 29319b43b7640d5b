//! Session context threaded through every state handler.
//!
//! `SessionContext` is the single owned value that replaces the node's
//! process-wide globals: network bookkeeping, sequence counters, the lamp
//! model, the environment snapshot and the flags that gate encryption and
//! the join announcement.  Handlers read and write it; side effects that
//! need hardware are queued in [`SessionContext::effects`] and applied by
//! the node service once the handler returns.

use std::net::Ipv6Addr;

use heapless::Vec;
use log::warn;

use crate::config::NodeConfig;
use crate::protocol::security::{AppKey, EncryptionMode, KEY_LEN};
use crate::protocol::sequence::SequenceGuard;

// ---------------------------------------------------------------------------
// Radio and network bookkeeping
// ---------------------------------------------------------------------------

/// Radio link parameters, refreshed before each protocol interaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RadioParameters {
    pub channel: u8,
    /// Received signal strength of the last packet (dBm).
    pub rssi: i8,
    pub lqi: u8,
    /// Transmit power (dBm).
    pub tx_power: i8,
}

/// Static link facts reported to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkProfile {
    pub pan_id: u16,
    pub security_enabled: bool,
    pub link_security_level: u8,
    pub encryption_mode: EncryptionMode,
    pub channel_check_rate: u8,
}

impl LinkProfile {
    pub fn from_config(config: &NodeConfig) -> Self {
        Self {
            pan_id: config.pan_id,
            security_enabled: config.security_enabled,
            link_security_level: config.link_security_level,
            encryption_mode: config.encryption_mode,
            channel_check_rate: config.channel_check_rate,
        }
    }
}

/// Everything the node knows about its network attachment and session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkContext {
    pub radio: RadioParameters,
    pub next_hop: Ipv6Addr,
    pub connected: bool,
    pub lost_connection_count: u8,
    pub authenticated: bool,
    pub challenge_code: u16,
    pub challenge_response: u16,
    pub application_key: AppKey,
    /// Application identifier assigned with the key (seeds alert jitter).
    pub app_id: u16,
}

impl Default for NetworkContext {
    fn default() -> Self {
        Self {
            radio: RadioParameters::default(),
            next_hop: Ipv6Addr::UNSPECIFIED,
            connected: false,
            lost_connection_count: 0,
            authenticated: false,
            challenge_code: 0,
            challenge_response: 0,
            application_key: [0; KEY_LEN],
            app_id: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Lamp model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LampStatus {
    Off = 0,
    On = 1,
    Dim = 2,
}

/// Lamp telemetry reported by `GetRfStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LampState {
    pub id: u8,
    pub power: u8,
    pub temperature: u8,
    pub dim: u8,
    pub status: LampStatus,
}

impl Default for LampState {
    fn default() -> Self {
        Self {
            id: 0x20,
            power: 120,
            temperature: 37,
            dim: 80,
            status: LampStatus::On,
        }
    }
}

// ---------------------------------------------------------------------------
// Environment snapshot (produced by the sensor port, carried in alerts)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvironmentSnapshot {
    /// Temperature in tenths of a degree.
    pub temperature: i16,
    pub light: u16,
    pub pressure: u16,
    pub humidity: u16,
}

impl EnvironmentSnapshot {
    /// Encoded size inside an alert payload, app id included.
    pub const ENCODED_LEN: usize = 10;

    /// Encode as `app_id, temperature, light, pressure, humidity`, all
    /// little-endian.
    pub fn encode(&self, app_id: u16) -> [u8; Self::ENCODED_LEN] {
        let mut out = [0u8; Self::ENCODED_LEN];
        out[0..2].copy_from_slice(&app_id.to_le_bytes());
        out[2..4].copy_from_slice(&self.temperature.to_le_bytes());
        out[4..6].copy_from_slice(&self.light.to_le_bytes());
        out[6..8].copy_from_slice(&self.pressure.to_le_bytes());
        out[8..10].copy_from_slice(&self.humidity.to_le_bytes());
        out
    }
}

// ---------------------------------------------------------------------------
// Deferred side effects
// ---------------------------------------------------------------------------

/// Visual indicators driven by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    /// Link heartbeat; steady when disconnected.
    Link,
    /// Session keyed.
    Session,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorAction {
    On,
    Off,
    Toggle,
}

/// Hardware work requested by a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Lamp(LampStatus, u8),
    Indicator(Indicator, IndicatorAction),
    RepairRoute,
    /// Always applied after the reply has gone out.
    Restart,
}

const MAX_EFFECTS: usize = 8;

// ---------------------------------------------------------------------------
// SessionContext
// ---------------------------------------------------------------------------

pub struct SessionContext {
    pub net: NetworkContext,
    pub seq: SequenceGuard,
    pub lamp: LampState,
    pub environment: EnvironmentSnapshot,
    pub profile: LinkProfile,

    // -- Flags --
    /// Payload transform active (set once keyed, cleared by Authenticate).
    pub encryption_enabled: bool,
    /// An Authenticate arrived and the key has not been lost since.
    pub handshake_in_flight: bool,
    /// Periodic alert bursts are armed.
    pub emergency_armed: bool,

    /// Effects queued by the last handler, drained by the service.
    pub effects: Vec<Effect, MAX_EFFECTS>,
}

impl SessionContext {
    pub fn new(config: &NodeConfig) -> Self {
        Self {
            net: NetworkContext::default(),
            seq: SequenceGuard::new(),
            lamp: LampState::default(),
            environment: EnvironmentSnapshot::default(),
            profile: LinkProfile::from_config(config),
            encryption_enabled: false,
            handshake_in_flight: false,
            emergency_armed: config.emergency_armed_at_boot,
            effects: Vec::new(),
        }
    }

    /// Queue a side effect for the service to apply.
    pub fn emit(&mut self, effect: Effect) {
        if self.effects.push(effect).is_err() {
            warn!("session: effect queue full, dropping {:?}", effect);
        }
    }

    /// Take every queued effect, oldest first.
    pub fn take_effects(&mut self) -> Vec<Effect, MAX_EFFECTS> {
        core::mem::take(&mut self.effects)
    }
}
