//! Node configuration parameters
//!
//! All tunable parameters for the node session engine.  Defaults carry the
//! deployed network's constants; the host binary can override them from a
//! JSON file.

use std::net::{IpAddr, Ipv6Addr};

use serde::{Deserialize, Serialize};

use crate::protocol::security::EncryptionMode;

/// Configuration validation failure.  The `&'static str` names the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigError(pub &'static str);

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "validation failed: {}", self.0)
    }
}

impl From<ConfigError> for crate::error::Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e.0)
    }
}

/// Core node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    // --- Network identity ---
    /// PAN identifier reported in link reports
    pub pan_id: u16,
    /// Local address the query socket binds to
    pub bind_addr: IpAddr,
    /// Port on which the node answers queries
    pub query_port: u16,
    /// Gateway port that receives async alerts
    pub alert_port: u16,
    /// Fixed gateway (border router) address for async alerts
    pub gateway_addr: Ipv6Addr,

    // --- Security ---
    /// Payload transform applied once the session is keyed
    pub encryption_mode: EncryptionMode,
    /// Link-layer security enabled flag (reported only)
    pub security_enabled: bool,
    /// Link-layer security level (reported only)
    pub link_security_level: u8,
    /// Radio duty-cycle channel check rate (reported only)
    pub channel_check_rate: u8,
    /// Drop frames whose CRC does not match instead of only logging them
    pub enforce_crc: bool,
    /// Answer actuator-class commands over the network as well as forwarding them
    pub echo_actuator_commands: bool,

    // --- Supervisor timing ---
    /// Supervisor tick period (milliseconds)
    pub tick_period_ms: u32,
    /// Ticks per heartbeat window; one coarse step per window
    pub heartbeat_window_ticks: u16,
    /// Coarse counter wrap bound (coarse steps)
    pub coarse_wrap: u16,
    /// Sensor snapshot refresh interval (seconds)
    pub sensor_read_interval_secs: u32,
    /// Periodic alert interval (seconds)
    pub alert_interval_secs: u32,
    /// Connectivity re-evaluation interval (seconds)
    pub connectivity_check_secs: u32,
    /// Consecutive failed connectivity checks before route repair
    pub lost_connection_threshold: u8,

    // --- Alerts ---
    /// Copies sent per periodic alert burst (all share one sequence number)
    pub alert_retransmissions: u8,
    /// Re-arm the emergency flag after each burst (false = send once)
    pub continuous_alerts: bool,
    /// Emergency flag state at boot
    pub emergency_armed_at_boot: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            // Network identity
            pan_id: 0xCAFE,
            bind_addr: IpAddr::V6(Ipv6Addr::UNSPECIFIED),
            query_port: 3000,
            alert_port: 3001,
            gateway_addr: Ipv6Addr::new(0xaaaa, 0, 0, 0, 0, 0, 0, 1),

            // Security
            encryption_mode: EncryptionMode::build_default(),
            security_enabled: true,
            link_security_level: 1,
            channel_check_rate: 64,
            enforce_crc: false,
            echo_actuator_commands: cfg!(feature = "sim-actuator-replies"),

            // Supervisor timing
            tick_period_ms: 1000,
            heartbeat_window_ticks: 10,
            coarse_wrap: 60,
            sensor_read_interval_secs: 30,
            alert_interval_secs: 60,
            connectivity_check_secs: 50,
            lost_connection_threshold: 3,

            // Alerts
            alert_retransmissions: 2,
            continuous_alerts: true,
            emergency_armed_at_boot: true,
        }
    }
}

impl NodeConfig {
    /// Seconds covered by one coarse supervisor step.
    pub fn coarse_step_secs(&self) -> Result<u32, ConfigError> {
        self.tick_period_ms
            .checked_mul(u32::from(self.heartbeat_window_ticks))
            .map(|ms| ms / 1000)
            .ok_or(ConfigError("coarse step overflows u32 milliseconds"))
    }

    /// Coarse steps between sensor refreshes.
    pub fn sensor_read_every(&self) -> u16 {
        self.steps_for(self.sensor_read_interval_secs)
    }

    /// Coarse steps between periodic alert bursts.
    pub fn alert_every(&self) -> u16 {
        self.steps_for(self.alert_interval_secs)
    }

    /// Coarse steps between connectivity checks.
    pub fn connectivity_every(&self) -> u16 {
        self.steps_for(self.connectivity_check_secs)
    }

    /// Only meaningful on a validated config; out-of-range counts saturate.
    fn steps_for(&self, secs: u32) -> u16 {
        let step = self.coarse_step_secs().unwrap_or(u32::MAX).max(1);
        u16::try_from(secs / step).unwrap_or(u16::MAX)
    }

    /// Reject configurations the supervisor cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_period_ms == 0 {
            return Err(ConfigError("tick_period_ms must be > 0"));
        }
        if self.heartbeat_window_ticks == 0 {
            return Err(ConfigError("heartbeat_window_ticks must be > 0"));
        }
        let step = self.coarse_step_secs()?;
        if step == 0 {
            return Err(ConfigError("coarse step must be at least one second"));
        }
        if self.coarse_wrap == 0 {
            return Err(ConfigError("coarse_wrap must be > 0"));
        }
        for (secs, field) in [
            (self.sensor_read_interval_secs, "sensor_read_interval_secs"),
            (self.alert_interval_secs, "alert_interval_secs"),
            (self.connectivity_check_secs, "connectivity_check_secs"),
        ] {
            if secs == 0 || secs % step != 0 {
                return Err(ConfigError(field));
            }
            // Must fit inside one coarse wrap.
            match u16::try_from(secs / step) {
                Ok(steps) if steps <= self.coarse_wrap => {}
                _ => return Err(ConfigError(field)),
            }
        }
        if self.lost_connection_threshold == 0 {
            return Err(ConfigError("lost_connection_threshold must be > 0"));
        }
        if self.alert_retransmissions == 0 {
            return Err(ConfigError("alert_retransmissions must be > 0"));
        }
        Ok(())
    }
}
