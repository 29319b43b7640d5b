//! Connectivity supervisor.
//!
//! Driven by the 1 Hz tick.  Two layered counters:
//!
//! ```text
//!  tick ──▶ heartbeat window (ticks 1..window-1: link indicator only)
//!             │
//!             └─ tick == window ──▶ coarse step (wraps at coarse_wrap)
//!                                     ├─ every sensor_read_every : ReadSensors
//!                                     │                             (Restart if counter corrupt)
//!                                     ├─ every alert_every        : AlertBurst
//!                                     │                             (Normal + armed + authenticated)
//!                                     └─ every connectivity_every : link evaluation
//!                                           up   → RefreshNextHop, AnnounceJoin?
//!                                           down → lost += 1, RepairRoute at threshold
//! ```
//!
//! The supervisor owns the connectivity bookkeeping in the session context
//! (`connected`, `lost_connection_count`, and the flags cleared on repair).
//! Everything that needs hardware or the network comes back as a
//! [`SupervisorAction`] for the node service to carry out, in order.

use heapless::Vec;
use log::{info, warn};

use crate::config::NodeConfig;
use crate::fsm::StateId;
use crate::fsm::context::SessionContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorAction {
    /// Sub-window tick: blink if connected, hold steady otherwise.
    Heartbeat { connected: bool },
    ReadSensors,
    /// The coarse counter is out of range; restart the node.
    Restart,
    /// Send the periodic alert burst, then re-arm per configuration.
    AlertBurst,
    RefreshNextHop,
    /// Reset sequence counters and send the join announcement.
    AnnounceJoin,
    RepairRoute,
}

/// Worst case per tick: sensors, restart, burst, refresh, join.
pub const MAX_ACTIONS: usize = 6;

pub type Actions = Vec<SupervisorAction, MAX_ACTIONS>;

pub struct ConnectivitySupervisor {
    window: u16,
    coarse_wrap: u16,
    sensor_every: u16,
    alert_every: u16,
    connectivity_every: u16,
    lost_threshold: u8,

    sub_ticks: u16,
    coarse: u16,
}

impl ConnectivitySupervisor {
    pub fn new(config: &NodeConfig) -> Self {
        Self {
            window: config.heartbeat_window_ticks,
            coarse_wrap: config.coarse_wrap,
            sensor_every: config.sensor_read_every().max(1),
            alert_every: config.alert_every().max(1),
            connectivity_every: config.connectivity_every().max(1),
            lost_threshold: config.lost_connection_threshold,
            sub_ticks: 0,
            coarse: 0,
        }
    }

    /// Advance by one tick.
    pub fn tick(&mut self, ctx: &mut SessionContext, state: StateId, link_up: bool) -> Actions {
        let mut actions = Actions::new();

        self.sub_ticks += 1;
        if self.sub_ticks < self.window {
            push(&mut actions, SupervisorAction::Heartbeat { connected: link_up });
            return actions;
        }

        self.sub_ticks = 0;
        self.coarse += 1;
        if self.coarse == self.coarse_wrap {
            self.coarse = 0;
        }

        if self.coarse % self.sensor_every == 0 {
            push(&mut actions, SupervisorAction::ReadSensors);
            if self.coarse > self.coarse_wrap {
                warn!("supervisor: coarse counter {} out of range, restarting", self.coarse);
                push(&mut actions, SupervisorAction::Restart);
            }
        }

        if self.coarse % self.alert_every == 0
            && state == StateId::Normal
            && ctx.emergency_armed
            && ctx.net.authenticated
        {
            push(&mut actions, SupervisorAction::AlertBurst);
        }

        if self.coarse % self.connectivity_every == 0 {
            self.evaluate_link(ctx, link_up, &mut actions);
        }

        actions
    }

    fn evaluate_link(&mut self, ctx: &mut SessionContext, link_up: bool, actions: &mut Actions) {
        if link_up {
            if !ctx.net.connected {
                info!("supervisor: link up");
            }
            ctx.net.connected = true;
            ctx.net.lost_connection_count = 0;
            push(actions, SupervisorAction::RefreshNextHop);
            if !ctx.net.authenticated && !ctx.handshake_in_flight {
                info!("supervisor: announcing join");
                push(actions, SupervisorAction::AnnounceJoin);
            }
            return;
        }

        ctx.net.lost_connection_count += 1;
        warn!(
            "supervisor: not connected ({}/{})",
            ctx.net.lost_connection_count, self.lost_threshold
        );
        if ctx.net.lost_connection_count >= self.lost_threshold {
            warn!("supervisor: link lost, requesting route repair");
            ctx.net.connected = false;
            ctx.net.lost_connection_count = 0;
            ctx.net.authenticated = false;
            ctx.handshake_in_flight = false;
            push(actions, SupervisorAction::RepairRoute);
        }
    }

    /// Coarse steps since the last wrap.
    pub fn coarse_count(&self) -> u16 {
        self.coarse
    }
}

fn push(actions: &mut Actions, action: SupervisorAction) {
    if actions.push(action).is_err() {
        warn!("supervisor: action list full, dropping {:?}", action);
    }
}
