//! Function-pointer session state machine.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  StateTable                                                │
//! │  ┌─────────┬──────────┬──────────────────┬───────────────┐ │
//! │  │ StateId │ on_enter │ on_hello         │ on_request    │ │
//! │  ├─────────┼──────────┼──────────────────┼───────────────┤ │
//! │  │ Hello   │ —        │ fn(ctx, frame)   │ fn(ctx,frame) │ │
//! │  │ Normal  │ fn(ctx)  │ fn(ctx, frame)   │ fn(ctx,frame) │ │
//! │  └─────────┴──────────┴──────────────────┴───────────────┘ │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! The machine is driven solely by received frames.  For each frame the
//! engine picks the current state's handler by frame kind; the handler
//! builds the reply and may name a next state.  There is no timeout and no
//! path back to Hello short of a restart.

pub mod context;
pub mod states;

use context::SessionContext;
use log::info;

use crate::protocol::frame::{CommandFrame, MsgKind};

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Must stay in sync with [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    Hello = 0,
    Normal = 1,
}

impl StateId {
    pub const COUNT: usize = 2;

    pub fn from_index(idx: usize) -> Self {
        match idx {
            1 => Self::Normal,
            0 => Self::Hello,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Hello
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Runs once when a state is entered.
pub type StateActionFn = fn(&mut SessionContext);

/// Handles one inbound frame of a given kind.
pub type FrameHandlerFn = fn(&mut SessionContext, &CommandFrame) -> Handled;

/// What a frame handler produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handled {
    pub reply: CommandFrame,
    pub next: Option<StateId>,
}

impl Handled {
    pub fn stay(reply: CommandFrame) -> Self {
        Self { reply, next: None }
    }

    pub fn goto(reply: CommandFrame, next: StateId) -> Self {
        Self {
            reply,
            next: Some(next),
        }
    }
}

// ---------------------------------------------------------------------------
// State descriptor
// ---------------------------------------------------------------------------

pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_hello: FrameHandlerFn,
    pub on_request: FrameHandlerFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

pub struct Fsm {
    table: [StateDescriptor; StateId::COUNT],
    current: usize,
    /// Frames handled since boot.
    frame_count: u64,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        Self {
            table,
            current: initial as usize,
            frame_count: 0,
        }
    }

    /// Machine with the standard table, in Hello.
    pub fn boot() -> Self {
        Self::new(states::build_state_table(), StateId::Hello)
    }

    /// Run `on_enter` for the initial state.
    pub fn start(&mut self, ctx: &mut SessionContext) {
        info!("session starting in state: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Route a frame that passed the sequence check to the current state's
    /// handler and return the reply.
    ///
    /// Hello-kind frames go to `on_hello`, Request-kind to `on_request`.
    /// Any other kind is echoed back unchanged.
    pub fn dispatch(&mut self, ctx: &mut SessionContext, frame: &CommandFrame) -> CommandFrame {
        let handler = match frame.kind {
            MsgKind::Hello => self.table[self.current].on_hello,
            MsgKind::Request => self.table[self.current].on_request,
            _ => return *frame,
        };
        self.frame_count += 1;

        let handled = handler(ctx, frame);
        let current = self.current;
        if let Some(next) = handled.next.filter(|n| *n as usize != current) {
            self.transition(next, ctx);
        }
        handled.reply
    }

    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    pub fn frames_handled(&self) -> u64 {
        self.frame_count
    }

    fn transition(&mut self, next_id: StateId, ctx: &mut SessionContext) {
        let next_idx = next_id as usize;
        info!(
            "session transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );
        self.current = next_idx;
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}
