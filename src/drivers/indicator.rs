//! Indicator LED bank.
//!
//! Two discrete LEDs: the link LED (heartbeat while connected, steady on
//! while searching) and the session LED (on once keyed).  Generic over any
//! `embedded-hal` stateful output pin so the same driver runs on a board or
//! against in-memory pins.

use embedded_hal::digital::StatefulOutputPin;
use log::warn;

use crate::app::ports::IndicatorPort;
use crate::fsm::context::{Indicator, IndicatorAction};

pub struct IndicatorBank<L, S> {
    link: L,
    session: S,
}

impl<L, S> IndicatorBank<L, S>
where
    L: StatefulOutputPin,
    S: StatefulOutputPin,
{
    pub fn new(link: L, session: S) -> Self {
        Self { link, session }
    }

    /// Both LEDs off.
    pub fn clear(&mut self) {
        self.set_indicator(Indicator::Link, IndicatorAction::Off);
        self.set_indicator(Indicator::Session, IndicatorAction::Off);
    }

    #[cfg(test)]
    fn release(self) -> (L, S) {
        (self.link, self.session)
    }
}

fn drive<P: StatefulOutputPin>(pin: &mut P, action: IndicatorAction) -> Result<(), P::Error> {
    match action {
        IndicatorAction::On => pin.set_high(),
        IndicatorAction::Off => pin.set_low(),
        IndicatorAction::Toggle => pin.toggle(),
    }
}

impl<L, S> IndicatorPort for IndicatorBank<L, S>
where
    L: StatefulOutputPin,
    S: StatefulOutputPin,
{
    fn set_indicator(&mut self, indicator: Indicator, action: IndicatorAction) {
        let ok = match indicator {
            Indicator::Link => drive(&mut self.link, action).is_ok(),
            Indicator::Session => drive(&mut self.session, action).is_ok(),
        };
        if !ok {
            warn!("indicator: {:?} pin did not accept {:?}", indicator, action);
        }
    }
}
