// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sideband (GPIO) signals: seven named lines, each either host-driven or
//! module-driven. The writer set for each line is a singleton by
//! construction — `set_host_driven` rejects a module-driven signal and
//! vice versa — so there is never a question of who last wrote a line.

use std::collections::HashMap;

use xcvr_proto::{Level, Signal};

fn is_host_driven(signal: Signal) -> bool {
    matches!(signal, Signal::ResetL | Signal::LPMode | Signal::TxDisable)
}

/// Current level of all seven lines for one module slot.
///
/// The state machine observes host-driven transitions by calling
/// [`Sideband::set_host_driven`] and checking the returned previous
/// level rather than registering a callback: with a single cooperative
/// `tick()` loop and no concurrent writers, a pull-the-diff model is
/// simpler than a subscriber list and just as correct.
pub struct Sideband {
    levels: HashMap<Signal, Level>,
}

impl Sideband {
    /// A freshly attached module: host lines at their MSA idle defaults,
    /// `ModPrsL` asserted (module present), no fault/interrupt/LOS.
    pub fn attached() -> Self {
        let mut levels = HashMap::new();
        levels.insert(Signal::ModPrsL, Level::Low); // present
        levels.insert(Signal::ResetL, Level::High); // not held in reset
        levels.insert(Signal::LPMode, Level::High); // force low-power until the host clears it
        levels.insert(Signal::IntL, Level::High); // no interrupt pending
        levels.insert(Signal::TxDisable, Level::Low);
        levels.insert(Signal::RxLOS, Level::Low);
        levels.insert(Signal::TxFault, Level::Low);
        Sideband { levels }
    }

    /// An empty cage: only `ModPrsL` is meaningful (deasserted).
    pub fn unplugged() -> Self {
        let mut levels = HashMap::new();
        levels.insert(Signal::ModPrsL, Level::High);
        levels.insert(Signal::ResetL, Level::High);
        levels.insert(Signal::LPMode, Level::High);
        levels.insert(Signal::IntL, Level::High);
        levels.insert(Signal::TxDisable, Level::Low);
        levels.insert(Signal::RxLOS, Level::Low);
        levels.insert(Signal::TxFault, Level::Low);
        Sideband { levels }
    }

    pub fn get(&self, signal: Signal) -> Level {
        *self.levels.get(&signal).unwrap_or(&Level::High)
    }

    /// Host writes a host-driven line. Returns the previous level so a
    /// caller can detect edges without a subscriber mechanism.
    pub fn set_host_driven(&mut self, signal: Signal, level: Level) -> Level {
        debug_assert!(is_host_driven(signal), "{signal:?} is not host-driven");
        let prev = self.get(signal);
        self.levels.insert(signal, level);
        if prev != level {
            log::debug!("host drove {signal:?} {prev:?} -> {level:?}");
        }
        prev
    }

    /// State machine / monitoring engine writes a module-driven line.
    pub fn set_module_driven(&mut self, signal: Signal, level: Level) -> Level {
        debug_assert!(!is_host_driven(signal), "{signal:?} is not module-driven");
        let prev = self.get(signal);
        self.levels.insert(signal, level);
        if prev != level {
            log::debug!("module drove {signal:?} {prev:?} -> {level:?}");
        }
        prev
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freshly_attached_module_asserts_mod_prs_l() {
        let sb = Sideband::attached();
        assert_eq!(sb.get(Signal::ModPrsL), Level::Low);
    }

    #[test]
    fn host_write_reports_previous_level() {
        let mut sb = Sideband::attached();
        let prev = sb.set_host_driven(Signal::LPMode, Level::Low);
        assert_eq!(prev, Level::High);
        assert_eq!(sb.get(Signal::LPMode), Level::Low);
    }
}
