// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The CMIS module/data-path state machine (CMIS 4.0 §6.3). SFF-8472 and
//! SFF-8636 modules have no explicit state machine — their "state" is just
//! the control-register bits a host reads back directly — so this module
//! is only driven for [`xcvr_proto::ModuleFamily::Cmis`] modules.

use xcvr_proto::{EmuError, Level, Signal};

use crate::gpio::Sideband;
use crate::layouts::cmis::{lower, page10, page11, MAX_LANES};
use crate::map::MemoryMap;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum ModuleState {
    LowPwr = 0,
    PwrUp = 1,
    Ready = 2,
    PwrDn = 3,
    Fault = 4,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum DataPathState {
    Deactivated = 0,
    Init = 1,
    Deinit = 2,
    Activated = 3,
    TxTurnOn = 4,
    TxTurnOff = 5,
    TxOff = 6,
}

/// Default number of `tick()`s `ResetL` must be held asserted before the
/// module reaches `MODULE_LOW_PWR`, per CMIS §6.3.2.
pub const DEFAULT_RESET_HOLD_TICKS: u32 = 2;
/// Default number of `tick()`s from `MODULE_PWR_UP` to `MODULE_READY`.
pub const DEFAULT_INIT_TICKS: u32 = 2;

/// Per-lane independent sub-machine: each lane reacts to its own
/// `DataPathDeinit` control bit, and ties between simultaneously-eligible
/// lanes break by ascending lane index (lane 0 transitions before lane 1
/// in the same `tick()`).
struct Lane {
    state: DataPathState,
}

pub struct StateMachine {
    module_state: ModuleState,
    reset_hold_remaining: Option<u32>,
    init_remaining: Option<u32>,
    reset_hold_ticks: u32,
    init_ticks: u32,
    lanes: Vec<Lane>,
    fault_latched: bool,
}

impl StateMachine {
    pub fn new() -> Self {
        StateMachine {
            module_state: ModuleState::LowPwr,
            reset_hold_remaining: None,
            init_remaining: None,
            reset_hold_ticks: DEFAULT_RESET_HOLD_TICKS,
            init_ticks: DEFAULT_INIT_TICKS,
            lanes: (0..MAX_LANES).map(|_| Lane { state: DataPathState::Deactivated }).collect(),
            fault_latched: false,
        }
    }

    pub fn with_timing(mut self, reset_hold_ticks: u32, init_ticks: u32) -> Self {
        self.reset_hold_ticks = reset_hold_ticks;
        self.init_ticks = init_ticks;
        self
    }

    pub fn module_state(&self) -> ModuleState {
        if self.fault_latched {
            ModuleState::Fault
        } else {
            self.module_state
        }
    }

    /// Latch a fault. Cleared only by a reset pulse (`ResetL` asserted).
    pub fn inject_fault(&mut self) {
        self.fault_latched = true;
    }

    /// Advance the state machine by one tick, given the current sideband
    /// levels and the map's control-register bits. Writes `module_state`
    /// and per-lane `DataPathState` back into `map`, and asserts `IntL`
    /// when a flag byte is nonzero.
    pub fn tick(&mut self, map: &mut MemoryMap, sideband: &mut Sideband) {
        let reset_asserted = sideband.get(Signal::ResetL) == Level::Low;
        let lpmode = sideband.get(Signal::LPMode) == Level::High;
        let low_pwr_request_sw = map
            .read_one(lower::MODULE_CONTROL)
            .map(|b| b & lower::LOW_PWR_REQUEST_SW != 0)
            .unwrap_or(false);

        if reset_asserted {
            self.fault_latched = false;
            self.reset_hold_remaining = Some(self.reset_hold_remaining.unwrap_or(self.reset_hold_ticks));
            let remaining = self.reset_hold_remaining.unwrap().saturating_sub(1);
            self.reset_hold_remaining = Some(remaining);
            if remaining == 0 {
                self.module_state = ModuleState::LowPwr;
                self.init_remaining = None;
            }
        } else {
            self.reset_hold_remaining = None;
            match self.module_state {
                ModuleState::LowPwr => {
                    if !lpmode && !low_pwr_request_sw {
                        self.module_state = ModuleState::PwrUp;
                        self.init_remaining = Some(self.init_ticks);
                    }
                }
                ModuleState::PwrUp => {
                    if lpmode || low_pwr_request_sw {
                        self.module_state = ModuleState::LowPwr;
                        self.init_remaining = None;
                    } else if let Some(remaining) = self.init_remaining {
                        let remaining = remaining.saturating_sub(1);
                        if remaining == 0 {
                            self.module_state = ModuleState::Ready;
                            self.init_remaining = None;
                        } else {
                            self.init_remaining = Some(remaining);
                        }
                    }
                }
                ModuleState::Ready => {
                    if lpmode || low_pwr_request_sw {
                        self.module_state = ModuleState::PwrDn;
                    }
                }
                ModuleState::PwrDn => {
                    self.module_state = ModuleState::LowPwr;
                }
                ModuleState::Fault => {}
            }
        }

        let deinit_bitmap = map.peek_page(0, 0x10, page10::DATA_PATH_DEINIT).unwrap_or(0);
        for (i, lane) in self.lanes.iter_mut().enumerate() {
            let deinit_requested = deinit_bitmap & (1 << i) != 0;
            lane.state = Self::next_lane_state(lane.state, self.module_state(), deinit_requested);
        }

        self.write_back(map, sideband);
    }

    fn next_lane_state(current: DataPathState, module_state: ModuleState, deinit_requested: bool) -> DataPathState {
        if module_state != ModuleState::Ready {
            return DataPathState::Deactivated;
        }
        match current {
            DataPathState::Deactivated => DataPathState::Init,
            DataPathState::Init if deinit_requested => DataPathState::Deinit,
            DataPathState::Init => DataPathState::TxTurnOn,
            DataPathState::TxTurnOn => DataPathState::Activated,
            DataPathState::Activated if deinit_requested => DataPathState::TxTurnOff,
            DataPathState::Activated => DataPathState::Activated,
            DataPathState::TxTurnOff => DataPathState::TxOff,
            DataPathState::TxOff => DataPathState::Deinit,
            DataPathState::Deinit if deinit_requested => DataPathState::Deinit,
            DataPathState::Deinit => DataPathState::Init,
        }
    }

    fn write_back(&self, map: &mut MemoryMap, sideband: &mut Sideband) {
        let state_bits = (self.module_state() as u8) << lower::MODULE_STATE_SHIFT;
        let byte = map.read_one(lower::MODULE_STATE).unwrap_or(0);
        let cleared = byte & !lower::MODULE_STATE_MASK;
        map.force_write(lower::MODULE_STATE, &[cleared | (state_bits & lower::MODULE_STATE_MASK)]);

        for (i, lane) in self.lanes.iter().enumerate() {
            let base = page11::lane_offset(i as u8);
            let existing = map.peek_page(0, 0x11, base + page11::STATE).unwrap_or(0);
            let nibble = lane.state as u8;
            map.force_write_page(0, 0x11, base + page11::STATE, &[(existing & 0xF0) | nibble]);
        }

        let any_flag = map.read_one(lower::FLAG_TEMP).unwrap_or(0) != 0
            || map.read_one(lower::FLAG_VCC).unwrap_or(0) != 0
            || (0..MAX_LANES).any(|lane| {
                let base = page11::lane_offset(lane as u8);
                map.peek_page(0, 0x11, base + page11::FLAGS).unwrap_or(0) != 0
            });
        sideband.set_module_driven(Signal::IntL, if any_flag { Level::Low } else { Level::High });
    }

    /// Requested data-path activation while the module is not ready is not
    /// a fatal error — CMIS states the register write still lands, but we
    /// surface it so a harness can assert on the rejected intent.
    pub fn validate_activation_request(&self, lane: usize) -> Result<(), EmuError> {
        if self.module_state() != ModuleState::Ready {
            return Err(EmuError::InvalidState {
                reason: "data-path activation requested while module is not MODULE_READY",
            });
        }
        if lane >= MAX_LANES {
            return Err(EmuError::InvalidState { reason: "lane index out of range" });
        }
        Ok(())
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layouts::cmis;
    use crate::config::ModuleConfig;

    #[test]
    fn reset_pulse_reaches_low_pwr_within_hold_ticks() {
        let config = ModuleConfig::osfp_cmis_default();
        let mut map = cmis::build(&config);
        let mut sideband = Sideband::attached();
        let mut sm = StateMachine::new();

        sideband.set_host_driven(Signal::ResetL, Level::Low);
        for _ in 0..DEFAULT_RESET_HOLD_TICKS {
            sm.tick(&mut map, &mut sideband);
        }
        assert_eq!(sm.module_state(), ModuleState::LowPwr);
    }

    #[test]
    fn lpmode_clear_reaches_ready_after_init_delay() {
        let config = ModuleConfig::osfp_cmis_default();
        let mut map = cmis::build(&config);
        let mut sideband = Sideband::attached();
        let mut sm = StateMachine::new();

        sideband.set_host_driven(Signal::ResetL, Level::Low);
        sm.tick(&mut map, &mut sideband);
        sm.tick(&mut map, &mut sideband);
        assert_eq!(sm.module_state(), ModuleState::LowPwr);

        sideband.set_host_driven(Signal::ResetL, Level::High);
        sideband.set_host_driven(Signal::LPMode, Level::Low);
        for _ in 0..=DEFAULT_INIT_TICKS {
            sm.tick(&mut map, &mut sideband);
        }
        assert_eq!(sm.module_state(), ModuleState::Ready);
        let byte = map.read_one(lower::MODULE_STATE).unwrap();
        assert_eq!((byte & lower::MODULE_STATE_MASK) >> lower::MODULE_STATE_SHIFT, ModuleState::Ready as u8);
    }

    #[test]
    fn fault_is_latched_until_reset() {
        let config = ModuleConfig::osfp_cmis_default();
        let mut map = cmis::build(&config);
        let mut sideband = Sideband::attached();
        let mut sm = StateMachine::new();
        sm.inject_fault();
        sm.tick(&mut map, &mut sideband);
        assert_eq!(sm.module_state(), ModuleState::Fault);

        sideband.set_host_driven(Signal::ResetL, Level::Low);
        for _ in 0..DEFAULT_RESET_HOLD_TICKS {
            sm.tick(&mut map, &mut sideband);
        }
        assert_eq!(sm.module_state(), ModuleState::LowPwr);
    }
}
