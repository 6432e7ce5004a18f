// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The module façade: one emulated transceiver, composing its memory
//! map(s), telemetry, sideband signals, and (for CMIS) state machine
//! behind the handful of operations a test harness drives directly —
//! `tick`, the fault/telemetry injectors, and sideband access — while the
//! byte-level read/write path is reached through [`crate::bus::Bus`].

use xcvr_proto::{DeviceAddress, EmuError, FaultKind, FormFactor, Level, ModuleFamily, Signal};

use crate::config::ModuleConfig;
use crate::gpio::Sideband;
use crate::layouts::{cmis, sff8472, sff8636};
use crate::map::MemoryMap;
use crate::monitor::{tick_cmis, tick_multi_channel, tick_single_channel};
use crate::state::StateMachine;
use crate::telemetry::Telemetry;

/// The memory map(s) behind one module, shaped by which standard governs
/// it. SFF-8472 is the only family with two independently addressed
/// maps; the other two answer a single logical address.
enum Maps {
    Sff8472 { a0: MemoryMap, a2: MemoryMap },
    Single(MemoryMap),
}

pub struct Module {
    config: ModuleConfig,
    maps: Maps,
    telemetry: Telemetry,
    sideband: Sideband,
    state: Option<StateMachine>,
}

impl Module {
    /// Build a freshly attached module from `config`: the memory map is
    /// populated from the matching `layouts::*::build*` factory, sideband
    /// lines start at their MSA idle defaults, and CMIS modules start
    /// their state machine in `MODULE_LOW_PWR` pending a reset pulse.
    pub fn new(config: ModuleConfig) -> Self {
        let maps = match config.family {
            ModuleFamily::Sff8472 => Maps::Sff8472 { a0: sff8472::build_a0(&config), a2: sff8472::build_a2(&config) },
            ModuleFamily::Sff8636 => Maps::Single(sff8636::build(&config)),
            ModuleFamily::Cmis => Maps::Single(cmis::build(&config)),
        };
        let channel_count = config.channel_count as usize;
        let state = config.family.has_state_machine().then(StateMachine::new);
        Module { config, maps, telemetry: Telemetry::new(channel_count), sideband: Sideband::attached(), state }
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    pub fn form_factor(&self) -> FormFactor {
        self.config.form_factor
    }

    pub fn family(&self) -> ModuleFamily {
        self.config.family
    }

    pub fn sideband(&self) -> &Sideband {
        &self.sideband
    }

    pub fn sideband_mut(&mut self) -> &mut Sideband {
        &mut self.sideband
    }

    pub fn get_gpio(&self, signal: Signal) -> Level {
        self.sideband.get(signal)
    }

    pub fn set_gpio(&mut self, signal: Signal, level: Level) -> Level {
        self.sideband.set_host_driven(signal, level)
    }

    pub fn map(&self, address: DeviceAddress) -> Result<&MemoryMap, EmuError> {
        match (&self.maps, address) {
            (Maps::Sff8472 { a0, .. }, DeviceAddress::Base) => Ok(a0),
            (Maps::Sff8472 { a2, .. }, DeviceAddress::Diagnostic) => Ok(a2),
            (Maps::Single(map), DeviceAddress::Base) => Ok(map),
            (Maps::Single(_), DeviceAddress::Diagnostic) => {
                Err(EmuError::InvalidAddress { device_address: DeviceAddress::A2H })
            }
        }
    }

    pub fn map_mut(&mut self, address: DeviceAddress) -> Result<&mut MemoryMap, EmuError> {
        match (&mut self.maps, address) {
            (Maps::Sff8472 { a0, .. }, DeviceAddress::Base) => Ok(a0),
            (Maps::Sff8472 { a2, .. }, DeviceAddress::Diagnostic) => Ok(a2),
            (Maps::Single(map), DeviceAddress::Base) => Ok(map),
            (Maps::Single(_), DeviceAddress::Diagnostic) => {
                Err(EmuError::InvalidAddress { device_address: DeviceAddress::A2H })
            }
        }
    }

    /// The host write path proper: stores `bytes` at `offset` regardless
    /// (per spec §7, a control register is writable even when the
    /// requested transition is illegal), then reports `InvalidState` if
    /// the write just requested data-path activation on a lane while the
    /// module isn't `MODULE_READY`.
    pub fn write_block(&mut self, address: DeviceAddress, offset: u8, bytes: &[u8]) -> Result<(), EmuError> {
        let activation_result = self.check_data_path_activation(address, offset, bytes);
        self.map_mut(address)?.write(offset, bytes)?;
        activation_result
    }

    /// CMIS page 10h's `DataPathDeinit` bitmap requests per-lane
    /// deactivation when a bit is set; clearing a bit requests activation.
    /// Requesting activation while the module isn't ready is the illegal
    /// transition spec §7 names as the canonical `InvalidState` example.
    fn check_data_path_activation(&self, address: DeviceAddress, offset: u8, bytes: &[u8]) -> Result<(), EmuError> {
        let Some(state) = &self.state else { return Ok(()) };
        let map = self.map(address)?;
        if map.current_bank() != 0 || map.current_page() != 0x10 {
            return Ok(());
        }
        let global_base = 128 + cmis::page10::DATA_PATH_DEINIT as usize;
        let touched = (offset as usize..offset as usize + bytes.len()).contains(&global_base);
        if !touched {
            return Ok(());
        }
        let value = bytes[global_base - offset as usize];
        for lane in 0..cmis::MAX_LANES {
            if value & (1 << lane) == 0 {
                state.validate_activation_request(lane)?;
            }
        }
        Ok(())
    }

    pub fn set_temperature(&mut self, celsius: f32) {
        self.telemetry.temperature_c = celsius;
    }

    pub fn set_voltage(&mut self, volts: f32) {
        self.telemetry.vcc_volts = volts;
    }

    pub fn set_tx_bias(&mut self, channel: usize, milliamps: f32) {
        if let Some(slot) = self.telemetry.tx_bias_ma.get_mut(channel) {
            *slot = milliamps;
        }
    }

    pub fn set_tx_power(&mut self, channel: usize, milliwatts: f32) {
        if let Some(slot) = self.telemetry.tx_power_mw.get_mut(channel) {
            *slot = milliwatts;
        }
    }

    pub fn set_rx_power(&mut self, channel: usize, milliwatts: f32) {
        if let Some(slot) = self.telemetry.rx_power_mw.get_mut(channel) {
            *slot = milliwatts;
        }
    }

    /// Inject a fault directly, bypassing threshold evaluation. Sideband
    /// faults (`TxFault`, `RxLOS`) flip the corresponding module-driven
    /// line; telemetry faults push a reading past the default thresholds
    /// so the next `tick()`'s flag evaluation latches it honestly instead
    /// of just setting a flag bit by hand.
    pub fn simulate_fault(&mut self, kind: FaultKind, active: bool) {
        match kind {
            FaultKind::TxFault => {
                self.sideband.set_module_driven(Signal::TxFault, if active { Level::High } else { Level::Low });
            }
            FaultKind::RxLOS => {
                self.sideband.set_module_driven(Signal::RxLOS, if active { Level::High } else { Level::Low });
            }
            FaultKind::TempHigh => self.telemetry.temperature_c = if active { 95.0 } else { 45.0 },
            FaultKind::TempLow => self.telemetry.temperature_c = if active { -20.0 } else { 45.0 },
            FaultKind::VccHigh => self.telemetry.vcc_volts = if active { 3.8 } else { 3.3 },
            FaultKind::VccLow => self.telemetry.vcc_volts = if active { 2.9 } else { 3.3 },
        }
    }

    /// Advance one cooperative time step: re-run the monitoring engine
    /// against live telemetry, then (CMIS only) advance the module/data-
    /// path state machine off the current sideband levels.
    pub fn tick(&mut self) {
        match &mut self.maps {
            Maps::Sff8472 { a2, .. } => tick_single_channel(a2, &self.telemetry, &sff8472::dom_layout()),
            Maps::Single(map) if self.config.family == ModuleFamily::Sff8636 => {
                tick_multi_channel(map, &self.telemetry, &sff8636::dom_layout())
            }
            Maps::Single(map) => tick_cmis(map, &self.telemetry),
        }

        if let (Some(state), Maps::Single(map)) = (&mut self.state, &mut self.maps) {
            state.tick(map, &mut self.sideband);
        }

        if self.config.family == ModuleFamily::Sff8472 {
            let tx_fault = self.sideband.get(Signal::TxFault) == Level::High;
            let rx_los = self.sideband.get(Signal::RxLOS) == Level::High;
            let mut byte = 0u8;
            if tx_fault {
                byte |= sff8472::a2::STATUS_TX_FAULT;
            }
            if rx_los {
                byte |= sff8472::a2::STATUS_RX_LOS;
            }
            if let Maps::Sff8472 { a2, .. } = &mut self.maps {
                a2.force_write(sff8472::a2::STATUS, &[byte]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sfp_identifier_reads_back_through_map() {
        let module = Module::new(ModuleConfig::sfp_default());
        let bytes = module.map(DeviceAddress::Base).unwrap().read(0, 1).unwrap();
        assert_eq!(bytes, vec![0x03]);
    }

    #[test]
    fn tick_propagates_temperature_into_a2_dom() {
        let mut module = Module::new(ModuleConfig::sfp_default());
        module.set_temperature(45.0);
        module.tick();
        let bytes = module.map(DeviceAddress::Diagnostic).unwrap().read(96, 2).unwrap();
        assert_eq!(bytes, vec![0x2D, 0x00]);
    }

    #[test]
    fn tx_fault_injection_sets_status_bit_on_tick() {
        let mut module = Module::new(ModuleConfig::sfp_default());
        module.simulate_fault(FaultKind::TxFault, true);
        module.tick();
        let status = module.map(DeviceAddress::Diagnostic).unwrap().read_one(110).unwrap();
        assert_eq!(status & sff8472::a2::STATUS_TX_FAULT, sff8472::a2::STATUS_TX_FAULT);
    }

    #[test]
    fn cmis_module_reaches_ready_after_reset_and_lpmode_clear() {
        let mut module = Module::new(ModuleConfig::osfp_cmis_default());
        module.set_gpio(Signal::ResetL, Level::Low);
        for _ in 0..4 {
            module.tick();
        }
        module.set_gpio(Signal::ResetL, Level::High);
        module.set_gpio(Signal::LPMode, Level::Low);
        for _ in 0..4 {
            module.tick();
        }
        let byte = module.map(DeviceAddress::Base).unwrap().read_one(cmis::lower::MODULE_STATE).unwrap();
        let state = (byte & cmis::lower::MODULE_STATE_MASK) >> cmis::lower::MODULE_STATE_SHIFT;
        assert_eq!(state, crate::state::ModuleState::Ready as u8);
    }
}
