// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Two-wire bus fabric: a fixed set of cage slots, each either empty or
//! holding an attached module. Hides the per-family difference between
//! SFF-8472's two device addresses and SFF-8636/CMIS's single address
//! behind one `(device_address, offset)` read/write contract, the way a
//! real host driver addresses the physical bus without caring which
//! standard answers on the other end.

use xcvr_proto::{DeviceAddress, EmuError, Level, Signal};

use crate::gpio::Sideband;
use crate::module::Module;

/// One cage slot: either empty (with the sideband an empty cage still
/// presents — `ModPrsL` deasserted, nothing else meaningful) or holding
/// an attached module.
enum Slot {
    Empty(Sideband),
    Occupied(Module),
}

/// A fixed-size rack of cage slots. Real hardware wires a bounded number
/// of cages to one two-wire segment (or one per front-IO controller, as
/// `drv-sidecar-front-io` models it); `Bus` mirrors that rather than
/// growing unboundedly.
pub struct Bus {
    slots: Vec<Slot>,
}

impl Bus {
    pub fn new(slot_count: usize) -> Self {
        Bus { slots: (0..slot_count).map(|_| Slot::Empty(Sideband::unplugged())).collect() }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    fn slot_mut(&mut self, slot: usize) -> Result<&mut Slot, EmuError> {
        self.slots.get_mut(slot).ok_or(EmuError::NoModule)
    }

    fn slot(&self, slot: usize) -> Result<&Slot, EmuError> {
        self.slots.get(slot).ok_or(EmuError::NoModule)
    }

    /// Plug a module into `slot`. Returns the module that was previously
    /// there, if any (a hot-swap replacement, not a stacked insert).
    pub fn attach(&mut self, slot: usize, module: Module) -> Result<Option<Module>, EmuError> {
        let cell = self.slot_mut(slot)?;
        let previous = match std::mem::replace(cell, Slot::Occupied(module)) {
            Slot::Occupied(module) => Some(module),
            Slot::Empty(_) => None,
        };
        log::info!("slot {slot}: module attached");
        Ok(previous)
    }

    /// Unplug whatever is in `slot`, if anything. The slot still answers
    /// sideband reads afterward — `ModPrsL` reads deasserted (`High`) the
    /// way a host driver observes an empty cage, rather than erroring.
    pub fn detach(&mut self, slot: usize) -> Result<Option<Module>, EmuError> {
        let cell = self.slot_mut(slot)?;
        let removed = match std::mem::replace(cell, Slot::Empty(Sideband::unplugged())) {
            Slot::Occupied(module) => Some(module),
            Slot::Empty(_) => None,
        };
        if removed.is_some() {
            log::info!("slot {slot}: module detached");
        }
        Ok(removed)
    }

    pub fn module(&self, slot: usize) -> Result<&Module, EmuError> {
        match self.slot(slot)? {
            Slot::Occupied(module) => Ok(module),
            Slot::Empty(_) => Err(EmuError::NoModule),
        }
    }

    pub fn module_mut(&mut self, slot: usize) -> Result<&mut Module, EmuError> {
        match self.slot_mut(slot)? {
            Slot::Occupied(module) => Ok(module),
            Slot::Empty(_) => Err(EmuError::NoModule),
        }
    }

    pub fn read_register(&self, slot: usize, device_address: u8, offset: u8) -> Result<u8, EmuError> {
        Ok(self.read_block(slot, device_address, offset, 1)?[0])
    }

    pub fn write_register(&mut self, slot: usize, device_address: u8, offset: u8, value: u8) -> Result<(), EmuError> {
        self.write_block(slot, device_address, offset, &[value])
    }

    pub fn read_block(&self, slot: usize, device_address: u8, offset: u8, len: usize) -> Result<Vec<u8>, EmuError> {
        let module = self.module(slot)?;
        let address = DeviceAddress::from_byte(device_address).ok_or(EmuError::InvalidAddress { device_address })?;
        module.map(address)?.read(offset, len)
    }

    pub fn write_block(&mut self, slot: usize, device_address: u8, offset: u8, bytes: &[u8]) -> Result<(), EmuError> {
        let module = self.module_mut(slot)?;
        let address = DeviceAddress::from_byte(device_address).ok_or(EmuError::InvalidAddress { device_address })?;
        module.write_block(address, offset, bytes)
    }

    /// Read a sideband line for `slot`, whether occupied or empty — an
    /// empty cage still presents `ModPrsL` deasserted, the way real
    /// hardware does.
    pub fn get_gpio(&self, slot: usize, signal: Signal) -> Result<Level, EmuError> {
        match self.slot(slot)? {
            Slot::Occupied(module) => Ok(module.get_gpio(signal)),
            Slot::Empty(sideband) => Ok(sideband.get(signal)),
        }
    }

    /// Drive a host-driven sideband line for `slot`. Returns the previous
    /// level. Valid even with no module attached, since `ResetL`/`LPMode`/
    /// `TxDisable` are host-driven regardless of what's plugged in.
    pub fn set_gpio(&mut self, slot: usize, signal: Signal, level: Level) -> Result<Level, EmuError> {
        match self.slot_mut(slot)? {
            Slot::Occupied(module) => Ok(module.set_gpio(signal, level)),
            Slot::Empty(sideband) => Ok(sideband.set_host_driven(signal, level)),
        }
    }

    /// Advance every attached module's internal state by one cooperative
    /// tick. A bus with no modules attached is a no-op, not an error.
    pub fn tick(&mut self) {
        for (slot, cell) in self.slots.iter_mut().enumerate() {
            if let Slot::Occupied(module) = cell {
                module.tick();
                log::trace!("slot {slot}: tick complete");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModuleConfig;

    #[test]
    fn reading_empty_slot_is_no_module() {
        let bus = Bus::new(4);
        assert_eq!(bus.read_register(0, DeviceAddress::A0H, 0), Err(EmuError::NoModule));
    }

    #[test]
    fn out_of_range_slot_is_no_module() {
        let bus = Bus::new(2);
        assert_eq!(bus.read_register(5, DeviceAddress::A0H, 0), Err(EmuError::NoModule));
    }

    #[test]
    fn attach_then_read_identifier() {
        let mut bus = Bus::new(4);
        bus.attach(0, Module::new(ModuleConfig::sfp_default())).unwrap();
        let id = bus.read_register(0, DeviceAddress::A0H, 0).unwrap();
        assert_eq!(id, 0x03);
    }

    #[test]
    fn wrong_device_address_on_paged_family_is_invalid_address() {
        let mut bus = Bus::new(1);
        bus.attach(0, Module::new(ModuleConfig::qsfp_default())).unwrap();
        assert_eq!(
            bus.read_register(0, DeviceAddress::A2H, 0),
            Err(EmuError::InvalidAddress { device_address: DeviceAddress::A2H })
        );
    }

    #[test]
    fn detach_then_reattach_resets_visible_state() {
        let mut bus = Bus::new(1);
        bus.attach(0, Module::new(ModuleConfig::sfp_default())).unwrap();
        bus.write_register(0, DeviceAddress::A0H, 0, 0xFF).ok();
        bus.detach(0).unwrap();
        assert_eq!(bus.read_register(0, DeviceAddress::A0H, 0), Err(EmuError::NoModule));
        bus.attach(0, Module::new(ModuleConfig::sfp_default())).unwrap();
        assert_eq!(bus.read_register(0, DeviceAddress::A0H, 0).unwrap(), 0x03);
    }

    #[test]
    fn detach_asserts_mod_prs_l_instead_of_erroring_on_gpio_read() {
        let mut bus = Bus::new(1);
        bus.attach(0, Module::new(ModuleConfig::qsfp_default())).unwrap();
        assert_eq!(bus.get_gpio(0, Signal::ModPrsL).unwrap(), Level::Low);

        bus.detach(0).unwrap();
        assert_eq!(bus.get_gpio(0, Signal::ModPrsL).unwrap(), Level::High);
        // The data path is still gone — only the sideband survives a detach.
        assert_eq!(bus.read_register(0, DeviceAddress::A0H, 0), Err(EmuError::NoModule));
    }

    #[test]
    fn gpio_roundtrips_through_the_bus() {
        use xcvr_proto::Signal;

        let mut bus = Bus::new(1);
        bus.attach(0, Module::new(ModuleConfig::qsfp_default())).unwrap();
        assert_eq!(bus.get_gpio(0, Signal::ModPrsL).unwrap(), Level::Low);

        let prev = bus.set_gpio(0, Signal::LPMode, Level::Low).unwrap();
        assert_eq!(prev, Level::High);
        assert_eq!(bus.get_gpio(0, Signal::LPMode).unwrap(), Level::Low);
    }
}
