// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! SFF-8472 rev 12.4 register layout: two independent memory maps, A0h
//! (serial ID / base) and A2h (digital diagnostic monitoring).

use crate::config::ModuleConfig;
use crate::map::{Access, ChecksumSpan, HalfPage, MemoryMap, WritePolicy};
use crate::monitor::SingleChannelDom;

pub mod a0 {
    pub const IDENTIFIER: u8 = 0;
    pub const CONNECTOR: u8 = 2;
    pub const TRANSCEIVER_CODES: u8 = 3; // 8 bytes, 3..=10
    pub const VENDOR_NAME: u8 = 20; // 16 bytes, space padded
    pub const VENDOR_OUI: u8 = 37; // 3 bytes
    pub const PART_NUMBER: u8 = 40; // 16 bytes
    pub const REVISION: u8 = 56; // 4 bytes
    pub const WAVELENGTH: u8 = 60; // 2 bytes, big-endian nm
    pub const CC_BASE: u8 = 63;
    pub const VENDOR_SERIAL: u8 = 68; // 16 bytes
    pub const DATE_CODE: u8 = 84; // 8 bytes
}

pub mod a2 {
    pub const TEMP_THRESHOLD: u8 = 0; // 8 bytes: hi_alarm,lo_alarm,hi_warn,lo_warn
    pub const VCC_THRESHOLD: u8 = 8;
    pub const BIAS_THRESHOLD: u8 = 16;
    pub const TX_POWER_THRESHOLD: u8 = 24;
    pub const RX_POWER_THRESHOLD: u8 = 32;
    pub const CC_EXT: u8 = 95;
    pub const TEMPERATURE: u8 = 96;
    pub const VCC: u8 = 98;
    pub const TX_BIAS: u8 = 100;
    pub const TX_POWER: u8 = 102;
    pub const RX_POWER: u8 = 104;
    pub const STATUS: u8 = 110;
    pub const FLAG_TEMP: u8 = 112;
    pub const FLAG_VCC: u8 = 113;
    pub const FLAG_BIAS: u8 = 114;
    pub const FLAG_TX_POWER: u8 = 115;
    pub const FLAG_RX_POWER: u8 = 116;

    /// Status byte bits at [`STATUS`] (offset 110), read by the host and
    /// written by the sideband/fault-injection path.
    pub const STATUS_TX_DISABLE: u8 = 0x01;
    pub const STATUS_RX_LOS: u8 = 0x02;
    pub const STATUS_TX_FAULT: u8 = 0x04;
}

pub fn dom_layout() -> SingleChannelDom {
    SingleChannelDom {
        temp: a2::TEMPERATURE,
        vcc: a2::VCC,
        bias: a2::TX_BIAS,
        tx_power: a2::TX_POWER,
        rx_power: a2::RX_POWER,
        temp_threshold: a2::TEMP_THRESHOLD,
        vcc_threshold: a2::VCC_THRESHOLD,
        bias_threshold: a2::BIAS_THRESHOLD,
        tx_power_threshold: a2::TX_POWER_THRESHOLD,
        rx_power_threshold: a2::RX_POWER_THRESHOLD,
        flag_temp: a2::FLAG_TEMP,
        flag_vcc: a2::FLAG_VCC,
        flag_bias: a2::FLAG_BIAS,
        flag_tx_power: a2::FLAG_TX_POWER,
        flag_rx_power: a2::FLAG_RX_POWER,
    }
}

/// Build the A0h (base/serial-ID) memory map from `config`.
pub fn build_a0(config: &ModuleConfig) -> MemoryMap {
    let mut map = MemoryMap::new(WritePolicy::SilentDrop);
    {
        let lower = map.lower_mut();
        lower.set_byte(a0::IDENTIFIER, config.identifier, Access::Ro);
        lower.set_byte(a0::CONNECTOR, 0x07, Access::Ro); // LC connector
        lower.set_range(a0::TRANSCEIVER_CODES, &[0; 8], Access::Ro);
        lower.set_ascii(a0::VENDOR_NAME, 16, &config.vendor_name, Access::Ro);
        lower.set_range(a0::VENDOR_OUI, &config.vendor_oui, Access::Ro);
        lower.set_ascii(a0::PART_NUMBER, 16, &config.part_number, Access::Ro);
        lower.set_ascii(a0::REVISION, 4, &config.revision, Access::Ro);
        lower.set_range(a0::WAVELENGTH, &config.wavelength_nm.to_be_bytes(), Access::Ro);
        lower.set_byte(a0::CC_BASE, 0, Access::Ro); // filled by checksum refresh below
        lower.set_ascii(a0::VENDOR_SERIAL, 16, &config.serial_number, Access::Ro);
        lower.set_ascii(a0::DATE_CODE, 8, &config.date_code, Access::Ro);
    }
    map.set_lower_checksums(vec![ChecksumSpan::new(0, a0::CC_BASE, a0::CC_BASE)]);
    map.recompute_checksums();
    // A0h has no paging in SFF-8472; install a single blank page so the
    // generic bounds/page-installed checks in `MemoryMap` still see a
    // page at (0, 0) if a host probes offsets 128..255.
    map.install_page(0, 0, HalfPage::reserved(), vec![]);
    let _ = map.select_page(0);
    map
}

/// Build the A2h (diagnostic monitoring) memory map from `config`.
pub fn build_a2(config: &ModuleConfig) -> MemoryMap {
    let mut map = MemoryMap::new(WritePolicy::SilentDrop);
    {
        let lower = map.lower_mut();
        // Default thresholds: generous enough that `ModuleConfig`'s
        // defaults never start in alarm.
        lower.set_range(a2::TEMP_THRESHOLD, &[0x55, 0x00, 0xC4, 0x00, 0x50, 0x00, 0xC8, 0x00], Access::Ro);
        lower.set_range(a2::VCC_THRESHOLD, &[0xC3, 0x50, 0x30, 0xD4, 0xC0, 0x9C, 0x32, 0xC8], Access::Ro);
        lower.set_range(a2::BIAS_THRESHOLD, &[0xFF, 0xFF, 0x00, 0x00, 0xFF, 0xFF, 0x00, 0x00], Access::Ro);
        lower.set_range(a2::TX_POWER_THRESHOLD, &[0xFF, 0xFF, 0x00, 0x00, 0xFF, 0xFF, 0x00, 0x00], Access::Ro);
        lower.set_range(a2::RX_POWER_THRESHOLD, &[0xFF, 0xFF, 0x00, 0x00, 0xFF, 0xFF, 0x00, 0x00], Access::Ro);
        lower.set_byte(a2::CC_EXT, 0, Access::Ro);
        for offset in [
            a2::TEMPERATURE,
            a2::TEMPERATURE + 1,
            a2::VCC,
            a2::VCC + 1,
            a2::TX_BIAS,
            a2::TX_BIAS + 1,
            a2::TX_POWER,
            a2::TX_POWER + 1,
            a2::RX_POWER,
            a2::RX_POWER + 1,
        ] {
            lower.set_byte(offset, 0, Access::Ro);
        }
        lower.set_byte(a2::STATUS, 0, Access::Ro);
        for offset in [a2::FLAG_TEMP, a2::FLAG_VCC, a2::FLAG_BIAS, a2::FLAG_TX_POWER, a2::FLAG_RX_POWER] {
            lower.set_byte(offset, 0, Access::Ro);
        }
    }
    map.set_lower_checksums(vec![ChecksumSpan::new(56, a2::CC_EXT, a2::CC_EXT)]);
    map.recompute_checksums();
    map.install_page(0, 0, HalfPage::reserved(), vec![]);
    let _ = map.select_page(0);
    let _ = config; // thresholds above are standards defaults, not per-vendor
    map
}
