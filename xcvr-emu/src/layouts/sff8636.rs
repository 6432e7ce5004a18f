// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! SFF-8636 rev 2.10a register layout: one logical address, a fixed lower
//! page, and paged upper memory selected by the byte-127 page-select
//! register.
//!
//! Page 00h mirrors the SFF-8472 A0h serial-ID fields (shifted into upper
//! memory); page 03h carries the per-quantity alarm/warning thresholds,
//! the way real SFF-8636 modules split thresholds out of the lower page.

use crate::config::ModuleConfig;
use crate::map::{Access, ChecksumSpan, HalfPage, MemoryMap, WritePolicy};
use crate::monitor::MultiChannelDom;

pub const MAX_CHANNELS: usize = 4;

pub mod lower {
    pub const IDENTIFIER: u8 = 0;
    pub const STATUS: u8 = 1; // bit0: data-not-ready
    pub const FLAG_TEMP: u8 = 4;
    pub const FLAG_VCC: u8 = 5;
    pub const FLAG_BIAS: u8 = 6; // 4 bytes, one per channel
    pub const FLAG_TX_POWER: u8 = 10; // 4 bytes
    pub const FLAG_RX_POWER: u8 = 14; // 4 bytes
    pub const TEMPERATURE: u8 = 22;
    pub const VCC: u8 = 24;
    pub const TX_BIAS: u8 = 34; // 4 channels, 2 bytes each
    pub const TX_POWER: u8 = 42;
    pub const RX_POWER: u8 = 50;
    pub const TX_DISABLE: u8 = 86; // bits 0..3, one per channel
    pub const PAGE_SELECT: u8 = 127;
}

pub mod page00 {
    pub const VENDOR_NAME: u8 = 0; // upper-page-local offset (global 128 + 0)
    pub const VENDOR_OUI: u8 = 17;
    pub const PART_NUMBER: u8 = 20;
    pub const REVISION: u8 = 36;
    pub const VENDOR_SERIAL: u8 = 38;
    pub const DATE_CODE: u8 = 54;
    pub const CC_BASE: u8 = 63;
}

pub mod page03 {
    pub const TEMP_THRESHOLD: u8 = 0;
    pub const VCC_THRESHOLD: u8 = 8;
    pub const BIAS_THRESHOLD: u8 = 16;
    pub const TX_POWER_THRESHOLD: u8 = 24;
    pub const RX_POWER_THRESHOLD: u8 = 32;
}

pub fn dom_layout() -> MultiChannelDom {
    MultiChannelDom {
        channels: MAX_CHANNELS,
        temp: lower::TEMPERATURE,
        vcc: lower::VCC,
        bias: lower::TX_BIAS,
        tx_power: lower::TX_POWER,
        rx_power: lower::RX_POWER,
        flag_temp: lower::FLAG_TEMP,
        flag_vcc: lower::FLAG_VCC,
        flag_bias: lower::FLAG_BIAS,
        flag_tx_power: lower::FLAG_TX_POWER,
        flag_rx_power: lower::FLAG_RX_POWER,
        threshold_bank: 0,
        threshold_page: 3,
        temp_threshold: page03::TEMP_THRESHOLD,
        vcc_threshold: page03::VCC_THRESHOLD,
        bias_threshold: page03::BIAS_THRESHOLD,
        tx_power_threshold: page03::TX_POWER_THRESHOLD,
        rx_power_threshold: page03::RX_POWER_THRESHOLD,
    }
}

pub fn build(config: &ModuleConfig) -> MemoryMap {
    let mut map = MemoryMap::new(WritePolicy::SilentDrop).with_page_select(lower::PAGE_SELECT);
    {
        let lo = map.lower_mut();
        lo.set_byte(lower::IDENTIFIER, config.identifier, Access::Ro);
        lo.set_byte(lower::STATUS, 0, Access::Ro);
        for off in [lower::FLAG_TEMP, lower::FLAG_VCC] {
            lo.set_byte(off, 0, Access::Ro);
        }
        for base in [lower::FLAG_BIAS, lower::FLAG_TX_POWER, lower::FLAG_RX_POWER] {
            for ch in 0..MAX_CHANNELS as u8 {
                lo.set_byte(base + ch, 0, Access::Ro);
            }
        }
        for off in [lower::TEMPERATURE, lower::TEMPERATURE + 1, lower::VCC, lower::VCC + 1] {
            lo.set_byte(off, 0, Access::Ro);
        }
        for base in [lower::TX_BIAS, lower::TX_POWER, lower::RX_POWER] {
            for i in 0..(MAX_CHANNELS as u8 * 2) {
                lo.set_byte(base + i, 0, Access::Ro);
            }
        }
        lo.set_byte(lower::TX_DISABLE, 0, Access::Rw);
        lo.set_byte(lower::PAGE_SELECT, 0, Access::Rw);
    }

    let mut page0 = HalfPage::reserved();
    page0.set_ascii(page00::VENDOR_NAME, 16, &config.vendor_name, Access::Ro);
    page0.set_range(page00::VENDOR_OUI, &config.vendor_oui, Access::Ro);
    page0.set_ascii(page00::PART_NUMBER, 16, &config.part_number, Access::Ro);
    page0.set_ascii(page00::REVISION, 2, &config.revision, Access::Ro);
    page0.set_ascii(page00::VENDOR_SERIAL, 16, &config.serial_number, Access::Ro);
    page0.set_ascii(page00::DATE_CODE, 8, &config.date_code, Access::Ro);
    page0.set_byte(page00::CC_BASE, 0, Access::Ro);
    let page0_checksums = vec![ChecksumSpan::new(0, page00::CC_BASE, page00::CC_BASE)];
    map.install_page(0, 0, page0, page0_checksums);

    let mut page3 = HalfPage::reserved();
    // Generous defaults: wider than `Telemetry::new`'s starting point so a
    // freshly attached module never starts in alarm.
    page3.set_range(page03::TEMP_THRESHOLD, &[0x55, 0x00, 0xC4, 0x00, 0x50, 0x00, 0xC8, 0x00], Access::Ro);
    page3.set_range(page03::VCC_THRESHOLD, &[0xC3, 0x50, 0x30, 0xD4, 0xC0, 0x9C, 0x32, 0xC8], Access::Ro);
    page3.set_range(page03::BIAS_THRESHOLD, &[0xFF, 0xFF, 0x00, 0x00, 0xFF, 0xFF, 0x00, 0x00], Access::Ro);
    page3.set_range(page03::TX_POWER_THRESHOLD, &[0xFF, 0xFF, 0x00, 0x00, 0xFF, 0xFF, 0x00, 0x00], Access::Ro);
    page3.set_range(page03::RX_POWER_THRESHOLD, &[0xFF, 0xFF, 0x00, 0x00, 0xFF, 0xFF, 0x00, 0x00], Access::Ro);
    map.install_page(0, 3, page3, vec![]);

    let _ = map.select_page(0);
    map
}
