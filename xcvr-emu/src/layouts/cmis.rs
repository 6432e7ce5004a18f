// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CMIS 4.0 register layout: one logical address, a fixed lower page, and
//! banked upper memory selected by the byte-126 (bank) / byte-127 (page)
//! registers.

use crate::config::ModuleConfig;
use crate::map::{Access, ChecksumSpan, HalfPage, MemoryMap, WritePolicy};

pub const MAX_LANES: usize = 8;

pub mod lower {
    pub const IDENTIFIER: u8 = 0;
    /// Module state occupies bits 1..3 of this byte (CMIS §6.3.2).
    pub const MODULE_STATE: u8 = 3;
    pub const FLAG_TEMP: u8 = 9;
    pub const FLAG_VCC: u8 = 10;
    pub const TEMPERATURE: u8 = 14;
    pub const VCC: u8 = 16;
    /// Bit 6: `LowPwrRequestSW`.
    pub const MODULE_CONTROL: u8 = 26;
    pub const BANK_SELECT: u8 = 126;
    pub const PAGE_SELECT: u8 = 127;

    pub const MODULE_STATE_SHIFT: u8 = 1;
    pub const MODULE_STATE_MASK: u8 = 0b0000_1110;
    pub const LOW_PWR_REQUEST_SW: u8 = 0x40;
}

pub mod page00 {
    pub const VENDOR_NAME: u8 = 1;
    pub const VENDOR_OUI: u8 = 18;
    pub const PART_NUMBER: u8 = 21;
    pub const REVISION: u8 = 37;
    pub const VENDOR_SERIAL: u8 = 39;
    pub const DATE_CODE: u8 = 55;
    pub const CC_BASE: u8 = 63;
}

pub mod page02 {
    pub const TEMP_THRESHOLD: u8 = 0;
    pub const VCC_THRESHOLD: u8 = 8;
    pub const BIAS_THRESHOLD: u8 = 16;
    pub const TX_POWER_THRESHOLD: u8 = 24;
    pub const RX_POWER_THRESHOLD: u8 = 32;
}

/// Page 10h: data-path control. One bit per lane.
pub mod page10 {
    pub const DATA_PATH_DEINIT: u8 = 0;
}

/// Page 11h: per-lane data-path state and telemetry, 8 bytes/lane.
///
/// Byte layout per lane: `[0]` = data-path state (low nibble), `[1]` =
/// alarm/warning flags for this lane's bias/tx power/rx power (reusing
/// the monitoring engine's high/low-alarm/warn bit positions, OR'd
/// together since a lane has one flag byte, not three), `[2..4]` = TX
/// bias, `[4..6]` = TX power, `[6..8]` = RX power.
pub mod page11 {
    pub const LANE_STRIDE: u8 = 8;
    pub const STATE: u8 = 0;
    pub const FLAGS: u8 = 1;
    pub const BIAS: u8 = 2;
    pub const TX_POWER: u8 = 4;
    pub const RX_POWER: u8 = 6;

    pub const fn lane_offset(lane: u8) -> u8 {
        lane * LANE_STRIDE
    }
}

pub fn build(config: &ModuleConfig) -> MemoryMap {
    let mut map = MemoryMap::new(WritePolicy::ReportError)
        .with_page_select(lower::PAGE_SELECT)
        .with_bank_select(lower::BANK_SELECT);
    {
        let lo = map.lower_mut();
        lo.set_byte(lower::IDENTIFIER, config.identifier, Access::Ro);
        lo.set_byte(lower::MODULE_STATE, 0, Access::Ro);
        lo.set_byte(lower::FLAG_TEMP, 0, Access::Ro);
        lo.set_byte(lower::FLAG_VCC, 0, Access::Ro);
        lo.set_byte(lower::TEMPERATURE, 0, Access::Ro);
        lo.set_byte(lower::TEMPERATURE + 1, 0, Access::Ro);
        lo.set_byte(lower::VCC, 0, Access::Ro);
        lo.set_byte(lower::VCC + 1, 0, Access::Ro);
        lo.set_byte(lower::MODULE_CONTROL, 0, Access::Rw);
        lo.set_byte(lower::BANK_SELECT, 0, Access::Rw);
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
    map.install_page(0, 0, page0, vec![ChecksumSpan::new(0, page00::CC_BASE, page00::CC_BASE)]);

    // Page 01h: advertising. Not modeled in depth; installed blank so a
    // host that pages here doesn't hit `OutOfRange`.
    map.install_page(0, 1, HalfPage::reserved(), vec![]);

    let mut page2 = HalfPage::reserved();
    page2.set_range(page02::TEMP_THRESHOLD, &[0x55, 0x00, 0xC4, 0x00, 0x50, 0x00, 0xC8, 0x00], Access::Ro);
    page2.set_range(page02::VCC_THRESHOLD, &[0xC3, 0x50, 0x30, 0xD4, 0xC0, 0x9C, 0x32, 0xC8], Access::Ro);
    page2.set_range(page02::BIAS_THRESHOLD, &[0xFF, 0xFF, 0x00, 0x00, 0xFF, 0xFF, 0x00, 0x00], Access::Ro);
    // Power thresholds are compared as signed centi-dBm (see
    // `telemetry::encode_power_cmis`), so "never trips" is the signed
    // range's extremes, not 0xFFFF/0x0000 the way the linear SFF encoding's
    // disabled thresholds are.
    page2.set_range(page02::TX_POWER_THRESHOLD, &[0x7F, 0xFF, 0x80, 0x00, 0x7F, 0xFF, 0x80, 0x00], Access::Ro);
    page2.set_range(page02::RX_POWER_THRESHOLD, &[0x7F, 0xFF, 0x80, 0x00, 0x7F, 0xFF, 0x80, 0x00], Access::Ro);
    map.install_page(0, 2, page2, vec![]);

    let mut page10 = HalfPage::reserved();
    page10.set_byte(page10::DATA_PATH_DEINIT, 0, Access::Rw);
    map.install_page(0, 0x10, page10, vec![]);

    let mut page11 = HalfPage::reserved();
    for lane in 0..MAX_LANES as u8 {
        let base = page11::lane_offset(lane);
        page11.set_byte(base + page11::STATE, 0, Access::Ro);
        page11.set_byte(base + page11::FLAGS, 0, Access::Ro);
        for i in 0..2 {
            page11.set_byte(base + page11::BIAS + i, 0, Access::Ro);
            page11.set_byte(base + page11::TX_POWER + i, 0, Access::Ro);
            page11.set_byte(base + page11::RX_POWER + i, 0, Access::Ro);
        }
    }
    map.install_page(0, 0x11, page11, vec![]);

    let _ = map.select_bank(0);
    let _ = map.select_page(0);
    map
}
