// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The monitoring engine: on `tick()`, encode live telemetry into a map's
//! DOM fields, then evaluate thresholds and update the alarm/warning flag
//! bytes. Telemetry is written before flags are re-evaluated, so a reader
//! who samples flags-then-value sees a consistent pair; the reverse
//! ordering is also valid to observe, per the spec.
//!
//! One offset table per standard ([`SingleChannelDom`] for SFF-8472's
//! single-channel DOM, [`MultiChannelDom`] for SFF-8636/CMIS's per-lane
//! monitors) rather than one engine per standard: the comparison and
//! encoding logic is identical, only the field addresses differ.

use zerocopy::IntoBytes;

use crate::map::MemoryMap;
use crate::telemetry::{
    encode_bias, encode_power, encode_power_cmis, encode_temperature, encode_voltage, DomRecord, Telemetry,
};

/// Bit positions within one alarm/warning flag byte. High bits are used so
/// a single byte can hold a full alarm+warning quad, matching SFF-8472's
/// flag byte convention.
mod flag_bits {
    pub const HIGH_ALARM: u8 = 0x80;
    pub const LOW_ALARM: u8 = 0x40;
    pub const HIGH_WARN: u8 = 0x20;
    pub const LOW_WARN: u8 = 0x10;
}

fn flag_byte_signed(raw: i16, thresholds: [u8; 8]) -> u8 {
    let hi_alarm = i16::from_be_bytes([thresholds[0], thresholds[1]]);
    let lo_alarm = i16::from_be_bytes([thresholds[2], thresholds[3]]);
    let hi_warn = i16::from_be_bytes([thresholds[4], thresholds[5]]);
    let lo_warn = i16::from_be_bytes([thresholds[6], thresholds[7]]);
    let mut flags = 0u8;
    if raw > hi_alarm {
        flags |= flag_bits::HIGH_ALARM;
    }
    if raw < lo_alarm {
        flags |= flag_bits::LOW_ALARM;
    }
    if raw > hi_warn {
        flags |= flag_bits::HIGH_WARN;
    }
    if raw < lo_warn {
        flags |= flag_bits::LOW_WARN;
    }
    flags
}

fn flag_byte_unsigned(raw: u16, thresholds: [u8; 8]) -> u8 {
    let hi_alarm = u16::from_be_bytes([thresholds[0], thresholds[1]]);
    let lo_alarm = u16::from_be_bytes([thresholds[2], thresholds[3]]);
    let hi_warn = u16::from_be_bytes([thresholds[4], thresholds[5]]);
    let lo_warn = u16::from_be_bytes([thresholds[6], thresholds[7]]);
    let mut flags = 0u8;
    if raw > hi_alarm {
        flags |= flag_bits::HIGH_ALARM;
    }
    if raw < lo_alarm {
        flags |= flag_bits::LOW_ALARM;
    }
    if raw > hi_warn {
        flags |= flag_bits::HIGH_WARN;
    }
    if raw < lo_warn {
        flags |= flag_bits::LOW_WARN;
    }
    flags
}

fn read_thresholds(bank: u8, page: u8, offset: u8, map: &MemoryMap) -> [u8; 8] {
    let mut out = [0u8; 8];
    for i in 0..8 {
        out[i] = map.peek_page(bank, page, offset + i as u8).unwrap_or(0);
    }
    out
}

/// Read a threshold octet straight out of the lower half, for standards
/// (SFF-8472 A2h) that have no real paging and keep thresholds alongside
/// the live readings rather than in a separate installed page.
fn read_thresholds_lower(offset: u8, map: &MemoryMap) -> [u8; 8] {
    let bytes = map.read(offset, 8).unwrap_or_else(|_| vec![0; 8]);
    let mut out = [0u8; 8];
    out.copy_from_slice(&bytes);
    out
}

/// Offset table for a single-channel DOM map (SFF-8472 A2h). All offsets
/// are within the lower page; thresholds live alongside the live readings
/// in the same map (no paging for SFF-8472).
pub struct SingleChannelDom {
    pub temp: u8,
    pub vcc: u8,
    pub bias: u8,
    pub tx_power: u8,
    pub rx_power: u8,
    pub temp_threshold: u8,
    pub vcc_threshold: u8,
    pub bias_threshold: u8,
    pub tx_power_threshold: u8,
    pub rx_power_threshold: u8,
    pub flag_temp: u8,
    pub flag_vcc: u8,
    pub flag_bias: u8,
    pub flag_tx_power: u8,
    pub flag_rx_power: u8,
}

pub fn tick_single_channel(map: &mut MemoryMap, telemetry: &Telemetry, l: &SingleChannelDom) {
    // The five DOM fields are contiguous 2-byte big-endian registers in
    // every SFF-8472 A2h map this table is built against; write them as
    // one typed block rather than five discrete byte ranges.
    debug_assert_eq!(l.vcc, l.temp + 2);
    debug_assert_eq!(l.bias, l.vcc + 2);
    debug_assert_eq!(l.tx_power, l.bias + 2);
    debug_assert_eq!(l.rx_power, l.tx_power + 2);

    let record = DomRecord::from_telemetry(telemetry, 0);
    map.force_write(l.temp, record.as_bytes());

    let temp_raw = encode_temperature(telemetry.temperature_c);
    let vcc_raw = encode_voltage(telemetry.vcc_volts);
    let bias_raw = encode_bias(telemetry.tx_bias_ma[0]);
    let tx_power_raw = encode_power(telemetry.tx_power_mw[0]);
    let rx_power_raw = encode_power(telemetry.rx_power_mw[0]);

    let temp_thresholds = read_thresholds_lower(l.temp_threshold, map);
    let vcc_thresholds = read_thresholds_lower(l.vcc_threshold, map);
    let bias_thresholds = read_thresholds_lower(l.bias_threshold, map);
    let tx_power_thresholds = read_thresholds_lower(l.tx_power_threshold, map);
    let rx_power_thresholds = read_thresholds_lower(l.rx_power_threshold, map);

    map.force_write(
        l.flag_temp,
        &[flag_byte_signed(i16::from_be_bytes(temp_raw), temp_thresholds)],
    );
    map.force_write(
        l.flag_vcc,
        &[flag_byte_unsigned(u16::from_be_bytes(vcc_raw), vcc_thresholds)],
    );
    map.force_write(
        l.flag_bias,
        &[flag_byte_unsigned(u16::from_be_bytes(bias_raw), bias_thresholds)],
    );
    map.force_write(
        l.flag_tx_power,
        &[flag_byte_unsigned(u16::from_be_bytes(tx_power_raw), tx_power_thresholds)],
    );
    map.force_write(
        l.flag_rx_power,
        &[flag_byte_unsigned(u16::from_be_bytes(rx_power_raw), rx_power_thresholds)],
    );
}

/// Offset table for a multi-channel DOM map (SFF-8636/CMIS). Temp/Vcc are
/// module-wide; bias/tx power/rx power and their flags are per lane
/// (`base + lane * stride`). Thresholds are shared across lanes and live
/// in a separate installed page, the way SFF-8636 page 03h and CMIS's
/// threshold page do.
pub struct MultiChannelDom {
    pub channels: usize,
    pub temp: u8,
    pub vcc: u8,
    pub bias: u8,
    pub tx_power: u8,
    pub rx_power: u8,
    pub flag_temp: u8,
    pub flag_vcc: u8,
    pub flag_bias: u8,
    pub flag_tx_power: u8,
    pub flag_rx_power: u8,
    pub threshold_bank: u8,
    pub threshold_page: u8,
    pub temp_threshold: u8,
    pub vcc_threshold: u8,
    pub bias_threshold: u8,
    pub tx_power_threshold: u8,
    pub rx_power_threshold: u8,
}

pub fn tick_multi_channel(map: &mut MemoryMap, telemetry: &Telemetry, l: &MultiChannelDom) {
    let temp_raw = encode_temperature(telemetry.temperature_c);
    let vcc_raw = encode_voltage(telemetry.vcc_volts);
    map.force_write(l.temp, &temp_raw);
    map.force_write(l.vcc, &vcc_raw);

    let temp_thresholds = read_thresholds(l.threshold_bank, l.threshold_page, l.temp_threshold, map);
    let vcc_thresholds = read_thresholds(l.threshold_bank, l.threshold_page, l.vcc_threshold, map);
    map.force_write(l.flag_temp, &[flag_byte_signed(i16::from_be_bytes(temp_raw), temp_thresholds)]);
    map.force_write(l.flag_vcc, &[flag_byte_unsigned(u16::from_be_bytes(vcc_raw), vcc_thresholds)]);

    let bias_thresholds = read_thresholds(l.threshold_bank, l.threshold_page, l.bias_threshold, map);
    let tx_power_thresholds = read_thresholds(l.threshold_bank, l.threshold_page, l.tx_power_threshold, map);
    let rx_power_thresholds = read_thresholds(l.threshold_bank, l.threshold_page, l.rx_power_threshold, map);

    for ch in 0..l.channels {
        let bias_raw = encode_bias(telemetry.tx_bias_ma[ch]);
        let tx_power_raw = encode_power(telemetry.tx_power_mw[ch]);
        let rx_power_raw = encode_power(telemetry.rx_power_mw[ch]);

        map.force_write(l.bias + ch as u8 * 2, &bias_raw);
        map.force_write(l.tx_power + ch as u8 * 2, &tx_power_raw);
        map.force_write(l.rx_power + ch as u8 * 2, &rx_power_raw);

        map.force_write(
            l.flag_bias + ch as u8,
            &[flag_byte_unsigned(u16::from_be_bytes(bias_raw), bias_thresholds)],
        );
        map.force_write(
            l.flag_tx_power + ch as u8,
            &[flag_byte_unsigned(u16::from_be_bytes(tx_power_raw), tx_power_thresholds)],
        );
        map.force_write(
            l.flag_rx_power + ch as u8,
            &[flag_byte_unsigned(u16::from_be_bytes(rx_power_raw), rx_power_thresholds)],
        );
    }
}

/// CMIS telemetry tick. Module-level temp/Vcc live in the lower page like
/// every other family; per-lane bias/TX power/RX power and their flags
/// live in page 11h alongside the data-path state nibble the state
/// machine owns (see [`crate::layouts::cmis::page11`]) — the monitoring
/// engine only ever touches the flag/telemetry bytes of each lane record,
/// never the state nibble.
pub fn tick_cmis(map: &mut MemoryMap, telemetry: &Telemetry) {
    use crate::layouts::cmis::{lower, page02, page11};

    let temp_raw = encode_temperature(telemetry.temperature_c);
    let vcc_raw = encode_voltage(telemetry.vcc_volts);
    map.force_write(lower::TEMPERATURE, &temp_raw);
    map.force_write(lower::VCC, &vcc_raw);

    let temp_thresholds = read_thresholds(0, 2, page02::TEMP_THRESHOLD, map);
    let vcc_thresholds = read_thresholds(0, 2, page02::VCC_THRESHOLD, map);
    map.force_write(lower::FLAG_TEMP, &[flag_byte_signed(i16::from_be_bytes(temp_raw), temp_thresholds)]);
    map.force_write(lower::FLAG_VCC, &[flag_byte_unsigned(u16::from_be_bytes(vcc_raw), vcc_thresholds)]);

    let bias_thresholds = read_thresholds(0, 2, page02::BIAS_THRESHOLD, map);
    let tx_power_thresholds = read_thresholds(0, 2, page02::TX_POWER_THRESHOLD, map);
    let rx_power_thresholds = read_thresholds(0, 2, page02::RX_POWER_THRESHOLD, map);

    for lane in 0..telemetry.tx_bias_ma.len().min(crate::layouts::cmis::MAX_LANES) {
        let base = page11::lane_offset(lane as u8);
        let bias_raw = encode_bias(telemetry.tx_bias_ma[lane]);
        // CMIS optical-power monitors are log-scaled (centi-dBm), unlike
        // SFF-8472/SFF-8636's linear 0.1 µW LSB — see `encode_power_cmis`.
        let tx_power_raw = encode_power_cmis(telemetry.tx_power_mw[lane]);
        let rx_power_raw = encode_power_cmis(telemetry.rx_power_mw[lane]);

        map.force_write_page(0, 0x11, base + page11::BIAS, &bias_raw);
        map.force_write_page(0, 0x11, base + page11::TX_POWER, &tx_power_raw);
        map.force_write_page(0, 0x11, base + page11::RX_POWER, &rx_power_raw);

        let flags = flag_byte_unsigned(u16::from_be_bytes(bias_raw), bias_thresholds)
            | flag_byte_signed(i16::from_be_bytes(tx_power_raw), tx_power_thresholds)
            | flag_byte_signed(i16::from_be_bytes(rx_power_raw), rx_power_thresholds);
        map.force_write_page(0, 0x11, base + page11::FLAGS, &[flags]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{Access, WritePolicy};

    #[test]
    fn high_temp_alarm_flag_tracks_threshold_crossing() {
        let mut map = MemoryMap::new(WritePolicy::SilentDrop);
        map.lower_mut().set_byte(96, 0, Access::Rw);
        map.lower_mut().set_byte(97, 0, Access::Rw);
        map.lower_mut().set_byte(110, 0, Access::Rw); // flag byte
        // high alarm threshold = 40.0C at offset 0, alongside the live
        // readings in the lower half (SFF-8472 A2h has no real paging).
        let hi = encode_temperature(40.0);
        map.lower_mut().set_range(0, &hi, Access::Rw);

        let layout = SingleChannelDom {
            temp: 96,
            vcc: 98,
            bias: 100,
            tx_power: 102,
            rx_power: 104,
            temp_threshold: 0,
            vcc_threshold: 8,
            bias_threshold: 16,
            tx_power_threshold: 24,
            rx_power_threshold: 32,
            flag_temp: 110,
            flag_vcc: 111,
            flag_bias: 112,
            flag_tx_power: 113,
            flag_rx_power: 114,
        };
        for off in [98, 100, 102, 104, 111, 112, 113, 114] {
            map.lower_mut().set_byte(off, 0, Access::Rw);
        }

        let mut telemetry = Telemetry::new(1);
        telemetry.temperature_c = 45.0;
        tick_single_channel(&mut map, &telemetry, &layout);
        assert_eq!(map.read_one(110).unwrap() & 0x80, 0x80);

        telemetry.temperature_c = 20.0;
        tick_single_channel(&mut map, &telemetry, &layout);
        assert_eq!(map.read_one(110).unwrap() & 0x80, 0);
    }

    #[test]
    fn cmis_tick_encodes_power_log_scaled_not_linear() {
        use crate::config::ModuleConfig;
        use crate::layouts::cmis::{self, page11};
        use crate::telemetry::encode_power_cmis;

        let config = ModuleConfig::osfp_cmis_default();
        let mut map = cmis::build(&config);
        let mut telemetry = Telemetry::new(config.channel_count as usize);
        telemetry.tx_power_mw[0] = 1.0; // 0 dBm

        tick_cmis(&mut map, &telemetry);

        let base = page11::lane_offset(0);
        let mut raw = [0u8; 2];
        raw[0] = map.peek_page(0, 0x11, base + page11::TX_POWER).unwrap();
        raw[1] = map.peek_page(0, 0x11, base + page11::TX_POWER + 1).unwrap();
        assert_eq!(raw, encode_power_cmis(1.0));
        assert_ne!(raw, encode_power(1.0), "CMIS power must not use SFF's linear encoding");
    }
}
