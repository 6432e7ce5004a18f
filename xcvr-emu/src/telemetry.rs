// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Live telemetry: the semantic (floating-point, engineering-unit) values a
//! test scenario sets, and the big-endian raw encodings the monitoring
//! engine writes into the memory map.

use zerocopy::byteorder::big_endian::{I16, U16};
use zerocopy::{Immutable, IntoBytes, KnownLayout};

/// Per-module live telemetry, in engineering units. A test scenario calls
/// `Module::set_temperature` etc., which mutate this; [`crate::monitor`]
/// reads it on `tick()` and encodes it into the map.
#[derive(Clone, Debug)]
pub struct Telemetry {
    pub temperature_c: f32,
    pub vcc_volts: f32,
    pub tx_bias_ma: Vec<f32>,
    pub tx_power_mw: Vec<f32>,
    pub rx_power_mw: Vec<f32>,
}

impl Telemetry {
    pub fn new(channels: usize) -> Self {
        Telemetry {
            temperature_c: 25.0,
            vcc_volts: 3.3,
            tx_bias_ma: vec![35.0; channels],
            tx_power_mw: vec![1.0; channels],
            rx_power_mw: vec![1.0; channels],
        }
    }
}

/// Signed Q8.8, 1/256 °C per LSB, per SFF-8472 §9.3 / CMIS §8.2.
pub fn encode_temperature(celsius: f32) -> [u8; 2] {
    let raw = (celsius * 256.0).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16;
    raw.to_be_bytes()
}

pub fn decode_temperature(bytes: [u8; 2]) -> f32 {
    i16::from_be_bytes(bytes) as f32 / 256.0
}

/// Unsigned 16-bit, 100 µV per LSB.
pub fn encode_voltage(volts: f32) -> [u8; 2] {
    let raw = (volts * 10_000.0).round().clamp(0.0, u16::MAX as f32) as u16;
    raw.to_be_bytes()
}

pub fn decode_voltage(bytes: [u8; 2]) -> f32 {
    u16::from_be_bytes(bytes) as f32 / 10_000.0
}

/// Unsigned 16-bit, 2 µA per LSB.
pub fn encode_bias(milliamps: f32) -> [u8; 2] {
    let raw = (milliamps * 500.0).round().clamp(0.0, u16::MAX as f32) as u16;
    raw.to_be_bytes()
}

pub fn decode_bias(bytes: [u8; 2]) -> f32 {
    u16::from_be_bytes(bytes) as f32 / 500.0
}

/// Unsigned 16-bit, 0.1 µW per LSB (linear, per SFF-8472 §9.6).
pub fn encode_power(milliwatts: f32) -> [u8; 2] {
    let microwatts_tenths = (milliwatts * 1_000.0 * 10.0).round().clamp(0.0, u16::MAX as f32);
    (microwatts_tenths as u16).to_be_bytes()
}

pub fn decode_power(bytes: [u8; 2]) -> f32 {
    u16::from_be_bytes(bytes) as f32 / 10_000.0
}

/// Signed 16-bit, 0.01 dBm per LSB — CMIS §8's log-scaled optical-power
/// monitor representation, distinct from SFF-8472/SFF-8636's linear
/// 0.1 µW LSB. 0 dBm is 1 mW; the floor clamp keeps `log10` finite for a
/// reading of exactly zero instead of producing `-inf`.
pub fn encode_power_cmis(milliwatts: f32) -> [u8; 2] {
    let mw = milliwatts.max(1.0e-6);
    let centi_dbm = (10.0 * mw.log10() * 100.0).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16;
    centi_dbm.to_be_bytes()
}

pub fn decode_power_cmis(bytes: [u8; 2]) -> f32 {
    let centi_dbm = i16::from_be_bytes(bytes) as f32;
    10f32.powf(centi_dbm / 1000.0)
}

/// The SFF-8472 A2h single-channel DOM block, offsets 96..106: temperature,
/// Vcc, TX bias, TX power, RX power, five contiguous big-endian fields.
/// Laying this out as a `zerocopy` struct over the wire format — rather
/// than five separate `force_write` calls — mirrors how the register
/// blocks in `drv-i2c-devices` read a multi-byte sensor transaction as one
/// typed struct instead of five discrete byte reads.
#[derive(Copy, Clone, Debug, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct DomRecord {
    pub temperature: I16,
    pub vcc: U16,
    pub bias: U16,
    pub tx_power: U16,
    pub rx_power: U16,
}

impl DomRecord {
    pub fn from_telemetry(telemetry: &Telemetry, channel: usize) -> Self {
        DomRecord {
            temperature: I16::from(decode_temp_raw(telemetry.temperature_c)),
            vcc: U16::from(decode_voltage_raw(telemetry.vcc_volts)),
            bias: U16::from(decode_bias_raw(telemetry.tx_bias_ma[channel])),
            tx_power: U16::from(decode_power_raw(telemetry.tx_power_mw[channel])),
            rx_power: U16::from(decode_power_raw(telemetry.rx_power_mw[channel])),
        }
    }
}

fn decode_temp_raw(celsius: f32) -> i16 {
    i16::from_be_bytes(encode_temperature(celsius))
}

fn decode_voltage_raw(volts: f32) -> u16 {
    u16::from_be_bytes(encode_voltage(volts))
}

fn decode_bias_raw(milliamps: f32) -> u16 {
    u16::from_be_bytes(encode_bias(milliamps))
}

fn decode_power_raw(milliwatts: f32) -> u16 {
    u16::from_be_bytes(encode_power(milliwatts))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temperature_round_trips_at_lsb_resolution() {
        let bytes = encode_temperature(45.0);
        assert_eq!(bytes, [0x2D, 0x00]);
        assert_eq!(decode_temperature(bytes), 45.0);
    }

    #[test]
    fn negative_temperature_is_twos_complement() {
        let bytes = encode_temperature(-10.0);
        assert_eq!(decode_temperature(bytes), -10.0);
    }

    #[test]
    fn voltage_lsb_is_100_microvolts() {
        assert_eq!(encode_voltage(3.3), [0x80, 0xE8]);
    }

    #[test]
    fn cmis_power_is_log_scaled_unlike_sff_linear_power() {
        // 1.0 mW is 0 dBm: the CMIS encoding is exactly zero, while the
        // SFF linear encoding is a large positive count of 0.1 µW units.
        assert_eq!(encode_power_cmis(1.0), [0x00, 0x00]);
        assert_eq!(encode_power(1.0), [0x27, 0x10]);
        assert_ne!(encode_power_cmis(1.0), encode_power(1.0));
    }

    #[test]
    fn cmis_power_round_trips_and_represents_sub_milliwatt_readings() {
        let bytes = encode_power_cmis(0.1); // -10 dBm
        assert_eq!(bytes, [0xFC, 0x18]); // -1000 centi-dBm, two's complement
        assert!((decode_power_cmis(bytes) - 0.1).abs() < 1e-3);
    }
}
