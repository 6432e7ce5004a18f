// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Immutable per-module configuration: the vendor identity and capability
//! fields a standards layout is built from at attach time.

use serde::{Deserialize, Serialize};

use xcvr_proto::{FormFactor, ModuleFamily};

/// Static identity and capability of one module instance. Deserializable
/// with `serde` so a harness can load it from a fixture file instead of
/// constructing it by hand.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModuleConfig {
    pub form_factor: FormFactor,
    pub family: ModuleFamily,
    pub identifier: u8,
    /// ASCII, will be space-padded to 16 bytes.
    pub vendor_name: String,
    pub vendor_oui: [u8; 3],
    /// ASCII, will be space-padded to 16 bytes.
    pub part_number: String,
    /// ASCII, will be space-padded to 4 bytes.
    pub revision: String,
    /// ASCII, will be space-padded to 16 bytes.
    pub serial_number: String,
    /// ASCII, will be space-padded to 8 bytes (YYMMDD + lot code).
    pub date_code: String,
    /// Nominal signaling rate, ×100 Mbps.
    pub nominal_bit_rate_100mbps: u8,
    pub max_case_temp_c: i8,
    pub channel_count: u8,
    /// Maximum power draw, 0.25 W units.
    pub max_power_quarter_watts: u8,
    pub wavelength_nm: u16,
}

impl ModuleConfig {
    /// A plausible default SFP+ for tests that don't care about vendor
    /// identity, matching scenario 1/2 of the testable-properties list.
    pub fn sfp_default() -> Self {
        ModuleConfig {
            form_factor: FormFactor::Sfp,
            family: ModuleFamily::Sff8472,
            identifier: 0x03,
            vendor_name: "Test Vendor".into(),
            vendor_oui: [0x00, 0x1B, 0x21],
            part_number: "SFP-TEST-10G".into(),
            revision: "A".into(),
            serial_number: "SN0001".into(),
            date_code: "240101".into(),
            nominal_bit_rate_100mbps: 103,
            max_case_temp_c: 70,
            channel_count: 1,
            max_power_quarter_watts: 4,
            wavelength_nm: 1310,
        }
    }

    pub fn qsfp_default() -> Self {
        ModuleConfig {
            form_factor: FormFactor::Qsfp,
            family: ModuleFamily::Sff8636,
            identifier: 0x0D,
            vendor_name: "Test Vendor".into(),
            vendor_oui: [0x00, 0x1B, 0x21],
            part_number: "QSFP-TEST-100G".into(),
            revision: "A".into(),
            serial_number: "SN0002".into(),
            date_code: "240101".into(),
            nominal_bit_rate_100mbps: 255,
            max_case_temp_c: 70,
            channel_count: 4,
            max_power_quarter_watts: 14,
            wavelength_nm: 850,
        }
    }

    pub fn osfp_cmis_default() -> Self {
        ModuleConfig {
            form_factor: FormFactor::Osfp,
            family: ModuleFamily::Cmis,
            identifier: 0x19,
            vendor_name: "Test Vendor".into(),
            vendor_oui: [0x00, 0x1B, 0x21],
            part_number: "OSFP-TEST-400G".into(),
            revision: "A".into(),
            serial_number: "SN0003".into(),
            date_code: "240101".into(),
            nominal_bit_rate_100mbps: 255,
            max_case_temp_c: 75,
            channel_count: 8,
            max_power_quarter_watts: 48,
            wavelength_nm: 850,
        }
    }
}
