// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared types for the optical transceiver emulator: error codes, the
//! form-factor/module-family tags, device addressing, and the sideband
//! signal set. Split out of `xcvr-emu` so a host-driver test harness can
//! depend on the vocabulary without pulling in the engine.

use core::fmt;

use num_derive::FromPrimitive;
use serde::{Deserialize, Serialize};

/// Errors surfaced by the memory map, bus fabric, and state machine.
///
/// Each variant names what the caller got wrong, not internal plumbing,
/// following the convention of `drv_i2c_api::ResponseCode`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EmuError {
    /// The bus was addressed at a slot with no module attached.
    NoModule,
    /// `device_address` is not supported by the attached module's family.
    InvalidAddress { device_address: u8 },
    /// The requested page is not installed, or the offset is beyond 255.
    OutOfRange { page: u8, offset: u16 },
    /// A write targeted a read-only or reserved byte.
    AccessDenied { page: u8, offset: u8 },
    /// A transfer straddled the lower/upper page boundary at offset 128.
    CrossPage { offset: u8, len: usize },
    /// A control-register write would drive the state machine into an
    /// illegal transition given the module's current state.
    InvalidState { reason: &'static str },
}

impl fmt::Display for EmuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmuError::NoModule => write!(f, "no module attached at this slot"),
            EmuError::InvalidAddress { device_address } => {
                write!(f, "device address {device_address:#04x} not valid for this module")
            }
            EmuError::OutOfRange { page, offset } => {
                write!(f, "page {page:#04x} offset {offset:#06x} out of range")
            }
            EmuError::AccessDenied { page, offset } => {
                write!(f, "write to read-only/reserved byte {page:#04x}:{offset:#04x}")
            }
            EmuError::CrossPage { offset, len } => {
                write!(f, "transfer of {len} bytes at offset {offset:#04x} crosses the page boundary")
            }
            EmuError::InvalidState { reason } => {
                write!(f, "invalid state transition: {reason}")
            }
        }
    }
}

impl std::error::Error for EmuError {}

/// Physical form factor of the emulated module.
#[derive(Copy, Clone, Debug, Eq, PartialEq, FromPrimitive, Serialize, Deserialize)]
#[repr(u8)]
pub enum FormFactor {
    Sfp = 0,
    Qsfp = 1,
    Osfp = 2,
}

/// Which standard governs this module's register map and state model.
#[derive(Copy, Clone, Debug, Eq, PartialEq, FromPrimitive, Serialize, Deserialize)]
#[repr(u8)]
pub enum ModuleFamily {
    /// SFF-8472: two-address (A0h/A2h) memory map, no explicit state machine.
    Sff8472 = 0,
    /// SFF-8636: single address, paged upper memory, no explicit state machine.
    Sff8636 = 1,
    /// CMIS 4.0: single address, banked paged memory, full module/data-path
    /// state machine.
    Cmis = 2,
}

impl ModuleFamily {
    /// Whether this family runs the CMIS module/data-path state machine.
    pub fn has_state_machine(self) -> bool {
        matches!(self, ModuleFamily::Cmis)
    }
}

/// Two-wire bus device address. SFF-8472 modules answer on both; SFF-8636
/// and CMIS modules answer only on `Base` (a single logical address, paged).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum DeviceAddress {
    /// 0xA0 — serial ID / base memory map.
    Base,
    /// 0xA2 — diagnostic monitoring memory map (SFF-8472 only).
    Diagnostic,
}

impl DeviceAddress {
    pub const A0H: u8 = 0xA0;
    pub const A2H: u8 = 0xA2;

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            Self::A0H => Some(DeviceAddress::Base),
            Self::A2H => Some(DeviceAddress::Diagnostic),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            DeviceAddress::Base => Self::A0H,
            DeviceAddress::Diagnostic => Self::A2H,
        }
    }
}

/// The seven sideband signal lines, named per SFF-8431 / CMIS §5.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Signal {
    /// Module-driven, active low: 0 = module present in the cage.
    ModPrsL,
    /// Host-driven, active low: asserts hardware reset.
    ResetL,
    /// Host-driven: forces the module into low-power state.
    LPMode,
    /// Module-driven, active low: interrupt pending.
    IntL,
    /// Host-driven: disables the transmitter (per-lane bitmap for
    /// QSFP/CMIS lives in the memory map; this line mirrors lane 0 for SFP).
    TxDisable,
    /// Module-driven: receiver loss of signal.
    RxLOS,
    /// Module-driven: transmitter fault latched.
    TxFault,
}

/// Logic level of a sideband line.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Level {
    High,
    Low,
}

impl Level {
    pub fn is_asserted_low(self) -> bool {
        matches!(self, Level::Low)
    }
}

impl core::ops::Not for Level {
    type Output = Level;
    fn not(self) -> Level {
        match self {
            Level::High => Level::Low,
            Level::Low => Level::High,
        }
    }
}

/// Faults a test scenario can inject directly, bypassing the monitoring
/// engine's normal threshold evaluation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, FromPrimitive)]
#[repr(u8)]
pub enum FaultKind {
    TxFault = 0,
    RxLOS = 1,
    TempHigh = 2,
    TempLow = 3,
    VccHigh = 4,
    VccLow = 5,
}
