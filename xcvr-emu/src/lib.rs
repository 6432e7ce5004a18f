// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Emulated pluggable optical transceiver modules: SFP/SFP+ and QSFP/QSFP+
//! against SFF-8472 and SFF-8636, and OSFP/QSFP-DD against CMIS 4.0.
//!
//! A [`bus::Bus`] holds a fixed set of cage slots; each slot optionally
//! holds a [`module::Module`], which owns the standard-shaped
//! [`map::MemoryMap`](s) a host reads and writes over [`bus::Bus`]'s
//! `(device_address, offset)` contract, the [`gpio::Sideband`] lines a
//! host drives and observes out of band, and — for CMIS modules — the
//! [`state::StateMachine`] that tracks module and per-lane data-path
//! state. Calling `Bus::tick` (or `Module::tick` directly) is the only
//! way time advances: there is no wall-clock I/O latency here, only a
//! cooperative step function a harness calls explicitly.

pub mod bus;
pub mod config;
pub mod gpio;
pub mod layouts;
pub mod map;
pub mod module;
pub mod monitor;
pub mod state;
pub mod telemetry;

pub use bus::Bus;
pub use config::ModuleConfig;
pub use module::Module;

pub use xcvr_proto::{DeviceAddress, EmuError, FaultKind, FormFactor, Level, ModuleFamily, Signal};
