// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Factory functions that build pre-populated [`crate::map::MemoryMap`]
//! templates for each standard, plus the offset tables the rest of the
//! crate (monitoring engine, state machine, bus fabric) dispatches
//! against.
//!
//! Per-standard behavior lives here and in [`crate::state`]'s transition
//! table, not in a type hierarchy: a deep inheritance tree (abstract base
//! → per-standard module → per-form-factor module) collapses to a tagged
//! variant over [`xcvr_proto::ModuleFamily`] plus these shared offset
//! descriptors.

pub mod cmis;
pub mod sff8472;
pub mod sff8636;
