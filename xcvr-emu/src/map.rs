// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Paged memory-map primitives.
//!
//! A [`MemoryMap`] is the byte-addressable register space behind one device
//! address: a fixed 128-byte "lower" half at offsets 0..127, plus any number
//! of installed 128-byte "upper" halves at offsets 128..255, exactly one of
//! which is visible at a time (selected by page, and for CMIS, by bank).
//!
//! Keeping every installed page's storage materialized — rather than
//! swapping a single buffer's content in and out on page switch — matches
//! the hardware model (the EEPROM behind the cage genuinely holds every
//! page's bytes simultaneously) and makes `select_page` free of copies.

use std::collections::BTreeMap;

use xcvr_proto::EmuError;

/// Per-byte access permission.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Access {
    /// Host may read and write.
    Rw,
    /// Host may read; writes are handled per [`WritePolicy`].
    Ro,
    /// Reads return 0x00; writes are handled per [`WritePolicy`].
    Reserved,
}

/// What happens when a host write targets a [`Access::Ro`] or
/// [`Access::Reserved`] byte.
///
/// SFF modules silently drop the offending bytes and still apply whatever
/// in the same transfer *was* writable; CMIS modules reject the entire
/// transfer and report it on the error channel. This is a per-map
/// attribute, not a global policy, because a single module can combine an
/// SFF-8472 diagnostic map with host software that expects SFF semantics
/// even though the module itself never runs the CMIS state machine.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum WritePolicy {
    SilentDrop,
    ReportError,
}

/// A span of bytes within one half-page whose modulo-256 sum is mirrored
/// into a checksum byte elsewhere in the same half-page (CC_BASE, CC_EXT).
#[derive(Copy, Clone, Debug)]
pub struct ChecksumSpan {
    pub start: u8,
    pub end: u8, // exclusive
    pub target: u8,
}

impl ChecksumSpan {
    pub const fn new(start: u8, end: u8, target: u8) -> Self {
        ChecksumSpan { start, end, target }
    }
}

/// One 128-byte half of the address space (the lower half, or one
/// installed upper page).
#[derive(Clone)]
pub struct HalfPage {
    data: [u8; 128],
    access: [Access; 128],
}

impl HalfPage {
    /// A half-page that reads as all-zero and drops every write: the
    /// default for pages a standard doesn't define content for.
    pub fn reserved() -> Self {
        HalfPage { data: [0; 128], access: [Access::Reserved; 128] }
    }

    pub fn get(&self, offset: u8) -> u8 {
        match self.access[offset as usize] {
            Access::Reserved => 0,
            _ => self.data[offset as usize],
        }
    }

    pub fn access_at(&self, offset: u8) -> Access {
        self.access[offset as usize]
    }

    /// Force-write a byte regardless of access, bypassing [`WritePolicy`].
    /// Used for template construction and for mirroring the page/bank
    /// select registers, which must always reflect the live selection.
    pub fn force(&mut self, offset: u8, value: u8) {
        self.data[offset as usize] = value;
    }

    pub fn set_byte(&mut self, offset: u8, value: u8, access: Access) -> &mut Self {
        self.data[offset as usize] = value;
        self.access[offset as usize] = access;
        self
    }

    pub fn set_range(&mut self, start: u8, bytes: &[u8], access: Access) -> &mut Self {
        for (i, &b) in bytes.iter().enumerate() {
            self.set_byte(start + i as u8, b, access);
        }
        self
    }

    /// Space-pad (0x20) `text` to `width` ASCII bytes starting at `start`.
    /// Truncates if `text` is longer than `width`.
    pub fn set_ascii(&mut self, start: u8, width: usize, text: &str, access: Access) -> &mut Self {
        let mut field = vec![0x20u8; width];
        let src = text.as_bytes();
        let n = src.len().min(width);
        field[..n].copy_from_slice(&src[..n]);
        self.set_range(start, &field, access)
    }

    pub fn recompute_checksum(&mut self, span: &ChecksumSpan) {
        let sum: u32 = (span.start..span.end)
            .map(|o| self.data[o as usize] as u32)
            .sum();
        self.force(span.target, (sum % 256) as u8);
    }
}

/// A mapping from `(device_address, page, byte_offset)` to a byte, scoped
/// to a single device address (SFF-8472 has one of these per A0h/A2h;
/// SFF-8636 and CMIS have exactly one).
pub struct MemoryMap {
    lower: HalfPage,
    lower_checksums: Vec<ChecksumSpan>,
    pages: BTreeMap<(u8, u8), HalfPage>,
    page_checksums: BTreeMap<(u8, u8), Vec<ChecksumSpan>>,
    current_page: u8,
    current_bank: u8,
    page_select_offset: Option<u8>,
    bank_select_offset: Option<u8>,
    write_policy: WritePolicy,
}

impl MemoryMap {
    pub fn new(write_policy: WritePolicy) -> Self {
        MemoryMap {
            lower: HalfPage::reserved(),
            lower_checksums: Vec::new(),
            pages: BTreeMap::new(),
            page_checksums: BTreeMap::new(),
            current_page: 0,
            current_bank: 0,
            page_select_offset: None,
            bank_select_offset: None,
            write_policy,
        }
    }

    pub fn with_page_select(mut self, offset: u8) -> Self {
        self.page_select_offset = Some(offset);
        self
    }

    pub fn with_bank_select(mut self, offset: u8) -> Self {
        self.bank_select_offset = Some(offset);
        self
    }

    pub fn lower_mut(&mut self) -> &mut HalfPage {
        &mut self.lower
    }

    pub fn set_lower_checksums(&mut self, spans: Vec<ChecksumSpan>) {
        self.lower_checksums = spans;
    }

    /// Register an upper-page template at `(bank, page)`. `bank` is always
    /// 0 for non-CMIS families.
    pub fn install_page(&mut self, bank: u8, page: u8, half: HalfPage, checksums: Vec<ChecksumSpan>) {
        self.pages.insert((bank, page), half);
        self.page_checksums.insert((bank, page), checksums);
    }

    pub fn current_page(&self) -> u8 {
        self.current_page
    }

    pub fn current_bank(&self) -> u8 {
        self.current_bank
    }

    pub fn select_page(&mut self, page: u8) -> Result<(), EmuError> {
        if !self.pages.contains_key(&(self.current_bank, page)) {
            return Err(EmuError::OutOfRange { page, offset: 128 });
        }
        self.current_page = page;
        if let Some(o) = self.page_select_offset {
            self.lower.force(o, page);
        }
        Ok(())
    }

    pub fn select_bank(&mut self, bank: u8) -> Result<(), EmuError> {
        if !self.pages.contains_key(&(bank, self.current_page)) {
            return Err(EmuError::OutOfRange { page: self.current_page, offset: 126 });
        }
        self.current_bank = bank;
        if let Some(o) = self.bank_select_offset {
            self.lower.force(o, bank);
        }
        Ok(())
    }

    fn active_page(&self) -> Result<&HalfPage, EmuError> {
        self.pages
            .get(&(self.current_bank, self.current_page))
            .ok_or(EmuError::OutOfRange { page: self.current_page, offset: 128 })
    }

    fn bounds_check(offset: u8, len: usize) -> Result<usize, EmuError> {
        let end = offset as usize + len;
        if end > 256 {
            return Err(EmuError::OutOfRange { page: 0, offset: end as u16 });
        }
        if (offset as usize) < 128 && end > 128 {
            return Err(EmuError::CrossPage { offset, len });
        }
        Ok(end)
    }

    pub fn read(&self, offset: u8, len: usize) -> Result<Vec<u8>, EmuError> {
        let end = Self::bounds_check(offset, len)?;
        let mut out = Vec::with_capacity(len);
        if offset as usize >= 128 {
            let page = self.active_page()?;
            for o in (offset as usize)..end {
                out.push(page.get((o - 128) as u8));
            }
        } else {
            for o in (offset as usize)..end {
                out.push(self.lower.get(o as u8));
            }
        }
        Ok(out)
    }

    /// Read the raw byte stored at `offset` regardless of access
    /// permission (RO included). Used for status/control registers the
    /// caller knows are readable by construction.
    pub fn read_one(&self, offset: u8) -> Result<u8, EmuError> {
        Ok(self.read(offset, 1)?[0])
    }

    pub fn write(&mut self, offset: u8, bytes: &[u8]) -> Result<(), EmuError> {
        let end = Self::bounds_check(offset, bytes.len())?;
        if offset as usize >= 128 {
            let page_key = (self.current_bank, self.current_page);
            let page = self
                .pages
                .get_mut(&page_key)
                .ok_or(EmuError::OutOfRange { page: self.current_page, offset: 128 })?;
            Self::apply(page, offset, bytes, self.write_policy, |o| o - 128)?;
            if let Some(spans) = self.page_checksums.get(&page_key) {
                for span in spans {
                    page.recompute_checksum(span);
                }
            }
        } else {
            let touched_select = self
                .page_select_offset
                .map(|o| (offset as usize..end).contains(&(o as usize)))
                .unwrap_or(false);
            let touched_bank = self
                .bank_select_offset
                .map(|o| (offset as usize..end).contains(&(o as usize)))
                .unwrap_or(false);

            Self::apply(&mut self.lower, offset, bytes, self.write_policy, |o| o)?;
            for span in &self.lower_checksums {
                self.lower.recompute_checksum(span);
            }

            if touched_select {
                let n = self.lower.get(self.page_select_offset.unwrap());
                // A write to an unknown page is accepted by the register
                // (it's RW) but does not change the live view; CMIS
                // flags this on the error channel via `select_page`'s
                // caller, not here, since the byte write itself succeeded.
                let _ = self.select_page(n);
            }
            if touched_bank {
                let n = self.lower.get(self.bank_select_offset.unwrap());
                let _ = self.select_bank(n);
            }
        }
        Ok(())
    }

    fn apply(
        half: &mut HalfPage,
        base_offset: u8,
        bytes: &[u8],
        policy: WritePolicy,
        to_local: impl Fn(u8) -> u8,
    ) -> Result<(), EmuError> {
        match policy {
            WritePolicy::ReportError => {
                for (i, _) in bytes.iter().enumerate() {
                    let o = base_offset + i as u8;
                    let local = to_local(o);
                    if half.access_at(local) != Access::Rw {
                        return Err(EmuError::AccessDenied { page: 0, offset: o });
                    }
                }
                for (i, &b) in bytes.iter().enumerate() {
                    let local = to_local(base_offset + i as u8);
                    half.force(local, b);
                }
            }
            WritePolicy::SilentDrop => {
                for (i, &b) in bytes.iter().enumerate() {
                    let local = to_local(base_offset + i as u8);
                    if half.access_at(local) == Access::Rw {
                        half.force(local, b);
                    }
                }
            }
        }
        Ok(())
    }

    /// Overwrite bytes in the lower half bypassing the access mask, for use
    /// by the monitoring engine and state machine (internal writers, not
    /// host bus traffic). Panics if the range crosses into the upper half;
    /// callers own the field layout and this is a programmer error, not a
    /// runtime condition.
    pub fn force_write(&mut self, offset: u8, bytes: &[u8]) {
        assert!(offset as usize + bytes.len() <= 128, "internal write must stay within the lower half");
        for (i, &b) in bytes.iter().enumerate() {
            self.lower.force(offset + i as u8, b);
        }
        for span in &self.lower_checksums {
            self.lower.recompute_checksum(span);
        }
    }

    /// Overwrite bytes in an installed upper page bypassing the access
    /// mask. Used by the state machine for per-lane status pages (e.g.
    /// CMIS page 11h) that the host never writes directly.
    pub fn force_write_page(&mut self, bank: u8, page: u8, offset: u8, bytes: &[u8]) {
        if let Some(half) = self.pages.get_mut(&(bank, page)) {
            for (i, &b) in bytes.iter().enumerate() {
                half.force(offset + i as u8, b);
            }
            if let Some(spans) = self.page_checksums.get(&(bank, page)) {
                for span in spans {
                    half.recompute_checksum(span);
                }
            }
        }
    }

    /// Read a byte from an installed page without requiring it to be the
    /// currently-selected page (internal readers only).
    pub fn peek_page(&self, bank: u8, page: u8, offset: u8) -> Option<u8> {
        self.pages.get(&(bank, page)).map(|half| half.get(offset))
    }

    /// Recompute every checksum span in the lower half and every installed
    /// page. Writes already refresh the spans they touch; this is for a
    /// harness that wants to force a recheck after poking bytes through
    /// `lower_mut()`/`install_page` directly (e.g. test fixtures).
    pub fn recompute_checksums(&mut self) {
        for span in &self.lower_checksums {
            self.lower.recompute_checksum(span);
        }
        for (key, spans) in &self.page_checksums {
            if let Some(page) = self.pages.get_mut(key) {
                for span in spans {
                    page.recompute_checksum(span);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic_map() -> MemoryMap {
        let mut map = MemoryMap::new(WritePolicy::SilentDrop).with_page_select(127);
        map.lower_mut().set_byte(0, 0x03, Access::Ro);
        map.lower_mut().set_range(20, b"Test Vendor     ", Access::Ro);
        map.install_page(0, 0, HalfPage::reserved(), vec![]);
        let mut page3 = HalfPage::reserved();
        page3.set_byte(0, 0xAA, Access::Rw);
        map.install_page(0, 3, page3, vec![]);
        map.select_page(0).unwrap();
        map
    }

    #[test]
    fn ro_byte_survives_any_write() {
        let mut map = basic_map();
        map.write(0, &[0xFF]).unwrap();
        assert_eq!(map.read_one(0).unwrap(), 0x03);
    }

    #[test]
    fn lower_page_is_stable_across_page_switch() {
        let mut map = basic_map();
        let before = map.read(0, 127).unwrap();
        map.write(127, &[3]).unwrap();
        assert_eq!(map.current_page(), 3);
        let after = map.read(0, 127).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn page_switch_changes_upper_view() {
        let mut map = basic_map();
        map.write(127, &[3]).unwrap();
        assert_eq!(map.read_one(128).unwrap(), 0xAA);
    }

    #[test]
    fn cross_page_read_is_rejected() {
        let map = basic_map();
        assert_eq!(
            map.read(120, 16),
            Err(EmuError::CrossPage { offset: 120, len: 16 })
        );
    }

    #[test]
    fn reserved_byte_reads_zero_and_drops_writes_silently() {
        let mut map = basic_map();
        map.write(1, &[0xFF]).unwrap();
        assert_eq!(map.read_one(1).unwrap(), 0);
    }

    #[test]
    fn cmis_policy_rejects_whole_write_without_side_effects() {
        let mut map = MemoryMap::new(WritePolicy::ReportError);
        map.lower_mut().set_byte(0, 1, Access::Ro);
        map.lower_mut().set_byte(1, 0, Access::Rw);
        let err = map.write(0, &[9, 9]);
        assert!(err.is_err());
        assert_eq!(map.read_one(0).unwrap(), 1);
        assert_eq!(map.read_one(1).unwrap(), 0);
    }

    #[test]
    fn checksum_refreshes_on_write() {
        let mut map = MemoryMap::new(WritePolicy::SilentDrop);
        map.lower_mut().set_byte(0, 10, Access::Rw);
        map.lower_mut().set_byte(1, 20, Access::Rw);
        map.lower_mut().set_byte(2, 0, Access::Ro); // checksum target
        map.set_lower_checksums(vec![ChecksumSpan::new(0, 2, 2)]);
        map.recompute_checksums();
        map.write(0, &[5]).unwrap();
        assert_eq!(map.read_one(2).unwrap(), 25);
    }
}
