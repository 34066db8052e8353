//! Kernel access to user memory.
//!
//! Every caller-supplied pointer is validated against the page table
//! before the kernel dereferences anything on the caller's behalf: the
//! pages must be mapped and their kernel protections must cover the
//! intended access. Actual byte traffic then walks the table one page
//! chunk at a time.

use crate::{Kernel, KernelError};
use alloc::vec::Vec;
use kernel_addresses::{PhysicalAddress, Region, VirtualAddress, VirtualPage};
use kernel_hal::{Hardware, PageTableEntry, Protection};
use kernel_info::memory::{PAGE_SIZE, PAGE_TABLE_LEN, VMEM_0_LIMIT};

impl<H: Hardware, S> Kernel<H, S> {
    /// Translate a virtual address through `user_table` (for region 0)
    /// or the kernel table (for region 1).
    ///
    /// # Errors
    /// [`KernelError::BadAddress`] if the page is unmapped.
    pub(crate) fn translate_in(
        &self,
        user_table: PhysicalAddress,
        va: VirtualAddress,
    ) -> Result<PhysicalAddress, KernelError> {
        let (region, vpn) = va.split();
        if vpn.index() >= PAGE_TABLE_LEN {
            return Err(KernelError::BadAddress);
        }
        let table = match region {
            Region::User => user_table,
            Region::Kernel => self.region1_table,
        };
        let pte = self.read_table_entry(table, vpn);
        if !pte.valid() {
            return Err(KernelError::BadAddress);
        }
        Ok(pte.frame().base() + va.page_offset())
    }

    /// Copy bytes out of the address space behind `user_table`.
    pub(crate) fn read_user_in(
        &self,
        user_table: PhysicalAddress,
        va: VirtualAddress,
        buf: &mut [u8],
    ) -> Result<(), KernelError> {
        let mut done = 0;
        while done < buf.len() {
            let pa = self.translate_in(user_table, va + done as u64)?;
            let n = ((PAGE_SIZE - pa.frame_offset()) as usize).min(buf.len() - done);
            self.hw.frame_read(pa.frame(), pa.frame_offset() as usize, &mut buf[done..done + n]);
            done += n;
        }
        Ok(())
    }

    /// Copy bytes into the address space behind `user_table`.
    pub(crate) fn write_user_in(
        &mut self,
        user_table: PhysicalAddress,
        va: VirtualAddress,
        buf: &[u8],
    ) -> Result<(), KernelError> {
        let mut done = 0;
        while done < buf.len() {
            let pa = self.translate_in(user_table, va + done as u64)?;
            let n = ((PAGE_SIZE - pa.frame_offset()) as usize).min(buf.len() - done);
            self.hw.frame_write(pa.frame(), pa.frame_offset() as usize, &buf[done..done + n]);
            done += n;
        }
        Ok(())
    }

    pub(crate) fn read_user(&self, va: VirtualAddress, buf: &mut [u8]) -> Result<(), KernelError> {
        self.read_user_in(self.region0_table, va, buf)
    }

    pub(crate) fn write_user(&mut self, va: VirtualAddress, buf: &[u8]) -> Result<(), KernelError> {
        self.write_user_in(self.region0_table, va, buf)
    }

    pub(crate) fn read_user_u64(&self, va: VirtualAddress) -> Result<u64, KernelError> {
        let mut bytes = [0u8; 8];
        self.read_user(va, &mut bytes)?;
        Ok(u64::from_le_bytes(bytes))
    }

    pub(crate) fn write_user_u64(&mut self, va: VirtualAddress, value: u64) -> Result<(), KernelError> {
        self.write_user(va, &value.to_le_bytes())
    }

    /// Check that `len` bytes at `va` lie in mapped region-0 pages whose
    /// kernel protections cover `prot`.
    ///
    /// # Errors
    /// [`KernelError::BadAddress`] on any page that fails the check.
    pub(crate) fn check_buffer(
        &self,
        va: VirtualAddress,
        len: usize,
        prot: Protection,
    ) -> Result<(), KernelError> {
        if len == 0 {
            return Ok(());
        }
        let end = va
            .as_u64()
            .checked_add(len as u64)
            .ok_or(KernelError::BadAddress)?;
        if end > VMEM_0_LIMIT {
            return Err(KernelError::BadAddress);
        }
        let first = va.page_in(Region::User).index();
        let last = VirtualAddress::new(end - 1).page_in(Region::User).index();
        for vpn in first..=last {
            let pte = self.read_table_entry(self.region0_table, VirtualPage::new(vpn));
            if !pte.valid() || !pte.kprot().contains(prot) {
                return Err(KernelError::BadAddress);
            }
        }
        Ok(())
    }

    /// Copy a NUL-terminated string out of the caller's space, checking
    /// each page on the way. The terminator is not included.
    ///
    /// # Errors
    /// [`KernelError::BadAddress`] if the string runs off mapped
    /// readable memory before terminating.
    pub(crate) fn user_cstring(&self, va: VirtualAddress) -> Result<Vec<u8>, KernelError> {
        let mut out = Vec::new();
        let mut cur = va;
        loop {
            if cur.as_u64() >= VMEM_0_LIMIT {
                return Err(KernelError::BadAddress);
            }
            let pte = self.read_table_entry(self.region0_table, cur.page_in(Region::User));
            if !pte.valid() || !pte.kprot().contains(Protection::READ) {
                return Err(KernelError::BadAddress);
            }
            let start = cur.page_offset() as usize;
            let mut page = [0u8; PAGE_SIZE as usize];
            self.hw.frame_read(pte.frame(), start, &mut page[start..]);
            if let Some(nul) = page[start..].iter().position(|&b| b == 0) {
                out.extend_from_slice(&page[start..start + nul]);
                return Ok(out);
            }
            out.extend_from_slice(&page[start..]);
            cur = cur.page_down() + PAGE_SIZE;
        }
    }

    /// Read a NULL-terminated vector of user pointers, checking each
    /// word. Returns the pointer values, terminator excluded.
    pub(crate) fn user_arg_words(&self, va: VirtualAddress) -> Result<Vec<u64>, KernelError> {
        let mut words = Vec::new();
        let mut cur = va;
        loop {
            self.check_buffer(cur, 8, Protection::READ)?;
            let word = self.read_user_u64(cur)?;
            if word == 0 {
                return Ok(words);
            }
            words.push(word);
            cur = cur + 8;
        }
    }

    /// Give `dest_table` its own copy of the page at `vpn` of the active
    /// region-0 table: a fresh frame, the same bytes, the same
    /// protections. The copy goes through a temporary write mapping of
    /// the new frame.
    ///
    /// # Errors
    /// [`KernelError::OutOfMemory`] when no frame is free.
    pub(crate) fn copy_page(
        &mut self,
        vpn: VirtualPage,
        dest_table: PhysicalAddress,
    ) -> Result<(), KernelError> {
        let src = self.read_table_entry(self.region0_table, vpn);
        debug_assert!(src.valid(), "copying an unmapped page");
        let frame = self.pop_free_frame()?;
        self.with_temporary_map(frame, Protection::RW, |k| {
            let mut page = [0u8; PAGE_SIZE as usize];
            k.hw.frame_read(src.frame(), 0, &mut page);
            k.hw.frame_write(frame, 0, &page);
        })?;
        self.write_table_entry(dest_table, vpn, PageTableEntry::map(frame, src.kprot(), src.uprot()));
        Ok(())
    }
}
