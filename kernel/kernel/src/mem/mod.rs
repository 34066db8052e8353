//! Physical and virtual memory management.
//!
//! The kernel owns translation outright: page tables are plain arrays in
//! physical memory that only this module reads and writes, and the MMU
//! is told where they are. Every PTE store that could shadow a cached
//! translation is paired with a TLB invalidation here, so callers never
//! flush by hand.

mod frames;
mod tables;
mod tempmap;
mod uaccess;

pub(crate) use frames::FREE_LINK_NONE;

use crate::{Kernel, KernelError};
use kernel_addresses::{PhysicalAddress, Region, VirtualAddress, VirtualPage};
use kernel_hal::{Hardware, PageTableEntry, Protection, TlbFlush};
use kernel_info::memory::{PAGE_SIZE, PAGE_TABLE_LEN, VMEM_1_BASE, VMEM_1_LIMIT};

impl<H: Hardware, S> Kernel<H, S> {
    /// The active page table for `region`.
    pub(crate) fn table_addr(&self, region: Region) -> PhysicalAddress {
        match region {
            Region::User => self.region0_table,
            Region::Kernel => self.region1_table,
        }
    }

    /// Read one entry out of an arbitrary table.
    pub(crate) fn read_table_entry(&self, table: PhysicalAddress, vpn: VirtualPage) -> PageTableEntry {
        debug_assert!(vpn.index() < PAGE_TABLE_LEN);
        let offset = table.frame_offset() as usize + vpn.index() * 4;
        PageTableEntry::from_bits(self.hw.frame_read_u32(table.frame(), offset))
    }

    /// Write one entry into an arbitrary table. Does not flush; use
    /// [`Self::set_entry`] for the active tables.
    pub(crate) fn write_table_entry(
        &mut self,
        table: PhysicalAddress,
        vpn: VirtualPage,
        pte: PageTableEntry,
    ) {
        debug_assert!(vpn.index() < PAGE_TABLE_LEN);
        let offset = table.frame_offset() as usize + vpn.index() * 4;
        self.hw.frame_write_u32(table.frame(), offset, pte.into_bits());
    }

    /// Read one entry of the active table for `region`.
    pub(crate) fn read_entry(&self, region: Region, vpn: VirtualPage) -> PageTableEntry {
        self.read_table_entry(self.table_addr(region), vpn)
    }

    /// Install one entry in the active table for `region` and drop any
    /// cached translation for that page.
    pub(crate) fn set_entry(&mut self, region: Region, vpn: VirtualPage, pte: PageTableEntry) {
        self.write_table_entry(self.table_addr(region), vpn, pte);
        self.hw.tlb_flush(TlbFlush::Addr(vpn.base_in(region)));
    }

    /// Invalidate one entry of the active table for `region`.
    pub(crate) fn clear_entry(&mut self, region: Region, vpn: VirtualPage) {
        self.set_entry(region, vpn, PageTableEntry::invalid());
    }

    /// Move the kernel break to `addr`, mapping or unmapping region-1
    /// heap pages as needed. Before virtual addressing is on, only the
    /// bookkeeping moves.
    ///
    /// # Errors
    /// [`KernelError::InvalidArgument`] if `addr` is outside region 1;
    /// [`KernelError::OutOfMemory`] if growth runs out of frames.
    pub fn set_kernel_break(&mut self, addr: VirtualAddress) -> Result<(), KernelError> {
        if addr.as_u64() < VMEM_1_BASE || addr.as_u64() > VMEM_1_LIMIT {
            return Err(KernelError::InvalidArgument);
        }
        let target = addr.page_up();
        if !self.vm_enabled {
            self.kernel_break = target;
            return Ok(());
        }
        while self.kernel_break < target {
            let vpn = self.kernel_break.page_in(Region::Kernel);
            self.dequeue_free(Region::Kernel, vpn, Protection::RW, Protection::empty())?;
            self.kernel_break = self.kernel_break + PAGE_SIZE;
        }
        while self.kernel_break > target {
            self.kernel_break = self.kernel_break - PAGE_SIZE;
            let vpn = self.kernel_break.page_in(Region::Kernel);
            self.enqueue_free(Region::Kernel, vpn);
        }
        Ok(())
    }
}
