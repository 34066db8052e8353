//! The physical frame allocator.
//!
//! Free frames form a singly linked list threaded through the frames
//! themselves: the first word of a free frame holds the pfn of the next
//! free frame. The kernel keeps only the head pfn and a count, so the
//! allocator costs no memory of its own. Touching a link requires the
//! frame to be reachable, which is why enqueue writes the link while the
//! page is still mapped and dequeue reads it through the mapping it just
//! installed; list surgery on unmapped frames goes through a temporary
//! mapping instead.

use crate::{Kernel, KernelError};
use kernel_addresses::{PhysicalAddress, PhysicalFrame, Region, VirtualPage};
use kernel_hal::{Hardware, PageTableEntry, Protection};
use kernel_info::memory::PAGE_TABLE_LEN;

/// Link value marking the end of the list.
pub(crate) const FREE_LINK_NONE: u32 = u32::MAX;

pub(crate) fn encode_frame_link(next: Option<PhysicalFrame>) -> u32 {
    next.map_or(FREE_LINK_NONE, |f| f.index() as u32)
}

pub(crate) fn decode_frame_link(raw: u32) -> Option<PhysicalFrame> {
    (raw != FREE_LINK_NONE).then(|| PhysicalFrame::new(raw as usize))
}

impl<H: Hardware, S> Kernel<H, S> {
    /// Pop the free-list head and map it at `vpn` of `region` in one
    /// step. The successor link is read back through the fresh mapping.
    ///
    /// # Errors
    /// [`KernelError::OutOfMemory`] when the list is empty.
    pub(crate) fn dequeue_free(
        &mut self,
        region: Region,
        vpn: VirtualPage,
        kprot: Protection,
        uprot: Protection,
    ) -> Result<PhysicalFrame, KernelError> {
        let head = self.free_frame_head.ok_or(KernelError::OutOfMemory)?;
        self.set_entry(region, vpn, PageTableEntry::map(head, kprot, uprot));
        let link = self.hw.frame_read_u32(head, 0);
        self.free_frame_head = decode_frame_link(link);
        self.num_free_frames -= 1;
        Ok(head)
    }

    /// Unmap `vpn` of `region` and push its frame onto the free list.
    ///
    /// The link is written while the page is still mapped; a page whose
    /// kernel protection lacks write gets it back first.
    pub(crate) fn enqueue_free(&mut self, region: Region, vpn: VirtualPage) {
        let pte = self.read_entry(region, vpn);
        debug_assert!(pte.valid(), "freeing an unmapped page");
        if !pte.kprot().contains(Protection::WRITE) {
            self.set_entry(region, vpn, pte.with_kprot(pte.kprot() | Protection::WRITE));
        }
        let link = encode_frame_link(self.free_frame_head);
        self.hw.frame_write_u32(pte.frame(), 0, link);
        self.clear_entry(region, vpn);
        self.free_frame_head = Some(pte.frame());
        self.num_free_frames += 1;
    }

    /// Pop the free-list head without mapping it anywhere. The link is
    /// read through a temporary mapping.
    ///
    /// # Errors
    /// [`KernelError::OutOfMemory`] when the list is empty.
    pub(crate) fn pop_free_frame(&mut self) -> Result<PhysicalFrame, KernelError> {
        let head = self.free_frame_head.ok_or(KernelError::OutOfMemory)?;
        let link = self.with_temporary_map(head, Protection::READ, |k| {
            k.hw.frame_read_u32(head, 0)
        })?;
        self.free_frame_head = decode_frame_link(link);
        self.num_free_frames -= 1;
        Ok(head)
    }

    /// Push an unmapped frame onto the free list. The link is written
    /// through a temporary mapping.
    pub(crate) fn push_free_frame(&mut self, frame: PhysicalFrame) -> Result<(), KernelError> {
        let link = encode_frame_link(self.free_frame_head);
        self.with_temporary_map(frame, Protection::RW, |k| {
            k.hw.frame_write_u32(frame, 0, link);
        })?;
        self.free_frame_head = Some(frame);
        self.num_free_frames += 1;
        Ok(())
    }

    /// Frames on the free list, counted by walking the embedded links.
    /// Test-only cross-check of the running count.
    #[cfg(test)]
    pub(crate) fn count_free_list(&mut self) -> Result<usize, KernelError> {
        let mut n = 0;
        let mut cur = self.free_frame_head;
        while let Some(frame) = cur {
            n += 1;
            let link = self.with_temporary_map(frame, Protection::READ, |k| {
                k.hw.frame_read_u32(frame, 0)
            })?;
            cur = decode_frame_link(link);
        }
        Ok(n)
    }

    /// Return every frame a (non-active) table still maps to the free
    /// list and invalidate its entries. Used to unwind a half-built
    /// address space.
    pub(crate) fn reclaim_table_frames(
        &mut self,
        table: PhysicalAddress,
    ) -> Result<(), KernelError> {
        for i in 0..PAGE_TABLE_LEN {
            let vpn = VirtualPage::new(i);
            let pte = self.read_table_entry(table, vpn);
            if pte.valid() {
                self.push_free_frame(pte.frame())?;
                self.write_table_entry(table, vpn, PageTableEntry::invalid());
            }
        }
        Ok(())
    }
}
