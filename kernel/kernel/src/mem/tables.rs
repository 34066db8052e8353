//! The page-table allocator.
//!
//! A table is half a frame, so two tables pack into one physical frame.
//! Freed halves go on one of two free lists (upper halves and lower
//! halves), linked through the first word of the free slot itself.
//! Allocation prefers recycled halves; only when both lists are empty is
//! a fresh frame split, its lower half handed out and its upper half
//! banked.

use super::frames::FREE_LINK_NONE;
use crate::{Kernel, KernelError};
use kernel_addresses::PhysicalAddress;
use kernel_hal::{Hardware, Protection};
use kernel_info::memory::PAGE_TABLE_SIZE;

fn encode_half_link(next: Option<PhysicalAddress>) -> u32 {
    next.map_or(FREE_LINK_NONE, |a| a.as_u64() as u32)
}

fn decode_half_link(raw: u32) -> Option<PhysicalAddress> {
    (raw != FREE_LINK_NONE).then(|| PhysicalAddress::new(u64::from(raw)))
}

impl<H: Hardware, S> Kernel<H, S> {
    /// Allocate a zeroed page table and return its physical address.
    ///
    /// # Errors
    /// [`KernelError::OutOfMemory`] when no half slot and no frame is
    /// free.
    pub(crate) fn allocate_table(&mut self) -> Result<PhysicalAddress, KernelError> {
        let slot = if let Some(slot) = self.upper_half_head {
            self.upper_half_head = self.read_half_link(slot)?;
            slot
        } else if let Some(slot) = self.lower_half_head {
            self.lower_half_head = self.read_half_link(slot)?;
            slot
        } else {
            let frame = self.pop_free_frame()?;
            self.release_table(frame.base() + PAGE_TABLE_SIZE)?;
            frame.base()
        };
        self.zero_table(slot)?;
        Ok(slot)
    }

    /// Put a no-longer-used table's half slot back on its free list.
    pub(crate) fn release_table(&mut self, slot: PhysicalAddress) -> Result<(), KernelError> {
        if slot.is_frame_aligned() {
            let link = encode_half_link(self.lower_half_head);
            self.write_half_link(slot, link)?;
            self.lower_half_head = Some(slot);
        } else {
            debug_assert!(slot.frame_offset() == PAGE_TABLE_SIZE);
            let link = encode_half_link(self.upper_half_head);
            self.write_half_link(slot, link)?;
            self.upper_half_head = Some(slot);
        }
        Ok(())
    }

    fn read_half_link(&mut self, slot: PhysicalAddress) -> Result<Option<PhysicalAddress>, KernelError> {
        let raw = self.with_temporary_map(slot.frame(), Protection::READ, |k| {
            k.hw.frame_read_u32(slot.frame(), slot.frame_offset() as usize)
        })?;
        Ok(decode_half_link(raw))
    }

    fn write_half_link(&mut self, slot: PhysicalAddress, raw: u32) -> Result<(), KernelError> {
        self.with_temporary_map(slot.frame(), Protection::RW, |k| {
            k.hw.frame_write_u32(slot.frame(), slot.frame_offset() as usize, raw);
        })
    }

    fn zero_table(&mut self, slot: PhysicalAddress) -> Result<(), KernelError> {
        self.with_temporary_map(slot.frame(), Protection::RW, |k| {
            k.hw
                .frame_write(slot.frame(), slot.frame_offset() as usize, &[0u8; PAGE_TABLE_SIZE as usize]);
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::Kernel;
    use kernel_sim::{SimImage, SimImages, SimMachine};

    fn booted() -> Kernel<SimMachine, SimImages> {
        let images = SimImages::new()
            .with_image("idle", SimImage::new(&[0x90; 32]))
            .with_image("init", SimImage::new(&[0x42; 64]));
        Kernel::boot(SimMachine::new(128), images, "init", &[]).unwrap()
    }

    #[test]
    fn fresh_frame_is_split_and_its_sibling_banked() {
        let mut k = booted();
        // Drain the halves banked during boot.
        while k.upper_half_head.is_some() || k.lower_half_head.is_some() {
            k.allocate_table().unwrap();
        }
        let free = k.free_frames();
        let a = k.allocate_table().unwrap();
        assert_eq!(k.free_frames(), free - 1);
        let b = k.allocate_table().unwrap();
        assert_eq!(b.frame(), a.frame(), "sibling half should be reused");
        assert_ne!(b.frame_offset(), a.frame_offset());
        assert_eq!(k.free_frames(), free - 1, "second table costs no frame");
    }

    #[test]
    fn released_slot_is_the_next_one_handed_out() {
        let mut k = booted();
        // Drain the halves banked during boot.
        while k.upper_half_head.is_some() || k.lower_half_head.is_some() {
            k.allocate_table().unwrap();
        }
        let a = k.allocate_table().unwrap();
        let b = k.allocate_table().unwrap();
        assert!(a.is_frame_aligned() && !b.is_frame_aligned());

        k.release_table(b).unwrap();
        assert_eq!(k.allocate_table().unwrap(), b);

        // With one slot on each list, the upper half goes out first.
        k.release_table(a).unwrap();
        k.release_table(b).unwrap();
        assert_eq!(k.allocate_table().unwrap(), b);
        assert_eq!(k.allocate_table().unwrap(), a);
    }
}
