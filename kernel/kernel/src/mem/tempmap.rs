//! Scoped temporary mappings.
//!
//! The kernel sometimes needs a frame nothing maps: a free-list link in
//! an unmapped frame, a table slot being zeroed, the destination of a
//! fork page copy. All such access funnels through
//! [`Kernel::with_temporary_map`], which maps the frame at the first
//! kernel page above the break and guarantees the mapping is gone again
//! when the closure returns.

use crate::{Kernel, KernelError};
use kernel_addresses::{PhysicalFrame, Region, VirtualPage};
use kernel_hal::{Hardware, PageTableEntry, Protection};
use kernel_info::memory::VMEM_1_LIMIT;

impl<H: Hardware, S> Kernel<H, S> {
    /// The kernel page used for temporary mappings: the page the break
    /// sits on, which the heap does not reach.
    fn temp_slot(&self) -> Result<VirtualPage, KernelError> {
        if self.kernel_break.as_u64() >= VMEM_1_LIMIT {
            return Err(KernelError::KernelSpaceExhausted);
        }
        Ok(self.kernel_break.page_in(Region::Kernel))
    }

    /// Map `frame` at the temporary slot, run `f`, unmap.
    ///
    /// Never nests; every caller finishes its temporary access before
    /// starting another.
    ///
    /// # Errors
    /// [`KernelError::KernelSpaceExhausted`] if the kernel heap has
    /// swallowed the whole region and no slot is left.
    pub(crate) fn with_temporary_map<R>(
        &mut self,
        frame: PhysicalFrame,
        kprot: Protection,
        f: impl FnOnce(&mut Self) -> R,
    ) -> Result<R, KernelError> {
        let slot = self.temp_slot()?;
        self.set_entry(
            Region::Kernel,
            slot,
            PageTableEntry::map(frame, kprot, Protection::empty()),
        );
        let result = f(self);
        self.clear_entry(Region::Kernel, slot);
        Ok(result)
    }
}
