//! Memory faults: implicit stack growth, fatal everything else.

use crate::Kernel;
use kernel_addresses::{Region, VirtualAddress, VirtualPage};
use kernel_hal::{Hardware, ImageSource, MemoryFaultCode, Protection};
use kernel_info::memory::{KERNEL_STACK_PAGES, MEM_INVALID_PAGES, PAGE_TABLE_LEN, VMEM_1_BASE};

impl<H: Hardware, S: ImageSource> Kernel<H, S> {
    pub(crate) fn memory_fault(&mut self, addr: VirtualAddress, code: MemoryFaultCode) {
        match code {
            MemoryFaultCode::Protection => {
                self.fatal_fault("protection violation", "access denied by page protections");
            }
            MemoryFaultCode::Unmapped => {
                if !self.try_grow_stack(addr) {
                    self.fatal_fault("memory fault", "unmapped reference outside the stack");
                }
            }
        }
    }

    /// An unmapped reference just below the stack is the stack growing.
    /// Map the gap down to the faulting address, unless that would cross
    /// into the red zone above the heap.
    fn try_grow_stack(&mut self, addr: VirtualAddress) -> bool {
        if addr.as_u64() >= VMEM_1_BASE {
            return false;
        }
        let Some(p) = self.procs.get(&self.running) else {
            return false;
        };
        let (brk_page, stack_base) = (p.brk_page, p.stack_base);
        let page = addr.page_in(Region::User).index();
        if page < MEM_INVALID_PAGES {
            return false;
        }
        if addr >= stack_base {
            // A hole inside the existing stack, or the kernel stack.
            return false;
        }
        if page <= brk_page {
            // Red zone: growth may never touch the page next to the heap.
            return false;
        }
        let old_base_page = stack_base.page_down().page_in(Region::User).index();
        debug_assert!(old_base_page <= PAGE_TABLE_LEN - KERNEL_STACK_PAGES);
        for pn in page..old_base_page {
            if self
                .dequeue_free(Region::User, VirtualPage::new(pn), Protection::RW, Protection::RW)
                .is_err()
            {
                log::error!("out of memory growing stack of process {}", self.running);
                return false;
            }
        }
        if let Some(p) = self.procs.get_mut(&self.running) {
            p.stack_base = addr;
        }
        log::trace!("grew stack of {} down to {addr}", self.running);
        true
    }
}
