//! `Brk` and `Delay`.

use super::CallOutcome;
use crate::proc::{BlockReason, ProcState, Switch};
use crate::{Kernel, KernelError};
use kernel_addresses::{Region, VirtualAddress, VirtualPage};
use kernel_hal::{Hardware, ImageSource, Protection};
use kernel_info::memory::{MEM_INVALID_PAGES, VMEM_0_LIMIT};

impl<H: Hardware, S: ImageSource> Kernel<H, S> {
    /// Move the caller's break, mapping or unmapping heap pages. The new
    /// break may not run into the stack or the guard pages.
    pub(crate) fn sys_brk(&mut self, args: [u64; 3]) -> Result<CallOutcome, KernelError> {
        let addr = VirtualAddress::new(args[0]);
        if addr.as_u64() >= VMEM_0_LIMIT {
            return Err(KernelError::InvalidArgument);
        }
        let (old_brk, stack_base) = {
            let p = self.procs.get(&self.running).ok_or(KernelError::InvalidArgument)?;
            (p.brk_page, p.stack_base)
        };
        let new_brk = addr.page_up().page_in(Region::User).index();
        let stack_page = stack_base.page_down().page_in(Region::User).index();
        if new_brk < MEM_INVALID_PAGES || new_brk >= stack_page {
            return Err(KernelError::InvalidArgument);
        }

        if new_brk >= old_brk {
            for pn in old_brk..new_brk {
                if let Err(e) = self.dequeue_free(
                    Region::User,
                    VirtualPage::new(pn),
                    Protection::RW,
                    Protection::RW,
                ) {
                    // Give back what this call mapped so far.
                    for undo in old_brk..pn {
                        self.enqueue_free(Region::User, VirtualPage::new(undo));
                    }
                    return Err(e);
                }
            }
        } else {
            for pn in new_brk..old_brk {
                self.enqueue_free(Region::User, VirtualPage::new(pn));
            }
        }
        if let Some(p) = self.procs.get_mut(&self.running) {
            p.brk_page = new_brk;
        }
        Ok(CallOutcome::Return(0))
    }

    /// Block the caller for `ticks` clock ticks. Zero returns at once;
    /// negative is an error.
    pub(crate) fn sys_delay(&mut self, args: [u64; 3]) -> Result<CallOutcome, KernelError> {
        let ticks = args[0] as i64;
        if ticks < 0 {
            return Err(KernelError::InvalidArgument);
        }
        if ticks == 0 {
            return Ok(CallOutcome::Return(0));
        }
        let caller = self.running;
        let wake_at = self.now + ticks as u64;
        if let Some(p) = self.procs.get_mut(&caller) {
            p.state = ProcState::Blocked(BlockReason::Delay);
        }
        self.enqueue_delay(caller, wake_at);
        let next = self.next_ready();
        self.context_switch(Switch::To(next))?;
        Ok(CallOutcome::NoReturn)
    }
}
