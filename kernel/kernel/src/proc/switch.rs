//! The context-switch protocol.
//!
//! Switching is a three-way dispatch:
//!
//! - [`Switch::InitSelf`] runs once at boot, adopting the boot execution
//!   state as the first process's own.
//! - [`Switch::Cold`] prepares a process that has never run by giving it
//!   a private copy of the creator's kernel-stack pages. Without the
//!   copy, a forked child would resume on frames its parent still
//!   writes.
//! - [`Switch::To`] is a live reschedule. If the outgoing process is
//!   terminated, its address space is reclaimed here, while its table is
//!   still the active one; and if nothing but idle would ever run again,
//!   the machine halts instead of spinning.

use crate::proc::{Pid, ProcState};
use crate::Kernel;
use crate::KernelError;
use kernel_addresses::{Region, VirtualPage};
use kernel_hal::{Hardware, PageTableEntry, Protection, TlbFlush};
use kernel_info::memory::{KERNEL_STACK_PAGES, MEM_INVALID_PAGES, PAGE_TABLE_LEN};
use kernel_info::sched::QUANTUM_TICKS;

/// One context-switch request.
pub(crate) enum Switch {
    /// Adopt the current execution state as `pid`'s own. Boot only.
    InitSelf(Pid),
    /// Copy the kernel stack into `pid`'s table. Creation only; does not
    /// transfer control.
    Cold(Pid),
    /// Reschedule: `pid` takes the CPU from the running process.
    To(Pid),
}

impl<H: Hardware, S> Kernel<H, S> {
    /// Execute one switch request.
    ///
    /// # Errors
    /// [`KernelError::OutOfMemory`] if a cold start cannot allocate the
    /// kernel-stack copies.
    pub(crate) fn context_switch(&mut self, switch: Switch) -> Result<(), KernelError> {
        match switch {
            Switch::InitSelf(pid) => {
                self.install(pid);
                Ok(())
            }
            Switch::Cold(pid) => {
                let table = self
                    .procs
                    .get(&pid)
                    .map(|p| p.page_table)
                    .ok_or(KernelError::InvalidArgument)?;
                for i in 0..KERNEL_STACK_PAGES {
                    self.copy_page(VirtualPage::new(PAGE_TABLE_LEN - 1 - i), table)?;
                }
                Ok(())
            }
            Switch::To(pid) => {
                let outgoing = self.running;
                if pid == outgoing {
                    // Round-robin picked the only runnable process again.
                    if let Some(p) = self.procs.get_mut(&pid) {
                        p.state = ProcState::Running;
                    }
                    return Ok(());
                }
                if self
                    .procs
                    .get(&outgoing)
                    .is_some_and(|p| p.state == ProcState::Terminated)
                {
                    self.reclaim_terminated(outgoing)?;
                    if pid == self.idle && self.nothing_left_to_run() {
                        log::info!("no runnable, delayed, or waiting process left; halting");
                        self.hw.halt();
                        self.halted = true;
                        return Ok(());
                    }
                }
                self.install(pid);
                Ok(())
            }
        }
    }

    /// Make `pid` the running process and point the MMU at its table.
    fn install(&mut self, pid: Pid) {
        let table = match self.procs.get_mut(&pid) {
            Some(p) => {
                p.state = ProcState::Running;
                p.wake_at = self.now + QUANTUM_TICKS;
                p.page_table
            }
            None => return,
        };
        self.running = pid;
        self.region0_table = table;
        self.hw.set_table_base(Region::User, table);
        self.map_table_window();
        self.hw.tlb_flush(TlbFlush::Region(Region::User));
        log::trace!("dispatching process {pid}");
    }

    /// Keep the region-1 window onto the active region-0 table current.
    fn map_table_window(&mut self) {
        let frame = self.region0_table.frame();
        self.set_entry(
            Region::Kernel,
            VirtualPage::new(PAGE_TABLE_LEN - 2),
            PageTableEntry::map(frame, Protection::RW, Protection::empty()),
        );
    }

    /// Free everything a terminated process still holds. Runs while its
    /// table is still the active one, so the pages are reachable.
    fn reclaim_terminated(&mut self, pid: Pid) -> Result<(), KernelError> {
        debug_assert!(self.region0_table == self.procs[&pid].page_table);
        for i in MEM_INVALID_PAGES..PAGE_TABLE_LEN {
            let vpn = VirtualPage::new(i);
            if self.read_entry(Region::User, vpn).valid() {
                self.enqueue_free(Region::User, vpn);
            }
        }
        let table = self.region0_table;
        self.release_table(table)?;
        self.procs.remove(&pid);
        log::debug!("reclaimed process {pid}");
        Ok(())
    }

    /// True when only idle could ever run again: no ready or delayed
    /// process and no terminal activity that could wake one.
    fn nothing_left_to_run(&self) -> bool {
        self.ready.is_empty() && self.delay.is_empty() && self.ttys.iter().all(crate::kernel::TtyState::is_idle)
    }
}
