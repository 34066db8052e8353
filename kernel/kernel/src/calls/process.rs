//! `Fork`, `Exec`, `Exit`, `Wait`.

use super::CallOutcome;
use crate::proc::{BlockReason, PendingCall, Pid, ProcState, Switch};
use crate::{Kernel, KernelError, LoadError};
use alloc::string::String;
use alloc::vec::Vec;
use kernel_addresses::{Region, VirtualAddress, VirtualPage};
use kernel_hal::{Hardware, ImageSource, Protection, ERROR_SENTINEL};
use kernel_info::memory::{KERNEL_STACK_PAGES, MEM_INVALID_PAGES, PAGE_TABLE_LEN};

impl<H: Hardware, S: ImageSource> Kernel<H, S> {
    /// Duplicate the caller: a new process with copies of its kernel
    /// stack, heap, and user stack pages. The child starts with the
    /// caller's saved context and a zero result register; the caller
    /// gets the child's pid. Both are made ready and the head of the
    /// queue runs.
    pub(crate) fn sys_fork(&mut self) -> Result<CallOutcome, KernelError> {
        let parent = self.running;
        let table = self.allocate_table()?;
        let child = self.spawn(table);

        let (ctx, brk_page, stack_base) = {
            let p = self.procs.get(&parent).ok_or(KernelError::InvalidArgument)?;
            (p.ctx.clone(), p.brk_page, p.stack_base)
        };
        if let Some(c) = self.procs.get_mut(&child) {
            c.ctx = ctx;
            c.ctx.regs[0] = 0;
            c.brk_page = brk_page;
            c.stack_base = stack_base;
        }

        if let Err(e) = self.fork_copy(child, brk_page, stack_base) {
            log::warn!("fork by {parent} failed mid-copy: {e}");
            let _ = self.reclaim_table_frames(table);
            let _ = self.release_table(table);
            self.cancel_spawn(child);
            return Err(KernelError::OutOfMemory);
        }

        self.enqueue_ready(child);
        self.enqueue_ready(parent);
        let next = self.next_ready();
        self.context_switch(Switch::To(next))?;
        Ok(CallOutcome::Return(child.as_u64() as i64))
    }

    fn fork_copy(
        &mut self,
        child: Pid,
        brk_page: usize,
        stack_base: VirtualAddress,
    ) -> Result<(), KernelError> {
        self.context_switch(Switch::Cold(child))?;
        let table = self
            .procs
            .get(&child)
            .map(|p| p.page_table)
            .ok_or(KernelError::InvalidArgument)?;
        for pn in MEM_INVALID_PAGES..brk_page {
            self.copy_page(VirtualPage::new(pn), table)?;
        }
        let stack_page = stack_base.page_down().page_in(Region::User).index();
        for pn in stack_page..PAGE_TABLE_LEN - KERNEL_STACK_PAGES {
            self.copy_page(VirtualPage::new(pn), table)?;
        }
        Ok(())
    }

    /// Replace the caller's program. Before the old address space is
    /// torn down, failures leave the caller untouched; after that point
    /// there is nothing to return to, and failure is fatal.
    pub(crate) fn sys_exec(&mut self, args: [u64; 3]) -> Result<CallOutcome, KernelError> {
        let name_bytes = self.user_cstring(VirtualAddress::new(args[0]))?;
        let name =
            String::from_utf8(name_bytes).map_err(|_| KernelError::InvalidArgument)?;
        let mut argv: Vec<Vec<u8>> = Vec::new();
        if args[1] != 0 {
            for ptr in self.user_arg_words(VirtualAddress::new(args[1]))? {
                argv.push(self.user_cstring(VirtualAddress::new(ptr))?);
            }
        }

        match self.load_program(&name, &argv) {
            Ok(()) => Ok(CallOutcome::Return(0)),
            Err(LoadError::Recoverable(e)) => {
                log::warn!("exec of '{name}' by {} refused: {e}", self.running);
                Err(KernelError::InvalidArgument)
            }
            Err(LoadError::Fatal(e)) => {
                log::error!(
                    "exec of '{name}' by {} failed past teardown: {e}",
                    self.running
                );
                self.terminate_running(ERROR_SENTINEL);
                let next = self.next_ready();
                self.context_switch(Switch::To(next))?;
                Ok(CallOutcome::NoReturn)
            }
        }
    }

    /// End the caller with `status`.
    pub(crate) fn sys_exit(&mut self, args: [u64; 3]) -> Result<CallOutcome, KernelError> {
        self.terminate_running(args[0] as i64);
        let next = self.next_ready();
        self.context_switch(Switch::To(next))?;
        Ok(CallOutcome::NoReturn)
    }

    /// Collect one child exit: status through the caller's pointer, pid
    /// as the result. Blocks until a child exits if none has yet; errors
    /// immediately if the caller has no children at all.
    pub(crate) fn sys_wait(&mut self, args: [u64; 3]) -> Result<CallOutcome, KernelError> {
        let status_addr = VirtualAddress::new(args[0]);
        self.check_buffer(status_addr, 8, Protection::WRITE)?;
        let caller = self.running;

        let front = self.procs.get_mut(&caller).and_then(|p| p.exited.pop_front());
        if let Some(exit) = front {
            self.write_user(status_addr, &exit.status.to_le_bytes())?;
            return Ok(CallOutcome::Return(exit.pid.as_u64() as i64));
        }

        let nchild = self.procs.get(&caller).map_or(0, |p| p.nchild);
        if nchild == 0 {
            return Err(KernelError::NoChildren);
        }

        if let Some(p) = self.procs.get_mut(&caller) {
            p.pending = Some(PendingCall::Wait { status_addr });
            p.state = ProcState::Blocked(BlockReason::Child);
        }
        let next = self.next_ready();
        self.context_switch(Switch::To(next))?;
        Ok(CallOutcome::NoReturn)
    }
}
