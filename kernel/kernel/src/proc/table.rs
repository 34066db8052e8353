//! Process creation, the family tree, and termination.
//!
//! Parent/child/sibling links are pids resolved through the process
//! table, not pointers: each PCB holds the head of its child list, and
//! children chain through their `sibling` field. A parent learns of a
//! child's exit through its mailbox; a child whose parent died first is
//! orphaned and its exit reported to nobody.

use crate::proc::{BlockReason, ChildExit, Pcb, PendingCall, Pid, ProcState};
use crate::{Kernel, KernelError};
use kernel_addresses::PhysicalAddress;
use kernel_hal::Hardware;

impl<H: Hardware, S> Kernel<H, S> {
    /// Create a PCB around an already-allocated region-0 page table.
    ///
    /// The first two pids (idle and the initial process) have no parent;
    /// everything after that is a child of the caller.
    pub(crate) fn spawn(&mut self, page_table: PhysicalAddress) -> Pid {
        let pid = Pid::new(self.next_pid);
        self.next_pid += 1;
        let parent = (pid.as_u32() > 1).then_some(self.running);
        self.procs.insert(pid, Pcb::new(pid, parent, page_table));
        if let Some(pp) = parent {
            self.link_child(pp, pid);
        }
        log::debug!("spawned process {pid} (parent {parent:?})");
        pid
    }

    /// Append `pid` to the tail of `parent`'s child list.
    fn link_child(&mut self, parent: Pid, pid: Pid) {
        let mut cur = match self.procs.get_mut(&parent) {
            Some(pb) => {
                pb.nchild += 1;
                match pb.child {
                    Some(head) => head,
                    None => {
                        pb.child = Some(pid);
                        return;
                    }
                }
            }
            None => return,
        };
        while let Some(next) = self.procs.get(&cur).and_then(|p| p.sibling) {
            cur = next;
        }
        if let Some(p) = self.procs.get_mut(&cur) {
            p.sibling = Some(pid);
        }
    }

    /// Splice `pid` out of `parent`'s child list.
    fn unlink_child(&mut self, parent: Pid, pid: Pid) {
        let Some(head) = self.procs.get(&parent).and_then(|p| p.child) else {
            return;
        };
        if head == pid {
            let next = self.procs.get(&pid).and_then(|p| p.sibling);
            if let Some(pb) = self.procs.get_mut(&parent) {
                pb.child = next;
            }
            return;
        }
        let mut cur = head;
        while let Some(next) = self.procs.get(&cur).and_then(|p| p.sibling) {
            if next == pid {
                let after = self.procs.get(&pid).and_then(|p| p.sibling);
                if let Some(p) = self.procs.get_mut(&cur) {
                    p.sibling = after;
                }
                return;
            }
            cur = next;
        }
    }

    /// Undo a [`Self::spawn`] whose address-space setup failed: detach
    /// the process from its parent and drop the PCB. The caller has
    /// already reclaimed the table and any copied pages.
    pub(crate) fn cancel_spawn(&mut self, pid: Pid) {
        if let Some(pp) = self.procs.get(&pid).and_then(|p| p.parent) {
            self.unlink_child(pp, pid);
            if let Some(pb) = self.procs.get_mut(&pp) {
                pb.nchild -= 1;
            }
        }
        self.procs.remove(&pid);
    }

    /// End the running process: orphan its children, report the exit to
    /// its parent, mark it terminated. Memory is reclaimed at the next
    /// switch away from it.
    pub(crate) fn terminate_running(&mut self, status: i64) {
        let pid = self.running;

        let mut cur = self.procs.get_mut(&pid).and_then(|p| p.child.take());
        while let Some(c) = cur {
            cur = self.procs.get_mut(&c).and_then(|cb| {
                cb.parent = None;
                cb.sibling.take()
            });
        }

        let parent = self.procs.get(&pid).and_then(|p| p.parent);
        if let Some(pp) = parent {
            self.unlink_child(pp, pid);
            if let Some(pb) = self.procs.get_mut(&pp) {
                pb.nchild -= 1;
                pb.exited.push_back(ChildExit { pid, status });
            }
            let parent_waiting = matches!(
                self.procs.get(&pp).map(|p| p.state),
                Some(ProcState::Blocked(BlockReason::Child))
            );
            if parent_waiting {
                if let Err(e) = self.complete_wait(pp) {
                    log::error!("waking waiting parent {pp} failed: {e}");
                }
            }
        }

        if let Some(p) = self.procs.get_mut(&pid) {
            p.state = ProcState::Terminated;
        }
        log::info!("process {pid} exited with status {status}");
    }

    /// Deliver a collected exit to a parent blocked in `Wait`: store the
    /// status through the pointer it passed, put the child's pid in its
    /// result register, and make it runnable again.
    pub(crate) fn complete_wait(&mut self, parent: Pid) -> Result<(), KernelError> {
        let (status_addr, table) = {
            let pb = self.procs.get_mut(&parent).ok_or(KernelError::InvalidArgument)?;
            match pb.pending.take() {
                Some(PendingCall::Wait { status_addr }) => (status_addr, pb.page_table),
                other => {
                    pb.pending = other;
                    return Err(KernelError::InvalidArgument);
                }
            }
        };
        let exit = self
            .procs
            .get_mut(&parent)
            .and_then(|p| p.exited.pop_front())
            .ok_or(KernelError::InvalidArgument)?;
        self.write_user_in(table, status_addr, &exit.status.to_le_bytes())?;
        if let Some(pb) = self.procs.get_mut(&parent) {
            pb.ctx.regs[0] = exit.pid.as_u64();
        }
        self.enqueue_ready(parent);
        Ok(())
    }
}
