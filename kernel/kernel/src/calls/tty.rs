//! `TtyRead` and `TtyWrite`.

use super::CallOutcome;
use crate::proc::{BlockReason, PendingCall, ProcState, Switch};
use crate::{Kernel, KernelError};
use kernel_addresses::VirtualAddress;
use kernel_hal::{Hardware, ImageSource, Protection};
use kernel_info::tty::{NUM_TERMINALS, TERMINAL_MAX_LINE};

impl<H: Hardware, S: ImageSource> Kernel<H, S> {
    /// Read up to one line's worth of input from a terminal. Blocks
    /// until a line is available; a line longer than the request is
    /// consumed across several reads.
    pub(crate) fn sys_tty_read(&mut self, args: [u64; 3]) -> Result<CallOutcome, KernelError> {
        let id = args[0] as usize;
        if id >= NUM_TERMINALS {
            return Err(KernelError::InvalidArgument);
        }
        let buf = VirtualAddress::new(args[1]);
        let len = args[2] as usize;
        if len > TERMINAL_MAX_LINE {
            return Err(KernelError::InvalidArgument);
        }
        self.check_buffer(buf, len, Protection::WRITE)?;
        if len == 0 {
            return Ok(CallOutcome::Return(0));
        }

        if self.ttys[id].lines.is_empty() {
            let caller = self.running;
            if let Some(p) = self.procs.get_mut(&caller) {
                p.pending = Some(PendingCall::TtyRead { id, buf, len });
                p.state = ProcState::Blocked(BlockReason::TtyRead);
            }
            self.ttys[id].readers.push_back(caller);
            let next = self.next_ready();
            self.context_switch(Switch::To(next))?;
            return Ok(CallOutcome::NoReturn);
        }

        let bytes = self.consume_line(id, len);
        self.write_user(buf, &bytes)?;
        // A leftover tail can satisfy the next blocked reader.
        self.wake_readers(id);
        Ok(CallOutcome::Return(bytes.len() as i64))
    }

    /// Write a buffer to a terminal. At most one transmit per terminal
    /// is in flight; later writers queue behind it in FIFO order. The
    /// caller stays blocked until its own transmit completes.
    pub(crate) fn sys_tty_write(&mut self, args: [u64; 3]) -> Result<CallOutcome, KernelError> {
        let id = args[0] as usize;
        if id >= NUM_TERMINALS {
            return Err(KernelError::InvalidArgument);
        }
        let buf = VirtualAddress::new(args[1]);
        let len = args[2] as usize;
        if len > TERMINAL_MAX_LINE {
            return Err(KernelError::InvalidArgument);
        }
        self.check_buffer(buf, len, Protection::READ)?;
        if len == 0 {
            return Ok(CallOutcome::Return(0));
        }

        let caller = self.running;
        if let Some(p) = self.procs.get_mut(&caller) {
            p.pending = Some(PendingCall::TtyWrite { id, buf, len });
            p.state = ProcState::Blocked(BlockReason::TtyWrite);
        }
        if self.ttys[id].transmitting.is_none() {
            if let Err(e) = self.start_transmit(caller, id) {
                if let Some(p) = self.procs.get_mut(&caller) {
                    p.pending = None;
                    p.state = ProcState::Running;
                }
                return Err(e);
            }
        } else {
            self.ttys[id].writers.push_back(caller);
        }
        let next = self.next_ready();
        self.context_switch(Switch::To(next))?;
        Ok(CallOutcome::NoReturn)
    }
}
