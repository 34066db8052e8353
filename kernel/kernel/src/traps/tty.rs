//! Terminal traps and the shared reader/writer wake machinery.
//!
//! Input arrives a whole line at a time; a line is consumed front to
//! back by however many reads it takes. Output is serialized per
//! terminal: exactly one transmit is in flight, and queued writers start
//! theirs when its completion trap arrives.

use crate::kernel::InputLine;
use crate::proc::{PendingCall, Pid, ProcState};
use crate::{Kernel, KernelError};
use alloc::vec;
use alloc::vec::Vec;
use kernel_hal::{Hardware, ImageSource, ERROR_SENTINEL};
use kernel_info::tty::TERMINAL_MAX_LINE;

impl<H: Hardware, S: ImageSource> Kernel<H, S> {
    /// A line finished on terminal `id`: pull it, queue it, and serve
    /// blocked readers from it.
    pub(crate) fn tty_receive(&mut self, id: usize) {
        let mut buf = [0u8; TERMINAL_MAX_LINE];
        let n = self.hw.receive(id, &mut buf);
        self.ttys[id].lines.push_back(InputLine {
            bytes: buf[..n].to_vec(),
            cursor: 0,
        });
        log::trace!("tty {id}: received {n} byte line");
        self.wake_readers(id);
    }

    /// The transmit on terminal `id` completed: release its owner and
    /// start the next queued writer's transmit.
    pub(crate) fn tty_transmit(&mut self, id: usize) {
        let Some(owner) = self.ttys[id].transmitting.take() else {
            log::warn!("transmit trap on tty {id} with no transmit in flight");
            return;
        };
        if let Some(p) = self.procs.get_mut(&owner) {
            match p.pending.take() {
                Some(PendingCall::TtyWrite { len, .. }) => p.ctx.regs[0] = len as u64,
                other => {
                    p.pending = other;
                    log::warn!("transmit owner {owner} was not blocked on a write");
                }
            }
        }
        self.enqueue_ready(owner);

        if let Some(next) = self.ttys[id].writers.pop_front() {
            if let Err(e) = self.start_transmit(next, id) {
                log::error!("starting queued transmit for {next} failed: {e}");
                if let Some(p) = self.procs.get_mut(&next) {
                    p.pending = None;
                    p.ctx.regs[0] = ERROR_SENTINEL as u64;
                }
                self.enqueue_ready(next);
            }
        }
    }

    /// Complete blocked readers while the terminal has input for them.
    pub(crate) fn wake_readers(&mut self, id: usize) {
        while !self.ttys[id].lines.is_empty() {
            let Some(reader) = self.ttys[id].readers.pop_front() else {
                break;
            };
            if let Err(e) = self.complete_tty_read(reader, id) {
                log::error!("waking reader {reader} on tty {id} failed: {e}");
                if let Some(p) = self.procs.get_mut(&reader) {
                    p.ctx.regs[0] = ERROR_SENTINEL as u64;
                }
                self.enqueue_ready(reader);
            }
        }
    }

    /// Take up to `want` bytes off the head input line; the line is
    /// dropped once drained.
    pub(crate) fn consume_line(&mut self, id: usize, want: usize) -> Vec<u8> {
        let Some(line) = self.ttys[id].lines.front_mut() else {
            return Vec::new();
        };
        let n = want.min(line.remaining().len());
        let bytes = line.remaining()[..n].to_vec();
        line.cursor += n;
        if line.remaining().is_empty() {
            self.ttys[id].lines.pop_front();
        }
        bytes
    }

    /// Deliver input to a reader that blocked: copy into the buffer it
    /// passed, put the byte count in its result register, make it ready.
    fn complete_tty_read(&mut self, reader: Pid, id: usize) -> Result<(), KernelError> {
        let (buf, len, table) = {
            let pb = self.procs.get_mut(&reader).ok_or(KernelError::InvalidArgument)?;
            match pb.pending.take() {
                Some(PendingCall::TtyRead { buf, len, .. }) => (buf, len, pb.page_table),
                other => {
                    pb.pending = other;
                    return Err(KernelError::InvalidArgument);
                }
            }
        };
        let bytes = self.consume_line(id, len);
        self.write_user_in(table, buf, &bytes)?;
        if let Some(p) = self.procs.get_mut(&reader) {
            p.ctx.regs[0] = bytes.len() as u64;
        }
        self.enqueue_ready(reader);
        Ok(())
    }

    /// Hand a blocked writer's buffer to the hardware and record it as
    /// the transmit owner. Its call completes at the transmit trap.
    pub(crate) fn start_transmit(&mut self, writer: Pid, id: usize) -> Result<(), KernelError> {
        let (buf, len, table) = {
            let pb = self.procs.get(&writer).ok_or(KernelError::InvalidArgument)?;
            match &pb.pending {
                Some(PendingCall::TtyWrite { buf, len, .. }) => (*buf, *len, pb.page_table),
                _ => return Err(KernelError::InvalidArgument),
            }
        };
        let mut data = vec![0u8; len];
        self.read_user_in(table, buf, &mut data)?;
        self.hw.transmit(id, &data);
        self.ttys[id].transmitting = Some(writer);
        if let Some(p) = self.procs.get_mut(&writer) {
            p.state = ProcState::Blocked(crate::proc::BlockReason::TtyWrite);
        }
        Ok(())
    }
}
