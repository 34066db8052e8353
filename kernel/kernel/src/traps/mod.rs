//! The trap dispatcher.
//!
//! Every entry into the kernel is a trap. The dispatcher runs each one
//! to completion; a trap that blocks its caller records what the caller
//! was waiting for and hands the CPU to the next ready process, and the
//! waker writes the caller's result registers when the event arrives.

mod clock;
mod faults;
mod tty;

use crate::proc::Switch;
use crate::Kernel;
use kernel_hal::{CallCode, Hardware, ImageSource, TrapEvent, ERROR_SENTINEL};

impl<H: Hardware, S: ImageSource> Kernel<H, S> {
    /// Handle one hardware trap.
    pub fn trap(&mut self, event: TrapEvent) {
        if self.halted {
            return;
        }
        match event {
            TrapEvent::Clock => self.clock_tick(),
            TrapEvent::KernelCall { code } => self.dispatch_call(code),
            TrapEvent::Illegal(reason) => {
                self.fatal_fault("illegal instruction", reason.explain());
            }
            TrapEvent::Math(reason) => self.fatal_fault("arithmetic fault", reason.explain()),
            TrapEvent::Memory { addr, code } => self.memory_fault(addr, code),
            TrapEvent::TtyReceive { id } => self.tty_receive(id),
            TrapEvent::TtyTransmit { id } => self.tty_transmit(id),
        }
    }

    /// Issue a kernel call the way the user-mode stub library would:
    /// arguments into the caller's registers, trap, result register out.
    ///
    /// If the call blocked or ended the caller, the returned value is
    /// whatever the result register held at trap time; the real result
    /// appears in the caller's saved context once the call completes.
    pub fn kernel_call(&mut self, code: CallCode, args: [u64; 3]) -> i64 {
        let caller = self.running;
        if let Some(p) = self.procs.get_mut(&caller) {
            p.ctx.regs[1..=3].copy_from_slice(&args);
        }
        self.trap(TrapEvent::KernelCall { code: code as u32 });
        self.procs
            .get(&caller)
            .map_or(ERROR_SENTINEL, |p| p.ctx.regs[0] as i64)
    }

    /// Kill the running process for a fault it cannot recover from.
    pub(crate) fn fatal_fault(&mut self, what: &str, detail: &str) {
        log::error!("process {} killed: {what} ({detail})", self.running);
        self.terminate_running(ERROR_SENTINEL);
        let next = self.next_ready();
        if let Err(e) = self.context_switch(Switch::To(next)) {
            log::error!("switch after fatal fault failed: {e}");
        }
    }
}
