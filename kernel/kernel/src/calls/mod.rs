//! The kernel-call table.
//!
//! Argument words come out of the caller's saved registers; the single
//! result word goes back through `regs[0]`. A handler either returns a
//! value for the dispatcher to deliver, or takes responsibility for the
//! caller itself (because it blocked, switched away, or ended it).

mod memory;
mod process;
mod tty;

use crate::Kernel;
use kernel_hal::{CallCode, Hardware, ImageSource, ERROR_SENTINEL};

/// How a call handler left its caller.
pub(crate) enum CallOutcome {
    /// Deliver this value through the caller's result register.
    Return(i64),
    /// The handler already arranged the caller's fate.
    NoReturn,
}

impl<H: Hardware, S: ImageSource> Kernel<H, S> {
    pub(crate) fn dispatch_call(&mut self, code: u32) {
        let caller = self.running;
        let args = self
            .procs
            .get(&caller)
            .map(|p| [p.ctx.regs[1], p.ctx.regs[2], p.ctx.regs[3]])
            .unwrap_or_default();

        let outcome = match CallCode::from_u32(code) {
            Some(CallCode::Fork) => self.sys_fork(),
            Some(CallCode::Exec) => self.sys_exec(args),
            Some(CallCode::Exit) => self.sys_exit(args),
            Some(CallCode::Wait) => self.sys_wait(args),
            Some(CallCode::GetPid) => Ok(CallOutcome::Return(caller.as_u64() as i64)),
            Some(CallCode::Brk) => self.sys_brk(args),
            Some(CallCode::Delay) => self.sys_delay(args),
            Some(CallCode::TtyRead) => self.sys_tty_read(args),
            Some(CallCode::TtyWrite) => self.sys_tty_write(args),
            None => {
                log::warn!("process {caller} trapped with unknown call code {code}");
                Err(crate::KernelError::InvalidArgument)
            }
        };

        match outcome {
            Ok(CallOutcome::Return(value)) => {
                if let Some(p) = self.procs.get_mut(&caller) {
                    p.ctx.regs[0] = value as u64;
                }
            }
            Ok(CallOutcome::NoReturn) => {}
            Err(e) => {
                log::debug!("kernel call {code} by {caller} failed: {e}");
                if let Some(p) = self.procs.get_mut(&caller) {
                    p.ctx.regs[0] = ERROR_SENTINEL as u64;
                }
            }
        }
    }
}
