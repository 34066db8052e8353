//! Clock trap: time, delay wakeups, and round-robin preemption.

use crate::proc::Switch;
use crate::Kernel;
use kernel_hal::{Hardware, ImageSource};

impl<H: Hardware, S: ImageSource> Kernel<H, S> {
    pub(crate) fn clock_tick(&mut self) {
        self.now += 1;

        // Release every delayed process whose time has come, in queue
        // order. The queue is sorted, so the walk stops early.
        while let Some(&front) = self.delay.front() {
            let due = self
                .procs
                .get(&front)
                .is_some_and(|p| p.wake_at <= self.now);
            if !due {
                break;
            }
            self.delay.pop_front();
            if let Some(p) = self.procs.get_mut(&front) {
                p.ctx.regs[0] = 0;
            }
            self.enqueue_ready(front);
        }

        // Preempt when the quantum is up, or always when idle holds the
        // CPU, but only if someone else is ready to take it.
        let quantum_up = self.running == self.idle
            || self
                .procs
                .get(&self.running)
                .is_some_and(|p| p.wake_at <= self.now);
        if quantum_up && !self.ready.is_empty() {
            if self.running != self.idle {
                self.enqueue_ready(self.running);
            }
            let next = self.next_ready();
            if let Err(e) = self.context_switch(Switch::To(next)) {
                log::error!("clock reschedule failed: {e}");
            }
        }
    }
}
