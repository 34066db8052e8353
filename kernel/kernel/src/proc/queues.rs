//! Scheduler queue operations.

use crate::proc::{Pid, ProcState};
use crate::Kernel;
use kernel_hal::Hardware;

impl<H: Hardware, S> Kernel<H, S> {
    /// Put a process at the tail of the round-robin queue.
    ///
    /// The idle process is the fallback when the queue is empty and must
    /// never be queued itself.
    pub(crate) fn enqueue_ready(&mut self, pid: Pid) {
        debug_assert!(pid != self.idle, "idle process on the ready queue");
        if let Some(p) = self.procs.get_mut(&pid) {
            p.state = ProcState::Ready;
        }
        self.ready.push_back(pid);
    }

    /// Next process to run: the head of the ready queue, or idle.
    pub(crate) fn next_ready(&mut self) -> Pid {
        self.ready.pop_front().unwrap_or(self.idle)
    }

    /// Insert into the delay queue, kept sorted by wake time. Equal wake
    /// times stay in insertion order, so simultaneous wakes release in
    /// FIFO order.
    pub(crate) fn enqueue_delay(&mut self, pid: Pid, wake_at: u64) {
        if let Some(p) = self.procs.get_mut(&pid) {
            p.wake_at = wake_at;
        }
        let pos = self
            .delay
            .iter()
            .position(|other| {
                self.procs
                    .get(other)
                    .is_some_and(|p| p.wake_at > wake_at)
            })
            .unwrap_or(self.delay.len());
        self.delay.insert(pos, pid);
    }
}

#[cfg(test)]
mod tests {
    use crate::proc::{Pcb, Pid};
    use crate::Kernel;
    use kernel_addresses::PhysicalAddress;
    use kernel_sim::{SimImage, SimImages, SimMachine};

    fn booted() -> Kernel<SimMachine, SimImages> {
        let images = SimImages::new()
            .with_image("idle", SimImage::new(&[0x90; 32]))
            .with_image("init", SimImage::new(&[0x42; 64]));
        Kernel::boot(SimMachine::new(128), images, "init", &[]).unwrap()
    }

    #[test]
    fn delay_queue_sorts_with_fifo_ties() {
        let mut k = booted();
        for pid in [10, 11, 12, 13] {
            k.procs
                .insert(Pid::new(pid), Pcb::new(Pid::new(pid), None, PhysicalAddress::new(0)));
        }
        k.enqueue_delay(Pid::new(10), 5);
        k.enqueue_delay(Pid::new(11), 2);
        k.enqueue_delay(Pid::new(12), 8);
        k.enqueue_delay(Pid::new(13), 2);
        let order: Vec<u32> = k.delay.iter().map(|p| p.as_u32()).collect();
        assert_eq!(order, vec![11, 13, 10, 12]);
    }
}
