use crate::proc::{Pcb, Pid, ProcState};
use alloc::collections::{BTreeMap, VecDeque};
use alloc::vec::Vec;
use kernel_addresses::{PhysicalAddress, PhysicalFrame, VirtualAddress};
use kernel_hal::{Hardware, SavedContext};

/// The whole kernel: machine, memory accounting, processes, queues.
///
/// One instance exists per machine. Every trap enters through
/// [`Kernel::trap`](crate::Kernel::trap) and runs to completion before
/// the next one is delivered; there is no concurrency inside.
pub struct Kernel<H, S> {
    pub(crate) hw: H,
    pub(crate) images: S,

    /// Virtual addressing has been switched on. Set once during boot.
    pub(crate) vm_enabled: bool,
    /// Top of the kernel heap in region 1, page-aligned.
    pub(crate) kernel_break: VirtualAddress,

    /// Frames on the free list. The list itself lives inside the frames.
    pub(crate) num_free_frames: usize,
    pub(crate) free_frame_head: Option<PhysicalFrame>,
    /// Free upper-half page-table slots, linked through the slots.
    pub(crate) upper_half_head: Option<PhysicalAddress>,
    /// Free lower-half page-table slots, linked through the slots.
    pub(crate) lower_half_head: Option<PhysicalAddress>,

    /// The active region-0 page table. Tracks `running`'s table; also
    /// what the MMU base register holds.
    pub(crate) region0_table: PhysicalAddress,
    /// The region-1 page table, fixed after boot.
    pub(crate) region1_table: PhysicalAddress,

    /// Clock ticks since boot.
    pub(crate) now: u64,

    pub(crate) next_pid: u32,
    pub(crate) procs: BTreeMap<Pid, Pcb>,
    pub(crate) running: Pid,
    pub(crate) idle: Pid,
    /// Round-robin ready queue. Never holds `idle` or `running`.
    pub(crate) ready: VecDeque<Pid>,
    /// Delayed processes, ordered by wake time, FIFO among equals.
    pub(crate) delay: VecDeque<Pid>,
    pub(crate) ttys: Vec<TtyState>,

    pub(crate) halted: bool,
}

/// Kernel-side state of one terminal.
pub(crate) struct TtyState {
    /// Processes blocked waiting for input, FIFO.
    pub(crate) readers: VecDeque<Pid>,
    /// Processes blocked waiting to transmit, FIFO.
    pub(crate) writers: VecDeque<Pid>,
    /// The process whose transmit is in flight on the hardware.
    pub(crate) transmitting: Option<Pid>,
    /// Completed input lines not yet fully consumed.
    pub(crate) lines: VecDeque<InputLine>,
}

impl TtyState {
    pub(crate) const fn new() -> Self {
        Self {
            readers: VecDeque::new(),
            writers: VecDeque::new(),
            transmitting: None,
            lines: VecDeque::new(),
        }
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.readers.is_empty() && self.writers.is_empty() && self.transmitting.is_none()
    }
}

/// One line of terminal input, consumed front to back across possibly
/// several reads.
pub(crate) struct InputLine {
    pub(crate) bytes: Vec<u8>,
    pub(crate) cursor: usize,
}

impl InputLine {
    pub(crate) fn remaining(&self) -> &[u8] {
        &self.bytes[self.cursor..]
    }
}

impl<H: Hardware, S> Kernel<H, S> {
    /// Pid of the process the CPU would be running.
    #[must_use]
    pub fn current(&self) -> Pid {
        self.running
    }

    /// Pid of the idle process.
    #[must_use]
    pub fn idle_pid(&self) -> Pid {
        self.idle
    }

    /// Scheduling state of a process, if it still exists.
    #[must_use]
    pub fn state_of(&self, pid: Pid) -> Option<ProcState> {
        self.procs.get(&pid).map(|p| p.state)
    }

    /// Saved execution context of a process, if it still exists.
    #[must_use]
    pub fn context_of(&self, pid: Pid) -> Option<&SavedContext> {
        self.procs.get(&pid).map(|p| &p.ctx)
    }

    /// Frames currently on the free list.
    #[must_use]
    pub fn free_frames(&self) -> usize {
        self.num_free_frames
    }

    /// Clock ticks since boot.
    #[must_use]
    pub fn now(&self) -> u64 {
        self.now
    }

    /// The machine was halted because nothing was left to run.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// The underlying machine.
    pub fn machine(&self) -> &H {
        &self.hw
    }

    /// The underlying machine, mutably. Test harnesses use this to type
    /// terminal input and acknowledge transmits.
    pub fn machine_mut(&mut self) -> &mut H {
        &mut self.hw
    }
}
