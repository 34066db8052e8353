use kernel_addresses::{PhysicalAddress, PhysicalFrame, Region};
use kernel_hal::{Hardware, TlbFlush};
use kernel_info::memory::PAGE_SIZE;
use kernel_info::tty::NUM_TERMINALS;
use std::collections::VecDeque;

/// Per-terminal device state.
#[derive(Default)]
struct SimTty {
    /// Lines typed at the terminal, not yet pulled by a receive trap.
    input: VecDeque<Vec<u8>>,
    /// Every line the kernel has transmitted, in order.
    output: Vec<Vec<u8>>,
    /// A transmit was started and its completion trap not yet raised.
    busy: bool,
}

/// The simulated machine.
///
/// Physical memory is a flat frame arena; the MMU registers and TLB are
/// recorded but not interpreted (the kernel owns translation), so tests
/// can assert on what the kernel programmed. Terminals buffer whole
/// lines in both directions.
pub struct SimMachine {
    pmem: Vec<u8>,
    table_base: [Option<PhysicalAddress>; 2],
    vm_enabled: bool,
    halted: bool,
    tlb_flushes: u64,
    ttys: Vec<SimTty>,
}

impl SimMachine {
    /// A machine with `frames` frames of physical memory and
    /// [`NUM_TERMINALS`] terminals.
    #[must_use]
    pub fn new(frames: usize) -> Self {
        Self {
            pmem: vec![0; frames * PAGE_SIZE as usize],
            table_base: [None, None],
            vm_enabled: false,
            halted: false,
            tlb_flushes: 0,
            ttys: (0..NUM_TERMINALS).map(|_| SimTty::default()).collect(),
        }
    }

    /// Type a line at terminal `id`. The kernel sees it once a
    /// receive trap for that terminal is dispatched.
    pub fn type_line(&mut self, id: usize, line: &[u8]) {
        self.ttys[id].input.push_back(line.to_vec());
    }

    /// Lines the kernel has transmitted on terminal `id` so far.
    #[must_use]
    pub fn output(&self, id: usize) -> &[Vec<u8>] {
        &self.ttys[id].output
    }

    /// Whether a transmit on terminal `id` is awaiting its completion trap.
    #[must_use]
    pub fn transmit_busy(&self, id: usize) -> bool {
        self.ttys[id].busy
    }

    /// Acknowledge the in-flight transmit on terminal `id`; the caller
    /// then dispatches the matching transmit trap to the kernel.
    pub fn complete_transmit(&mut self, id: usize) {
        assert!(self.ttys[id].busy, "no transmit in flight on tty {id}");
        self.ttys[id].busy = false;
    }

    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    #[must_use]
    pub fn vm_enabled(&self) -> bool {
        self.vm_enabled
    }

    /// Active page-table base last programmed for `region`.
    #[must_use]
    pub fn table_base(&self, region: Region) -> Option<PhysicalAddress> {
        self.table_base[matches!(region, Region::Kernel) as usize]
    }

    /// Number of TLB invalidations issued since boot.
    #[must_use]
    pub fn tlb_flushes(&self) -> u64 {
        self.tlb_flushes
    }

    fn frame_range(&self, frame: PhysicalFrame, offset: usize, len: usize) -> std::ops::Range<usize> {
        assert!(offset + len <= PAGE_SIZE as usize, "access crosses frame boundary");
        let start = frame.index() * PAGE_SIZE as usize + offset;
        assert!(start + len <= self.pmem.len(), "access beyond physical memory");
        start..start + len
    }
}

impl Hardware for SimMachine {
    fn pmem_frames(&self) -> usize {
        self.pmem.len() / PAGE_SIZE as usize
    }

    fn set_table_base(&mut self, region: Region, base: PhysicalAddress) {
        self.table_base[matches!(region, Region::Kernel) as usize] = Some(base);
    }

    fn enable_vm(&mut self) {
        self.vm_enabled = true;
    }

    fn tlb_flush(&mut self, _scope: TlbFlush) {
        self.tlb_flushes += 1;
    }

    fn halt(&mut self) {
        self.halted = true;
    }

    fn frame_read(&self, frame: PhysicalFrame, offset: usize, buf: &mut [u8]) {
        let range = self.frame_range(frame, offset, buf.len());
        buf.copy_from_slice(&self.pmem[range]);
    }

    fn frame_write(&mut self, frame: PhysicalFrame, offset: usize, buf: &[u8]) {
        let range = self.frame_range(frame, offset, buf.len());
        self.pmem[range].copy_from_slice(buf);
    }

    fn receive(&mut self, id: usize, buf: &mut [u8]) -> usize {
        let Some(line) = self.ttys[id].input.pop_front() else {
            return 0;
        };
        let n = line.len().min(buf.len());
        buf[..n].copy_from_slice(&line[..n]);
        n
    }

    fn transmit(&mut self, id: usize, buf: &[u8]) {
        assert!(!self.ttys[id].busy, "transmit started while another is in flight");
        self.ttys[id].busy = true;
        self.ttys[id].output.push(buf.to_vec());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_access_roundtrip() {
        let mut m = SimMachine::new(8);
        m.frame_write(PhysicalFrame::new(3), 100, b"hello");
        let mut buf = [0u8; 5];
        m.frame_read(PhysicalFrame::new(3), 100, &mut buf);
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn terminal_lines_queue_in_order() {
        let mut m = SimMachine::new(1);
        m.type_line(0, b"first\n");
        m.type_line(0, b"second\n");
        let mut buf = [0u8; 64];
        assert_eq!(m.receive(0, &mut buf), 6);
        assert_eq!(&buf[..6], b"first\n");
        assert_eq!(m.receive(0, &mut buf), 7);
        assert_eq!(&buf[..7], b"second\n");
        assert_eq!(m.receive(0, &mut buf), 0);
    }

    #[test]
    #[should_panic(expected = "another is in flight")]
    fn overlapping_transmits_are_a_bug() {
        let mut m = SimMachine::new(1);
        m.transmit(1, b"a");
        m.transmit(1, b"b");
    }
}
