use kernel_addresses::{PhysicalAddress, PhysicalFrame, Region, VirtualAddress};

/// Translation-cache invalidation scopes understood by the MMU.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TlbFlush {
    /// Drop every cached translation.
    All,
    /// Drop cached translations for one region.
    Region(Region),
    /// Drop the cached translation for the page containing one address.
    Addr(VirtualAddress),
}

/// The hardware register and device interface.
///
/// This is everything the kernel core may ask of the machine. The
/// software-loaded MMU means the kernel walks page tables itself; the
/// contract here is only about *telling* the hardware where those tables
/// are and keeping its translation cache coherent.
///
/// Physical memory is exposed frame-by-frame because that is the only
/// granularity the kernel ever needs: page copies, page-table slots, and
/// the free-list links embedded in unmapped frames.
pub trait Hardware {
    /// Number of physical frames installed.
    fn pmem_frames(&self) -> usize;

    /// Point the MMU at the active page table for `region`.
    fn set_table_base(&mut self, region: Region, base: PhysicalAddress);

    /// Turn on virtual addressing. Called exactly once, during boot.
    fn enable_vm(&mut self);

    /// Invalidate cached translations.
    fn tlb_flush(&mut self, scope: TlbFlush);

    /// Stop the machine. Does not return control to any process.
    fn halt(&mut self);

    /// Copy bytes out of a physical frame into `buf`.
    ///
    /// `offset + buf.len()` must stay within the frame.
    fn frame_read(&self, frame: PhysicalFrame, offset: usize, buf: &mut [u8]);

    /// Copy `buf` into a physical frame at `offset`.
    ///
    /// `offset + buf.len()` must stay within the frame.
    fn frame_write(&mut self, frame: PhysicalFrame, offset: usize, buf: &[u8]);

    /// Pull the line that completed on terminal `id`; returns the byte
    /// count. Only meaningful inside a terminal-receive trap.
    fn receive(&mut self, id: usize, buf: &mut [u8]) -> usize;

    /// Start an asynchronous transmit on terminal `id`; completion is
    /// signaled later by a transmit trap for the same terminal.
    fn transmit(&mut self, id: usize, buf: &[u8]);

    /// Convenience: read one little-endian `u32` out of a frame.
    fn frame_read_u32(&self, frame: PhysicalFrame, offset: usize) -> u32 {
        let mut bytes = [0u8; 4];
        self.frame_read(frame, offset, &mut bytes);
        u32::from_le_bytes(bytes)
    }

    /// Convenience: write one little-endian `u32` into a frame.
    fn frame_write_u32(&mut self, frame: PhysicalFrame, offset: usize, value: u32) {
        self.frame_write(frame, offset, &value.to_le_bytes());
    }
}
