use kernel_addresses::VirtualAddress;

/// General-purpose registers visible to the kernel-call ABI.
pub const NUM_REGS: usize = 8;

/// A process's saved execution state.
///
/// Captured by the hardware on every trap and re-activated when the
/// context-switch protocol picks the process to resume. `regs[0]` doubles
/// as the kernel-call result register; `regs[1..=3]` carry call
/// arguments.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SavedContext {
    /// User program counter.
    pub pc: VirtualAddress,
    /// User stack pointer.
    pub sp: VirtualAddress,
    /// General-purpose registers.
    pub regs: [u64; NUM_REGS],
    /// Processor status word; zero runs the process in user mode.
    pub psr: u64,
}

impl SavedContext {
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            pc: VirtualAddress::zero(),
            sp: VirtualAddress::zero(),
            regs: [0; NUM_REGS],
            psr: 0,
        }
    }
}
