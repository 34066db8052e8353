use kernel_addresses::VirtualAddress;

/// One hardware trap, delivered to the kernel's trap dispatcher.
///
/// The hardware saves the running process's [`SavedContext`](crate::SavedContext)
/// before delivery, so handlers see user state through the PCB rather
/// than through the event itself.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TrapEvent {
    /// The interval timer ticked.
    Clock,
    /// A user process executed the kernel-call trap instruction. The
    /// opcode rides in the event; arguments sit in the caller's
    /// `regs[1..=3]` and the result is delivered through `regs[0]`.
    KernelCall { code: u32 },
    /// Illegal instruction; always fatal to the faulting process.
    Illegal(IllegalReason),
    /// Memory reference the MMU could not satisfy.
    Memory {
        addr: VirtualAddress,
        code: MemoryFaultCode,
    },
    /// Arithmetic fault; always fatal to the faulting process.
    Math(MathReason),
    /// Terminal `id` has a completed input line ready to pull.
    TtyReceive { id: usize },
    /// The transmit previously started on terminal `id` finished.
    TtyTransmit { id: usize },
}

/// Why the MMU rejected a reference.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MemoryFaultCode {
    /// No valid translation for the page.
    Unmapped,
    /// Valid translation, but the access violated its protections.
    Protection,
}

/// Illegal-instruction fault reasons, as reported by the hardware.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IllegalReason {
    Opcode,
    Operand,
    AddressingMode,
    PrivilegedOpcode,
    PrivilegedRegister,
}

impl IllegalReason {
    #[must_use]
    pub const fn explain(self) -> &'static str {
        match self {
            Self::Opcode => "illegal opcode",
            Self::Operand => "illegal operand",
            Self::AddressingMode => "illegal addressing mode",
            Self::PrivilegedOpcode => "privileged opcode in user mode",
            Self::PrivilegedRegister => "privileged register in user mode",
        }
    }
}

/// Arithmetic fault reasons, as reported by the hardware.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MathReason {
    IntegerDivideByZero,
    IntegerOverflow,
    FloatDivideByZero,
    FloatOverflow,
    FloatUnderflow,
    FloatInvalid,
}

impl MathReason {
    #[must_use]
    pub const fn explain(self) -> &'static str {
        match self {
            Self::IntegerDivideByZero => "integer divide by zero",
            Self::IntegerOverflow => "integer overflow",
            Self::FloatDivideByZero => "floating divide by zero",
            Self::FloatOverflow => "floating overflow",
            Self::FloatUnderflow => "floating underflow",
            Self::FloatInvalid => "invalid floating operation",
        }
    }
}
