/// The nine kernel-call opcodes of the ABI.
///
/// A call traps with this code and up to three word arguments in
/// `regs[1..=3]`; the single word result (or [`ERROR_SENTINEL`]) comes
/// back in `regs[0]`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum CallCode {
    Fork = 1,
    Exec = 2,
    Exit = 3,
    Wait = 4,
    GetPid = 5,
    Brk = 6,
    Delay = 7,
    TtyRead = 8,
    TtyWrite = 9,
}

impl CallCode {
    /// Decode a trapped opcode; `None` for codes outside the ABI.
    #[must_use]
    pub const fn from_u32(code: u32) -> Option<Self> {
        Some(match code {
            1 => Self::Fork,
            2 => Self::Exec,
            3 => Self::Exit,
            4 => Self::Wait,
            5 => Self::GetPid,
            6 => Self::Brk,
            7 => Self::Delay,
            8 => Self::TtyRead,
            9 => Self::TtyWrite,
            _ => return None,
        })
    }
}

/// The negative word every failing kernel call returns.
pub const ERROR_SENTINEL: i64 = -1;
