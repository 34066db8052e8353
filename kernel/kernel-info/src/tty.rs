//! # Terminal Parameters

/// Line-oriented terminals attached to the machine.
pub const NUM_TERMINALS: usize = 4;

/// Longest line the terminal hardware will transfer in one operation, in
/// either direction.
pub const TERMINAL_MAX_LINE: usize = 1024;

const _: () = assert!(TERMINAL_MAX_LINE as u64 <= super::memory::PAGE_SIZE);
