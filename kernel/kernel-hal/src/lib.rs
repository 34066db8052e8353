//! # Hardware Abstraction Layer
//!
//! The narrow contracts between the kernel core and its external
//! collaborators: the MMU register interface, the trap model, the
//! per-process saved execution context, the kernel-call ABI, and the
//! executable-image loader. The kernel core depends only on the traits
//! and data formats in this crate; `kernel-sim` provides the software
//! implementation used for host runs and tests.

#![cfg_attr(not(test), no_std)]

mod context;
mod image;
mod machine;
mod pte;
mod syscall;
mod trap;

pub use context::{NUM_REGS, SavedContext};
pub use image::{ImageError, ImageSource, LoadInfo};
pub use machine::{Hardware, TlbFlush};
pub use pte::{PageTableEntry, Protection};
pub use syscall::{CallCode, ERROR_SENTINEL};
pub use trap::{IllegalReason, MathReason, MemoryFaultCode, TrapEvent};
