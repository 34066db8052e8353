//! # Machine and Memory Layout Constants
//!
//! Fixed parameters of the simulated machine and the kernel's virtual
//! memory layout. Everything else in the workspace derives its geometry
//! from the values in this crate.

#![cfg_attr(not(test), no_std)]

pub mod memory;
pub mod sched;
pub mod tty;

pub use memory::*;
pub use sched::QUANTUM_TICKS;
pub use tty::{NUM_TERMINALS, TERMINAL_MAX_LINE};
