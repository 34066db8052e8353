//! # Simulated Machine
//!
//! A software implementation of the [`kernel_hal`] contracts: a frame
//! arena standing in for physical memory, MMU registers that just record
//! what the kernel programmed, line-oriented terminals, and an in-memory
//! executable store. Host runs and the kernel's integration tests boot
//! the real kernel on top of this machine.

mod images;
mod machine;

pub use images::{SimImage, SimImages};
pub use machine::SimMachine;
