//! # Kernel Core
//!
//! The process, memory, and trap core of a single-CPU teaching kernel:
//!
//! - a physical frame allocator whose free list is threaded through the
//!   free frames themselves ([`mem`]),
//! - half-page page tables for the two virtual regions, packed two per
//!   frame ([`mem`]),
//! - process control blocks, the parent/child/sibling tree, round-robin
//!   and delay scheduling queues, and the context-switch protocol
//!   ([`proc`]),
//! - the trap dispatcher and the nine kernel calls ([`traps`],
//!   [`calls`]),
//! - the program-loader bridge with its two-phase failure boundary
//!   ([`loader`]).
//!
//! Everything hardware-shaped is reached through the [`kernel_hal`]
//! traits; [`Kernel::boot`] wires a machine, an image store, and the
//! initial program into a running system.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

mod boot;
mod calls;
pub mod debug;
mod error;
mod kernel;
mod loader;
mod mem;
mod proc;
mod traps;

pub use boot::BootError;
pub use error::KernelError;
pub use kernel::Kernel;
pub use loader::{LoadError, LoadFailure};
pub use proc::{BlockReason, ChildExit, Pid, ProcState};
