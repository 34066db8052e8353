//! # Address and Page Newtypes
//!
//! Thin `u64`/`usize` wrappers that keep the four kinds of memory
//! coordinates from mixing:
//!
//! - [`VirtualAddress`] — a byte address in region 0 or region 1.
//! - [`PhysicalAddress`] — a byte address in physical memory.
//! - [`VirtualPage`] — a page number *within one region* (vpn).
//! - [`PhysicalFrame`] — a physical frame number (pfn).
//!
//! The machine has a single 4 KiB page size, so conversions are plain
//! shifts; what these types buy is intent. A `VirtualPage` is only
//! meaningful together with a [`Region`].

#![cfg_attr(not(test), no_std)]

mod physical_address;
mod physical_frame;
mod region;
mod virtual_address;
mod virtual_page;

pub use physical_address::PhysicalAddress;
pub use physical_frame::PhysicalFrame;
pub use region::Region;
pub use virtual_address::VirtualAddress;
pub use virtual_page::VirtualPage;
