//! # Memory Layout
//!
//! The virtual address space is split into two fixed regions:
//!
//! ```text
//! 0x00_0000 ┌──────────────────────────┐
//!           │ region 0 (user, swapped) │
//! 0x20_0000 ├──────────────────────────┤ VMEM_0_LIMIT / VMEM_1_BASE
//!           │ region 1 (kernel, fixed) │
//! 0x40_0000 └──────────────────────────┘ VMEM_1_LIMIT
//! ```
//!
//! Within region 0, a loaded process looks like:
//!
//! ```text
//! [invalid guard pages][text rx][data+bss rw][heap →]  gap  [← stack][kernel stack]
//! ```
//!
//! The kernel stack occupies the top [`KERNEL_STACK_PAGES`] pages of
//! region 0 and is invisible to user protections.

/// Bytes per page.
pub const PAGE_SIZE: u64 = 4096;

/// log2 of [`PAGE_SIZE`].
pub const PAGE_SHIFT: u64 = 12;

/// Entries in one region's page table.
pub const PAGE_TABLE_LEN: usize = 512;

/// Bytes one page table occupies. A PTE packs into 4 bytes, so a table
/// fills exactly half a page; two tables share one physical frame.
pub const PAGE_TABLE_SIZE: u64 = PAGE_TABLE_LEN as u64 * 4;

/// Bytes covered by one region.
pub const VMEM_REGION_SIZE: u64 = PAGE_TABLE_LEN as u64 * PAGE_SIZE;

/// Base of region 0 (user space).
pub const VMEM_0_BASE: u64 = 0;

/// Exclusive limit of region 0.
pub const VMEM_0_LIMIT: u64 = VMEM_0_BASE + VMEM_REGION_SIZE;

/// Base of region 1 (kernel space).
pub const VMEM_1_BASE: u64 = VMEM_0_LIMIT;

/// Exclusive limit of region 1 and of the whole virtual address space.
pub const VMEM_1_LIMIT: u64 = VMEM_1_BASE + VMEM_REGION_SIZE;

/// Guard pages at the bottom of region 0 that are never mapped; a null
/// dereference lands here and faults.
pub const MEM_INVALID_PAGES: usize = 4;

/// Pages of kernel text, data, and initial heap at the bottom of
/// physical memory, mapped one-to-one at the bottom of region 1. The
/// kernel break starts just above them.
pub const KERNEL_BOOT_PAGES: usize = 8;

/// Pages of per-process kernel stack at the top of region 0.
pub const KERNEL_STACK_PAGES: usize = 4;

/// Lowest address of the kernel stack; also the exclusive upper bound of
/// the user stack.
pub const KERNEL_STACK_BASE: u64 = VMEM_0_LIMIT - KERNEL_STACK_PAGES as u64 * PAGE_SIZE;

/// The user stack grows downward from here.
pub const USER_STACK_LIMIT: u64 = KERNEL_STACK_BASE;

const _: () = {
    assert!(PAGE_SIZE == 1 << PAGE_SHIFT);
    assert!(PAGE_TABLE_SIZE * 2 == PAGE_SIZE, "two page tables must share one frame");
    assert!(MEM_INVALID_PAGES + KERNEL_STACK_PAGES < PAGE_TABLE_LEN);
    assert!(VMEM_1_BASE > VMEM_0_BASE);
};
