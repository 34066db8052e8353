//! Machine bring-up.
//!
//! Boot runs with virtual addressing off, so the initial page tables
//! and the free-frame list are written straight into physical memory.
//! Physical layout at the end of boot:
//!
//! ```text
//! frame 0 ┌─────────────────────────────┐
//!         │ kernel image + initial heap │ KERNEL_BOOT_PAGES frames
//!         ├─────────────────────────────┤
//!         │ free frames (linked list)   │
//!         ├─────────────────────────────┤
//!         │ boot kernel stack           │ KERNEL_STACK_PAGES frames
//!         ├─────────────────────────────┤
//!         │ boot region-0 page table    │ lower half; upper half banked
//!         ├─────────────────────────────┤
//!         │ region-1 page table         │ lower half; upper half banked
//!   top   └─────────────────────────────┘
//! ```
//!
//! The idle process gets a fresh table and a cold-started copy of the
//! boot kernel stack; the initial process inherits the boot region-0
//! table itself and is the one running when boot returns.

use crate::kernel::TtyState;
use crate::proc::{Pid, ProcState, Switch};
use crate::{Kernel, KernelError, LoadError};
use alloc::collections::{BTreeMap, VecDeque};
use alloc::string::String;
use alloc::vec::Vec;
use kernel_addresses::{PhysicalFrame, Region, VirtualAddress, VirtualPage};
use kernel_hal::{Hardware, ImageSource, PageTableEntry, Protection, TlbFlush};
use kernel_info::memory::{
    KERNEL_BOOT_PAGES, KERNEL_STACK_PAGES, PAGE_SIZE, PAGE_TABLE_LEN, PAGE_TABLE_SIZE,
    VMEM_1_BASE,
};
use kernel_info::tty::NUM_TERMINALS;

/// Fewest physical frames a bootable machine can have.
const MIN_FRAMES: usize = 64;

/// Boot failures. All of them leave the machine unusable.
#[derive(Debug, thiserror::Error)]
pub enum BootError {
    #[error("machine too small: {frames} frames of physical memory")]
    TooSmall { frames: usize },
    #[error("loading boot program '{name}' failed: {source}")]
    Load {
        name: String,
        #[source]
        source: LoadError,
    },
    #[error(transparent)]
    Kernel(#[from] KernelError),
}

impl<H: Hardware, S: ImageSource> Kernel<H, S> {
    /// Name of the program the idle process runs.
    pub const IDLE_PROGRAM: &'static str = "idle";

    /// Bring the machine up: initial page tables, free list, virtual
    /// addressing, the idle process, and the initial program. Returns
    /// with the initial process running.
    ///
    /// # Errors
    /// See [`BootError`].
    pub fn boot(
        hw: H,
        images: S,
        init_program: &str,
        init_args: &[&[u8]],
    ) -> Result<Self, BootError> {
        let frames = hw.pmem_frames();
        if frames < MIN_FRAMES {
            return Err(BootError::TooSmall { frames });
        }
        let r0_table = PhysicalFrame::new(frames - 2).base();
        let r1_table = PhysicalFrame::new(frames - 1).base();

        let mut k = Self {
            hw,
            images,
            vm_enabled: false,
            kernel_break: VirtualAddress::new(VMEM_1_BASE),
            num_free_frames: 0,
            free_frame_head: None,
            upper_half_head: None,
            lower_half_head: None,
            region0_table: r0_table,
            region1_table: r1_table,
            now: 0,
            next_pid: 0,
            procs: BTreeMap::new(),
            running: Pid::new(0),
            idle: Pid::new(0),
            ready: VecDeque::new(),
            delay: VecDeque::new(),
            ttys: (0..NUM_TERMINALS).map(|_| TtyState::new()).collect(),
            halted: false,
        };
        k.set_kernel_break(VirtualAddress::new(
            VMEM_1_BASE + KERNEL_BOOT_PAGES as u64 * PAGE_SIZE,
        ))?;

        // Both boot tables start empty.
        let zeros = [0u8; PAGE_SIZE as usize];
        k.hw.frame_write(r0_table.frame(), 0, &zeros);
        k.hw.frame_write(r1_table.frame(), 0, &zeros);

        // Region 1: the kernel image and heap, mapped one-to-one, plus
        // windows onto the two page tables at the top.
        for i in 0..KERNEL_BOOT_PAGES {
            k.write_table_entry(
                r1_table,
                VirtualPage::new(i),
                PageTableEntry::map(PhysicalFrame::new(i), Protection::RW, Protection::empty()),
            );
        }
        k.write_table_entry(
            r1_table,
            VirtualPage::new(PAGE_TABLE_LEN - 1),
            PageTableEntry::map(r1_table.frame(), Protection::RW, Protection::empty()),
        );
        k.write_table_entry(
            r1_table,
            VirtualPage::new(PAGE_TABLE_LEN - 2),
            PageTableEntry::map(r0_table.frame(), Protection::RW, Protection::empty()),
        );

        // Region 0: only the boot kernel stack, on the frames just below
        // the tables.
        let stack_first = frames - 2 - KERNEL_STACK_PAGES;
        for i in 0..KERNEL_STACK_PAGES {
            k.write_table_entry(
                r0_table,
                VirtualPage::new(PAGE_TABLE_LEN - KERNEL_STACK_PAGES + i),
                PageTableEntry::map(
                    PhysicalFrame::new(stack_first + i),
                    Protection::RW,
                    Protection::empty(),
                ),
            );
        }

        // Chain every unclaimed frame into the free list.
        for pfn in KERNEL_BOOT_PAGES..stack_first {
            let link = if pfn + 1 == stack_first {
                crate::mem::FREE_LINK_NONE
            } else {
                (pfn + 1) as u32
            };
            k.hw.frame_write_u32(PhysicalFrame::new(pfn), 0, link);
        }
        k.free_frame_head = Some(PhysicalFrame::new(KERNEL_BOOT_PAGES));
        k.num_free_frames = stack_first - KERNEL_BOOT_PAGES;

        k.hw.set_table_base(Region::User, r0_table);
        k.hw.set_table_base(Region::Kernel, r1_table);
        k.hw.enable_vm();
        k.vm_enabled = true;
        k.hw.tlb_flush(TlbFlush::All);

        // The boot tables only use the lower half of their frames.
        k.release_table(r0_table + PAGE_TABLE_SIZE)?;
        k.release_table(r1_table + PAGE_TABLE_SIZE)?;

        // Idle: fresh table, a private copy of the boot kernel stack,
        // and the idle program.
        let idle_table = k.allocate_table()?;
        let idle = k.spawn(idle_table);
        k.idle = idle;
        k.context_switch(Switch::Cold(idle))?;
        k.context_switch(Switch::InitSelf(idle))?;
        k.load_program(Self::IDLE_PROGRAM, &[]).map_err(|source| BootError::Load {
            name: String::from(Self::IDLE_PROGRAM),
            source,
        })?;

        // The initial process adopts the boot region-0 table; its kernel
        // stack is the one boot has been running on.
        let init = k.spawn(r0_table);
        k.context_switch(Switch::To(init))?;
        let args: Vec<Vec<u8>> = init_args.iter().map(|a| a.to_vec()).collect();
        k.load_program(init_program, &args).map_err(|source| BootError::Load {
            name: String::from(init_program),
            source,
        })?;

        // Idle is runnable but never queued; it is the fallback when the
        // ready queue is empty.
        if let Some(p) = k.procs.get_mut(&idle) {
            p.state = ProcState::Ready;
        }

        log::info!(
            "boot complete: {} free frames, '{init_program}' is process {init}",
            k.num_free_frames
        );
        Ok(k)
    }
}
