use alloc::collections::VecDeque;
use core::fmt;
use kernel_addresses::{PhysicalAddress, VirtualAddress};
use kernel_hal::SavedContext;
use kernel_info::memory::{MEM_INVALID_PAGES, USER_STACK_LIMIT};

/// A process identifier. Never reused for the lifetime of the machine.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Pid(u32);

impl Pid {
    #[inline]
    #[must_use]
    pub const fn new(pid: u32) -> Self {
        Self(pid)
    }

    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0 as u64
    }
}

impl fmt::Debug for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pid {}", self.0)
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scheduling state of a process.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ProcState {
    /// Owns the CPU.
    Running,
    /// Runnable; on the ready queue (the idle process is runnable but
    /// never queued).
    Ready,
    /// Off the ready queue until the named event occurs.
    Blocked(BlockReason),
    /// Exited or killed; resources are reclaimed at the next switch
    /// away from it.
    Terminated,
}

/// What a blocked process is waiting for.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BlockReason {
    /// A child to exit.
    Child,
    /// Its delay timer to expire.
    Delay,
    /// A terminal input line.
    TtyRead,
    /// Its turn on a terminal transmitter.
    TtyWrite,
}

/// One collected exit, queued in the parent's mailbox until a `Wait`
/// consumes it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ChildExit {
    pub pid: Pid,
    pub status: i64,
}

/// A kernel call that blocked; completed (result registers written) when
/// the process is woken.
pub(crate) enum PendingCall {
    Wait {
        status_addr: VirtualAddress,
    },
    TtyRead {
        id: usize,
        buf: VirtualAddress,
        len: usize,
    },
    TtyWrite {
        id: usize,
        buf: VirtualAddress,
        len: usize,
    },
}

/// A process control block.
pub(crate) struct Pcb {
    pub(crate) pid: Pid,
    pub(crate) state: ProcState,
    pub(crate) ctx: SavedContext,
    /// Physical address of this process's region-0 page table.
    pub(crate) page_table: PhysicalAddress,
    /// Tick at which to preempt (while running) or to wake (while
    /// delayed).
    pub(crate) wake_at: u64,

    pub(crate) parent: Option<Pid>,
    /// Head of the child list; siblings chain through `sibling`.
    pub(crate) child: Option<Pid>,
    pub(crate) sibling: Option<Pid>,
    /// Living children.
    pub(crate) nchild: usize,
    /// Exits collected from children, FIFO.
    pub(crate) exited: VecDeque<ChildExit>,

    /// First page above the heap (the break page).
    pub(crate) brk_page: usize,
    /// Lowest address the user stack has grown to.
    pub(crate) stack_base: VirtualAddress,

    pub(crate) pending: Option<PendingCall>,
}

impl Pcb {
    pub(crate) fn new(pid: Pid, parent: Option<Pid>, page_table: PhysicalAddress) -> Self {
        Self {
            pid,
            state: ProcState::Ready,
            ctx: SavedContext::zeroed(),
            page_table,
            wake_at: 0,
            parent,
            child: None,
            sibling: None,
            nchild: 0,
            exited: VecDeque::new(),
            brk_page: MEM_INVALID_PAGES,
            stack_base: VirtualAddress::new(USER_STACK_LIMIT),
            pending: None,
        }
    }
}
