use crate::PhysicalAddress;
use core::fmt;
use kernel_info::memory::PAGE_SHIFT;

/// A physical frame number (pfn).
///
/// Frames are the unit of the free list: a frame is either mapped by
/// exactly one valid PTE somewhere, or threaded on the free list with its
/// successor's number stored in its own first bytes.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalFrame(usize);

impl PhysicalFrame {
    #[inline]
    #[must_use]
    pub const fn new(pfn: usize) -> Self {
        Self(pfn)
    }

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }

    /// Physical address of the first byte of this frame.
    #[inline]
    #[must_use]
    pub const fn base(self) -> PhysicalAddress {
        PhysicalAddress::new((self.0 as u64) << PAGE_SHIFT)
    }
}

impl fmt::Debug for PhysicalFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pfn {}", self.0)
    }
}

impl fmt::Display for PhysicalFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
