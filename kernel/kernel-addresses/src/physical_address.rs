use crate::PhysicalFrame;
use core::fmt;
use core::ops::Add;
use kernel_info::memory::{PAGE_SHIFT, PAGE_SIZE};

/// A byte address in physical memory.
///
/// Page tables are identified by their physical address; everything else
/// in the kernel prefers [`PhysicalFrame`] numbers. A table address is
/// either frame-aligned (lower-half slot) or offset by half a page
/// (upper-half slot).
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalAddress(u64);

impl PhysicalAddress {
    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// The frame this address falls into.
    #[inline]
    #[must_use]
    pub const fn frame(self) -> PhysicalFrame {
        PhysicalFrame::new((self.0 >> PAGE_SHIFT) as usize)
    }

    /// Byte offset within the containing frame.
    #[inline]
    #[must_use]
    pub const fn frame_offset(self) -> u64 {
        self.0 & (PAGE_SIZE - 1)
    }

    /// Whether this address sits exactly on a frame boundary.
    #[inline]
    #[must_use]
    pub const fn is_frame_aligned(self) -> bool {
        self.frame_offset() == 0
    }
}

impl fmt::Debug for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PA(0x{:06X})", self.0)
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:06X}", self.0)
    }
}

impl From<PhysicalFrame> for PhysicalAddress {
    #[inline]
    fn from(frame: PhysicalFrame) -> Self {
        frame.base()
    }
}

impl Add<u64> for PhysicalAddress {
    type Output = Self;
    #[inline]
    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0 + rhs)
    }
}
