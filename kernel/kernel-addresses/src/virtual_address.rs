use crate::{Region, VirtualPage};
use core::fmt;
use core::ops::{Add, Sub};
use kernel_info::memory::{PAGE_SHIFT, PAGE_SIZE};

/// A byte address in the virtual address space.
///
/// Carries no region information by itself; use [`Region::containing`]
/// or [`VirtualAddress::split`] when the region matters.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtualAddress(u64);

impl VirtualAddress {
    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Byte offset within the containing page.
    #[inline]
    #[must_use]
    pub const fn page_offset(self) -> u64 {
        self.0 & (PAGE_SIZE - 1)
    }

    /// Round down to the containing page boundary.
    #[inline]
    #[must_use]
    pub const fn page_down(self) -> Self {
        Self(self.0 & !(PAGE_SIZE - 1))
    }

    /// Round up to the next page boundary (identity if already aligned).
    #[inline]
    #[must_use]
    pub const fn page_up(self) -> Self {
        Self((self.0 + PAGE_SIZE - 1) & !(PAGE_SIZE - 1))
    }

    /// The region this address falls into and its page number within
    /// that region.
    #[inline]
    #[must_use]
    pub const fn split(self) -> (Region, VirtualPage) {
        let region = Region::containing(self);
        let rel = self.0 - region.base().as_u64();
        (region, VirtualPage::new((rel >> PAGE_SHIFT) as usize))
    }

    /// Page number within `region`. The address must belong to it.
    #[inline]
    #[must_use]
    pub const fn page_in(self, region: Region) -> VirtualPage {
        VirtualPage::new(((self.0 - region.base().as_u64()) >> PAGE_SHIFT) as usize)
    }
}

impl fmt::Debug for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VA(0x{:06X})", self.0)
    }
}

impl fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:06X}", self.0)
    }
}

impl From<u64> for VirtualAddress {
    #[inline]
    fn from(v: u64) -> Self {
        Self::new(v)
    }
}

impl Add<u64> for VirtualAddress {
    type Output = Self;
    #[inline]
    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl Sub<u64> for VirtualAddress {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: u64) -> Self::Output {
        Self(self.0 - rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_rounding() {
        let va = VirtualAddress::new(0x1234);
        assert_eq!(va.page_down().as_u64(), 0x1000);
        assert_eq!(va.page_up().as_u64(), 0x2000);
        assert_eq!(va.page_offset(), 0x234);
        assert_eq!(va.page_up().page_up(), va.page_up());
    }

    #[test]
    fn split_picks_the_right_region() {
        use kernel_info::memory::VMEM_1_BASE;
        let (r, p) = VirtualAddress::new(0x3000).split();
        assert_eq!(r, Region::User);
        assert_eq!(p.index(), 3);
        let (r, p) = VirtualAddress::new(VMEM_1_BASE + 0x1000).split();
        assert_eq!(r, Region::Kernel);
        assert_eq!(p.index(), 1);
    }
}
