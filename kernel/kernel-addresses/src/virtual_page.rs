use crate::{Region, VirtualAddress};
use core::fmt;
use kernel_info::memory::PAGE_SHIFT;

/// A virtual page number (vpn) relative to the base of one region.
///
/// Indexes directly into that region's page table, so it is always in
/// `0..PAGE_TABLE_LEN`.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtualPage(usize);

impl VirtualPage {
    #[inline]
    #[must_use]
    pub const fn new(vpn: usize) -> Self {
        Self(vpn)
    }

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }

    /// Virtual address of the first byte of this page within `region`.
    #[inline]
    #[must_use]
    pub const fn base_in(self, region: Region) -> VirtualAddress {
        VirtualAddress::new(region.base().as_u64() + ((self.0 as u64) << PAGE_SHIFT))
    }

    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Debug for VirtualPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vpn {}", self.0)
    }
}

impl fmt::Display for VirtualPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
