use crate::VirtualAddress;
use core::fmt;
use kernel_info::memory::{VMEM_1_BASE, VMEM_REGION_SIZE};

/// One of the two halves of the virtual address space.
///
/// Region 0 is the per-process user half, swapped on every context
/// switch; region 1 is the shared kernel half, fixed for the lifetime of
/// the machine.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub enum Region {
    /// User space, `[VMEM_0_BASE, VMEM_0_LIMIT)`.
    User,
    /// Kernel space, `[VMEM_1_BASE, VMEM_1_LIMIT)`.
    Kernel,
}

impl Region {
    /// Lowest virtual address belonging to this region.
    #[inline]
    #[must_use]
    pub const fn base(self) -> VirtualAddress {
        match self {
            Self::User => VirtualAddress::new(0),
            Self::Kernel => VirtualAddress::new(VMEM_1_BASE),
        }
    }

    /// Exclusive upper bound of this region.
    #[inline]
    #[must_use]
    pub const fn limit(self) -> VirtualAddress {
        VirtualAddress::new(self.base().as_u64() + VMEM_REGION_SIZE)
    }

    /// The region a virtual address falls into.
    #[inline]
    #[must_use]
    pub const fn containing(va: VirtualAddress) -> Self {
        if va.as_u64() < VMEM_1_BASE {
            Self::User
        } else {
            Self::Kernel
        }
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "region 0"),
            Self::Kernel => write!(f, "region 1"),
        }
    }
}
