use bitfield_struct::bitfield;
use kernel_addresses::PhysicalFrame;

bitflags::bitflags! {
    /// Page protection mask, stored twice per PTE: once for kernel-mode
    /// accesses and once for user-mode accesses.
    #[derive(Copy, Clone, Eq, PartialEq, Debug)]
    pub struct Protection: u8 {
        const READ  = 1 << 0;
        const WRITE = 1 << 1;
        const EXEC  = 1 << 2;
    }
}

impl Protection {
    /// Read/write, the workaday mapping for data pages.
    pub const RW: Self = Self::READ.union(Self::WRITE);

    /// Read/execute, for text pages once their contents are in place.
    pub const RX: Self = Self::READ.union(Self::EXEC);
}

/// One page-table entry, packed the way it sits in table memory.
///
/// An all-zero entry is invalid, so zero-filling a table invalidates
/// every mapping in it.
#[bitfield(u32)]
#[derive(Eq, PartialEq)]
pub struct PageTableEntry {
    /// Translation is present.
    pub valid: bool,

    /// Kernel-mode protection bits ([`Protection`] raw value).
    #[bits(3)]
    kprot_bits: u8,

    /// User-mode protection bits ([`Protection`] raw value).
    #[bits(3)]
    uprot_bits: u8,

    #[bits(5)]
    __: u8,

    /// Physical frame number backing this page.
    #[bits(20)]
    pfn: u32,
}

impl PageTableEntry {
    /// A valid entry mapping `frame` with the given protections.
    #[must_use]
    pub fn map(frame: PhysicalFrame, kprot: Protection, uprot: Protection) -> Self {
        Self::new()
            .with_valid(true)
            .with_kprot_bits(kprot.bits())
            .with_uprot_bits(uprot.bits())
            .with_pfn(frame.index() as u32)
    }

    #[must_use]
    pub const fn invalid() -> Self {
        Self::new()
    }

    #[must_use]
    pub fn kprot(self) -> Protection {
        Protection::from_bits_truncate(self.kprot_bits())
    }

    #[must_use]
    pub fn uprot(self) -> Protection {
        Protection::from_bits_truncate(self.uprot_bits())
    }

    #[must_use]
    pub fn frame(self) -> PhysicalFrame {
        PhysicalFrame::new(self.pfn() as usize)
    }

    /// Same entry with kernel protections replaced.
    #[must_use]
    pub fn with_kprot(self, kprot: Protection) -> Self {
        self.with_kprot_bits(kprot.bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_invalid() {
        assert!(!PageTableEntry::invalid().valid());
        assert_eq!(PageTableEntry::invalid().into_bits(), 0);
    }

    #[test]
    fn roundtrips_through_bits() {
        let pte = PageTableEntry::map(PhysicalFrame::new(0x3_FFFF), Protection::RW, Protection::RX);
        let back = PageTableEntry::from_bits(pte.into_bits());
        assert!(back.valid());
        assert_eq!(back.frame().index(), 0x3_FFFF);
        assert_eq!(back.kprot(), Protection::RW);
        assert_eq!(back.uprot(), Protection::RX);
    }

    #[test]
    fn kprot_swap_preserves_mapping() {
        let pte = PageTableEntry::map(PhysicalFrame::new(7), Protection::RW, Protection::RX);
        let rx = pte.with_kprot(Protection::RX);
        assert_eq!(rx.frame().index(), 7);
        assert_eq!(rx.kprot(), Protection::RX);
        assert_eq!(rx.uprot(), Protection::RX);
    }
}
