//! Introspection helpers for diagnostics and test harnesses.

use crate::proc::Pid;
use crate::{Kernel, KernelError};
use kernel_addresses::{Region, VirtualAddress, VirtualPage};
use kernel_hal::Hardware;
use kernel_info::memory::PAGE_TABLE_LEN;

impl<H: Hardware, S> Kernel<H, S> {
    /// Log every valid mapping of both active page tables at debug
    /// level.
    pub fn log_page_tables(&self) {
        for region in [Region::User, Region::Kernel] {
            log::debug!("{region:?} table at {}:", self.table_addr(region));
            for i in 0..PAGE_TABLE_LEN {
                let pte = self.read_entry(region, VirtualPage::new(i));
                if pte.valid() {
                    log::debug!(
                        "  vpn {i:3} -> {} kprot {:?} uprot {:?}",
                        pte.frame(),
                        pte.kprot(),
                        pte.uprot()
                    );
                }
            }
        }
    }

    /// Read bytes out of a process's address space, ignoring
    /// protections.
    ///
    /// # Errors
    /// [`KernelError::BadAddress`] if a page is unmapped,
    /// [`KernelError::InvalidArgument`] if the process does not exist.
    pub fn peek_user(&self, pid: Pid, va: VirtualAddress, buf: &mut [u8]) -> Result<(), KernelError> {
        let table = self
            .procs
            .get(&pid)
            .map(|p| p.page_table)
            .ok_or(KernelError::InvalidArgument)?;
        self.read_user_in(table, va, buf)
    }

    /// Write bytes into a process's address space, ignoring protections.
    ///
    /// # Errors
    /// Same as [`Self::peek_user`].
    pub fn poke_user(&mut self, pid: Pid, va: VirtualAddress, buf: &[u8]) -> Result<(), KernelError> {
        let table = self
            .procs
            .get(&pid)
            .map(|p| p.page_table)
            .ok_or(KernelError::InvalidArgument)?;
        self.write_user_in(table, va, buf)
    }
}
