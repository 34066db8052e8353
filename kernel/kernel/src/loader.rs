//! The program loader.
//!
//! Loading replaces the running process's user address space with a
//! fresh image: text pages (read-in writable, then flipped to
//! read/execute), data+bss pages, a stack sized to hold the argument
//! block, and the argument block itself laid out the way startup code
//! expects to find it.
//!
//! Failure is two-phase. Everything up to and including the fit checks
//! leaves the caller untouched and is [`LoadError::Recoverable`]; once
//! the old pages are freed there is no program to return to, and any
//! later failure is [`LoadError::Fatal`].

use crate::{Kernel, KernelError};
use alloc::vec::Vec;
use kernel_addresses::{Region, VirtualAddress, VirtualPage};
use kernel_hal::{Hardware, ImageError, ImageSource, Protection, TlbFlush};
use kernel_info::memory::{
    KERNEL_STACK_PAGES, MEM_INVALID_PAGES, PAGE_SIZE, PAGE_TABLE_LEN, USER_STACK_LIMIT,
};

/// Why a load failed, and in what state it left the caller.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The caller's old address space is intact; the call can simply
    /// return an error.
    #[error("program not loadable: {0}")]
    Recoverable(#[source] LoadFailure),
    /// The old address space is already gone; the caller cannot resume.
    #[error("load failed past the point of no return: {0}")]
    Fatal(#[source] LoadFailure),
}

/// The underlying cause of a failed load.
#[derive(Debug, thiserror::Error)]
pub enum LoadFailure {
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error("image does not fit in the virtual address space")]
    TooLarge,
    #[error("not enough free memory")]
    OutOfMemory,
}

/// Argument-block words below the argument strings: argc, the argv
/// pointers, a NULL argv terminator, a NULL environment, and a zero pad
/// word for alignment.
const ARG_BLOCK_EXTRA_WORDS: u64 = 4;

impl<H: Hardware, S: ImageSource> Kernel<H, S> {
    /// Load `name` into the running process's region 0 and point its
    /// saved context at the fresh program.
    ///
    /// # Errors
    /// See [`LoadError`] for the recoverable/fatal split.
    pub(crate) fn load_program(&mut self, name: &str, args: &[Vec<u8>]) -> Result<(), LoadError> {
        let mut handle = self
            .images
            .open(name)
            .map_err(|e| LoadError::Recoverable(e.into()))?;
        let info = self.images.info(&handle);
        if info.text_size % PAGE_SIZE != 0 {
            return Err(LoadError::Recoverable(ImageError::Format.into()));
        }
        let text_npg = (info.text_size / PAGE_SIZE) as usize;
        let data_bss_npg = (info.data_size + info.bss_size).div_ceil(PAGE_SIZE) as usize;

        // Argument block geometry: strings pack right below the stack
        // limit, the pointer words sit 16-byte aligned below them, and
        // the stack pointer starts at the pointer words.
        let strings_size: u64 = args.iter().map(|a| a.len() as u64 + 1).sum();
        let strings_base = USER_STACK_LIMIT
            .checked_sub(strings_size)
            .ok_or(LoadError::Recoverable(LoadFailure::TooLarge))?;
        let sp = (strings_base & !0xF)
            .checked_sub((args.len() as u64 + ARG_BLOCK_EXTRA_WORDS) * 8)
            .ok_or(LoadError::Recoverable(LoadFailure::TooLarge))?;
        let stack_npg =
            ((USER_STACK_LIMIT - (sp & !(PAGE_SIZE - 1))) / PAGE_SIZE) as usize;

        if MEM_INVALID_PAGES + text_npg + data_bss_npg + 1 + stack_npg + KERNEL_STACK_PAGES
            > PAGE_TABLE_LEN
        {
            return Err(LoadError::Recoverable(LoadFailure::TooLarge));
        }
        if text_npg + data_bss_npg + stack_npg > self.num_free_frames {
            return Err(LoadError::Recoverable(LoadFailure::OutOfMemory));
        }

        // Point of no return: free every old user page. The kernel
        // stack at the top of region 0 stays.
        log::debug!(
            "loading '{name}' for process {}: {text_npg} text, {data_bss_npg} data/bss, {stack_npg} stack pages",
            self.running
        );
        for pn in MEM_INVALID_PAGES..PAGE_TABLE_LEN - KERNEL_STACK_PAGES {
            if self.read_entry(Region::User, VirtualPage::new(pn)).valid() {
                self.enqueue_free(Region::User, VirtualPage::new(pn));
            }
        }

        // Text is mapped writable for the copy-in and flipped to
        // read/execute below.
        let mut pn = MEM_INVALID_PAGES;
        for _ in 0..text_npg {
            self.dequeue_free(Region::User, VirtualPage::new(pn), Protection::RW, Protection::RX)
                .map_err(|_| LoadError::Fatal(LoadFailure::OutOfMemory))?;
            pn += 1;
        }
        for _ in 0..data_bss_npg {
            self.dequeue_free(Region::User, VirtualPage::new(pn), Protection::RW, Protection::RW)
                .map_err(|_| LoadError::Fatal(LoadFailure::OutOfMemory))?;
            pn += 1;
        }
        let brk_page = pn;
        let stack_first = PAGE_TABLE_LEN - KERNEL_STACK_PAGES - stack_npg;
        for i in 0..stack_npg {
            self.dequeue_free(
                Region::User,
                VirtualPage::new(stack_first + i),
                Protection::RW,
                Protection::RW,
            )
            .map_err(|_| LoadError::Fatal(LoadFailure::OutOfMemory))?;
        }
        self.hw.tlb_flush(TlbFlush::Region(Region::User));

        // Stream text and data in, then zero the bss tail.
        let base = VirtualAddress::new(MEM_INVALID_PAGES as u64 * PAGE_SIZE);
        let total = info.text_size + info.data_size;
        let mut chunk = [0u8; PAGE_SIZE as usize];
        let mut offset = 0u64;
        while offset < total {
            let n = (total - offset).min(PAGE_SIZE) as usize;
            self.images
                .read(&mut handle, &mut chunk[..n])
                .map_err(|e| LoadError::Fatal(e.into()))?;
            self.write_user(base + offset, &chunk[..n])
                .map_err(|_| LoadError::Fatal(LoadFailure::OutOfMemory))?;
            offset += n as u64;
        }
        let zeros = [0u8; PAGE_SIZE as usize];
        let mut cleared = 0u64;
        while cleared < info.bss_size {
            let n = (info.bss_size - cleared).min(PAGE_SIZE) as usize;
            self.write_user(base + total + cleared, &zeros[..n])
                .map_err(|_| LoadError::Fatal(LoadFailure::OutOfMemory))?;
            cleared += n as u64;
        }

        // Text becomes read/execute now that its bytes are in place.
        for tp in MEM_INVALID_PAGES..MEM_INVALID_PAGES + text_npg {
            let pte = self.read_entry(Region::User, VirtualPage::new(tp));
            self.set_entry(Region::User, VirtualPage::new(tp), pte.with_kprot(Protection::RX));
        }

        // Fresh context and accounting.
        if let Some(p) = self.procs.get_mut(&self.running) {
            p.ctx = kernel_hal::SavedContext::zeroed();
            p.ctx.pc = info.entry;
            p.ctx.sp = VirtualAddress::new(sp);
            p.brk_page = brk_page;
            p.stack_base = VirtualAddress::new(sp);
        }

        self.build_arg_block(args, strings_base, sp)
            .map_err(|_| LoadError::Fatal(LoadFailure::OutOfMemory))?;
        Ok(())
    }

    /// Lay out `{argc, argv pointers, NULL, NULL, 0}` at `sp` and the
    /// NUL-terminated argument strings at `strings_base`.
    fn build_arg_block(
        &mut self,
        args: &[Vec<u8>],
        strings_base: u64,
        sp: u64,
    ) -> Result<(), KernelError> {
        let mut addrs = Vec::with_capacity(args.len());
        let mut cursor = VirtualAddress::new(strings_base);
        for arg in args {
            self.write_user(cursor, arg)?;
            self.write_user(cursor + arg.len() as u64, &[0])?;
            addrs.push(cursor);
            cursor = cursor + arg.len() as u64 + 1;
        }
        let mut word = VirtualAddress::new(sp);
        self.write_user_u64(word, args.len() as u64)?;
        word = word + 8;
        for addr in addrs {
            self.write_user_u64(word, addr.as_u64())?;
            word = word + 8;
        }
        for _ in 0..3 {
            self.write_user_u64(word, 0)?;
            word = word + 8;
        }
        Ok(())
    }
}
