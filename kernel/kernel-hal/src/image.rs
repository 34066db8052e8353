use kernel_addresses::VirtualAddress;

/// What the executable loader reports about an opened image.
#[derive(Copy, Clone, Debug)]
pub struct LoadInfo {
    /// Bytes of program text. Always a whole number of pages.
    pub text_size: u64,
    /// Bytes of initialized data.
    pub data_size: u64,
    /// Bytes of zero-initialized data following the initialized data.
    pub bss_size: u64,
    /// Entry point within the loaded image.
    pub entry: VirtualAddress,
}

/// Executable loader failures.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("no such program")]
    NotFound,
    #[error("not a loadable image")]
    Format,
    #[error("image read failed")]
    Read,
}

/// The external executable loader.
///
/// The kernel core does all page allocation, copying, and permission
/// setting itself; this trait only opens a named image, describes its
/// segment sizes, and streams its text+data bytes.
pub trait ImageSource {
    /// Opaque handle to an opened image.
    type Handle;

    /// Open the named program.
    ///
    /// # Errors
    /// [`ImageError::NotFound`] when the name does not resolve,
    /// [`ImageError::Format`] when it is not a loadable image.
    fn open(&mut self, name: &str) -> Result<Self::Handle, ImageError>;

    /// Segment sizes and entry point of an opened image.
    fn info(&self, handle: &Self::Handle) -> LoadInfo;

    /// Read the next `buf.len()` bytes of text+data into `buf`.
    ///
    /// # Errors
    /// [`ImageError::Read`] when the image is shorter than its own
    /// headers claim.
    fn read(&mut self, handle: &mut Self::Handle, buf: &mut [u8]) -> Result<(), ImageError>;
}
