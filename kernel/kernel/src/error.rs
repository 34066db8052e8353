/// Errors a kernel operation can surface to its caller.
///
/// Every variant maps to the single negative sentinel at the kernel-call
/// boundary; the distinctions exist for internal control flow and
/// logging.
#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum KernelError {
    /// No free physical frame or page-table slot.
    #[error("out of physical memory")]
    OutOfMemory,

    /// No kernel virtual page left above the break for a temporary
    /// mapping.
    #[error("kernel virtual space exhausted")]
    KernelSpaceExhausted,

    /// A caller-supplied value is out of range.
    #[error("invalid argument")]
    InvalidArgument,

    /// A caller-supplied pointer does not reference readable/writable
    /// user memory of the required extent.
    #[error("inaccessible user memory")]
    BadAddress,

    /// `Wait` with no living children and an empty mailbox.
    #[error("no children to wait for")]
    NoChildren,
}
