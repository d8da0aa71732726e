//! Error types for buffer pool and page file operations.

use crate::common::config::PageId;

/// Result type alias using [`BufferPoolError`].
pub type Result<T> = std::result::Result<T, BufferPoolError>;

/// Error types surfaced by the page file and buffer pool manager.
///
/// Each variant corresponds to one of the error codes named by the buffer
/// pool's external interface; I/O-originated variants additionally carry the
/// underlying [`std::io::Error`] so callers keep the OS-level diagnostic.
#[derive(Debug, thiserror::Error)]
pub enum BufferPoolError {
    /// The named page file could not be opened, created, or closed.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// A pool operation was attempted before `init` succeeded, or after
    /// `shutdown` released the pool's state.
    #[error("file handle not initialized")]
    FileHandleNotInit,

    /// `read_block` addressed a page outside `[0, total_pages)`, or hit EOF
    /// mid-read.
    #[error("attempted to read non-existing page {0}")]
    ReadNonExistingPage(PageId),

    /// A read returned fewer bytes than `PAGE_SIZE` for a reason other than
    /// addressing past the end of the file.
    #[error("read failed for page {0}")]
    ReadFailed(PageId),

    /// A write returned fewer bytes than `PAGE_SIZE`, or eviction/replacement
    /// could not find an unpinned victim frame, or shutdown was attempted
    /// with pinned frames outstanding.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// `write_block` addressed a page outside `[0, total_pages)`.
    #[error("page {0} out of range")]
    PageOutOfRange(PageId),

    /// `append_empty_block` could not seek to the end of the file.
    #[error("seek failed")]
    SeekFailed,

    /// `append_empty_block` could not allocate the zero page to write.
    #[error("allocation failed")]
    AllocationFailed,

    /// A directory lookup for `page_id` found no resident frame.
    #[error("page {0} not found in buffer pool")]
    KeyNotFound(PageId),

    /// The pool was constructed with an invalid configuration (e.g. zero
    /// frames, or an unrecognized replacement strategy).
    #[error("invalid buffer pool configuration: {0}")]
    ConfigError(String),

    /// An I/O failure not covered by a more specific variant above.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
