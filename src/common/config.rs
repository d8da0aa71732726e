//! Crate-wide constants and the scalar types shared between the page file,
//! frame table, and buffer pool.

/// Size in bytes of every page, in memory and on disk.
pub const PAGE_SIZE: usize = 4096;

/// Sentinel returned by [`crate::buffer::BufferPoolManager::frame_contents`]
/// for frames that do not currently hold a page.
pub const NO_PAGE: i64 = -1;

/// Lower bound on the directory's reserved capacity, independent of pool
/// size (the directory is sized to `max(DIRECTORY_MIN_CAPACITY, num_pages)`).
pub const DIRECTORY_MIN_CAPACITY: usize = 256;

/// Integer addressing a page in the page file. Signed (matching the
/// original storage manager's `int pageNum`) so that a negative id can be
/// rejected by `pin` as `IM_KEY_NOT_FOUND` rather than being inexpressible.
/// Every `PageId` actually resident in a frame or stored in the page file is
/// `>= 0`.
pub type PageId = i64;

/// 0-based position of a frame within the buffer pool's frame table.
pub type FrameId = usize;

/// Monotonically increasing access tick, source of both FIFO's bookkeeping
/// and LRU's ordering.
pub type Timestamp = u64;
