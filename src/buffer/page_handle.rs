//! The client-facing handle returned by `pin`.

use crate::common::config::{FrameId, PageId};

/// A borrow of a pinned page.
///
/// Carries the `page_id` and the `frame_id` it was resident in at pin time.
/// [`crate::buffer::BufferPoolManager::data`] and
/// [`crate::buffer::BufferPoolManager::data_mut`] use `frame_id` to hand back
/// a borrow of the frame's bytes scoped to the call.
///
/// A `PageHandle` is a value, not a guard; it does not itself keep the page
/// pinned. Callers pair every successful `pin` with exactly one `unpin` of
/// the returned handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageHandle {
    page_id: PageId,
    frame_id: FrameId,
}

impl PageHandle {
    pub(crate) fn new(page_id: PageId, frame_id: FrameId) -> Self {
        PageHandle { page_id, frame_id }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub(crate) fn frame_id(&self) -> FrameId {
        self.frame_id
    }
}
