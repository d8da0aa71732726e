//! The buffer pool manager (C5): the component every higher layer talks to.
//! It owns the frame table, the directory, and the page file, and is the
//! only thing allowed to drive a frame through its occupied/dirty/pinned
//! states. Every other module in this crate is a passive collaborator that
//! `BufferPoolManager` composes: [`Directory`] for lookups,
//! [`replacer::choose_victim`] for picking who to evict, and [`DiskManager`]
//! for the actual bytes.

use crate::buffer::page_handle::PageHandle;
use crate::buffer::replacer::{self, ReplacementStrategy};
use crate::common::config::{FrameId, PageId, Timestamp, NO_PAGE};
use crate::error::{BufferPoolError, Result};
use crate::storage::{Directory, DiskManager, Frame};

/// Coordinates the frame table, directory, and page file behind the pool's
/// public interface.
///
/// `file` is `None` before a successful [`BufferPoolManager::init`] and
/// after [`BufferPoolManager::shutdown`] has released it.
#[derive(Debug)]
pub struct BufferPoolManager {
    frames: Vec<Frame>,
    directory: Directory,
    file: Option<DiskManager>,
    strategy: ReplacementStrategy,
    fifo_cursor: FrameId,
    clock: Timestamp,
    num_read: u64,
    num_write: u64,
}

impl BufferPoolManager {
    /// Opens `file_name` (which must already exist, see
    /// [`DiskManager::create`]) and allocates a frame table of `num_pages`
    /// empty frames using `strategy` for replacement.
    pub fn init(file_name: &str, num_pages: usize, strategy: ReplacementStrategy) -> Result<Self> {
        if num_pages == 0 {
            return Err(BufferPoolError::ConfigError(
                "buffer pool must have at least one frame".into(),
            ));
        }

        let file = DiskManager::open(file_name)?;

        let mut clock: Timestamp = 0;
        let mut frames = Vec::with_capacity(num_pages);
        for i in 0..num_pages {
            frames.push(Frame::new(i, clock));
            clock += 1;
        }

        Ok(BufferPoolManager {
            frames,
            directory: Directory::with_capacity(num_pages),
            file: Some(file),
            strategy,
            fifo_cursor: num_pages - 1,
            clock,
            num_read: 0,
            num_write: 0,
        })
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.file.is_none() {
            Err(BufferPoolError::FileHandleNotInit)
        } else {
            Ok(())
        }
    }

    fn next_timestamp(&mut self) -> Timestamp {
        let ts = self.clock;
        self.clock += 1;
        ts
    }

    /// Total number of frames the pool was constructed with.
    pub fn num_pages(&self) -> usize {
        self.frames.len()
    }

    /// Releases every pinned page, the directory, and the file handle.
    /// Fails `WRITE_FAILED` without releasing anything if any frame is still
    /// pinned.
    pub fn shutdown(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        if self.frames.iter().any(Frame::is_pinned) {
            return Err(BufferPoolError::WriteFailed(
                "cannot shut down buffer pool while frames are pinned".into(),
            ));
        }
        self.flush_pool()?;
        self.frames.clear();
        self.directory.clear();
        self.file = None;
        Ok(())
    }

    /// Writes back every occupied, dirty, unpinned frame. Pinned dirty
    /// frames are left untouched.
    pub fn flush_pool(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        for frame_id in 0..self.frames.len() {
            let should_flush = {
                let frame = &self.frames[frame_id];
                frame.occupied() && frame.dirty() && !frame.is_pinned()
            };
            if !should_flush {
                continue;
            }
            let page_id = self.frames[frame_id].page_id().expect("checked occupied");
            self.write_frame_back(frame_id, page_id)?;
        }
        Ok(())
    }

    /// Pins `page_id`, returning a [`PageHandle`]. A resident page is
    /// re-pinned and its timestamp refreshed; a non-resident page triggers
    /// an eviction, a read from the page file, and installation into the
    /// freed frame.
    pub fn pin(&mut self, page_id: PageId) -> Result<PageHandle> {
        self.ensure_initialized()?;
        if page_id < 0 {
            return Err(BufferPoolError::KeyNotFound(page_id));
        }

        if let Some(frame_id) = self.directory.get(page_id) {
            let ts = self.next_timestamp();
            let frame = &mut self.frames[frame_id];
            frame.touch(ts);
            frame.pin();
            return Ok(PageHandle::new(page_id, frame_id));
        }

        let frame_id = self.evict()?;

        if let Err(e) = self.install_page(frame_id, page_id) {
            self.frames[frame_id].reset();
            self.directory.remove(page_id);
            return Err(e);
        }

        Ok(PageHandle::new(page_id, frame_id))
    }

    /// Unpins `handle`'s page. An unpin past zero is silently absorbed, not
    /// treated as an error. See [`Frame::unpin`].
    pub fn unpin(&mut self, handle: &PageHandle) -> Result<()> {
        self.ensure_initialized()?;
        let frame_id = self.resolve(handle)?;
        let ts = self.next_timestamp();
        let frame = &mut self.frames[frame_id];
        frame.touch(ts);
        frame.unpin();
        Ok(())
    }

    /// Marks `handle`'s page dirty. Does not write anything back; that
    /// happens on eviction, [`BufferPoolManager::force_page`], or
    /// [`BufferPoolManager::flush_pool`].
    pub fn mark_dirty(&mut self, handle: &PageHandle) -> Result<()> {
        self.ensure_initialized()?;
        let frame_id = self.resolve(handle)?;
        let ts = self.next_timestamp();
        let frame = &mut self.frames[frame_id];
        frame.touch(ts);
        frame.set_dirty(true);
        Ok(())
    }

    /// Writes `handle`'s page back to the page file immediately, regardless
    /// of replacement pressure. Fails `WRITE_FAILED` if another caller, not
    /// just this handle, is also holding the page pinned.
    pub fn force_page(&mut self, handle: &PageHandle) -> Result<()> {
        self.ensure_initialized()?;
        let frame_id = self.resolve(handle)?;

        let ts = self.next_timestamp();
        self.frames[frame_id].touch(ts);

        if self.frames[frame_id].pin_count() > 1 {
            return Err(BufferPoolError::WriteFailed(format!(
                "cannot force page {} while another caller holds it pinned",
                handle.page_id()
            )));
        }

        let page_id = handle.page_id();
        self.write_frame_back(frame_id, page_id)
    }

    /// Number of page reads the pool has issued against the page file.
    pub fn num_read_io(&self) -> u64 {
        self.num_read
    }

    /// Number of page writes the pool has issued against the page file.
    pub fn num_write_io(&self) -> u64 {
        self.num_write
    }

    /// Snapshot of which page, if any, each frame currently holds. Empty
    /// frames report [`NO_PAGE`].
    pub fn frame_contents(&self) -> Vec<PageId> {
        self.frames
            .iter()
            .map(|f| f.page_id().unwrap_or(NO_PAGE))
            .collect()
    }

    /// Snapshot of each frame's dirty bit. Empty frames report `false`.
    pub fn dirty_flags(&self) -> Vec<bool> {
        self.frames
            .iter()
            .map(|f| f.occupied() && f.dirty())
            .collect()
    }

    /// Snapshot of each frame's pin count. Empty frames report `0`.
    pub fn fix_counts(&self) -> Vec<u32> {
        self.frames
            .iter()
            .map(|f| if f.occupied() { f.pin_count() } else { 0 })
            .collect()
    }

    /// Borrows the bytes of `handle`'s page for as long as the pin is held.
    pub fn data(&self, handle: &PageHandle) -> &[u8] {
        self.frames[handle.frame_id()].data()
    }

    /// Mutable counterpart of [`BufferPoolManager::data`]. Writing through
    /// it does not itself mark the page dirty; pair it with
    /// [`BufferPoolManager::mark_dirty`].
    pub fn data_mut(&mut self, handle: &PageHandle) -> &mut [u8] {
        self.frames[handle.frame_id()].data_mut()
    }

    fn resolve(&self, handle: &PageHandle) -> Result<FrameId> {
        self.directory
            .get(handle.page_id())
            .ok_or(BufferPoolError::KeyNotFound(handle.page_id()))
    }

    /// Picks a victim frame via the configured replacement strategy, writes
    /// it back if it is occupied and dirty, and removes its directory
    /// entry. Returns the now-free frame's id.
    fn evict(&mut self) -> Result<FrameId> {
        let frame_id = replacer::choose_victim(self.strategy, &self.frames, &mut self.fifo_cursor)
            .ok_or_else(|| {
                BufferPoolError::WriteFailed("no unpinned frame available for eviction".into())
            })?;

        let ts = self.next_timestamp();
        self.frames[frame_id].touch(ts);

        if let Some(old_page_id) = self.frames[frame_id].page_id() {
            self.directory.remove(old_page_id);
            if self.frames[frame_id].dirty() {
                self.write_frame_back(frame_id, old_page_id)?;
            }
        }

        Ok(frame_id)
    }

    /// Grows the page file if necessary, reads `page_id` into `frame_id`'s
    /// buffer, and installs it. On failure the frame and directory entry are
    /// left for the caller to roll back; this function does not undo its own
    /// partial `directory.set`.
    fn install_page(&mut self, frame_id: FrameId, page_id: PageId) -> Result<()> {
        self.directory.set(page_id, frame_id);

        let file = self
            .file
            .as_mut()
            .ok_or(BufferPoolError::FileHandleNotInit)?;
        file.ensure_capacity((page_id as usize) + 1)?;
        file.read_block(page_id, self.frames[frame_id].data_mut())?;
        self.num_read += 1;

        let ts = self.next_timestamp();
        self.frames[frame_id].install(page_id, ts);
        Ok(())
    }

    fn write_frame_back(&mut self, frame_id: FrameId, page_id: PageId) -> Result<()> {
        let file = self
            .file
            .as_mut()
            .ok_or(BufferPoolError::FileHandleNotInit)?;
        file.write_block(page_id, self.frames[frame_id].data())?;
        self.num_write += 1;
        self.frames[frame_id].set_dirty(false);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::PAGE_SIZE;
    use rand::distributions::{Distribution, Uniform};
    use tempdir::TempDir;

    fn fresh_pool(
        num_pages: usize,
        strategy: ReplacementStrategy,
    ) -> (TempDir, BufferPoolManager) {
        let dir = TempDir::new("bufferpool").unwrap();
        let path = dir.path().join("test.db");
        DiskManager::create(&path).unwrap();
        let bpm = BufferPoolManager::init(path.to_str().unwrap(), num_pages, strategy).unwrap();
        (dir, bpm)
    }

    #[test]
    fn init_rejects_zero_frames() {
        let dir = TempDir::new("bufferpool").unwrap();
        let path = dir.path().join("test.db");
        DiskManager::create(&path).unwrap();
        let err = BufferPoolManager::init(path.to_str().unwrap(), 0, ReplacementStrategy::Fifo)
            .unwrap_err();
        assert!(matches!(err, BufferPoolError::ConfigError(_)));
    }

    #[test]
    fn pin_rejects_negative_page_ids() {
        let (_dir, mut bpm) = fresh_pool(2, ReplacementStrategy::Fifo);
        let err = bpm.pin(-1).unwrap_err();
        assert!(matches!(err, BufferPoolError::KeyNotFound(-1)));
    }

    #[test]
    fn fifo_eviction_order_matches_the_round_robin_cursor() {
        let (_dir, mut bpm) = fresh_pool(3, ReplacementStrategy::Fifo);

        for page_id in [1, 2, 3] {
            let h = bpm.pin(page_id).unwrap();
            bpm.unpin(&h).unwrap();
        }
        let h = bpm.pin(4).unwrap();
        bpm.unpin(&h).unwrap();

        assert_eq!(bpm.frame_contents(), vec![4, 2, 3]);
    }

    #[test]
    fn lru_eviction_order_follows_recency_of_access() {
        let (_dir, mut bpm) = fresh_pool(3, ReplacementStrategy::Lru);

        for page_id in [1, 2, 3] {
            let h = bpm.pin(page_id).unwrap();
            bpm.unpin(&h).unwrap();
        }
        // re-touch page 1 so page 2 becomes the least recently used
        let h1 = bpm.pin(1).unwrap();
        bpm.unpin(&h1).unwrap();

        let h4 = bpm.pin(4).unwrap();
        bpm.unpin(&h4).unwrap();

        assert_eq!(bpm.frame_contents(), vec![1, 4, 3]);
    }

    #[test]
    fn dirty_pages_are_written_back_on_eviction() {
        let (dir, mut bpm) = fresh_pool(2, ReplacementStrategy::Fifo);

        let h0 = bpm.pin(0).unwrap();
        bpm.data_mut(&h0).copy_from_slice(&[0x42u8; PAGE_SIZE]);
        bpm.mark_dirty(&h0).unwrap();
        bpm.unpin(&h0).unwrap();

        let h1 = bpm.pin(1).unwrap();
        bpm.unpin(&h1).unwrap();

        // a third distinct page forces frame 0 (holding page 0) out
        let h2 = bpm.pin(2).unwrap();
        bpm.unpin(&h2).unwrap();

        assert!(bpm.num_write_io() >= 1);

        let path = dir.path().join("test.db");
        let mut dm = DiskManager::open(path.to_str().unwrap()).unwrap();
        let mut buf = [0u8; PAGE_SIZE];
        dm.read_block(0, &mut buf).unwrap();
        assert_eq!(buf, [0x42u8; PAGE_SIZE]);
    }

    #[test]
    fn random_binary_page_survives_a_force_and_eviction_round_trip() {
        let (dir, mut bpm) = fresh_pool(2, ReplacementStrategy::Fifo);

        let mut rng = rand::thread_rng();
        let uniform_dist = Uniform::from(u8::MIN..=u8::MAX);
        let mut random_data: Vec<u8> = (0..PAGE_SIZE)
            .map(|_| uniform_dist.sample(&mut rng))
            .collect();
        // interior and terminal NUL bytes, so a short read or write would be masked
        // if the page were treated as a C string instead of a fixed-size buffer
        random_data[PAGE_SIZE / 2] = 0;
        random_data[PAGE_SIZE - 1] = 0;

        let h0 = bpm.pin(0).unwrap();
        bpm.data_mut(&h0).copy_from_slice(&random_data);
        bpm.mark_dirty(&h0).unwrap();
        bpm.force_page(&h0).unwrap();
        bpm.unpin(&h0).unwrap();

        // evict page 0 by filling the remaining frame and pinning a third page
        let h1 = bpm.pin(1).unwrap();
        bpm.unpin(&h1).unwrap();
        let h2 = bpm.pin(2).unwrap();
        bpm.unpin(&h2).unwrap();

        let path = dir.path().join("test.db");
        let mut dm = DiskManager::open(path.to_str().unwrap()).unwrap();
        let mut buf = [0u8; PAGE_SIZE];
        dm.read_block(0, &mut buf).unwrap();
        assert_eq!(buf.as_slice(), random_data.as_slice());

        let h0_again = bpm.pin(0).unwrap();
        assert_eq!(bpm.data(&h0_again), random_data.as_slice());
        bpm.unpin(&h0_again).unwrap();
    }

    #[test]
    fn pinned_frames_are_never_chosen_as_victims() {
        let (_dir, mut bpm) = fresh_pool(2, ReplacementStrategy::Fifo);

        let h0 = bpm.pin(0).unwrap(); // stays pinned
        let h1 = bpm.pin(1).unwrap();
        bpm.unpin(&h1).unwrap();

        let h2 = bpm.pin(2).unwrap(); // evicts page 1, the only unpinned frame
        bpm.unpin(&h2).unwrap();

        let err = bpm.pin(3).unwrap_err();
        assert!(matches!(err, BufferPoolError::WriteFailed(_)));

        bpm.unpin(&h0).unwrap();
    }

    #[test]
    fn force_page_writes_back_without_unpinning() {
        let (dir, mut bpm) = fresh_pool(2, ReplacementStrategy::Fifo);

        let h0 = bpm.pin(0).unwrap();
        bpm.data_mut(&h0).copy_from_slice(&[0x7fu8; PAGE_SIZE]);
        bpm.mark_dirty(&h0).unwrap();
        bpm.force_page(&h0).unwrap();

        assert_eq!(bpm.num_write_io(), 1);
        assert!(!bpm.dirty_flags()[0]);

        // the page is still pinned, so flush_pool has nothing left to do
        bpm.flush_pool().unwrap();
        assert_eq!(bpm.num_write_io(), 1);

        let path = dir.path().join("test.db");
        let mut dm = DiskManager::open(path.to_str().unwrap()).unwrap();
        let mut buf = [0u8; PAGE_SIZE];
        dm.read_block(0, &mut buf).unwrap();
        assert_eq!(buf, [0x7fu8; PAGE_SIZE]);
    }

    #[test]
    fn shutdown_refuses_to_run_with_pinned_frames_outstanding() {
        let (_dir, mut bpm) = fresh_pool(2, ReplacementStrategy::Fifo);

        let h0 = bpm.pin(0).unwrap();
        let err = bpm.shutdown().unwrap_err();
        assert!(matches!(err, BufferPoolError::WriteFailed(_)));

        bpm.unpin(&h0).unwrap();
        bpm.shutdown().unwrap();

        let err = bpm.pin(1).unwrap_err();
        assert!(matches!(err, BufferPoolError::FileHandleNotInit));
    }

    #[test]
    fn repinning_a_resident_page_does_not_trigger_io() {
        let (_dir, mut bpm) = fresh_pool(2, ReplacementStrategy::Fifo);

        let h0 = bpm.pin(0).unwrap();
        bpm.unpin(&h0).unwrap();
        let reads_before = bpm.num_read_io();

        let h0_again = bpm.pin(0).unwrap();
        assert_eq!(bpm.num_read_io(), reads_before);
        assert_eq!(h0_again.page_id(), 0);
        bpm.unpin(&h0_again).unwrap();
    }

    #[test]
    fn fix_counts_and_dirty_flags_report_zero_for_empty_frames() {
        let (_dir, bpm) = fresh_pool(3, ReplacementStrategy::Fifo);
        assert_eq!(bpm.fix_counts(), vec![0, 0, 0]);
        assert_eq!(bpm.dirty_flags(), vec![false, false, false]);
        assert_eq!(bpm.frame_contents(), vec![NO_PAGE, NO_PAGE, NO_PAGE]);
    }
}
