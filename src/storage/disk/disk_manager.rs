use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::debug;

use crate::common::config::{PageId, PAGE_SIZE};
use crate::error::{BufferPoolError, Result};

/// `DiskManager` is the durable, zero-indexed, fixed-size page array that the
/// buffer pool reads from and writes to. It owns exactly one file and knows
/// nothing about frames, pins, or replacement; it only understands page
/// indices and `PAGE_SIZE`-byte transfers.
#[derive(Debug)]
pub struct DiskManager {
    file: File,
    file_name: String,
    total_pages: usize,
    cur_page_pos: usize,
    num_flushes: u64,
}

impl DiskManager {
    /// Creates a new, one-page, zero-filled page file at `path`. Fails with
    /// [`BufferPoolError::FileNotFound`] if the path cannot be created, or
    /// [`BufferPoolError::WriteFailed`] on a short write of the initial page.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .read(true)
            .write(true)
            .open(path)
            .map_err(|_| BufferPoolError::FileNotFound(path.display().to_string()))?;

        let zero_page = vec![0u8; PAGE_SIZE];
        file.write_all(&zero_page)
            .map_err(|_| BufferPoolError::WriteFailed("short write creating page file".into()))?;
        file.flush()?;
        Ok(())
    }

    /// Opens `path` for read+write, computing `total_pages` from the file's
    /// current length. Assumes the file's length is a multiple of
    /// `PAGE_SIZE`; behavior on a truncated file is unspecified beyond "the
    /// trailing partial page is ignored."
    pub fn open<P: AsRef<Path>>(path: P) -> Result<DiskManager> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|_| BufferPoolError::FileNotFound(path.display().to_string()))?;

        let len = file.metadata()?.len() as usize;
        let total_pages = len / PAGE_SIZE;

        debug!(
            "opened page file {} with {} pages",
            path.display(),
            total_pages
        );

        Ok(DiskManager {
            file,
            file_name: path.display().to_string(),
            total_pages,
            cur_page_pos: 0,
            num_flushes: 0,
        })
    }

    /// Removes the backing file entirely.
    pub fn destroy<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        std::fs::remove_file(path)
            .map_err(|_| BufferPoolError::FileNotFound(path.display().to_string()))
    }

    /// Number of `PAGE_SIZE` pages currently in the file.
    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Number of writes (including appends) flushed to disk since open.
    pub fn num_flushes(&self) -> u64 {
        self.num_flushes
    }

    fn in_range(&self, page_id: PageId) -> bool {
        page_id >= 0 && (page_id as usize) < self.total_pages
    }

    /// Reads page `page_id` into `dst`, which must be exactly `PAGE_SIZE`
    /// bytes. Fails [`BufferPoolError::ReadNonExistingPage`] if `page_id` is
    /// out of range or the read hits EOF early.
    pub fn read_block(&mut self, page_id: PageId, dst: &mut [u8]) -> Result<()> {
        debug_assert_eq!(dst.len(), PAGE_SIZE);
        if !self.in_range(page_id) {
            return Err(BufferPoolError::ReadNonExistingPage(page_id));
        }

        self.file
            .seek(SeekFrom::Start(page_id as u64 * PAGE_SIZE as u64))?;

        match self.file.read_exact(dst) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                debug!("read past end of file for page {}", page_id);
                Err(BufferPoolError::ReadNonExistingPage(page_id))
            }
            Err(e) => Err(BufferPoolError::Io(e)),
        }
    }

    /// Writes `src` (exactly `PAGE_SIZE` bytes) to page `page_id` and
    /// flushes so a subsequent read observes the data. Fails
    /// [`BufferPoolError::PageOutOfRange`] if `page_id` is out of range.
    pub fn write_block(&mut self, page_id: PageId, src: &[u8]) -> Result<()> {
        debug_assert_eq!(src.len(), PAGE_SIZE);
        if !self.in_range(page_id) {
            return Err(BufferPoolError::PageOutOfRange(page_id));
        }

        self.file
            .seek(SeekFrom::Start(page_id as u64 * PAGE_SIZE as u64))?;

        self.file.write_all(src).map_err(|_| {
            BufferPoolError::WriteFailed(format!("short write for page {page_id}"))
        })?;
        self.file.flush()?;
        self.num_flushes += 1;
        Ok(())
    }

    /// Appends one zero-filled page to the end of the file and increments
    /// `total_pages`.
    pub fn append_empty_block(&mut self) -> Result<()> {
        self.file
            .seek(SeekFrom::End(0))
            .map_err(|_| BufferPoolError::SeekFailed)?;

        let zero_page = vec![0u8; PAGE_SIZE];
        self.file
            .write_all(&zero_page)
            .map_err(|_| BufferPoolError::AllocationFailed)?;
        self.file.flush()?;
        self.total_pages += 1;
        self.num_flushes += 1;
        Ok(())
    }

    /// Appends pages until `total_pages >= n`.
    pub fn ensure_capacity(&mut self, n: usize) -> Result<()> {
        while self.total_pages < n {
            self.append_empty_block()?;
        }
        Ok(())
    }

    /// Current position of the positional read cursor.
    pub fn block_pos(&self) -> usize {
        self.cur_page_pos
    }

    /// Reads page 0 and, on success, sets the cursor to 0.
    pub fn read_first_block(&mut self, dst: &mut [u8]) -> Result<()> {
        self.read_block(0, dst)?;
        self.cur_page_pos = 0;
        Ok(())
    }

    /// Reads the page before the cursor. Fails
    /// [`BufferPoolError::ReadNonExistingPage`] if the cursor is at 0.
    pub fn read_previous_block(&mut self, dst: &mut [u8]) -> Result<()> {
        if self.cur_page_pos == 0 {
            return Err(BufferPoolError::ReadNonExistingPage(0));
        }
        let target = (self.cur_page_pos - 1) as PageId;
        self.read_block(target, dst)?;
        self.cur_page_pos = target as usize;
        Ok(())
    }

    /// Re-reads the page at the cursor without moving it.
    pub fn read_current_block(&mut self, dst: &mut [u8]) -> Result<()> {
        let target = self.cur_page_pos as PageId;
        self.read_block(target, dst)
    }

    /// Reads the page after the cursor and, on success, advances it.
    pub fn read_next_block(&mut self, dst: &mut [u8]) -> Result<()> {
        let target = (self.cur_page_pos + 1) as PageId;
        self.read_block(target, dst)?;
        self.cur_page_pos = target as usize;
        Ok(())
    }

    /// Reads the last page in the file. Fails
    /// [`BufferPoolError::ReadNonExistingPage`] if the file has no pages.
    pub fn read_last_block(&mut self, dst: &mut [u8]) -> Result<()> {
        if self.total_pages == 0 {
            return Err(BufferPoolError::ReadNonExistingPage(0));
        }
        let target = (self.total_pages - 1) as PageId;
        self.read_block(target, dst)?;
        self.cur_page_pos = target as usize;
        Ok(())
    }

    /// Writes `src` to the page at the cursor.
    pub fn write_current_block(&mut self, src: &[u8]) -> Result<()> {
        self.write_block(self.cur_page_pos as PageId, src)
    }
}
