//! The replacement policy (C4): pure victim *selection* over the frame
//! table. Eviction bookkeeping (writing a dirty victim back through the
//! page file and removing its directory entry) is the buffer pool's job;
//! see [`crate::buffer::buffer_pool_manager`].

use crate::common::config::FrameId;
use crate::storage::Frame;

/// Which policy a pool uses to pick an eviction victim among unpinned
/// frames. Chosen at construction, immutable for the pool's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplacementStrategy {
    /// Evict the unpinned frame that has gone the longest without being
    /// either installed or re-pinned, tracked via a round-robin cursor.
    Fifo,
    /// Evict the unpinned frame with the oldest access timestamp.
    Lru,
}

/// Selects a victim frame according to `strategy`. Returns `None` ("no
/// victim") if every frame is pinned.
///
/// `fifo_cursor` is only touched by the FIFO branch; LRU calls leave it
/// untouched.
pub(crate) fn choose_victim(
    strategy: ReplacementStrategy,
    frames: &[Frame],
    fifo_cursor: &mut FrameId,
) -> Option<FrameId> {
    match strategy {
        ReplacementStrategy::Fifo => choose_victim_fifo(frames, fifo_cursor),
        ReplacementStrategy::Lru => choose_victim_lru(frames),
    }
}

/// Advances `cursor` modulo `frames.len()` until it lands on an unpinned
/// frame, or until it has cycled back to its starting position. The cursor
/// is always advanced, even on failure, so repeated all-pinned calls do not
/// spin on the same frame.
fn choose_victim_fifo(frames: &[Frame], cursor: &mut FrameId) -> Option<FrameId> {
    let num_pages = frames.len();
    let start = *cursor;
    let mut current = start;

    loop {
        current = (current + 1) % num_pages;
        if !frames[current].is_pinned() {
            break;
        }
        if current == start {
            break;
        }
    }

    *cursor = current;
    if frames[current].is_pinned() {
        None
    } else {
        Some(current)
    }
}

/// Scans every frame for the unpinned one with the smallest timestamp,
/// breaking ties by lowest frame index.
fn choose_victim_lru(frames: &[Frame]) -> Option<FrameId> {
    frames
        .iter()
        .filter(|f| !f.is_pinned())
        .min_by_key(|f| (f.timestamp(), f.frame_index()))
        .map(|f| f.frame_index())
}
