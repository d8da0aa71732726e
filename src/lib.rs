//! A single-threaded buffer pool manager: a fixed-size page cache over a
//! flat, fixed-page-size file, with pluggable FIFO or LRU replacement.
//!
//! The entry point is [`buffer::BufferPoolManager`]; it is built from a
//! [`storage::DiskManager`] (the page file), a [`storage::Directory`]
//! (page id to frame lookup), and a table of [`storage::Frame`]s.

pub mod buffer;
pub mod common;
pub mod error;
pub mod storage;

pub use buffer::{BufferPoolManager, PageHandle, ReplacementStrategy};
pub use error::{BufferPoolError, Result};
