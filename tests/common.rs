//! Common utilities for tests
#![allow(unused)]

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use simfs::{BlockDevice, Error, FileSystem, Result, BLOCK_SIZE, MAX_BLOCK};

pub const ORANGE: &str = "\x1b[38;5;214m";
pub const RESET: &str = "\x1b[0m";

/// Provides a macro for logging messages during tests.
/// e.g. log!("placeholder") -> println!("[test] placeholder");
#[macro_export]
macro_rules! log {
    ($msg:expr) => {
        println!("{}[test] {}{}", crate::common::ORANGE, $msg, crate::common::RESET)
    };
    ($msg:expr, $($arg:tt)*) => {
        println!("{}[test] {}{}", crate::common::ORANGE, format!($msg, $($arg)*), crate::common::RESET)
    };
}

/// In-memory backing store.
#[derive(Debug)]
pub struct RamDisk {
    inner: Mutex<Vec<u8>>,
    num_blocks: usize,
    read_only: AtomicBool,
}

impl RamDisk {
    /// Creates a zeroed RamDisk with the specified number of blocks.
    pub fn new(num_blocks: usize) -> Self {
        RamDisk {
            inner: Mutex::new(vec![0u8; num_blocks * BLOCK_SIZE]),
            num_blocks,
            read_only: AtomicBool::new(false),
        }
    }

    /// Makes every later write fail with an I/O error.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Raw copy of one block, bypassing any file system state.
    pub fn block(&self, block_id: usize) -> Vec<u8> {
        let data = self.inner.lock().unwrap();
        data[block_id * BLOCK_SIZE..(block_id + 1) * BLOCK_SIZE].to_vec()
    }
}

impl BlockDevice for RamDisk {
    fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<()> {
        if block_id >= self.num_blocks || buf.len() != BLOCK_SIZE {
            return Err(Error::InvalidBlockId(block_id));
        }
        let start = block_id * BLOCK_SIZE;
        let data = self.inner.lock().unwrap();
        buf.copy_from_slice(&data[start..start + BLOCK_SIZE]);
        Ok(())
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<()> {
        if block_id >= self.num_blocks || buf.len() != BLOCK_SIZE {
            return Err(Error::InvalidBlockId(block_id));
        }
        if self.read_only.load(Ordering::SeqCst) {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "read-only disk",
            )));
        }
        let start = block_id * BLOCK_SIZE;
        let mut data = self.inner.lock().unwrap();
        data[start..start + BLOCK_SIZE].copy_from_slice(buf);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        // Data is already in memory.
        Ok(())
    }
}

/// A blank disk of full size and a session mounted on it.
pub fn fresh() -> (Arc<RamDisk>, FileSystem<RamDisk>) {
    let rd = Arc::new(RamDisk::new(MAX_BLOCK));
    let fs = FileSystem::mount(rd.clone()).unwrap().with_seed(42);
    (rd, fs)
}

pub fn names(fs: &FileSystem<RamDisk>) -> Vec<String> {
    fs.ls().unwrap().into_iter().map(|entry| entry.name).collect()
}
