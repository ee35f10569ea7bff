//! A disk image on the host file system used as the backing store.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Mutex;

use log::debug;

use crate::config::*;
use crate::error::{FsError, Result};
use crate::BlockDevice;

#[derive(Debug)]
pub struct BlockFile {
    inner: Mutex<File>,
    num_blocks: usize,
}

impl BlockFile {
    /// Opens the image at `path`, creating a zero-filled one of `MAX_BLOCK` blocks if it is missing.
    /// Returns the device and whether the image already existed.
    pub fn open(path: impl AsRef<Path>) -> Result<(Self, bool)> {
        let path = path.as_ref();
        let existed = path.exists();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let len = (MAX_BLOCK * BLOCK_SIZE) as u64;
        if file.metadata()?.len() < len {
            file.set_len(len)?;
        }
        debug!("opened disk image {} (existed: {existed})", path.display());

        Ok((
            Self {
                inner: Mutex::new(file),
                num_blocks: MAX_BLOCK,
            },
            existed,
        ))
    }

    fn check(&self, block_id: usize, len: usize) -> Result<()> {
        if block_id >= self.num_blocks || len != BLOCK_SIZE {
            return Err(FsError::InvalidBlockId(block_id));
        }
        Ok(())
    }
}

impl BlockDevice for BlockFile {
    fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<()> {
        self.check(block_id, buf.len())?;
        let mut file = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        file.seek(SeekFrom::Start((block_id * BLOCK_SIZE) as u64))?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<()> {
        self.check(block_id, buf.len())?;
        let mut file = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        file.seek(SeekFrom::Start((block_id * BLOCK_SIZE) as u64))?;
        file.write_all(buf)?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        let mut file = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        file.flush()?;
        file.sync_all()?;
        Ok(())
    }
}
