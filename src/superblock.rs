use log::error;

use crate::config::*;
use crate::error::FsError;
use crate::structs::{get_u32, put_u32};
use crate::BlockDevice;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuperBlock {
    pub magic: u32,            // Magic number to identify an initialized store
    pub free_block_count: u32, // Zero bits of the block bitmap
    pub free_inode_count: u32, // Zero bits of the inode bitmap
}

impl SuperBlock {
    /// Superblock of a freshly initialized store: every inode free, every non-metadata block free.
    pub fn new() -> Self {
        Self {
            magic: MAGIC,
            free_block_count: (MAX_BLOCK - DATA_START) as u32,
            free_inode_count: MAX_INODE as u32,
        }
    }

    fn decode(buf: &[u8]) -> Self {
        Self {
            magic: get_u32(buf, 0),
            free_block_count: get_u32(buf, 4),
            free_inode_count: get_u32(buf, 8),
        }
    }

    fn encode(&self, buf: &mut [u8]) {
        put_u32(buf, 0, self.magic);
        put_u32(buf, 4, self.free_block_count);
        put_u32(buf, 8, self.free_inode_count);
    }
}

impl Default for SuperBlock {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads block 0. A block of zeros means a blank store and yields `None`.
/// Anything else without the magic number is a corrupt store.
pub fn read_superblock<D: BlockDevice>(device: &D) -> Result<Option<SuperBlock>> {
    let mut buf = [0u8; BLOCK_SIZE];
    device.read_block(SUPERBLOCK_ID, &mut buf)?;
    if buf.iter().all(|&b| b == 0) {
        return Ok(None);
    }

    let superblock = SuperBlock::decode(&buf);
    if superblock.magic != MAGIC {
        error!("invalid disk: magic {:#x}", superblock.magic);
        return Err(FsError::CorruptStore(superblock.magic));
    }
    Ok(Some(superblock))
}

pub fn write_superblock<D: BlockDevice>(device: &D, superblock: &SuperBlock) -> Result<()> {
    let mut buf = [0u8; BLOCK_SIZE];
    superblock.encode(&mut buf);
    device.write_block(SUPERBLOCK_ID, &buf)
}
