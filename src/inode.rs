//! The inode table, mirrored in memory as a fixed-capacity arena indexed by inode ID.

use crate::config::*;
use crate::error::FsError;
use crate::{BlockDevice, Inode, Result};

#[derive(Debug, Clone)]
pub struct InodeTable {
    inodes: Box<[Inode]>,
}

impl InodeTable {
    pub fn new() -> Self {
        Self {
            inodes: vec![Inode::default(); MAX_INODE].into_boxed_slice(),
        }
    }

    pub fn get(&self, inode_id: u32) -> Result<&Inode> {
        self.inodes
            .get(inode_id as usize)
            .ok_or_else(|| FsError::Inconsistent(format!("inode {inode_id} out of range")))
    }

    pub fn get_mut(&mut self, inode_id: u32) -> Result<&mut Inode> {
        self.inodes
            .get_mut(inode_id as usize)
            .ok_or_else(|| FsError::Inconsistent(format!("inode {inode_id} out of range")))
    }

    /// Replaces the record at `inode_id`.
    pub fn set(&mut self, inode_id: u32, inode: Inode) -> Result<()> {
        *self.get_mut(inode_id)? = inode;
        Ok(())
    }

    /// Reads the whole table from blocks `INODE_TABLE_START..DATA_START`.
    pub fn load(device: &impl BlockDevice) -> Result<Self> {
        let mut table = Self::new();
        let mut buf = [0u8; BLOCK_SIZE];
        for (i, chunk) in table.inodes.chunks_mut(INODES_PER_BLOCK).enumerate() {
            device.read_block(INODE_TABLE_START + i, &mut buf)?;
            for (j, inode) in chunk.iter_mut().enumerate() {
                *inode = Inode::decode(&buf[j * INODE_SIZE..(j + 1) * INODE_SIZE]);
            }
        }
        Ok(table)
    }

    pub fn store(&self, device: &impl BlockDevice) -> Result<()> {
        let mut buf = [0u8; BLOCK_SIZE];
        for (i, chunk) in self.inodes.chunks(INODES_PER_BLOCK).enumerate() {
            buf.fill(0);
            for (j, inode) in chunk.iter().enumerate() {
                inode.encode(&mut buf[j * INODE_SIZE..(j + 1) * INODE_SIZE]);
            }
            device.write_block(INODE_TABLE_START + i, &buf)?;
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &Inode)> {
        self.inodes.iter().enumerate().map(|(i, inode)| (i as u32, inode))
    }
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Checks the per-inode invariants of an occupied inode.
pub fn check_inode(inode_id: u32, inode: &Inode) -> Result<()> {
    let expected_blocks = match inode.kind {
        crate::FileType::File => (inode.size as usize).div_ceil(BLOCK_SIZE) as u32,
        crate::FileType::Directory => 1,
    };
    if inode.block_count != expected_blocks {
        return Err(FsError::Inconsistent(format!(
            "inode {inode_id} has {} blocks, expected {expected_blocks}",
            inode.block_count
        )));
    }
    if inode.link_count == 0 {
        return Err(FsError::Inconsistent(format!("inode {inode_id} has no links")));
    }
    if inode.size as usize > SMALL_FILE {
        return Err(FsError::Inconsistent(format!(
            "inode {inode_id} size {} exceeds {SMALL_FILE}",
            inode.size
        )));
    }
    Ok(())
}
