//! Management of the inode bitmap and the block bitmap.
//! Both are held in memory for the whole session and written back at unmount.
//! The free counters live in the superblock and move in lockstep with the bits.

use log::{debug, error};

use crate::config::*;
use crate::error::FsError;
use crate::superblock::SuperBlock;
use crate::{BlockDevice, Result};

/// Fixed-length bit vector. A set bit means "occupied".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    bits: Box<[u8]>,
    len: usize,
}

impl Bitmap {
    pub fn new(len: usize) -> Self {
        Self {
            bits: vec![0u8; len.div_ceil(8)].into_boxed_slice(),
            len,
        }
    }

    pub fn get(&self, index: usize) -> bool {
        index < self.len && self.bits[index / 8] & (1 << (index % 8)) != 0
    }

    /// Sets the bit at `index`, returns its previous value.
    pub fn set(&mut self, index: usize) -> bool {
        let prev = self.get(index);
        self.bits[index / 8] |= 1 << (index % 8);
        prev
    }

    /// Clears the bit at `index`, returns its previous value.
    pub fn clear(&mut self, index: usize) -> bool {
        let prev = self.get(index);
        self.bits[index / 8] &= !(1 << (index % 8));
        prev
    }

    /// Lowest index whose bit is zero.
    pub fn first_zero(&self) -> Option<usize> {
        self.bits
            .iter()
            .enumerate()
            .find(|&(_, &byte)| byte != u8::MAX)
            .map(|(i, &byte)| i * 8 + byte.trailing_ones() as usize)
            .filter(|&index| index < self.len)
    }

    pub fn count_zeros(&self) -> usize {
        (0..self.len).filter(|&i| !self.get(i)).count()
    }

    pub fn load(&mut self, device: &impl BlockDevice, block_id: usize) -> Result<()> {
        let mut buf = [0u8; BLOCK_SIZE];
        device.read_block(block_id, &mut buf)?;
        let n = self.bits.len();
        self.bits.copy_from_slice(&buf[..n]);
        Ok(())
    }

    pub fn store(&self, device: &impl BlockDevice, block_id: usize) -> Result<()> {
        let mut buf = [0u8; BLOCK_SIZE];
        buf[..self.bits.len()].copy_from_slice(&self.bits);
        device.write_block(block_id, &buf)
    }
}

/// The two bitmaps plus the superblock carrying their free counters.
#[derive(Debug, Clone)]
pub struct Allocator {
    pub(crate) superblock: SuperBlock,
    pub(crate) inode_map: Bitmap,
    pub(crate) block_map: Bitmap,
}

impl Allocator {
    /// Fresh allocator: all inodes free, metadata blocks marked occupied.
    pub fn format() -> Self {
        let mut block_map = Bitmap::new(MAX_BLOCK);
        for block_id in 0..DATA_START {
            block_map.set(block_id);
        }
        Self {
            superblock: SuperBlock::new(),
            inode_map: Bitmap::new(MAX_INODE),
            block_map,
        }
    }

    pub fn load(device: &impl BlockDevice, superblock: SuperBlock) -> Result<Self> {
        let mut inode_map = Bitmap::new(MAX_INODE);
        let mut block_map = Bitmap::new(MAX_BLOCK);
        inode_map.load(device, INODE_BITMAP_ID)?;
        block_map.load(device, BLOCK_BITMAP_ID)?;
        Ok(Self {
            superblock,
            inode_map,
            block_map,
        })
    }

    /// Writes both bitmaps. The superblock is written by the caller.
    pub fn store(&self, device: &impl BlockDevice) -> Result<()> {
        self.inode_map.store(device, INODE_BITMAP_ID)?;
        self.block_map.store(device, BLOCK_BITMAP_ID)
    }

    pub fn superblock(&self) -> &SuperBlock {
        &self.superblock
    }

    /// Allocates the lowest free inode.
    pub fn alloc_inode(&mut self) -> Result<u32> {
        if self.superblock.free_inode_count == 0 {
            return Err(FsError::ExhaustedInodes);
        }
        let inode_id = self.inode_map.first_zero().ok_or(FsError::ExhaustedInodes)?;
        self.inode_map.set(inode_id);
        self.superblock.free_inode_count -= 1;
        debug!("alloc inode {inode_id}");
        Ok(inode_id as u32)
    }

    /// Allocates the lowest free block. Returns its absolute block ID.
    pub fn alloc_block(&mut self) -> Result<u32> {
        if self.superblock.free_block_count == 0 {
            return Err(FsError::ExhaustedBlocks);
        }
        let block_id = self.block_map.first_zero().ok_or(FsError::ExhaustedBlocks)?;
        self.block_map.set(block_id);
        self.superblock.free_block_count -= 1;
        debug!("alloc block {block_id}");
        Ok(block_id as u32)
    }

    pub fn free_inode(&mut self, inode_id: u32) -> Result<()> {
        let index = inode_id as usize;
        if index >= MAX_INODE || !self.inode_map.clear(index) {
            error!("double free of inode {inode_id}");
            return Err(FsError::DoubleFree { kind: "inode", id: inode_id });
        }
        self.superblock.free_inode_count += 1;
        debug!("free inode {inode_id}");
        Ok(())
    }

    pub fn free_block(&mut self, block_id: u32) -> Result<()> {
        let index = block_id as usize;
        // Metadata blocks are never freed.
        if index < DATA_START || index >= MAX_BLOCK || !self.block_map.clear(index) {
            error!("double free of block {block_id}");
            return Err(FsError::DoubleFree { kind: "block", id: block_id });
        }
        self.superblock.free_block_count += 1;
        debug!("free block {block_id}");
        Ok(())
    }

    pub fn inode_in_use(&self, inode_id: u32) -> bool {
        self.inode_map.get(inode_id as usize)
    }

    pub fn block_in_use(&self, block_id: u32) -> bool {
        self.block_map.get(block_id as usize)
    }

    /// Free counters must equal the number of zero bits.
    pub fn check(&self) -> Result<()> {
        let free_blocks = self.block_map.count_zeros();
        if free_blocks != self.superblock.free_block_count as usize {
            return Err(FsError::Inconsistent(format!(
                "free block count {} but {} zero bits",
                self.superblock.free_block_count, free_blocks
            )));
        }
        let free_inodes = self.inode_map.count_zeros();
        if free_inodes != self.superblock.free_inode_count as usize {
            return Err(FsError::Inconsistent(format!(
                "free inode count {} but {} zero bits",
                self.superblock.free_inode_count, free_inodes
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_first_zero() {
        let mut map = Bitmap::new(20);
        assert_eq!(map.first_zero(), Some(0));
        for i in 0..9 {
            map.set(i);
        }
        assert_eq!(map.first_zero(), Some(9));
        map.clear(3);
        assert_eq!(map.first_zero(), Some(3));
        for i in 0..20 {
            map.set(i);
        }
        // Padding bits past `len` are never handed out.
        assert_eq!(map.first_zero(), None);
        assert_eq!(map.count_zeros(), 0);
    }

    #[test]
    fn test_format_reserves_metadata() {
        let alloc = Allocator::format();
        for block_id in 0..DATA_START as u32 {
            assert!(alloc.block_in_use(block_id));
        }
        assert_eq!(alloc.superblock().free_block_count as usize, MAX_BLOCK - DATA_START);
        assert_eq!(alloc.superblock().free_inode_count as usize, MAX_INODE);
        alloc.check().unwrap();
    }

    #[test]
    fn test_lowest_index_first() {
        let mut alloc = Allocator::format();
        assert_eq!(alloc.alloc_inode().unwrap(), 0);
        assert_eq!(alloc.alloc_inode().unwrap(), 1);
        assert_eq!(alloc.alloc_block().unwrap(), DATA_START as u32);
        assert_eq!(alloc.alloc_block().unwrap(), DATA_START as u32 + 1);
        alloc.free_inode(0).unwrap();
        alloc.free_block(DATA_START as u32).unwrap();
        assert_eq!(alloc.alloc_inode().unwrap(), 0);
        assert_eq!(alloc.alloc_block().unwrap(), DATA_START as u32);
        alloc.check().unwrap();
    }

    #[test]
    fn test_double_free_keeps_counters() {
        let mut alloc = Allocator::format();
        let block_id = alloc.alloc_block().unwrap();
        alloc.free_block(block_id).unwrap();
        let free = alloc.superblock().free_block_count;
        assert!(matches!(alloc.free_block(block_id), Err(FsError::DoubleFree { .. })));
        assert!(matches!(alloc.free_block(0), Err(FsError::DoubleFree { .. })));
        assert!(matches!(alloc.free_inode(5), Err(FsError::DoubleFree { .. })));
        assert_eq!(alloc.superblock().free_block_count, free);
        alloc.check().unwrap();
    }

    #[test]
    fn test_exhaustion() {
        let mut alloc = Allocator::format();
        for _ in 0..MAX_INODE {
            alloc.alloc_inode().unwrap();
        }
        assert!(matches!(alloc.alloc_inode(), Err(FsError::ExhaustedInodes)));
        for _ in DATA_START..MAX_BLOCK {
            alloc.alloc_block().unwrap();
        }
        assert!(matches!(alloc.alloc_block(), Err(FsError::ExhaustedBlocks)));
        alloc.check().unwrap();
    }
}
