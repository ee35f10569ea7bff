use crate::error::FsError;

/// The backing store: a fixed number of `crate::BLOCK_SIZE` blocks addressed by index.
pub trait BlockDevice: Send + Sync {
    fn num_blocks(&self) -> usize;

    /// Fills `buf` (exactly one block long) with block `block_id`.
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), FsError>;

    /// Overwrites block `block_id` with `buf` (exactly one block long).
    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<(), FsError>;

    /// Makes every written block durable. Called once, at unmount.
    fn flush(&self) -> Result<(), FsError>;
}
