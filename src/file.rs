//! File content: filler generation on create and block-wise reads.

use rand::distr::Alphanumeric;
use rand::Rng;

use crate::{BlockDevice, Error, Inode, Result, BLOCK_SIZE};

/// Generates `size` bytes of printable filler for a new file.
pub fn filler(rng: &mut impl Rng, size: usize) -> Vec<u8> {
    rng.sample_iter(&Alphanumeric).take(size).collect()
}

/// Writes `content` across `blocks`, one `BLOCK_SIZE` chunk per block.
/// The tail of the last block is zero-padded.
pub fn fwrite_blocks(device: &impl BlockDevice, blocks: &[u32], content: &[u8]) -> Result<()> {
    let mut block_buf = [0u8; BLOCK_SIZE];
    for (block_id, chunk) in blocks.iter().zip(content.chunks(BLOCK_SIZE)) {
        block_buf.fill(0);
        block_buf[..chunk.len()].copy_from_slice(chunk);
        device.write_block(*block_id as usize, &block_buf)?;
    }
    Ok(())
}

/// Reads `size` bytes of a file into a new buffer.
///
/// `offset` is applied inside every source block, not once at the start of the file:
/// output chunk `i` holds the bytes of block `i` starting at `offset`. Output bytes a block
/// cannot supply (past its end) stay zero. With `offset == 0` this is a plain prefix read.
pub fn fread(device: &impl BlockDevice, inode: &Inode, offset: usize, size: usize) -> Result<Vec<u8>> {
    if size > inode.size as usize {
        return Err(Error::SizeExceedsFile {
            size,
            file_size: inode.size as usize,
        });
    }
    if size > 0 && offset >= BLOCK_SIZE {
        return Err(Error::OffsetOutOfRange(offset));
    }

    let mut buffer = vec![0u8; size];
    let mut block_buf = [0u8; BLOCK_SIZE];
    let mut bytes_read = 0;

    for &block_id in inode.blocks() {
        if bytes_read >= size {
            break;
        }
        device.read_block(block_id as usize, &mut block_buf)?;

        let chunk = BLOCK_SIZE.min(size - bytes_read);
        let copied = chunk.min(BLOCK_SIZE - offset);
        buffer[bytes_read..bytes_read + copied]
            .copy_from_slice(&block_buf[offset..offset + copied]);
        bytes_read += chunk;
    }

    Ok(buffer)
}

#[cfg(test)]
mod test {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn test_filler_is_printable() {
        let mut rng = StdRng::seed_from_u64(7);
        let content = filler(&mut rng, 1000);
        assert_eq!(content.len(), 1000);
        assert!(content.iter().all(|c| c.is_ascii_alphanumeric()));
    }
}
