pub const MAGIC: u32 = 0x5346_5331; // "SFS1" in ASCII

pub const BLOCK_SIZE: usize = 512;
pub const MAX_BLOCK: usize = 4096; // One bit per block, the whole bitmap fits in one block
pub const MAX_INODE: usize = 512; // One bit per inode, the whole bitmap fits in one block
pub const INODE_SIZE: usize = 128; // On-disk size of an inode record
pub const NUM_DIRECT_PTRS: usize = 15; // Number of direct pointers in an inode
pub const SMALL_FILE: usize = NUM_DIRECT_PTRS * BLOCK_SIZE; // Largest file representable by direct pointers

// Block layout of the backing store.
pub const SUPERBLOCK_ID: usize = 0;
pub const INODE_BITMAP_ID: usize = 1;
pub const BLOCK_BITMAP_ID: usize = 2;
pub const INODE_TABLE_START: usize = 3;
pub const INODE_TABLE_BLOCKS: usize = (INODE_SIZE * MAX_INODE).div_ceil(BLOCK_SIZE);
pub const INODES_PER_BLOCK: usize = BLOCK_SIZE / INODE_SIZE;
pub const DATA_START: usize = INODE_TABLE_START + INODE_TABLE_BLOCKS; // First block never reserved for metadata

pub const ROOT_INODE_ID: u32 = 0; // Inode ID for the root directory

pub const DIR_ENTRY_SIZE: usize = 32; // Size of a directory entry (name + inode ID)
pub const MAX_NAME_LEN: usize = DIR_ENTRY_SIZE - 4 - 1; // Name field minus inode ID and trailing NUL
pub const DIR_HEADER_SIZE: usize = 4; // Entry count in front of the entries
pub const MAX_DIR_ENTRY: usize = (BLOCK_SIZE - DIR_HEADER_SIZE) / DIR_ENTRY_SIZE;
pub const DOT_NAME: &str = ".";
pub const DOTDOT_NAME: &str = "..";

// Owner and group stamped on new inodes. Never checked.
pub const FILE_OWNER: u32 = 1;
pub const FILE_GROUP: u32 = 2;
pub const DIR_OWNER: u32 = 0;
pub const DIR_GROUP: u32 = 0;
