//! A small single-user file system simulated on a fixed-size block device.
//! Permissions are stored but never checked; there are no indirect blocks and no journaling.
//!
//! Linear layout of the backing store:
//! - Superblock                (block 0)
//! - Inode Bitmap              (block 1)
//! - Block Bitmap              (block 2)
//! - Inode Table               (blocks 3..DATA_START)
//! - Data Blocks               (file content and one-block directory tables)
//!
//! Layers (from bottom to top):
//! 1. Block Device: the backing store, read and written one block at a time.
//! 2. Bitmap / Inode Table: in-memory mirrors of the metadata region, written back at unmount.
//! 3. Directory: one-block directory tables and the cached current directory.
//! 4. FileSystem: the mounted session exposing create, read, rm, ln, mkdir, rmdir, cd, ls, df.
//! 5. Shell: line-oriented commands mapped onto FileSystem operations.

mod config;
mod block_dev;
mod block_file;
mod structs;
mod superblock;
mod bitmap;
mod inode;
mod directory;
mod cache;
mod file;
mod fs;
mod error;
pub mod shell;

pub use block_dev::BlockDevice;
pub use block_file::BlockFile;
pub use config::*;
pub use superblock::*;
pub use structs::*;
pub use bitmap::{Allocator, Bitmap};
pub use inode::InodeTable;
pub use directory::DirTable;
pub use cache::CurrentDir;
pub use fs::*;
pub use error::FsError as Error;
pub use error::Result;
