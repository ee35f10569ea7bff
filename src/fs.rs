use std::fmt;
use std::sync::Arc;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::bitmap::Allocator;
use crate::cache::CurrentDir;
use crate::config::*;
use crate::directory::DirTable;
use crate::file::{filler, fread, fwrite_blocks};
use crate::inode::{check_inode, InodeTable};
use crate::structs::*;
use crate::superblock::{read_superblock, write_superblock, SuperBlock};
use crate::{BlockDevice, Error, Result};

/// Snapshot of one inode as reported by `stat`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InodeStat {
    pub inode_id: u32,
    pub kind: FileType,
    pub owner: u32,
    pub group: u32,
    pub size: u32,
    pub link_count: u32,
    pub block_count: u32,
    pub created: Timestamp,
    pub last_access: Timestamp,
}

impl fmt::Display for InodeStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            FileType::File => "File",
            FileType::Directory => "Directory",
        };
        writeln!(f, "Inode\t\t= {}", self.inode_id)?;
        writeln!(f, "type\t\t= {kind}")?;
        writeln!(f, "owner\t\t= {}", self.owner)?;
        writeln!(f, "group\t\t= {}", self.group)?;
        writeln!(f, "size\t\t= {}", self.size)?;
        writeln!(f, "link_count\t= {}", self.link_count)?;
        writeln!(f, "num of block\t= {}", self.block_count)?;
        writeln!(f, "Created time\t= {}", self.created)?;
        write!(f, "Last acc. time\t= {}", self.last_access)
    }
}

/// One line of `ls`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub name: String,
    pub inode_id: u32,
    pub kind: FileType,
    pub size: u32,
}

impl fmt::Display for ListEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "type: {}, name \"{}\", inode {}, size {} byte",
            self.kind, self.name, self.inode_id, self.size
        )
    }
}

/// Free space as reported by `df`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsStats {
    pub free_blocks: u32,
    pub free_inodes: u32,
    pub free_bytes: u64,
}

impl fmt::Display for FsStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "File System Status: ")?;
        write!(
            f,
            "# of free blocks: {} ({} bytes), # of free inodes: {}",
            self.free_blocks, self.free_bytes, self.free_inodes
        )
    }
}

fn check_device(device: &impl BlockDevice) -> Result<()> {
    let blocks = device.num_blocks();
    if blocks < MAX_BLOCK {
        return Err(Error::DeviceTooSmall {
            blocks,
            needed: MAX_BLOCK,
        });
    }
    Ok(())
}

/// A mounted session. Owns the in-memory bitmaps, inode table and current-directory cache
/// from `mount` until `unmount`.
#[derive(Debug)]
pub struct FileSystem<D: BlockDevice> {
    device: Arc<D>,
    alloc: Allocator,
    inodes: InodeTable,
    cwd: CurrentDir,
    rng: StdRng,
}

impl<D: BlockDevice> FileSystem<D> {
    /// Loads the file system stored on `device`, or initializes one if the store is blank.
    /// A store whose superblock carries the wrong magic number is rejected as corrupt.
    pub fn mount(device: Arc<D>) -> Result<Self> {
        check_device(&*device)?;
        let rng = StdRng::from_os_rng();
        match read_superblock(&*device)? {
            Some(superblock) => Self::load(device, superblock, rng),
            None => Self::format(device, rng),
        }
    }

    /// Loads a store known to hold a file system, e.g. a disk image that already existed.
    /// A blank store is as corrupt as one with the wrong magic number.
    pub fn mount_existing(device: Arc<D>) -> Result<Self> {
        check_device(&*device)?;
        match read_superblock(&*device)? {
            Some(superblock) => Self::load(device, superblock, StdRng::from_os_rng()),
            None => Err(Error::CorruptStore(0)),
        }
    }

    fn load(device: Arc<D>, superblock: SuperBlock, rng: StdRng) -> Result<Self> {
        let alloc = Allocator::load(&*device, superblock)?;
        let inodes = InodeTable::load(&*device)?;
        let root_block = inodes.get(ROOT_INODE_ID)?.direct_ptrs[0];
        let cwd = CurrentDir::load(&*device, root_block)?;
        info!(
            "mounted: {} free blocks, {} free inodes",
            superblock.free_block_count, superblock.free_inode_count
        );

        Ok(Self {
            device,
            alloc,
            inodes,
            cwd,
            rng,
        })
    }

    fn format(device: Arc<D>, rng: StdRng) -> Result<Self> {
        let mut alloc = Allocator::format();
        let mut inodes = InodeTable::new();

        let root_inode_id = alloc.alloc_inode()?;
        let root_block = alloc.alloc_block()?;
        let mut root = Inode::new(FileType::Directory, DIR_OWNER, DIR_GROUP);
        root.size = 1;
        root.block_count = 1;
        root.link_count = 1;
        root.direct_ptrs[0] = root_block;
        inodes.set(root_inode_id, root)?;

        let table = DirTable::new_root(root_inode_id);
        table.write(&*device, root_block)?;
        info!("initialized new file system, root directory at block {root_block}");

        Ok(Self {
            device,
            alloc,
            inodes,
            cwd: CurrentDir::new(table, root_block),
            rng,
        })
    }

    /// Reseeds the filler content source, for reproducible file content.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Writes superblock, bitmaps, inode table and the current directory back, then closes the store.
    pub fn unmount(mut self) -> Result<()> {
        write_superblock(&*self.device, &self.alloc.superblock)?;
        self.alloc.store(&*self.device)?;
        self.inodes.store(&*self.device)?;
        self.cwd.flush(&*self.device)?;
        self.device.flush()?;
        info!("unmounted");
        Ok(())
    }

    // Name resolution only looks at the cached current directory.
    fn resolve(&self, name: &str) -> Result<u32> {
        self.cwd
            .table()
            .lookup(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    /// Common admission checks for a new name in the current directory.
    fn check_new_name(&self, name: &str) -> Result<()> {
        if self.cwd.table().lookup(name).is_some() {
            return Err(Error::NameExists(name.to_string()));
        }
        if name == DOT_NAME || name == DOTDOT_NAME {
            return Err(Error::InvalidName(name.to_string()));
        }
        DirEntry::new(name, 0)?;
        Ok(())
    }

    fn touch_cwd(&mut self) -> Result<()> {
        let cwd_inode = self.cwd.table().self_inode();
        self.inodes.get_mut(cwd_inode)?.touch();
        Ok(())
    }

    /// Creates a file of `size` bytes of filler content in the current directory.
    /// Returns its inode ID.
    pub fn create(&mut self, name: &str, size: i64) -> Result<u32> {
        self.check_new_name(name)?;
        if size < 0 {
            return Err(Error::InvalidSize(size));
        }
        let size = size as usize;
        if size > SMALL_FILE {
            return Err(Error::FileTooLarge {
                size,
                max: SMALL_FILE,
            });
        }
        if self.cwd.table().is_full() {
            return Err(Error::DirectoryFull);
        }

        let num_blocks = size.div_ceil(BLOCK_SIZE) as u32;
        let superblock = self.alloc.superblock;
        if num_blocks > superblock.free_block_count {
            return Err(Error::OutOfBlocks {
                needed: num_blocks,
                free: superblock.free_block_count,
            });
        }
        if superblock.free_inode_count < 1 {
            return Err(Error::OutOfInodes);
        }

        let content = filler(&mut self.rng, size);

        let inode_id = self.alloc.alloc_inode()?;
        let mut inode = Inode::new(FileType::File, FILE_OWNER, FILE_GROUP);
        inode.size = size as u32;
        inode.block_count = num_blocks;
        inode.link_count = 1;

        // Exhaustion or a device failure past this point is fatal and not rolled back.
        for ptr in inode.direct_ptrs.iter_mut().take(num_blocks as usize) {
            *ptr = self.alloc.alloc_block()?;
        }
        self.inodes.set(inode_id, inode)?;
        fwrite_blocks(&*self.device, inode.blocks(), &content)?;

        self.cwd
            .table_mut()
            .add_entry(DirEntry::new(name, inode_id)?)?;
        self.touch_cwd()?;

        info!("file created: {name}, inode {inode_id}, size {size}");
        Ok(inode_id)
    }

    /// Reads `size` bytes of `name`, applying `offset` within each of its blocks.
    pub fn read(&mut self, name: &str, offset: usize, size: usize) -> Result<Vec<u8>> {
        let inode_id = self.resolve(name)?;
        let inode = self.inodes.get(inode_id)?;
        if inode.is_dir() {
            return Err(Error::IsDirectory(name.to_string()));
        }

        let data = fread(&*self.device, inode, offset, size)?;
        self.inodes.get_mut(inode_id)?.touch();
        debug!("read {size} bytes of {name} at block offset {offset}");
        Ok(data)
    }

    /// Whole content of `name`.
    pub fn cat(&mut self, name: &str) -> Result<Vec<u8>> {
        let inode_id = self.resolve(name)?;
        let size = self.inodes.get(inode_id)?.size as usize;
        self.read(name, 0, size)
    }

    pub fn stat(&self, name: &str) -> Result<InodeStat> {
        let inode_id = self.resolve(name)?;
        let inode = self.inodes.get(inode_id)?;
        Ok(InodeStat {
            inode_id,
            kind: inode.kind,
            owner: inode.owner,
            group: inode.group,
            size: inode.size,
            link_count: inode.link_count,
            block_count: inode.block_count,
            created: inode.created,
            last_access: inode.last_access,
        })
    }

    /// Removes the name `name`. The inode and its blocks are reclaimed with the last link.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        let inode_id = self.resolve(name)?;
        let inode = *self.inodes.get(inode_id)?;
        if inode.is_dir() {
            return Err(Error::IsDirectory(name.to_string()));
        }

        self.cwd.table_mut().remove_entry(name)?;
        if inode.link_count > 1 {
            let inode = self.inodes.get_mut(inode_id)?;
            inode.link_count -= 1;
            inode.touch();
            info!("unlinked {name}, inode {inode_id} has {} links left", inode.link_count);
        } else {
            for &block_id in inode.blocks() {
                self.alloc.free_block(block_id)?;
            }
            self.alloc.free_inode(inode_id)?;
            self.inodes.set(inode_id, Inode::default())?;
            info!("file removed: {name}, inode {inode_id}");
        }
        self.touch_cwd()
    }

    /// Adds `dest` as a second name of the file `src`.
    pub fn link(&mut self, src: &str, dest: &str) -> Result<()> {
        let inode_id = self.resolve(src)?;
        let inode = self.inodes.get(inode_id)?;
        if inode.is_dir() {
            return Err(Error::SourceIsDirectory(src.to_string()));
        }
        self.check_new_name(dest)?;
        if self.cwd.table().is_full() {
            return Err(Error::DirectoryFull);
        }

        // Same admission control as create, though nothing is allocated.
        let superblock = self.alloc.superblock;
        if inode.block_count > superblock.free_block_count {
            return Err(Error::OutOfBlocks {
                needed: inode.block_count,
                free: superblock.free_block_count,
            });
        }
        if superblock.free_inode_count < 1 {
            return Err(Error::OutOfInodes);
        }

        self.cwd
            .table_mut()
            .add_entry(DirEntry::new(dest, inode_id)?)?;
        let inode = self.inodes.get_mut(inode_id)?;
        inode.link_count += 1;
        inode.touch();
        self.touch_cwd()?;

        info!("linked {dest} -> {src}, inode {inode_id}");
        Ok(())
    }

    /// Creates an empty subdirectory. Its table is written to disk right away.
    pub fn mkdir(&mut self, name: &str) -> Result<u32> {
        self.check_new_name(name)?;
        if self.cwd.table().is_full() {
            return Err(Error::DirectoryFull);
        }
        let superblock = self.alloc.superblock;
        if superblock.free_inode_count < 1 {
            return Err(Error::OutOfInodes);
        }
        if superblock.free_block_count < 1 {
            return Err(Error::OutOfBlocks {
                needed: 1,
                free: superblock.free_block_count,
            });
        }

        let inode_id = self.alloc.alloc_inode()?;
        let block_id = self.alloc.alloc_block()?;
        let mut inode = Inode::new(FileType::Directory, DIR_OWNER, DIR_GROUP);
        inode.size = 1;
        inode.block_count = 1;
        inode.link_count = 1;
        inode.direct_ptrs[0] = block_id;

        self.inodes.set(inode_id, inode)?;
        let parent_inode_id = self.cwd.table().self_inode();
        DirTable::new_child(inode_id, parent_inode_id).write(&*self.device, block_id)?;
        self.cwd
            .table_mut()
            .add_entry(DirEntry::new(name, inode_id)?)?;
        self.touch_cwd()?;

        info!("directory created: {name}, inode {inode_id}, block {block_id}");
        Ok(inode_id)
    }

    /// Removes an empty subdirectory of the current directory.
    /// Only the current directory and its immediate parent are protected.
    pub fn rmdir(&mut self, name: &str) -> Result<()> {
        let inode_id = self.resolve(name)?;
        let inode = *self.inodes.get(inode_id)?;
        if !inode.is_dir() {
            return Err(Error::IsFile(name.to_string()));
        }
        if inode_id == self.cwd.table().self_inode() {
            return Err(Error::IsCurrentDirectory(name.to_string()));
        }
        if self.cwd.table().parent_inode() == Some(inode_id) {
            return Err(Error::IsParentOfCurrent(name.to_string()));
        }

        let block_id = inode.direct_ptrs[0];
        let target = DirTable::read(&*self.device, block_id)?;
        if target.has_children() {
            return Err(Error::NotEmpty(name.to_string()));
        }

        self.cwd.table_mut().remove_entry(name)?;
        self.alloc.free_block(block_id)?;
        self.alloc.free_inode(inode_id)?;
        self.inodes.set(inode_id, Inode::default())?;
        self.touch_cwd()?;

        info!("directory removed: {name}, inode {inode_id}");
        Ok(())
    }

    /// Makes `name` the current directory. Pending changes of the old one are flushed first.
    pub fn cd(&mut self, name: &str) -> Result<()> {
        let inode_id = self.resolve(name)?;
        let inode = self.inodes.get(inode_id)?;
        if !inode.is_dir() {
            return Err(Error::IsFile(name.to_string()));
        }

        let block_id = inode.direct_ptrs[0];
        self.cwd.switch(&*self.device, block_id)?;
        self.inodes.get_mut(inode_id)?.touch();
        info!("changed directory to {name}, inode {inode_id}");
        Ok(())
    }

    pub fn ls(&self) -> Result<Vec<ListEntry>> {
        self.cwd
            .table()
            .entries()
            .iter()
            .map(|entry| {
                let inode = self.inodes.get(entry.inode_id)?;
                Ok(ListEntry {
                    name: entry.name.clone(),
                    inode_id: entry.inode_id,
                    kind: inode.kind,
                    size: inode.size,
                })
            })
            .collect()
    }

    pub fn df(&self) -> FsStats {
        let superblock = self.alloc.superblock;
        FsStats {
            free_blocks: superblock.free_block_count,
            free_inodes: superblock.free_inode_count,
            free_bytes: superblock.free_block_count as u64 * BLOCK_SIZE as u64,
        }
    }

    /// Verifies counters against bitmaps and the invariants of every occupied inode.
    pub fn check_consistency(&self) -> Result<()> {
        self.alloc.check()?;
        for (inode_id, inode) in self.inodes.iter() {
            if !self.alloc.inode_in_use(inode_id) {
                continue;
            }
            check_inode(inode_id, inode)?;
            if let Some(&block_id) = inode.blocks().iter().find(|&&b| !self.alloc.block_in_use(b)) {
                return Err(Error::Inconsistent(format!(
                    "inode {inode_id} points at free block {block_id}"
                )));
            }
        }
        Ok(())
    }

    pub fn superblock(&self) -> &SuperBlock {
        self.alloc.superblock()
    }

    pub fn inode(&self, inode_id: u32) -> Result<&Inode> {
        self.inodes.get(inode_id)
    }

    /// Inode ID of the current directory.
    pub fn cwd_inode(&self) -> u32 {
        self.cwd.table().self_inode()
    }

    pub fn cwd(&self) -> &CurrentDir {
        &self.cwd
    }
}
