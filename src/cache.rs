//! The current-directory cache.
//!
//! Exactly one directory table is held in memory, together with the block it came from.
//! Mutations go to the in-memory table and mark it dirty. The table is written back
//! only by `flush`, which the file system calls on a directory switch and at unmount.

use log::debug;

use crate::directory::DirTable;
use crate::{BlockDevice, Result};

#[derive(Debug, Clone)]
pub struct CurrentDir {
    table: DirTable,
    block_id: u32,
    dirty: bool,
}

impl CurrentDir {
    /// Wraps a table that is already persisted at `block_id`.
    pub fn new(table: DirTable, block_id: u32) -> Self {
        Self {
            table,
            block_id,
            dirty: false,
        }
    }

    pub fn load(device: &impl BlockDevice, block_id: u32) -> Result<Self> {
        Ok(Self::new(DirTable::read(device, block_id)?, block_id))
    }

    pub fn table(&self) -> &DirTable {
        &self.table
    }

    /// Mutable access marks the cache dirty.
    pub fn table_mut(&mut self) -> &mut DirTable {
        self.dirty = true;
        &mut self.table
    }

    pub fn block_id(&self) -> u32 {
        self.block_id
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Writes the table back to its block if it has pending mutations.
    pub fn flush(&mut self, device: &impl BlockDevice) -> Result<()> {
        if self.dirty {
            debug!("flush directory block {}", self.block_id);
            self.table.write(device, self.block_id)?;
            self.dirty = false;
        }
        Ok(())
    }

    /// Flushes, then replaces the cached table with the one stored at `block_id`.
    pub fn switch(&mut self, device: &impl BlockDevice, block_id: u32) -> Result<()> {
        self.flush(device)?;
        *self = Self::load(device, block_id)?;
        debug!("switched to directory block {block_id}");
        Ok(())
    }
}
