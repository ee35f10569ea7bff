//! One-block directory tables.
//!
//! A table is an ordered list of entries stored as the whole content of a single data block:
//! a little-endian entry count followed by `MAX_DIR_ENTRY` fixed-size slots.
//! Entry 0 is always "." (the directory itself), entry 1 of a non-root directory is "..".

use crate::config::*;
use crate::error::{FsError, Result};
use crate::structs::{get_u32, put_u32, DirEntry};
use crate::BlockDevice;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirTable {
    entries: Vec<DirEntry>,
}

impl DirTable {
    /// Table of the root directory: only "." pointing at itself.
    pub fn new_root(inode_id: u32) -> Self {
        Self {
            entries: vec![DirEntry {
                name: DOT_NAME.to_string(),
                inode_id,
            }],
        }
    }

    /// Table of a new subdirectory: "." and "..".
    pub fn new_child(inode_id: u32, parent_inode_id: u32) -> Self {
        Self {
            entries: vec![
                DirEntry {
                    name: DOT_NAME.to_string(),
                    inode_id,
                },
                DirEntry {
                    name: DOTDOT_NAME.to_string(),
                    inode_id: parent_inode_id,
                },
            ],
        }
    }

    pub fn entries(&self) -> &[DirEntry] {
        &self.entries
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= MAX_DIR_ENTRY
    }

    /// Inode of the directory itself, from its "." entry.
    pub fn self_inode(&self) -> u32 {
        self.entries[0].inode_id
    }

    /// Inode of the parent, from the ".." entry. The root has none.
    pub fn parent_inode(&self) -> Option<u32> {
        self.entries
            .get(1)
            .filter(|entry| entry.name_eq(DOTDOT_NAME))
            .map(|entry| entry.inode_id)
    }

    /// Only "." and ".." left.
    pub fn has_children(&self) -> bool {
        self.entries.len() > 2
    }

    pub fn lookup(&self, name: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|entry| entry.name_eq(name))
            .map(|entry| entry.inode_id)
    }

    /// Appends an entry. Does not touch the link count of the target inode.
    pub fn add_entry(&mut self, entry: DirEntry) -> Result<()> {
        if self.is_full() {
            return Err(FsError::DirectoryFull);
        }
        if self.lookup(&entry.name).is_some() {
            return Err(FsError::NameExists(entry.name));
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Removes the entry named `name`, shifting later entries left.
    pub fn remove_entry(&mut self, name: &str) -> Result<DirEntry> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.name_eq(name))
            .ok_or_else(|| FsError::NotFound(name.to_string()))?;
        Ok(self.entries.remove(index))
    }

    pub fn encode(&self, buf: &mut [u8]) {
        buf[..BLOCK_SIZE].fill(0);
        put_u32(buf, 0, self.entries.len() as u32);
        for (i, entry) in self.entries.iter().enumerate() {
            let at = DIR_HEADER_SIZE + i * DIR_ENTRY_SIZE;
            entry.encode(&mut buf[at..at + DIR_ENTRY_SIZE]);
        }
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        let num_entry = get_u32(buf, 0) as usize;
        if num_entry == 0 || num_entry > MAX_DIR_ENTRY {
            return Err(FsError::Inconsistent(format!(
                "directory block holds {num_entry} entries"
            )));
        }
        let entries = (0..num_entry)
            .map(|i| {
                let at = DIR_HEADER_SIZE + i * DIR_ENTRY_SIZE;
                DirEntry::decode(&buf[at..at + DIR_ENTRY_SIZE])
            })
            .collect();
        Ok(Self { entries })
    }

    pub fn read(device: &impl BlockDevice, block_id: u32) -> Result<Self> {
        let mut buf = [0u8; BLOCK_SIZE];
        device.read_block(block_id as usize, &mut buf)?;
        Self::decode(&buf)
    }

    pub fn write(&self, device: &impl BlockDevice, block_id: u32) -> Result<()> {
        let mut buf = [0u8; BLOCK_SIZE];
        self.encode(&mut buf);
        device.write_block(block_id as usize, &buf)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_layout_fits_one_block() {
        assert!(DIR_HEADER_SIZE + MAX_DIR_ENTRY * DIR_ENTRY_SIZE <= BLOCK_SIZE);
    }

    #[test]
    fn test_root_and_child() {
        let root = DirTable::new_root(0);
        assert_eq!(root.self_inode(), 0);
        assert_eq!(root.parent_inode(), None);

        let child = DirTable::new_child(4, 0);
        assert_eq!(child.self_inode(), 4);
        assert_eq!(child.parent_inode(), Some(0));
        assert!(!child.has_children());
    }

    #[test]
    fn test_remove_compacts() {
        let mut dir = DirTable::new_root(0);
        for (i, name) in ["a", "b", "c"].iter().enumerate() {
            dir.add_entry(DirEntry::new(name, i as u32 + 1).unwrap()).unwrap();
        }
        assert_eq!(dir.remove_entry("b").unwrap().inode_id, 2);
        let names: Vec<&str> = dir.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, [".", "a", "c"]);
        assert!(matches!(dir.remove_entry("b"), Err(FsError::NotFound(_))));
    }

    #[test]
    fn test_full_and_duplicate() {
        let mut dir = DirTable::new_root(0);
        assert!(matches!(
            dir.add_entry(DirEntry::new(".", 0).unwrap()),
            Err(FsError::NameExists(_))
        ));
        for i in 1..MAX_DIR_ENTRY {
            dir.add_entry(DirEntry::new(&format!("f{i}"), i as u32).unwrap()).unwrap();
        }
        assert!(dir.is_full());
        assert!(matches!(
            dir.add_entry(DirEntry::new("extra", 99).unwrap()),
            Err(FsError::DirectoryFull)
        ));

        let mut buf = [0u8; BLOCK_SIZE];
        dir.encode(&mut buf);
        assert_eq!(DirTable::decode(&buf).unwrap(), dir);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let buf = [0u8; BLOCK_SIZE];
        assert!(DirTable::decode(&buf).is_err());
    }
}
