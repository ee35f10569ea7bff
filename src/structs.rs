use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::*;
use crate::Error;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileType {
    #[default]
    File,
    Directory,
}

impl FileType {
    fn to_raw(self) -> u32 {
        match self {
            FileType::File => 1,
            FileType::Directory => 2,
        }
    }

    fn from_raw(raw: u32) -> Self {
        match raw {
            2 => FileType::Directory,
            _ => FileType::File,
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileType::File => f.write_str("file"),
            FileType::Directory => f.write_str("dir"),
        }
    }
}

/// Seconds and microseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Timestamp {
    pub secs: u64,
    pub micros: u32,
}

impl Timestamp {
    pub fn now() -> Self {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self {
            secs: elapsed.as_secs(),
            micros: elapsed.subsec_micros(),
        }
    }
}

/// UTC calendar date of a day count since 1970-01-01.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

// Rendered in UTC: YYYY-MM-DD HH:MM:SS.uuuuuu
impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let days = (self.secs / 86_400) as i64;
        let rem = self.secs % 86_400;
        let (year, month, day) = civil_from_days(days);
        write!(
            f,
            "{year:04}-{month:02}-{day:02} {:02}:{:02}:{:02}.{:06}",
            rem / 3600,
            rem % 3600 / 60,
            rem % 60,
            self.micros
        )
    }
}

/// Metadata record of one file or directory, `INODE_SIZE` bytes on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Inode {
    pub kind: FileType,
    pub owner: u32,
    pub group: u32,
    pub created: Timestamp,
    pub last_access: Timestamp,
    pub size: u32,        // Bytes for files, always 1 for directories
    pub block_count: u32, // Number of valid entries in direct_ptrs
    pub link_count: u32,
    pub direct_ptrs: [u32; NUM_DIRECT_PTRS],
}

impl Inode {
    pub fn new(kind: FileType, owner: u32, group: u32) -> Self {
        let now = Timestamp::now();
        Self {
            kind,
            owner,
            group,
            created: now,
            last_access: now,
            ..Default::default()
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == FileType::Directory
    }

    /// Data blocks actually referenced by this inode.
    pub fn blocks(&self) -> &[u32] {
        let count = (self.block_count as usize).min(NUM_DIRECT_PTRS);
        &self.direct_ptrs[..count]
    }

    pub fn touch(&mut self) {
        self.last_access = Timestamp::now();
    }

    pub fn encode(&self, buf: &mut [u8]) {
        buf[..INODE_SIZE].fill(0);
        put_u32(buf, 0, self.kind.to_raw());
        put_u32(buf, 4, self.owner);
        put_u32(buf, 8, self.group);
        put_u64(buf, 12, self.created.secs);
        put_u32(buf, 20, self.created.micros);
        put_u64(buf, 24, self.last_access.secs);
        put_u32(buf, 32, self.last_access.micros);
        put_u32(buf, 36, self.size);
        put_u32(buf, 40, self.block_count);
        put_u32(buf, 44, self.link_count);
        for (i, ptr) in self.direct_ptrs.iter().enumerate() {
            put_u32(buf, 48 + i * 4, *ptr);
        }
    }

    pub fn decode(buf: &[u8]) -> Self {
        let mut direct_ptrs = [0; NUM_DIRECT_PTRS];
        for (i, ptr) in direct_ptrs.iter_mut().enumerate() {
            *ptr = get_u32(buf, 48 + i * 4);
        }
        Self {
            kind: FileType::from_raw(get_u32(buf, 0)),
            owner: get_u32(buf, 4),
            group: get_u32(buf, 8),
            created: Timestamp {
                secs: get_u64(buf, 12),
                micros: get_u32(buf, 20),
            },
            last_access: Timestamp {
                secs: get_u64(buf, 24),
                micros: get_u32(buf, 32),
            },
            size: get_u32(buf, 36),
            block_count: get_u32(buf, 40),
            link_count: get_u32(buf, 44),
            direct_ptrs,
        }
    }
}

/// One (name, inode) pair of a directory table, `DIR_ENTRY_SIZE` bytes on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub inode_id: u32,
}

impl DirEntry {
    pub fn new(name: &str, inode_id: u32) -> Result<Self> {
        if name.is_empty() || name.len() > MAX_NAME_LEN || name.contains('/') || name.contains('\0') {
            return Err(Error::InvalidName(name.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            inode_id,
        })
    }

    pub fn name_eq(&self, name: &str) -> bool {
        self.name == name
    }

    pub fn encode(&self, buf: &mut [u8]) {
        buf[..DIR_ENTRY_SIZE].fill(0);
        let bytes = self.name.as_bytes();
        buf[..bytes.len()].copy_from_slice(bytes);
        put_u32(buf, MAX_NAME_LEN + 1, self.inode_id);
    }

    pub fn decode(buf: &[u8]) -> Self {
        let field = &buf[..MAX_NAME_LEN + 1];
        let len = field.iter().position(|&c| c == 0).unwrap_or(field.len());
        Self {
            name: String::from_utf8_lossy(&field[..len]).into_owned(),
            inode_id: get_u32(buf, MAX_NAME_LEN + 1),
        }
    }
}

pub(crate) fn put_u32(buf: &mut [u8], at: usize, value: u32) {
    buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

pub(crate) fn put_u64(buf: &mut [u8], at: usize, value: u64) {
    buf[at..at + 8].copy_from_slice(&value.to_le_bytes());
}

pub(crate) fn get_u32(buf: &[u8], at: usize) -> u32 {
    let mut raw = [0; 4];
    raw.copy_from_slice(&buf[at..at + 4]);
    u32::from_le_bytes(raw)
}

pub(crate) fn get_u64(buf: &[u8], at: usize) -> u64 {
    let mut raw = [0; 8];
    raw.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(raw)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_inode_layout_fits() {
        assert!(48 + NUM_DIRECT_PTRS * 4 <= INODE_SIZE);
        let mut inode = Inode::new(FileType::Directory, DIR_OWNER, DIR_GROUP);
        inode.size = 1;
        inode.block_count = 1;
        inode.link_count = 1;
        inode.direct_ptrs[0] = 131;
        let mut buf = [0u8; INODE_SIZE];
        inode.encode(&mut buf);
        assert_eq!(Inode::decode(&buf), inode);
    }

    #[test]
    fn test_timestamp_display() {
        let epoch = Timestamp::default();
        assert_eq!(epoch.to_string(), "1970-01-01 00:00:00.000000");
        let ts = Timestamp {
            secs: 1_000_000_000,
            micros: 42,
        };
        assert_eq!(ts.to_string(), "2001-09-09 01:46:40.000042");
        let leap = Timestamp {
            secs: 951_782_400,
            micros: 0,
        };
        assert_eq!(leap.to_string(), "2000-02-29 00:00:00.000000");
    }

    #[test]
    fn test_dir_entry_name() {
        assert!(DirEntry::new("", 1).is_err());
        assert!(DirEntry::new("a/b", 1).is_err());
        assert!(DirEntry::new(&"x".repeat(MAX_NAME_LEN + 1), 1).is_err());

        let entry = DirEntry::new(&"x".repeat(MAX_NAME_LEN), 7).unwrap();
        let mut buf = [0xffu8; DIR_ENTRY_SIZE];
        entry.encode(&mut buf);
        // The name field always keeps a trailing NUL.
        assert_eq!(buf[MAX_NAME_LEN], 0);
        assert_eq!(DirEntry::decode(&buf), entry);
    }
}
