use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FsError {
    #[error("{0} does not exist")]
    NotFound(String),
    #[error("{0} already exists")]
    NameExists(String),
    #[error("{0} is a directory")]
    IsDirectory(String),
    #[error("{0} is a file")]
    IsFile(String),
    #[error("invalid file name {0:?}")]
    InvalidName(String),
    #[error("invalid size {0}")]
    InvalidSize(i64),
    #[error("files larger than {max} bytes are not supported (requested {size})")]
    FileTooLarge { size: usize, max: usize },
    #[error("directory is full")]
    DirectoryFull,
    #[error("not enough free inodes")]
    OutOfInodes,
    #[error("not enough free data blocks (need {needed}, have {free})")]
    OutOfBlocks { needed: u32, free: u32 },
    #[error("read of {size} bytes exceeds file size {file_size}")]
    SizeExceedsFile { size: usize, file_size: usize },
    #[error("offset {0} is outside a block")]
    OffsetOutOfRange(usize),
    #[error("directory {0} is not empty")]
    NotEmpty(String),
    #[error("{0} is the current directory")]
    IsCurrentDirectory(String),
    #[error("{0} is the parent of the current directory")]
    IsParentOfCurrent(String),
    #[error("source {0} is a directory")]
    SourceIsDirectory(String),
    #[error("inode bitmap exhausted")]
    ExhaustedInodes,
    #[error("block bitmap exhausted")]
    ExhaustedBlocks,
    #[error("{kind} {id} is already free")]
    DoubleFree { kind: &'static str, id: u32 },
    #[error("block {0} is out of range")]
    InvalidBlockId(usize),
    #[error("invalid disk: bad magic number {0:#x}")]
    CorruptStore(u32),
    #[error("disk has {blocks} blocks, a file system needs {needed}")]
    DeviceTooSmall { blocks: usize, needed: usize },
    #[error("inconsistent file system: {0}")]
    Inconsistent(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FsError {
    /// Errors after which the session must not continue.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FsError::CorruptStore(_)
                | FsError::DeviceTooSmall { .. }
                | FsError::InvalidBlockId(_)
                | FsError::ExhaustedInodes
                | FsError::ExhaustedBlocks
                | FsError::Io(_)
        )
    }
}

pub type Result<T> = core::result::Result<T, FsError>;
