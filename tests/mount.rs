mod common;

use std::sync::Arc;

use common::{fresh, names, RamDisk};
use simfs::{BlockDevice, BlockFile, Error, FileSystem, BLOCK_SIZE, DATA_START, MAX_BLOCK};

#[test]
fn test_end_to_end() {
    let (rd, mut fs) = fresh();
    fs.create("a.txt", 100).unwrap();
    let stat = fs.stat("a.txt").unwrap();
    assert_eq!((stat.size, stat.link_count), (100, 1));

    fs.link("a.txt", "b.txt").unwrap();
    assert_eq!(fs.stat("a.txt").unwrap().link_count, 2);
    assert_eq!(fs.stat("b.txt").unwrap().link_count, 2);
    assert_eq!(fs.stat("b.txt").unwrap().size, 100);
    let content = fs.cat("b.txt").unwrap();

    fs.remove("a.txt").unwrap();
    assert_eq!(fs.stat("b.txt").unwrap().link_count, 1);
    let before = *fs.superblock();
    fs.unmount().unwrap();

    let mut fs = FileSystem::mount(rd).unwrap();
    assert_eq!(names(&fs), [".", "b.txt"]);
    assert_eq!(*fs.superblock(), before);
    assert_eq!(fs.stat("b.txt").unwrap().link_count, 1);
    assert_eq!(fs.cat("b.txt").unwrap(), content);
    fs.check_consistency().unwrap();
}

#[test]
fn test_remount_starts_at_root() {
    let (rd, mut fs) = fresh();
    fs.mkdir("d").unwrap();
    fs.cd("d").unwrap();
    fs.create("inner", 3).unwrap();
    fs.unmount().unwrap();

    let mut fs = FileSystem::mount(rd).unwrap();
    assert_eq!(names(&fs), [".", "d"]);
    fs.cd("d").unwrap();
    assert_eq!(names(&fs), [".", "..", "inner"]);
    fs.check_consistency().unwrap();
}

#[test]
fn test_corrupt_store() {
    let rd = Arc::new(RamDisk::new(MAX_BLOCK));
    rd.write_block(0, &[0xab; BLOCK_SIZE]).unwrap();
    let err = FileSystem::mount(rd).unwrap_err();
    assert!(matches!(err, Error::CorruptStore(_)));
    assert!(err.is_fatal());
}

#[test]
fn test_device_too_small() {
    let rd = Arc::new(RamDisk::new(DATA_START + 4));
    let err = FileSystem::mount(rd.clone()).unwrap_err();
    assert!(matches!(
        err,
        Error::DeviceTooSmall { blocks, needed } if blocks == DATA_START + 4 && needed == MAX_BLOCK
    ));
    assert!(err.is_fatal());
    assert!(matches!(
        FileSystem::mount_existing(rd.clone()),
        Err(Error::DeviceTooSmall { .. })
    ));
    // Nothing was formatted.
    assert!(rd.block(0).iter().all(|&b| b == 0));
}

#[test]
fn test_mount_existing() {
    let rd = Arc::new(RamDisk::new(MAX_BLOCK));
    let err = FileSystem::mount_existing(rd.clone()).unwrap_err();
    assert!(matches!(err, Error::CorruptStore(0)));

    let mut fs = FileSystem::mount(rd.clone()).unwrap();
    fs.create("a.txt", 10).unwrap();
    fs.unmount().unwrap();

    let fs = FileSystem::mount_existing(rd).unwrap();
    assert_eq!(names(&fs), [".", "a.txt"]);
    fs.check_consistency().unwrap();
}

#[test]
fn test_failed_write_is_fatal() {
    let (rd, mut fs) = fresh();
    fs.create("kept", 10).unwrap();
    rd.set_read_only(true);

    let err = fs.create("a.txt", 1000).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
    assert!(err.is_fatal());
    let err = fs.mkdir("d").unwrap_err();
    assert!(err.is_fatal());

    // No entry points at a half-made inode.
    assert_eq!(names(&fs), [".", "kept"]);
    assert!(matches!(fs.stat("a.txt"), Err(Error::NotFound(_))));
    fs.check_consistency().unwrap();
}

#[test]
fn test_block_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("disk.img");

    let (disk, existed) = BlockFile::open(&path).unwrap();
    assert!(!existed);
    assert_eq!(disk.num_blocks(), MAX_BLOCK);
    let mut fs = FileSystem::mount(Arc::new(disk)).unwrap();
    fs.create("kept", 1000).unwrap();
    let content = fs.cat("kept").unwrap();
    fs.unmount().unwrap();

    let (disk, existed) = BlockFile::open(&path).unwrap();
    assert!(existed);
    let mut fs = FileSystem::mount_existing(Arc::new(disk)).unwrap();
    assert_eq!(fs.cat("kept").unwrap(), content);
    fs.unmount().unwrap();
}
