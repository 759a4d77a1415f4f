use serde::{Deserialize, Serialize};
use strum::FromRepr;

/// Inode file type. `0` ("free") has no variant here: a free inode slot
/// is represented by the *absence* of an [`Attr`], not by a zero value
/// of this enum (see `netfs_inode::InodeManager::getattr`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr, Serialize, Deserialize)]
#[repr(u32)]
pub enum FileType {
    File = 1,
    Dir = 2,
    Symlink = 3,
}

impl FileType {
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self as u32
    }
}

/// `getattr` result: `{type, size, atime, mtime, ctime}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attr {
    pub ty: FileType,
    pub size: u64,
    pub atime: u32,
    pub mtime: u32,
    pub ctime: u32,
}
