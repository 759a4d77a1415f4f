use std::fmt;

use dataview::Pod;
use serde::{Deserialize, Serialize};

/// Block-device block id. Block 0 is the superblock; the bitmap, inode
/// table, and data regions follow, per `netfs_block::geometry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Serialize, Deserialize)]
#[repr(transparent)]
pub struct BlockId(u32);

impl BlockId {
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn as_index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inode number, `0` reserved, `1` the root directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Serialize, Deserialize)]
#[repr(transparent)]
pub struct InodeNo(u32);

impl InodeNo {
    pub const ROOT: Self = Self::new(1);

    #[must_use]
    pub const fn new(n: u32) -> Self {
        Self(n)
    }

    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn as_index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for InodeNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Extent id, `eid`. In this system there is one extent per inode and
/// `eid == inum`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ExtentId(u64);

impl ExtentId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ExtentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<InodeNo> for ExtentId {
    fn from(inum: InodeNo) -> Self {
        Self(u64::from(inum.value()))
    }
}

/// Lock id, `lockid_t`. Lock ids coincide with inode numbers: one lock
/// guards exactly one inode's metadata and content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct LockId(u64);

impl LockId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<InodeNo> for LockId {
    fn from(inum: InodeNo) -> Self {
        Self(u64::from(inum.value()))
    }
}

impl From<ExtentId> for LockId {
    fn from(eid: ExtentId) -> Self {
        Self(eid.value())
    }
}

/// A lock client's callback RPC endpoint, `"host:port"`. Unique per live
/// client.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClientId(String);

impl ClientId {
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self(endpoint.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ClientId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ClientId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inode_no_round_trips_into_lock_and_extent_ids() {
        let inum = InodeNo::new(42);
        assert_eq!(LockId::from(inum).value(), 42);
        assert_eq!(ExtentId::from(inum).value(), 42);
    }
}
