//! Block device and free-block allocator.
//!
//! This crate is the lowest layer of the netfs core: a fixed-size block
//! address space, the on-disk record layouts that live inside it, and
//! the allocator that hands out free blocks. `netfs_inode` builds the
//! inode table on top of this.

pub mod device;
pub mod error;
pub mod geometry;
pub mod manager;
pub mod repr;

pub use device::BlockDevice;
pub use error::BlockError;
pub use manager::BlockManager;
pub use repr::{RawIndirectBlock, RawInode};
