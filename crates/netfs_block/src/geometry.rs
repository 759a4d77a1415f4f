//! Block/inode address-space geometry.
//!
//! All of these are fixed compile-time constants. This module is the
//! single source of truth for the on-disk layout; every other module
//! reads it rather than recomputing offsets.
//!
//! The free-block bitmap is *not* persisted into the blocks reserved for
//! it below: it lives purely as in-memory state in [`crate::BlockManager`]
//! (the block device is volatile, so nothing is gained by serializing it,
//! and the original protocol this core implements never did either). The
//! reserved bitmap region still exists in the address space so that
//! `DATA_START` is computed the same way a durable implementation's would
//! be.

use netfs_proto::BlockId;

/// Block size in bytes.
pub const BLOCK_SIZE: usize = 512;

/// Total number of blocks on the device.
pub const N_BLOCKS: usize = 4096;

/// Number of direct block pointers per inode.
pub const NDIRECT: usize = 32;

/// Number of block ids packed into one indirect block.
pub const NINDIRECT: usize = BLOCK_SIZE / size_of::<u32>();

/// Maximum number of data blocks a single inode can reference.
pub const MAX_FILE_BLOCKS: usize = NDIRECT + NINDIRECT;

/// Maximum file/directory/symlink content size in bytes.
pub const MAX_FILE_SIZE: usize = MAX_FILE_BLOCKS * BLOCK_SIZE;

/// Number of inode slots. Slot 0 is reserved; slot 1 is the root directory.
pub const INODE_NUM: usize = 64;

/// Size in bytes of one on-disk inode record (see [`crate::repr::RawInode`]).
pub const INODE_SIZE: usize = 152;

/// Inodes packed per block.
pub const IPB: usize = BLOCK_SIZE / INODE_SIZE;

/// Blocks needed to hold the whole inode table.
pub const INODE_BLOCKS: usize = INODE_NUM.div_ceil(IPB);

/// Block 0: the (logical-only) superblock.
pub const SUPERBLOCK: BlockId = BlockId::new(0);

/// Blocks reserved for the free-block bitmap's address range.
pub const BITMAP_BLOCKS: usize = 1;
pub const BITMAP_START: usize = 1;
pub const BITMAP_END: usize = BITMAP_START + BITMAP_BLOCKS;

/// Blocks holding the inode table.
pub const INODE_START: usize = BITMAP_END;
pub const INODE_END: usize = INODE_START + INODE_BLOCKS;

/// First data block; the allocator's rotating cursor starts here and
/// never returns a block id below it.
pub const DATA_START: usize = INODE_END;

const _: () = assert!(DATA_START < N_BLOCKS, "device too small for reserved regions");
const _: () = assert!(IPB > 0, "inode record does not fit in one block");
