//! On-disk (well: on-block-array) record layouts.

use dataview::Pod;

use crate::geometry::{BLOCK_SIZE, INODE_SIZE, NDIRECT, NINDIRECT};

/// The on-disk inode record. Exactly [`INODE_SIZE`] bytes so that
/// [`crate::geometry::IPB`] inodes pack into one block.
///
/// `ty == 0` means the slot is free; this mirrors the data model's
/// "type=0 means the slot is free; any nonzero type means allocated."
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod)]
pub struct RawInode {
    pub ty: u16,
    _reserved: u16,
    pub size: u32,
    pub atime: u32,
    pub mtime: u32,
    pub ctime: u32,
    pub addrs: [u32; NDIRECT + 1],
}

const _: () = assert!(size_of::<RawInode>() == INODE_SIZE);

impl RawInode {
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.ty == 0
    }

    /// The direct block pointers, `addrs[0..NDIRECT]`.
    #[must_use]
    pub fn direct(&self) -> &[u32; NDIRECT] {
        self.addrs[..NDIRECT].try_into().unwrap()
    }

    pub fn direct_mut(&mut self) -> &mut [u32; NDIRECT] {
        (&mut self.addrs[..NDIRECT]).try_into().unwrap()
    }

    /// The single indirect block pointer, `addrs[NDIRECT]` (0 if unused).
    #[must_use]
    pub fn indirect(&self) -> u32 {
        self.addrs[NDIRECT]
    }

    pub fn set_indirect(&mut self, bn: u32) {
        self.addrs[NDIRECT] = bn;
    }
}

/// An indirect block: a packed array of `NINDIRECT` 32-bit block ids.
#[repr(transparent)]
#[derive(Clone, Copy, Pod)]
pub struct RawIndirectBlock(pub [u32; NINDIRECT]);

const _: () = assert!(size_of::<RawIndirectBlock>() == BLOCK_SIZE);

impl RawIndirectBlock {
    #[must_use]
    pub fn get(&self, i: usize) -> u32 {
        self.0[i]
    }

    pub fn set(&mut self, i: usize, bn: u32) {
        self.0[i] = bn;
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }
}
