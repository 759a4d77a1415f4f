use dataview::PodMethods as _;
use log::{debug, trace};
use netfs_block::geometry::{INODE_NUM, INODE_SIZE, INODE_START, IPB, NDIRECT, NINDIRECT};
use netfs_block::{BlockManager, RawIndirectBlock, RawInode};
use netfs_proto::{Attr, BlockId, FileType, InodeNo};

use crate::error::InodeError;

/// The inode table and the allocator and read/write operations over it.
///
/// Inode 0 is never allocated; inode 1 is always the root directory,
/// created by [`InodeManager::new`]. Allocation uses the same
/// rotating-cursor next-fit strategy as [`BlockManager`], scanning the
/// inode table starting just past the last inode handed out.
pub struct InodeManager {
    blocks: BlockManager,
    used: Vec<bool>,
    cursor: u32,
}

fn inode_block(inum: InodeNo) -> BlockId {
    BlockId::new((INODE_START + inum.as_index() / IPB) as u32)
}

fn inode_offset(inum: InodeNo) -> usize {
    (inum.as_index() % IPB) * INODE_SIZE
}

impl InodeManager {
    /// Creates a fresh inode table and allocates the root directory.
    ///
    /// # Panics
    ///
    /// Panics if the very first allocation does not return inode 1; that
    /// would mean the table itself is corrupt before any client has
    /// touched it, a condition this core treats as unrecoverable.
    #[must_use]
    pub fn new() -> Self {
        let mut mgr = Self {
            blocks: BlockManager::new(),
            used: vec![false; INODE_NUM],
            cursor: 1,
        };
        let root = mgr
            .alloc_inode(FileType::Dir)
            .expect("fresh inode table must have room for the root directory");
        assert_eq!(root, InodeNo::ROOT, "first allocated inode must be the root directory");
        mgr
    }

    fn read_raw(&self, inum: InodeNo) -> RawInode {
        let block = self.blocks.read_block(inode_block(inum));
        *block.as_data_view().get(inode_offset(inum))
    }

    fn write_raw(&mut self, inum: InodeNo, raw: &RawInode) {
        let bid = inode_block(inum);
        let offset = inode_offset(inum);
        *self.blocks.block_mut(bid).as_data_view_mut().get_mut(offset) = *raw;
    }

    /// Allocates a fresh inode of the given type.
    ///
    /// # Errors
    ///
    /// Returns [`InodeError::TableFull`] if every inode slot is in use.
    pub fn alloc_inode(&mut self, ty: FileType) -> Result<InodeNo, InodeError> {
        for step in 0..self.used.len() {
            let n = ((self.cursor as usize - 1 + step) % (INODE_NUM - 1)) + 1;
            if !self.used[n] {
                self.used[n] = true;
                self.cursor = n as u32 + 1;
                let inum = InodeNo::new(n as u32);
                let raw = RawInode {
                    ty: ty.as_u32() as u16,
                    _reserved: 0,
                    size: 0,
                    atime: 0,
                    mtime: 0,
                    ctime: 0,
                    addrs: [0; NDIRECT + 1],
                };
                self.write_raw(inum, &raw);
                trace!("alloc_inode: allocated {inum} as {ty:?}");
                return Ok(inum);
            }
        }
        Err(InodeError::TableFull)
    }

    /// Releases an inode's data blocks and marks the slot free.
    ///
    /// # Errors
    ///
    /// Returns [`InodeError::NotFound`] if `inum` is not currently in use.
    pub fn free_inode(&mut self, inum: InodeNo) -> Result<(), InodeError> {
        self.check_in_use(inum)?;
        self.truncate(inum)?;
        self.write_raw(inum, &RawInode::zeroed());
        self.used[inum.as_index()] = false;
        debug!("free_inode: freed {inum}");
        Ok(())
    }

    fn check_in_use(&self, inum: InodeNo) -> Result<(), InodeError> {
        if inum.as_index() == 0 || inum.as_index() >= INODE_NUM {
            return Err(InodeError::OutOfRange(inum));
        }
        if !self.used[inum.as_index()] {
            return Err(InodeError::NotFound(inum));
        }
        Ok(())
    }

    /// Returns the attributes (type, size, timestamps) of an inode.
    ///
    /// # Errors
    ///
    /// Returns [`InodeError::NotFound`] if `inum` is not currently in use.
    pub fn getattr(&self, inum: InodeNo) -> Result<Attr, InodeError> {
        self.check_in_use(inum)?;
        let raw = self.read_raw(inum);
        Ok(Attr {
            ty: FileType::from_repr(u32::from(raw.ty)).expect("on-disk type must be valid"),
            size: u64::from(raw.size),
            atime: raw.atime,
            mtime: raw.mtime,
            ctime: raw.ctime,
        })
    }

    /// Updates an inode's timestamps without touching its content.
    ///
    /// # Errors
    ///
    /// Returns [`InodeError::NotFound`] if `inum` is not currently in use.
    pub fn touch(&mut self, inum: InodeNo, atime: u32, mtime: u32, ctime: u32) -> Result<(), InodeError> {
        self.check_in_use(inum)?;
        let mut raw = self.read_raw(inum);
        raw.atime = atime;
        raw.mtime = mtime;
        raw.ctime = ctime;
        self.write_raw(inum, &raw);
        Ok(())
    }

    /// Reads the whole content of an inode.
    ///
    /// # Errors
    ///
    /// Returns [`InodeError::NotFound`] if `inum` is not currently in use.
    pub fn read_file(&self, inum: InodeNo) -> Result<Vec<u8>, InodeError> {
        self.check_in_use(inum)?;
        let raw = self.read_raw(inum);
        let size = raw.size as usize;
        let mut out = Vec::with_capacity(size);

        for &bn in raw.direct() {
            if out.len() >= size {
                break;
            }
            if bn == 0 {
                break;
            }
            out.extend_from_slice(self.blocks.read_block(BlockId::new(bn)));
        }

        if raw.indirect() != 0 && out.len() < size {
            let iblock: RawIndirectBlock = *self
                .blocks
                .read_block(BlockId::new(raw.indirect()))
                .as_data_view()
                .get(0);
            for bn in iblock.iter() {
                if out.len() >= size {
                    break;
                }
                if bn == 0 {
                    break;
                }
                out.extend_from_slice(self.blocks.read_block(BlockId::new(bn)));
            }
        }

        out.truncate(size);
        Ok(out)
    }

    /// Replaces the whole content of an inode, allocating or freeing
    /// blocks as needed to fit the new size.
    ///
    /// # Errors
    ///
    /// Returns [`InodeError::NotFound`] if `inum` is not currently in
    /// use, or a wrapped [`netfs_block::BlockError`] if the device runs
    /// out of free blocks partway through.
    pub fn write_file(&mut self, inum: InodeNo, bytes: &[u8]) -> Result<(), InodeError> {
        self.check_in_use(inum)?;
        let mut raw = self.read_raw(inum);
        raw.size = u32::try_from(bytes.len()).unwrap_or(u32::MAX);

        let mut chunks = bytes.chunks(netfs_block::geometry::BLOCK_SIZE);

        for slot in raw.direct_mut() {
            let Some(chunk) = chunks.next() else {
                break;
            };
            if *slot == 0 {
                *slot = self.blocks.alloc_block()?.value();
            }
            self.write_chunk(BlockId::new(*slot), chunk);
        }

        if chunks.len() > 0 {
            let ind_bid = if raw.indirect() == 0 {
                let bid = self.blocks.alloc_block()?;
                raw.set_indirect(bid.value());
                bid
            } else {
                BlockId::new(raw.indirect())
            };
            let mut iblock: RawIndirectBlock =
                *self.blocks.read_block(ind_bid).as_data_view().get(0);
            for i in 0..NINDIRECT {
                let Some(chunk) = chunks.next() else {
                    break;
                };
                let mut bn = iblock.get(i);
                if bn == 0 {
                    bn = self.blocks.alloc_block()?.value();
                    iblock.set(i, bn);
                }
                self.write_chunk(BlockId::new(bn), chunk);
            }
            *self.blocks.block_mut(ind_bid).as_data_view_mut().get_mut(0) = iblock;
        } else if raw.indirect() != 0 {
            self.free_indirect(raw.indirect())?;
            raw.set_indirect(0);
        }

        self.free_trailing_direct_blocks(&mut raw, bytes.len())?;
        self.write_raw(inum, &raw);
        Ok(())
    }

    fn write_chunk(&mut self, bid: BlockId, chunk: &[u8]) {
        let mut buf = [0u8; netfs_block::geometry::BLOCK_SIZE];
        buf[..chunk.len()].copy_from_slice(chunk);
        self.blocks.write_block(bid, &buf);
    }

    fn free_trailing_direct_blocks(&mut self, raw: &mut RawInode, new_size: usize) -> Result<(), InodeError> {
        let used_blocks = new_size.div_ceil(netfs_block::geometry::BLOCK_SIZE);
        for slot in raw.direct_mut().iter_mut().skip(used_blocks) {
            if *slot != 0 {
                self.blocks.free_block(BlockId::new(*slot))?;
                *slot = 0;
            }
        }
        Ok(())
    }

    fn free_indirect(&mut self, ind_bn: u32) -> Result<(), InodeError> {
        let ind_bid = BlockId::new(ind_bn);
        let iblock: RawIndirectBlock = *self.blocks.read_block(ind_bid).as_data_view().get(0);
        for bn in iblock.iter() {
            if bn == 0 {
                break;
            }
            self.blocks.free_block(BlockId::new(bn))?;
        }
        self.blocks.free_block(ind_bid)?;
        Ok(())
    }

    fn truncate(&mut self, inum: InodeNo) -> Result<(), InodeError> {
        let mut raw = self.read_raw(inum);
        for slot in raw.direct_mut() {
            if *slot != 0 {
                self.blocks.free_block(BlockId::new(*slot))?;
                *slot = 0;
            }
        }
        if raw.indirect() != 0 {
            self.free_indirect(raw.indirect())?;
            raw.set_indirect(0);
        }
        raw.size = 0;
        self.write_raw(inum, &raw);
        Ok(())
    }
}

impl Default for InodeManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_directory_is_inode_one() {
        let mgr = InodeManager::new();
        assert!(mgr.used[1]);
        assert_eq!(mgr.getattr(InodeNo::ROOT).unwrap().ty, FileType::Dir);
    }

    #[test]
    fn write_then_read_round_trips_small_file() {
        let mut mgr = InodeManager::new();
        let inum = mgr.alloc_inode(FileType::File).unwrap();
        mgr.write_file(inum, b"hello, world").unwrap();
        assert_eq!(mgr.read_file(inum).unwrap(), b"hello, world");
        assert_eq!(mgr.getattr(inum).unwrap().size, 12);
    }

    #[test]
    fn writing_exactly_ndirect_blocks_uses_no_indirect_block() {
        let mut mgr = InodeManager::new();
        let inum = mgr.alloc_inode(FileType::File).unwrap();
        let size = NDIRECT * netfs_block::geometry::BLOCK_SIZE;
        mgr.write_file(inum, &vec![b'a'; size]).unwrap();
        assert_eq!(mgr.read_raw(inum).indirect(), 0);
        assert_eq!(mgr.read_file(inum).unwrap().len(), size);
    }

    #[test]
    fn write_spanning_direct_and_indirect_blocks_round_trips() {
        let mut mgr = InodeManager::new();
        let inum = mgr.alloc_inode(FileType::File).unwrap();
        let size = NDIRECT * netfs_block::geometry::BLOCK_SIZE + 1;
        let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
        mgr.write_file(inum, &data).unwrap();
        assert_eq!(mgr.read_file(inum).unwrap(), data);
    }

    #[test]
    fn writing_the_largest_representable_file_round_trips() {
        let mut mgr = InodeManager::new();
        let inum = mgr.alloc_inode(FileType::File).unwrap();
        let size = (NDIRECT + NINDIRECT) * netfs_block::geometry::BLOCK_SIZE;
        let data: Vec<u8> = (0..size).map(|i| (i % 199) as u8).collect();
        mgr.write_file(inum, &data).unwrap();
        assert_eq!(mgr.read_file(inum).unwrap(), data);
        assert_eq!(mgr.getattr(inum).unwrap().size, size as u64);
    }

    #[test]
    fn shrinking_a_file_frees_trailing_blocks() {
        let mut mgr = InodeManager::new();
        let inum = mgr.alloc_inode(FileType::File).unwrap();
        let big = vec![1u8; 4 * netfs_block::geometry::BLOCK_SIZE];
        mgr.write_file(inum, &big).unwrap();
        mgr.write_file(inum, b"small").unwrap();
        assert_eq!(mgr.read_file(inum).unwrap(), b"small");
    }

    #[test]
    fn shrinking_below_ndirect_threshold_frees_the_indirect_block() {
        let mut mgr = InodeManager::new();
        let inum = mgr.alloc_inode(FileType::File).unwrap();
        let size = NDIRECT * netfs_block::geometry::BLOCK_SIZE + 1;
        mgr.write_file(inum, &vec![b'a'; size]).unwrap();
        assert_ne!(mgr.read_raw(inum).indirect(), 0, "growth past NDIRECT blocks must allocate an indirect block");

        mgr.write_file(inum, &vec![b'a'; 100]).unwrap();
        let raw = mgr.read_raw(inum);
        assert_eq!(raw.indirect(), 0, "shrinking back under NDIRECT blocks must free the indirect block");
        assert_ne!(raw.direct()[0], 0);
        assert!(raw.direct()[1..].iter().all(|&bn| bn == 0));
        assert_eq!(mgr.read_file(inum).unwrap(), vec![b'a'; 100]);
    }

    #[test]
    fn freed_inode_is_not_found() {
        let mut mgr = InodeManager::new();
        let inum = mgr.alloc_inode(FileType::File).unwrap();
        mgr.free_inode(inum).unwrap();
        assert!(matches!(mgr.getattr(inum), Err(InodeError::NotFound(_))));
    }
}
