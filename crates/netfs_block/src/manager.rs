use log::{debug, trace};
use netfs_proto::BlockId;

use crate::device::BlockDevice;
use crate::error::BlockError;
use crate::geometry::{BLOCK_SIZE, DATA_START, N_BLOCKS};

/// Owns the block device and the free-block bitmap.
///
/// The bitmap is a plain in-memory `Vec<bool>`, not a block on the
/// device; see the module doc on [`crate::geometry`] for why. Allocation
/// walks a rotating cursor starting at [`DATA_START`], the same
/// next-fit strategy the original allocator used: it avoids always
/// rescanning low block numbers and spreads allocations across the
/// device over the device's lifetime.
pub struct BlockManager {
    device: BlockDevice,
    free: Vec<bool>,
    cursor: usize,
}

impl BlockManager {
    #[must_use]
    pub fn new() -> Self {
        let mut free = vec![true; N_BLOCKS];
        for b in 0..DATA_START {
            free[b] = false;
        }
        Self {
            device: BlockDevice::new(N_BLOCKS),
            free,
            cursor: DATA_START,
        }
    }

    #[must_use]
    pub fn read_block(&self, id: BlockId) -> &[u8; BLOCK_SIZE] {
        self.device.read_block(id)
    }

    pub fn write_block(&mut self, id: BlockId, data: &[u8; BLOCK_SIZE]) {
        self.device.write_block(id, data);
    }

    /// Returns a mutable reference to a block's bytes, for in-place
    /// `Pod` casts (see [`crate::device::BlockDevice::block_mut`]).
    pub fn block_mut(&mut self, id: BlockId) -> &mut [u8; BLOCK_SIZE] {
        self.device.block_mut(id)
    }

    /// Allocate a free data block, zero it, and mark it used.
    ///
    /// # Errors
    ///
    /// Returns [`BlockError::DeviceFull`] if every block from
    /// [`DATA_START`] onward is in use.
    pub fn alloc_block(&mut self) -> Result<BlockId, BlockError> {
        let n = self.free.len();
        for step in 0..n {
            let b = DATA_START + (self.cursor - DATA_START + step) % (n - DATA_START);
            if self.free[b] {
                self.free[b] = false;
                self.cursor = b + 1;
                let id = BlockId::new(b as u32);
                self.device.write_block(id, &[0u8; BLOCK_SIZE]);
                trace!("alloc_block: allocated {id}");
                return Ok(id);
            }
        }
        Err(BlockError::DeviceFull {
            data_start: DATA_START,
            n_blocks: N_BLOCKS,
        })
    }

    /// Mark a previously-allocated data block free again.
    ///
    /// # Errors
    ///
    /// Returns [`BlockError::DoubleFree`] if the block is already free,
    /// or [`BlockError::OutOfRange`] if it falls outside the data region.
    pub fn free_block(&mut self, id: BlockId) -> Result<(), BlockError> {
        let b = id.as_index();
        if b < DATA_START || b >= self.free.len() {
            return Err(BlockError::OutOfRange(id));
        }
        if self.free[b] {
            return Err(BlockError::DoubleFree(id));
        }
        self.free[b] = true;
        debug!("free_block: freed {id}");
        Ok(())
    }
}

impl Default for BlockManager {
    fn default() -> Self {
        Self::new()
    }
}
