use netfs_proto::BlockId;

use crate::geometry::BLOCK_SIZE;

/// A fixed-size array of `N_BLOCKS` byte slots. Read and write are total
/// (every valid block id can always be read or written) and synchronous.
pub struct BlockDevice {
    blocks: Vec<[u8; BLOCK_SIZE]>,
}

impl BlockDevice {
    #[must_use]
    pub fn new(n_blocks: usize) -> Self {
        Self {
            blocks: vec![[0u8; BLOCK_SIZE]; n_blocks],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    #[must_use]
    pub fn read_block(&self, id: BlockId) -> &[u8; BLOCK_SIZE] {
        &self.blocks[id.as_index()]
    }

    pub fn write_block(&mut self, id: BlockId, data: &[u8; BLOCK_SIZE]) {
        self.blocks[id.as_index()] = *data;
    }

    /// Returns a mutable reference to a block's bytes, for in-place
    /// `Pod` casts. The backing storage is heap-allocated (`Vec`-owned),
    /// so this reference is suitably aligned for any `Pod` whose
    /// alignment divides `BLOCK_SIZE`; a stack-local copy would not be.
    pub fn block_mut(&mut self, id: BlockId) -> &mut [u8; BLOCK_SIZE] {
        &mut self.blocks[id.as_index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_is_total_and_synchronous() {
        let mut dev = BlockDevice::new(8);
        let mut buf = [0u8; BLOCK_SIZE];
        buf[0] = 0xab;
        dev.write_block(BlockId::new(3), &buf);
        assert_eq!(dev.read_block(BlockId::new(3))[0], 0xab);
        assert_eq!(dev.read_block(BlockId::new(0))[0], 0);
    }
}
