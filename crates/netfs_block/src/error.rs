use netfs_proto::{BlockId, Status};
use thiserror::Error;

/// Errors raised by [`crate::BlockManager`].
#[derive(Debug, Error)]
pub enum BlockError {
    #[error("block device exhausted: no free block in [{data_start}, {n_blocks})")]
    DeviceFull { data_start: usize, n_blocks: usize },

    #[error("block {0} is already free")]
    DoubleFree(BlockId),

    #[error("block {0} is outside the addressable range")]
    OutOfRange(BlockId),
}

impl From<BlockError> for Status {
    fn from(err: BlockError) -> Self {
        match err {
            BlockError::DeviceFull { .. } | BlockError::OutOfRange(_) => Status::Io,
            BlockError::DoubleFree(_) => Status::Io,
        }
    }
}
