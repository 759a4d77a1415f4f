use netfs_block::BlockError;
use netfs_proto::{InodeNo, Status};
use thiserror::Error;

/// Errors raised by [`crate::InodeManager`].
#[derive(Debug, Error)]
pub enum InodeError {
    #[error("inode table exhausted: all inodes in use")]
    TableFull,

    #[error("inode {0} is out of range")]
    OutOfRange(InodeNo),

    #[error("inode {0} does not exist")]
    NotFound(InodeNo),

    #[error(transparent)]
    Block(#[from] BlockError),
}

impl From<InodeError> for Status {
    fn from(err: InodeError) -> Self {
        match err {
            InodeError::NotFound(_) => Status::NoEnt,
            InodeError::TableFull | InodeError::OutOfRange(_) => Status::Io,
            InodeError::Block(e) => e.into(),
        }
    }
}
