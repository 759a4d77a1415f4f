//! Extent server.
//!
//! Wraps a [`netfs_inode::InodeManager`] behind [`ExtentService`], the
//! same RPC surface the original `yfs_client` called to create, read,
//! write, and remove file and directory content. One extent id is one
//! inode number.

use std::sync::Mutex;

use log::trace;
use netfs_inode::InodeManager;
use netfs_proto::{Attr, ExtentId, ExtentService, FileType, InodeNo, Status};

pub struct ExtentServer {
    inodes: Mutex<InodeManager>,
}

impl ExtentServer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inodes: Mutex::new(InodeManager::new()),
        }
    }
}

impl Default for ExtentServer {
    fn default() -> Self {
        Self::new()
    }
}

fn inum_of(eid: ExtentId) -> InodeNo {
    InodeNo::new(u32::try_from(eid.value()).expect("extent ids never exceed the inode table width"))
}

impl ExtentService for ExtentServer {
    fn create(&self, ty: FileType) -> Result<ExtentId, Status> {
        let inum = self.inodes.lock().unwrap().alloc_inode(ty)?;
        trace!("extent create: {ty:?} -> {inum}");
        Ok(ExtentId::from(inum))
    }

    fn get(&self, eid: ExtentId) -> Result<Vec<u8>, Status> {
        Ok(self.inodes.lock().unwrap().read_file(inum_of(eid))?)
    }

    fn getattr(&self, eid: ExtentId) -> Result<Attr, Status> {
        Ok(self.inodes.lock().unwrap().getattr(inum_of(eid))?)
    }

    fn put(&self, eid: ExtentId, bytes: Vec<u8>) -> Result<(), Status> {
        Ok(self.inodes.lock().unwrap().write_file(inum_of(eid), &bytes)?)
    }

    fn remove(&self, eid: ExtentId) -> Result<(), Status> {
        Ok(self.inodes.lock().unwrap().free_inode(inum_of(eid))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_put_then_get_round_trips() {
        let server = ExtentServer::new();
        let eid = server.create(FileType::File).unwrap();
        server.put(eid, b"payload".to_vec()).unwrap();
        assert_eq!(server.get(eid).unwrap(), b"payload");
        assert_eq!(server.getattr(eid).unwrap().size, 7);
    }

    #[test]
    fn removed_extent_is_no_longer_readable() {
        let server = ExtentServer::new();
        let eid = server.create(FileType::File).unwrap();
        server.remove(eid).unwrap();
        assert_eq!(server.get(eid), Err(Status::NoEnt));
    }
}
