//! Per-extent attribute/data cache with write-back on flush.
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use netfs_proto::{Attr, ExtentId, ExtentService, FileType, Status};

fn now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u32::try_from(d.as_secs()).unwrap_or(u32::MAX))
        .unwrap_or(0)
}

struct DataEntry {
    bytes: Vec<u8>,
    modified: bool,
}

#[derive(Default)]
pub(crate) struct ExtentCache {
    data: HashMap<ExtentId, DataEntry>,
    attr: HashMap<ExtentId, Attr>,
    deleted: Vec<ExtentId>,
}

impl ExtentCache {
    pub(crate) fn create(&mut self, extents: &dyn ExtentService, ty: FileType) -> Result<ExtentId, Status> {
        let eid = extents.create(ty)?;
        let t = now();
        self.attr.insert(
            eid,
            Attr {
                ty,
                size: 0,
                atime: t,
                mtime: t,
                ctime: t,
            },
        );
        self.data.insert(
            eid,
            DataEntry {
                bytes: Vec::new(),
                modified: false,
            },
        );
        Ok(eid)
    }

    pub(crate) fn get(&mut self, extents: &dyn ExtentService, eid: ExtentId) -> Result<Vec<u8>, Status> {
        if let Some(entry) = self.data.get(&eid) {
            return Ok(entry.bytes.clone());
        }
        let bytes = extents.get(eid)?;
        self.data.insert(
            eid,
            DataEntry {
                bytes: bytes.clone(),
                modified: false,
            },
        );
        Ok(bytes)
    }

    pub(crate) fn getattr(&mut self, extents: &dyn ExtentService, eid: ExtentId) -> Result<Attr, Status> {
        if let Some(attr) = self.attr.get(&eid) {
            return Ok(*attr);
        }
        let attr = extents.getattr(eid)?;
        self.attr.insert(eid, attr);
        Ok(attr)
    }

    pub(crate) fn put(&mut self, eid: ExtentId, bytes: Vec<u8>) {
        let t = now();
        let size = bytes.len() as u64;
        self.data.insert(eid, DataEntry { bytes, modified: true });
        if let Some(attr) = self.attr.get_mut(&eid) {
            attr.size = size;
            attr.mtime = t;
            attr.ctime = t;
        }
    }

    pub(crate) fn remove(&mut self, extents: &dyn ExtentService, eid: ExtentId) -> Result<(), Status> {
        self.clear(eid);
        self.deleted.push(eid);
        extents.remove(eid)
    }

    fn clear(&mut self, eid: ExtentId) {
        self.data.remove(&eid);
        self.attr.remove(&eid);
    }

    /// Writes every modified cache entry for `eid` back through
    /// `extents` and clears it from the cache, returning the set of
    /// extent ids that were touched (written or already removed).
    pub(crate) fn flush(&mut self, extents: &dyn ExtentService, eid: ExtentId) -> Vec<ExtentId> {
        let mut touched = std::mem::take(&mut self.deleted);

        if let Some(entry) = self.data.get(&eid) {
            if entry.modified {
                let bytes = entry.bytes.clone();
                let _ = extents.put(eid, bytes);
                touched.push(eid);
            }
        }
        self.data.remove(&eid);
        self.attr.remove(&eid);

        touched
    }
}
