use std::sync::{Arc, Mutex, Weak};

use log::debug;
use netfs_lock::LockClientCache;
use netfs_proto::{
    Attr, ClientId, ExtentId, ExtentService, FileType, InodeNo, LockCallbackClient, LockId, LockService, ReleaseUser,
    Status,
};

use crate::cache::ExtentCache;
use crate::dirent::{self, DirEntry};

/// `getfile`-style attributes for a regular file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileInfo {
    pub size: u64,
    pub atime: u32,
    pub mtime: u32,
    pub ctime: u32,
}

/// `getdir`-style attributes for a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirInfo {
    pub atime: u32,
    pub mtime: u32,
    pub ctime: u32,
}

/// The largest symlink target `readlink` will ever return, matching
/// the longest reply the original protocol's single-block reads used.
const MAX_SYMLINK_LEN: usize = 4096;

/// The root inode number, always a directory, created when a fresh
/// extent store is brought up.
pub const ROOT: InodeNo = InodeNo::ROOT;

/// A filesystem client: every operation takes the per-inode lock
/// around its extent reads/writes, and caches attributes/content
/// locally until the lock is revoked, at which point [`flush_cache`]
/// writes back anything dirty before the lock is surrendered.
///
/// [`flush_cache`]: FsClient::flush_cache
pub struct FsClient {
    extents: Arc<dyn ExtentService>,
    locks: Arc<LockClientCache>,
    cache: Mutex<ExtentCache>,
}

struct FlushHook(Weak<FsClient>);

impl ReleaseUser for FlushHook {
    fn dorelease(&self, lid: LockId) {
        if let Some(client) = self.0.upgrade() {
            client.flush_cache(ExtentId::new(lid.value()));
        }
    }
}

impl FsClient {
    /// Builds a client bound to `id`, talking to `extents` for content
    /// and `lock_server` for locking. The root directory itself is
    /// initialized once, when the extent store is first created (see
    /// `netfs_inode::InodeManager::new`); a client never needs to seed
    /// it, since its own cache would otherwise shadow whatever the
    /// extent server actually holds for `ROOT` the first time another
    /// client's writes land there.
    #[must_use]
    pub fn new(id: ClientId, extents: Arc<dyn ExtentService>, lock_server: Arc<dyn LockService>) -> Arc<Self> {
        Arc::new_cyclic(|weak| {
            let hook: Arc<dyn ReleaseUser> = Arc::new(FlushHook(Weak::clone(weak)));
            let locks = Arc::new(LockClientCache::new(id, lock_server, Some(hook)));
            Self {
                extents,
                locks,
                cache: Mutex::new(ExtentCache::default()),
            }
        })
    }

    /// This client's id, as registered with the lock server.
    #[must_use]
    pub fn id(&self) -> &ClientId {
        self.locks.id()
    }

    /// This client's lock-server callback endpoint. A harness (or a
    /// real RPC transport) registers this against [`id`](Self::id) so
    /// the lock server can reach it for revoke/retry callbacks.
    #[must_use]
    pub fn lock_callback(&self) -> Arc<dyn LockCallbackClient> {
        Arc::clone(&self.locks) as Arc<dyn LockCallbackClient>
    }

    fn lock_id(inum: InodeNo) -> LockId {
        LockId::from(inum)
    }

    fn flush_cache(&self, eid: ExtentId) -> Vec<ExtentId> {
        let mut cache = self.cache.lock().unwrap();
        let touched = cache.flush(self.extents.as_ref(), eid);
        debug!("flushed extent {eid}: {} entries written back", touched.len());
        touched
    }

    fn ec_create(&self, ty: FileType) -> Result<ExtentId, Status> {
        self.cache.lock().unwrap().create(self.extents.as_ref(), ty)
    }

    fn ec_get(&self, eid: ExtentId) -> Result<Vec<u8>, Status> {
        self.cache.lock().unwrap().get(self.extents.as_ref(), eid)
    }

    fn ec_getattr(&self, eid: ExtentId) -> Result<Attr, Status> {
        self.cache.lock().unwrap().getattr(self.extents.as_ref(), eid)
    }

    fn ec_put(&self, eid: ExtentId, bytes: Vec<u8>) -> Result<(), Status> {
        self.cache.lock().unwrap().put(eid, bytes);
        Ok(())
    }

    fn ec_remove(&self, eid: ExtentId) -> Result<(), Status> {
        self.cache.lock().unwrap().remove(self.extents.as_ref(), eid)
    }

    fn acquire(&self, inum: InodeNo) -> Result<(), Status> {
        self.locks.acquire(Self::lock_id(inum))
    }

    fn release(&self, inum: InodeNo) -> Result<(), Status> {
        self.locks.release(Self::lock_id(inum))
    }

    /// Returns the type of `inum`'s inode.
    ///
    /// # Errors
    ///
    /// Returns the extent server's [`Status`] (typically [`Status::NoEnt`]).
    pub fn checktype(&self, inum: InodeNo) -> Result<FileType, Status> {
        self.acquire(inum)?;
        let result = self.ec_getattr(ExtentId::from(inum)).map(|a| a.ty);
        self.release(inum)?;
        result
    }

    #[must_use]
    pub fn isfile(&self, inum: InodeNo) -> bool {
        self.checktype(inum) == Ok(FileType::File)
    }

    #[must_use]
    pub fn isdir(&self, inum: InodeNo) -> bool {
        self.checktype(inum) == Ok(FileType::Dir)
    }

    #[must_use]
    pub fn issymlink(&self, inum: InodeNo) -> bool {
        self.checktype(inum) == Ok(FileType::Symlink)
    }

    /// # Errors
    ///
    /// Returns the extent server's [`Status`].
    pub fn getfile(&self, inum: InodeNo) -> Result<FileInfo, Status> {
        self.acquire(inum)?;
        let result = self.ec_getattr(ExtentId::from(inum));
        self.release(inum)?;
        let a = result?;
        Ok(FileInfo { size: a.size, atime: a.atime, mtime: a.mtime, ctime: a.ctime })
    }

    /// # Errors
    ///
    /// Returns the extent server's [`Status`].
    pub fn getdir(&self, inum: InodeNo) -> Result<DirInfo, Status> {
        self.acquire(inum)?;
        let result = self.ec_getattr(ExtentId::from(inum));
        self.release(inum)?;
        let a = result?;
        Ok(DirInfo { atime: a.atime, mtime: a.mtime, ctime: a.ctime })
    }

    /// Grows or truncates a file's content to exactly `size` bytes,
    /// zero-padding on growth. A no-op if the current size already
    /// matches.
    ///
    /// # Errors
    ///
    /// Returns the extent server's [`Status`].
    pub fn setattr(&self, inum: InodeNo, size: u64) -> Result<(), Status> {
        self.acquire(inum)?;
        let result = self.setattr_locked(inum, size);
        self.release(inum)?;
        result
    }

    fn setattr_locked(&self, inum: InodeNo, size: u64) -> Result<(), Status> {
        let eid = ExtentId::from(inum);
        let attr = self.ec_getattr(eid)?;
        if attr.size == size {
            return Ok(());
        }
        let mut buf = self.ec_get(eid)?;
        let size = size as usize;
        if buf.len() > size {
            buf.truncate(size);
        } else {
            buf.resize(size, 0);
        }
        self.ec_put(eid, buf)
    }

    fn create_impl(&self, parent: InodeNo, name: &str, ty: FileType) -> Result<InodeNo, Status> {
        self.acquire(parent)?;
        let result = self.create_locked(parent, name, ty);
        self.release(parent)?;
        result
    }

    fn create_locked(&self, parent: InodeNo, name: &str, ty: FileType) -> Result<InodeNo, Status> {
        if self.lookup_locked(parent, name)?.is_some() {
            return Err(Status::Exist);
        }
        let eid = self.ec_create(ty)?;
        let inum = InodeNo::new(u32::try_from(eid.value()).map_err(|_| Status::Io)?);

        let parent_eid = ExtentId::from(parent);
        let mut buf = self.ec_get(parent_eid)?;
        if !dirent::add_entry(&mut buf, name, inum) {
            return Err(Status::Io);
        }
        self.ec_put(parent_eid, buf)?;
        Ok(inum)
    }

    /// Creates a regular file named `name` inside directory `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`Status::Exist`] if `name` is already present in `parent`.
    pub fn create(&self, parent: InodeNo, name: &str) -> Result<InodeNo, Status> {
        self.create_impl(parent, name, FileType::File)
    }

    /// Creates a subdirectory named `name` inside directory `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`Status::Exist`] if `name` is already present in `parent`.
    pub fn mkdir(&self, parent: InodeNo, name: &str) -> Result<InodeNo, Status> {
        self.create_impl(parent, name, FileType::Dir)
    }

    fn lookup_locked(&self, parent: InodeNo, name: &str) -> Result<Option<InodeNo>, Status> {
        let entries = self.readdir_locked(parent)?;
        Ok(entries.into_iter().find(|e| e.name == name).map(|e| e.inum))
    }

    fn readdir_locked(&self, dir: InodeNo) -> Result<Vec<DirEntry>, Status> {
        let buf = self.ec_get(ExtentId::from(dir))?;
        Ok(dirent::decode_entries(&buf))
    }

    /// Looks up `name` in directory `parent`.
    ///
    /// # Errors
    ///
    /// Returns the extent server's [`Status`].
    pub fn lookup(&self, parent: InodeNo, name: &str) -> Result<Option<InodeNo>, Status> {
        self.acquire(parent)?;
        let result = self.lookup_locked(parent, name);
        self.release(parent)?;
        result
    }

    /// Lists every entry in directory `dir`.
    ///
    /// # Errors
    ///
    /// Returns the extent server's [`Status`].
    pub fn readdir(&self, dir: InodeNo) -> Result<Vec<DirEntry>, Status> {
        self.acquire(dir)?;
        let result = self.readdir_locked(dir);
        self.release(dir)?;
        result
    }

    /// Reads up to `size` bytes starting at `off` from `ino`'s content.
    ///
    /// # Errors
    ///
    /// Returns [`Status::Io`] if `off` is beyond the end of the content.
    pub fn read(&self, ino: InodeNo, off: usize, size: usize) -> Result<Vec<u8>, Status> {
        self.acquire(ino)?;
        let result = self.read_locked(ino, off, size);
        self.release(ino)?;
        result
    }

    fn read_locked(&self, ino: InodeNo, off: usize, size: usize) -> Result<Vec<u8>, Status> {
        let buf = self.ec_get(ExtentId::from(ino))?;
        if off >= buf.len() {
            return Err(Status::Io);
        }
        let end = usize::min(buf.len(), off + size);
        Ok(buf[off..end].to_vec())
    }

    /// Writes `data` at offset `off` into `ino`'s content, zero-filling
    /// any gap if `off` is past the current end, and growing the
    /// content if the write extends past it.
    ///
    /// # Errors
    ///
    /// Returns the extent server's [`Status`].
    pub fn write(&self, ino: InodeNo, off: usize, data: &[u8]) -> Result<usize, Status> {
        self.acquire(ino)?;
        let result = self.write_locked(ino, off, data);
        self.release(ino)?;
        result
    }

    fn write_locked(&self, ino: InodeNo, off: usize, data: &[u8]) -> Result<usize, Status> {
        let eid = ExtentId::from(ino);
        let mut buf = self.ec_get(eid)?;
        if off > buf.len() {
            buf.resize(off, 0);
        }
        let end = off + data.len();
        if end > buf.len() {
            buf.resize(end, 0);
        }
        buf[off..end].copy_from_slice(data);
        self.ec_put(eid, buf)?;
        Ok(data.len())
    }

    /// Removes the entry named `name` from directory `parent` and
    /// deletes its extent.
    ///
    /// # Errors
    ///
    /// Returns [`Status::NoEnt`] if `name` is not present in `parent`.
    pub fn unlink(&self, parent: InodeNo, name: &str) -> Result<(), Status> {
        self.acquire(parent)?;
        let result = self.unlink_locked(parent, name);
        self.release(parent)?;
        result
    }

    fn unlink_locked(&self, parent: InodeNo, name: &str) -> Result<(), Status> {
        let Some(inum) = self.lookup_locked(parent, name)? else {
            return Err(Status::NoEnt);
        };

        self.acquire(inum)?;
        let remove_result = self.ec_remove(ExtentId::from(inum));
        self.release(inum)?;
        remove_result?;

        let parent_eid = ExtentId::from(parent);
        let mut buf = self.ec_get(parent_eid)?;
        dirent::remove_entry(&mut buf, name);
        self.ec_put(parent_eid, buf)
    }

    /// Creates a symlink named `name` inside `parent` pointing at `target`.
    ///
    /// # Errors
    ///
    /// Returns [`Status::Exist`] if `name` is already present in `parent`.
    pub fn symlink(&self, parent: InodeNo, name: &str, target: &str) -> Result<InodeNo, Status> {
        let inum = self.create_impl(parent, name, FileType::Symlink)?;
        self.write(inum, 0, target.as_bytes())?;
        Ok(inum)
    }

    /// Reads a symlink's target.
    ///
    /// # Errors
    ///
    /// Returns the extent server's [`Status`].
    pub fn readlink(&self, ino: InodeNo) -> Result<String, Status> {
        let bytes = self.read(ino, 0, MAX_SYMLINK_LEN)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use netfs_extent::ExtentServer;
    use netfs_lock::LockServer;

    use super::*;

    fn new_client(id: &str) -> Arc<FsClient> {
        let extents: Arc<dyn ExtentService> = Arc::new(ExtentServer::new());
        let lock_server: Arc<dyn LockService> = Arc::new(LockServer::new());
        FsClient::new(ClientId::from(id), extents, lock_server)
    }

    #[test]
    fn create_then_lookup_finds_the_new_entry() {
        let client = new_client("a");
        let inum = client.create(ROOT, "hello.txt").unwrap();
        assert_eq!(client.lookup(ROOT, "hello.txt").unwrap(), Some(inum));
        assert!(client.isfile(inum));
    }

    #[test]
    fn creating_an_existing_name_is_rejected() {
        let client = new_client("a");
        client.create(ROOT, "dup").unwrap();
        assert_eq!(client.create(ROOT, "dup"), Err(Status::Exist));
    }

    #[test]
    fn write_then_read_round_trips() {
        let client = new_client("a");
        let inum = client.create(ROOT, "f").unwrap();
        client.write(inum, 0, b"hello").unwrap();
        assert_eq!(client.read(inum, 0, 5).unwrap(), b"hello");
        assert_eq!(client.getfile(inum).unwrap().size, 5);
    }

    #[test]
    fn read_at_or_past_end_of_file_is_an_io_error() {
        let client = new_client("a");
        let inum = client.create(ROOT, "f").unwrap();
        client.write(inum, 0, b"hello").unwrap();
        assert_eq!(client.read(inum, 5, 1), Err(Status::Io));
        assert_eq!(client.read(inum, 6, 1), Err(Status::Io));
    }

    #[test]
    fn write_past_the_end_zero_fills_the_gap() {
        let client = new_client("a");
        let inum = client.create(ROOT, "f").unwrap();
        client.write(inum, 3, b"x").unwrap();
        assert_eq!(client.read(inum, 0, 4).unwrap(), vec![0, 0, 0, b'x']);
    }

    #[test]
    fn setattr_grow_zero_extends_and_shrink_truncates() {
        let client = new_client("a");
        let inum = client.create(ROOT, "f").unwrap();
        client.write(inum, 0, b"abc").unwrap();
        client.setattr(inum, 5).unwrap();
        assert_eq!(client.read(inum, 0, 5).unwrap(), vec![b'a', b'b', b'c', 0, 0]);
        client.setattr(inum, 1).unwrap();
        assert_eq!(client.read(inum, 0, 5).unwrap(), vec![b'a']);
    }

    #[test]
    fn unlink_removes_directory_entry_and_extent() {
        let client = new_client("a");
        let inum = client.create(ROOT, "gone").unwrap();
        client.unlink(ROOT, "gone").unwrap();
        assert_eq!(client.lookup(ROOT, "gone").unwrap(), None);
        assert!(client.getfile(inum).is_err());
    }

    #[test]
    fn unlink_of_a_missing_name_is_noent_and_leaves_parent_unchanged() {
        let client = new_client("a");
        let kept = client.create(ROOT, "kept").unwrap();
        assert_eq!(client.unlink(ROOT, "missing"), Err(Status::NoEnt));
        assert_eq!(client.lookup(ROOT, "kept").unwrap(), Some(kept));
    }

    #[test]
    fn readdir_on_empty_directory_is_empty() {
        let client = new_client("a");
        let sub = client.mkdir(ROOT, "empty").unwrap();
        assert!(client.readdir(sub).unwrap().is_empty());
        assert_eq!(client.lookup(sub, "missing").unwrap(), None);
    }

    #[test]
    fn symlink_readlink_round_trips_exact_bytes() {
        let client = new_client("a");
        let link = client.symlink(ROOT, "l", "/some/target").unwrap();
        assert!(client.issymlink(link));
        assert_eq!(client.readlink(link).unwrap(), "/some/target");
    }

    #[test]
    fn readlink_truncates_targets_past_the_max_symlink_length() {
        let client = new_client("a");
        let inum = client.create(ROOT, "huge").unwrap();
        let oversized = "x".repeat(MAX_SYMLINK_LEN + 100);
        client.write(inum, 0, oversized.as_bytes()).unwrap();
        assert_eq!(client.readlink(inum).unwrap().len(), MAX_SYMLINK_LEN);
    }
}
