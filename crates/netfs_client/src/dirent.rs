//! Directory content codec.
//!
//! A directory's extent content is a flat, unsorted sequence of
//! records, one per entry: a NUL-terminated name followed by the
//! entry's inode number as a little-endian `u32`. There is no entry
//! count and no padding; `decode` stops at the first name it finds
//! empty (which is also what a freshly-created, empty directory's
//! content already is: zero bytes).
use netfs_block::geometry::MAX_FILE_SIZE;
use netfs_proto::InodeNo;

/// One parsed directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub inum: InodeNo,
}

/// Parses every entry out of a directory's raw content.
///
/// Malformed trailing bytes (a name with no terminator, or a
/// terminator with fewer than 4 bytes left for the inode number) end
/// the scan rather than panicking; a directory extent is never
/// produced by anything but [`encode_entries`]/[`add_entry`], so this
/// is reached only via corruption, not regular use.
#[must_use]
pub fn decode_entries(buf: &[u8]) -> Vec<DirEntry> {
    let mut entries = Vec::new();
    let mut pos = 0;

    while pos < buf.len() {
        let Some(nul) = buf[pos..].iter().position(|&b| b == 0) else {
            break;
        };
        if nul == 0 {
            break;
        }
        let name_bytes = &buf[pos..pos + nul];
        let inum_start = pos + nul + 1;
        let Some(inum_bytes) = buf.get(inum_start..inum_start + 4) else {
            break;
        };
        let Ok(name) = core::str::from_utf8(name_bytes) else {
            break;
        };

        let inum = u32::from_le_bytes(inum_bytes.try_into().unwrap());
        entries.push(DirEntry {
            name: name.to_owned(),
            inum: InodeNo::new(inum),
        });
        pos = inum_start + 4;
    }

    entries
}

/// Appends one entry to a directory's raw content.
///
/// Returns `false` (and leaves `buf` untouched) if appending the entry
/// would grow the directory beyond the largest extent this system can
/// store.
#[must_use]
pub fn add_entry(buf: &mut Vec<u8>, name: &str, inum: InodeNo) -> bool {
    let needed = name.len() + 1 + 4;
    if buf.len() + needed >= MAX_FILE_SIZE {
        return false;
    }
    buf.extend_from_slice(name.as_bytes());
    buf.push(0);
    buf.extend_from_slice(&inum.value().to_le_bytes());
    true
}

/// Removes the first entry named `name`, if any.
pub fn remove_entry(buf: &mut Vec<u8>, name: &str) {
    let mut pos = 0;
    while pos < buf.len() {
        let Some(nul) = buf[pos..].iter().position(|&b| b == 0) else {
            break;
        };
        if nul == 0 {
            break;
        }
        let entry_len = nul + 1 + 4;
        if &buf[pos..pos + nul] == name.as_bytes() {
            buf.drain(pos..pos + entry_len);
            return;
        }
        pos += entry_len;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_several_entries() {
        let mut buf = Vec::new();
        assert!(add_entry(&mut buf, "a", InodeNo::new(2)));
        assert!(add_entry(&mut buf, "bb", InodeNo::new(3)));
        let entries = decode_entries(&buf);
        assert_eq!(
            entries,
            vec![
                DirEntry { name: "a".into(), inum: InodeNo::new(2) },
                DirEntry { name: "bb".into(), inum: InodeNo::new(3) },
            ]
        );
    }

    #[test]
    fn empty_directory_decodes_to_no_entries() {
        assert!(decode_entries(&[]).is_empty());
    }

    #[test]
    fn remove_entry_drops_only_the_named_one() {
        let mut buf = Vec::new();
        add_entry(&mut buf, "keep", InodeNo::new(5));
        add_entry(&mut buf, "drop", InodeNo::new(6));
        remove_entry(&mut buf, "drop");
        let entries = decode_entries(&buf);
        assert_eq!(entries, vec![DirEntry { name: "keep".into(), inum: InodeNo::new(5) }]);
    }

    #[test]
    fn add_entry_rejects_growth_that_would_reach_the_largest_extent() {
        let mut accepted = vec![0u8; MAX_FILE_SIZE - 7];
        assert!(add_entry(&mut accepted, "x", InodeNo::new(1)));
        assert_eq!(accepted.len(), MAX_FILE_SIZE - 1);

        let mut rejected = vec![0u8; MAX_FILE_SIZE - 6];
        assert!(!add_entry(&mut rejected, "x", InodeNo::new(1)));
        assert_eq!(rejected.len(), MAX_FILE_SIZE - 6);
    }
}
