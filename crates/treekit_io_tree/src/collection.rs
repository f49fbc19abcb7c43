//! Directory nodes, file records and the ordered collections that hold them.

use std::ffi::OsString;
use std::fs::Metadata;
use std::ops::Index;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::classify::{EnumEntryKind, classify_metadata};

////////////////////////////////////////////////////////////////////////////////
// #region Records

/// A resolved directory visited by the walker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryNode {
    /// Absolute directory path.
    pub path: PathBuf,
    /// Whether the path existed when the node was built.
    pub if_exists: bool,
    /// Parent directory path, lookup only.
    pub path_parent: Option<PathBuf>,
    /// Device id on unix, `None` elsewhere.
    pub volume_id: Option<u64>,
    /// Depth relative to the operation root (root = 0).
    pub depth: usize,
    /// Raw mode bits, 0 when the path did not exist.
    pub mode: u32,
}

impl DirectoryNode {
    /// Build a node from a path and its (optional) metadata.
    pub fn new(path: PathBuf, meta: Option<&Metadata>, depth: usize) -> Self {
        let path_parent = path.parent().map(Path::to_path_buf);
        Self {
            if_exists: meta.is_some(),
            volume_id: meta.and_then(volume_id),
            mode: meta.map(mode_bits).unwrap_or(0),
            path_parent,
            path,
            depth,
        }
    }

    /// Final path component, lossy.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|v| v.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// One non-directory (or, in listings, any) entry with the metadata the
/// engine needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Full entry path.
    pub path: PathBuf,
    /// Entry basename, lossy. Used for matching and display only.
    pub name: String,
    /// Entry basename as stored on disk; destination paths are built from it.
    pub name_os: OsString,
    /// Classification from `symlink_metadata`.
    pub kind: EnumEntryKind,
    /// Size in bytes (link size for symlinks).
    pub size: u64,
    /// Last modification time, when the platform reports one.
    pub modified: Option<SystemTime>,
    /// Raw mode bits (`st_mode` on unix, synthesized elsewhere).
    pub mode: u32,
}

impl FileRecord {
    /// Build from a path and its `symlink_metadata`.
    pub fn from_metadata(path: PathBuf, meta: &Metadata) -> Self {
        let name_os = path.file_name().map(OsString::from).unwrap_or_default();
        Self {
            name: name_os.to_string_lossy().to_string(),
            name_os,
            kind: classify_metadata(meta),
            size: meta.len(),
            modified: meta.modified().ok(),
            mode: mode_bits(meta),
            path,
        }
    }

    /// Containing directory.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new(""))
    }
}

#[cfg(unix)]
fn volume_id(meta: &Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    Some(meta.dev())
}

#[cfg(not(unix))]
fn volume_id(_meta: &Metadata) -> Option<u64> {
    None
}

#[cfg(unix)]
pub(crate) fn mode_bits(meta: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode()
}

#[cfg(not(unix))]
pub(crate) fn mode_bits(meta: &Metadata) -> u32 {
    if meta.permissions().readonly() { 0o444 } else { 0o666 }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Collections

/// Ordered directory collection; insertion order is walk order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirCollection {
    l_dirs: Vec<DirectoryNode>,
}

impl DirCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: DirectoryNode) {
        self.l_dirs.push(node);
    }

    pub fn get(&self, idx: usize) -> Option<&DirectoryNode> {
        self.l_dirs.get(idx)
    }

    pub fn len(&self) -> usize {
        self.l_dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.l_dirs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DirectoryNode> {
        self.l_dirs.iter()
    }

    /// Directory paths in order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.l_dirs.iter().map(|d| d.path.clone()).collect()
    }
}

impl Index<usize> for DirCollection {
    type Output = DirectoryNode;

    fn index(&self, idx: usize) -> &Self::Output {
        &self.l_dirs[idx]
    }
}

impl<'a> IntoIterator for &'a DirCollection {
    type Item = &'a DirectoryNode;
    type IntoIter = std::slice::Iter<'a, DirectoryNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.l_dirs.iter()
    }
}

impl IntoIterator for DirCollection {
    type Item = DirectoryNode;
    type IntoIter = std::vec::IntoIter<DirectoryNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.l_dirs.into_iter()
    }
}

/// Ordered file collection; insertion order is walk order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileCollection {
    l_files: Vec<FileRecord>,
}

impl FileCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: FileRecord) {
        self.l_files.push(record);
    }

    pub fn get(&self, idx: usize) -> Option<&FileRecord> {
        self.l_files.get(idx)
    }

    pub fn len(&self) -> usize {
        self.l_files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.l_files.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FileRecord> {
        self.l_files.iter()
    }

    /// File paths in order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.l_files.iter().map(|f| f.path.clone()).collect()
    }

    /// Sum of record sizes.
    pub fn total_bytes(&self) -> u64 {
        self.l_files.iter().map(|f| f.size).sum()
    }
}

impl Index<usize> for FileCollection {
    type Output = FileRecord;

    fn index(&self, idx: usize) -> &Self::Output {
        &self.l_files[idx]
    }
}

impl<'a> IntoIterator for &'a FileCollection {
    type Item = &'a FileRecord;
    type IntoIter = std::slice::Iter<'a, FileRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.l_files.iter()
    }
}

impl IntoIterator for FileCollection {
    type Item = FileRecord;
    type IntoIter = std::vec::IntoIter<FileRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.l_files.into_iter()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::{DirCollection, DirectoryNode, FileCollection, FileRecord};
    use crate::classify::EnumEntryKind;

    #[test]
    fn file_record_reads_metadata() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path_file = tmp.path().join("data.bin");
        fs::write(&path_file, [0_u8; 12]).expect("write");

        let meta = fs::symlink_metadata(&path_file).expect("metadata");
        let record = FileRecord::from_metadata(path_file.clone(), &meta);
        assert_eq!(record.name, "data.bin");
        assert_eq!(record.kind, EnumEntryKind::Regular);
        assert_eq!(record.size, 12);
        assert!(record.modified.is_some());
        assert_eq!(record.dir(), tmp.path());
    }

    #[test]
    fn collections_keep_insertion_order_and_deep_copy() {
        let mut dirs = DirCollection::new();
        dirs.push(DirectoryNode::new(PathBuf::from("/r"), None, 0));
        dirs.push(DirectoryNode::new(PathBuf::from("/r/b"), None, 1));
        dirs.push(DirectoryNode::new(PathBuf::from("/r/a"), None, 1));

        let dirs_copy = dirs.clone();
        dirs.push(DirectoryNode::new(PathBuf::from("/r/c"), None, 1));

        assert_eq!(dirs_copy.len(), 3);
        assert_eq!(dirs.len(), 4);
        assert_eq!(dirs[0].path, PathBuf::from("/r"));
        assert_eq!(dirs_copy[2].name(), "a");
        assert_eq!(dirs[1].path_parent, Some(PathBuf::from("/r")));
        assert!(!dirs[1].if_exists);

        let files = FileCollection::new();
        assert!(files.is_empty());
        assert_eq!(files.total_bytes(), 0);
    }
}
