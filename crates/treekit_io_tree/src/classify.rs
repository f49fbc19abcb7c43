//! File type classification.

use std::fmt;
use std::fs::{FileType, Metadata};

/// Kind of a filesystem entry as seen without following symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumEntryKind {
    Directory,
    Regular,
    Symlink,
    /// Device, named pipe, socket.
    OtherNonRegular,
}

impl EnumEntryKind {
    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Directory => "directory",
            Self::Regular => "regular",
            Self::Symlink => "symlink",
            Self::OtherNonRegular => "other",
        }
    }

    /// Only directories are structural; everything else is a file payload.
    pub fn is_file_like(self) -> bool {
        self != Self::Directory
    }
}

impl fmt::Display for EnumEntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify by mode bits: directory, then symlink, then regular, else other.
///
/// `file_type` must come from `symlink_metadata` / `DirEntry::file_type` so
/// that links are reported as links rather than as their targets.
pub fn classify(file_type: &FileType) -> EnumEntryKind {
    if file_type.is_dir() {
        EnumEntryKind::Directory
    } else if file_type.is_symlink() {
        EnumEntryKind::Symlink
    } else if file_type.is_file() {
        EnumEntryKind::Regular
    } else {
        EnumEntryKind::OtherNonRegular
    }
}

/// [`classify`] on already fetched metadata.
pub fn classify_metadata(meta: &Metadata) -> EnumEntryKind {
    classify(&meta.file_type())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{EnumEntryKind, classify, classify_metadata};

    #[test]
    fn classifies_directory_and_regular_file() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path_file = tmp.path().join("a.txt");
        fs::write(&path_file, "a").expect("write");

        let meta_dir = fs::symlink_metadata(tmp.path()).expect("dir metadata");
        let meta_file = fs::symlink_metadata(&path_file).expect("file metadata");
        assert_eq!(classify_metadata(&meta_dir), EnumEntryKind::Directory);
        assert_eq!(classify(&meta_file.file_type()), EnumEntryKind::Regular);
        assert!(!EnumEntryKind::Directory.is_file_like());
    }

    #[cfg(unix)]
    #[test]
    fn classifies_symlink_without_following_it() {
        use std::os::unix::fs::symlink;

        let tmp = tempfile::tempdir().expect("tempdir");
        let path_dir = tmp.path().join("real");
        fs::create_dir(&path_dir).expect("mkdir");
        symlink(&path_dir, tmp.path().join("link")).expect("symlink");

        let meta_link = fs::symlink_metadata(tmp.path().join("link")).expect("link metadata");
        assert_eq!(classify_metadata(&meta_link), EnumEntryKind::Symlink);
    }

    #[cfg(unix)]
    #[test]
    fn classifies_device_as_other_non_regular() {
        let meta_null = fs::symlink_metadata("/dev/null").expect("/dev/null metadata");
        assert_eq!(classify_metadata(&meta_null), EnumEntryKind::OtherNonRegular);
        assert_eq!(EnumEntryKind::OtherNonRegular.to_string(), "other");
    }
}
