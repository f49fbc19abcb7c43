//! Single-entry filesystem primitives and path helpers.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::classify::{EnumEntryKind, classify};
use crate::collection::FileRecord;
use crate::spec::EnumFileConflictStrategy;

////////////////////////////////////////////////////////////////////////////////
// #region DirectoryListing

/// A directory entry whose metadata could not be read.
#[derive(Debug)]
pub struct SpecEntryFailure {
    pub path: PathBuf,
    /// Kind reported by the directory listing itself, when available.
    pub kind: Option<EnumEntryKind>,
    pub error: io::Error,
}

/// Immediate children of one directory, sorted by name.
///
/// `l_failures` holds entries whose metadata could not be read; they are not
/// part of `l_entries`.
#[derive(Debug, Default)]
pub struct SpecDirListing {
    pub l_entries: Vec<FileRecord>,
    pub l_failures: Vec<SpecEntryFailure>,
}

/// List the immediate children of `path_dir` without following symlinks.
///
/// Fails only if the directory itself cannot be opened.
pub fn read_directory_entries(path_dir: &Path) -> io::Result<SpecDirListing> {
    let mut spec_listing = SpecDirListing::default();

    for entry_res in fs::read_dir(path_dir)? {
        let entry = match entry_res {
            Ok(v) => v,
            Err(e) => {
                spec_listing.l_failures.push(SpecEntryFailure {
                    path: path_dir.to_path_buf(),
                    kind: None,
                    error: e,
                });
                continue;
            }
        };
        let path_entry = entry.path();
        match fs::symlink_metadata(&path_entry) {
            Ok(meta) => spec_listing
                .l_entries
                .push(FileRecord::from_metadata(path_entry, &meta)),
            Err(e) => spec_listing.l_failures.push(SpecEntryFailure {
                kind: entry.file_type().ok().map(|t| classify(&t)),
                path: path_entry,
                error: e,
            }),
        }
    }

    spec_listing.l_entries.sort_by(|a, b| a.name_os.cmp(&b.name_os));
    Ok(spec_listing)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region EntryPrimitives

/// Create `path_dir` (and missing parents) with the given permission bits.
///
/// Returns `Ok(false)` when the directory already exists. An existing
/// non-directory at `path_dir`, symlinks included, is an error.
pub fn make_directory(path_dir: &Path, n_mode: u32) -> io::Result<bool> {
    match fs::symlink_metadata(path_dir) {
        Ok(meta) if meta.is_dir() => return Ok(false),
        Ok(_) => {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("exists and is not a directory: {}", path_dir.display()),
            ));
        }
        Err(_) => {}
    }

    let mut builder_dir = fs::DirBuilder::new();
    builder_dir.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        // Owner bits forced so files can still be written into it.
        builder_dir.mode((n_mode & 0o7777) | 0o700);
    }
    #[cfg(not(unix))]
    let _ = n_mode;

    builder_dir.create(path_dir)?;
    Ok(true)
}

/// Remove one non-directory entry. Symlinks are removed, never followed.
pub fn delete_file(path_file: &Path) -> io::Result<()> {
    fs::remove_file(path_file)
}

/// Like [`delete_file`], but a missing entry counts as removed.
///
/// Returns `Ok(false)` when nothing was there.
pub fn delete_file_if_present(path_file: &Path) -> io::Result<bool> {
    match fs::remove_file(path_file) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Remove `path_dir` only if it has no entries left.
///
/// Returns `Ok(false)` when the directory is not empty.
pub fn remove_empty_directory(path_dir: &Path) -> io::Result<bool> {
    if fs::read_dir(path_dir)?.next().is_some() {
        return Ok(false);
    }
    fs::remove_dir(path_dir)?;
    Ok(true)
}

/// Copy one regular file and verify the written size.
///
/// `record_src` is the metadata the walker saw for `path_file_src`. Returns
/// the number of bytes written.
pub fn copy_file(
    path_file_src: &Path,
    record_src: &FileRecord,
    path_file_dst: &Path,
    if_preserve_metadata: bool,
) -> io::Result<u64> {
    if record_src.kind != EnumEntryKind::Regular {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "not a regular file ({}): {}",
                record_src.kind,
                path_file_src.display()
            ),
        ));
    }

    let n_bytes = fs::copy(path_file_src, path_file_dst)?;
    let n_bytes_dst = match fs::metadata(path_file_dst) {
        Ok(meta) => meta.len(),
        Err(e) => return Err(discard_partial_copy(path_file_dst, e)),
    };
    if n_bytes != record_src.size || n_bytes_dst != record_src.size {
        return Err(discard_partial_copy(
            path_file_dst,
            io::Error::other(format!(
                "size mismatch after copy: expected {} bytes, wrote {n_bytes_dst}",
                record_src.size
            )),
        ));
    }

    if if_preserve_metadata && let Err(e) = apply_metadata(path_file_src, path_file_dst) {
        return Err(discard_partial_copy(path_file_dst, e));
    }
    Ok(n_bytes)
}

/// Remove a destination left behind by a failed copy step and hand back the
/// error that caused it.
pub(crate) fn discard_partial_copy(path_file_dst: &Path, error: io::Error) -> io::Error {
    if let Err(e) = fs::remove_file(path_file_dst) {
        tracing::debug!(
            "partial copy {} not removed: {e}",
            path_file_dst.display()
        );
    }
    error
}

fn apply_metadata(path_file_src: &Path, path_file_dst: &Path) -> io::Result<()> {
    use filetime::{FileTime, set_file_times};

    let stat_src = fs::metadata(path_file_src)?;
    fs::set_permissions(path_file_dst, stat_src.permissions())?;
    set_file_times(
        path_file_dst,
        FileTime::from_last_access_time(&stat_src),
        FileTime::from_last_modification_time(&stat_src),
    )?;

    #[cfg(target_os = "linux")]
    copy_xattrs_linux(path_file_src, path_file_dst);
    Ok(())
}

#[cfg(target_os = "linux")]
fn copy_xattrs_linux(path_file_src: &Path, path_file_dst: &Path) {
    let Ok(iter_xattr_names) = xattr::list(path_file_src) else {
        return;
    };
    for name in iter_xattr_names {
        let Some(raw_value) = xattr::get(path_file_src, &name).ok().flatten() else {
            continue;
        };
        if let Err(e) = xattr::set(path_file_dst, &name, &raw_value) {
            tracing::debug!(
                "xattr {:?} not carried to {}: {e}",
                name,
                path_file_dst.display()
            );
        }
    }
}

/// Recreate the symlink `path_link_src` at `path_link_dst` with the same
/// target. Returns the link size as recorded by the walker.
pub fn copy_symlink(
    path_link_src: &Path,
    record_src: &FileRecord,
    path_link_dst: &Path,
) -> io::Result<u64> {
    let path_target = fs::read_link(path_link_src)?;
    create_symlink(&path_target, path_link_src, path_link_dst)?;
    Ok(record_src.size)
}

#[cfg(unix)]
fn create_symlink(
    path_target: &Path,
    _path_link_src: &Path,
    path_link_dst: &Path,
) -> io::Result<()> {
    std::os::unix::fs::symlink(path_target, path_link_dst)
}

#[cfg(windows)]
fn create_symlink(
    path_target: &Path,
    path_link_src: &Path,
    path_link_dst: &Path,
) -> io::Result<()> {
    use std::os::windows::fs::{symlink_dir, symlink_file};
    if path_link_src.is_dir() {
        symlink_dir(path_target, path_link_dst)
    } else {
        symlink_file(path_target, path_link_dst)
    }
}

#[cfg(not(any(unix, windows)))]
fn create_symlink(
    _path_target: &Path,
    _path_link_src: &Path,
    _path_link_dst: &Path,
) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symbolic links are unsupported on this platform",
    ))
}

/// Copy one file-like entry: symlinks are recreated, regular files copied,
/// anything else fails.
pub(crate) fn copy_entry(
    record_src: &FileRecord,
    path_file_dst: &Path,
    if_preserve_metadata: bool,
) -> io::Result<u64> {
    match record_src.kind {
        EnumEntryKind::Symlink => copy_symlink(&record_src.path, record_src, path_file_dst),
        _ => copy_file(
            &record_src.path,
            record_src,
            path_file_dst,
            if_preserve_metadata,
        ),
    }
}

/// Hard-link `record_src` at `path_file_dst`, replacing a non-directory
/// entry already there. Returns the source size.
pub(crate) fn link_entry(record_src: &FileRecord, path_file_dst: &Path) -> io::Result<u64> {
    delete_file_if_present(path_file_dst)?;
    fs::hard_link(&record_src.path, path_file_dst)?;
    Ok(record_src.size)
}

/// Create an empty regular file, truncating an existing one.
pub(crate) fn create_empty_file(path_file: &Path) -> io::Result<()> {
    fs::File::create(path_file).map(drop)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Conflicts

/// What to do with a destination path before writing to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EnumConflictOutcome {
    /// Destination is free (or was cleared for overwrite).
    Proceed,
    /// Keep the destination; the source stays uncopied.
    Skip,
    /// Refuse, with the message to record.
    Reject(String),
}

/// Apply `rule_conflict` to `path_dst`.
///
/// For `Overwrite`, an existing symlink at the destination, or any existing
/// entry when the source is a symlink, is removed first so the write never
/// goes through a link.
pub(crate) fn resolve_file_conflict(
    path_dst: &Path,
    kind_src: EnumEntryKind,
    rule_conflict: EnumFileConflictStrategy,
) -> EnumConflictOutcome {
    let meta_dst = match fs::symlink_metadata(path_dst) {
        Ok(v) => v,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return EnumConflictOutcome::Proceed,
        Err(e) => {
            return EnumConflictOutcome::Reject(format!(
                "failed to inspect destination {}: {e}",
                path_dst.display()
            ));
        }
    };
    if meta_dst.is_dir() {
        return EnumConflictOutcome::Reject(format!(
            "destination is a directory: {}",
            path_dst.display()
        ));
    }

    match rule_conflict {
        EnumFileConflictStrategy::Skip => EnumConflictOutcome::Skip,
        EnumFileConflictStrategy::Error => {
            EnumConflictOutcome::Reject(format!("destination exists: {}", path_dst.display()))
        }
        EnumFileConflictStrategy::Overwrite => {
            let b_must_clear =
                meta_dst.file_type().is_symlink() || kind_src == EnumEntryKind::Symlink;
            if b_must_clear && let Err(e) = fs::remove_file(path_dst) {
                return EnumConflictOutcome::Reject(format!(
                    "failed to replace destination {}: {e}",
                    path_dst.display()
                ));
            }
            EnumConflictOutcome::Proceed
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PathUtilities

fn _normalize_path(path: &Path) -> PathBuf {
    if let Ok(resolved) = fs::canonicalize(path) {
        return resolved;
    }
    let path_abs = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    // A missing target still resolves through its closest existing ancestor.
    match (path_abs.parent(), path_abs.file_name()) {
        (Some(path_parent), Some(name)) if path_parent != path_abs => {
            _normalize_path(path_parent).join(name)
        }
        _ => path_abs,
    }
}

/// First component of `path_dir` below `path_dir_root` that is a symlink.
///
/// Checking stops at the first component that does not exist yet.
pub(crate) fn find_symlink_component(path_dir_root: &Path, path_dir: &Path) -> Option<PathBuf> {
    let path_rel = path_dir.strip_prefix(path_dir_root).ok()?;
    let mut path_cursor = path_dir_root.to_path_buf();
    for part_rel in path_rel.components() {
        path_cursor.push(part_rel.as_os_str());
        match fs::symlink_metadata(&path_cursor) {
            Ok(meta) if meta.file_type().is_symlink() => return Some(path_cursor),
            Ok(_) => {}
            Err(_) => return None,
        }
    }
    None
}

/// True when one path contains the other (after resolution).
pub(crate) fn is_overlap(path_a: &Path, path_b: &Path) -> bool {
    let path_a_resolved = _normalize_path(path_a);
    let path_b_resolved = _normalize_path(path_b);
    path_b_resolved.starts_with(&path_a_resolved) || path_a_resolved.starts_with(&path_b_resolved)
}

/// Map `path_src` under `path_dir_src_root` to the same relative location
/// under `path_dir_dst_root`.
pub(crate) fn derive_target_path(
    path_src: &Path,
    path_dir_src_root: &Path,
    path_dir_dst_root: &Path,
) -> PathBuf {
    match path_src.strip_prefix(path_dir_src_root) {
        Ok(path_rel) => path_dir_dst_root.join(path_rel),
        Err(_) => path_dir_dst_root.join(path_src.file_name().unwrap_or_default()),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
