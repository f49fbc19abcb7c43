//! Per-operation statistics reports and their mutable builders.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::classify::EnumEntryKind;
use crate::collection::{DirCollection, DirectoryNode, FileCollection, FileRecord};
use crate::spec::{EnumTreeOperation, SpecOpError};

fn new_error(operation: EnumTreeOperation, path: PathBuf, exception: String) -> SpecOpError {
    let error = SpecOpError {
        operation,
        path,
        exception,
    };
    tracing::warn!("{error}");
    error
}

////////////////////////////////////////////////////////////////////////////////
// #region CopyTree

/// Aggregate counters and diagnostics for one `copy_tree` run.
#[derive(Debug, Default, Clone)]
pub struct ReportCopyTree {
    /// Source directories visited.
    pub cnt_dirs_scanned: u64,
    /// Target directories newly created.
    pub cnt_dirs_created: u64,
    /// Source directories mirrored in the target (created or already there).
    pub cnt_dirs_copied: u64,
    /// Non-directory entries seen, qualifying or not.
    pub cnt_files_processed: u64,
    /// Files written to the target.
    pub cnt_files_copied: u64,
    /// Files filtered out, skipped by conflict rule or failed.
    pub cnt_files_not_copied: u64,
    pub n_bytes_copied: u64,
    pub n_bytes_not_copied: u64,
    /// Created target directories, when collection was requested.
    pub dirs_created: DirCollection,
    /// Copied source files, when collection was requested.
    pub files_copied: FileCollection,
    /// Per-entry failures.
    pub errors: Vec<SpecOpError>,
}

impl ReportCopyTree {
    /// Number of collected errors.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// `processed == copied + not copied`.
    pub fn is_consistent(&self) -> bool {
        self.cnt_files_processed == self.cnt_files_copied + self.cnt_files_not_copied
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_dirs_scanned".to_string(), self.cnt_dirs_scanned);
        dict_counts.insert("cnt_dirs_created".to_string(), self.cnt_dirs_created);
        dict_counts.insert("cnt_dirs_copied".to_string(), self.cnt_dirs_copied);
        dict_counts.insert("cnt_files_processed".to_string(), self.cnt_files_processed);
        dict_counts.insert("cnt_files_copied".to_string(), self.cnt_files_copied);
        dict_counts.insert("cnt_files_not_copied".to_string(), self.cnt_files_not_copied);
        dict_counts.insert("n_bytes_copied".to_string(), self.n_bytes_copied);
        dict_counts.insert("n_bytes_not_copied".to_string(), self.n_bytes_not_copied);
        dict_counts.insert("cnt_errors".to_string(), self.error_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} dirs_scanned={} dirs_created={} files_processed={} copied={} not_copied={} bytes_copied={} errors={}",
            self.cnt_dirs_scanned,
            self.cnt_dirs_created,
            self.cnt_files_processed,
            self.cnt_files_copied,
            self.cnt_files_not_copied,
            self.n_bytes_copied,
            self.error_count()
        )
    }
}

impl fmt::Display for ReportCopyTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.format(&EnumTreeOperation::CopyTree.report_prefix())
        )
    }
}

/// Mutable accumulator for copy statistics.
#[derive(Debug, Default, Clone)]
pub struct ReportCopyTreeBuilder {
    report: ReportCopyTree,
    if_collect_results: bool,
}

impl ReportCopyTreeBuilder {
    pub fn new(if_collect_results: bool) -> Self {
        Self {
            report: ReportCopyTree::default(),
            if_collect_results,
        }
    }

    pub fn add_dir_scanned(&mut self) {
        self.report.cnt_dirs_scanned += 1;
    }

    pub fn add_dir_created(&mut self, node: DirectoryNode) {
        self.report.cnt_dirs_created += 1;
        if self.if_collect_results {
            self.report.dirs_created.push(node);
        }
    }

    pub fn add_dir_copied(&mut self) {
        self.report.cnt_dirs_copied += 1;
    }

    pub fn add_file_copied(&mut self, record: &FileRecord, n_bytes: u64) {
        self.report.cnt_files_processed += 1;
        self.report.cnt_files_copied += 1;
        self.report.n_bytes_copied += n_bytes;
        if self.if_collect_results {
            self.report.files_copied.push(record.clone());
        }
    }

    pub fn add_file_not_copied(&mut self, record: &FileRecord) {
        self.report.cnt_files_processed += 1;
        self.report.cnt_files_not_copied += 1;
        self.report.n_bytes_not_copied += record.size;
    }

    /// Add one path-scoped error.
    pub fn add_error(&mut self, path: PathBuf, exception: String) {
        let error = new_error(EnumTreeOperation::CopyTree, path, exception);
        self.report.errors.push(error);
    }

    /// Keep an error produced elsewhere (walker, primitives).
    pub fn push_error(&mut self, error: SpecOpError) {
        tracing::warn!("{error}");
        self.report.errors.push(error);
    }

    /// Finalize into an immutable report, recording a counting mismatch as
    /// an error.
    pub fn build(mut self, path_root: PathBuf) -> ReportCopyTree {
        if !self.report.is_consistent() {
            let exception = format!(
                "file counters disagree: processed={} copied={} not_copied={}",
                self.report.cnt_files_processed,
                self.report.cnt_files_copied,
                self.report.cnt_files_not_copied
            );
            self.add_error(path_root, exception);
        }
        self.report
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region MoveTree

/// Aggregate counters and diagnostics for one `move_tree` run.
#[derive(Debug, Default, Clone)]
pub struct ReportMoveTree {
    pub cnt_dirs_scanned: u64,
    /// Target directories newly created.
    pub cnt_dirs_created: u64,
    /// Non-directory entries seen, qualifying or not.
    pub cnt_files_processed: u64,
    /// Files now present only in the target.
    pub cnt_files_moved: u64,
    /// Files still in the source (not qualifying, skipped or failed).
    pub cnt_files_remaining: u64,
    pub n_bytes_moved: u64,
    pub n_bytes_remaining: u64,
    /// Emptied source directories removed.
    pub cnt_source_dirs_deleted: u64,
    /// The source root itself was removed.
    pub if_source_root_deleted: bool,
    pub dirs_created: DirCollection,
    pub files_moved: FileCollection,
    pub errors: Vec<SpecOpError>,
}

impl ReportMoveTree {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// `processed == moved + remaining`.
    pub fn is_consistent(&self) -> bool {
        self.cnt_files_processed == self.cnt_files_moved + self.cnt_files_remaining
    }

    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_dirs_scanned".to_string(), self.cnt_dirs_scanned);
        dict_counts.insert("cnt_dirs_created".to_string(), self.cnt_dirs_created);
        dict_counts.insert("cnt_files_processed".to_string(), self.cnt_files_processed);
        dict_counts.insert("cnt_files_moved".to_string(), self.cnt_files_moved);
        dict_counts.insert("cnt_files_remaining".to_string(), self.cnt_files_remaining);
        dict_counts.insert("n_bytes_moved".to_string(), self.n_bytes_moved);
        dict_counts.insert("n_bytes_remaining".to_string(), self.n_bytes_remaining);
        dict_counts.insert(
            "cnt_source_dirs_deleted".to_string(),
            self.cnt_source_dirs_deleted,
        );
        dict_counts.insert(
            "if_source_root_deleted".to_string(),
            u64::from(self.if_source_root_deleted),
        );
        dict_counts.insert("cnt_errors".to_string(), self.error_count() as u64);
        dict_counts
    }

    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} dirs_scanned={} files_processed={} moved={} remaining={} bytes_moved={} source_dirs_deleted={} errors={}",
            self.cnt_dirs_scanned,
            self.cnt_files_processed,
            self.cnt_files_moved,
            self.cnt_files_remaining,
            self.n_bytes_moved,
            self.cnt_source_dirs_deleted,
            self.error_count()
        )
    }
}

impl fmt::Display for ReportMoveTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.format(&EnumTreeOperation::MoveTree.report_prefix())
        )
    }
}

/// Mutable accumulator for move statistics.
#[derive(Debug, Default, Clone)]
pub struct ReportMoveTreeBuilder {
    report: ReportMoveTree,
    if_collect_results: bool,
}

impl ReportMoveTreeBuilder {
    pub fn new(if_collect_results: bool) -> Self {
        Self {
            report: ReportMoveTree::default(),
            if_collect_results,
        }
    }

    pub fn add_dir_scanned(&mut self) {
        self.report.cnt_dirs_scanned += 1;
    }

    pub fn add_dir_created(&mut self, node: DirectoryNode) {
        self.report.cnt_dirs_created += 1;
        if self.if_collect_results {
            self.report.dirs_created.push(node);
        }
    }

    pub fn add_file_moved(&mut self, record: &FileRecord, n_bytes: u64) {
        self.report.cnt_files_processed += 1;
        self.report.cnt_files_moved += 1;
        self.report.n_bytes_moved += n_bytes;
        if self.if_collect_results {
            self.report.files_moved.push(record.clone());
        }
    }

    pub fn add_file_remaining(&mut self, record: &FileRecord) {
        self.report.cnt_files_processed += 1;
        self.report.cnt_files_remaining += 1;
        self.report.n_bytes_remaining += record.size;
    }

    pub fn add_source_dir_deleted(&mut self, if_root: bool) {
        self.report.cnt_source_dirs_deleted += 1;
        if if_root {
            self.report.if_source_root_deleted = true;
        }
    }

    pub fn add_error(&mut self, path: PathBuf, exception: String) {
        let error = new_error(EnumTreeOperation::MoveTree, path, exception);
        self.report.errors.push(error);
    }

    pub fn push_error(&mut self, error: SpecOpError) {
        tracing::warn!("{error}");
        self.report.errors.push(error);
    }

    pub fn build(mut self, path_root: PathBuf) -> ReportMoveTree {
        if !self.report.is_consistent() {
            let exception = format!(
                "file counters disagree: processed={} moved={} remaining={}",
                self.report.cnt_files_processed,
                self.report.cnt_files_moved,
                self.report.cnt_files_remaining
            );
            self.add_error(path_root, exception);
        }
        self.report
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DeleteTree

/// Aggregate counters and diagnostics for one `delete_tree` run.
///
/// When a deletion fails the walk stops: `fatal` holds that failure and the
/// counters reflect the work done up to it.
#[derive(Debug, Default, Clone)]
pub struct ReportDeleteTree {
    pub cnt_dirs_scanned: u64,
    /// Directories in which at least one file was deleted.
    pub cnt_dirs_with_deletions: u64,
    pub cnt_files_processed: u64,
    pub cnt_files_deleted: u64,
    pub n_bytes_deleted: u64,
    pub cnt_files_remaining: u64,
    pub n_bytes_remaining: u64,
    pub files_deleted: FileCollection,
    /// Non-fatal traversal errors.
    pub errors: Vec<SpecOpError>,
    /// Deletion failure that halted the walk.
    pub fatal: Option<SpecOpError>,
}

impl ReportDeleteTree {
    pub fn error_count(&self) -> usize {
        self.errors.len() + usize::from(self.fatal.is_some())
    }

    /// The walk stopped at a failed deletion.
    pub fn is_aborted(&self) -> bool {
        self.fatal.is_some()
    }

    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_dirs_scanned".to_string(), self.cnt_dirs_scanned);
        dict_counts.insert(
            "cnt_dirs_with_deletions".to_string(),
            self.cnt_dirs_with_deletions,
        );
        dict_counts.insert("cnt_files_processed".to_string(), self.cnt_files_processed);
        dict_counts.insert("cnt_files_deleted".to_string(), self.cnt_files_deleted);
        dict_counts.insert("n_bytes_deleted".to_string(), self.n_bytes_deleted);
        dict_counts.insert("cnt_files_remaining".to_string(), self.cnt_files_remaining);
        dict_counts.insert("n_bytes_remaining".to_string(), self.n_bytes_remaining);
        dict_counts.insert("cnt_errors".to_string(), self.error_count() as u64);
        dict_counts.insert("if_aborted".to_string(), u64::from(self.is_aborted()));
        dict_counts
    }

    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} dirs_scanned={} files_processed={} deleted={} remaining={} bytes_deleted={} errors={} aborted={}",
            self.cnt_dirs_scanned,
            self.cnt_files_processed,
            self.cnt_files_deleted,
            self.cnt_files_remaining,
            self.n_bytes_deleted,
            self.error_count(),
            self.is_aborted()
        )
    }
}

impl fmt::Display for ReportDeleteTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.format(&EnumTreeOperation::DeleteTree.report_prefix())
        )
    }
}

/// Mutable accumulator for delete statistics.
#[derive(Debug, Default, Clone)]
pub struct ReportDeleteTreeBuilder {
    report: ReportDeleteTree,
    if_collect_results: bool,
}

impl ReportDeleteTreeBuilder {
    pub fn new(if_collect_results: bool) -> Self {
        Self {
            report: ReportDeleteTree::default(),
            if_collect_results,
        }
    }

    pub fn add_dir_scanned(&mut self) {
        self.report.cnt_dirs_scanned += 1;
    }

    pub fn add_dir_with_deletions(&mut self) {
        self.report.cnt_dirs_with_deletions += 1;
    }

    pub fn add_file_deleted(&mut self, record: &FileRecord) {
        self.report.cnt_files_processed += 1;
        self.report.cnt_files_deleted += 1;
        self.report.n_bytes_deleted += record.size;
        if self.if_collect_results {
            self.report.files_deleted.push(record.clone());
        }
    }

    pub fn add_file_remaining(&mut self, record: &FileRecord) {
        self.report.cnt_files_processed += 1;
        self.report.cnt_files_remaining += 1;
        self.report.n_bytes_remaining += record.size;
    }

    pub fn push_error(&mut self, error: SpecOpError) {
        tracing::warn!("{error}");
        self.report.errors.push(error);
    }

    /// Record the halting failure.
    pub fn set_fatal(&mut self, error: SpecOpError) {
        tracing::error!("{error}");
        self.report.fatal = Some(error);
    }

    pub fn build(self) -> ReportDeleteTree {
        self.report
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FindTree

/// Directories and matching files of one `find_tree` run, in walk order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReportFindTree {
    pub dirs: DirCollection,
    pub files: FileCollection,
    /// Non-directory entries seen, matching or not.
    pub cnt_files_scanned: u64,
    pub errors: Vec<SpecOpError>,
}

impl ReportFindTree {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_dirs".to_string(), self.dirs.len() as u64);
        dict_counts.insert("cnt_files_matched".to_string(), self.files.len() as u64);
        dict_counts.insert("cnt_files_scanned".to_string(), self.cnt_files_scanned);
        dict_counts.insert("n_bytes_matched".to_string(), self.files.total_bytes());
        dict_counts.insert("cnt_errors".to_string(), self.error_count() as u64);
        dict_counts
    }

    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} dirs={} files_matched={} files_scanned={} bytes_matched={} errors={}",
            self.dirs.len(),
            self.files.len(),
            self.cnt_files_scanned,
            self.files.total_bytes(),
            self.error_count()
        )
    }
}

impl fmt::Display for ReportFindTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.format(&EnumTreeOperation::FindTree.report_prefix())
        )
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ProfileTree

/// Per-kind file counts and sizes of one `profile_tree` run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReportProfileTree {
    pub cnt_dirs: u64,
    pub cnt_files_total: u64,
    pub n_bytes_total: u64,
    pub cnt_files_regular: u64,
    pub n_bytes_regular: u64,
    pub cnt_files_symlink: u64,
    pub n_bytes_symlink: u64,
    pub cnt_files_other: u64,
    pub n_bytes_other: u64,
    pub errors: Vec<SpecOpError>,
}

impl ReportProfileTree {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Totals equal the sum of the per-kind counters.
    pub fn is_consistent(&self) -> bool {
        self.cnt_files_total
            == self.cnt_files_regular + self.cnt_files_symlink + self.cnt_files_other
            && self.n_bytes_total == self.n_bytes_regular + self.n_bytes_symlink + self.n_bytes_other
    }

    pub(crate) fn add_file(&mut self, kind: EnumEntryKind, n_bytes: u64) {
        let (cnt_kind, n_bytes_kind) = match kind {
            EnumEntryKind::Regular => (&mut self.cnt_files_regular, &mut self.n_bytes_regular),
            EnumEntryKind::Symlink => (&mut self.cnt_files_symlink, &mut self.n_bytes_symlink),
            EnumEntryKind::OtherNonRegular => (&mut self.cnt_files_other, &mut self.n_bytes_other),
            EnumEntryKind::Directory => return,
        };
        *cnt_kind += 1;
        *n_bytes_kind += n_bytes;
        self.cnt_files_total += 1;
        self.n_bytes_total += n_bytes;
    }

    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_dirs".to_string(), self.cnt_dirs);
        dict_counts.insert("cnt_files_total".to_string(), self.cnt_files_total);
        dict_counts.insert("n_bytes_total".to_string(), self.n_bytes_total);
        dict_counts.insert("cnt_files_regular".to_string(), self.cnt_files_regular);
        dict_counts.insert("n_bytes_regular".to_string(), self.n_bytes_regular);
        dict_counts.insert("cnt_files_symlink".to_string(), self.cnt_files_symlink);
        dict_counts.insert("n_bytes_symlink".to_string(), self.n_bytes_symlink);
        dict_counts.insert("cnt_files_other".to_string(), self.cnt_files_other);
        dict_counts.insert("n_bytes_other".to_string(), self.n_bytes_other);
        dict_counts.insert("cnt_errors".to_string(), self.error_count() as u64);
        dict_counts
    }

    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} dirs={} files={} bytes={} regular={} symlink={} other={} errors={}",
            self.cnt_dirs,
            self.cnt_files_total,
            self.n_bytes_total,
            self.cnt_files_regular,
            self.cnt_files_symlink,
            self.cnt_files_other,
            self.error_count()
        )
    }
}

impl fmt::Display for ReportProfileTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.format(&EnumTreeOperation::ProfileTree.report_prefix())
        )
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DeleteSubdirectories

/// Outcome of `delete_subdirectories` on one directory.
#[derive(Debug, Default, Clone)]
pub struct ReportDeleteSubdirectories {
    /// Immediate subdirectories removed with their whole content.
    pub cnt_dirs_deleted: u64,
    /// Files, symlinks and other entries left in the directory.
    pub cnt_entries_kept: u64,
    pub dirs_deleted: Vec<PathBuf>,
    pub errors: Vec<SpecOpError>,
}

impl ReportDeleteSubdirectories {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub(crate) fn add_dir_deleted(&mut self, path_dir: PathBuf) {
        self.cnt_dirs_deleted += 1;
        self.dirs_deleted.push(path_dir);
    }

    pub(crate) fn add_entry_kept(&mut self) {
        self.cnt_entries_kept += 1;
    }

    pub(crate) fn add_error(&mut self, path: PathBuf, exception: String) {
        let error = new_error(EnumTreeOperation::DeleteSubdirectories, path, exception);
        self.errors.push(error);
    }

    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_dirs_deleted".to_string(), self.cnt_dirs_deleted);
        dict_counts.insert("cnt_entries_kept".to_string(), self.cnt_entries_kept);
        dict_counts.insert("cnt_errors".to_string(), self.error_count() as u64);
        dict_counts
    }

    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} dirs_deleted={} entries_kept={} errors={}",
            self.cnt_dirs_deleted,
            self.cnt_entries_kept,
            self.error_count()
        )
    }
}

impl fmt::Display for ReportDeleteSubdirectories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.format(&EnumTreeOperation::DeleteSubdirectories.report_prefix())
        )
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ExecuteTreeOps

/// Aggregate counters and diagnostics for one `execute_tree_ops` run.
#[derive(Debug, Default, Clone)]
pub struct ReportExecuteTreeOps {
    pub cnt_dirs_scanned: u64,
    /// Target directories newly created.
    pub cnt_dirs_created: u64,
    /// Non-directory entries seen, selected or not.
    pub cnt_files_processed: u64,
    pub cnt_files_selected: u64,
    pub cnt_files_not_selected: u64,
    /// Steps configured per selected file.
    pub cnt_ops_per_file: u64,
    pub cnt_ops_applied: u64,
    pub cnt_ops_failed: u64,
    /// Bytes written by copy, link and move steps.
    pub n_bytes_written: u64,
    pub errors: Vec<SpecOpError>,
}

impl ReportExecuteTreeOps {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Every entry is selected or not, and every step of every selected file
    /// either applied or failed.
    pub fn is_consistent(&self) -> bool {
        self.cnt_files_processed == self.cnt_files_selected + self.cnt_files_not_selected
            && self.cnt_ops_applied + self.cnt_ops_failed
                == self.cnt_files_selected * self.cnt_ops_per_file
    }

    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_dirs_scanned".to_string(), self.cnt_dirs_scanned);
        dict_counts.insert("cnt_dirs_created".to_string(), self.cnt_dirs_created);
        dict_counts.insert("cnt_files_processed".to_string(), self.cnt_files_processed);
        dict_counts.insert("cnt_files_selected".to_string(), self.cnt_files_selected);
        dict_counts.insert(
            "cnt_files_not_selected".to_string(),
            self.cnt_files_not_selected,
        );
        dict_counts.insert("cnt_ops_applied".to_string(), self.cnt_ops_applied);
        dict_counts.insert("cnt_ops_failed".to_string(), self.cnt_ops_failed);
        dict_counts.insert("n_bytes_written".to_string(), self.n_bytes_written);
        dict_counts.insert("cnt_errors".to_string(), self.error_count() as u64);
        dict_counts
    }

    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} dirs_scanned={} files_processed={} selected={} ops_applied={} ops_failed={} bytes_written={} errors={}",
            self.cnt_dirs_scanned,
            self.cnt_files_processed,
            self.cnt_files_selected,
            self.cnt_ops_applied,
            self.cnt_ops_failed,
            self.n_bytes_written,
            self.error_count()
        )
    }
}

impl fmt::Display for ReportExecuteTreeOps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.format(&EnumTreeOperation::ExecuteTreeOps.report_prefix())
        )
    }
}

/// Mutable accumulator for tree-ops statistics.
#[derive(Debug, Default, Clone)]
pub struct ReportExecuteTreeOpsBuilder {
    report: ReportExecuteTreeOps,
}

impl ReportExecuteTreeOpsBuilder {
    pub fn new(cnt_ops_per_file: u64) -> Self {
        Self {
            report: ReportExecuteTreeOps {
                cnt_ops_per_file,
                ..ReportExecuteTreeOps::default()
            },
        }
    }

    pub fn add_dir_scanned(&mut self) {
        self.report.cnt_dirs_scanned += 1;
    }

    pub fn add_dir_created(&mut self) {
        self.report.cnt_dirs_created += 1;
    }

    pub fn add_file_selected(&mut self) {
        self.report.cnt_files_processed += 1;
        self.report.cnt_files_selected += 1;
    }

    pub fn add_file_not_selected(&mut self) {
        self.report.cnt_files_processed += 1;
        self.report.cnt_files_not_selected += 1;
    }

    pub fn add_op_applied(&mut self, n_bytes: u64) {
        self.report.cnt_ops_applied += 1;
        self.report.n_bytes_written += n_bytes;
    }

    /// Count a failed step; its error is pushed separately.
    pub fn add_op_failed(&mut self) {
        self.report.cnt_ops_failed += 1;
    }

    pub fn add_error(&mut self, path: PathBuf, exception: String) {
        let error = new_error(EnumTreeOperation::ExecuteTreeOps, path, exception);
        self.report.errors.push(error);
    }

    pub fn push_error(&mut self, error: SpecOpError) {
        tracing::warn!("{error}");
        self.report.errors.push(error);
    }

    pub fn build(mut self, path_root: PathBuf) -> ReportExecuteTreeOps {
        if !self.report.is_consistent() {
            let exception = format!(
                "counters disagree: selected={} ops_applied={} ops_failed={} ops_per_file={}",
                self.report.cnt_files_selected,
                self.report.cnt_ops_applied,
                self.report.cnt_ops_failed,
                self.report.cnt_ops_per_file
            );
            self.add_error(path_root, exception);
        }
        self.report
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
