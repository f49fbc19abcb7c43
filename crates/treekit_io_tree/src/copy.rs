//! Copy-tree orchestration and the per-file transfer shared with move-tree.

use std::fs;
use std::path::{Path, PathBuf};

use crate::collection::{DirectoryNode, FileRecord};
use crate::report::{ReportCopyTree, ReportCopyTreeBuilder};
use crate::select::{SelectionMatcher, compile_selection};
use crate::spec::{
    EnumFileConflictStrategy, EnumTreeOperation, SpecCopyTreeOptions, SpecFileTypeFilter,
    SpecOpError, SpecOperationScope, SpecSelectionCriteria, TreeOpError,
};
use crate::util::{
    EnumConflictOutcome, copy_entry, derive_target_path, find_symlink_component, is_overlap,
    link_entry, make_directory, resolve_file_conflict,
};
use crate::walk::{EnumWalkOutcome, TreeVisitor, absolute_root, inspect_root, walk_tree};

////////////////////////////////////////////////////////////////////////////////
// #region TransferContext

/// Target directory state for the source directory being visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnumTargetDirState {
    Pending,
    Ready,
    Failed,
}

/// Result of making sure the current target directory exists.
#[derive(Debug)]
pub(crate) enum EnumDirPrep {
    /// Already prepared earlier for this source directory.
    Ready,
    /// Found in place.
    Existing,
    /// Newly created.
    Created(DirectoryNode),
    /// A previous attempt failed; nothing can be written here.
    Unavailable,
    /// Creation failed now.
    Failed(SpecOpError),
}

/// Result of transferring one selected file.
#[derive(Debug)]
pub(crate) enum EnumTransferOutcome {
    Copied { n_bytes: u64, path_dst: PathBuf },
    /// Destination kept by the conflict rule.
    Skipped,
    Failed(SpecOpError),
}

/// How a selected file reaches its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EnumTransferMode {
    /// Content copy; symlinks are recreated.
    Io,
    HardLink,
}

/// Settings and per-directory state shared by copy and move visitors.
#[derive(Debug)]
pub(crate) struct SpecTransferContext {
    pub(crate) operation: EnumTreeOperation,
    path_dir_src: PathBuf,
    path_dir_dst: PathBuf,
    file_types: SpecFileTypeFilter,
    matcher: SelectionMatcher,
    rule_conflict_file: EnumFileConflictStrategy,
    if_preserve_metadata: bool,
    pub(crate) if_copy_empty_dirs: bool,
    path_dir_dst_current: PathBuf,
    n_mode_dir_current: u32,
    n_depth_current: usize,
    enum_dir_state: EnumTargetDirState,
}

/// Transfer inputs after validation.
pub(crate) struct SpecTransferSettings<'a> {
    pub(crate) scope: SpecOperationScope,
    pub(crate) file_types: SpecFileTypeFilter,
    pub(crate) criteria: &'a SpecSelectionCriteria,
    pub(crate) rule_conflict_file: EnumFileConflictStrategy,
    pub(crate) if_preserve_metadata: bool,
    pub(crate) if_copy_empty_dirs: bool,
}

impl SpecTransferContext {
    /// Validate everything a copy or move needs, configuration first, then
    /// the source root and the target root.
    pub(crate) fn prepare(
        operation: EnumTreeOperation,
        path_dir_src: &Path,
        path_dir_dst: &Path,
        spec_settings: SpecTransferSettings<'_>,
    ) -> Result<Self, TreeOpError> {
        let matcher = compile_selection(
            operation,
            spec_settings.scope,
            spec_settings.file_types,
            spec_settings.criteria,
        )?;
        let path_dir_src = absolute_root(operation, path_dir_src)?;
        let path_dir_dst =
            std::path::absolute(path_dir_dst).map_err(|e| TreeOpError::TargetInitFailed {
                operation,
                path: path_dir_dst.to_path_buf(),
                message: e.to_string(),
            })?;
        if is_overlap(&path_dir_src, &path_dir_dst) {
            return Err(TreeOpError::SourceTargetOverlap {
                operation,
                path_source: path_dir_src,
                path_target: path_dir_dst,
            });
        }
        inspect_root(operation, &path_dir_src)?;
        let message_dst = match fs::symlink_metadata(&path_dir_dst) {
            Ok(meta_dst) if meta_dst.file_type().is_symlink() => {
                Some("target is a symbolic link; refusing to write through it")
            }
            Ok(meta_dst) if !meta_dst.is_dir() => Some("target exists and is not a directory"),
            _ => None,
        };
        if let Some(message) = message_dst {
            return Err(TreeOpError::TargetInitFailed {
                operation,
                path: path_dir_dst,
                message: message.to_string(),
            });
        }

        Ok(Self {
            operation,
            path_dir_dst_current: path_dir_dst.clone(),
            path_dir_src,
            path_dir_dst,
            file_types: spec_settings.file_types,
            matcher,
            rule_conflict_file: spec_settings.rule_conflict_file,
            if_preserve_metadata: spec_settings.if_preserve_metadata,
            if_copy_empty_dirs: spec_settings.if_copy_empty_dirs,
            n_mode_dir_current: 0o755,
            n_depth_current: 0,
            enum_dir_state: EnumTargetDirState::Pending,
        })
    }

    pub(crate) fn path_dir_src(&self) -> &Path {
        &self.path_dir_src
    }

    /// Target directory mirroring the source directory being visited.
    pub(crate) fn current_target_dir(&self) -> &Path {
        &self.path_dir_dst_current
    }

    /// Switch to the target directory mirroring `node`.
    pub(crate) fn enter_directory(&mut self, node: &DirectoryNode) {
        self.path_dir_dst_current =
            derive_target_path(&node.path, &self.path_dir_src, &self.path_dir_dst);
        self.n_mode_dir_current = node.mode;
        self.n_depth_current = node.depth;
        self.enum_dir_state = EnumTargetDirState::Pending;
    }

    /// Type filter AND characteristics filter.
    pub(crate) fn is_selected(&self, record: &FileRecord) -> bool {
        self.file_types.accepts(record.kind) && self.matcher.matches(record)
    }

    /// Create the current target directory on first use.
    pub(crate) fn ensure_target_dir(&mut self) -> EnumDirPrep {
        match self.enum_dir_state {
            EnumTargetDirState::Ready => return EnumDirPrep::Ready,
            EnumTargetDirState::Failed => return EnumDirPrep::Unavailable,
            EnumTargetDirState::Pending => {}
        }

        let path_dir = self.path_dir_dst_current.clone();
        if let Some(path_link) = find_symlink_component(&self.path_dir_dst, &path_dir) {
            self.enum_dir_state = EnumTargetDirState::Failed;
            return EnumDirPrep::Failed(SpecOpError {
                operation: self.operation,
                path: path_dir,
                exception: format!(
                    "target directory traverses symlink component: {}",
                    path_link.display()
                ),
            });
        }
        match make_directory(&path_dir, self.n_mode_dir_current) {
            Ok(false) => {
                self.enum_dir_state = EnumTargetDirState::Ready;
                EnumDirPrep::Existing
            }
            Ok(true) => {
                self.enum_dir_state = EnumTargetDirState::Ready;
                let meta_dir = fs::symlink_metadata(&path_dir).ok();
                EnumDirPrep::Created(DirectoryNode::new(
                    path_dir,
                    meta_dir.as_ref(),
                    self.n_depth_current,
                ))
            }
            Err(e) => {
                self.enum_dir_state = EnumTargetDirState::Failed;
                EnumDirPrep::Failed(SpecOpError {
                    operation: self.operation,
                    path: path_dir,
                    exception: format!("failed to create target directory: {e}"),
                })
            }
        }
    }

    /// Destination path of `record` in the current target directory.
    pub(crate) fn target_file_path(&self, record: &FileRecord) -> PathBuf {
        self.path_dir_dst_current.join(&record.name_os)
    }

    /// Destination path of `record`, refused when the current target
    /// directory passes through a symlink.
    pub(crate) fn checked_target_file_path(
        &self,
        record: &FileRecord,
    ) -> Result<PathBuf, SpecOpError> {
        match find_symlink_component(&self.path_dir_dst, &self.path_dir_dst_current) {
            Some(path_link) => Err(SpecOpError {
                operation: self.operation,
                path: self.path_dir_dst_current.clone(),
                exception: format!(
                    "target directory traverses symlink component: {}",
                    path_link.display()
                ),
            }),
            None => Ok(self.target_file_path(record)),
        }
    }

    /// Copy one selected file into the current target directory, which must
    /// have been prepared.
    pub(crate) fn transfer_file(
        &self,
        record: &FileRecord,
        enum_mode: EnumTransferMode,
    ) -> EnumTransferOutcome {
        let path_dst = self.target_file_path(record);
        match resolve_file_conflict(&path_dst, record.kind, self.rule_conflict_file) {
            EnumConflictOutcome::Proceed => {}
            EnumConflictOutcome::Skip => return EnumTransferOutcome::Skipped,
            EnumConflictOutcome::Reject(message) => {
                return EnumTransferOutcome::Failed(SpecOpError {
                    operation: self.operation,
                    path: path_dst,
                    exception: message,
                });
            }
        }

        let res_written = match enum_mode {
            EnumTransferMode::Io => copy_entry(record, &path_dst, self.if_preserve_metadata),
            EnumTransferMode::HardLink => link_entry(record, &path_dst),
        };
        match res_written {
            Ok(n_bytes) => EnumTransferOutcome::Copied { n_bytes, path_dst },
            Err(e) => {
                let c_verb = match enum_mode {
                    EnumTransferMode::Io => "copy",
                    EnumTransferMode::HardLink => "hard link",
                };
                EnumTransferOutcome::Failed(SpecOpError {
                    operation: self.operation,
                    path: record.path.clone(),
                    exception: format!("{c_verb} to {} failed: {e}", path_dst.display()),
                })
            }
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CopyTree

struct CopyTreeVisitor {
    spec_tx_ctx: SpecTransferContext,
    builder_cp_report: ReportCopyTreeBuilder,
}

impl CopyTreeVisitor {
    fn prepare_target_dir(&mut self) -> bool {
        match self.spec_tx_ctx.ensure_target_dir() {
            EnumDirPrep::Ready => true,
            EnumDirPrep::Existing => {
                self.builder_cp_report.add_dir_copied();
                true
            }
            EnumDirPrep::Created(node) => {
                self.builder_cp_report.add_dir_created(node);
                self.builder_cp_report.add_dir_copied();
                true
            }
            EnumDirPrep::Unavailable => false,
            EnumDirPrep::Failed(e) => {
                self.builder_cp_report.push_error(e);
                false
            }
        }
    }
}

impl TreeVisitor for CopyTreeVisitor {
    fn visit_directory(&mut self, node: &DirectoryNode) -> Result<(), SpecOpError> {
        self.builder_cp_report.add_dir_scanned();
        self.spec_tx_ctx.enter_directory(node);
        if self.spec_tx_ctx.if_copy_empty_dirs {
            self.prepare_target_dir();
        }
        Ok(())
    }

    fn visit_file(&mut self, _node: &DirectoryNode, record: &FileRecord) -> Result<(), SpecOpError> {
        if !self.spec_tx_ctx.is_selected(record) || !self.prepare_target_dir() {
            self.builder_cp_report.add_file_not_copied(record);
            return Ok(());
        }

        match self.spec_tx_ctx.transfer_file(record, EnumTransferMode::Io) {
            EnumTransferOutcome::Copied { n_bytes, .. } => {
                self.builder_cp_report.add_file_copied(record, n_bytes);
            }
            EnumTransferOutcome::Skipped => self.builder_cp_report.add_file_not_copied(record),
            EnumTransferOutcome::Failed(e) => {
                self.builder_cp_report.push_error(e);
                self.builder_cp_report.add_file_not_copied(record);
            }
        }
        Ok(())
    }

    fn record_error(&mut self, error: SpecOpError) {
        self.builder_cp_report.push_error(error);
    }
}

/// Copy the files of `dir_source` selected by `spec_options` into the same
/// relative locations under `dir_target`.
///
/// Selection composes three independent axes:
/// - traversal scope (root directory, subtree, or both),
/// - file type filter (regular, symlink, other non-regular),
/// - characteristics filter (name patterns, modification time bounds, mode).
///
/// Target directories are created only when a file is copied into them,
/// unless `if_copy_empty_dirs` is set. Symlinks are recreated as symlinks.
///
/// Returns [`TreeOpError`] for configuration errors (checked before any
/// filesystem access), a missing source root, or an unusable target root.
/// Per-file failures are collected in [`ReportCopyTree::errors`] and never
/// stop the run.
pub fn copy_tree<P, Q>(
    dir_source: P,
    dir_target: Q,
    spec_options: SpecCopyTreeOptions,
) -> Result<ReportCopyTree, TreeOpError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let enum_operation = EnumTreeOperation::CopyTree;
    let path_dir_src = dir_source.as_ref();
    let path_dir_dst = dir_target.as_ref();

    let spec_tx_ctx = SpecTransferContext::prepare(
        enum_operation,
        path_dir_src,
        path_dir_dst,
        SpecTransferSettings {
            scope: spec_options.scope,
            file_types: spec_options.file_types,
            criteria: &spec_options.criteria,
            rule_conflict_file: spec_options.rule_conflict_file,
            if_preserve_metadata: spec_options.if_preserve_metadata,
            if_copy_empty_dirs: spec_options.if_copy_empty_dirs,
        },
    )?;
    tracing::debug!(
        "[{enum_operation}] {} -> {}",
        path_dir_src.display(),
        path_dir_dst.display()
    );

    let mut visitor = CopyTreeVisitor {
        spec_tx_ctx,
        builder_cp_report: ReportCopyTreeBuilder::new(spec_options.if_collect_results),
    };
    let outcome = walk_tree(enum_operation, path_dir_src, spec_options.scope, &mut visitor)?;
    if let EnumWalkOutcome::Halted(e) = outcome {
        visitor.builder_cp_report.push_error(e);
    }

    let report = visitor
        .builder_cp_report
        .build(visitor.spec_tx_ctx.path_dir_src().to_path_buf());
    tracing::debug!("{report}");
    Ok(report)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
