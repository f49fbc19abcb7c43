//! Move-tree: copy each selected file, then remove its source.

use std::path::Path;

use crate::collection::{DirectoryNode, FileRecord};
use crate::copy::{
    EnumDirPrep, EnumTransferMode, EnumTransferOutcome, SpecTransferContext, SpecTransferSettings,
};
use crate::report::{ReportMoveTree, ReportMoveTreeBuilder};
use crate::spec::{EnumTreeOperation, SpecMoveTreeOptions, SpecOpError, TreeOpError};
use crate::util::{delete_file, remove_empty_directory};
use crate::walk::{EnumWalkOutcome, TreeVisitor, walk_tree};

struct MoveTreeVisitor {
    spec_tx_ctx: SpecTransferContext,
    builder_mv_report: ReportMoveTreeBuilder,
    if_delete_empty_source_dirs: bool,
}

impl MoveTreeVisitor {
    fn prepare_target_dir(&mut self) -> bool {
        match self.spec_tx_ctx.ensure_target_dir() {
            EnumDirPrep::Ready | EnumDirPrep::Existing => true,
            EnumDirPrep::Created(node) => {
                self.builder_mv_report.add_dir_created(node);
                true
            }
            EnumDirPrep::Unavailable => false,
            EnumDirPrep::Failed(e) => {
                self.builder_mv_report.push_error(e);
                false
            }
        }
    }

    /// Remove the source after a successful copy. If that fails the copy is
    /// taken back so the file lives in exactly one place.
    fn commit_move(&mut self, record: &FileRecord, n_bytes: u64, path_dst: &Path) {
        let e_src = match delete_file(&record.path) {
            Ok(()) => {
                self.builder_mv_report.add_file_moved(record, n_bytes);
                return;
            }
            Err(e) => e,
        };

        let exception = match delete_file(path_dst) {
            Ok(()) => format!("failed to remove source after copy, target copy removed: {e_src}"),
            Err(e_dst) => format!(
                "failed to remove source after copy ({e_src}); target copy {} could not be removed: {e_dst}",
                path_dst.display()
            ),
        };
        self.builder_mv_report.add_error(record.path.clone(), exception);
        self.builder_mv_report.add_file_remaining(record);
    }
}

impl TreeVisitor for MoveTreeVisitor {
    fn visit_directory(&mut self, node: &DirectoryNode) -> Result<(), SpecOpError> {
        self.builder_mv_report.add_dir_scanned();
        self.spec_tx_ctx.enter_directory(node);
        if self.spec_tx_ctx.if_copy_empty_dirs {
            self.prepare_target_dir();
        }
        Ok(())
    }

    fn visit_file(&mut self, _node: &DirectoryNode, record: &FileRecord) -> Result<(), SpecOpError> {
        if !self.spec_tx_ctx.is_selected(record) || !self.prepare_target_dir() {
            self.builder_mv_report.add_file_remaining(record);
            return Ok(());
        }

        match self.spec_tx_ctx.transfer_file(record, EnumTransferMode::Io) {
            EnumTransferOutcome::Copied { n_bytes, path_dst } => {
                self.commit_move(record, n_bytes, &path_dst);
            }
            EnumTransferOutcome::Skipped => self.builder_mv_report.add_file_remaining(record),
            EnumTransferOutcome::Failed(e) => {
                self.builder_mv_report.push_error(e);
                self.builder_mv_report.add_file_remaining(record);
            }
        }
        Ok(())
    }

    fn leave_directory(&mut self, node: &DirectoryNode) -> Result<(), SpecOpError> {
        if !self.if_delete_empty_source_dirs {
            return Ok(());
        }
        match remove_empty_directory(&node.path) {
            Ok(true) => self.builder_mv_report.add_source_dir_deleted(node.depth == 0),
            Ok(false) => {}
            Err(e) => self.builder_mv_report.add_error(
                node.path.clone(),
                format!("failed to remove emptied source directory: {e}"),
            ),
        }
        Ok(())
    }

    fn record_error(&mut self, error: SpecOpError) {
        self.builder_mv_report.push_error(error);
    }
}

/// Move the files of `dir_source` selected by `spec_options` to the same
/// relative locations under `dir_target`.
///
/// Each file is copied first and its source removed only after the copy
/// succeeded. If removing the source fails, the copy is deleted again and the
/// failure recorded, so no file ends up in both trees or in neither.
///
/// With `if_delete_empty_source_dirs`, a source directory is removed after its
/// subtree is done, and only when nothing is left in it. Directories holding
/// unselected or failed files are kept.
pub fn move_tree<P, Q>(
    dir_source: P,
    dir_target: Q,
    spec_options: SpecMoveTreeOptions,
) -> Result<ReportMoveTree, TreeOpError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let enum_operation = EnumTreeOperation::MoveTree;
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
            if_preserve_metadata: true,
            if_copy_empty_dirs: spec_options.if_copy_empty_dirs,
        },
    )?;
    tracing::debug!(
        "[{enum_operation}] {} -> {}",
        path_dir_src.display(),
        path_dir_dst.display()
    );

    let mut visitor = MoveTreeVisitor {
        spec_tx_ctx,
        builder_mv_report: ReportMoveTreeBuilder::new(spec_options.if_collect_results),
        if_delete_empty_source_dirs: spec_options.if_delete_empty_source_dirs,
    };
    let outcome = walk_tree(enum_operation, path_dir_src, spec_options.scope, &mut visitor)?;
    if let EnumWalkOutcome::Halted(e) = outcome {
        visitor.builder_mv_report.push_error(e);
    }

    let report = visitor
        .builder_mv_report
        .build(visitor.spec_tx_ctx.path_dir_src().to_path_buf());
    tracing::debug!("{report}");
    Ok(report)
}
