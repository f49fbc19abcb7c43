//! Execute-tree-ops: apply an ordered list of file steps to every selected
//! file, mirroring the source layout under a target root.

use std::path::Path;

use crate::collection::{DirectoryNode, FileRecord};
use crate::copy::{
    EnumDirPrep, EnumTransferMode, EnumTransferOutcome, SpecTransferContext, SpecTransferSettings,
};
use crate::report::{ReportExecuteTreeOps, ReportExecuteTreeOpsBuilder};
use crate::spec::{
    EnumFileConflictStrategy, EnumFileOperation, EnumTreeOperation, SpecExecuteTreeOpsOptions,
    SpecOpError, TreeOpError,
};
use crate::util::{
    EnumConflictOutcome, create_empty_file, delete_file, delete_file_if_present,
    resolve_file_conflict,
};
use crate::walk::{EnumWalkOutcome, TreeVisitor, walk_tree};

const ARR_IO_ONLY: [EnumTransferMode; 1] = [EnumTransferMode::Io];
const ARR_LINK_ONLY: [EnumTransferMode; 1] = [EnumTransferMode::HardLink];
const ARR_LINK_THEN_IO: [EnumTransferMode; 2] = [EnumTransferMode::HardLink, EnumTransferMode::Io];
const ARR_IO_THEN_LINK: [EnumTransferMode; 2] = [EnumTransferMode::Io, EnumTransferMode::HardLink];

struct TreeOpsVisitor {
    spec_tx_ctx: SpecTransferContext,
    l_file_ops: Vec<EnumFileOperation>,
    builder_ops_report: ReportExecuteTreeOpsBuilder,
}

impl TreeOpsVisitor {
    fn op_error(&self, path: &Path, exception: String) -> SpecOpError {
        SpecOpError {
            operation: self.spec_tx_ctx.operation,
            path: path.to_path_buf(),
            exception,
        }
    }

    fn prepare_target_dir(&mut self) -> Result<(), SpecOpError> {
        match self.spec_tx_ctx.ensure_target_dir() {
            EnumDirPrep::Ready | EnumDirPrep::Existing => Ok(()),
            EnumDirPrep::Created(_) => {
                self.builder_ops_report.add_dir_created();
                Ok(())
            }
            EnumDirPrep::Unavailable => {
                let path_dir = self.spec_tx_ctx.current_target_dir().to_path_buf();
                Err(self.op_error(&path_dir, "target directory is unavailable".to_string()))
            }
            EnumDirPrep::Failed(e) => Err(e),
        }
    }

    /// Try each mode in turn; the step fails only if all of them fail.
    fn write_destination(
        &self,
        record: &FileRecord,
        l_modes: &[EnumTransferMode],
    ) -> Result<u64, SpecOpError> {
        let mut l_messages = Vec::with_capacity(l_modes.len());
        for enum_mode in l_modes {
            match self.spec_tx_ctx.transfer_file(record, *enum_mode) {
                EnumTransferOutcome::Copied { n_bytes, .. } => return Ok(n_bytes),
                EnumTransferOutcome::Skipped => return Ok(0),
                EnumTransferOutcome::Failed(e) => l_messages.push(e.exception),
            }
        }
        Err(self.op_error(&record.path, l_messages.join("; ")))
    }

    fn move_to_destination(&self, record: &FileRecord) -> Result<u64, SpecOpError> {
        let (n_bytes, path_dst) = match self.spec_tx_ctx.transfer_file(record, EnumTransferMode::Io)
        {
            EnumTransferOutcome::Copied { n_bytes, path_dst } => (n_bytes, path_dst),
            EnumTransferOutcome::Skipped => return Ok(0),
            EnumTransferOutcome::Failed(e) => return Err(e),
        };
        let e_src = match delete_file(&record.path) {
            Ok(()) => return Ok(n_bytes),
            Err(e) => e,
        };
        let exception = match delete_file(&path_dst) {
            Ok(()) => format!("failed to remove source after copy, target copy removed: {e_src}"),
            Err(e_dst) => format!(
                "failed to remove source after copy ({e_src}); target copy {} could not be removed: {e_dst}",
                path_dst.display()
            ),
        };
        Err(self.op_error(&record.path, exception))
    }

    fn delete_destination(&self, record: &FileRecord) -> Result<(), SpecOpError> {
        let path_dst = self.spec_tx_ctx.checked_target_file_path(record)?;
        delete_file_if_present(&path_dst)
            .map(drop)
            .map_err(|e| self.op_error(&path_dst, format!("failed to delete destination: {e}")))
    }

    fn delete_source(&self, record: &FileRecord) -> Result<(), SpecOpError> {
        delete_file_if_present(&record.path)
            .map(drop)
            .map_err(|e| self.op_error(&record.path, format!("failed to delete source: {e}")))
    }

    fn create_destination_file(&self, record: &FileRecord) -> Result<(), SpecOpError> {
        let path_dst = self.spec_tx_ctx.target_file_path(record);
        match resolve_file_conflict(
            &path_dst,
            record.kind,
            EnumFileConflictStrategy::Overwrite,
        ) {
            EnumConflictOutcome::Proceed | EnumConflictOutcome::Skip => {}
            EnumConflictOutcome::Reject(message) => return Err(self.op_error(&path_dst, message)),
        }
        create_empty_file(&path_dst).map_err(|e| {
            self.op_error(&path_dst, format!("failed to create destination file: {e}"))
        })
    }

    /// Apply one step to `record`. Returns the bytes written.
    fn apply_op(
        &mut self,
        enum_file_op: EnumFileOperation,
        record: &FileRecord,
    ) -> Result<u64, SpecOpError> {
        if enum_file_op.writes_destination() {
            self.prepare_target_dir()?;
        }
        match enum_file_op {
            EnumFileOperation::CopyByIo => self.write_destination(record, &ARR_IO_ONLY),
            EnumFileOperation::CopyByHardLink => self.write_destination(record, &ARR_LINK_ONLY),
            EnumFileOperation::CopyByHardLinkThenIo => {
                self.write_destination(record, &ARR_LINK_THEN_IO)
            }
            EnumFileOperation::CopyByIoThenHardLink => {
                self.write_destination(record, &ARR_IO_THEN_LINK)
            }
            EnumFileOperation::MoveSourceToDestination => self.move_to_destination(record),
            EnumFileOperation::DeleteSourceFile => self.delete_source(record).map(|()| 0),
            EnumFileOperation::DeleteDestinationFile => {
                self.delete_destination(record).map(|()| 0)
            }
            EnumFileOperation::DeleteSourceAndDestinationFiles => {
                let res_dst = self.delete_destination(record);
                let res_src = self.delete_source(record);
                match (res_dst, res_src) {
                    (Ok(()), Ok(())) => Ok(0),
                    (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
                    (Err(e_dst), Err(e_src)) => Err(self.op_error(
                        &record.path,
                        format!("{}; {}", e_dst.exception, e_src.exception),
                    )),
                }
            }
            EnumFileOperation::CreateDestinationDir => Ok(0),
            EnumFileOperation::CreateDestinationFile => {
                self.create_destination_file(record).map(|()| 0)
            }
        }
    }
}

impl TreeVisitor for TreeOpsVisitor {
    fn visit_directory(&mut self, node: &DirectoryNode) -> Result<(), SpecOpError> {
        self.builder_ops_report.add_dir_scanned();
        self.spec_tx_ctx.enter_directory(node);
        Ok(())
    }

    fn visit_file(&mut self, _node: &DirectoryNode, record: &FileRecord) -> Result<(), SpecOpError> {
        if !self.spec_tx_ctx.is_selected(record) {
            self.builder_ops_report.add_file_not_selected();
            return Ok(());
        }
        self.builder_ops_report.add_file_selected();

        let l_file_ops = self.l_file_ops.clone();
        for enum_file_op in l_file_ops {
            match self.apply_op(enum_file_op, record) {
                Ok(n_bytes) => self.builder_ops_report.add_op_applied(n_bytes),
                Err(mut e) => {
                    e.exception = format!("{enum_file_op}: {}", e.exception);
                    self.builder_ops_report.push_error(e);
                    self.builder_ops_report.add_op_failed();
                }
            }
        }
        Ok(())
    }

    fn record_error(&mut self, error: SpecOpError) {
        self.builder_ops_report.push_error(error);
    }
}

/// Apply `spec_options.file_ops`, in order, to every file of `dir_source`
/// selected by `spec_options`.
///
/// A selected file's destination is the same relative path under
/// `dir_target`. Steps that write there create the destination directory
/// first. A failed step is recorded and the remaining steps still run, so a
/// later step may fail because of an earlier one (a copy after the source was
/// deleted, say).
///
/// Returns [`TreeOpError::EmptyFileOperations`] when no step is given, and the
/// same setup errors as [`crate::copy_tree`] otherwise.
pub fn execute_tree_ops<P, Q>(
    dir_source: P,
    dir_target: Q,
    spec_options: SpecExecuteTreeOpsOptions,
) -> Result<ReportExecuteTreeOps, TreeOpError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let enum_operation = EnumTreeOperation::ExecuteTreeOps;
    let path_dir_src = dir_source.as_ref();
    let path_dir_dst = dir_target.as_ref();
    if spec_options.file_ops.is_empty() {
        return Err(TreeOpError::EmptyFileOperations {
            operation: enum_operation,
        });
    }

    let spec_tx_ctx = SpecTransferContext::prepare(
        enum_operation,
        path_dir_src,
        path_dir_dst,
        SpecTransferSettings {
            scope: spec_options.scope,
            file_types: spec_options.file_types,
            criteria: &spec_options.criteria,
            rule_conflict_file: EnumFileConflictStrategy::Overwrite,
            if_preserve_metadata: spec_options.if_preserve_metadata,
            if_copy_empty_dirs: false,
        },
    )?;
    tracing::debug!(
        "[{enum_operation}] {} -> {} ops={:?}",
        path_dir_src.display(),
        path_dir_dst.display(),
        spec_options.file_ops
    );

    let mut visitor = TreeOpsVisitor {
        spec_tx_ctx,
        builder_ops_report: ReportExecuteTreeOpsBuilder::new(spec_options.file_ops.len() as u64),
        l_file_ops: spec_options.file_ops,
    };
    let outcome = walk_tree(enum_operation, path_dir_src, spec_options.scope, &mut visitor)?;
    if let EnumWalkOutcome::Halted(e) = outcome {
        visitor.builder_ops_report.push_error(e);
    }

    let report = visitor
        .builder_ops_report
        .build(visitor.spec_tx_ctx.path_dir_src().to_path_buf());
    tracing::debug!("{report}");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::execute_tree_ops;
    use crate::spec::{
        EnumFileOperation, SpecExecuteTreeOpsOptions, SpecSelectionCriteria, TreeOpError,
    };

    fn write_text(path: &Path, txt: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(path, txt).expect("write text");
    }

    fn options_with(l_ops: &[EnumFileOperation]) -> SpecExecuteTreeOpsOptions {
        SpecExecuteTreeOpsOptions {
            file_ops: l_ops.to_vec(),
            ..SpecExecuteTreeOpsOptions::default()
        }
    }

    #[test]
    fn execute_tree_ops_rejects_empty_step_list() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let err = execute_tree_ops(
            tmp.path().join("missing"),
            tmp.path().join("dst"),
            SpecExecuteTreeOpsOptions::default(),
        )
        .expect_err("no steps");
        assert!(matches!(err, TreeOpError::EmptyFileOperations { .. }));
        assert!(err.is_configuration_error());
    }

    #[test]
    fn execute_tree_ops_copy_then_delete_source() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write_text(&src.join("a.txt"), "aa");
        write_text(&src.join("sub/b.txt"), "bbb");
        write_text(&src.join("sub/c.log"), "c");

        let spec_options = SpecExecuteTreeOpsOptions {
            criteria: SpecSelectionCriteria::with_patterns(["*.txt"]),
            ..options_with(&[
                EnumFileOperation::CopyByIo,
                EnumFileOperation::DeleteSourceFile,
            ])
        };
        let report = execute_tree_ops(&src, &dst, spec_options).expect("tree ops");

        assert_eq!(report.error_count(), 0);
        assert_eq!(report.cnt_files_selected, 2);
        assert_eq!(report.cnt_files_not_selected, 1);
        assert_eq!(report.cnt_ops_applied, 4);
        assert_eq!(report.n_bytes_written, 5);
        assert_eq!(fs::read_to_string(dst.join("sub/b.txt")).expect("read"), "bbb");
        assert!(!src.join("a.txt").exists() && !src.join("sub/b.txt").exists());
        assert!(src.join("sub/c.log").exists() && !dst.join("sub/c.log").exists());
    }

    #[test]
    fn execute_tree_ops_keeps_going_after_a_failed_step() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write_text(&src.join("a.txt"), "a");

        let spec_options = options_with(&[
            EnumFileOperation::DeleteSourceFile,
            EnumFileOperation::CopyByIo,
            EnumFileOperation::CreateDestinationFile,
        ]);
        let report = execute_tree_ops(&src, &dst, spec_options).expect("tree ops");

        assert_eq!(report.cnt_ops_applied, 2);
        assert_eq!(report.cnt_ops_failed, 1);
        assert_eq!(report.error_count(), 1);
        assert!(report.errors[0].exception.starts_with("copy:"));
        assert!(report.is_consistent());
        assert_eq!(fs::read_to_string(dst.join("a.txt")).expect("read"), "");
    }

    #[test]
    fn execute_tree_ops_hard_links_and_deletes_destination() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write_text(&src.join("d/a.txt"), "linked");

        let report = execute_tree_ops(
            &src,
            &dst,
            options_with(&[EnumFileOperation::CopyByHardLinkThenIo]),
        )
        .expect("link");
        assert_eq!(report.error_count(), 0);
        assert_eq!(report.cnt_dirs_created, 1);
        fs::write(src.join("d/a.txt"), "through link").expect("rewrite");
        assert_eq!(
            fs::read_to_string(dst.join("d/a.txt")).expect("read"),
            "through link"
        );

        let report = execute_tree_ops(
            &src,
            &dst,
            options_with(&[EnumFileOperation::DeleteDestinationFile]),
        )
        .expect("delete destination");
        assert_eq!(report.error_count(), 0);
        assert!(!dst.join("d/a.txt").exists());
        assert!(src.join("d/a.txt").exists());

        // Already gone: deleting again is not an error.
        let report = execute_tree_ops(
            &src,
            &dst,
            options_with(&[EnumFileOperation::DeleteSourceAndDestinationFiles]),
        )
        .expect("delete both");
        assert_eq!(report.error_count(), 0);
        assert!(!src.join("d/a.txt").exists());
    }

    #[test]
    fn execute_tree_ops_moves_and_creates_directories() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write_text(&src.join("x/m.txt"), "move me");

        let report = execute_tree_ops(
            &src,
            &dst,
            options_with(&[
                EnumFileOperation::CreateDestinationDir,
                EnumFileOperation::MoveSourceToDestination,
            ]),
        )
        .expect("move");
        assert_eq!(report.error_count(), 0);
        assert_eq!(report.n_bytes_written, 7);
        assert!(!src.join("x/m.txt").exists());
        assert_eq!(fs::read_to_string(dst.join("x/m.txt")).expect("read"), "move me");
    }

    #[cfg(unix)]
    #[test]
    fn execute_tree_ops_never_deletes_through_symlinked_target_dirs() {
        use std::os::unix::fs::symlink;

        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        let outside = tmp.path().join("outside");
        write_text(&src.join("sub/x.txt"), "x");
        write_text(&outside.join("x.txt"), "keep");
        fs::create_dir_all(&dst).expect("mkdir dst");
        symlink("../outside", dst.join("sub")).expect("symlink");

        let report = execute_tree_ops(
            &src,
            &dst,
            options_with(&[EnumFileOperation::DeleteDestinationFile]),
        )
        .expect("tree ops");
        assert_eq!(report.error_count(), 1);
        assert!(report.errors[0].exception.contains("symlink"));
        assert_eq!(fs::read_to_string(outside.join("x.txt")).expect("read"), "keep");
    }
}
