//! Profile-tree: per-kind file counts and sizes.

use std::path::Path;

use crate::collection::{DirectoryNode, FileRecord};
use crate::report::ReportProfileTree;
use crate::spec::{EnumTreeOperation, SpecOpError, SpecProfileTreeOptions, TreeOpError};
use crate::walk::{EnumWalkOutcome, TreeVisitor, walk_tree};

struct ProfileTreeVisitor {
    report: ReportProfileTree,
}

impl TreeVisitor for ProfileTreeVisitor {
    fn visit_directory(&mut self, _node: &DirectoryNode) -> Result<(), SpecOpError> {
        self.report.cnt_dirs += 1;
        Ok(())
    }

    fn visit_file(&mut self, _node: &DirectoryNode, record: &FileRecord) -> Result<(), SpecOpError> {
        self.report.add_file(record.kind, record.size);
        Ok(())
    }

    fn record_error(&mut self, error: SpecOpError) {
        tracing::warn!("{error}");
        self.report.errors.push(error);
    }
}

/// Count the directories and files of `dir_root` in scope, split by kind.
///
/// A mismatch between totals and per-kind sums is recorded as an error.
pub fn profile_tree<P>(
    dir_root: P,
    spec_options: SpecProfileTreeOptions,
) -> Result<ReportProfileTree, TreeOpError>
where
    P: AsRef<Path>,
{
    let enum_operation = EnumTreeOperation::ProfileTree;
    let path_dir_root = dir_root.as_ref();
    tracing::debug!("[{enum_operation}] {}", path_dir_root.display());

    let mut visitor = ProfileTreeVisitor {
        report: ReportProfileTree::default(),
    };
    let outcome = walk_tree(enum_operation, path_dir_root, spec_options.scope, &mut visitor)?;
    if let EnumWalkOutcome::Halted(e) = outcome {
        visitor.record_error(e);
    }
    if !visitor.report.is_consistent() {
        visitor.record_error(SpecOpError {
            operation: enum_operation,
            path: path_dir_root.to_path_buf(),
            exception: "profile totals disagree with per-kind counters".to_string(),
        });
    }

    tracing::debug!("{}", visitor.report);
    Ok(visitor.report)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::profile_tree;
    use crate::spec::{SpecOperationScope, SpecProfileTreeOptions, TreeOpError};

    #[test]
    fn profile_tree_counts_by_kind() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let root = tmp.path();
        fs::create_dir_all(root.join("d/e")).expect("mkdir");
        fs::write(root.join("a.bin"), [0_u8; 10]).expect("write");
        fs::write(root.join("d/e/b.bin"), [0_u8; 5]).expect("write");
        #[cfg(unix)]
        std::os::unix::fs::symlink("a.bin", root.join("d/link")).expect("symlink");

        let report = profile_tree(root, SpecProfileTreeOptions::default()).expect("profile");
        assert_eq!(report.cnt_dirs, 3);
        assert_eq!(report.cnt_files_regular, 2);
        assert_eq!(report.n_bytes_regular, 15);
        #[cfg(unix)]
        assert_eq!(report.cnt_files_symlink, 1);
        assert!(report.is_consistent());
        assert_eq!(report.error_count(), 0);

        let spec_options = SpecProfileTreeOptions {
            scope: SpecOperationScope::parent_only(),
        };
        let report = profile_tree(root, spec_options).expect("profile");
        assert_eq!(report.cnt_dirs, 1);
        assert_eq!(report.cnt_files_total, 1);
    }

    #[test]
    fn profile_tree_rejects_null_scope() {
        let spec_options = SpecProfileTreeOptions {
            scope: SpecOperationScope {
                if_include_parent_directory: false,
                if_include_subtree: false,
            },
        };
        let err = profile_tree("/nowhere", spec_options).expect_err("null scope");
        assert!(matches!(err, TreeOpError::InvalidScope { .. }));
    }
}
