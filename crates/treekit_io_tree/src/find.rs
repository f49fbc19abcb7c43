//! Find-tree: read-only collection of directories and matching files.

use std::path::Path;

use crate::collection::{DirectoryNode, FileRecord};
use crate::report::ReportFindTree;
use crate::select::{SelectionMatcher, compile_selection};
use crate::spec::{
    EnumTreeOperation, SpecFileTypeFilter, SpecFindTreeOptions, SpecOpError, TreeOpError,
};
use crate::walk::{EnumWalkOutcome, TreeVisitor, walk_tree};

struct FindTreeVisitor {
    file_types: SpecFileTypeFilter,
    matcher: SelectionMatcher,
    report: ReportFindTree,
}

impl TreeVisitor for FindTreeVisitor {
    fn visit_directory(&mut self, node: &DirectoryNode) -> Result<(), SpecOpError> {
        self.report.dirs.push(node.clone());
        Ok(())
    }

    fn visit_file(&mut self, _node: &DirectoryNode, record: &FileRecord) -> Result<(), SpecOpError> {
        self.report.cnt_files_scanned += 1;
        if self.file_types.accepts(record.kind) && self.matcher.matches(record) {
            self.report.files.push(record.clone());
        }
        Ok(())
    }

    fn record_error(&mut self, error: SpecOpError) {
        tracing::warn!("{error}");
        self.report.errors.push(error);
    }
}

/// Collect the directories of `dir_root` in scope and the files selected by
/// `spec_options`, both in walk order. Nothing is modified.
pub fn find_tree<P>(
    dir_root: P,
    spec_options: SpecFindTreeOptions,
) -> Result<ReportFindTree, TreeOpError>
where
    P: AsRef<Path>,
{
    let enum_operation = EnumTreeOperation::FindTree;
    let path_dir_root = dir_root.as_ref();
    let matcher = compile_selection(
        enum_operation,
        spec_options.scope,
        spec_options.file_types,
        &spec_options.criteria,
    )?;
    tracing::debug!("[{enum_operation}] {}", path_dir_root.display());

    let mut visitor = FindTreeVisitor {
        file_types: spec_options.file_types,
        matcher,
        report: ReportFindTree::default(),
    };
    let outcome = walk_tree(enum_operation, path_dir_root, spec_options.scope, &mut visitor)?;
    if let EnumWalkOutcome::Halted(e) = outcome {
        visitor.record_error(e);
    }

    tracing::debug!("{}", visitor.report);
    Ok(visitor.report)
}
